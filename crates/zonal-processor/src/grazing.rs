//! Grazing-aware correction of the field mean.
//!
//! Each field is split at its own median: pixels at or below it count as
//! grazed. When the grazed share of the field area reaches the configured
//! threshold, the reported index is the mean of the ungrazed pixels only.

use ndvi_common::FieldPolygon;

use crate::config::GrazingConfig;
use crate::error::Result;
use crate::types::{GrazingResult, IndexRaster, ZonalStats};
use crate::zonal::{mean, sample_zone};

/// Correct the mean of `stats` for grazing, re-sampling `raster` inside
/// `polygon` at the scale `stats` was computed with.
pub fn correct(
    raster: &IndexRaster,
    polygon: &FieldPolygon,
    stats: &ZonalStats,
    config: &GrazingConfig,
) -> Result<GrazingResult> {
    if stats.median.is_none() {
        return Ok(GrazingResult::no_data());
    }

    let sample = sample_zone(raster, polygon, stats.per_pixel_area.sqrt())?;
    Ok(correct_values(sample.values(), stats, config))
}

/// Grazing correction over already-sampled field values.
pub fn correct_values(values: &[f64], stats: &ZonalStats, config: &GrazingConfig) -> GrazingResult {
    let Some(median) = stats.median else {
        return GrazingResult::no_data();
    };
    if stats.total_area <= 0.0 {
        return GrazingResult::no_data();
    }

    let (grazed, ungrazed): (Vec<f64>, Vec<f64>) = values.iter().partition(|v| **v <= median);

    let grazed_area = grazed.len() as f64 * stats.per_pixel_area;
    let percent_grazed = grazed_area * 100.0 / stats.total_area;

    if percent_grazed >= config.min_percent_grazed {
        GrazingResult {
            percent_grazed: Some(percent_grazed),
            effective_ndvi: mean(&ungrazed),
            corrected: true,
        }
    } else {
        GrazingResult {
            percent_grazed: Some(percent_grazed),
            effective_ndvi: stats.mean,
            corrected: false,
        }
    }
}
