//! Reduction of an index raster to per-field statistics.
//!
//! A field is sampled on a grid aligned with the raster origin and spaced by
//! the requested scale. Sample points are cell centers strictly inside the
//! field; each takes the value of the raster pixel containing it, and no-data
//! pixels are dropped.
//!
//! Percentiles use linear interpolation between order statistics over the
//! sorted samples: `rank = p / 100 * (n - 1)`, the value being interpolated
//! between `floor(rank)` and `ceil(rank)`. The mean is summed over the same
//! sorted order, so repeated calls give bit-identical results.

use ndvi_common::FieldPolygon;

use crate::error::{Result, ZonalError};
use crate::types::{IndexRaster, ZonalStats};

/// Valid index values sampled inside one field, in ascending order.
#[derive(Debug, Clone, PartialEq)]
pub struct ZoneSample {
    values: Vec<f64>,
    /// Geometric area of the field.
    pub total_area: f64,
    /// Area represented by one sample.
    pub per_pixel_area: f64,
}

impl ZoneSample {
    /// Sorted sample values.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn count(&self) -> usize {
        self.values.len()
    }

    /// Summary statistics of the sample.
    pub fn stats(&self) -> ZonalStats {
        if self.values.is_empty() {
            return ZonalStats::empty(self.total_area, self.per_pixel_area);
        }

        ZonalStats {
            count: self.values.len(),
            mean: mean(&self.values),
            median: percentile(&self.values, 50.0),
            p10: percentile(&self.values, 10.0),
            p90: percentile(&self.values, 90.0),
            total_area: self.total_area,
            per_pixel_area: self.per_pixel_area,
        }
    }
}

/// Collect the valid index values of `raster` inside `polygon`.
///
/// The polygon must already be in the raster's CRS, which must be projected
/// so that `scale` is a ground distance. A polygon that does not intersect
/// the raster produces an empty sample.
pub fn sample_zone(raster: &IndexRaster, polygon: &FieldPolygon, scale: f64) -> Result<ZoneSample> {
    if !(scale.is_finite() && scale > 0.0) {
        return Err(ZonalError::InvalidScale(scale));
    }
    if raster.crs.is_geographic() {
        return Err(ZonalError::GeographicRaster {
            image: raster.image_id.clone(),
            crs: raster.crs.to_string(),
        });
    }
    if polygon.crs() != raster.crs {
        return Err(ZonalError::CrsMismatch {
            raster: raster.crs.to_string(),
            field: polygon.name.clone(),
            field_crs: polygon.crs().to_string(),
        });
    }

    let total_area = polygon.geometry.planar_area();
    let per_pixel_area = scale * scale;
    let mut values = Vec::new();

    let window = polygon
        .bbox()
        .and_then(|field_box| field_box.intersection(&raster.bbox()));

    if let Some(window) = window {
        let origin_x = raster.transform.origin_x;
        let origin_y = raster.transform.origin_y;

        // Sample cells overlapping the window, indexed from the raster origin.
        let col_start = ((window.min_x - origin_x) / scale).floor().max(0.0) as usize;
        let col_end = ((window.max_x - origin_x) / scale).ceil().max(0.0) as usize;
        let row_start = ((origin_y - window.max_y) / scale).floor().max(0.0) as usize;
        let row_end = ((origin_y - window.min_y) / scale).ceil().max(0.0) as usize;

        for row in row_start..row_end {
            let y = origin_y - (row as f64 + 0.5) * scale;
            for col in col_start..col_end {
                let x = origin_x + (col as f64 + 0.5) * scale;
                if !polygon.geometry.contains_point(x, y) {
                    continue;
                }
                if let Some(v) = raster.value_at(x, y) {
                    values.push(f64::from(v));
                }
            }
        }
    }

    values.sort_by(|a, b| a.total_cmp(b));

    Ok(ZoneSample {
        values,
        total_area,
        per_pixel_area,
    })
}

/// Zonal statistics of `raster` restricted to `polygon` at `scale`.
pub fn reduce(raster: &IndexRaster, polygon: &FieldPolygon, scale: f64) -> Result<ZonalStats> {
    Ok(sample_zone(raster, polygon, scale)?.stats())
}

/// Arithmetic mean, `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Percentile `p` (0-100) of ascending-sorted values, `None` when empty.
pub fn percentile(sorted: &[f64], p: f64) -> Option<f64> {
    let n = sorted.len();
    if n == 0 {
        return None;
    }
    if n == 1 {
        return Some(sorted[0]);
    }

    let rank = (p.clamp(0.0, 100.0) / 100.0) * (n - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    if lower == upper {
        return Some(sorted[lower]);
    }

    let frac = rank - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * frac)
}
