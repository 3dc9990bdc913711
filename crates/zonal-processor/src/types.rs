//! Core types for index and zonal processing.

use ndvi_common::{BoundingBox, Crs, GeoTransform};
use serde::{Deserialize, Serialize};

/// Single-band normalized-difference raster derived from one image.
///
/// Values lie in `[-1, 1]`; undefined pixels are stored as NaN internally and
/// surface as `None` through every accessor.
#[derive(Debug, Clone)]
pub struct IndexRaster {
    /// Id of the image the index was computed from.
    pub image_id: String,
    pub width: usize,
    pub height: usize,
    pub transform: GeoTransform,
    pub crs: Crs,
    data: Vec<f32>,
}

impl IndexRaster {
    pub(crate) fn new(
        image_id: String,
        width: usize,
        height: usize,
        transform: GeoTransform,
        crs: Crs,
        data: Vec<f32>,
    ) -> Self {
        debug_assert_eq!(data.len(), width * height);
        Self {
            image_id,
            width,
            height,
            transform,
            crs,
            data,
        }
    }

    /// Index value at a grid cell, `None` for no data or outside the grid.
    pub fn get(&self, col: usize, row: usize) -> Option<f32> {
        if col >= self.width || row >= self.height {
            return None;
        }
        let v = self.data[row * self.width + col];
        if v.is_nan() {
            None
        } else {
            Some(v)
        }
    }

    /// Index value of the pixel containing a coordinate.
    pub fn value_at(&self, x: f64, y: f64) -> Option<f32> {
        let (fc, fr) = self.transform.to_pixel(x, y);
        if fc < 0.0 || fr < 0.0 {
            return None;
        }
        self.get(fc.floor() as usize, fr.floor() as usize)
    }

    pub fn bbox(&self) -> BoundingBox {
        self.transform.bbox(self.width, self.height)
    }

    /// Number of pixels carrying a value.
    pub fn valid_count(&self) -> usize {
        self.data.iter().filter(|v| !v.is_nan()).count()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Iterate every pixel as `Option<f32>`.
    pub fn values(&self) -> impl Iterator<Item = Option<f32>> + '_ {
        self.data.iter().map(|v| if v.is_nan() { None } else { Some(*v) })
    }
}

/// Statistics of an index raster restricted to one field.
///
/// Every `Option` is `None` exactly when `count == 0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZonalStats {
    /// Number of valid sample pixels inside the field.
    pub count: usize,
    pub mean: Option<f64>,
    pub median: Option<f64>,
    pub p10: Option<f64>,
    pub p90: Option<f64>,
    /// Geometric area of the field in CRS units squared.
    pub total_area: f64,
    /// Ground area represented by one sample (`scale²`).
    pub per_pixel_area: f64,
}

impl ZonalStats {
    /// Statistics for a field with no valid pixels.
    pub fn empty(total_area: f64, per_pixel_area: f64) -> Self {
        Self {
            count: 0,
            mean: None,
            median: None,
            p10: None,
            p90: None,
            total_area,
            per_pixel_area,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

/// Outcome of the grazing correction for one field.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GrazingResult {
    /// Share of the field at or below its own median, in percent.
    pub percent_grazed: Option<f64>,
    /// Mean index after excluding the grazed share, or the plain mean when
    /// grazing is below the threshold.
    pub effective_ndvi: Option<f64>,
    /// Whether the ungrazed-only mean was used.
    pub corrected: bool,
}

impl GrazingResult {
    pub fn no_data() -> Self {
        Self {
            percent_grazed: None,
            effective_ndvi: None,
            corrected: false,
        }
    }
}

/// Partial-grazing classification for one field.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PartialFlag {
    /// All distribution conditions hold. The area gate is not applied here.
    pub is_partial: bool,
    /// `p90 - p10`, `None` without data.
    pub spread: Option<f64>,
    /// Field area in hectares the flag was computed for.
    pub area_ha: f64,
}

impl PartialFlag {
    /// The flag as surfaced to callers: also requires the field to be
    /// larger than `min_area_ha`.
    pub fn passes_area_gate(&self, min_area_ha: f64) -> bool {
        self.is_partial && self.area_ha > min_area_ha
    }
}
