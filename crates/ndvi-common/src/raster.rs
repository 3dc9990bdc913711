//! Georeferenced raster types shared by the catalog and the analysis engine.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::bbox::BoundingBox;
use crate::crs::Crs;

/// Affine georeference of a north-up grid.
///
/// `origin` is the outer top-left corner of pixel (0, 0). Columns increase
/// eastward by `pixel_width`, rows increase southward by `pixel_height`
/// (both stored positive).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    pub origin_x: f64,
    pub origin_y: f64,
    pub pixel_width: f64,
    pub pixel_height: f64,
}

impl GeoTransform {
    pub fn new(origin_x: f64, origin_y: f64, pixel_width: f64, pixel_height: f64) -> Self {
        Self {
            origin_x,
            origin_y,
            pixel_width,
            pixel_height,
        }
    }

    /// Square pixels of side `size`.
    pub fn square(origin_x: f64, origin_y: f64, size: f64) -> Self {
        Self::new(origin_x, origin_y, size, size)
    }

    /// Coordinates of the centre of a pixel.
    pub fn pixel_center(&self, col: usize, row: usize) -> (f64, f64) {
        (
            self.origin_x + (col as f64 + 0.5) * self.pixel_width,
            self.origin_y - (row as f64 + 0.5) * self.pixel_height,
        )
    }

    /// Fractional (col, row) of a coordinate. May be negative or past the grid.
    pub fn to_pixel(&self, x: f64, y: f64) -> (f64, f64) {
        (
            (x - self.origin_x) / self.pixel_width,
            (self.origin_y - y) / self.pixel_height,
        )
    }

    /// Extent of a `width` x `height` grid.
    pub fn bbox(&self, width: usize, height: usize) -> BoundingBox {
        BoundingBox::new(
            self.origin_x,
            self.origin_y - height as f64 * self.pixel_height,
            self.origin_x + width as f64 * self.pixel_width,
            self.origin_y,
        )
    }

    /// Area of one pixel in CRS units squared.
    pub fn pixel_area(&self) -> f64 {
        self.pixel_width * self.pixel_height
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum RasterError {
    #[error("band '{band}' has {actual} values, expected {expected}")]
    ShapeMismatch {
        band: String,
        expected: usize,
        actual: usize,
    },

    #[error("band '{0}' has a non-positive pixel size")]
    InvalidTransform(String),
}

/// One band of a raster: a row-major grid of reflectance values.
#[derive(Debug, Clone)]
pub struct Band {
    pub name: String,
    pub width: usize,
    pub height: usize,
    pub transform: GeoTransform,
    pub crs: Crs,
    /// Sentinel marking undefined pixels, in addition to NaN.
    pub nodata: Option<f32>,
    data: Vec<f32>,
}

impl Band {
    pub fn new(
        name: impl Into<String>,
        width: usize,
        height: usize,
        transform: GeoTransform,
        crs: Crs,
        data: Vec<f32>,
    ) -> Result<Self, RasterError> {
        let name = name.into();
        let expected = width * height;
        if data.len() != expected {
            return Err(RasterError::ShapeMismatch {
                band: name,
                expected,
                actual: data.len(),
            });
        }
        if !(transform.pixel_width > 0.0 && transform.pixel_height > 0.0) {
            return Err(RasterError::InvalidTransform(name));
        }

        Ok(Self {
            name,
            width,
            height,
            transform,
            crs,
            nodata: None,
            data,
        })
    }

    pub fn with_nodata(mut self, nodata: f32) -> Self {
        self.nodata = Some(nodata);
        self
    }

    /// Value at a grid cell, or `None` when outside the grid or undefined.
    pub fn value(&self, col: usize, row: usize) -> Option<f32> {
        if col >= self.width || row >= self.height {
            return None;
        }
        let v = self.data[row * self.width + col];
        if v.is_nan() || self.nodata == Some(v) {
            None
        } else {
            Some(v)
        }
    }

    /// Value of the pixel containing a coordinate.
    pub fn value_at(&self, x: f64, y: f64) -> Option<f32> {
        let (fc, fr) = self.transform.to_pixel(x, y);
        if fc < 0.0 || fr < 0.0 {
            return None;
        }
        self.value(fc.floor() as usize, fr.floor() as usize)
    }

    pub fn bbox(&self) -> BoundingBox {
        self.transform.bbox(self.width, self.height)
    }

    /// Raw values including undefined markers.
    pub fn data(&self) -> &[f32] {
        &self.data
    }
}

/// Catalog-level description of an image, resolved without pixel data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageDescriptor {
    pub id: String,
    pub captured_at: DateTime<Utc>,
    /// Scene-level cloudy pixel percentage, 0-100.
    pub cloud_pct: f64,
    /// Footprint in WGS84 lon/lat.
    pub footprint: BoundingBox,
    /// CRS the band grids are delivered in.
    pub crs: Crs,
}

/// An image with (some of) its bands loaded.
#[derive(Debug, Clone)]
pub struct RasterImage {
    pub descriptor: ImageDescriptor,
    bands: HashMap<String, Band>,
}

impl RasterImage {
    pub fn new(descriptor: ImageDescriptor, bands: Vec<Band>) -> Self {
        Self {
            descriptor,
            bands: bands.into_iter().map(|b| (b.name.clone(), b)).collect(),
        }
    }

    pub fn id(&self) -> &str {
        &self.descriptor.id
    }

    pub fn band(&self, name: &str) -> Option<&Band> {
        self.bands.get(name)
    }

    pub fn band_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.bands.keys().map(|k| k.as_str()).collect();
        names.sort_unstable();
        names
    }
}
