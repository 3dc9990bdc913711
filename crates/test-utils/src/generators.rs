//! Test data generators for synthetic reflectance imagery.
//!
//! Bands are built backwards from a target index grid, so a test can state
//! the NDVI it expects and get NIR/red reflectances that produce exactly it.

use chrono::{DateTime, Utc};
use ndvi_common::{Band, RasterImage};

use crate::fixtures::{descriptor, fixture_transform, PLANAR_CRS};

/// Default NIR band name (Sentinel-2 B8).
pub const NIR: &str = "B8";

/// Default red band name (Sentinel-2 B4).
pub const RED: &str = "B4";

/// Reflectance pair `(nir, red)` summing to `total` whose normalized
/// difference is `ndvi`.
///
/// # Example
///
/// ```
/// use test_utils::reflectance_for_ndvi;
///
/// let (nir, red) = reflectance_for_ndvi(0.5, 0.4);
/// assert!(((nir - red) / (nir + red) - 0.5).abs() < 1e-6);
/// ```
pub fn reflectance_for_ndvi(ndvi: f32, total: f32) -> (f32, f32) {
    (total * (1.0 + ndvi) / 2.0, total * (1.0 - ndvi) / 2.0)
}

/// Creates a grid filled with a constant value.
pub fn create_constant_grid(width: usize, height: usize, value: f32) -> Vec<f32> {
    vec![value; width * height]
}

/// Creates a grid whose left `split_col` columns hold `left` and the rest `right`.
///
/// This mimics a strip-grazed paddock: one side eaten down, one side not.
pub fn create_split_grid(width: usize, height: usize, split_col: usize, left: f32, right: f32) -> Vec<f32> {
    let mut data = Vec::with_capacity(width * height);
    for _row in 0..height {
        for col in 0..width {
            data.push(if col < split_col { left } else { right });
        }
    }
    data
}

/// Creates a grid rising linearly from `start` at column 0 to `end` at the last column.
pub fn create_gradient_grid(width: usize, height: usize, start: f32, end: f32) -> Vec<f32> {
    let span = (width.max(2) - 1) as f32;
    let mut data = Vec::with_capacity(width * height);
    for _row in 0..height {
        for col in 0..width {
            data.push(start + (end - start) * col as f32 / span);
        }
    }
    data
}

/// Creates a grid of deterministic pseudo-random values in `[min, max)`.
pub fn create_noise_grid(width: usize, height: usize, min: f32, max: f32, seed: u32) -> Vec<f32> {
    let mut data = Vec::with_capacity(width * height);
    for row in 0..height {
        for col in 0..width {
            let hash = simple_hash(col as u32, row as u32, seed);
            let unit = (hash % 10_000) as f32 / 10_000.0;
            data.push(min + (max - min) * unit);
        }
    }
    data
}

/// Simple deterministic hash for reproducible test data.
fn simple_hash(x: u32, y: u32, seed: u32) -> u32 {
    let mut h = seed;
    h = h.wrapping_mul(31).wrapping_add(x);
    h = h.wrapping_mul(31).wrapping_add(y);
    h ^= h >> 16;
    h = h.wrapping_mul(0x85ebca6b);
    h ^= h >> 13;
    h = h.wrapping_mul(0xc2b2ae35);
    h ^= h >> 16;
    h
}

/// NIR and red bands on the fixture grid reproducing `ndvi`.
///
/// NaN entries become a zero/zero pixel, which the index computer must
/// report as no data.
pub fn bands_from_ndvi(ndvi: &[f32], width: usize, height: usize) -> (Band, Band) {
    let mut nir = Vec::with_capacity(ndvi.len());
    let mut red = Vec::with_capacity(ndvi.len());
    for &v in ndvi {
        let (n, r) = if v.is_nan() {
            (0.0, 0.0)
        } else {
            reflectance_for_ndvi(v, 0.5)
        };
        nir.push(n);
        red.push(r);
    }

    let transform = fixture_transform();
    (
        Band::new(NIR, width, height, transform, PLANAR_CRS, nir).expect("fixture band"),
        Band::new(RED, width, height, transform, PLANAR_CRS, red).expect("fixture band"),
    )
}

/// A fixture image whose NIR/red bands reproduce `ndvi`.
pub fn image_from_ndvi(
    id: &str,
    captured_at: DateTime<Utc>,
    cloud_pct: f64,
    ndvi: &[f32],
    width: usize,
    height: usize,
) -> RasterImage {
    let (nir, red) = bands_from_ndvi(ndvi, width, height);
    RasterImage::new(descriptor(id, captured_at, cloud_pct), vec![nir, red])
}
