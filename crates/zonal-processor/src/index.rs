//! Normalized-difference vegetation index computation.

use ndvi_common::{Band, GeoTransform, RasterImage};
use rayon::prelude::*;
use tracing::debug;

use crate::error::{Result, ZonalError};
use crate::types::IndexRaster;

/// Near-infrared band of Sentinel-2 (10 m).
pub const DEFAULT_NIR_BAND: &str = "B8";

/// Red band of Sentinel-2 (10 m).
pub const DEFAULT_RED_BAND: &str = "B4";

/// Pixel sizes closer than this are treated as equal.
const PIXEL_SIZE_TOLERANCE: f64 = 1e-9;

/// Compute `(a - b) / (a + b)` over two bands of `image`.
///
/// The output grid covers the overlap of the two band grids at their common
/// pixel size. A pixel is no data when either band is undefined there, when
/// either reflectance is negative, or when `a + b == 0`.
pub fn compute_index(image: &RasterImage, band_a: &str, band_b: &str) -> Result<IndexRaster> {
    let a = image.band(band_a).ok_or_else(|| ZonalError::MissingBand {
        image: image.id().to_string(),
        band: band_a.to_string(),
    })?;
    let b = image.band(band_b).ok_or_else(|| ZonalError::MissingBand {
        image: image.id().to_string(),
        band: band_b.to_string(),
    })?;

    compute_from_bands(image.id(), a, b)
}

/// [`compute_index`] on explicit bands.
pub fn compute_from_bands(image_id: &str, a: &Band, b: &Band) -> Result<IndexRaster> {
    if a.crs != b.crs {
        return Err(ZonalError::BandCrsMismatch {
            a: a.name.clone(),
            a_crs: a.crs.to_string(),
            b: b.name.clone(),
            b_crs: b.crs.to_string(),
        });
    }

    let (ta, tb) = (&a.transform, &b.transform);
    if (ta.pixel_width - tb.pixel_width).abs() > PIXEL_SIZE_TOLERANCE
        || (ta.pixel_height - tb.pixel_height).abs() > PIXEL_SIZE_TOLERANCE
    {
        return Err(ZonalError::ResolutionMismatch {
            a: a.name.clone(),
            b: b.name.clone(),
        });
    }

    let overlap = a
        .bbox()
        .intersection(&b.bbox())
        .ok_or_else(|| ZonalError::NoOverlap(image_id.to_string()))?;

    let width = (overlap.width() / ta.pixel_width).round() as usize;
    let height = (overlap.height() / ta.pixel_height).round() as usize;
    if width == 0 || height == 0 {
        return Err(ZonalError::NoOverlap(image_id.to_string()));
    }

    let transform = GeoTransform::new(overlap.min_x, overlap.max_y, ta.pixel_width, ta.pixel_height);

    let mut data = vec![f32::NAN; width * height];
    data.par_chunks_mut(width)
        .enumerate()
        .for_each(|(row, out_row)| {
            for (col, out) in out_row.iter_mut().enumerate() {
                let (x, y) = transform.pixel_center(col, row);
                *out = normalized_difference(a.value_at(x, y), b.value_at(x, y))
                    .unwrap_or(f32::NAN);
            }
        });

    let raster = IndexRaster::new(image_id.to_string(), width, height, transform, a.crs, data);

    debug!(
        image = %image_id,
        width,
        height,
        valid = raster.valid_count(),
        "Computed index raster"
    );

    Ok(raster)
}

/// Normalized difference of one pixel, `None` when undefined.
///
/// With both reflectances non-negative the result is always within `[-1, 1]`.
#[inline]
pub fn normalized_difference(a: Option<f32>, b: Option<f32>) -> Option<f32> {
    let (a, b) = (f64::from(a?), f64::from(b?));
    if a < 0.0 || b < 0.0 {
        return None;
    }

    let sum = a + b;
    if sum == 0.0 {
        return None;
    }

    let v = (a - b) / sum;
    if v.is_finite() {
        Some(v.clamp(-1.0, 1.0) as f32)
    } else {
        None
    }
}
