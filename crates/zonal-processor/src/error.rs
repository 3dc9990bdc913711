//! Error types for index and zonal processing.

use thiserror::Error;

/// Errors that can occur while computing an index raster or reducing it.
///
/// Missing coverage is not an error: a field outside the raster yields
/// empty statistics instead.
#[derive(Error, Debug, PartialEq)]
pub enum ZonalError {
    /// The image does not carry a requested band.
    #[error("image '{image}' has no band '{band}'")]
    MissingBand { image: String, band: String },

    /// The two input bands use different pixel sizes.
    #[error("bands '{a}' and '{b}' have different pixel sizes")]
    ResolutionMismatch { a: String, b: String },

    /// The two input bands do not overlap.
    #[error("bands of image '{0}' do not overlap")]
    NoOverlap(String),

    /// The two input bands are in different CRSs.
    #[error("bands '{a}' ({a_crs}) and '{b}' ({b_crs}) are in different CRSs")]
    BandCrsMismatch {
        a: String,
        a_crs: String,
        b: String,
        b_crs: String,
    },

    /// Geometry and raster are in different CRSs.
    #[error("CRS mismatch: raster is {raster}, field '{field}' is {field_crs}")]
    CrsMismatch {
        raster: String,
        field: String,
        field_crs: String,
    },

    /// Sampling needs a raster in meters, not degrees.
    #[error("raster '{image}' is in geographic {crs}; zonal sampling needs a projected CRS")]
    GeographicRaster { image: String, crs: String },

    /// Sampling scale must be a positive distance.
    #[error("invalid sampling scale: {0}")]
    InvalidScale(f64),
}

/// Result type for zonal processing operations.
pub type Result<T> = std::result::Result<T, ZonalError>;
