//! Vegetation Index and Zonal Statistics for Field Polygons
//!
//! This crate turns a multi-band reflectance image into per-field numbers:
//!
//! - **Index raster**: normalized difference of two bands (NIR and red)
//! - **Zonal statistics**: mean, median and 10th/90th percentiles inside a polygon
//! - **Grazing correction**: mean of the ungrazed share when enough of the field sits at or below its median
//! - **Partial-grazing flag**: wide percentile spread with a high top and low bottom decile
//!
//! # Architecture
//!
//! ```text
//! RasterImage
//!      │
//!      ▼
//! compute_index(image, "B8", "B4")
//!      │
//!      ▼
//! IndexRaster ──► sample_zone(raster, field, scale) ──► ZoneSample
//!                                                          │
//!                         ┌────────────────────────────────┼───────────────────┐
//!                         ▼                                ▼                   ▼
//!                   ZonalStats ──────────────► correct_values()          classify()
//!                                                          │                   │
//!                                                          ▼                   ▼
//!                                                    GrazingResult        PartialFlag
//! ```
//!
//! Missing data is never a number: a field with no valid pixels yields
//! `None` for every statistic and every value derived from one.
//!
//! # Example
//!
//! ```ignore
//! use zonal_processor::{compute_index, sample_zone, correct_values, classify};
//!
//! let raster = compute_index(&image, "B8", "B4")?;
//! let sample = sample_zone(&raster, &field, 10.0)?;
//! let stats = sample.stats();
//! let grazing = correct_values(sample.values(), &stats, &GrazingConfig::default());
//! let flag = classify(&stats, field.area_ha, &PartialGrazingConfig::default());
//! ```

pub mod classify;
pub mod config;
pub mod error;
pub mod grazing;
pub mod index;
pub mod types;
pub mod zonal;

// Re-export commonly used types at crate root
pub use classify::classify;
pub use config::{GrazingConfig, PartialGrazingConfig};
pub use error::{Result, ZonalError};
pub use grazing::{correct, correct_values};
pub use index::{compute_from_bands, compute_index, normalized_difference, DEFAULT_NIR_BAND, DEFAULT_RED_BAND};
pub use types::{GrazingResult, IndexRaster, PartialFlag, ZonalStats};
pub use zonal::{percentile, reduce, sample_zone, ZoneSample};
