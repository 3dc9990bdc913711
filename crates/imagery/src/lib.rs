//! Raster catalog adapters for paddock NDVI analysis.
//!
//! Provides:
//! - The [`RasterCatalog`] contract: descriptor search plus lazy band loading
//! - [`RetryingCatalog`] for exponential backoff on transient failures
//! - [`LocalCatalog`] reading scene manifests and raw band files from disk
//! - [`MemoryCatalog`] over images already in memory

pub mod catalog;
pub mod error;
pub mod local;
pub mod memory;
pub mod retry;

pub use catalog::{sort_newest_first, CatalogQuery, RasterCatalog};
pub use error::{CatalogError, Result};
pub use local::{LocalCatalog, SceneManifest, MANIFEST_FILE};
pub use memory::MemoryCatalog;
pub use retry::{RetryPolicy, RetryingCatalog};
