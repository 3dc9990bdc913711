//! Paddock NDVI analysis runs.
//!
//! Ties the pieces together for one run:
//! - [`AnalysisConfig`]: windows, thresholds and worker settings
//! - [`load_fields`]: field boundaries from GeoJSON
//! - [`ImageSelector`]: newest usable images from a catalog
//! - [`Orchestrator`]: index once per image, then every field in parallel
//! - [`write_records_file`] / [`write_partial_file`]: CSV output
//!
//! # Example
//!
//! ```ignore
//! let catalog = RetryingCatalog::new(LocalCatalog::open("scenes").await?, config.retry.policy());
//! let fields = load_fields("paddocks.geojson").await?;
//! let outcome = Orchestrator::new(catalog, config)?.run(&fields).await?;
//! if outcome.has_imagery() {
//!     write_records_file("ndvi_data.csv", &outcome.records)?;
//! }
//! ```

pub mod boundaries;
pub mod config;
pub mod error;
pub mod export;
pub mod orchestrator;
pub mod selector;

pub use boundaries::{load_fields, parse_fields};
pub use config::{AnalysisConfig, RetryConfig};
pub use error::{AnalysisError, Result};
pub use export::{
    format_value, write_partial, write_partial_file, write_records, write_records_file,
    PARTIAL_COLUMNS, RECORD_COLUMNS,
};
pub use orchestrator::{analyze_field, dedupe_records, Orchestrator, RunOutcome, RunStatus};
pub use selector::{ImageSelector, Selection};
