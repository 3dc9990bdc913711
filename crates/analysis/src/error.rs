//! Error types for analysis runs.

use imagery::CatalogError;
use ndvi_common::FieldError;
use thiserror::Error;
use zonal_processor::ZonalError;

/// Errors that abort a run.
///
/// Missing imagery and fields without coverage are not errors; they show up
/// in the run outcome instead.
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// Bad or missing field boundaries.
    #[error("field input error: {0}")]
    Field(#[from] FieldError),

    /// Catalog failure, including exhausted retries.
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("processing error: {0}")]
    Zonal(#[from] ZonalError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("export error: {0}")]
    Export(String),

    /// A worker task panicked or was cancelled.
    #[error("worker error: {0}")]
    Worker(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AnalysisError {
    pub fn config(message: impl Into<String>) -> Self {
        AnalysisError::Config(message.into())
    }

    /// Whether the run failed because the catalog could not be reached.
    pub fn is_catalog_unavailable(&self) -> bool {
        matches!(self, AnalysisError::Catalog(CatalogError::Unavailable { .. }))
    }
}

impl From<csv::Error> for AnalysisError {
    fn from(e: csv::Error) -> Self {
        AnalysisError::Export(e.to_string())
    }
}

impl From<tokio::task::JoinError> for AnalysisError {
    fn from(e: tokio::task::JoinError) -> Self {
        AnalysisError::Worker(e.to_string())
    }
}

/// Result type for analysis operations.
pub type Result<T> = std::result::Result<T, AnalysisError>;
