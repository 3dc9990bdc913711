//! Error types for raster catalogs.

use std::io::ErrorKind;

use ndvi_common::RasterError;
use thiserror::Error;

/// Errors returned by a [`RasterCatalog`](crate::RasterCatalog).
#[derive(Error, Debug)]
pub enum CatalogError {
    /// Server-side or network failure that may succeed on retry.
    #[error("transient catalog failure: {0}")]
    Transient(String),

    /// The requested image or band does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The catalog returned data that cannot be used.
    #[error("invalid catalog data: {0}")]
    Invalid(String),

    /// Transient failures persisted through every retry.
    #[error("catalog unavailable after {attempts} attempts: {message}")]
    Unavailable { attempts: u32, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CatalogError {
    /// Whether the operation is worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            CatalogError::Transient(_) => true,
            CatalogError::Io(e) => matches!(
                e.kind(),
                ErrorKind::TimedOut
                    | ErrorKind::Interrupted
                    | ErrorKind::WouldBlock
                    | ErrorKind::ConnectionReset
                    | ErrorKind::ConnectionAborted
                    | ErrorKind::ConnectionRefused
            ),
            _ => false,
        }
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        CatalogError::NotFound(what.into())
    }

    pub fn invalid(what: impl Into<String>) -> Self {
        CatalogError::Invalid(what.into())
    }
}

impl From<serde_json::Error> for CatalogError {
    fn from(e: serde_json::Error) -> Self {
        CatalogError::Invalid(e.to_string())
    }
}

impl From<RasterError> for CatalogError {
    fn from(e: RasterError) -> Self {
        CatalogError::Invalid(e.to_string())
    }
}

/// Result type for catalog operations.
pub type Result<T> = std::result::Result<T, CatalogError>;
