//! Error types for field boundaries and run inputs.

use thiserror::Error;

/// Result type alias using FieldError.
pub type FieldResult<T> = Result<T, FieldError>;

/// Errors raised while loading or validating the field collection.
///
/// All of these are fatal for a run: no partial output is produced.
#[derive(Debug, Error)]
pub enum FieldError {
    #[error("Invalid geometry for field '{field}': {message}")]
    InvalidGeometry { field: String, message: String },

    #[error("Duplicate field name: {0}")]
    DuplicateField(String),

    #[error("Field collection is empty")]
    EmptyFieldSet,

    #[error("Fields use more than one CRS: {0} and {1}")]
    MixedCrs(String, String),

    #[error("Unsupported CRS: {0}")]
    UnsupportedCrs(String),

    #[error("Cannot convert field '{field}' from {from} to {to}")]
    Reprojection {
        field: String,
        from: String,
        to: String,
    },

    #[error("Malformed boundary document: {0}")]
    Malformed(String),
}

impl FieldError {
    /// Create an InvalidGeometry error.
    pub fn invalid_geometry(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidGeometry {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for FieldError {
    fn from(err: serde_json::Error) -> Self {
        FieldError::Malformed(err.to_string())
    }
}
