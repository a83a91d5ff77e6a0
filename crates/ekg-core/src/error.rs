//! Centralized error types for the EKG builder.

use thiserror::Error;

/// Main error type for EKG operations.
#[derive(Error, Debug)]
pub enum EkgError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Missing column '{column}' in table '{table}'")]
    MissingColumn { table: String, column: String },

    #[error("Unknown entity type referenced: {0}")]
    UnknownEntity(String),

    #[error("Unknown relation type referenced: {0}")]
    UnknownRelation(String),

    #[error("Failed to parse timestamp '{value}' with format '{format}'")]
    Timestamp { value: String, format: String },

    #[error("Sample error: {0}")]
    Sample(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Result type for EKG operations.
pub type EkgResult<T> = Result<T, EkgError>;

impl EkgError {
    /// Create a validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::ValidationError(msg.into())
    }

    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
