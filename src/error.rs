//! Error types for Prior Flux

use crate::source::FetchError;
use thiserror::Error;

/// Errors that can occur during computation
#[derive(Debug, Error)]
pub enum ComputeError {
    #[error("Missing required raw columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error(
        "Output columns do not match the documented schema (missing: [{}], extra: [{}])",
        .missing.join(", "),
        .extra.join(", ")
    )]
    SchemaMismatch {
        missing: Vec<String>,
        extra: Vec<String>,
    },

    #[error("Column '{column}' has {actual} rows, expected {expected}")]
    LengthMismatch {
        column: String,
        expected: usize,
        actual: usize,
    },

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("Invalid CSV: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Encoding error: {0}")]
    EncodingError(String),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),
}

impl ComputeError {
    /// True for errors raised by the column contract checks
    pub fn is_schema_error(&self) -> bool {
        matches!(
            self,
            ComputeError::MissingColumns(_) | ComputeError::SchemaMismatch { .. }
        )
    }
}
