//! Error types for the analysis pipeline

use thiserror::Error;

/// Result type alias used throughout the crate
pub type Result<T> = std::result::Result<T, AnalystError>;

/// Main error type for the analysis pipeline
#[derive(Error, Debug)]
pub enum AnalystError {
    #[error("Load error: {0}")]
    LoadError(String),

    #[error("Data error: {0}")]
    DataError(String),

    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    #[error("Preprocessing error: {0}")]
    PreprocessingError(String),

    #[error("Training error: {0}")]
    TrainingError(String),

    #[error("Model not fitted")]
    ModelNotFitted,

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<polars::error::PolarsError> for AnalystError {
    fn from(err: polars::error::PolarsError) -> Self {
        AnalystError::DataError(err.to_string())
    }
}

impl From<serde_json::Error> for AnalystError {
    fn from(err: serde_json::Error) -> Self {
        AnalystError::SerializationError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for AnalystError {
    fn from(err: ndarray::ShapeError) -> Self {
        AnalystError::ShapeError {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}
