//! Error handling for the CV matcher

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CvMatcherError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Vocabulary error: {0}")]
    Vocabulary(String),

    #[error("Embedding generation error: {0}")]
    Embedding(String),

    #[error("Entity recognition error: {0}")]
    EntityRecognition(String),

    #[error("Model loading error: {0}")]
    ModelLoading(String),

    #[error("Model error: {0}")]
    ModelError(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("File format not supported: {0}")]
    UnsupportedFormat(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Processing error: {0}")]
    Processing(String),
}

pub type Result<T> = std::result::Result<T, CvMatcherError>;

/// Convert anyhow errors (raised by model2vec) to our custom error type
impl From<anyhow::Error> for CvMatcherError {
    fn from(err: anyhow::Error) -> Self {
        CvMatcherError::Processing(err.to_string())
    }
}

/// Convert candle core errors to our custom error type
impl From<candle_core::Error> for CvMatcherError {
    fn from(err: candle_core::Error) -> Self {
        CvMatcherError::ModelError(err.to_string())
    }
}
