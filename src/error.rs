//! Error handling for the fake news detector application

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DetectorError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Model loading error: {0}")]
    ModelLoading(String),

    #[error("Model error: {0}")]
    ModelError(String),

    #[error("Inference error: {0}")]
    Inference(String),

    #[error("Headline fetch error: {0}")]
    ExternalFetch(String),

    #[error("Please enter content to check")]
    EmptyInput,

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Model not found: {0}")]
    ModelNotFound(String),
}

pub type Result<T> = std::result::Result<T, DetectorError>;

/// Convert anyhow errors to our custom error type
impl From<anyhow::Error> for DetectorError {
    fn from(err: anyhow::Error) -> Self {
        DetectorError::Inference(err.to_string())
    }
}

/// Convert candle core errors to our custom error type
impl From<candle_core::Error> for DetectorError {
    fn from(err: candle_core::Error) -> Self {
        DetectorError::ModelError(err.to_string())
    }
}
