//! Error types for BetterRest

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading or evaluating a prediction model
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Cannot read model artifact {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid model JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unsupported model format: expected {expected}, got {actual}")]
    InvalidFormatVersion { expected: String, actual: String },

    #[error("Model shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("Model evaluation failed: {0}")]
    Evaluation(String),
}

/// Errors that can occur during bedtime estimation
#[derive(Debug, Error)]
pub enum EstimationError {
    #[error("Model unavailable: {0}")]
    ModelUnavailable(#[from] ModelError),
}

/// Errors raised while parsing user-entered values at the outer surfaces
#[derive(Debug, Error)]
pub enum InputError {
    #[error("Invalid wake time '{0}': expected HH:MM")]
    InvalidWakeTime(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(#[from] serde_json::Error),
}
