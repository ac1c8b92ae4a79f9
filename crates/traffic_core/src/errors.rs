//! Error types for traffic condition prediction

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading an artifact or running an interaction
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TrafficError {
    /// The model artifact could not be read, parsed or verified.
    /// Fatal: there is no meaningful behavior without a model.
    #[error("Failed to load model artifact {path}: {reason}")]
    ArtifactLoadFailure { path: PathBuf, reason: String },

    /// A categorical value has no entry in the closed enumeration
    #[error("Unknown category {value:?} for column {column}")]
    UnknownCategory { column: String, value: String },

    /// The assembled record does not match the artifact's declared input
    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    /// The estimator failed while predicting
    #[error("Prediction failed: {0}")]
    PredictionFailure(String),

    /// A collected value lies outside its declared range
    #[error("{field} = {value} is outside the allowed range [{min}, {max}]")]
    InputRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl TrafficError {
    /// Whether this error must abort the session instead of a single interaction
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            TrafficError::ArtifactLoadFailure { .. } | TrafficError::Config(_)
        )
    }

    pub(crate) fn load_failure(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        TrafficError::ArtifactLoadFailure {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

impl From<config::ConfigError> for TrafficError {
    fn from(err: config::ConfigError) -> Self {
        TrafficError::Config(err.to_string())
    }
}

/// Result type for traffic prediction operations
pub type Result<T> = std::result::Result<T, TrafficError>;
