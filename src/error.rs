//! Error taxonomy for degradation checks
//!
//! Configuration problems and malformed models are hard errors. Numerical
//! degeneracies (zero baselines, NaN from ill-conditioned fits) are never
//! surfaced here; they are absorbed by `safe_division` and NaN coercion.

use thiserror::Error;

/// Errors that can occur while checking two profiles for performance changes
#[derive(Error, Debug)]
pub enum CheckError {
    #[error("Malformed model for '{uid}': {reason}")]
    MalformedModel { uid: String, reason: String },

    #[error("Unknown detection strategy: {0}")]
    UnknownStrategy(String),

    #[error("Unknown models strategy: {0}")]
    UnknownModelsStrategy(String),

    #[error(
        "No applicable detection strategy for collector '{collector}' (postprocessors: [{postprocessors}])"
    )]
    NoApplicableStrategy {
        collector: String,
        postprocessors: String,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Missing {kind} model for '{uid}' in target profile")]
    MissingModel { uid: String, kind: String },

    #[error("Model fitting failed: {0}")]
    Fit(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CheckError {
    /// Shorthand for [`CheckError::MalformedModel`]
    pub fn malformed(uid: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedModel {
            uid: uid.into(),
            reason: reason.into(),
        }
    }
}

/// Result type for degradation checks
pub type Result<T> = std::result::Result<T, CheckError>;
