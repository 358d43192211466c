//! Error types for arbitration runs

use thiserror::Error;

/// Errors surfaced by construction, lookups and I/O.
///
/// Reaching the end of a trajectory is not an error: it finishes the run
/// with [`crate::sim::Termination::Exhausted`].
#[derive(Error, Debug)]
pub enum ArbiterError {
    #[error("Step {step} out of range: trajectory has {len} samples")]
    OutOfRange { step: usize, len: usize },

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ArbiterError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        ArbiterError::InvalidConfiguration(msg.into())
    }
}

/// Result type for arbitration operations
pub type Result<T> = std::result::Result<T, ArbiterError>;
