//! Error types for the analytics pipeline
//!
//! Structural problems (empty corpus, inconsistent embedding widths, an
//! all-noise clustering) abort a stage and surface here. Per-cluster and
//! per-metric data insufficiency is not an error: those degrade locally
//! and are recorded on the stage output instead.

use thiserror::Error;

/// Result type alias for analytics operations
pub type Result<T> = std::result::Result<T, AnalyticsError>;

/// Pipeline-wide error type
#[derive(Debug, Error)]
pub enum AnalyticsError {
    #[error("empty input: no items to process")]
    EmptyInput,

    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("no clusters: every item is labeled noise")]
    NoClusters,

    #[error("invalid parameter '{name}': {message}")]
    InvalidParameter {
        name: &'static str,
        message: String,
    },

    #[error("internal error: {0}")]
    Internal(String),
}

impl AnalyticsError {
    pub fn invalid_parameter(name: &'static str, message: impl Into<String>) -> Self {
        AnalyticsError::InvalidParameter {
            name,
            message: message.into(),
        }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        AnalyticsError::Internal(msg.into())
    }
}
