//! Error types for the app blocker

use thiserror::Error;

/// Core error type for blocker operations
#[derive(Debug, Error)]
pub enum BlockerError {
    /// Negative durations, malformed times, and similar caller mistakes
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A plan that fails validation
    #[error("Invalid plan: {0}")]
    InvalidPlan(String),

    /// No current plan when one is required
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Store error: {0}")]
    StoreError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl BlockerError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, BlockerError>;
