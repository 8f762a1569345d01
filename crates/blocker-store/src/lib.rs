//! Persistence layer for the app blocker
//!
//! Provides:
//! - The current-plan document slot
//! - Usage history (per app/day)
//! - Audit log (append-only)

mod audit;
mod sqlite;
mod traits;

pub use audit::*;
pub use sqlite::*;
pub use traits::*;

use blocker_config::PlanError;
use blocker_util::BlockerError;
use thiserror::Error;

/// Store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Stored plan document is invalid: {0}")]
    InvalidDocument(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Database(e.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}

impl From<PlanError> for StoreError {
    fn from(e: PlanError) -> Self {
        StoreError::InvalidDocument(e.to_string())
    }
}

impl From<StoreError> for BlockerError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::InvalidDocument(msg) => BlockerError::InvalidPlan(msg),
            other => BlockerError::StoreError(other.to_string()),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
