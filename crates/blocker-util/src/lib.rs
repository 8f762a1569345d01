//! Shared utilities for the app blocker
//!
//! This crate provides:
//! - ID types (PlanId, AppId)
//! - Time utilities (wall-clock time of day, daily windows, mock time)
//! - Error types
//! - Default paths for config and data directories

mod error;
mod ids;
mod paths;
mod time;

pub use error::*;
pub use ids::*;
pub use paths::*;
pub use time::*;
