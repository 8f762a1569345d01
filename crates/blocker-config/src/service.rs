//! Validated service configuration

use crate::schema::RawConfig;
use blocker_util::data_dir_without_env;
use std::path::PathBuf;

/// Default days of usage history kept for summaries
pub const DEFAULT_HISTORY_DAYS: u32 = 7;

/// Default assumed session length behind launch estimates
pub const DEFAULT_SESSION_MINUTES: u32 = 3;

/// Service configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfig {
    pub data_dir: PathBuf,
    pub history_days: u32,
    pub session_minutes: u32,
}

impl ServiceConfig {
    /// Convert from raw config (after validation)
    pub fn from_raw(raw: RawConfig) -> Self {
        let defaults = Self::default();
        Self {
            data_dir: raw.service.data_dir.unwrap_or(defaults.data_dir),
            history_days: raw.service.history_days.unwrap_or(defaults.history_days),
            session_minutes: raw
                .service
                .session_minutes
                .unwrap_or(defaults.session_minutes),
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            data_dir: data_dir_without_env(),
            history_days: DEFAULT_HISTORY_DAYS,
            session_minutes: DEFAULT_SESSION_MINUTES,
        }
    }
}
