//! Raw document shapes, as read from disk before validation

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Raw plan document (JSON)
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RawPlanDocument {
    /// Document schema version
    pub document_version: u32,

    /// Plan id; hand-written documents may leave it out until import
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Display name
    pub name: String,

    /// Daily block window
    pub window: RawWindow,

    /// Per-app rules. A list rather than a map so duplicates can be reported.
    #[serde(default)]
    pub rules: Vec<RawAppRule>,

    #[serde(default = "default_true")]
    pub active: bool,
}

/// Block window with `HH:MM:SS` boundaries
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RawWindow {
    pub start: String,
    pub end: String,
}

/// Per-app rule
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RawAppRule {
    /// Stable app identifier (package name)
    pub app_id: String,

    /// Label shown to the user; falls back to the app id
    #[serde(default)]
    pub display_name: String,

    /// Allowance outside the window, in minutes. 0 = no separate limit.
    #[serde(default)]
    pub daily_limit_minutes: i64,

    #[serde(default = "default_true")]
    pub blocked_in_window: bool,
}

fn default_true() -> bool {
    true
}

/// Raw service configuration as parsed from TOML
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawConfig {
    /// Config schema version
    pub config_version: u32,

    #[serde(default)]
    pub service: RawServiceConfig,
}

/// Service-level settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawServiceConfig {
    /// Data directory for the store
    pub data_dir: Option<PathBuf>,

    /// Days of usage history to retain (default: 7)
    pub history_days: Option<u32>,

    /// Assumed average session length for launch estimates (default: 3)
    pub session_minutes: Option<u32>,
}
