//! Default paths for blocker components
//!
//! Paths are user-writable by default:
//! - Config: `$XDG_CONFIG_HOME/blocker/config.toml` or `~/.config/blocker/config.toml`
//! - Data: `$XDG_DATA_HOME/blocker` or `~/.local/share/blocker`

use std::path::PathBuf;

/// Environment variable for overriding the config file path
pub const BLOCKER_CONFIG_ENV: &str = "BLOCKER_CONFIG";

/// Environment variable for overriding the data directory
pub const BLOCKER_DATA_DIR_ENV: &str = "BLOCKER_DATA_DIR";

/// Application subdirectory name
const APP_DIR: &str = "blocker";

/// Config filename within the config directory
const CONFIG_FILENAME: &str = "config.toml";

/// Database filename within the data directory
pub const DATABASE_FILENAME: &str = "blocker.db";

/// Get the default config file path.
///
/// Order of precedence:
/// 1. `$XDG_CONFIG_HOME/blocker/config.toml` (if XDG_CONFIG_HOME is set)
/// 2. `~/.config/blocker/config.toml` (fallback)
///
/// `$BLOCKER_CONFIG` is handled by the CLI argument parser.
pub fn default_config_path() -> PathBuf {
    if let Ok(config_home) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(config_home).join(APP_DIR).join(CONFIG_FILENAME);
    }

    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home)
            .join(".config")
            .join(APP_DIR)
            .join(CONFIG_FILENAME);
    }

    PathBuf::from("/tmp").join(APP_DIR).join(CONFIG_FILENAME)
}

/// Get the default data directory.
///
/// Order of precedence:
/// 1. `$XDG_DATA_HOME/blocker` (if XDG_DATA_HOME is set)
/// 2. `~/.local/share/blocker` (fallback)
///
/// `$BLOCKER_DATA_DIR` is handled by the CLI argument parser.
pub fn data_dir_without_env() -> PathBuf {
    if let Ok(data_home) = std::env::var("XDG_DATA_HOME") {
        return PathBuf::from(data_home).join(APP_DIR);
    }

    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home)
            .join(".local")
            .join("share")
            .join(APP_DIR);
    }

    // Last resort
    PathBuf::from("/tmp").join(APP_DIR).join("data")
}
