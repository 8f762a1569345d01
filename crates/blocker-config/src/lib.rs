//! Plan documents and configuration for the app blocker
//!
//! Supports:
//! - Versioned JSON plan documents with canonical `HH:MM:SS` times
//! - Plan validation with every problem reported at once
//! - The validated `BlockPlan` / `AppRule` model used by the engine
//! - TOML service configuration

mod plan;
mod schema;
mod service;
mod validation;

pub use plan::*;
pub use schema::*;
pub use service::*;
pub use validation::*;

use blocker_util::BlockerError;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

/// Current supported plan document version
pub const CURRENT_DOCUMENT_VERSION: u32 = 1;

/// Current supported config version
pub const CURRENT_CONFIG_VERSION: u32 = 1;

/// Plan document errors
#[derive(Debug, Error)]
pub enum PlanError {
    #[error("Malformed plan document: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Plan validation failed: {}", join_errors(.errors))]
    ValidationFailed { errors: Vec<ValidationError> },

    #[error("Unsupported plan document version: {0}")]
    UnsupportedVersion(u32),
}

pub type PlanResult<T> = Result<T, PlanError>;

impl From<PlanError> for BlockerError {
    fn from(e: PlanError) -> Self {
        BlockerError::InvalidPlan(e.to_string())
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.errors))]
    ValidationFailed { errors: Vec<ValidationError> },

    #[error("Unsupported config version: {0}")]
    UnsupportedVersion(u32),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

impl From<ConfigError> for BlockerError {
    fn from(e: ConfigError) -> Self {
        BlockerError::ConfigError(e.to_string())
    }
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Parse and validate a plan document from JSON
pub fn parse_plan_document(content: &str) -> PlanResult<BlockPlan> {
    let raw: RawPlanDocument = serde_json::from_str(content)?;
    plan_from_document(raw)
}

/// Validate a raw document and convert it into a plan
pub fn plan_from_document(raw: RawPlanDocument) -> PlanResult<BlockPlan> {
    if raw.document_version != CURRENT_DOCUMENT_VERSION {
        return Err(PlanError::UnsupportedVersion(raw.document_version));
    }

    let errors = validate_plan_document(&raw);
    if !errors.is_empty() {
        debug!(error_count = errors.len(), "Plan document rejected");
        return Err(PlanError::ValidationFailed { errors });
    }

    Ok(BlockPlan::from_raw(raw))
}

/// Give a document without an id the one it would get on import.
/// Returns whether an id was filled in.
pub fn fill_missing_id(raw: &mut RawPlanDocument, new_id: impl FnOnce() -> String) -> bool {
    if raw.id.as_deref().is_some_and(|id| !id.trim().is_empty()) {
        return false;
    }
    raw.id = Some(new_id());
    true
}

/// Serialize a plan to its JSON document form
pub fn plan_to_json(plan: &BlockPlan) -> PlanResult<String> {
    Ok(serde_json::to_string_pretty(&plan.to_document())?)
}

/// Load and validate configuration from a TOML file
pub fn load_config(path: impl AsRef<Path>) -> ConfigResult<ServiceConfig> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Load configuration, falling back to defaults when the file does not exist
pub fn load_config_or_default(path: impl AsRef<Path>) -> ConfigResult<ServiceConfig> {
    let path = path.as_ref();
    if !path.exists() {
        info!(config_path = %path.display(), "No config file, using defaults");
        return Ok(ServiceConfig::default());
    }
    load_config(path)
}

/// Parse and validate configuration from a TOML string
pub fn parse_config(content: &str) -> ConfigResult<ServiceConfig> {
    let raw: RawConfig = toml::from_str(content)?;

    if raw.config_version != CURRENT_CONFIG_VERSION {
        return Err(ConfigError::UnsupportedVersion(raw.config_version));
    }

    let errors = validate_config(&raw);
    if !errors.is_empty() {
        return Err(ConfigError::ValidationFailed { errors });
    }

    Ok(ServiceConfig::from_raw(raw))
}
