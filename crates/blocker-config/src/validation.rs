//! Plan and config validation

use crate::schema::{RawConfig, RawPlanDocument, RawWindow};
use blocker_util::WallClock;
use std::collections::HashSet;
use thiserror::Error;

/// Validation error
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Plan id is missing")]
    MissingId,

    #[error("Plan name cannot be empty")]
    EmptyName,

    #[error("Rule with an empty app id")]
    EmptyAppId,

    #[error("Duplicate app id: {0}")]
    DuplicateAppId(String),

    #[error("App '{app_id}': daily limit {minutes} cannot be negative")]
    NegativeLimit { app_id: String, minutes: i64 },

    #[error("App '{app_id}': daily limit {minutes} is too large")]
    LimitTooLarge { app_id: String, minutes: i64 },

    #[error("Invalid time format '{value}': {message}")]
    InvalidTimeFormat { value: String, message: String },

    #[error("Global config error: {0}")]
    GlobalError(String),
}

/// Validate a raw plan document, collecting every problem found
pub fn validate_plan_document(doc: &RawPlanDocument) -> Vec<ValidationError> {
    let mut errors = validate_plan_fields(
        doc.id.as_deref(),
        &doc.name,
        doc.rules.iter().map(|r| r.app_id.as_str()),
    );

    errors.extend(validate_window(&doc.window));

    for rule in &doc.rules {
        if rule.daily_limit_minutes < 0 {
            errors.push(ValidationError::NegativeLimit {
                app_id: rule.app_id.clone(),
                minutes: rule.daily_limit_minutes,
            });
        } else if rule.daily_limit_minutes > i64::from(u32::MAX) {
            errors.push(ValidationError::LimitTooLarge {
                app_id: rule.app_id.clone(),
                minutes: rule.daily_limit_minutes,
            });
        }
    }

    errors
}

/// Checks shared by documents and plans built in code: id, name, app ids
pub(crate) fn validate_plan_fields<'a>(
    id: Option<&str>,
    name: &str,
    app_ids: impl Iterator<Item = &'a str>,
) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if id.is_none_or(|id| id.trim().is_empty()) {
        errors.push(ValidationError::MissingId);
    }

    if name.trim().is_empty() {
        errors.push(ValidationError::EmptyName);
    }

    let mut seen = HashSet::new();
    for app_id in app_ids {
        if app_id.trim().is_empty() {
            errors.push(ValidationError::EmptyAppId);
        } else if !seen.insert(app_id) {
            errors.push(ValidationError::DuplicateAppId(app_id.to_string()));
        }
    }

    errors
}

fn validate_window(window: &RawWindow) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    for value in [&window.start, &window.end] {
        if let Err(e) = parse_time(value) {
            errors.push(ValidationError::InvalidTimeFormat {
                value: value.clone(),
                message: e,
            });
        }
    }

    errors
}

/// Validate a raw service configuration
pub fn validate_config(config: &RawConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if config.service.history_days == Some(0) {
        errors.push(ValidationError::GlobalError(
            "history_days must be at least 1".into(),
        ));
    }

    if config.service.session_minutes == Some(0) {
        errors.push(ValidationError::GlobalError(
            "session_minutes must be at least 1".into(),
        ));
    }

    errors
}

/// Parse an `HH:MM:SS` (or `HH:MM`) time of day
pub fn parse_time(s: &str) -> Result<WallClock, String> {
    s.parse::<WallClock>().map_err(|_| "Expected HH:MM:SS format".to_string())
}
