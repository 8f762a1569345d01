//! Audit event types

use chrono::{DateTime, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use blocker_util::{AppId, PlanId};

/// Types of audit events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuditEventType {
    /// Plan created or replaced
    PlanSaved {
        plan_id: PlanId,
        name: String,
        rule_count: usize,
        active: bool,
    },

    /// Current plan removed
    PlanDeleted { plan_id: PlanId },

    /// Plan failed validation and was not saved
    PlanRejected { reasons: Vec<String> },

    /// Usage minutes recorded
    UsageRecorded {
        app_id: AppId,
        day: NaiveDate,
        minutes: u32,
    },

    /// Old usage history dropped
    HistoryPruned { before: NaiveDate, removed: usize },
}

/// Full audit event with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Unique event ID
    pub id: i64,

    /// Event timestamp
    pub timestamp: DateTime<Local>,

    /// Event type and details
    pub event: AuditEventType,
}

impl AuditEvent {
    pub fn new(event: AuditEventType) -> Self {
        Self {
            id: 0, // Will be set by store
            timestamp: blocker_util::now(),
            event,
        }
    }
}
