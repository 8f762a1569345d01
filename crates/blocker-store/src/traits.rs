//! Store trait definitions

use blocker_config::BlockPlan;
use blocker_util::{AppId, PlanId};
use chrono::NaiveDate;

use crate::{AuditEvent, StoreResult};

/// Key of the single document slot holding the current plan
pub const CURRENT_PLAN_SLOT: &str = "current_plan";

/// Persistence for the single current plan
pub trait PlanStore: Send + Sync {
    /// Save `plan` as the current plan, replacing any previous one
    fn save(&self, plan: &BlockPlan) -> StoreResult<()>;

    /// Load and validate the current plan. `Ok(None)` when no plan is stored.
    fn load_current(&self) -> StoreResult<Option<BlockPlan>>;

    /// Whether the current-plan slot holds a document
    fn exists(&self) -> StoreResult<bool>;

    /// Remove the current plan. Returns whether a document was removed.
    fn delete_current(&self) -> StoreResult<bool>;

    /// Generate an id for a plan about to be created
    fn new_plan_id(&self) -> PlanId {
        PlanId::generate()
    }
}

/// One persisted usage bucket
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageRecord {
    pub app_id: AppId,
    pub day: NaiveDate,
    pub minutes: u32,
}

/// Persistence for per-app, per-day usage minutes
pub trait UsageStore: Send + Sync {
    /// Get minutes recorded for an app on a specific day (0 if none)
    fn get_usage(&self, app_id: &AppId, day: NaiveDate) -> StoreResult<u32>;

    /// Add minutes for an app on a specific day
    fn add_usage(&self, app_id: &AppId, day: NaiveDate, minutes: u32) -> StoreResult<()>;

    /// All buckets on or after `first_day`
    fn usage_since(&self, first_day: NaiveDate) -> StoreResult<Vec<UsageRecord>>;

    /// Drop buckets before `day`. Returns the number removed.
    fn prune_usage_before(&self, day: NaiveDate) -> StoreResult<usize>;
}

/// Main store trait
pub trait Store: PlanStore + UsageStore {
    /// Append an audit event
    fn append_audit(&self, event: AuditEvent) -> StoreResult<()>;

    /// Get recent audit events, newest first
    fn recent_audits(&self, limit: usize) -> StoreResult<Vec<AuditEvent>>;

    /// Check if store is healthy
    fn is_healthy(&self) -> bool;
}
