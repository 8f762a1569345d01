//! Engine host: the current plan and usage ledger behind reader-writer locks

use blocker_config::{
    fill_missing_id, plan_from_document, BlockPlan, RawPlanDocument, DEFAULT_HISTORY_DAYS,
};
use blocker_store::{AuditEvent, AuditEventType, PlanStore, Store, UsageStore};
use blocker_util::{AppId, BlockerError, PlanId, Result};
use chrono::{NaiveDate, NaiveDateTime};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info, warn};

use crate::{
    decide, history_start, minutes_from_millis, summarize, validate_minutes, UsageLedger,
    UsageSample, UsageSummary, Verdict,
};

/// The blocking-decision engine.
///
/// Any number of `decide` calls may run in parallel. Plan replacement and
/// usage recording take the matching write lock, and persist to the store
/// while holding it, so a `decide` that starts after one of them returns
/// always sees its effect.
pub struct BlockerEngine {
    store: Arc<dyn Store>,
    plan: RwLock<Option<BlockPlan>>,
    ledger: RwLock<UsageLedger>,
    history_days: u32,
}

impl BlockerEngine {
    /// Load the current plan and the retained usage history from `store`
    pub fn open(store: Arc<dyn Store>, history_days: u32, today: NaiveDate) -> Result<Self> {
        let history_days = history_days.max(1);
        let plan = store.load_current()?;
        let records = store.usage_since(history_start(today, history_days))?;
        let ledger = UsageLedger::from_records(records);

        match &plan {
            Some(p) => info!(
                plan_id = %p.id(),
                rule_count = p.rule_count(),
                active = p.is_active(),
                "Blocker engine initialized"
            ),
            None => info!("Blocker engine initialized without a plan"),
        }

        Ok(Self {
            store,
            plan: RwLock::new(plan),
            ledger: RwLock::new(ledger),
            history_days,
        })
    }

    /// Engine with the default history retention
    pub fn with_defaults(store: Arc<dyn Store>, today: NaiveDate) -> Result<Self> {
        Self::open(store, DEFAULT_HISTORY_DAYS, today)
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    pub fn history_days(&self) -> u32 {
        self.history_days
    }

    fn read_plan(&self) -> Result<RwLockReadGuard<'_, Option<BlockPlan>>> {
        self.plan
            .read()
            .map_err(|_| BlockerError::internal("plan lock poisoned"))
    }

    fn write_plan(&self) -> Result<RwLockWriteGuard<'_, Option<BlockPlan>>> {
        self.plan
            .write()
            .map_err(|_| BlockerError::internal("plan lock poisoned"))
    }

    fn read_ledger(&self) -> Result<RwLockReadGuard<'_, UsageLedger>> {
        self.ledger
            .read()
            .map_err(|_| BlockerError::internal("ledger lock poisoned"))
    }

    fn write_ledger(&self) -> Result<RwLockWriteGuard<'_, UsageLedger>> {
        self.ledger
            .write()
            .map_err(|_| BlockerError::internal("ledger lock poisoned"))
    }

    // Plan lifecycle

    /// The current plan, if any
    pub fn current_plan(&self) -> Result<Option<BlockPlan>> {
        Ok(self.read_plan()?.clone())
    }

    /// The current plan, or `NotFound`
    pub fn require_plan(&self) -> Result<BlockPlan> {
        self.current_plan()?
            .ok_or_else(|| BlockerError::not_found("no block plan has been set up"))
    }

    /// Persist `plan` and make it current, replacing any previous plan
    pub fn replace_plan(&self, plan: BlockPlan) -> Result<()> {
        let mut current = self.write_plan()?;

        self.store.save(&plan)?;

        let _ = self.store.append_audit(AuditEvent::new(AuditEventType::PlanSaved {
            plan_id: plan.id().clone(),
            name: plan.name().to_string(),
            rule_count: plan.rule_count(),
            active: plan.is_active(),
        }));

        info!(
            plan_id = %plan.id(),
            rule_count = plan.rule_count(),
            active = plan.is_active(),
            "Plan replaced"
        );

        *current = Some(plan);
        Ok(())
    }

    /// Validate an external document and, if it passes, make it current.
    ///
    /// A document without an id gets a fresh one from the store.
    pub fn replace_plan_from_document(&self, mut raw: RawPlanDocument) -> Result<BlockPlan> {
        fill_missing_id(&mut raw, || self.store.new_plan_id().to_string());

        let plan = match plan_from_document(raw) {
            Ok(plan) => plan,
            Err(e) => {
                warn!(error = %e, "Plan rejected");
                let _ = self.store.append_audit(AuditEvent::new(AuditEventType::PlanRejected {
                    reasons: vec![e.to_string()],
                }));
                return Err(e.into());
            }
        };

        self.replace_plan(plan.clone())?;
        Ok(plan)
    }

    /// Turn the current plan on or off
    pub fn set_active(&self, active: bool) -> Result<BlockPlan> {
        let plan = self.require_plan()?.with_active(active);
        self.replace_plan(plan.clone())?;
        Ok(plan)
    }

    /// Remove the current plan. Returns the id of the removed plan.
    pub fn delete_plan(&self) -> Result<PlanId> {
        let mut current = self.write_plan()?;

        let Some(plan) = current.as_ref() else {
            return Err(BlockerError::not_found("no block plan to delete"));
        };
        let plan_id = plan.id().clone();

        self.store.delete_current()?;

        let _ = self.store.append_audit(AuditEvent::new(AuditEventType::PlanDeleted {
            plan_id: plan_id.clone(),
        }));
        info!(plan_id = %plan_id, "Plan deleted");

        *current = None;
        Ok(plan_id)
    }

    // Usage accounting

    /// Add minutes of outside-window use for `app_id` on `day`.
    /// Returns the app's new total for that day.
    pub fn record_usage(&self, app_id: &AppId, day: NaiveDate, minutes: i64) -> Result<u32> {
        let minutes = match validate_minutes(minutes) {
            Ok(m) => m,
            Err(e) => {
                warn!(app_id = %app_id, minutes, "Rejected usage record");
                return Err(e);
            }
        };

        let mut ledger = self.write_ledger()?;

        self.store.add_usage(app_id, day, minutes)?;
        let total = ledger.add(app_id, day, minutes);

        let _ = self.store.append_audit(AuditEvent::new(AuditEventType::UsageRecorded {
            app_id: app_id.clone(),
            day,
            minutes,
        }));
        debug!(app_id = %app_id, day = %day, minutes, total, "Usage recorded");

        Ok(total)
    }

    /// Record a foreground-time sample from the usage feed
    pub fn record_sample(&self, sample: &UsageSample) -> Result<u32> {
        let minutes = minutes_from_millis(sample.foreground_millis)?;
        self.record_usage(&sample.app_id, sample.day, minutes as i64)
    }

    /// Minutes recorded for `app_id` on `day`
    pub fn minutes_used(&self, app_id: &AppId, day: NaiveDate) -> Result<u32> {
        Ok(self.read_ledger()?.minutes_used_today(app_id, day))
    }

    /// Drop usage older than the retention window, in memory and in the store
    pub fn prune_history(&self, today: NaiveDate) -> Result<usize> {
        let first_kept = history_start(today, self.history_days);
        let mut ledger = self.write_ledger()?;

        let removed = self.store.prune_usage_before(first_kept)?;
        ledger.prune_before(first_kept);

        let _ = self.store.append_audit(AuditEvent::new(AuditEventType::HistoryPruned {
            before: first_kept,
            removed,
        }));
        debug!(before = %first_kept, removed, "History pruned");

        Ok(removed)
    }

    /// Usage summary over the retention window
    pub fn summary(&self, today: NaiveDate, session_minutes: u32) -> Result<UsageSummary> {
        let ledger = self.read_ledger()?;
        Ok(summarize(&ledger, today, self.history_days, session_minutes))
    }

    // Decisions

    /// Verdict for one app at local time `now`. Without a plan, everything
    /// is allowed.
    pub fn decide(&self, app_id: &AppId, now: NaiveDateTime) -> Result<Verdict> {
        let plan = self.read_plan()?;
        let Some(plan) = plan.as_ref() else {
            return Ok(Verdict::Allowed);
        };

        let ledger = self.read_ledger()?;
        Ok(decide(plan, &ledger, app_id, now))
    }

    /// Verdicts for every app the current plan governs, in app-id order
    pub fn decide_all(&self, now: NaiveDateTime) -> Result<Vec<(AppId, Verdict)>> {
        let plan = self.read_plan()?;
        let Some(plan) = plan.as_ref() else {
            return Ok(Vec::new());
        };

        let ledger = self.read_ledger()?;
        Ok(plan
            .rules()
            .map(|rule| {
                let verdict = decide(plan, &ledger, &rule.app_id, now);
                (rule.app_id.clone(), verdict)
            })
            .collect())
    }
}
