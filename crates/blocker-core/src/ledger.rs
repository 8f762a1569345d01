//! Per-app, per-day usage accounting

use blocker_store::UsageRecord;
use blocker_util::{AppId, BlockerError, Result};
use chrono::{Days, NaiveDate};
use std::collections::{BTreeMap, HashMap};

const MILLIS_PER_MINUTE: i64 = 60_000;

/// Check a caller-supplied minute count
pub fn validate_minutes(minutes: i64) -> Result<u32> {
    if minutes < 0 {
        return Err(BlockerError::invalid_input(format!(
            "usage minutes cannot be negative (got {})",
            minutes
        )));
    }
    u32::try_from(minutes)
        .map_err(|_| BlockerError::invalid_input(format!("usage minutes too large: {}", minutes)))
}

/// Convert a foreground-time sample to whole minutes, rounding down
pub fn minutes_from_millis(millis: i64) -> Result<u32> {
    if millis < 0 {
        return Err(BlockerError::invalid_input(format!(
            "foreground time cannot be negative (got {} ms)",
            millis
        )));
    }
    validate_minutes(millis / MILLIS_PER_MINUTE)
}

/// First day kept when retaining `history_days` days up to and including `today`
pub fn history_start(today: NaiveDate, history_days: u32) -> NaiveDate {
    let back = u64::from(history_days.max(1) - 1);
    today.checked_sub_days(Days::new(back)).unwrap_or(NaiveDate::MIN)
}

/// A foreground-time sample from the usage feed.
///
/// The feed is responsible for splitting intervals that cross midnight and
/// for only reporting time spent outside the block window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageSample {
    pub app_id: AppId,
    pub day: NaiveDate,
    pub foreground_millis: i64,
}

/// Minutes of use per app, bucketed by local calendar day.
///
/// Buckets are created on first use and never shared across days, so a new
/// day always starts from zero.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UsageLedger {
    days: BTreeMap<NaiveDate, HashMap<AppId, u32>>,
}

impl UsageLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a ledger from persisted buckets
    pub fn from_records(records: impl IntoIterator<Item = UsageRecord>) -> Self {
        let mut ledger = Self::new();
        for record in records {
            ledger.add(&record.app_id, record.day, record.minutes);
        }
        ledger
    }

    /// Add minutes to an app's bucket for `day`. Returns the new total.
    ///
    /// Negative minutes are rejected without touching the ledger.
    pub fn record_usage(&mut self, app_id: &AppId, day: NaiveDate, minutes: i64) -> Result<u32> {
        let minutes = validate_minutes(minutes)?;
        Ok(self.add(app_id, day, minutes))
    }

    pub(crate) fn add(&mut self, app_id: &AppId, day: NaiveDate, minutes: u32) -> u32 {
        let bucket = self
            .days
            .entry(day)
            .or_default()
            .entry(app_id.clone())
            .or_insert(0);
        *bucket = bucket.saturating_add(minutes);
        *bucket
    }

    /// Minutes recorded for an app on `day`; 0 when nothing was observed
    pub fn minutes_used_today(&self, app_id: &AppId, day: NaiveDate) -> u32 {
        self.days
            .get(&day)
            .and_then(|apps| apps.get(app_id))
            .copied()
            .unwrap_or(0)
    }

    /// Discard every bucket for `day`
    pub fn reset_day(&mut self, day: NaiveDate) {
        self.days.remove(&day);
    }

    /// Discard buckets for days before `first_kept`. Returns buckets removed.
    pub fn prune_before(&mut self, first_kept: NaiveDate) -> usize {
        let kept = self.days.split_off(&first_kept);
        let removed = self.days.values().map(HashMap::len).sum();
        self.days = kept;
        removed
    }

    /// Days that have at least one bucket, oldest first
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.days.keys().copied()
    }

    /// Buckets for one day
    pub fn apps_on(&self, day: NaiveDate) -> impl Iterator<Item = (&AppId, u32)> {
        self.days
            .get(&day)
            .into_iter()
            .flat_map(|apps| apps.iter().map(|(id, m)| (id, *m)))
    }

    /// Total minutes across all apps on `day`
    pub fn total_on(&self, day: NaiveDate) -> u32 {
        self.apps_on(day)
            .fold(0u32, |acc, (_, m)| acc.saturating_add(m))
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }
}
