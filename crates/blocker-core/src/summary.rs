//! Usage summaries for display
//!
//! Launch counts here are an estimate (time used divided by an assumed
//! session length). They are for display only and play no part in
//! blocking decisions.

use blocker_util::AppId;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashMap;

use crate::{history_start, UsageLedger};

/// Usage totals for one app
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppUsage {
    pub app_id: AppId,
    pub today_minutes: u32,
    pub week_minutes: u32,
    pub week_launches: u32,
}

/// Usage totals for today and the retained history
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UsageSummary {
    pub today_minutes: u32,
    pub week_minutes: u32,
    pub today_launches: u32,
    pub week_launches: u32,
    /// Per-app totals, most used first
    pub apps: Vec<AppUsage>,
}

/// Estimated launches for one day's bucket
pub fn estimate_launches(minutes: u32, session_minutes: u32) -> u32 {
    if minutes == 0 {
        0
    } else {
        (minutes / session_minutes.max(1)).max(1)
    }
}

/// Summarize the ledger over the `history_days` days ending at `today`
pub fn summarize(
    ledger: &UsageLedger,
    today: NaiveDate,
    history_days: u32,
    session_minutes: u32,
) -> UsageSummary {
    let first_day = history_start(today, history_days);
    let mut summary = UsageSummary::default();
    let mut per_app: HashMap<AppId, AppUsage> = HashMap::new();

    for day in ledger.days().filter(|d| *d >= first_day && *d <= today) {
        for (app_id, minutes) in ledger.apps_on(day) {
            let launches = estimate_launches(minutes, session_minutes);

            let entry = per_app.entry(app_id.clone()).or_insert_with(|| AppUsage {
                app_id: app_id.clone(),
                today_minutes: 0,
                week_minutes: 0,
                week_launches: 0,
            });
            entry.week_minutes = entry.week_minutes.saturating_add(minutes);
            entry.week_launches = entry.week_launches.saturating_add(launches);

            summary.week_minutes = summary.week_minutes.saturating_add(minutes);
            summary.week_launches = summary.week_launches.saturating_add(launches);

            if day == today {
                entry.today_minutes = minutes;
                summary.today_minutes = summary.today_minutes.saturating_add(minutes);
                summary.today_launches = summary.today_launches.saturating_add(launches);
            }
        }
    }

    let mut apps: Vec<AppUsage> = per_app.into_values().collect();
    apps.sort_by(|a, b| {
        b.week_minutes
            .cmp(&a.week_minutes)
            .then_with(|| a.app_id.cmp(&b.app_id))
    });
    summary.apps = apps;

    summary
}

/// Format a minute count as `"2h 30m"`, `"45m"` or `"0m"`
pub fn format_minutes(minutes: u32) -> String {
    let hours = minutes / 60;
    let rest = minutes % 60;
    if hours > 0 {
        format!("{}h {}m", hours, rest)
    } else {
        format!("{}m", rest)
    }
}
