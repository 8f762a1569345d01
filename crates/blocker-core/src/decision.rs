//! Block/allow verdicts

use blocker_config::BlockPlan;
use blocker_util::{AppId, WallClock};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::UsageLedger;

/// Why an app is blocked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum BlockReason {
    /// Inside the block window; lifted at `until`
    InWindow { until: WallClock },

    /// Outside the window, but today's allowance is used up
    DailyLimitExceeded { used_minutes: u32, limit_minutes: u32 },
}

impl fmt::Display for BlockReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockReason::InWindow { until } => write!(f, "block window until {}", until),
            BlockReason::DailyLimitExceeded {
                used_minutes,
                limit_minutes,
            } => write!(
                f,
                "daily limit reached ({} of {} min)",
                used_minutes, limit_minutes
            ),
        }
    }
}

/// Decision for one app at one instant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum Verdict {
    Allowed,
    Blocked(BlockReason),
}

impl Verdict {
    pub fn is_blocked(&self) -> bool {
        matches!(self, Verdict::Blocked(_))
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Allowed => write!(f, "allowed"),
            Verdict::Blocked(reason) => write!(f, "blocked: {}", reason),
        }
    }
}

/// Decide whether `app_id` should be blocked at local time `now`.
///
/// Order of evaluation:
/// 1. An inactive plan allows everything.
/// 2. Apps without a rule are allowed.
/// 3. Inside the window, `blocked_in_window` blocks.
/// 4. Outside the window, a non-zero daily limit blocks once today's usage
///    reaches it.
///
/// The daily limit never applies inside the window.
pub fn decide(plan: &BlockPlan, ledger: &UsageLedger, app_id: &AppId, now: NaiveDateTime) -> Verdict {
    if !plan.is_active() {
        return Verdict::Allowed;
    }

    let Some(rule) = plan.rule(app_id) else {
        return Verdict::Allowed;
    };

    let window = plan.window();
    if window.contains(now.time()) {
        if rule.blocked_in_window {
            return Verdict::Blocked(BlockReason::InWindow { until: window.end });
        }
        return Verdict::Allowed;
    }

    if !rule.has_daily_limit() {
        return Verdict::Allowed;
    }

    let used = ledger.minutes_used_today(app_id, now.date());
    if used >= rule.daily_limit_minutes {
        return Verdict::Blocked(BlockReason::DailyLimitExceeded {
            used_minutes: used,
            limit_minutes: rule.daily_limit_minutes,
        });
    }

    Verdict::Allowed
}

#[cfg(test)]
mod tests {
    use super::*;
    use blocker_config::AppRule;
    use blocker_util::{PlanId, TimeWindow};
    use chrono::NaiveDate;

    const GAME: &str = "com.example.game";
    const CHAT: &str = "com.example.chat";
    const NEWS: &str = "com.example.news";

    fn at(day: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 6, day)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    /// 22:00-06:00; game blocked in window with a 30 min allowance,
    /// chat blocked in window only, news allowed in window with 15 min.
    fn overnight_plan() -> BlockPlan {
        BlockPlan::new(
            PlanId::new("plan"),
            "Evenings",
            TimeWindow::new(WallClock::hm(22, 0).unwrap(), WallClock::hm(6, 0).unwrap()),
            vec![
                AppRule::blocked(GAME, "Game").with_daily_limit(30),
                AppRule::blocked(CHAT, "Chat"),
                AppRule {
                    app_id: AppId::new(NEWS),
                    display_name: "News".into(),
                    daily_limit_minutes: 15,
                    blocked_in_window: false,
                },
            ],
        )
        .unwrap()
    }

    fn in_window_until_six() -> Verdict {
        Verdict::Blocked(BlockReason::InWindow {
            until: WallClock::hm(6, 0).unwrap(),
        })
    }

    #[test]
    fn test_blocked_inside_overnight_window() {
        let plan = overnight_plan();
        let ledger = UsageLedger::new();
        let game = AppId::new(GAME);

        assert_eq!(decide(&plan, &ledger, &game, at(10, 23, 30)), in_window_until_six());
        assert_eq!(decide(&plan, &ledger, &game, at(11, 5, 59)), in_window_until_six());
        assert_eq!(decide(&plan, &ledger, &game, at(11, 6, 0)), Verdict::Allowed);
        assert_eq!(decide(&plan, &ledger, &game, at(11, 12, 0)), Verdict::Allowed);
    }

    #[test]
    fn test_window_takes_precedence_without_limit_or_usage() {
        let plan = overnight_plan();
        let ledger = UsageLedger::new();

        let verdict = decide(&plan, &ledger, &AppId::new(CHAT), at(10, 22, 0));
        assert_eq!(verdict, in_window_until_six());
    }

    #[test]
    fn test_no_limit_outside_window_is_allowed() {
        let plan = overnight_plan();
        let mut ledger = UsageLedger::new();
        let chat = AppId::new(CHAT);
        ledger.record_usage(&chat, at(10, 0, 0).date(), 600).unwrap();

        assert_eq!(decide(&plan, &ledger, &chat, at(10, 15, 0)), Verdict::Allowed);
    }

    #[test]
    fn test_daily_limit_flips_exactly_at_threshold() {
        let plan = overnight_plan();
        let game = AppId::new(GAME);
        let now = at(10, 15, 0);

        let mut ledger = UsageLedger::new();
        ledger.record_usage(&game, now.date(), 29).unwrap();
        assert_eq!(decide(&plan, &ledger, &game, now), Verdict::Allowed);

        ledger.record_usage(&game, now.date(), 1).unwrap();
        assert_eq!(
            decide(&plan, &ledger, &game, now),
            Verdict::Blocked(BlockReason::DailyLimitExceeded {
                used_minutes: 30,
                limit_minutes: 30,
            })
        );
    }

    #[test]
    fn test_limit_does_not_apply_inside_window() {
        let plan = overnight_plan();
        let news = AppId::new(NEWS);
        let mut ledger = UsageLedger::new();
        ledger.record_usage(&news, at(10, 0, 0).date(), 120).unwrap();

        // Allowed in window even though the allowance is gone
        assert_eq!(decide(&plan, &ledger, &news, at(10, 23, 0)), Verdict::Allowed);
        // Outside the window the limit applies
        assert!(decide(&plan, &ledger, &news, at(10, 9, 0)).is_blocked());
    }

    #[test]
    fn test_previous_day_usage_does_not_count() {
        let plan = overnight_plan();
        let game = AppId::new(GAME);
        let mut ledger = UsageLedger::new();
        ledger.record_usage(&game, at(10, 0, 0).date(), 90).unwrap();

        assert!(decide(&plan, &ledger, &game, at(10, 12, 0)).is_blocked());
        assert_eq!(decide(&plan, &ledger, &game, at(11, 12, 0)), Verdict::Allowed);
    }

    #[test]
    fn test_inactive_plan_allows_everything() {
        let plan = overnight_plan().with_active(false);
        let mut ledger = UsageLedger::new();
        let game = AppId::new(GAME);
        ledger.record_usage(&game, at(10, 0, 0).date(), 999).unwrap();

        for hour in [0, 5, 12, 22, 23] {
            for app in [GAME, CHAT, NEWS] {
                assert_eq!(
                    decide(&plan, &ledger, &AppId::new(app), at(10, hour, 0)),
                    Verdict::Allowed
                );
            }
        }
    }

    #[test]
    fn test_unlisted_app_always_allowed() {
        let plan = overnight_plan();
        let ledger = UsageLedger::new();
        let other = AppId::new("com.example.maps");

        for hour in 0..24 {
            assert_eq!(decide(&plan, &ledger, &other, at(10, hour, 30)), Verdict::Allowed);
        }
    }

    #[test]
    fn test_decide_is_repeatable() {
        let plan = overnight_plan();
        let mut ledger = UsageLedger::new();
        let game = AppId::new(GAME);
        ledger.record_usage(&game, at(10, 0, 0).date(), 31).unwrap();
        let now = at(10, 16, 45);

        let first = decide(&plan, &ledger, &game, now);
        let second = decide(&plan, &ledger, &game, now);
        assert_eq!(first, second);
    }

    #[test]
    fn test_full_day_window_blocks_all_day() {
        let plan = BlockPlan::new(
            PlanId::new("detox"),
            "Detox",
            TimeWindow::new(WallClock::MIDNIGHT, WallClock::MIDNIGHT),
            vec![AppRule::blocked(GAME, "Game")],
        )
        .unwrap();
        let ledger = UsageLedger::new();

        for hour in 0..24 {
            assert!(decide(&plan, &ledger, &AppId::new(GAME), at(10, hour, 0)).is_blocked());
        }
    }

    #[test]
    fn test_verdict_display_and_serde() {
        let verdict = Verdict::Blocked(BlockReason::DailyLimitExceeded {
            used_minutes: 31,
            limit_minutes: 30,
        });
        assert_eq!(verdict.to_string(), "blocked: daily limit reached (31 of 30 min)");
        assert_eq!(in_window_until_six().to_string(), "blocked: block window until 06:00:00");

        let json = serde_json::to_value(in_window_until_six()).unwrap();
        assert_eq!(json["verdict"], "blocked");
        assert_eq!(json["reason"], "in_window");
        assert_eq!(json["until"], "06:00:00");
    }
}
