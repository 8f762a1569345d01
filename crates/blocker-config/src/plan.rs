//! Validated block plan

use crate::schema::{RawAppRule, RawPlanDocument, RawWindow};
use crate::validation::{parse_time, validate_plan_fields};
use crate::{PlanError, PlanResult, CURRENT_DOCUMENT_VERSION};
use blocker_util::{AppId, PlanId, TimeWindow, WallClock};
use std::collections::BTreeMap;

/// Per-app policy within a plan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppRule {
    pub app_id: AppId,
    pub display_name: String,
    /// Allowance outside the window. 0 means unrestricted outside the window.
    pub daily_limit_minutes: u32,
    /// Block this app while the window is open
    pub blocked_in_window: bool,
}

impl AppRule {
    /// Rule that blocks the app in the window and leaves it alone outside
    pub fn blocked(app_id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            app_id: AppId::new(app_id),
            display_name: display_name.into(),
            daily_limit_minutes: 0,
            blocked_in_window: true,
        }
    }

    pub fn with_daily_limit(mut self, minutes: u32) -> Self {
        self.daily_limit_minutes = minutes;
        self
    }

    pub fn has_daily_limit(&self) -> bool {
        self.daily_limit_minutes > 0
    }

    /// Name to show for the app; the app id when no display name was given
    pub fn label(&self) -> &str {
        if self.display_name.trim().is_empty() {
            self.app_id.as_str()
        } else {
            &self.display_name
        }
    }
}

/// A validated block plan: one daily window plus rules keyed by app.
///
/// Plans are immutable values; changing a plan means building a new one and
/// replacing the stored plan wholesale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockPlan {
    id: PlanId,
    name: String,
    window: TimeWindow,
    rules: BTreeMap<AppId, AppRule>,
    active: bool,
}

impl BlockPlan {
    /// Build and validate a new, active plan
    pub fn new(
        id: PlanId,
        name: impl Into<String>,
        window: TimeWindow,
        rules: impl IntoIterator<Item = AppRule>,
    ) -> PlanResult<Self> {
        let name = name.into();
        let rules: Vec<AppRule> = rules.into_iter().collect();

        let errors = validate_plan_fields(
            Some(id.as_str()),
            &name,
            rules.iter().map(|r| r.app_id.as_str()),
        );
        if !errors.is_empty() {
            return Err(PlanError::ValidationFailed { errors });
        }

        Ok(Self {
            id,
            name,
            window,
            rules: rules.into_iter().map(|r| (r.app_id.clone(), r)).collect(),
            active: true,
        })
    }

    pub fn id(&self) -> &PlanId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn window(&self) -> &TimeWindow {
        &self.window
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Get the rule governing an app, if any
    pub fn rule(&self, app_id: &AppId) -> Option<&AppRule> {
        self.rules.get(app_id)
    }

    /// Rules in app-id order
    pub fn rules(&self) -> impl Iterator<Item = &AppRule> {
        self.rules.values()
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Same plan with the active flag changed
    pub fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    /// Convert from a raw document (after validation)
    pub(crate) fn from_raw(raw: RawPlanDocument) -> Self {
        let window = TimeWindow::new(
            parse_time(&raw.window.start).unwrap_or(WallClock::MIDNIGHT),
            parse_time(&raw.window.end).unwrap_or(WallClock::MIDNIGHT),
        );

        let rules = raw
            .rules
            .into_iter()
            .map(|r| {
                let rule = AppRule {
                    app_id: AppId::new(r.app_id),
                    display_name: r.display_name,
                    daily_limit_minutes: u32::try_from(r.daily_limit_minutes).unwrap_or_default(),
                    blocked_in_window: r.blocked_in_window,
                };
                (rule.app_id.clone(), rule)
            })
            .collect();

        Self {
            id: PlanId::new(raw.id.unwrap_or_default()),
            name: raw.name,
            window,
            rules,
            active: raw.active,
        }
    }

    /// Canonical document form of this plan
    pub fn to_document(&self) -> RawPlanDocument {
        RawPlanDocument {
            document_version: CURRENT_DOCUMENT_VERSION,
            id: Some(self.id.to_string()),
            name: self.name.clone(),
            window: RawWindow {
                start: self.window.start.to_string(),
                end: self.window.end.to_string(),
            },
            rules: self
                .rules
                .values()
                .map(|r| RawAppRule {
                    app_id: r.app_id.to_string(),
                    display_name: r.display_name.clone(),
                    daily_limit_minutes: r.daily_limit_minutes as i64,
                    blocked_in_window: r.blocked_in_window,
                })
                .collect(),
            active: self.active,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ValidationError;

    fn window() -> TimeWindow {
        TimeWindow::new(WallClock::hm(22, 0).unwrap(), WallClock::hm(6, 0).unwrap())
    }

    #[test]
    fn test_new_plan_is_active() {
        let plan = BlockPlan::new(
            PlanId::new("p1"),
            "Evenings",
            window(),
            vec![AppRule::blocked("com.example.game", "Game").with_daily_limit(30)],
        )
        .unwrap();

        assert!(plan.is_active());
        assert_eq!(plan.rule_count(), 1);
        let rule = plan.rule(&AppId::new("com.example.game")).unwrap();
        assert!(rule.has_daily_limit());
        assert!(plan.rule(&AppId::new("com.example.chat")).is_none());
    }

    #[test]
    fn test_new_plan_rejects_duplicates_and_empty_name() {
        let result = BlockPlan::new(
            PlanId::new("p1"),
            "",
            window(),
            vec![
                AppRule::blocked("com.example.game", "Game"),
                AppRule::blocked("com.example.game", "Game again"),
            ],
        );

        match result {
            Err(PlanError::ValidationFailed { errors }) => {
                assert!(errors.contains(&ValidationError::EmptyName));
                assert!(errors.contains(&ValidationError::DuplicateAppId(
                    "com.example.game".into()
                )));
            }
            other => panic!("expected validation failure, got {:?}", other),
        }
    }

    #[test]
    fn test_label_falls_back_to_app_id() {
        assert_eq!(AppRule::blocked("com.example.game", "Game").label(), "Game");
        assert_eq!(AppRule::blocked("com.example.game", "").label(), "com.example.game");
        assert_eq!(AppRule::blocked("com.example.game", "  ").label(), "com.example.game");
    }

    #[test]
    fn test_with_active_keeps_everything_else() {
        let plan = BlockPlan::new(PlanId::new("p1"), "Evenings", window(), vec![]).unwrap();
        let paused = plan.clone().with_active(false);

        assert!(!paused.is_active());
        assert_eq!(paused.id(), plan.id());
        assert_eq!(paused.window(), plan.window());
    }

    #[test]
    fn test_document_uses_canonical_times() {
        let plan = BlockPlan::new(
            PlanId::new("p1"),
            "Evenings",
            TimeWindow::new(
                WallClock::new(21, 45, 30).unwrap(),
                WallClock::hm(6, 0).unwrap(),
            ),
            vec![AppRule::blocked("b", "B"), AppRule::blocked("a", "A")],
        )
        .unwrap();

        let doc = plan.to_document();
        assert_eq!(doc.window.start, "21:45:30");
        assert_eq!(doc.window.end, "06:00:00");
        assert_eq!(doc.id.as_deref(), Some("p1"));
        // Rules come out in app-id order
        assert_eq!(doc.rules[0].app_id, "a");
        assert_eq!(doc.rules[1].app_id, "b");
    }
}
