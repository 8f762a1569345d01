//! blockerd - command-line front end for the app blocker
//!
//! Wires together:
//! - Configuration loading
//! - Store initialization
//! - The blocker engine
//!
//! and exposes plan management, usage recording and verdict checks as
//! subcommands.

use anyhow::{Context, Result};
use blocker_config::{
    load_config_or_default, plan_to_json, PlanError, RawAppRule, RawPlanDocument, RawWindow,
    ServiceConfig, CURRENT_DOCUMENT_VERSION,
};
use blocker_core::{format_minutes, BlockerEngine, UsageSample, Verdict};
use blocker_store::{PlanStore, SqliteStore, Store};
use blocker_util::{
    default_config_path, format_duration, is_mock_time_active, now, parse_day,
    parse_local_datetime, today, AppId, BlockerError, TimeWindow, BLOCKER_CONFIG_ENV,
    BLOCKER_DATA_DIR_ENV, DATABASE_FILENAME,
};
use chrono::{NaiveDateTime, NaiveTime};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

/// blockerd - block apps during a daily window and cap their use outside it
#[derive(Parser, Debug)]
#[command(name = "blockerd", version)]
#[command(about = "Block apps during a daily window and cap their use outside it", long_about = None)]
struct Args {
    /// Configuration file path (default: ~/.config/blocker/config.toml)
    #[arg(short, long, global = true, env = BLOCKER_CONFIG_ENV, default_value_os_t = default_config_path())]
    config: PathBuf,

    /// Data directory override
    #[arg(short, long, global = true, env = BLOCKER_DATA_DIR_ENV)]
    data_dir: Option<PathBuf>,

    /// Log level
    #[arg(short, long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the current plan and today's usage
    Show,

    /// Print the current plan as a JSON document
    Export,

    /// Replace the current plan with a JSON document
    Import {
        /// Plan document to import
        file: PathBuf,
    },

    /// Create a new plan, replacing any current one
    Create {
        /// Plan name
        #[arg(long)]
        name: String,

        /// Window start (HH:MM or HH:MM:SS)
        #[arg(long)]
        start: String,

        /// Window end (HH:MM or HH:MM:SS)
        #[arg(long)]
        end: String,

        /// Governed app as `id[:name[:daily-limit-minutes]]`
        #[arg(long = "app", value_name = "APP", value_parser = parse_app_arg)]
        apps: Vec<RawAppRule>,

        /// Create the plan switched off
        #[arg(long)]
        inactive: bool,
    },

    /// Switch the current plan on
    Activate,

    /// Switch the current plan off
    Deactivate,

    /// Remove the current plan
    Delete,

    /// Record foreground time spent outside the block window
    Record {
        /// App identifier
        app: String,

        /// Whole minutes
        #[arg(
            long,
            allow_negative_numbers = true,
            conflicts_with = "millis",
            required_unless_present = "millis"
        )]
        minutes: Option<i64>,

        /// Milliseconds, rounded down to whole minutes
        #[arg(long, allow_negative_numbers = true)]
        millis: Option<i64>,

        /// Day to record against (YYYY-MM-DD, default today)
        #[arg(long)]
        day: Option<String>,
    },

    /// Print verdicts for the given apps, or every governed app
    Check {
        /// App identifiers
        apps: Vec<String>,

        /// Evaluate at this local time instead of now ("YYYY-MM-DD HH:MM:SS")
        #[arg(long)]
        at: Option<String>,

        /// Print verdicts as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show usage totals for today and the retained history
    Usage {
        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Drop usage history older than the retention window
    Prune,

    /// Show recent audit events
    Audit {
        /// Number of events to show
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
}

/// Parse `id[:name[:limit]]` into a rule. Limits are checked later, with
/// the rest of the plan.
fn parse_app_arg(value: &str) -> std::result::Result<RawAppRule, String> {
    let mut parts = value.splitn(3, ':');
    let app_id = parts.next().unwrap_or_default().trim().to_string();
    if app_id.is_empty() {
        return Err("app id cannot be empty".into());
    }
    let display_name = parts.next().unwrap_or_default().trim().to_string();
    let daily_limit_minutes = match parts.next().map(str::trim) {
        None | Some("") => 0,
        Some(limit) => limit
            .parse::<i64>()
            .map_err(|e| format!("invalid daily limit '{}': {}", limit, e))?,
    };

    Ok(RawAppRule {
        app_id,
        display_name,
        daily_limit_minutes,
        blocked_in_window: true,
    })
}

/// One-line state of the block window at `time`
fn window_status(window: &TimeWindow, time: NaiveTime) -> String {
    match (window.remaining(time), window.until_open(time)) {
        (Some(left), _) => {
            format!("Window {} is open, closes in {}", window, format_duration(left))
        }
        (None, Some(wait)) => {
            format!("Window {} is closed, opens in {}", window, format_duration(wait))
        }
        (None, None) => format!("Window {}", window),
    }
}

/// Verdict line for `check --json`
#[derive(Serialize)]
struct CheckOutput {
    app_id: AppId,
    #[serde(flatten)]
    verdict: Verdict,
}

struct Service {
    config: ServiceConfig,
    store: Arc<dyn Store>,
}

impl Service {
    fn new(args: &Args) -> Result<Self> {
        let config = load_config_or_default(&args.config)
            .with_context(|| format!("Failed to load config from {:?}", args.config))?;

        let data_dir = args
            .data_dir
            .clone()
            .unwrap_or_else(|| config.data_dir.clone());

        let db_path = data_dir.join(DATABASE_FILENAME);
        let store: Arc<dyn Store> = Arc::new(
            SqliteStore::open(&db_path)
                .with_context(|| format!("Failed to open database {:?}", db_path))?,
        );

        info!(db_path = %db_path.display(), "Store initialized");

        Ok(Self { config, store })
    }

    fn engine(&self) -> Result<BlockerEngine> {
        BlockerEngine::open(self.store.clone(), self.config.history_days, today())
            .context("Failed to load blocker state")
    }

    fn run(&self, command: Command) -> Result<()> {
        match command {
            Command::Show => self.show(),
            Command::Export => {
                let plan = self.engine()?.require_plan()?;
                println!("{}", plan_to_json(&plan)?);
                Ok(())
            }
            Command::Import { file } => {
                let content = std::fs::read_to_string(&file)
                    .with_context(|| format!("Failed to read {:?}", file))?;
                let raw: RawPlanDocument = serde_json::from_str(&content)
                    .map_err(|e| BlockerError::from(PlanError::Json(e)))?;
                let plan = self.engine()?.replace_plan_from_document(raw)?;
                println!("Imported plan '{}' ({})", plan.name(), plan.id());
                Ok(())
            }
            Command::Create {
                name,
                start,
                end,
                apps,
                inactive,
            } => {
                let raw = RawPlanDocument {
                    document_version: CURRENT_DOCUMENT_VERSION,
                    id: None,
                    name,
                    window: RawWindow { start, end },
                    rules: apps,
                    active: !inactive,
                };
                let plan = self.engine()?.replace_plan_from_document(raw)?;
                println!(
                    "Created plan '{}' ({}) with {} rule(s), window {}",
                    plan.name(),
                    plan.id(),
                    plan.rule_count(),
                    plan.window()
                );
                Ok(())
            }
            Command::Activate => {
                let plan = self.engine()?.set_active(true)?;
                println!("Plan '{}' is active", plan.name());
                Ok(())
            }
            Command::Deactivate => {
                let plan = self.engine()?.set_active(false)?;
                println!("Plan '{}' is paused", plan.name());
                Ok(())
            }
            Command::Delete => self.delete(),
            Command::Record {
                app,
                minutes,
                millis,
                day,
            } => {
                let day = match day {
                    Some(day) => parse_day(&day)?,
                    None => today(),
                };
                let app_id = AppId::new(app);
                let engine = self.engine()?;
                let total = match (minutes, millis) {
                    (Some(minutes), _) => engine.record_usage(&app_id, day, minutes)?,
                    (None, Some(millis)) => engine.record_sample(&UsageSample {
                        app_id: app_id.clone(),
                        day,
                        foreground_millis: millis,
                    })?,
                    (None, None) => {
                        return Err(BlockerError::invalid_input(
                            "either --minutes or --millis is required",
                        )
                        .into());
                    }
                };
                println!("{} on {}: {} used", app_id, day, format_minutes(total));
                Ok(())
            }
            Command::Check { apps, at, json } => {
                let at = match at {
                    Some(at) => parse_local_datetime(&at)?,
                    None => now().naive_local(),
                };
                self.check(apps, at, json)
            }
            Command::Usage { json } => {
                let summary = self
                    .engine()?
                    .summary(today(), self.config.session_minutes)?;
                if json {
                    println!("{}", serde_json::to_string_pretty(&summary)?);
                    return Ok(());
                }

                println!(
                    "Today:      {} (~{} launches)",
                    format_minutes(summary.today_minutes),
                    summary.today_launches
                );
                println!(
                    "Last {} days: {} (~{} launches)",
                    self.config.history_days,
                    format_minutes(summary.week_minutes),
                    summary.week_launches
                );
                for app in &summary.apps {
                    println!(
                        "  - {}: today {}, total {}",
                        app.app_id,
                        format_minutes(app.today_minutes),
                        format_minutes(app.week_minutes)
                    );
                }
                Ok(())
            }
            Command::Prune => {
                let removed = self.engine()?.prune_history(today())?;
                println!("Removed {} usage record(s)", removed);
                Ok(())
            }
            Command::Audit { limit } => {
                for event in self.store.recent_audits(limit)? {
                    println!(
                        "{} #{} {}",
                        event.timestamp.format("%Y-%m-%d %H:%M:%S"),
                        event.id,
                        serde_json::to_string(&event.event)?
                    );
                }
                Ok(())
            }
        }
    }

    fn show(&self) -> Result<()> {
        let engine = self.engine()?;
        let Some(plan) = engine.current_plan()? else {
            println!("No block plan has been set up");
            return Ok(());
        };

        let day = today();
        println!("Plan: {} ({})", plan.name(), plan.id());
        println!("  Active: {}", plan.is_active());
        println!(
            "  Window: {} ({})",
            plan.window(),
            format_duration(plan.window().length())
        );
        if is_mock_time_active() {
            println!("  Time: {} (mock)", now().format("%Y-%m-%d %H:%M:%S"));
        }
        println!("  Rules:");
        for rule in plan.rules() {
            let used = engine.minutes_used(&rule.app_id, day)?;
            let limit = if rule.has_daily_limit() {
                format!(
                    "{} of {} today",
                    format_minutes(used),
                    format_minutes(rule.daily_limit_minutes)
                )
            } else {
                format!("{} today, no limit", format_minutes(used))
            };
            let in_window = if rule.blocked_in_window {
                "blocked in window"
            } else {
                "allowed in window"
            };
            println!("    - {} ({}): {}, {}", rule.app_id, rule.label(), in_window, limit);
        }
        Ok(())
    }

    fn check(&self, apps: Vec<String>, at: NaiveDateTime, json: bool) -> Result<()> {
        let engine = self.engine()?;
        let verdicts = if apps.is_empty() {
            engine.decide_all(at)?
        } else {
            apps.into_iter()
                .map(AppId::new)
                .map(|app_id| {
                    let verdict = engine.decide(&app_id, at)?;
                    Ok((app_id, verdict))
                })
                .collect::<blocker_util::Result<Vec<_>>>()?
        };
        debug!(at = %at, count = verdicts.len(), "Verdicts computed");

        if json {
            let output: Vec<CheckOutput> = verdicts
                .into_iter()
                .map(|(app_id, verdict)| CheckOutput { app_id, verdict })
                .collect();
            println!("{}", serde_json::to_string_pretty(&output)?);
            return Ok(());
        }

        if let Some(plan) = engine.current_plan()? {
            println!("{}", window_status(plan.window(), at.time()));
        }
        for (app_id, verdict) in verdicts {
            println!("{}: {}", app_id, verdict);
        }
        Ok(())
    }

    /// Delete goes to the store directly when the stored plan cannot be
    /// read, so an unreadable document can always be cleared.
    fn delete(&self) -> Result<()> {
        match BlockerEngine::open(self.store.clone(), self.config.history_days, today()) {
            Ok(engine) => {
                let plan_id = engine.delete_plan()?;
                println!("Deleted plan {}", plan_id);
            }
            Err(BlockerError::InvalidPlan(reason)) => {
                warn!(reason = %reason, "Deleting unreadable plan document");
                self.store.delete_current()?;
                println!("Deleted unreadable plan document");
            }
            Err(e) => return Err(e.into()),
        }
        Ok(())
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "blockerd starting");

    let result = Service::new(&args).and_then(|service| service.run(args.command));
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blocker_util::WallClock;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_app_arg() {
        let rule = parse_app_arg("com.example.game:Game:30").unwrap();
        assert_eq!(rule.app_id, "com.example.game");
        assert_eq!(rule.display_name, "Game");
        assert_eq!(rule.daily_limit_minutes, 30);
        assert!(rule.blocked_in_window);

        let rule = parse_app_arg("com.example.chat").unwrap();
        assert_eq!(rule.display_name, "");
        assert_eq!(rule.daily_limit_minutes, 0);

        // Negative limits parse here and are rejected by plan validation
        assert_eq!(parse_app_arg("a::-5").unwrap().daily_limit_minutes, -5);

        assert!(parse_app_arg("").is_err());
        assert!(parse_app_arg("a:b:lots").is_err());
    }

    #[test]
    fn test_record_requires_an_amount() {
        let parsed = Args::try_parse_from(["blockerd", "record", "game"]);
        assert!(parsed.is_err());

        let parsed =
            Args::try_parse_from(["blockerd", "record", "game", "--minutes", "1", "--millis", "1"]);
        assert!(parsed.is_err());

        let parsed = Args::try_parse_from(["blockerd", "record", "game", "--minutes", "-5"]).unwrap();
        assert!(matches!(
            parsed.command,
            Command::Record {
                minutes: Some(-5),
                ..
            }
        ));
    }

    #[test]
    fn test_window_status() {
        let window = TimeWindow::new(WallClock::hm(22, 0).unwrap(), WallClock::hm(6, 0).unwrap());
        let at = |h, m| NaiveTime::from_hms_opt(h, m, 0).unwrap();

        assert_eq!(
            window_status(&window, at(23, 30)),
            "Window 22:00:00-06:00:00 is open, closes in 6h 30m 0s"
        );
        assert_eq!(
            window_status(&window, at(6, 0)),
            "Window 22:00:00-06:00:00 is closed, opens in 16h 0m 0s"
        );
    }

    #[test]
    fn test_create_collects_apps() {
        let parsed = Args::try_parse_from([
            "blockerd", "create", "--name", "Evenings", "--start", "22:00", "--end", "06:00",
            "--app", "game:Game:30", "--app", "chat",
        ])
        .unwrap();

        let Command::Create { apps, inactive, .. } = parsed.command else {
            panic!("expected create");
        };
        assert_eq!(apps.len(), 2);
        assert!(!inactive);
    }
}
