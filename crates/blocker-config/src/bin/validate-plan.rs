//! Plan document validation CLI tool
//!
//! Validates a block plan JSON document and reports any errors.

use blocker_config::{
    fill_missing_id, plan_from_document, PlanError, RawPlanDocument, CURRENT_DOCUMENT_VERSION,
};
use std::path::PathBuf;
use std::process::ExitCode;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();

    let plan_path = match args.get(1) {
        Some(path) => PathBuf::from(path),
        None => {
            eprintln!("Usage: validate-plan <plan-file>");
            eprintln!();
            eprintln!("Validates a block plan document (JSON).");
            eprintln!();
            eprintln!("Example:");
            eprintln!("  validate-plan evenings.json");
            return ExitCode::from(2);
        }
    };

    let content = match std::fs::read_to_string(&plan_path) {
        Ok(content) => content,
        Err(e) => {
            eprintln!("Error: cannot read {}: {}", plan_path.display(), e);
            return ExitCode::from(1);
        }
    };

    let mut missing_id = false;
    let result = serde_json::from_str::<RawPlanDocument>(&content)
        .map_err(PlanError::from)
        .and_then(|mut raw| {
            missing_id = fill_missing_id(&mut raw, || "unassigned".into());
            plan_from_document(raw)
        });

    match result {
        Ok(plan) => {
            println!("✓ Plan is valid");
            println!();
            println!("Summary:");
            println!("  Document version: {}", CURRENT_DOCUMENT_VERSION);
            if missing_id {
                println!("  Id: none (assigned on import)");
            } else {
                println!("  Id: {}", plan.id());
            }
            println!("  Name: {}", plan.name());
            println!("  Window: {}", plan.window());
            println!("  Active: {}", plan.is_active());
            println!("  Rules: {}", plan.rule_count());

            if plan.rule_count() > 0 {
                println!();
                println!("Rules:");
                for rule in plan.rules() {
                    let limit = if rule.has_daily_limit() {
                        format!("{} min/day outside window", rule.daily_limit_minutes)
                    } else {
                        "no limit outside window".to_string()
                    };
                    let in_window = if rule.blocked_in_window {
                        "blocked in window"
                    } else {
                        "allowed in window"
                    };
                    println!(
                        "  - {} ({}): {}, {}",
                        rule.app_id, rule.label(), in_window, limit
                    );
                }
            }

            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("✗ Plan validation failed");
            eprintln!();
            match &e {
                PlanError::Json(json_err) => {
                    eprintln!("JSON error:");
                    eprintln!("  {}", json_err);
                }
                PlanError::ValidationFailed { errors } => {
                    eprintln!("Validation errors ({}):", errors.len());
                    for err in errors {
                        eprintln!("  - {}", err);
                    }
                }
                PlanError::UnsupportedVersion(ver) => {
                    eprintln!(
                        "Unsupported document version: {} (expected {})",
                        ver, CURRENT_DOCUMENT_VERSION
                    );
                }
            }
            ExitCode::from(1)
        }
    }
}
