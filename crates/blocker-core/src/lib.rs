//! Blocking-decision engine for the app blocker
//!
//! This crate contains:
//! - The usage ledger (per app, per local calendar day)
//! - The pure decision function (window rule, then daily limit)
//! - `BlockerEngine`, which guards the plan and ledger behind reader-writer
//!   locks and keeps them in step with the store
//! - Usage summaries for display

mod decision;
mod engine;
mod ledger;
mod summary;

pub use decision::*;
pub use engine::*;
pub use ledger::*;
pub use summary::*;
