//! Merge orchestrator
//!
//! A session runs in four stages:
//! 1. Preflight - credentials, clean workspace, fresh trunk (effectful, aborts early)
//! 2. Discover - list, filter, and order the queue (effectful, read-only)
//! 3. Process - one PR at a time through the readiness gates, check
//!    polling, merge, and trunk verification (effectful, fail-stop)
//! 4. Report - render the immutable audit record (pure) and write it
//!
//! The gate decisions themselves ([`readiness`], [`checks::aggregate_checks`])
//! are pure and tested without a platform.

pub mod checks;
pub mod health;
pub mod preflight;
pub mod progress;
pub mod readiness;
pub mod report;
pub mod session;

pub use checks::{CheckAggregate, CheckOutcome, PollOptions, aggregate_checks, wait_for_checks};
pub use health::{TrunkHealth, TrunkStatus, verify_trunk_health};
pub use preflight::run_preflight;
pub use progress::{NoopProgress, ProgressCallback};
pub use readiness::{Verdict, evaluate_readiness};
pub use report::{render_report, report_file_name, write_report};
pub use session::{
    Halt, HaltKind, ItemStatus, MergeOutcome, MergeSession, MergedItem, SessionConfig,
    SkippedItem, discover, execute_session, run_session,
};
