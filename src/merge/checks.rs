//! Check polling
//!
//! Waits for the checks on a PR to reach a terminal aggregate state. The
//! aggregation rule is a pure function; the wait loop re-queries the
//! platform on a fixed interval until success, failure, or timeout.

use crate::merge::progress::ProgressCallback;
use crate::merge::readiness::Verdict;
use crate::platform::PlatformService;
use crate::types::CheckRun;
use std::time::Duration;
use tokio::time::{Instant, sleep};
use tracing::{debug, warn};

/// Interval between check queries
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Aggregate state of a PR's checks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckAggregate {
    /// Every check passed, or there are none
    Success,
    /// At least one check is still running and none failed
    Pending,
    /// At least one check failed
    Failure,
}

/// Aggregate a set of checks.
///
/// Failure is checked before pending, so a failed check is reported even
/// while others are still running. An empty set is a success.
pub fn aggregate_checks(checks: &[CheckRun]) -> CheckAggregate {
    if checks.iter().any(CheckRun::is_failed) {
        CheckAggregate::Failure
    } else if checks.iter().any(CheckRun::is_pending) {
        CheckAggregate::Pending
    } else {
        CheckAggregate::Success
    }
}

/// Result of waiting for checks
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutcome {
    /// All checks passed (summary)
    Passed(String),
    /// Named checks failed
    Failed(String),
    /// Still pending when the timeout elapsed
    TimedOut(String),
}

impl CheckOutcome {
    /// Whether the PR may be merged
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Passed(_))
    }

    /// Human-readable message
    pub fn message(&self) -> &str {
        match self {
            Self::Passed(m) | Self::Failed(m) | Self::TimedOut(m) => m,
        }
    }

    /// Gate verdict: anything but success halts the session
    pub fn verdict(&self) -> Verdict {
        match self {
            Self::Passed(_) => Verdict::Proceed,
            Self::Failed(m) | Self::TimedOut(m) => Verdict::Halt(m.clone()),
        }
    }
}

/// Timing for [`wait_for_checks`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollOptions {
    /// Give up after this long
    pub timeout: Duration,
    /// Time between queries
    pub interval: Duration,
}

fn names(checks: &[CheckRun], pred: impl Fn(&CheckRun) -> bool) -> Vec<String> {
    checks
        .iter()
        .filter(|c| pred(c))
        .map(|c| c.name.clone())
        .collect()
}

/// Block until the PR's checks pass, fail, or `options.timeout` elapses.
///
/// A failed query is logged and treated like a pending result: the next
/// poll tries again, and the timeout still bounds the wait.
pub async fn wait_for_checks(
    platform: &dyn PlatformService,
    pr_number: u64,
    options: PollOptions,
    progress: &dyn ProgressCallback,
) -> CheckOutcome {
    let start = Instant::now();

    let outcome = loop {
        let mut pending = Vec::new();
        match platform.get_check_runs(pr_number).await {
            Ok(checks) => match aggregate_checks(&checks) {
                CheckAggregate::Success if checks.is_empty() => {
                    break CheckOutcome::Passed("no checks required".to_string());
                }
                CheckAggregate::Success => {
                    break CheckOutcome::Passed(format!("all {} checks passed", checks.len()));
                }
                CheckAggregate::Failure => {
                    let failed = names(&checks, CheckRun::is_failed);
                    break CheckOutcome::Failed(format!("checks failed: {}", failed.join(", ")));
                }
                CheckAggregate::Pending => {
                    pending = names(&checks, CheckRun::is_pending);
                    debug!(pr_number, ?pending, "checks pending");
                }
            },
            Err(e) => {
                warn!(pr_number, error = %e, "failed to query checks");
                progress
                    .on_warning(&format!("Could not query checks for PR #{pr_number}: {e}"))
                    .await;
            }
        }

        let elapsed = start.elapsed();
        if elapsed >= options.timeout {
            break CheckOutcome::TimedOut(format!(
                "timed out after {} minute(s) waiting for checks",
                elapsed.as_secs() / 60
            ));
        }

        let remaining = options.timeout - elapsed;
        progress
            .on_checks_pending(pr_number, &pending, remaining)
            .await;
        sleep(options.interval.min(remaining)).await;
    };

    progress.on_checks_done(pr_number).await;
    outcome
}
