//! Merge session controller
//!
//! Drives a discovered queue one PR at a time. Each PR passes through a
//! fixed sequence of gates; a gate either proceeds, skips the PR and moves
//! on, or skips the PR and halts the session. The processed PRs
//! (merged or skipped) always form a prefix of the queue.

use crate::config::{DEFAULT_BASE, DEFAULT_LABEL, DEFAULT_REMOTE, DEFAULT_TIMEOUT_MINUTES};
use crate::error::Result;
use crate::merge::checks::{DEFAULT_POLL_INTERVAL, PollOptions, wait_for_checks};
use crate::merge::health::{TrunkHealth, verify_trunk_health};
use crate::merge::preflight::run_preflight;
use crate::merge::progress::ProgressCallback;
use crate::merge::readiness::{
    REASON_CONFLICTS, REASON_FETCH_FAILED, Verdict, evaluate_lifecycle, evaluate_readiness,
    is_unexpected_state, needs_branch_update,
};
use crate::platform::PlatformService;
use crate::repo::LocalRepository;
use crate::types::{BranchUpdate, ChangeRequest, MergeMethod, PrState};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Pause after a branch update so the host can recompute mergeability
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(3);

/// Configuration for one session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// PRs must carry this label
    pub label: String,
    /// PRs must also carry this label, when set
    pub session_label: Option<String>,
    /// Trunk branch PRs target
    pub base: String,
    /// Remote trunk is fetched from
    pub remote: String,
    /// Process at most this many PRs
    pub limit: Option<usize>,
    /// How long to wait for checks on one PR
    pub check_timeout: Duration,
    /// Time between check queries
    pub poll_interval: Duration,
    /// Pause after a branch update
    pub settle_delay: Duration,
    /// Evaluate everything but never mutate the host
    pub dry_run: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            label: DEFAULT_LABEL.to_string(),
            session_label: None,
            base: DEFAULT_BASE.to_string(),
            remote: DEFAULT_REMOTE.to_string(),
            limit: None,
            check_timeout: Duration::from_secs(DEFAULT_TIMEOUT_MINUTES * 60),
            poll_interval: DEFAULT_POLL_INTERVAL,
            settle_delay: DEFAULT_SETTLE_DELAY,
            dry_run: false,
        }
    }
}

/// How a PR was merged
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    /// Merged on the host
    Merged {
        /// Merge commit, if reported
        sha: Option<String>,
    },
    /// Dry run: every gate passed, nothing was mutated
    WouldMerge,
}

impl std::fmt::Display for MergeOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Merged { .. } => write!(f, "merged"),
            Self::WouldMerge => write!(f, "would merge"),
        }
    }
}

/// A PR that passed every gate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedItem {
    /// PR number
    pub number: u64,
    /// PR title
    pub title: String,
    /// Head branch
    pub head_ref: String,
    /// Merge result
    pub outcome: MergeOutcome,
    /// Trunk health observed right after
    pub trunk: TrunkHealth,
}

/// A PR that was skipped
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedItem {
    /// PR number
    pub number: u64,
    /// PR title
    pub title: String,
    /// Why it was skipped
    pub reason: String,
    /// Whether the skip halted the session
    pub fatal: bool,
}

/// Why the session stopped early
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HaltKind {
    /// A PR failed a gate
    Blocked,
    /// A merge landed but trunk CI is failing
    TrunkUnhealthy,
}

/// Where and why the session halted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Halt {
    /// PR that triggered the halt
    pub number: u64,
    /// Reason shown to the user
    pub reason: String,
    /// Halt category
    pub kind: HaltKind,
}

/// Per-PR status within a finished session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemStatus {
    /// Merged (or would merge)
    Merged,
    /// Skipped
    Skipped,
    /// Never evaluated because the session halted first
    NotReached,
}

impl std::fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Merged => write!(f, "merged"),
            Self::Skipped => write!(f, "skipped"),
            Self::NotReached => write!(f, "not reached"),
        }
    }
}

/// Record of one session
#[derive(Debug, Clone)]
pub struct MergeSession {
    /// Configuration used
    pub config: SessionConfig,
    /// Discovered PRs in processing order
    pub queue: Vec<ChangeRequest>,
    /// Merged PRs, in order
    pub merged: Vec<MergedItem>,
    /// Skipped PRs, in order
    pub skipped: Vec<SkippedItem>,
    /// Set when the session stopped before exhausting the queue
    pub halt: Option<Halt>,
}

impl MergeSession {
    /// Status of a queued PR
    pub fn status_of(&self, number: u64) -> ItemStatus {
        if self.merged.iter().any(|m| m.number == number) {
            ItemStatus::Merged
        } else if self.skipped.iter().any(|s| s.number == number) {
            ItemStatus::Skipped
        } else {
            ItemStatus::NotReached
        }
    }

    /// Number of queued PRs that were merged or skipped
    pub fn processed_count(&self) -> usize {
        self.merged.len() + self.skipped.len()
    }

    /// Queued PRs never evaluated
    pub fn not_reached(&self) -> impl Iterator<Item = &ChangeRequest> {
        self.queue.iter().skip(self.processed_count())
    }

    /// Whether the session stopped early
    pub const fn is_halted(&self) -> bool {
        self.halt.is_some()
    }

    /// Process exit status.
    ///
    /// `0` when nothing was skipped, `1` when PRs were skipped and none
    /// merged, `2` for a partial result. A trunk-health halt shows up in the
    /// summary and report only.
    pub fn exit_code(&self) -> u8 {
        match (self.skipped.is_empty(), self.merged.is_empty()) {
            (true, _) => 0,
            (false, true) => 1,
            (false, false) => 2,
        }
    }
}

/// Discover the queue: open PRs with the labels, targeting `base`,
/// oldest first, truncated to `limit`.
pub async fn discover(
    platform: &dyn PlatformService,
    config: &SessionConfig,
) -> Result<Vec<ChangeRequest>> {
    let mut prs = platform
        .list_open_prs(&config.label, config.session_label.as_deref(), &config.base)
        .await?;

    prs.retain(|pr| {
        pr.state == PrState::Open
            && pr.base_ref == config.base
            && pr.has_label(&config.label)
            && config
                .session_label
                .as_deref()
                .is_none_or(|session| pr.has_label(session))
    });
    prs.sort_by_key(|pr| pr.number);
    prs.dedup_by_key(|pr| pr.number);

    if let Some(limit) = config.limit {
        prs.truncate(limit);
    }

    debug!(count = prs.len(), "discovered queue");
    Ok(prs)
}

/// How a PR left the pipeline without merging
enum Stopped {
    Skip(String),
    Halt(String),
}

fn gate(verdict: Verdict) -> std::result::Result<(), Stopped> {
    match verdict {
        Verdict::Proceed => Ok(()),
        Verdict::Skip(reason) => Err(Stopped::Skip(reason)),
        Verdict::Halt(reason) => Err(Stopped::Halt(reason)),
    }
}

struct Controller<'a> {
    platform: &'a dyn PlatformService,
    repo: &'a dyn LocalRepository,
    config: &'a SessionConfig,
    progress: &'a dyn ProgressCallback,
}

impl Controller<'_> {
    /// Run one PR through every gate, merge it, and check trunk
    async fn process(
        &self,
        queued: &ChangeRequest,
    ) -> std::result::Result<MergedItem, Stopped> {
        let number = queued.number;

        // Fresh details: the queue snapshot may be stale
        let pr = self.platform.get_pr_details(number).await.map_err(|e| {
            warn!(number, error = %e, "failed to fetch PR details");
            Stopped::Skip(REASON_FETCH_FAILED.to_string())
        })?;

        gate(evaluate_lifecycle(&pr))?;

        let pr = if needs_branch_update(&pr) {
            self.update_branch(pr).await?
        } else {
            pr
        };

        // In dry-run a BEHIND snapshot is expected here
        if is_unexpected_state(pr.mergeability)
            && !(self.config.dry_run && needs_branch_update(&pr))
        {
            self.progress
                .on_warning(&format!("Unexpected merge state: {}", pr.mergeability))
                .await;
        }

        gate(evaluate_readiness(&pr))?;
        self.progress.on_success("[OK] Review requirements met").await;

        self.progress.on_message("Waiting for status checks...").await;
        let checks = wait_for_checks(
            self.platform,
            number,
            PollOptions {
                timeout: self.config.check_timeout,
                interval: self.config.poll_interval,
            },
            self.progress,
        )
        .await;
        gate(checks.verdict())?;
        self.progress
            .on_success(&format!("[OK] {}", checks.message()))
            .await;

        let outcome = self.merge(&pr).await?;

        self.progress
            .on_message(&format!("Verifying {} health...", self.config.base))
            .await;
        let trunk = verify_trunk_health(
            self.platform,
            self.repo,
            &self.config.remote,
            &self.config.base,
            self.progress,
        )
        .await;

        Ok(MergedItem {
            number,
            title: pr.title,
            head_ref: pr.head_ref,
            outcome,
            trunk,
        })
    }

    /// Rebase a PR that is behind trunk and return its refreshed snapshot
    async fn update_branch(
        &self,
        pr: ChangeRequest,
    ) -> std::result::Result<ChangeRequest, Stopped> {
        if self.config.dry_run {
            self.progress
                .on_message("[DRY RUN] Branch is behind - would update")
                .await;
            return Ok(pr);
        }

        self.progress.on_message("Branch is behind - updating...").await;
        match self.platform.update_branch(pr.number).await {
            Ok(BranchUpdate::Updated) => {}
            Ok(BranchUpdate::Conflict(message)) => {
                debug!(number = pr.number, %message, "branch update conflict");
                return Err(Stopped::Halt(REASON_CONFLICTS.to_string()));
            }
            Ok(BranchUpdate::Rejected(message)) => {
                return Err(Stopped::Halt(format!("failed to update branch: {message}")));
            }
            Err(e) => return Err(Stopped::Halt(format!("failed to update branch: {e}"))),
        }
        self.progress.on_success("[OK] Branch updated").await;

        sleep(self.config.settle_delay).await;

        self.platform.get_pr_details(pr.number).await.map_err(|e| {
            warn!(number = pr.number, error = %e, "failed to refetch PR after update");
            Stopped::Halt(format!("failed to fetch details after branch update: {e}"))
        })
    }

    async fn merge(&self, pr: &ChangeRequest) -> std::result::Result<MergeOutcome, Stopped> {
        if self.config.dry_run {
            self.progress.on_success("[DRY RUN] Would merge PR").await;
            return Ok(MergeOutcome::WouldMerge);
        }

        self.progress.on_message("Merging PR...").await;
        match self
            .platform
            .merge_pr(pr.number, MergeMethod::Squash, true)
            .await
        {
            Ok(result) if result.merged => {
                self.progress.on_success("[OK] PR merged").await;
                Ok(MergeOutcome::Merged { sha: result.sha })
            }
            Ok(result) => Err(Stopped::Halt(format!(
                "merge failed: {}",
                result
                    .message
                    .unwrap_or_else(|| "host did not merge the PR".to_string())
            ))),
            Err(e) => Err(Stopped::Halt(format!("merge failed: {e}"))),
        }
    }
}

/// Process `queue` in order, stopping at the first halting condition.
///
/// Never fails: every gateway error becomes a skip or a halt recorded in the
/// returned session.
pub async fn run_session(
    platform: &dyn PlatformService,
    repo: &dyn LocalRepository,
    config: SessionConfig,
    queue: Vec<ChangeRequest>,
    progress: &dyn ProgressCallback,
) -> MergeSession {
    let mut merged = Vec::new();
    let mut skipped = Vec::new();
    let mut halt = None;

    let controller = Controller {
        platform,
        repo,
        config: &config,
        progress,
    };

    let total = queue.len();
    for (index, queued) in queue.iter().enumerate() {
        progress.on_item_start(index + 1, total, queued).await;

        match controller.process(queued).await {
            Ok(item) if item.trunk.is_healthy() => {
                progress.on_success(&format!("[OK] {}", item.trunk)).await;
                info!(number = item.number, outcome = %item.outcome, "PR done");
                merged.push(item);
            }
            Ok(item) => {
                let reason = format!("trunk may be broken: {}", item.trunk);
                progress
                    .on_error(&format!(
                        "STOPPING after PR #{}: {reason} (merged {}, skipped {})",
                        item.number,
                        merged.len() + 1,
                        skipped.len()
                    ))
                    .await;
                halt = Some(Halt {
                    number: item.number,
                    reason,
                    kind: HaltKind::TrunkUnhealthy,
                });
                merged.push(item);
                break;
            }
            Err(Stopped::Skip(reason)) => {
                progress
                    .on_warning(&format!("Skipping PR #{}: {reason}", queued.number))
                    .await;
                skipped.push(SkippedItem {
                    number: queued.number,
                    title: queued.title.clone(),
                    reason,
                    fatal: false,
                });
            }
            Err(Stopped::Halt(reason)) => {
                progress
                    .on_error(&format!(
                        "STOPPING at PR #{}: {reason} (merged {}, skipped {})",
                        queued.number,
                        merged.len(),
                        skipped.len() + 1
                    ))
                    .await;
                skipped.push(SkippedItem {
                    number: queued.number,
                    title: queued.title.clone(),
                    reason: reason.clone(),
                    fatal: true,
                });
                halt = Some(Halt {
                    number: queued.number,
                    reason,
                    kind: HaltKind::Blocked,
                });
                break;
            }
        }
    }

    MergeSession {
        config,
        queue,
        merged,
        skipped,
        halt,
    }
}

/// Preflight, discover, and process in one call
pub async fn execute_session(
    platform: &dyn PlatformService,
    repo: &dyn LocalRepository,
    config: SessionConfig,
    progress: &dyn ProgressCallback,
) -> Result<MergeSession> {
    run_preflight(platform, repo, &config.remote, progress).await?;
    let queue = discover(platform, &config).await?;
    Ok(run_session(platform, repo, config, queue, progress).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(merged: usize, skipped: usize, halted: bool) -> MergeSession {
        let trunk = TrunkHealth {
            branch: "main".into(),
            commit: None,
            status: crate::merge::TrunkStatus::NoCi,
        };
        MergeSession {
            config: SessionConfig::default(),
            queue: Vec::new(),
            merged: (0..merged as u64)
                .map(|n| MergedItem {
                    number: n,
                    title: String::new(),
                    head_ref: String::new(),
                    outcome: MergeOutcome::WouldMerge,
                    trunk: trunk.clone(),
                })
                .collect(),
            skipped: (0..skipped as u64)
                .map(|n| SkippedItem {
                    number: 100 + n,
                    title: String::new(),
                    reason: "x".into(),
                    fatal: false,
                })
                .collect(),
            halt: halted.then(|| Halt {
                number: 0,
                reason: "x".into(),
                kind: HaltKind::TrunkUnhealthy,
            }),
        }
    }

    #[test]
    fn test_exit_code_mapping() {
        assert_eq!(session(1, 0, false).exit_code(), 0);
        assert_eq!(session(0, 1, false).exit_code(), 1);
        assert_eq!(session(1, 1, false).exit_code(), 2);
        assert_eq!(session(0, 0, false).exit_code(), 0);
    }

    #[test]
    fn test_trunk_halt_keeps_merge_status() {
        assert_eq!(session(1, 0, true).exit_code(), 0);
        assert_eq!(session(2, 1, true).exit_code(), 2);
        assert!(session(1, 0, true).is_halted());
    }
}
