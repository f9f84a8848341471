//! Core types for merge-all

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Detected platform type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Platform {
    /// GitHub or GitHub Enterprise
    GitHub,
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::GitHub => write!(f, "GitHub"),
        }
    }
}

/// Platform configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformConfig {
    /// Platform type
    pub platform: Platform,
    /// Repository owner (user or organization)
    pub owner: String,
    /// Repository name
    pub repo: String,
    /// Custom host (None for github.com)
    pub host: Option<String>,
}

/// PR lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PrState {
    /// PR is open and can be merged
    Open,
    /// PR was closed without merging
    Closed,
    /// PR was merged
    Merged,
}

impl std::fmt::Display for PrState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open => write!(f, "open"),
            Self::Closed => write!(f, "closed"),
            Self::Merged => write!(f, "merged"),
        }
    }
}

/// Host-computed classification of whether a PR can merge cleanly
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mergeability {
    /// Up to date and conflict free
    Clean,
    /// Head branch is behind the base branch
    Behind,
    /// Merge commit cannot be cleanly created
    Dirty,
    /// Clean, with pre-receive hooks configured
    HasHooks,
    /// Host reports conflicts with the base branch
    Conflicting,
    /// Blocked by branch protection
    Blocked,
    /// Mergeable with non-passing commit status
    Unstable,
    /// Host has not finished computing
    Unknown,
}

impl Mergeability {
    /// Whether the PR cannot be merged without manual conflict resolution
    pub const fn has_conflicts(self) -> bool {
        matches!(self, Self::Dirty | Self::Conflicting)
    }
}

impl std::fmt::Display for Mergeability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Clean => "CLEAN",
            Self::Behind => "BEHIND",
            Self::Dirty => "DIRTY",
            Self::HasHooks => "HAS_HOOKS",
            Self::Conflicting => "CONFLICTING",
            Self::Blocked => "BLOCKED",
            Self::Unstable => "UNSTABLE",
            Self::Unknown => "UNKNOWN",
        };
        f.write_str(s)
    }
}

/// Review decision recorded on a PR
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReviewDecision {
    /// Required reviews approved
    Approved,
    /// A reviewer requested changes
    ChangesRequested,
    /// Review is required and missing
    ReviewRequired,
}

impl std::fmt::Display for ReviewDecision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Approved => "APPROVED",
            Self::ChangesRequested => "CHANGES_REQUESTED",
            Self::ReviewRequired => "REVIEW_REQUIRED",
        };
        f.write_str(s)
    }
}

/// A pull request with the fields merge-all needs to decide on it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeRequest {
    /// PR number
    pub number: u64,
    /// PR title
    pub title: String,
    /// Head branch name
    pub head_ref: String,
    /// Base branch name
    pub base_ref: String,
    /// Label names
    pub labels: BTreeSet<String>,
    /// Author login
    pub author: Option<String>,
    /// When the PR was opened
    pub created_at: Option<DateTime<Utc>>,
    /// Whether PR is a draft
    pub is_draft: bool,
    /// Current lifecycle state
    pub state: PrState,
    /// Merge state as computed by the host
    pub mergeability: Mergeability,
    /// Review decision; `None` when the host records none
    pub review_decision: Option<ReviewDecision>,
    /// Web URL for the PR
    pub html_url: String,
}

impl ChangeRequest {
    /// Check whether the PR carries a label
    pub fn has_label(&self, label: &str) -> bool {
        self.labels.contains(label)
    }
}

/// Run state of a single check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CheckStatus {
    /// Queued or waiting
    Pending,
    /// Running
    InProgress,
    /// Finished; see conclusion
    Completed,
}

/// Conclusion of a completed check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CheckConclusion {
    /// Passed
    Success,
    /// Failed
    Failure,
    /// Errored before producing a result
    Error,
    /// Cancelled
    Cancelled,
    /// Exceeded its time limit
    TimedOut,
    /// Finished without a pass/fail verdict
    Neutral,
    /// Not run
    Skipped,
}

impl CheckConclusion {
    /// Whether this conclusion blocks a merge
    pub const fn is_failure(self) -> bool {
        matches!(
            self,
            Self::Failure | Self::Error | Self::Cancelled | Self::TimedOut
        )
    }
}

impl std::fmt::Display for CheckConclusion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Success => "SUCCESS",
            Self::Failure => "FAILURE",
            Self::Error => "ERROR",
            Self::Cancelled => "CANCELLED",
            Self::TimedOut => "TIMED_OUT",
            Self::Neutral => "NEUTRAL",
            Self::Skipped => "SKIPPED",
        };
        f.write_str(s)
    }
}

/// One named verification job attached to a PR
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckRun {
    /// Check name
    pub name: String,
    /// Run state
    pub status: CheckStatus,
    /// Present only when completed
    pub conclusion: Option<CheckConclusion>,
}

impl CheckRun {
    /// Whether the check has not reached a terminal state
    pub const fn is_pending(&self) -> bool {
        matches!(self.status, CheckStatus::Pending | CheckStatus::InProgress)
    }

    /// Whether the check concluded with a blocking result
    pub fn is_failed(&self) -> bool {
        self.conclusion.is_some_and(CheckConclusion::is_failure)
    }
}

/// Most recent CI pipeline run observed for a branch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineRun {
    /// Workflow name
    pub name: String,
    /// Raw status (`queued`, `in_progress`, `completed`, ...)
    pub status: String,
    /// Raw conclusion when completed (`success`, `failure`, ...)
    pub conclusion: Option<String>,
}

impl PipelineRun {
    /// Whether the run has finished
    pub fn is_completed(&self) -> bool {
        self.status == "completed"
    }

    /// Whether the run finished with a failing conclusion
    ///
    /// `success`, `neutral` and `skipped` pass. A completed run with no
    /// conclusion is not treated as failed.
    pub fn is_failed(&self) -> bool {
        self.is_completed()
            && self
                .conclusion
                .as_deref()
                .is_some_and(|c| !matches!(c, "success" | "neutral" | "skipped"))
    }
}

/// Result of a branch update request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BranchUpdate {
    /// Branch was rebased onto its base
    Updated,
    /// Host refused because of conflicts
    Conflict(String),
    /// Host refused for another reason
    Rejected(String),
}

/// Result of a merge operation
#[derive(Debug, Clone)]
pub struct MergeResult {
    /// Whether the merge was successful
    pub merged: bool,
    /// The SHA of the merge commit (if successful)
    pub sha: Option<String>,
    /// Message from the merge operation (especially on failure)
    pub message: Option<String>,
}

/// Merge strategy/method
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeMethod {
    /// Squash all commits into one
    Squash,
    /// Create a merge commit
    Merge,
    /// Rebase commits onto base branch
    Rebase,
}

impl std::fmt::Display for MergeMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Squash => write!(f, "squash"),
            Self::Merge => write!(f, "merge"),
            Self::Rebase => write!(f, "rebase"),
        }
    }
}
