//! Readiness evaluation - pure decisions over a PR snapshot
//!
//! No I/O happens here. The session fetches the snapshot and acts on the
//! [`Verdict`].

use crate::types::{ChangeRequest, Mergeability, PrState, ReviewDecision};

/// Skip reason when fresh details cannot be fetched
pub const REASON_FETCH_FAILED: &str = "failed to fetch details";

/// Skip reason for draft PRs
pub const REASON_DRAFT: &str = "is a draft";

/// Skip reason for PRs merged since discovery
pub const REASON_ALREADY_MERGED: &str = "already merged";

/// Skip reason for PRs closed since discovery
pub const REASON_CLOSED: &str = "closed without merging";

/// Halt reason for conflicting PRs
pub const REASON_CONFLICTS: &str = "merge conflicts — manual resolution required";

/// Halt reason when a reviewer requested changes
pub const REASON_CHANGES_REQUESTED: &str = "changes requested - needs update and re-approval";

/// Halt reason when a required review is missing
pub const REASON_REVIEW_REQUIRED: &str = "review required - needs approval";

/// Outcome of a gate in the per-PR pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Continue to the next gate
    Proceed,
    /// Record a skip and move on to the next PR
    Skip(String),
    /// Record a skip and stop the session
    Halt(String),
}

impl Verdict {
    /// Evaluate `next` only if this verdict proceeds
    #[must_use]
    pub fn and_then(self, next: impl FnOnce() -> Self) -> Self {
        match self {
            Self::Proceed => next(),
            stopped => stopped,
        }
    }

    /// Whether the session may continue with this PR
    pub const fn is_proceed(&self) -> bool {
        matches!(self, Self::Proceed)
    }

    /// Whether the session must stop
    pub const fn is_halt(&self) -> bool {
        matches!(self, Self::Halt(_))
    }
}

/// Lifecycle gate: drafts, merged and closed PRs are skipped without halting
pub fn evaluate_lifecycle(pr: &ChangeRequest) -> Verdict {
    if pr.is_draft {
        return Verdict::Skip(REASON_DRAFT.to_string());
    }
    match pr.state {
        PrState::Open => Verdict::Proceed,
        PrState::Merged => Verdict::Skip(REASON_ALREADY_MERGED.to_string()),
        PrState::Closed => Verdict::Skip(REASON_CLOSED.to_string()),
    }
}

/// Whether the head branch must be rebased before merging
pub fn needs_branch_update(pr: &ChangeRequest) -> bool {
    pr.mergeability == Mergeability::Behind
}

/// Mergeability gate: conflicts halt, everything else proceeds
pub fn evaluate_mergeability(mergeability: Mergeability) -> Verdict {
    if mergeability.has_conflicts() {
        Verdict::Halt(REASON_CONFLICTS.to_string())
    } else {
        Verdict::Proceed
    }
}

/// Review gate.
///
/// No recorded decision proceeds: the host records none when the branch
/// requires no review.
pub fn evaluate_review(decision: Option<ReviewDecision>) -> Verdict {
    match decision {
        Some(ReviewDecision::ChangesRequested) => {
            Verdict::Halt(REASON_CHANGES_REQUESTED.to_string())
        }
        Some(ReviewDecision::ReviewRequired) => Verdict::Halt(REASON_REVIEW_REQUIRED.to_string()),
        Some(ReviewDecision::Approved) | None => Verdict::Proceed,
    }
}

/// Full readiness decision: lifecycle, then mergeability, then review
pub fn evaluate_readiness(pr: &ChangeRequest) -> Verdict {
    evaluate_lifecycle(pr)
        .and_then(|| evaluate_mergeability(pr.mergeability))
        .and_then(|| evaluate_review(pr.review_decision))
}

/// Mergeability values the session proceeds on but reports as unexpected
pub const fn is_unexpected_state(mergeability: Mergeability) -> bool {
    !matches!(
        mergeability,
        Mergeability::Clean | Mergeability::HasHooks | Mergeability::Dirty | Mergeability::Conflicting
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn pr(mergeability: Mergeability, review: Option<ReviewDecision>) -> ChangeRequest {
        ChangeRequest {
            number: 7,
            title: "Add widget".to_string(),
            head_ref: "feat/widget".to_string(),
            base_ref: "main".to_string(),
            labels: BTreeSet::new(),
            author: None,
            created_at: None,
            is_draft: false,
            state: PrState::Open,
            mergeability,
            review_decision: review,
            html_url: String::new(),
        }
    }

    #[test]
    fn test_draft_takes_precedence_over_conflicts() {
        let mut snapshot = pr(Mergeability::Dirty, Some(ReviewDecision::ChangesRequested));
        snapshot.is_draft = true;
        assert_eq!(
            evaluate_readiness(&snapshot),
            Verdict::Skip(REASON_DRAFT.to_string())
        );
    }

    #[test]
    fn test_conflicts_checked_before_review() {
        let snapshot = pr(Mergeability::Conflicting, Some(ReviewDecision::ReviewRequired));
        assert_eq!(
            evaluate_readiness(&snapshot),
            Verdict::Halt(REASON_CONFLICTS.to_string())
        );
    }

    #[test]
    fn test_behind_is_not_itself_blocking() {
        let snapshot = pr(Mergeability::Behind, Some(ReviewDecision::Approved));
        assert!(needs_branch_update(&snapshot));
        assert!(evaluate_readiness(&snapshot).is_proceed());
    }

    #[test]
    fn test_unexpected_states() {
        assert!(is_unexpected_state(Mergeability::Blocked));
        assert!(is_unexpected_state(Mergeability::Unknown));
        assert!(!is_unexpected_state(Mergeability::Clean));
        assert!(!is_unexpected_state(Mergeability::HasHooks));
    }
}
