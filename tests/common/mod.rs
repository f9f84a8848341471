//! Shared test helpers

#![allow(dead_code)]

mod mock_platform;

pub use mock_platform::{Call, MergePrCall, MockPlatformService};

use async_trait::async_trait;
use merge_all::error::{Error, Result};
use merge_all::merge::{ProgressCallback, SessionConfig};
use merge_all::repo::LocalRepository;
use merge_all::types::{
    ChangeRequest, CheckConclusion, CheckRun, CheckStatus, Mergeability, PipelineRun, Platform,
    PlatformConfig, PrState, ReviewDecision,
};
use std::collections::BTreeSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// GitHub config for `acme/widgets`
pub fn github_config() -> PlatformConfig {
    PlatformConfig {
        platform: Platform::GitHub,
        owner: "acme".to_string(),
        repo: "widgets".to_string(),
        host: None,
    }
}

/// Mock platform for `acme/widgets`
pub fn mock_platform() -> MockPlatformService {
    MockPlatformService::with_config(github_config())
}

/// An open, approved, clean PR labelled `workflow-ready` against `main`
pub fn make_pr(number: u64, title: &str) -> ChangeRequest {
    ChangeRequest {
        number,
        title: title.to_string(),
        head_ref: format!("feat/pr-{number}"),
        base_ref: "main".to_string(),
        labels: BTreeSet::from(["workflow-ready".to_string()]),
        author: Some("octocat".to_string()),
        created_at: None,
        is_draft: false,
        state: PrState::Open,
        mergeability: Mergeability::Clean,
        review_decision: Some(ReviewDecision::Approved),
        html_url: format!("https://github.com/acme/widgets/pull/{number}"),
    }
}

/// Copy of `pr` with a different mergeability
pub fn with_mergeability(pr: &ChangeRequest, mergeability: Mergeability) -> ChangeRequest {
    ChangeRequest {
        mergeability,
        ..pr.clone()
    }
}

/// Copy of `pr` as a draft
pub fn as_draft(pr: &ChangeRequest) -> ChangeRequest {
    ChangeRequest {
        is_draft: true,
        ..pr.clone()
    }
}

/// Completed check with a conclusion
pub fn check(name: &str, conclusion: CheckConclusion) -> CheckRun {
    CheckRun {
        name: name.to_string(),
        status: CheckStatus::Completed,
        conclusion: Some(conclusion),
    }
}

/// Check that is still running
pub fn running(name: &str) -> CheckRun {
    CheckRun {
        name: name.to_string(),
        status: CheckStatus::InProgress,
        conclusion: None,
    }
}

/// Completed trunk workflow run
pub fn pipeline_run(conclusion: &str) -> PipelineRun {
    PipelineRun {
        name: "CI".to_string(),
        status: "completed".to_string(),
        conclusion: Some(conclusion.to_string()),
    }
}

/// Session config with the defaults and no settle delay
pub fn session_config() -> SessionConfig {
    SessionConfig {
        settle_delay: Duration::ZERO,
        ..SessionConfig::default()
    }
}

/// Local repository double
pub struct MockRepository {
    clean: bool,
    fail_fetch: bool,
    commit: Option<String>,
    fetch_count: AtomicUsize,
}

impl MockRepository {
    /// Clean tree, fetch succeeds, trunk resolves
    pub fn new() -> Self {
        Self {
            clean: true,
            fail_fetch: false,
            commit: Some("4f2a9c1e0b7d3a5f6e8c9d0a1b2c3d4e5f6a7b8c".to_string()),
            fetch_count: AtomicUsize::new(0),
        }
    }

    /// Tree with uncommitted changes
    pub fn dirty() -> Self {
        Self {
            clean: false,
            ..Self::new()
        }
    }

    /// Every fetch fails
    pub fn offline() -> Self {
        Self {
            fail_fetch: true,
            ..Self::new()
        }
    }

    /// Number of fetches performed
    pub fn fetch_count(&self) -> usize {
        self.fetch_count.load(Ordering::SeqCst)
    }
}

impl LocalRepository for MockRepository {
    fn is_clean(&self) -> Result<bool> {
        Ok(self.clean)
    }

    fn fetch(&self, remote: &str) -> Result<()> {
        self.fetch_count.fetch_add(1, Ordering::SeqCst);
        if self.fail_fetch {
            return Err(Error::Git(format!("could not read from remote '{remote}'")));
        }
        Ok(())
    }

    fn resolve_commit(&self, rev: &str) -> Result<String> {
        self.commit
            .clone()
            .ok_or_else(|| Error::Git(format!("unknown revision {rev}")))
    }

    fn remote_url(&self, _remote: &str) -> Result<String> {
        Ok("git@github.com:acme/widgets.git".to_string())
    }
}

/// Progress callback that records every message
#[derive(Default)]
pub struct RecordingProgress {
    messages: Mutex<Vec<String>>,
    pending_updates: AtomicUsize,
}

impl RecordingProgress {
    /// All messages received
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }

    /// Whether any message contains `needle`
    pub fn saw(&self, needle: &str) -> bool {
        self.messages().iter().any(|m| m.contains(needle))
    }

    /// Number of pending-check notifications
    pub fn pending_updates(&self) -> usize {
        self.pending_updates.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProgressCallback for RecordingProgress {
    async fn on_message(&self, message: &str) {
        self.messages.lock().unwrap().push(message.to_string());
    }

    async fn on_checks_pending(&self, _pr_number: u64, _pending: &[String], _remaining: Duration) {
        self.pending_updates.fetch_add(1, Ordering::SeqCst);
    }
}
