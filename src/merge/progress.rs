//! Progress reporting for merge sessions
//!
//! The session never prints. Everything user-facing goes through a
//! [`ProgressCallback`] supplied by the caller.

use crate::types::ChangeRequest;
use async_trait::async_trait;
use std::time::Duration;

/// Receives progress events from a running session
#[async_trait]
pub trait ProgressCallback: Send + Sync {
    /// Informational message
    async fn on_message(&self, message: &str);

    /// A step completed successfully
    async fn on_success(&self, message: &str) {
        self.on_message(message).await;
    }

    /// Something unexpected that does not stop the item
    async fn on_warning(&self, message: &str) {
        self.on_message(message).await;
    }

    /// A step failed
    async fn on_error(&self, message: &str) {
        self.on_message(message).await;
    }

    /// Processing of a queued PR begins (`position` is 1-based)
    async fn on_item_start(&self, position: usize, total: usize, pr: &ChangeRequest) {
        self.on_message(&format!(
            "Processing PR #{} ({position}/{total}): {}",
            pr.number, pr.title
        ))
        .await;
    }

    /// Checks are still running
    async fn on_checks_pending(&self, _pr_number: u64, _pending: &[String], _remaining: Duration) {}

    /// Check polling for a PR ended, whatever the result
    async fn on_checks_done(&self, _pr_number: u64) {}
}

/// Progress callback that discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopProgress;

#[async_trait]
impl ProgressCallback for NoopProgress {
    async fn on_message(&self, _message: &str) {}
}
