//! Platform services for the code host
//!
//! Every read and write merge-all performs against the host goes through
//! [`PlatformService`], so the session controller can be driven by a
//! scripted fake in tests.

mod detection;
mod factory;
mod github;

pub use detection::parse_repo_info;
pub use factory::create_platform_service;
pub use github::GitHubService;

use crate::error::Result;
use crate::types::{
    BranchUpdate, ChangeRequest, CheckRun, MergeMethod, MergeResult, PipelineRun, PlatformConfig,
};
use async_trait::async_trait;

/// Platform service trait for PR operations
///
/// All calls are request/response. `Err` means the call itself failed
/// (transport, auth, malformed response); domain-level refusals are part of
/// the returned value where the contract has one (`BranchUpdate`,
/// `MergeResult`).
#[async_trait]
pub trait PlatformService: Send + Sync {
    /// Confirm the credentials are valid, returning the authenticated login
    async fn verify_auth(&self) -> Result<String>;

    /// List open PRs against `base` carrying `label`.
    ///
    /// When `session_label` is given, PRs must carry it as well. Order is
    /// unspecified; the session sorts.
    async fn list_open_prs(
        &self,
        label: &str,
        session_label: Option<&str>,
        base: &str,
    ) -> Result<Vec<ChangeRequest>>;

    /// Get fresh details for a PR
    async fn get_pr_details(&self, pr_number: u64) -> Result<ChangeRequest>;

    /// Get the checks attached to the PR's head commit
    async fn get_check_runs(&self, pr_number: u64) -> Result<Vec<CheckRun>>;

    /// Rebase the PR's head branch onto its base
    async fn update_branch(&self, pr_number: u64) -> Result<BranchUpdate>;

    /// Merge a PR, optionally deleting its head branch afterwards
    async fn merge_pr(
        &self,
        pr_number: u64,
        method: MergeMethod,
        delete_branch: bool,
    ) -> Result<MergeResult>;

    /// Most recent CI pipeline run on `branch`, if any
    async fn get_recent_pipeline_run(&self, branch: &str) -> Result<Option<PipelineRun>>;

    /// Get the platform configuration
    fn config(&self) -> &PlatformConfig;
}
