//! Mock platform service for testing
//!
//! These are test utilities - not all may be used in every test binary.

#![allow(dead_code)]

use async_trait::async_trait;
use merge_all::error::{Error, Result};
use merge_all::platform::PlatformService;
use merge_all::types::{
    BranchUpdate, ChangeRequest, CheckRun, MergeMethod, MergeResult, PipelineRun, PlatformConfig,
};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;

/// Call record for `merge_pr`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergePrCall {
    pub pr_number: u64,
    pub method: MergeMethod,
    pub delete_branch: bool,
}

/// Every gateway call, in the order it was made
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    VerifyAuth,
    ListOpenPrs,
    GetPrDetails(u64),
    GetCheckRuns(u64),
    UpdateBranch(u64),
    MergePr(u64),
    GetRecentPipelineRun(String),
}

/// Scripted platform service
///
/// Manually implements `PlatformService` so each test can script the host
/// one response at a time.
///
/// Features:
/// - Per-PR response sequences for details and checks (the last response
///   repeats once the sequence is drained)
/// - Call tracking for verification
/// - Error injection for failure path testing
pub struct MockPlatformService {
    config: PlatformConfig,
    login: String,
    open_prs: Mutex<Vec<ChangeRequest>>,
    details: Mutex<HashMap<u64, VecDeque<ChangeRequest>>>,
    checks: Mutex<HashMap<u64, VecDeque<Vec<CheckRun>>>>,
    update_responses: Mutex<HashMap<u64, BranchUpdate>>,
    merge_responses: Mutex<HashMap<u64, MergeResult>>,
    pipeline_run: Mutex<Option<PipelineRun>>,
    // Call tracking
    calls: Mutex<Vec<Call>>,
    merge_pr_calls: Mutex<Vec<MergePrCall>>,
    // Error injection
    error_on_auth: Mutex<Option<String>>,
    error_on_list: Mutex<Option<String>>,
    error_on_details: Mutex<HashSet<u64>>,
    error_on_checks: Mutex<HashSet<u64>>,
    error_on_update: Mutex<Option<String>>,
    error_on_merge: Mutex<Option<String>>,
    error_on_pipeline: Mutex<Option<String>>,
}

impl MockPlatformService {
    /// Create a new mock with the given config
    pub fn with_config(config: PlatformConfig) -> Self {
        Self {
            config,
            login: "merge-bot".to_string(),
            open_prs: Mutex::new(Vec::new()),
            details: Mutex::new(HashMap::new()),
            checks: Mutex::new(HashMap::new()),
            update_responses: Mutex::new(HashMap::new()),
            merge_responses: Mutex::new(HashMap::new()),
            pipeline_run: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
            merge_pr_calls: Mutex::new(Vec::new()),
            error_on_auth: Mutex::new(None),
            error_on_list: Mutex::new(None),
            error_on_details: Mutex::new(HashSet::new()),
            error_on_checks: Mutex::new(HashSet::new()),
            error_on_update: Mutex::new(None),
            error_on_merge: Mutex::new(None),
            error_on_pipeline: Mutex::new(None),
        }
    }

    // === Scripting ===

    /// Add an open PR; its details default to the same snapshot
    pub fn add_pr(&self, pr: ChangeRequest) {
        self.details
            .lock()
            .unwrap()
            .entry(pr.number)
            .or_insert_with(|| VecDeque::from([pr.clone()]));
        self.open_prs.lock().unwrap().push(pr);
    }

    /// Script successive `get_pr_details` responses for a PR
    pub fn set_details_sequence(&self, pr_number: u64, snapshots: Vec<ChangeRequest>) {
        self.details
            .lock()
            .unwrap()
            .insert(pr_number, snapshots.into());
    }

    /// Script successive `get_check_runs` responses for a PR
    pub fn set_checks_sequence(&self, pr_number: u64, responses: Vec<Vec<CheckRun>>) {
        self.checks
            .lock()
            .unwrap()
            .insert(pr_number, responses.into());
    }

    /// Set the `update_branch` response for a PR (default: updated)
    pub fn set_update_response(&self, pr_number: u64, response: BranchUpdate) {
        self.update_responses
            .lock()
            .unwrap()
            .insert(pr_number, response);
    }

    /// Set the `merge_pr` response for a PR (default: merged)
    pub fn set_merge_response(&self, pr_number: u64, result: MergeResult) {
        self.merge_responses
            .lock()
            .unwrap()
            .insert(pr_number, result);
    }

    /// Set the latest trunk pipeline run (default: none)
    pub fn set_pipeline_run(&self, run: Option<PipelineRun>) {
        *self.pipeline_run.lock().unwrap() = run;
    }

    // === Error injection methods ===

    /// Make `verify_auth` return an error
    pub fn fail_auth(&self, msg: &str) {
        *self.error_on_auth.lock().unwrap() = Some(msg.to_string());
    }

    /// Make `list_open_prs` return an error
    pub fn fail_list(&self, msg: &str) {
        *self.error_on_list.lock().unwrap() = Some(msg.to_string());
    }

    /// Make `get_pr_details` fail for a PR
    pub fn fail_details(&self, pr_number: u64) {
        self.error_on_details.lock().unwrap().insert(pr_number);
    }

    /// Make `get_check_runs` fail for a PR
    pub fn fail_checks(&self, pr_number: u64) {
        self.error_on_checks.lock().unwrap().insert(pr_number);
    }

    /// Make `update_branch` return a transport error
    pub fn fail_update(&self, msg: &str) {
        *self.error_on_update.lock().unwrap() = Some(msg.to_string());
    }

    /// Make `merge_pr` return an error
    pub fn fail_merge(&self, msg: &str) {
        *self.error_on_merge.lock().unwrap() = Some(msg.to_string());
    }

    /// Make `get_recent_pipeline_run` return an error
    pub fn fail_pipeline(&self, msg: &str) {
        *self.error_on_pipeline.lock().unwrap() = Some(msg.to_string());
    }

    // === Call inspection ===

    /// All calls in order
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Recorded `merge_pr` calls
    pub fn merge_pr_calls(&self) -> Vec<MergePrCall> {
        self.merge_pr_calls.lock().unwrap().clone()
    }

    /// PR numbers passed to `update_branch`
    pub fn update_branch_calls(&self) -> Vec<u64> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::UpdateBranch(n) => Some(n),
                _ => None,
            })
            .collect()
    }

    /// Number of `get_check_runs` calls for a PR
    pub fn check_query_count(&self, pr_number: u64) -> usize {
        self.calls()
            .iter()
            .filter(|c| **c == Call::GetCheckRuns(pr_number))
            .count()
    }

    /// Whether any call touched a PR
    pub fn touched(&self, pr_number: u64) -> bool {
        self.calls().iter().any(|c| {
            matches!(
                c,
                Call::GetPrDetails(n) | Call::GetCheckRuns(n) | Call::UpdateBranch(n) | Call::MergePr(n)
                    if *n == pr_number
            )
        })
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

/// Pop the next scripted response, repeating the last one
fn next_scripted<T: Clone>(queue: &mut VecDeque<T>) -> Option<T> {
    if queue.len() > 1 {
        queue.pop_front()
    } else {
        queue.front().cloned()
    }
}

#[async_trait]
impl PlatformService for MockPlatformService {
    async fn verify_auth(&self) -> Result<String> {
        self.record(Call::VerifyAuth);
        if let Some(msg) = self.error_on_auth.lock().unwrap().as_ref() {
            return Err(Error::Auth(msg.clone()));
        }
        Ok(self.login.clone())
    }

    async fn list_open_prs(
        &self,
        _label: &str,
        _session_label: Option<&str>,
        _base: &str,
    ) -> Result<Vec<ChangeRequest>> {
        self.record(Call::ListOpenPrs);
        if let Some(msg) = self.error_on_list.lock().unwrap().as_ref() {
            return Err(Error::GitHubApi(msg.clone()));
        }
        // Filtering is left to the caller so discovery is exercised
        Ok(self.open_prs.lock().unwrap().clone())
    }

    async fn get_pr_details(&self, pr_number: u64) -> Result<ChangeRequest> {
        self.record(Call::GetPrDetails(pr_number));
        if self.error_on_details.lock().unwrap().contains(&pr_number) {
            return Err(Error::GitHubApi(format!("connection reset fetching #{pr_number}")));
        }
        self.details
            .lock()
            .unwrap()
            .get_mut(&pr_number)
            .and_then(next_scripted)
            .ok_or(Error::NotFound(pr_number))
    }

    async fn get_check_runs(&self, pr_number: u64) -> Result<Vec<CheckRun>> {
        self.record(Call::GetCheckRuns(pr_number));
        if self.error_on_checks.lock().unwrap().contains(&pr_number) {
            return Err(Error::GitHubApi("checks unavailable".to_string()));
        }
        Ok(self
            .checks
            .lock()
            .unwrap()
            .get_mut(&pr_number)
            .and_then(next_scripted)
            .unwrap_or_default())
    }

    async fn update_branch(&self, pr_number: u64) -> Result<BranchUpdate> {
        self.record(Call::UpdateBranch(pr_number));
        if let Some(msg) = self.error_on_update.lock().unwrap().as_ref() {
            return Err(Error::GitHubApi(msg.clone()));
        }
        Ok(self
            .update_responses
            .lock()
            .unwrap()
            .get(&pr_number)
            .cloned()
            .unwrap_or(BranchUpdate::Updated))
    }

    async fn merge_pr(
        &self,
        pr_number: u64,
        method: MergeMethod,
        delete_branch: bool,
    ) -> Result<MergeResult> {
        self.record(Call::MergePr(pr_number));
        self.merge_pr_calls.lock().unwrap().push(MergePrCall {
            pr_number,
            method,
            delete_branch,
        });
        if let Some(msg) = self.error_on_merge.lock().unwrap().as_ref() {
            return Err(Error::GitHubApi(msg.clone()));
        }
        Ok(self
            .merge_responses
            .lock()
            .unwrap()
            .get(&pr_number)
            .cloned()
            .unwrap_or_else(|| MergeResult {
                merged: true,
                sha: Some(format!("{pr_number:0>40}")),
                message: None,
            }))
    }

    async fn get_recent_pipeline_run(&self, branch: &str) -> Result<Option<PipelineRun>> {
        self.record(Call::GetRecentPipelineRun(branch.to_string()));
        if let Some(msg) = self.error_on_pipeline.lock().unwrap().as_ref() {
            return Err(Error::GitHubApi(msg.clone()));
        }
        Ok(self.pipeline_run.lock().unwrap().clone())
    }

    fn config(&self) -> &PlatformConfig {
        &self.config
    }
}
