//! GitHub platform service implementation

use crate::error::{Error, Result};
use crate::platform::PlatformService;
use crate::types::{
    BranchUpdate, ChangeRequest, CheckConclusion, CheckRun, CheckStatus, Mergeability,
    MergeMethod, MergeResult, PipelineRun, Platform, PlatformConfig, PrState, ReviewDecision,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use octocrab::Octocrab;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

/// Fields fetched for every pull request query
const PR_FIELDS: &str = r"
    id
    number
    title
    body
    url
    headRefName
    headRefOid
    baseRefName
    isDraft
    state
    mergeable
    mergeStateStatus
    reviewDecision
    createdAt
    author { login }
    labels(first: 50) { nodes { name } }
";

/// Maximum page size of the check-runs endpoint
const CHECK_RUNS_PAGE_SIZE: usize = 100;

// GraphQL response envelope

#[derive(Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    errors: Option<Vec<GraphQlError>>,
}

#[derive(Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Deserialize)]
struct RepositoryData<T> {
    repository: Option<T>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PullRequestList {
    pull_requests: Connection,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Connection {
    page_info: PageInfo,
    nodes: Vec<GraphQlPullRequest>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageInfo {
    has_next_page: bool,
    end_cursor: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SinglePullRequest {
    pull_request: Option<GraphQlPullRequest>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphQlPullRequest {
    id: String,
    number: u64,
    title: String,
    body: Option<String>,
    url: String,
    head_ref_name: String,
    head_ref_oid: String,
    base_ref_name: String,
    is_draft: bool,
    state: String,
    mergeable: String,
    merge_state_status: String,
    review_decision: Option<String>,
    created_at: Option<DateTime<Utc>>,
    author: Option<GraphQlActor>,
    labels: Option<GraphQlLabels>,
}

#[derive(Deserialize)]
struct GraphQlActor {
    login: String,
}

#[derive(Deserialize)]
struct GraphQlLabels {
    nodes: Vec<GraphQlLabel>,
}

#[derive(Deserialize)]
struct GraphQlLabel {
    name: String,
}

impl From<GraphQlPullRequest> for ChangeRequest {
    fn from(pr: GraphQlPullRequest) -> Self {
        Self {
            number: pr.number,
            mergeability: parse_mergeability(&pr.mergeable, &pr.merge_state_status),
            review_decision: pr.review_decision.as_deref().and_then(parse_review_decision),
            state: parse_pr_state(&pr.state),
            title: pr.title,
            head_ref: pr.head_ref_name,
            base_ref: pr.base_ref_name,
            labels: pr
                .labels
                .map(|l| l.nodes.into_iter().map(|n| n.name).collect())
                .unwrap_or_default(),
            author: pr.author.map(|a| a.login),
            created_at: pr.created_at,
            is_draft: pr.is_draft,
            html_url: pr.url,
        }
    }
}

// REST response types

#[derive(Deserialize)]
struct CheckRunsResponse {
    total_count: Option<usize>,
    check_runs: Vec<RestCheckRun>,
}

#[derive(Deserialize)]
struct RestCheckRun {
    name: String,
    status: String,
    conclusion: Option<String>,
}

#[derive(Deserialize)]
struct CombinedStatus {
    statuses: Vec<CommitStatus>,
}

#[derive(Deserialize)]
struct CommitStatus {
    context: String,
    state: String,
}

#[derive(Deserialize)]
struct WorkflowRunsResponse {
    workflow_runs: Vec<WorkflowRun>,
}

#[derive(Deserialize)]
struct WorkflowRun {
    name: Option<String>,
    status: Option<String>,
    conclusion: Option<String>,
}

/// Combine GitHub's `mergeable` and `mergeStateStatus` into one classification
pub(crate) fn parse_mergeability(mergeable: &str, merge_state_status: &str) -> Mergeability {
    match (mergeable, merge_state_status) {
        (_, "DIRTY") => Mergeability::Dirty,
        ("CONFLICTING", _) => Mergeability::Conflicting,
        (_, "CLEAN") => Mergeability::Clean,
        (_, "BEHIND") => Mergeability::Behind,
        (_, "HAS_HOOKS") => Mergeability::HasHooks,
        (_, "BLOCKED") => Mergeability::Blocked,
        (_, "UNSTABLE") => Mergeability::Unstable,
        _ => Mergeability::Unknown,
    }
}

pub(crate) fn parse_review_decision(decision: &str) -> Option<ReviewDecision> {
    match decision {
        "APPROVED" => Some(ReviewDecision::Approved),
        "CHANGES_REQUESTED" => Some(ReviewDecision::ChangesRequested),
        "REVIEW_REQUIRED" => Some(ReviewDecision::ReviewRequired),
        _ => None,
    }
}

pub(crate) fn parse_pr_state(state: &str) -> PrState {
    match state {
        "OPEN" => PrState::Open,
        "MERGED" => PrState::Merged,
        _ => PrState::Closed,
    }
}

/// Map a check run's status/conclusion pair
pub(crate) fn parse_check_run(name: String, status: &str, conclusion: Option<&str>) -> CheckRun {
    let (status, conclusion) = match status {
        "completed" => {
            let conclusion = match conclusion {
                Some("success") => CheckConclusion::Success,
                Some("neutral") => CheckConclusion::Neutral,
                Some("skipped") => CheckConclusion::Skipped,
                Some("cancelled" | "stale") => CheckConclusion::Cancelled,
                Some("timed_out") => CheckConclusion::TimedOut,
                Some("action_required" | "startup_failure") => CheckConclusion::Error,
                // Completed with no or unrecognised conclusion
                _ => CheckConclusion::Failure,
            };
            (CheckStatus::Completed, Some(conclusion))
        }
        "in_progress" => (CheckStatus::InProgress, None),
        _ => (CheckStatus::Pending, None),
    };
    CheckRun {
        name,
        status,
        conclusion,
    }
}

/// Map a legacy commit status onto a check
pub(crate) fn parse_commit_status(context: String, state: &str) -> CheckRun {
    let conclusion = match state {
        "success" => Some(CheckConclusion::Success),
        "failure" => Some(CheckConclusion::Failure),
        "error" => Some(CheckConclusion::Error),
        _ => None,
    };
    CheckRun {
        name: context,
        status: if conclusion.is_some() {
            CheckStatus::Completed
        } else {
            CheckStatus::Pending
        },
        conclusion,
    }
}

/// Classify a refused branch update
pub(crate) fn classify_update_failure(message: String) -> BranchUpdate {
    if message.to_lowercase().contains("conflict") {
        BranchUpdate::Conflict(message)
    } else {
        BranchUpdate::Rejected(message)
    }
}

/// GitHub service using octocrab for merges and reqwest for GraphQL/REST reads
pub struct GitHubService {
    client: Octocrab,
    config: PlatformConfig,
    /// Token for raw HTTP requests
    token: String,
    /// HTTP client for raw requests
    http_client: Client,
    /// REST API base URL (no trailing slash)
    api_base: String,
    /// GraphQL endpoint URL
    graphql_url: String,
}

impl GitHubService {
    /// Create a new GitHub service
    pub fn new(token: &str, owner: String, repo: String, host: Option<String>) -> Result<Self> {
        let (api_base, graphql_url) = host.as_ref().map_or_else(
            || {
                (
                    "https://api.github.com".to_string(),
                    "https://api.github.com/graphql".to_string(),
                )
            },
            |h| (format!("https://{h}/api/v3"), format!("https://{h}/api/graphql")),
        );

        Self::with_endpoints(
            token,
            PlatformConfig {
                platform: Platform::GitHub,
                owner,
                repo,
                host,
            },
            api_base,
            graphql_url,
        )
    }

    /// Create a service against explicit REST and GraphQL endpoints
    pub fn with_endpoints(
        token: &str,
        config: PlatformConfig,
        api_base: String,
        graphql_url: String,
    ) -> Result<Self> {
        let api_base = api_base.trim_end_matches('/').to_string();

        let client = Octocrab::builder()
            .personal_token(token.to_string())
            .base_uri(api_base.as_str())
            .map_err(|e| Error::GitHubApi(e.to_string()))?
            .build()
            .map_err(|e| Error::GitHubApi(e.to_string()))?;

        let http_client = Client::builder()
            .user_agent("merge-all")
            .build()
            .map_err(|e| Error::GitHubApi(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            config,
            token: token.to_string(),
            http_client,
            api_base,
            graphql_url,
        })
    }

    fn authed(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28")
    }

    fn repo_url(&self, path: &str) -> String {
        format!(
            "{}/repos/{}/{}/{}",
            self.api_base, self.config.owner, self.config.repo, path
        )
    }

    /// GET a REST resource; `Ok(None)` on 404
    async fn rest_get<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<Option<T>> {
        let response = self
            .authed(self.http_client.get(url).query(query))
            .send()
            .await
            .map_err(|e| Error::GitHubApi(format!("GET {url} failed: {e}")))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(Error::GitHubApi(format!(
                "GET {url} returned {}",
                response.status()
            )));
        }

        let body = response
            .json()
            .await
            .map_err(|e| Error::GitHubApi(format!("Failed to parse {url}: {e}")))?;
        Ok(Some(body))
    }

    async fn graphql_raw<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: serde_json::Value,
    ) -> Result<GraphQlResponse<T>> {
        let response = self
            .authed(self.http_client.post(&self.graphql_url))
            .json(&serde_json::json!({ "query": query, "variables": variables }))
            .send()
            .await
            .map_err(|e| Error::GitHubApi(format!("GraphQL request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(Error::GitHubApi(format!(
                "GraphQL request returned {}",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| Error::GitHubApi(format!("Failed to parse GraphQL response: {e}")))
    }

    async fn graphql<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: serde_json::Value,
    ) -> Result<T> {
        let response = self.graphql_raw(query, variables).await?;

        if let Some(errors) = response.errors
            && !errors.is_empty()
        {
            let messages: Vec<_> = errors.into_iter().map(|e| e.message).collect();
            return Err(Error::GitHubApi(format!(
                "GraphQL error: {}",
                messages.join(", ")
            )));
        }

        response
            .data
            .ok_or_else(|| Error::GitHubApi("No data in GraphQL response".to_string()))
    }

    async fn fetch_pull_request(&self, pr_number: u64) -> Result<GraphQlPullRequest> {
        let query = format!(
            "query PullRequest($owner: String!, $repo: String!, $number: Int!) {{
                repository(owner: $owner, name: $repo) {{
                    pullRequest(number: $number) {{ {PR_FIELDS} }}
                }}
            }}"
        );
        let data: RepositoryData<SinglePullRequest> = self
            .graphql(
                &query,
                serde_json::json!({
                    "owner": self.config.owner,
                    "repo": self.config.repo,
                    "number": pr_number,
                }),
            )
            .await?;

        data.repository
            .and_then(|r| r.pull_request)
            .ok_or(Error::NotFound(pr_number))
    }

    async fn delete_branch(&self, branch: &str) -> Result<()> {
        let url = self.repo_url(&format!("git/refs/heads/{branch}"));
        let response = self
            .authed(self.http_client.delete(&url))
            .send()
            .await
            .map_err(|e| Error::GitHubApi(format!("Failed to delete branch: {e}")))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(Error::GitHubApi(format!(
                "Deleting branch {branch} returned {}",
                response.status()
            )))
        }
    }
}

#[async_trait]
impl PlatformService for GitHubService {
    async fn verify_auth(&self) -> Result<String> {
        debug!("verifying GitHub credentials");
        let user = self
            .client
            .current()
            .user()
            .await
            .map_err(|e| Error::Auth(format!("GitHub rejected the token: {e}")))?;
        debug!(login = %user.login, "authenticated");
        Ok(user.login)
    }

    async fn list_open_prs(
        &self,
        label: &str,
        session_label: Option<&str>,
        base: &str,
    ) -> Result<Vec<ChangeRequest>> {
        debug!(label, ?session_label, base, "listing open PRs");
        let query = format!(
            "query OpenPullRequests($owner: String!, $repo: String!, $base: String!, $labels: [String!], $cursor: String) {{
                repository(owner: $owner, name: $repo) {{
                    pullRequests(states: OPEN, baseRefName: $base, labels: $labels, first: 50, after: $cursor) {{
                        pageInfo {{ hasNextPage endCursor }}
                        nodes {{ {PR_FIELDS} }}
                    }}
                }}
            }}"
        );

        let mut result = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let data: RepositoryData<PullRequestList> = self
                .graphql(
                    &query,
                    serde_json::json!({
                        "owner": self.config.owner,
                        "repo": self.config.repo,
                        "base": base,
                        "labels": [label],
                        "cursor": cursor,
                    }),
                )
                .await?;

            let connection = data
                .repository
                .ok_or_else(|| {
                    Error::GitHubApi(format!(
                        "repository {}/{} not found",
                        self.config.owner, self.config.repo
                    ))
                })?
                .pull_requests;

            result.extend(connection.nodes.into_iter().map(ChangeRequest::from));

            match connection.page_info.end_cursor {
                Some(next) if connection.page_info.has_next_page => cursor = Some(next),
                _ => break,
            }
        }

        if let Some(session) = session_label {
            result.retain(|pr| pr.has_label(session));
        }

        debug!(count = result.len(), "listed open PRs");
        Ok(result)
    }

    async fn get_pr_details(&self, pr_number: u64) -> Result<ChangeRequest> {
        debug!(pr_number, "getting PR details");
        let details: ChangeRequest = self.fetch_pull_request(pr_number).await?.into();
        debug!(
            pr_number,
            state = %details.state,
            mergeability = %details.mergeability,
            "got PR details"
        );
        Ok(details)
    }

    async fn get_check_runs(&self, pr_number: u64) -> Result<Vec<CheckRun>> {
        debug!(pr_number, "getting check runs");
        let sha = self.fetch_pull_request(pr_number).await?.head_ref_oid;

        // GitHub Actions and other apps report through check runs
        let url = self.repo_url(&format!("commits/{sha}/check-runs"));
        let mut checks: Vec<CheckRun> = Vec::new();
        let per_page = CHECK_RUNS_PAGE_SIZE.to_string();
        let mut page = 1_u32;
        loop {
            let page_number = page.to_string();
            let response: CheckRunsResponse = self
                .rest_get(
                    &url,
                    &[("per_page", per_page.as_str()), ("page", page_number.as_str())],
                )
                .await?
                .ok_or_else(|| Error::GitHubApi(format!("commit {sha} not found")))?;

            let received = response.check_runs.len();
            checks.extend(
                response
                    .check_runs
                    .into_iter()
                    .map(|run| parse_check_run(run.name, &run.status, run.conclusion.as_deref())),
            );

            let exhausted = response
                .total_count
                .map_or(received < CHECK_RUNS_PAGE_SIZE, |total| checks.len() >= total);
            if exhausted || received == 0 {
                break;
            }
            page += 1;
        }

        // External CI services often still use the legacy status API
        let combined: Option<CombinedStatus> = self
            .rest_get(&self.repo_url(&format!("commits/{sha}/status")), &[])
            .await?;
        if let Some(combined) = combined {
            checks.extend(
                combined
                    .statuses
                    .into_iter()
                    .map(|s| parse_commit_status(s.context, &s.state)),
            );
        }

        debug!(pr_number, count = checks.len(), "got check runs");
        Ok(checks)
    }

    async fn update_branch(&self, pr_number: u64) -> Result<BranchUpdate> {
        debug!(pr_number, "updating PR branch");
        let node_id = self.fetch_pull_request(pr_number).await?.id;

        let response: GraphQlResponse<serde_json::Value> = self
            .graphql_raw(
                r"
                    mutation UpdatePullRequestBranch($pullRequestId: ID!) {
                        updatePullRequestBranch(input: { pullRequestId: $pullRequestId, updateMethod: REBASE }) {
                            pullRequest { number }
                        }
                    }
                ",
                serde_json::json!({ "pullRequestId": node_id }),
            )
            .await?;

        if let Some(errors) = response.errors
            && !errors.is_empty()
        {
            let messages: Vec<_> = errors.into_iter().map(|e| e.message).collect();
            let update = classify_update_failure(messages.join(", "));
            debug!(pr_number, ?update, "branch update refused");
            return Ok(update);
        }

        debug!(pr_number, "updated PR branch");
        Ok(BranchUpdate::Updated)
    }

    async fn merge_pr(
        &self,
        pr_number: u64,
        method: MergeMethod,
        delete_branch: bool,
    ) -> Result<MergeResult> {
        debug!(pr_number, %method, delete_branch, "merging PR");

        // Title and body feed the squash commit message
        let details = self.fetch_pull_request(pr_number).await?;

        let octocrab_method = match method {
            MergeMethod::Squash => octocrab::params::pulls::MergeMethod::Squash,
            MergeMethod::Merge => octocrab::params::pulls::MergeMethod::Merge,
            MergeMethod::Rebase => octocrab::params::pulls::MergeMethod::Rebase,
        };

        let pulls = self.client.pulls(&self.config.owner, &self.config.repo);

        let result = if method == MergeMethod::Squash {
            let mut builder = pulls.merge(pr_number).method(octocrab_method);
            builder = builder.title(format!("{} (#{})", details.title, pr_number));
            if let Some(ref body) = details.body {
                builder = builder.message(body);
            }
            builder.send().await
        } else {
            pulls.merge(pr_number).method(octocrab_method).send().await
        }
        .map_err(|e| Error::GitHubApi(format!("Merge failed: {e}")))?;

        let merge_result = MergeResult {
            merged: result.merged,
            sha: result.sha,
            message: result.message,
        };

        if merge_result.merged && delete_branch {
            // Merge already landed; a leftover branch is only cosmetic
            if let Err(e) = self.delete_branch(&details.head_ref_name).await {
                warn!(pr_number, branch = %details.head_ref_name, error = %e, "failed to delete head branch");
            }
        }

        debug!(
            pr_number,
            merged = merge_result.merged,
            sha = ?merge_result.sha,
            "merge complete"
        );
        Ok(merge_result)
    }

    async fn get_recent_pipeline_run(&self, branch: &str) -> Result<Option<PipelineRun>> {
        debug!(branch, "getting latest workflow run");
        let runs: Option<WorkflowRunsResponse> = self
            .rest_get(
                &self.repo_url("actions/runs"),
                &[("branch", branch), ("per_page", "1")],
            )
            .await?;

        let run = runs
            .and_then(|r| r.workflow_runs.into_iter().next())
            .map(|run| PipelineRun {
                name: run.name.unwrap_or_else(|| "unknown".to_string()),
                status: run.status.unwrap_or_default(),
                conclusion: run.conclusion,
            });
        debug!(branch, ?run, "latest workflow run");
        Ok(run)
    }

    fn config(&self) -> &PlatformConfig {
        &self.config
    }
}
