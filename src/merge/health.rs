//! Trunk health verification after a merge

use crate::merge::progress::ProgressCallback;
use crate::platform::PlatformService;
use crate::repo::LocalRepository;
use std::fmt;
use tracing::{debug, warn};

/// What the latest trunk pipeline run says
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrunkStatus {
    /// Latest run completed successfully
    Passing {
        /// Workflow name
        name: String,
    },
    /// Latest run has not finished
    Running {
        /// Workflow name
        name: String,
        /// Raw run status
        status: String,
    },
    /// No run found, or runs could not be queried
    NoCi,
    /// Latest run completed with a failing conclusion
    Failing {
        /// Workflow name
        name: String,
        /// Raw conclusion
        conclusion: String,
    },
}

/// Snapshot of trunk after a merge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrunkHealth {
    /// Trunk branch name
    pub branch: String,
    /// Resolved trunk commit, if it could be resolved
    pub commit: Option<String>,
    /// Pipeline status
    pub status: TrunkStatus,
}

impl TrunkHealth {
    /// Only an explicitly failed, completed run is unhealthy
    pub const fn is_healthy(&self) -> bool {
        !matches!(self.status, TrunkStatus::Failing { .. })
    }

    /// Abbreviated commit id
    pub fn short_commit(&self) -> &str {
        self.commit
            .as_deref()
            .map_or("unknown", |c| c.get(..7).unwrap_or(c))
    }
}

impl fmt::Display for TrunkHealth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let commit = self.short_commit();
        match &self.status {
            TrunkStatus::Passing { name } => write!(f, "CI passed: {name} (commit: {commit})"),
            TrunkStatus::Running { name, status } => {
                write!(f, "CI in progress: {name} [{status}] (commit: {commit})")
            }
            TrunkStatus::NoCi => write!(f, "no CI verification (commit: {commit})"),
            TrunkStatus::Failing { name, conclusion } => {
                write!(f, "CI failed: {name} - {conclusion} (commit: {commit})")
            }
        }
    }
}

/// Re-sync trunk and read its latest pipeline run.
///
/// Missing or unfinished runs count as healthy; so does a failed query.
/// Only a completed run with a failing conclusion is reported as
/// [`TrunkStatus::Failing`].
pub async fn verify_trunk_health(
    platform: &dyn PlatformService,
    repo: &dyn LocalRepository,
    remote: &str,
    branch: &str,
    progress: &dyn ProgressCallback,
) -> TrunkHealth {
    if let Err(e) = repo.fetch(remote) {
        warn!(remote, error = %e, "failed to fetch before trunk health check");
    }

    let commit = match repo.resolve_commit(&format!("{remote}/{branch}")) {
        Ok(commit) => Some(commit),
        Err(e) => {
            warn!(branch, error = %e, "failed to resolve trunk commit");
            None
        }
    };

    let status = match platform.get_recent_pipeline_run(branch).await {
        Ok(None) => TrunkStatus::NoCi,
        Ok(Some(run)) if !run.is_completed() => TrunkStatus::Running {
            name: run.name,
            status: run.status,
        },
        Ok(Some(run)) if run.is_failed() => TrunkStatus::Failing {
            conclusion: run.conclusion.unwrap_or_default(),
            name: run.name,
        },
        Ok(Some(run)) => TrunkStatus::Passing { name: run.name },
        Err(e) => {
            warn!(branch, error = %e, "failed to query trunk pipeline runs");
            progress
                .on_warning(&format!("Could not query CI runs for {branch}: {e}"))
                .await;
            TrunkStatus::NoCi
        }
    };

    let health = TrunkHealth {
        branch: branch.to_string(),
        commit,
        status,
    };
    debug!(healthy = health.is_healthy(), %health, "trunk health");
    health
}
