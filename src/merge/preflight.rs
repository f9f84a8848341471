//! Preflight checks run before any PR is touched

use crate::error::{Error, Result};
use crate::merge::progress::ProgressCallback;
use crate::platform::PlatformService;
use crate::repo::LocalRepository;

/// Verify credentials, a clean working tree, and a fresh fetch of `remote`.
///
/// Returns the authenticated login. Any failure aborts the session before
/// discovery.
pub async fn run_preflight(
    platform: &dyn PlatformService,
    repo: &dyn LocalRepository,
    remote: &str,
    progress: &dyn ProgressCallback,
) -> Result<String> {
    progress.on_message("Running preflight checks...").await;

    let login = platform.verify_auth().await.map_err(|e| match e {
        Error::Auth(_) => e,
        other => Error::Auth(other.to_string()),
    })?;
    progress
        .on_success(&format!("[OK] Authenticated as {login}"))
        .await;

    if !repo.is_clean()? {
        return Err(Error::DirtyWorkspace);
    }
    progress.on_success("[OK] Working tree clean").await;

    repo.fetch(remote)
        .map_err(|e| Error::Git(format!("failed to fetch from {remote}: {e}")))?;
    progress
        .on_success(&format!("[OK] Fetched latest from {remote}"))
        .await;

    Ok(login)
}
