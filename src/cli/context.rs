//! Shared setup for the merge command

use merge_all::config::{CliOverrides, Settings, load_config, resolve_settings};
use merge_all::error::Result;
use merge_all::platform::{PlatformService, create_platform_service, parse_repo_info};
use merge_all::repo::{GitRepository, LocalRepository};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Everything a session needs from the environment
///
/// Built before any PR is looked at, so a bad config, an unknown remote or
/// missing credentials fail the run without side effects.
pub struct CommandContext {
    /// The local git repository
    pub repo: GitRepository,
    /// Resolved settings
    pub settings: Settings,
    /// Platform service for the remote's host
    pub platform: Box<dyn PlatformService>,
}

impl CommandContext {
    /// Open the repository at `path`, resolve settings, and connect to the
    /// platform behind the configured remote
    pub async fn new(path: &Path, overrides: CliOverrides) -> Result<Self> {
        let repo = GitRepository::open(path)?;

        let file = load_config(repo.root())?;
        let settings = resolve_settings(overrides, file)?;

        let url = repo.remote_url(&settings.remote)?;
        let platform_config = parse_repo_info(&url)?;
        debug!(
            owner = %platform_config.owner,
            repo = %platform_config.repo,
            host = ?platform_config.host,
            "detected platform"
        );

        let platform = create_platform_service(&platform_config).await?;

        Ok(Self {
            repo,
            settings,
            platform,
        })
    }

    /// Report directory, relative paths taken from the repository root
    pub fn report_dir(&self) -> PathBuf {
        if self.settings.report_dir.is_absolute() {
            self.settings.report_dir.clone()
        } else {
            self.repo.root().join(&self.settings.report_dir)
        }
    }
}
