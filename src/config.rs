//! Layered configuration
//!
//! Values resolve in order: command-line flag, repository file
//! (`.merge-all.toml` at the workspace root), user file
//! (`<config dir>/merge-all/config.toml`), then built-in defaults.

use crate::error::{Error, Result};
use crate::merge::SessionConfig;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Repository-level config file name
pub const CONFIG_FILE: &str = ".merge-all.toml";

/// Default PR label filter
pub const DEFAULT_LABEL: &str = "workflow-ready";

/// Default target branch
pub const DEFAULT_BASE: &str = "main";

/// Default remote
pub const DEFAULT_REMOTE: &str = "origin";

/// Default time to wait for checks on one PR
pub const DEFAULT_TIMEOUT_MINUTES: u64 = 30;

/// Default directory for session reports
pub const DEFAULT_REPORT_DIR: &str = "workflow/_reports";

/// Settings readable from a config file
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    /// PR label filter
    pub label: Option<String>,
    /// Target branch
    pub base: Option<String>,
    /// Remote to fetch and detect the platform from
    pub remote: Option<String>,
    /// Check timeout in minutes
    pub timeout_minutes: Option<u64>,
    /// Report output directory
    pub report_dir: Option<PathBuf>,
}

impl FileConfig {
    /// Fill unset values from `fallback`
    #[must_use]
    pub fn or(self, fallback: Self) -> Self {
        Self {
            label: self.label.or(fallback.label),
            base: self.base.or(fallback.base),
            remote: self.remote.or(fallback.remote),
            timeout_minutes: self.timeout_minutes.or(fallback.timeout_minutes),
            report_dir: self.report_dir.or(fallback.report_dir),
        }
    }
}

/// Values given on the command line; `None` means not given
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    /// `--label`
    pub label: Option<String>,
    /// `--session`
    pub session: Option<String>,
    /// `--base`
    pub base: Option<String>,
    /// `--remote`
    pub remote: Option<String>,
    /// `--limit`
    pub limit: Option<usize>,
    /// `--timeout`
    pub timeout_minutes: Option<u64>,
    /// `--report-dir`
    pub report_dir: Option<PathBuf>,
    /// `--dry-run`
    pub dry_run: bool,
}

/// Fully resolved settings for one invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// PR label filter
    pub label: String,
    /// Optional session label filter
    pub session: Option<String>,
    /// Target branch
    pub base: String,
    /// Remote name
    pub remote: String,
    /// Maximum number of PRs to process
    pub limit: Option<usize>,
    /// Check timeout in minutes
    pub timeout_minutes: u64,
    /// Report output directory
    pub report_dir: PathBuf,
    /// Suppress mutating actions
    pub dry_run: bool,
}

impl Settings {
    /// Build the session configuration for these settings
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            label: self.label.clone(),
            session_label: self.session.clone(),
            base: self.base.clone(),
            remote: self.remote.clone(),
            limit: self.limit,
            check_timeout: Duration::from_secs(self.timeout_minutes * 60),
            dry_run: self.dry_run,
            ..SessionConfig::default()
        }
    }
}

/// Path of the user-level config file, if the platform has a config dir
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("merge-all").join("config.toml"))
}

/// Load one config file; `Ok(None)` if it does not exist
pub fn load_file_config(path: &Path) -> Result<Option<FileConfig>> {
    if !path.exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("failed to read {}: {e}", path.display())))?;

    let config = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("failed to parse {}: {e}", path.display())))?;

    Ok(Some(config))
}

/// Load the repository file layered over the user file
pub fn load_config(workspace_root: &Path) -> Result<FileConfig> {
    let repo = load_file_config(&workspace_root.join(CONFIG_FILE))?.unwrap_or_default();
    let user = match user_config_path() {
        Some(path) => load_file_config(&path)?.unwrap_or_default(),
        None => FileConfig::default(),
    };
    Ok(repo.or(user))
}

/// Resolve settings from CLI values and file config, validating them
pub fn resolve_settings(cli: CliOverrides, file: FileConfig) -> Result<Settings> {
    let label = cli
        .label
        .or(file.label)
        .unwrap_or_else(|| DEFAULT_LABEL.to_string());
    if label.trim().is_empty() {
        return Err(Error::InvalidArgument("label must not be empty".to_string()));
    }

    let base = cli
        .base
        .or(file.base)
        .unwrap_or_else(|| DEFAULT_BASE.to_string());
    if base.trim().is_empty() {
        return Err(Error::InvalidArgument("base branch must not be empty".to_string()));
    }

    if cli.limit == Some(0) {
        return Err(Error::InvalidArgument("limit must be at least 1".to_string()));
    }

    let timeout_minutes = cli
        .timeout_minutes
        .or(file.timeout_minutes)
        .unwrap_or(DEFAULT_TIMEOUT_MINUTES);
    if timeout_minutes == 0 {
        return Err(Error::InvalidArgument(
            "timeout must be at least 1 minute".to_string(),
        ));
    }

    Ok(Settings {
        label,
        session: cli.session.filter(|s| !s.trim().is_empty()),
        base,
        remote: cli
            .remote
            .or(file.remote)
            .unwrap_or_else(|| DEFAULT_REMOTE.to_string()),
        limit: cli.limit,
        timeout_minutes,
        report_dir: cli
            .report_dir
            .or(file.report_dir)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_REPORT_DIR)),
        dry_run: cli.dry_run,
    })
}
