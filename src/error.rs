//! Error types for merge-all

use thiserror::Error;

/// Errors surfaced by merge-all
#[derive(Error, Debug)]
pub enum Error {
    /// Credentials missing or rejected by the host
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Local working tree has uncommitted changes
    #[error("working tree is not clean; commit or stash changes first")]
    DirtyWorkspace,

    /// A git command failed
    #[error("git error: {0}")]
    Git(String),

    /// Named remote does not exist
    #[error("remote '{0}' not found")]
    RemoteNotFound(String),

    /// Remote URL does not point at a supported host
    #[error("no supported remote found: {0}")]
    UnsupportedRemote(String),

    /// GitHub API failure (transport or response shape)
    #[error("GitHub API error: {0}")]
    GitHubApi(String),

    /// PR does not exist
    #[error("PR #{0} not found")]
    NotFound(u64),

    /// Invalid configuration file or value
    #[error("config error: {0}")]
    Config(String),

    /// Invalid command-line argument
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Session report could not be written
    #[error("report error: {0}")]
    Report(String),

    /// Internal invariant violated
    #[error("internal error: {0}")]
    Internal(String),
}

/// Result alias using [`Error`]
pub type Result<T> = std::result::Result<T, Error>;
