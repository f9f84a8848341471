//! Local git workspace
//!
//! merge-all only needs a handful of local operations: confirm the working
//! tree is clean, fetch the remote, resolve the trunk commit, and read the
//! remote URL for platform detection. They sit behind [`LocalRepository`]
//! so sessions can run against a fake workspace in tests.

use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tracing::debug;

/// Local workspace operations used by a merge session
pub trait LocalRepository: Send + Sync {
    /// Whether the working tree has no uncommitted changes
    fn is_clean(&self) -> Result<bool>;

    /// Fetch the latest refs from `remote`
    fn fetch(&self, remote: &str) -> Result<()>;

    /// Resolve a revision (e.g. `origin/main`) to a commit id
    fn resolve_commit(&self, rev: &str) -> Result<String>;

    /// URL of `remote`
    fn remote_url(&self, remote: &str) -> Result<String>;
}

/// [`LocalRepository`] backed by the `git` CLI
#[derive(Debug, Clone)]
pub struct GitRepository {
    root: PathBuf,
}

impl GitRepository {
    /// Open the repository containing `path`
    pub fn open(path: &Path) -> Result<Self> {
        let output = git_command(path)
            .args(["rev-parse", "--show-toplevel"])
            .output()
            .map_err(|e| Error::Git(format!("failed to run git: {e}")))?;

        if !output.status.success() {
            return Err(Error::Git(format!(
                "{} is not inside a git repository",
                path.display()
            )));
        }

        let root = PathBuf::from(String::from_utf8_lossy(&output.stdout).trim());
        debug!(root = %root.display(), "opened git repository");
        Ok(Self { root })
    }

    /// Repository root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn run(&self, args: &[&str]) -> Result<Output> {
        debug!(?args, "running git");
        let output = git_command(&self.root)
            .args(args)
            .output()
            .map_err(|e| Error::Git(format!("failed to run git: {e}")))?;

        if output.status.success() {
            Ok(output)
        } else {
            Err(Error::Git(format!(
                "git {} failed: {}",
                args.join(" "),
                String::from_utf8_lossy(&output.stderr).trim()
            )))
        }
    }
}

/// Create a git Command that never prompts for credentials
fn git_command(workdir: &Path) -> Command {
    let mut cmd = Command::new("git");
    cmd.current_dir(workdir);
    cmd.env("GIT_TERMINAL_PROMPT", "0");
    cmd
}

impl LocalRepository for GitRepository {
    fn is_clean(&self) -> Result<bool> {
        let output = self.run(&["status", "--porcelain"])?;
        Ok(output.stdout.iter().all(u8::is_ascii_whitespace))
    }

    fn fetch(&self, remote: &str) -> Result<()> {
        self.run(&["fetch", remote])?;
        Ok(())
    }

    fn resolve_commit(&self, rev: &str) -> Result<String> {
        let output = self.run(&["rev-parse", "--verify", rev])?;
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    fn remote_url(&self, remote: &str) -> Result<String> {
        self.run(&["remote", "get-url", remote])
            .map(|output| String::from_utf8_lossy(&output.stdout).trim().to_string())
            .map_err(|_| Error::RemoteNotFound(remote.to_string()))
    }
}
