//! Remote URL detection

use crate::error::{Error, Result};
use crate::types::{Platform, PlatformConfig};
use regex::Regex;
use url::Url;

/// scp-like syntax: `[user@]host:path`
const SSH_REMOTE_PATTERN: &str = r"^(?:[\w.-]+@)?(?P<host>[\w.-]+):(?P<path>[^/].*)$";

/// Parse owner/repo/host from a git remote URL.
///
/// Accepts `git@host:owner/repo(.git)`, `ssh://git@host/owner/repo`, and
/// `https://host/owner/repo(.git)`. Hosts other than github.com are treated
/// as GitHub Enterprise only when their name contains "github".
pub fn parse_repo_info(remote_url: &str) -> Result<PlatformConfig> {
    let trimmed = remote_url.trim();
    let ssh_remote =
        Regex::new(SSH_REMOTE_PATTERN).map_err(|e| Error::Internal(e.to_string()))?;

    let (host, path) = if let Ok(url) = Url::parse(trimmed)
        && url.has_host()
    {
        let host = url
            .host_str()
            .ok_or_else(|| Error::UnsupportedRemote(trimmed.to_string()))?
            .to_string();
        (host, url.path().to_string())
    } else if let Some(caps) = ssh_remote.captures(trimmed) {
        (caps["host"].to_string(), caps["path"].to_string())
    } else {
        return Err(Error::UnsupportedRemote(trimmed.to_string()));
    };

    if !host.contains("github") {
        return Err(Error::UnsupportedRemote(trimmed.to_string()));
    }

    let path = path.trim_matches('/');
    let path = path.strip_suffix(".git").unwrap_or(path);
    let mut parts = path.split('/').filter(|p| !p.is_empty());
    let (Some(owner), Some(repo), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(Error::UnsupportedRemote(trimmed.to_string()));
    };

    Ok(PlatformConfig {
        platform: Platform::GitHub,
        owner: owner.to_string(),
        repo: repo.to_string(),
        host: (host != "github.com").then_some(host),
    })
}
