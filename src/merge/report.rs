//! Session report - an audit record of one merge session
//!
//! Rendering is pure; writing never overwrites an existing report.

use crate::error::{Error, Result};
use crate::merge::session::{ItemStatus, MergeOutcome, MergeSession};
use chrono::{DateTime, Local};
use std::fmt::Write as _;
use std::fs::{self, OpenOptions};
use std::io::Write as _;
use std::path::{Path, PathBuf};

/// Max title width in report tables
const TITLE_WIDTH: usize = 40;

fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() > width {
        let mut out: String = s.chars().take(width.saturating_sub(2)).collect();
        out.push_str("..");
        out
    } else {
        s.to_string()
    }
}

/// Escape text for a markdown table cell
fn cell(s: &str) -> String {
    s.replace('|', "\\|").replace('\n', " ")
}

fn shell_quote(arg: &str) -> String {
    if !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:=@,+".contains(c))
    {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}

/// File name for a report generated at `at`
pub fn report_file_name(at: &DateTime<Local>) -> String {
    format!("merge-session-{}.md", at.format("%Y-%m-%d_%H-%M-%S"))
}

/// Render the markdown report for a finished session
#[allow(clippy::too_many_lines)]
pub fn render_report(
    session: &MergeSession,
    generated_at: &DateTime<Local>,
    command_line: &[String],
) -> String {
    let config = &session.config;
    let mut out = String::new();

    // Writing into a String cannot fail
    let _ = writeln!(out, "# Merge Session Report\n");
    let _ = writeln!(out, "**Generated:** {}\n", generated_at.to_rfc3339());
    if config.dry_run {
        let _ = writeln!(out, "> DRY RUN - no PRs were updated or merged.\n");
    }

    let _ = writeln!(out, "## Configuration\n");
    let _ = writeln!(out, "| Setting | Value |");
    let _ = writeln!(out, "|---------|-------|");
    let _ = writeln!(out, "| Label Filter | `{}` |", config.label);
    let _ = writeln!(
        out,
        "| Session Filter | `{}` |",
        config.session_label.as_deref().unwrap_or("none")
    );
    let _ = writeln!(out, "| Base Branch | `{}` |", config.base);
    let _ = writeln!(out, "| Remote | `{}` |", config.remote);
    let _ = writeln!(
        out,
        "| Limit | `{}` |",
        config
            .limit
            .map_or_else(|| "none".to_string(), |l| l.to_string())
    );
    let _ = writeln!(
        out,
        "| Check Timeout | `{} min` |",
        config.check_timeout.as_secs() / 60
    );
    let _ = writeln!(out, "| Dry Run | `{}` |\n", config.dry_run);

    let not_reached = session.not_reached().count();
    let _ = writeln!(out, "## Summary\n");
    let _ = writeln!(out, "| Metric | Count |");
    let _ = writeln!(out, "|--------|-------|");
    let _ = writeln!(out, "| PRs Discovered | {} |", session.queue.len());
    let _ = writeln!(out, "| PRs Merged | {} |", session.merged.len());
    let _ = writeln!(out, "| PRs Skipped/Blocked | {} |", session.skipped.len());
    let _ = writeln!(out, "| PRs Not Reached | {not_reached} |\n");

    if let Some(halt) = &session.halt {
        let _ = writeln!(out, "## Session Halted\n");
        let _ = writeln!(out, "- PR: #{}", halt.number);
        let _ = writeln!(out, "- Reason: {}", halt.reason);
        let _ = writeln!(
            out,
            "- Not reached: {not_reached} PR(s) were never evaluated\n"
        );
    }

    if !session.merged.is_empty() {
        let _ = writeln!(out, "## Merged PRs\n");
        let _ = writeln!(out, "| PR | Title | Branch | Result | Commit | Trunk |");
        let _ = writeln!(out, "|----|-------|--------|--------|--------|-------|");
        for item in &session.merged {
            let commit = match &item.outcome {
                MergeOutcome::Merged { sha: Some(sha) } => sha.get(..7).unwrap_or(sha).to_string(),
                _ => "-".to_string(),
            };
            let _ = writeln!(
                out,
                "| #{} | {} | `{}` | {} | {} | {} |",
                item.number,
                cell(&truncate(&item.title, TITLE_WIDTH)),
                item.head_ref,
                item.outcome,
                commit,
                cell(&item.trunk.to_string())
            );
        }
        out.push('\n');
    }

    if !session.skipped.is_empty() {
        let _ = writeln!(out, "## Skipped/Blocked PRs\n");
        let _ = writeln!(out, "| PR | Title | Reason | Halted Session |");
        let _ = writeln!(out, "|----|-------|--------|----------------|");
        for item in &session.skipped {
            let _ = writeln!(
                out,
                "| #{} | {} | {} | {} |",
                item.number,
                cell(&truncate(&item.title, TITLE_WIDTH)),
                cell(&item.reason),
                if item.fatal { "yes" } else { "no" }
            );
        }
        out.push('\n');
    }

    let _ = writeln!(out, "## Evidence\n");
    let _ = writeln!(out, "### Command Line\n");
    let _ = writeln!(out, "```");
    let quoted: Vec<String> = command_line.iter().map(|a| shell_quote(a)).collect();
    let _ = writeln!(out, "{}", quoted.join(" "));
    let _ = writeln!(out, "```\n");

    let _ = writeln!(out, "### Discovered PRs\n");
    if session.queue.is_empty() {
        let _ = writeln!(out, "No matching PRs found.\n");
    }
    for pr in &session.queue {
        let status = session.status_of(pr.number);
        let _ = writeln!(out, "#### PR #{}: {}\n", pr.number, pr.title);
        let _ = writeln!(
            out,
            "- Status: {}{}",
            status,
            if status == ItemStatus::NotReached {
                " (session halted before this PR)"
            } else {
                ""
            }
        );
        let _ = writeln!(out, "- Branch: `{}`", pr.head_ref);
        let _ = writeln!(out, "- Author: {}", pr.author.as_deref().unwrap_or("unknown"));
        let _ = writeln!(
            out,
            "- Created: {}",
            pr.created_at
                .map_or_else(|| "unknown".to_string(), |t| t.to_rfc3339())
        );
        let _ = writeln!(out, "- Mergeable: {}", pr.mergeability);
        let _ = writeln!(
            out,
            "- Review: {}",
            pr.review_decision
                .map_or_else(|| "none".to_string(), |d| d.to_string())
        );
        let labels: Vec<&str> = pr.labels.iter().map(String::as_str).collect();
        let _ = writeln!(out, "- Labels: {}\n", labels.join(", "));
    }

    let _ = writeln!(out, "---");
    let _ = writeln!(out, "*Generated by merge-all {}*", env!("CARGO_PKG_VERSION"));

    out
}

/// Write the report for `session` into `dir`, returning its path.
///
/// Creates `dir` if needed. Fails rather than overwrite an existing file.
pub fn write_report(
    dir: &Path,
    session: &MergeSession,
    generated_at: &DateTime<Local>,
    command_line: &[String],
) -> Result<PathBuf> {
    fs::create_dir_all(dir)
        .map_err(|e| Error::Report(format!("failed to create {}: {e}", dir.display())))?;

    let path = dir.join(report_file_name(generated_at));
    let content = render_report(session, generated_at, command_line);

    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&path)
        .map_err(|e| Error::Report(format!("failed to create {}: {e}", path.display())))?;
    file.write_all(content.as_bytes())
        .map_err(|e| Error::Report(format!("failed to write {}: {e}", path.display())))?;

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdefghijkl", 6), "abcd..");
    }

    #[test]
    fn test_cell_escapes_pipes() {
        assert_eq!(cell("a | b"), "a \\| b");
    }

    #[test]
    fn test_shell_quote() {
        assert_eq!(shell_quote("--label"), "--label");
        assert_eq!(shell_quote("session:2026-01-20"), "session:2026-01-20");
        assert_eq!(shell_quote("two words"), "'two words'");
        assert_eq!(shell_quote(""), "''");
    }

    #[test]
    fn test_report_file_name() {
        use chrono::TimeZone;
        let at = Local.with_ymd_and_hms(2026, 1, 20, 9, 5, 3).unwrap();
        assert_eq!(report_file_name(&at), "merge-session-2026-01-20_09-05-03.md");
    }
}
