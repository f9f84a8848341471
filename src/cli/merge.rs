//! Merge command - merge every labelled PR, one at a time

use crate::cli::CliProgress;
use crate::cli::context::CommandContext;
use crate::cli::style::{Stylize, check, pr_link};
use anstream::println;
use chrono::Local;
use dialoguer::Confirm;
use merge_all::config::CliOverrides;
use merge_all::error::{Error, Result};
use merge_all::merge::{
    HaltKind, MergeSession, SessionConfig, discover, run_preflight, run_session, write_report,
};
use merge_all::types::{ChangeRequest, PlatformConfig};
use std::path::Path;
use tracing::warn;

/// Options that only affect the terminal front end
#[derive(Debug, Clone, Default)]
pub struct MergeOptions {
    /// Preview the queue and prompt before processing
    pub confirm: bool,
    /// Show pending check names while polling
    pub verbose: bool,
}

/// Run a merge session and return the process exit status
#[allow(clippy::future_not_send)]
pub async fn run_merge(
    path: &Path,
    overrides: CliOverrides,
    options: MergeOptions,
    command_line: &[String],
) -> Result<u8> {
    let ctx = CommandContext::new(path, overrides).await?;
    let config = ctx.settings.session_config();
    let progress = CliProgress::new(options.verbose);

    print_header(ctx.platform.config(), &config);

    run_preflight(ctx.platform.as_ref(), &ctx.repo, &config.remote, &progress).await?;

    let queue = discover(ctx.platform.as_ref(), &config).await?;
    print_plan(&queue);

    if options.confirm && !config.dry_run && !queue.is_empty() {
        let proceed = Confirm::new()
            .with_prompt(format!("Merge {} PR(s) into {}?", queue.len(), config.base))
            .default(false)
            .interact()
            .map_err(|e| Error::Internal(format!("failed to read confirmation: {e}")))?;
        if !proceed {
            println!("{}", "Aborted".muted());
            return Ok(0);
        }
    }

    let session = run_session(
        ctx.platform.as_ref(),
        &ctx.repo,
        config,
        queue,
        &progress,
    )
    .await;

    let report_dir = ctx.report_dir();
    let report = match write_report(&report_dir, &session, &Local::now(), command_line) {
        Ok(path) => Some(path),
        Err(e) => {
            warn!(error = %e, "failed to write session report");
            println!("{}", format!("⚠ Could not write report: {e}").warn());
            None
        }
    };

    print_summary(&session);
    if let Some(path) = report {
        println!("  Report: {}", path.display().accent());
    }

    Ok(session.exit_code())
}

fn print_header(repository: &PlatformConfig, config: &SessionConfig) {
    println!("{}", "Merge session".emphasis());
    println!(
        "  Repo:   {} {}",
        format!("{}/{}", repository.owner, repository.repo).accent(),
        format!("({})", repository.host.as_deref().unwrap_or("github.com")).muted()
    );
    println!("  Label:  {}", config.label.accent());
    if let Some(session) = &config.session_label {
        println!("  Session: {}", session.accent());
    }
    println!("  Base:   {}", config.base.accent());
    println!(
        "  Checks: {}",
        format!("up to {} min per PR", config.check_timeout.as_secs() / 60).muted()
    );
    if config.dry_run {
        println!("  {}", "DRY RUN - nothing will be updated or merged".warn());
    }
    println!();
}

/// Print the discovered queue in processing order
fn print_plan(queue: &[ChangeRequest]) {
    if queue.is_empty() {
        println!("{}", "No matching PRs found.".muted());
        return;
    }

    println!(
        "{} {}",
        "Merge plan:".emphasis(),
        format!("{} PR(s), oldest first", queue.len()).muted()
    );
    println!();
    println!(
        "  {:<4} {:<8} {:<42} {:<30} {}",
        "#", "PR", "Title", "Branch", "State"
    );
    for (index, pr) in queue.iter().enumerate() {
        let title: String = pr.title.chars().take(40).collect();
        let branch: String = pr.head_ref.chars().take(28).collect();
        println!(
            "  {:<4} {:<8} {:<42} {:<30} {}",
            index + 1,
            format!("#{}", pr.number),
            title,
            branch,
            pr.mergeability.muted()
        );
    }
    println!();
}

fn print_summary(session: &MergeSession) {
    println!();
    match &session.halt {
        None if session.skipped.is_empty() => {
            println!("{} Merge session complete", check());
        }
        None => println!("{} Merge session complete with skips", "⚠".warn()),
        Some(halt) => {
            let what = match halt.kind {
                HaltKind::Blocked => "Session halted",
                HaltKind::TrunkUnhealthy => "Session halted: trunk CI is failing",
            };
            println!("{} {what}", "✗".error());
            println!("   At PR #{}: {}", halt.number, halt.reason.warn());
        }
    }

    let verb = if session.config.dry_run {
        "Would merge"
    } else {
        "Merged"
    };
    println!(
        "   {verb}: {}",
        session.merged.len().to_string().success()
    );
    for item in &session.merged {
        let pr = session.queue.iter().find(|pr| pr.number == item.number);
        let link = pr.map_or_else(
            || format!("#{}", item.number),
            |pr| pr_link(pr.number, &pr.html_url),
        );
        println!("     {link} {}", item.title);
    }

    println!("   Skipped: {}", session.skipped.len().to_string().warn());
    for item in &session.skipped {
        println!("     #{} {}", item.number, item.reason.muted());
    }

    let not_reached: Vec<String> = session
        .not_reached()
        .map(|pr| format!("#{}", pr.number))
        .collect();
    if !not_reached.is_empty() {
        println!(
            "   Not reached: {}",
            not_reached.join(", ").muted()
        );
    }
}
