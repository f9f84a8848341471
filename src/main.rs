//! merge-all - merge labelled PRs one at a time, halting on the first
//! unsafe condition

mod cli;

use anstream::eprintln;
use clap::Parser;
use cli::merge::{MergeOptions, run_merge};
use cli::style::Stylize;
use merge_all::config::CliOverrides;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Merge every open PR carrying a label into trunk, oldest first.
///
/// Each PR is refreshed, rebased if behind, checked for review and CI, then
/// squash-merged; trunk CI is verified after every merge. The session stops
/// at the first PR that cannot be merged safely.
#[derive(Parser, Debug)]
#[command(name = "merge-all", version)]
struct Cli {
    /// Only process PRs with this label [default: workflow-ready]
    #[arg(long)]
    label: Option<String>,

    /// Also require this session label (e.g. session:2026-01-20)
    #[arg(long)]
    session: Option<String>,

    /// Branch the PRs target [default: main]
    #[arg(long)]
    base: Option<String>,

    /// Remote to fetch and detect the host from [default: origin]
    #[arg(long)]
    remote: Option<String>,

    /// Process at most this many PRs
    #[arg(long)]
    limit: Option<usize>,

    /// Minutes to wait for checks on each PR [default: 30]
    #[arg(long, value_name = "MINUTES")]
    timeout: Option<u64>,

    /// Show what would happen without updating or merging anything
    #[arg(long)]
    dry_run: bool,

    /// Show pending check names and debug logs
    #[arg(short, long)]
    verbose: bool,

    /// Directory for the session report [default: workflow/_reports]
    #[arg(long, value_name = "DIR")]
    report_dir: Option<PathBuf>,

    /// Path to the repository
    #[arg(short, long, default_value = ".")]
    path: PathBuf,

    /// Preview the queue and ask before merging
    #[arg(long)]
    confirm: bool,
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "merge_all=debug"
    } else {
        "merge_all=warn"
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let command_line: Vec<String> = std::env::args().collect();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let overrides = CliOverrides {
        label: cli.label,
        session: cli.session,
        base: cli.base,
        remote: cli.remote,
        limit: cli.limit,
        timeout_minutes: cli.timeout,
        report_dir: cli.report_dir,
        dry_run: cli.dry_run,
    };
    let options = MergeOptions {
        confirm: cli.confirm,
        verbose: cli.verbose,
    };

    match run_merge(&cli.path, overrides, options, &command_line).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("{} {e}", "error:".error());
            ExitCode::FAILURE
        }
    }
}
