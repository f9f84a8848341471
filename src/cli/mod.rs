//! CLI front end

pub mod context;
pub mod merge;
pub mod style;

use anstream::println;
use async_trait::async_trait;
use chrono::Local;
use indicatif::ProgressBar;
use merge_all::merge::ProgressCallback;
use merge_all::types::ChangeRequest;
use std::sync::Mutex;
use std::time::Duration;
use style::{Stylize, pr_link, spinner_style};

/// Progress reporter that writes timestamped lines to the terminal
pub struct CliProgress {
    verbose: bool,
    spinner: Mutex<Option<ProgressBar>>,
}

impl CliProgress {
    /// Create a reporter; `verbose` shows which checks are still pending
    pub const fn new(verbose: bool) -> Self {
        Self {
            verbose,
            spinner: Mutex::new(None),
        }
    }

    /// Print a line, keeping an active spinner intact
    fn emit(&self, line: &str) {
        let stamp = Local::now().format("%H:%M:%S").to_string();
        let print = || println!("{} {line}", format!("[{stamp}]").muted());

        match self.spinner.lock() {
            Ok(guard) => match guard.as_ref() {
                Some(spinner) => spinner.suspend(print),
                None => print(),
            },
            Err(_) => print(),
        }
    }
}

#[async_trait]
impl ProgressCallback for CliProgress {
    async fn on_message(&self, message: &str) {
        self.emit(message);
    }

    async fn on_success(&self, message: &str) {
        self.emit(&message.success().to_string());
    }

    async fn on_warning(&self, message: &str) {
        self.emit(&format!("{}", format!("⚠ {message}").warn()));
    }

    async fn on_error(&self, message: &str) {
        self.emit(&format!("{}", format!("✗ {message}").error()));
    }

    async fn on_item_start(&self, position: usize, total: usize, pr: &ChangeRequest) {
        println!();
        self.emit(&format!(
            "{} PR {}: {}",
            format!("[{position}/{total}]").emphasis(),
            pr_link(pr.number, &pr.html_url),
            pr.title.emphasis()
        ));
        self.emit(&format!("  Branch: {}", pr.head_ref.accent()));
    }

    async fn on_checks_pending(&self, pr_number: u64, pending: &[String], remaining: Duration) {
        let minutes = remaining.as_secs().div_ceil(60);
        let mut message = format!("Waiting for checks on #{pr_number} ({minutes} min left)");
        if self.verbose && !pending.is_empty() {
            message.push_str(&format!(": {}", pending.join(", ")));
        }

        if let Ok(mut guard) = self.spinner.lock() {
            let spinner = guard.get_or_insert_with(|| {
                let spinner = ProgressBar::new_spinner();
                spinner.set_style(spinner_style());
                spinner.enable_steady_tick(Duration::from_millis(80));
                spinner
            });
            spinner.set_message(message);
        }
    }

    async fn on_checks_done(&self, _pr_number: u64) {
        if let Ok(mut guard) = self.spinner.lock()
            && let Some(spinner) = guard.take()
        {
            spinner.finish_and_clear();
        }
    }
}
