//! Terminal styling helpers
//!
//! Output goes through `anstream`, which strips the escapes when stdout is
//! not a terminal, so styles can be applied unconditionally here.

use indicatif::ProgressStyle;
use owo_colors::{Style, Styled};
use std::fmt::Display;
use supports_hyperlinks::Stream;
use terminal_link::Link;

/// Semantic styles for CLI output
pub trait Stylize {
    /// Secondary information
    fn muted(&self) -> Styled<&Self>;
    /// Headings and key values
    fn emphasis(&self) -> Styled<&Self>;
    /// Names: branches, labels, remotes
    fn accent(&self) -> Styled<&Self>;
    /// Completed steps
    fn success(&self) -> Styled<&Self>;
    /// Skips and soft failures
    fn warn(&self) -> Styled<&Self>;
    /// Halts and hard failures
    fn error(&self) -> Styled<&Self>;
}

impl<T: Display + ?Sized> Stylize for T {
    fn muted(&self) -> Styled<&Self> {
        Style::new().dimmed().style(self)
    }

    fn emphasis(&self) -> Styled<&Self> {
        Style::new().bold().style(self)
    }

    fn accent(&self) -> Styled<&Self> {
        Style::new().cyan().style(self)
    }

    fn success(&self) -> Styled<&Self> {
        Style::new().green().style(self)
    }

    fn warn(&self) -> Styled<&Self> {
        Style::new().yellow().style(self)
    }

    fn error(&self) -> Styled<&Self> {
        Style::new().red().bold().style(self)
    }
}

/// Green check mark
pub fn check() -> Styled<&'static str> {
    "✓".success()
}

/// Spinner used while waiting on checks
pub fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner:.cyan} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ")
}

/// `#<number>`, hyperlinked to `url` when the terminal supports it
pub fn pr_link(number: u64, url: &str) -> String {
    let text = format!("#{number}");
    if !url.is_empty() && supports_hyperlinks::on(Stream::Stdout) {
        Link::new(&text, url).to_string()
    } else {
        text
    }
}
