//! Progress indication for long-running commands (scans, force release)

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// A spinner shown while a command runs; hidden in quiet mode
pub struct ProgressReporter {
    bar: Option<ProgressBar>,
}

impl ProgressReporter {
    /// Start a spinner with `message`
    pub fn start(message: impl Into<String>) -> Self {
        let bar = ProgressBar::new_spinner();
        bar.set_style(Self::spinner_style());
        bar.set_message(message.into());
        bar.enable_steady_tick(Duration::from_millis(100));
        Self { bar: Some(bar) }
    }

    /// A reporter that prints nothing
    pub fn hidden() -> Self {
        Self { bar: None }
    }

    /// Start a spinner unless `quiet`
    pub fn for_mode(quiet: bool, message: impl Into<String>) -> Self {
        if quiet { Self::hidden() } else { Self::start(message) }
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
    }

    pub fn set_message(&self, message: impl Into<String>) {
        if let Some(bar) = &self.bar {
            bar.set_message(message.into());
        }
    }

    pub fn finish_success(self, message: impl Into<String>) {
        if let Some(bar) = &self.bar {
            bar.finish_with_message(format!("{} {}", "v".green(), message.into()));
        }
    }

    pub fn finish_failure(self, message: impl Into<String>) {
        if let Some(bar) = &self.bar {
            bar.finish_with_message(format!("{} {}", "x".red(), message.into()));
        }
    }

    /// Remove the spinner without leaving a line behind
    pub fn clear(self) {
        if let Some(bar) = &self.bar {
            bar.finish_and_clear();
        }
    }
}
