//! Live terminal status for a running step (feature `progress`).

use indicatif::{ProgressBar, ProgressStyle};

use crate::observer::{StatusReporter, TESTS_METRIC};

/// Spinner showing the test count and the current summary text.
pub struct ProgressStatus {
    bar: ProgressBar,
}

impl ProgressStatus {
    /// Spinner drawn to stderr.
    pub fn new() -> Self {
        Self::with_bar(ProgressBar::new_spinner())
    }

    /// Wrap an existing bar, e.g. a hidden one.
    pub fn with_bar(bar: ProgressBar) -> Self {
        if let Ok(style) = ProgressStyle::with_template("{spinner} {pos:>5} tests  {wide_msg}") {
            bar.set_style(style);
        }
        bar.set_message(crate::harness::MARKER_RUNNING);
        Self { bar }
    }

    pub fn bar(&self) -> &ProgressBar {
        &self.bar
    }
}

impl Default for ProgressStatus {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusReporter for ProgressStatus {
    fn on_progress(&mut self, metric: &str, value: u64) {
        if metric == TESTS_METRIC {
            self.bar.set_position(value);
        }
    }

    fn on_summary(&mut self, text: &str) {
        self.bar.set_message(text.to_string());
    }

    fn on_finish(&mut self, text: &str) {
        self.bar.finish_with_message(text.to_string());
    }
}
