//! Outbound progress and summary signals for the hosting build step.

use std::sync::{Arc, Mutex};

/// Metric name reported after every counted result line.
pub const TESTS_METRIC: &str = "tests";

/// Receives progress and summary updates from the dispatcher.
///
/// All methods default to no-ops so surfaces implement only what they show.
pub trait StatusReporter: Send {
    /// Called after every counted result line.
    fn on_progress(&mut self, metric: &str, value: u64) {
        let _ = (metric, value);
    }

    /// Called after every change to the fail or warn list.
    fn on_summary(&mut self, text: &str) {
        let _ = text;
    }

    /// Called once with the final summary at end of stream.
    fn on_finish(&mut self, text: &str) {
        let _ = text;
    }
}

/// Reporter that ignores every signal.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullStatus;

impl StatusReporter for NullStatus {}

/// Signals captured by [`RecordingStatus`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct StatusLog {
    pub progress: Vec<(String, u64)>,
    pub summaries: Vec<String>,
    pub finished: Option<String>,
}

/// Reporter that records every signal; clones share the same log.
#[derive(Debug, Default, Clone)]
pub struct RecordingStatus {
    log: Arc<Mutex<StatusLog>>,
}

impl RecordingStatus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far.
    pub fn snapshot(&self) -> StatusLog {
        self.log.lock().map(|log| log.clone()).unwrap_or_default()
    }

    /// Values reported for the `tests` metric, in order.
    pub fn test_counts(&self) -> Vec<u64> {
        self.snapshot()
            .progress
            .into_iter()
            .filter(|(metric, _)| metric == TESTS_METRIC)
            .map(|(_, value)| value)
            .collect()
    }

    fn with_log(&self, f: impl FnOnce(&mut StatusLog)) {
        if let Ok(mut log) = self.log.lock() {
            f(&mut log);
        }
    }
}

impl StatusReporter for RecordingStatus {
    fn on_progress(&mut self, metric: &str, value: u64) {
        self.with_log(|log| log.progress.push((metric.to_string(), value)));
    }

    fn on_summary(&mut self, text: &str) {
        self.with_log(|log| log.summaries.push(text.to_string()));
    }

    fn on_finish(&mut self, text: &str) {
        self.with_log(|log| log.finished = Some(text.to_string()));
    }
}
