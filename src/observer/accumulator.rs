//! Single-slot accumulator for the transcript of the failing test in progress.

use serde::Serialize;

use crate::core::error::{Error, Result};
use crate::harness::{Outcome, ResultLine};

/// A failing test and everything the harness printed about it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureRecord {
    /// Suite component of the printed name, empty if none.
    pub suite: String,
    pub test_name: String,
    /// Variant without quotes, empty if none.
    pub variant: String,
    pub outcome: Outcome,
    pub info: String,
    /// The triggering result line and every following text line, each newline-terminated.
    pub transcript: String,
}

impl FailureRecord {
    /// The name as the harness printed it, `suite.test` or just `test`.
    pub fn full_name(&self) -> String {
        if self.suite.is_empty() {
            self.test_name.clone()
        } else {
            format!("{}.{}", self.suite, self.test_name)
        }
    }
}

/// Holds at most one open [`FailureRecord`].
#[derive(Debug, Default)]
pub struct FailureAccumulator {
    current: Option<FailureRecord>,
}

impl FailureAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new record seeded with `first_line`.
    ///
    /// Fails if a record is already open; callers close first.
    pub fn open(&mut self, result: &ResultLine<'_>, first_line: &str) -> Result<()> {
        if let Some(open) = &self.current {
            return Err(Error::AccumulatorBusy {
                open: open.full_name(),
                requested: result.full_name.to_string(),
            });
        }
        self.current = Some(FailureRecord {
            suite: result.suite.to_string(),
            test_name: result.test_name.to_string(),
            variant: result.variant.to_string(),
            outcome: result.outcome,
            info: result.info.to_string(),
            transcript: first_line.to_string(),
        });
        Ok(())
    }

    /// Append `line` plus a newline to the open record. No-op when nothing is open.
    pub fn append(&mut self, line: &str) {
        if let Some(record) = &mut self.current {
            record.transcript.push_str(line);
            record.transcript.push('\n');
        }
    }

    /// Take the open record, if any. Calling it again returns `None`.
    pub fn close(&mut self) -> Option<FailureRecord> {
        self.current.take()
    }

    pub fn is_open(&self) -> bool {
        self.current.is_some()
    }

    pub fn current(&self) -> Option<&FailureRecord> {
        self.current.as_ref()
    }
}
