//! Result sink trait: durable target for closed failures and warning batches.
//!
//! The dispatcher hands every sink call plain owned data and never waits for it
//! while processing lines. Implementations report problems through [`SinkError`];
//! the dispatcher logs those and moves on.
//!
//! # Built-in Sinks
//!
//! - [`LogSink`] - writes one tracing event per record
//! - [`JsonLinesSink`] - writes one JSON object per record to any writer
//! - [`MemorySink`] - keeps records in memory, with optional injected failures

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::error::SinkError;
use crate::observer::FailureRecord;

mod json;
mod log;
mod memory;

pub use json::JsonLinesSink;
pub use log::LogSink;
pub use memory::MemorySink;

/// Identifier of one observed test run, assigned once at run start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub u64);

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Test names reported together on one shutdown-warnings line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WarningBatch {
    /// Position of this batch within the run, starting at 0.
    pub index: u32,
    pub tests: Vec<String>,
}

/// Durable target for observer results.
///
/// Composite keys are `(run_id, test name, variant)` for failures and
/// `(run_id, batch index)` for warning batches.
#[async_trait]
pub trait ResultSink: Send + Sync {
    /// Register a new run and return its id.
    ///
    /// The default keeps `fallback`, the id from configuration.
    async fn register_run(&self, fallback: RunId) -> Result<RunId, SinkError> {
        Ok(fallback)
    }

    /// Persist one closed failure record.
    async fn record_failure(&self, run_id: RunId, failure: FailureRecord) -> Result<(), SinkError>;

    /// Persist one warning batch.
    async fn record_warning_batch(&self, run_id: RunId, batch: WarningBatch)
    -> Result<(), SinkError>;

    /// Get a human-readable name for this sink.
    fn name(&self) -> &str;
}
