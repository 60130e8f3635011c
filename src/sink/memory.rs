use std::sync::Mutex;

use async_trait::async_trait;

use super::{ResultSink, RunId, WarningBatch};
use crate::core::error::SinkError;
use crate::observer::FailureRecord;

#[derive(Debug, Default)]
struct Stored {
    failures: Vec<(RunId, FailureRecord)>,
    batches: Vec<(RunId, WarningBatch)>,
}

/// Sink that keeps every record in memory.
///
/// Useful for tests and for hosts that persist results themselves after the run.
#[derive(Debug, Default)]
pub struct MemorySink {
    stored: Mutex<Stored>,
    assigned_run_id: Option<RunId>,
    failure: Option<String>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign this id at registration instead of the configured fallback.
    pub fn with_run_id(mut self, run_id: RunId) -> Self {
        self.assigned_run_id = Some(run_id);
        self
    }

    /// Make every call fail with [`SinkError::Unavailable`].
    pub fn failing(mut self, reason: impl Into<String>) -> Self {
        self.failure = Some(reason.into());
        self
    }

    /// Failure records stored so far, in completion order.
    pub fn failures(&self) -> Vec<(RunId, FailureRecord)> {
        self.stored
            .lock()
            .map(|s| s.failures.clone())
            .unwrap_or_default()
    }

    /// Warning batches stored so far, in completion order.
    pub fn warning_batches(&self) -> Vec<(RunId, WarningBatch)> {
        self.stored
            .lock()
            .map(|s| s.batches.clone())
            .unwrap_or_default()
    }

    fn check(&self) -> Result<(), SinkError> {
        match &self.failure {
            Some(reason) => Err(SinkError::unavailable(reason.clone())),
            None => Ok(()),
        }
    }

    fn store(&self, f: impl FnOnce(&mut Stored)) -> Result<(), SinkError> {
        let mut stored = self
            .stored
            .lock()
            .map_err(|_| SinkError::unavailable("memory sink lock poisoned"))?;
        f(&mut stored);
        Ok(())
    }
}

#[async_trait]
impl ResultSink for MemorySink {
    async fn register_run(&self, fallback: RunId) -> Result<RunId, SinkError> {
        self.check()?;
        Ok(self.assigned_run_id.unwrap_or(fallback))
    }

    async fn record_failure(&self, run_id: RunId, failure: FailureRecord) -> Result<(), SinkError> {
        self.check()?;
        self.store(|s| s.failures.push((run_id, failure)))
    }

    async fn record_warning_batch(
        &self,
        run_id: RunId,
        batch: WarningBatch,
    ) -> Result<(), SinkError> {
        self.check()?;
        self.store(|s| s.batches.push((run_id, batch)))
    }

    fn name(&self) -> &str {
        "memory"
    }
}
