use async_trait::async_trait;

use super::{ResultSink, RunId, WarningBatch};
use crate::core::error::SinkError;
use crate::observer::FailureRecord;

/// Sink that reports records through `tracing` instead of storing them.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl LogSink {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ResultSink for LogSink {
    async fn record_failure(&self, run_id: RunId, failure: FailureRecord) -> Result<(), SinkError> {
        tracing::info!(
            %run_id,
            lines = failure.transcript.lines().count(),
            "FAIL: {} '{}' {}",
            failure.full_name(),
            failure.variant,
            failure.info
        );
        tracing::debug!(%run_id, "transcript:\n{}", failure.transcript);
        Ok(())
    }

    async fn record_warning_batch(
        &self,
        run_id: RunId,
        batch: WarningBatch,
    ) -> Result<(), SinkError> {
        tracing::info!(%run_id, batch = batch.index, "FAILLIST: {}", batch.tests.join(" "));
        Ok(())
    }

    fn name(&self) -> &str {
        "log"
    }
}
