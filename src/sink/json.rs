use std::io::Write;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::Serialize;

use super::{ResultSink, RunId, WarningBatch};
use crate::core::error::SinkError;
use crate::observer::FailureRecord;

/// One line of [`JsonLinesSink`] output.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum SinkEvent<'a> {
    Failure {
        run_id: RunId,
        #[serde(flatten)]
        failure: &'a FailureRecord,
    },
    WarningBatch {
        run_id: RunId,
        #[serde(flatten)]
        batch: &'a WarningBatch,
    },
}

/// Sink that writes one JSON object per record, newline-delimited.
///
/// Writes run on the blocking pool so a slow writer never stalls runtime workers.
pub struct JsonLinesSink<W> {
    writer: Arc<Mutex<W>>,
}

impl<W: Write + Send + 'static> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Arc::new(Mutex::new(writer)),
        }
    }

    /// Consume the sink and return the underlying writer.
    ///
    /// Returns `None` while a write is still in flight.
    pub fn into_inner(self) -> Option<W> {
        let writer = Arc::try_unwrap(self.writer).ok()?;
        Some(writer.into_inner().unwrap_or_else(|poisoned| poisoned.into_inner()))
    }

    async fn write_event(&self, event: &SinkEvent<'_>) -> Result<(), SinkError> {
        let mut line = serde_json::to_vec(event)?;
        line.push(b'\n');
        let writer = Arc::clone(&self.writer);
        tokio::task::spawn_blocking(move || -> Result<(), SinkError> {
            let mut writer = writer
                .lock()
                .map_err(|_| SinkError::unavailable("json writer lock poisoned"))?;
            writer.write_all(&line)?;
            writer.flush()?;
            Ok(())
        })
        .await
        .map_err(|e| SinkError::unavailable(format!("json writer task failed: {e}")))?
    }
}

#[async_trait]
impl<W: Write + Send + 'static> ResultSink for JsonLinesSink<W> {
    async fn record_failure(&self, run_id: RunId, failure: FailureRecord) -> Result<(), SinkError> {
        self.write_event(&SinkEvent::Failure {
            run_id,
            failure: &failure,
        })
        .await
    }

    async fn record_warning_batch(
        &self,
        run_id: RunId,
        batch: WarningBatch,
    ) -> Result<(), SinkError> {
        self.write_event(&SinkEvent::WarningBatch {
            run_id,
            batch: &batch,
        })
        .await
    }

    fn name(&self) -> &str {
        "json-lines"
    }
}
