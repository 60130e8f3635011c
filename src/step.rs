//! One observed mysql-test-run step: register the run, feed output, finish.
//!
//! ```no_run
//! use mtr_observer::{ObserverBuilder, sink::MemorySink};
//!
//! # async fn demo() -> mtr_observer::Result<()> {
//! let mut step = ObserverBuilder::new().sink(MemorySink::new()).start().await?;
//! step.feed_chunk(b"main.t1 [ fail ]  timeout after 900 seconds\nTest case timeout\n");
//! let outcome = step.finish().await;
//! assert_eq!(outcome.summary, "test fail: t1");
//! # Ok(())
//! # }
//! ```

use serde::Serialize;

use crate::observer::{Dispatcher, LineBuffer};
use crate::sink::RunId;

/// What a finished step reports back to its host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepOutcome {
    pub run_id: RunId,
    /// Counted `pass`/`fail` result lines.
    pub tests: u64,
    pub failures: u64,
    pub warning_batches: u32,
    /// Final summary text.
    pub summary: String,
}

/// A registered run accepting harness output.
pub struct MtrStep {
    dispatcher: Dispatcher,
    lines: LineBuffer,
}

impl MtrStep {
    pub(crate) fn new(dispatcher: Dispatcher, max_line_length: usize) -> Self {
        Self {
            dispatcher,
            lines: LineBuffer::new(max_line_length),
        }
    }

    pub fn run_id(&self) -> RunId {
        self.dispatcher.run_id()
    }

    /// Feed one complete line.
    pub fn feed_line(&mut self, line: &str) {
        self.dispatcher.on_line(line);
    }

    /// Feed a raw output chunk; complete lines are processed immediately.
    pub fn feed_chunk(&mut self, chunk: &[u8]) {
        for line in self.lines.push(chunk) {
            self.dispatcher.on_line(&line);
        }
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// End of stream: process any partial line, close the open failure,
    /// and wait for outstanding sink writes.
    pub async fn finish(mut self) -> StepOutcome {
        if let Some(line) = self.lines.flush() {
            self.dispatcher.on_line(&line);
        }
        let summary = self.dispatcher.finish();
        self.dispatcher.drain().await;

        StepOutcome {
            run_id: self.dispatcher.run_id(),
            tests: self.dispatcher.tests_seen(),
            failures: self.dispatcher.failures_emitted(),
            warning_batches: self.dispatcher.warning_batches_emitted(),
            summary,
        }
    }
}
