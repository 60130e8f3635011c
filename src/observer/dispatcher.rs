//! The line-driven state machine tying classifier, accumulator, summary, and sink together.

use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::task::JoinSet;

use super::accumulator::{FailureAccumulator, FailureRecord};
use super::status::{StatusReporter, TESTS_METRIC};
use crate::config::SummaryConfig;
use crate::core::error::Result;
use crate::harness::{Category, LineClassifier, Outcome, ResultLine, SummaryBuilder, strip_line_ending};
use crate::sink::{ResultSink, RunId, WarningBatch};

/// Consumes harness output one line at a time.
///
/// Owns the counters, the open failure, and the summary lists. Sink writes are
/// spawned on `runtime` with owned copies of the data and never awaited here.
pub struct Dispatcher {
    classifier: LineClassifier,
    accumulator: FailureAccumulator,
    summary: SummaryBuilder,
    tests_seen: u64,
    failures_emitted: u64,
    next_warn_batch_index: u32,
    run_id: RunId,
    sink: Arc<dyn ResultSink>,
    status: Box<dyn StatusReporter>,
    runtime: Handle,
    in_flight: JoinSet<()>,
    final_summary: Option<String>,
}

impl Dispatcher {
    /// Create a dispatcher for one run.
    pub fn new(
        summary: &SummaryConfig,
        run_id: RunId,
        sink: Arc<dyn ResultSink>,
        status: Box<dyn StatusReporter>,
        runtime: Handle,
    ) -> Result<Self> {
        Ok(Self {
            classifier: LineClassifier::new()?,
            accumulator: FailureAccumulator::new(),
            summary: SummaryBuilder::new(summary),
            tests_seen: 0,
            failures_emitted: 0,
            next_warn_batch_index: 0,
            run_id,
            sink,
            status,
            runtime,
            in_flight: JoinSet::new(),
            final_summary: None,
        })
    }

    /// Process one line of harness output.
    pub fn on_line(&mut self, raw: &str) {
        if self.final_summary.is_some() {
            tracing::warn!("ignoring output line received after end of stream");
            return;
        }
        self.reap_finished();

        let line = strip_line_ending(raw);
        match self.classifier.classify(line, self.accumulator.is_open()) {
            Category::Result(result) => self.on_result(line, &result),
            Category::Warnings(names) => {
                self.close_failure();
                self.emit_warning_batch(names.into_iter().map(str::to_string).collect());
            }
            Category::Boundary(boundary) => {
                tracing::trace!(?boundary, "boundary line");
                self.close_failure();
            }
            Category::Text => self.accumulator.append(line),
        }
    }

    /// Handle end of stream: close any open failure and return the final summary.
    ///
    /// Calling it again returns the same summary without side effects. Sink
    /// writes issued so far keep running on the runtime even if the dispatcher
    /// is dropped afterwards; [`drain`](Self::drain) waits for them.
    pub fn finish(&mut self) -> String {
        if let Some(summary) = &self.final_summary {
            return summary.clone();
        }
        self.close_failure();
        let summary = self.summary.render(true);
        self.status.on_finish(&summary);
        tracing::debug!(
            run_id = %self.run_id,
            tests = self.tests_seen,
            failures = self.failures_emitted,
            batches = self.next_warn_batch_index,
            "end of stream"
        );
        self.final_summary = Some(summary.clone());
        summary
    }

    /// Wait for every sink write issued so far to complete.
    pub async fn drain(&mut self) {
        while let Some(joined) = self.in_flight.join_next().await {
            if let Err(err) = joined {
                tracing::error!(run_id = %self.run_id, "sink task did not complete: {}", err);
            }
        }
    }

    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    /// Number of `pass`/`fail` result lines seen.
    pub fn tests_seen(&self) -> u64 {
        self.tests_seen
    }

    /// Number of failure records handed to the sink.
    pub fn failures_emitted(&self) -> u64 {
        self.failures_emitted
    }

    /// Number of warning batches handed to the sink.
    pub fn warning_batches_emitted(&self) -> u32 {
        self.next_warn_batch_index
    }

    pub fn failure_open(&self) -> bool {
        self.accumulator.is_open()
    }

    pub fn summary(&self) -> &SummaryBuilder {
        &self.summary
    }

    /// The final summary, once [`finish`](Self::finish) has run.
    pub fn final_summary(&self) -> Option<&str> {
        self.final_summary.as_deref()
    }

    fn on_result(&mut self, line: &str, result: &ResultLine<'_>) {
        self.close_failure();
        self.tests_seen += 1;
        self.status.on_progress(TESTS_METRIC, self.tests_seen);

        if result.outcome != Outcome::Fail {
            return;
        }
        let first_line = format!("{line}\n");
        if let Err(err) = self.accumulator.open(result, &first_line) {
            // Unreachable: the failure was closed above.
            tracing::error!("{}", err);
            return;
        }
        self.summary.add_failure(result.full_name);
        self.refresh_summary();
    }

    fn close_failure(&mut self) {
        let Some(record) = self.accumulator.close() else {
            return;
        };
        self.failures_emitted += 1;
        self.spawn_failure(record);
    }

    fn emit_warning_batch(&mut self, tests: Vec<String>) {
        let index = self.next_warn_batch_index;
        self.next_warn_batch_index += 1;

        self.summary.add_warnings(&tests);
        self.refresh_summary();
        self.spawn_warning_batch(WarningBatch { index, tests });
    }

    fn refresh_summary(&mut self) {
        let text = self.summary.render(false);
        self.status.on_summary(&text);
    }

    fn spawn_failure(&mut self, record: FailureRecord) {
        let sink = Arc::clone(&self.sink);
        let run_id = self.run_id;
        self.in_flight.spawn_on(
            async move {
                let name = record.full_name();
                let variant = record.variant.clone();
                if let Err(err) = sink.record_failure(run_id, record).await {
                    tracing::error!(
                        %run_id,
                        sink = sink.name(),
                        test = %name,
                        variant = %variant,
                        "failed to record test failure: {}",
                        err
                    );
                }
            },
            &self.runtime,
        );
    }

    fn spawn_warning_batch(&mut self, batch: WarningBatch) {
        let sink = Arc::clone(&self.sink);
        let run_id = self.run_id;
        self.in_flight.spawn_on(
            async move {
                let index = batch.index;
                if let Err(err) = sink.record_warning_batch(run_id, batch).await {
                    tracing::error!(
                        %run_id,
                        sink = sink.name(),
                        batch = index,
                        "failed to record warning batch: {}",
                        err
                    );
                }
            },
            &self.runtime,
        );
    }

    /// Drop handles of sink writes that already completed.
    fn reap_finished(&mut self) {
        while let Some(joined) = self.in_flight.try_join_next() {
            if let Err(err) = joined {
                tracing::error!(run_id = %self.run_id, "sink task did not complete: {}", err);
            }
        }
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        // Dropping a JoinSet aborts its tasks; pending sink writes must still land.
        self.in_flight.detach_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::status::RecordingStatus;
    use crate::sink::MemorySink;

    fn dispatcher(sink: Arc<MemorySink>, status: RecordingStatus) -> Dispatcher {
        Dispatcher::new(
            &SummaryConfig::default(),
            RunId(1),
            sink,
            Box::new(status),
            Handle::current(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_fail_then_pass_emits_one_failure() {
        let sink = Arc::new(MemorySink::new());
        let status = RecordingStatus::new();
        let mut d = dispatcher(sink.clone(), status.clone());

        d.on_line("a.t1 'row' [ fail ]  info1");
        d.on_line("detail line");
        assert!(d.failure_open());
        d.on_line("a.t2 [ pass ]  5");
        assert!(!d.failure_open());
        d.finish();
        d.drain().await;

        assert_eq!(status.test_counts(), vec![1, 2]);
        let failures = sink.failures();
        assert_eq!(failures.len(), 1);
        let (run_id, record) = &failures[0];
        assert_eq!(*run_id, RunId(1));
        assert_eq!(record.test_name, "t1");
        assert_eq!(record.suite, "a");
        assert_eq!(record.variant, "row");
        assert_eq!(record.outcome, Outcome::Fail);
        assert_eq!(record.info, "info1");
        assert_eq!(record.transcript, "a.t1 'row' [ fail ]  info1\ndetail line\n");
    }

    #[tokio::test]
    async fn test_warning_line_emits_batch_without_progress() {
        let sink = Arc::new(MemorySink::new());
        let status = RecordingStatus::new();
        let mut d = dispatcher(sink.clone(), status.clone());

        d.on_line(
            "***Warnings generated in error logs during shutdown after running tests: x.t1 x.t2",
        );
        d.finish();
        d.drain().await;

        assert!(status.test_counts().is_empty());
        assert_eq!(
            sink.warning_batches(),
            vec![(
                RunId(1),
                WarningBatch {
                    index: 0,
                    tests: vec!["x.t1".to_string(), "x.t2".to_string()],
                }
            )]
        );
        assert_eq!(d.warning_batches_emitted(), 1);
    }

    #[tokio::test]
    async fn test_end_of_stream_closes_open_failure_once() {
        let sink = Arc::new(MemorySink::new());
        let mut d = dispatcher(sink.clone(), RecordingStatus::new());

        d.on_line("main.t1 [ fail ]  timeout after 900 seconds");
        d.on_line("Test case timeout after 900 seconds");
        let first = d.finish();
        let second = d.finish();
        d.drain().await;

        assert_eq!(first, second);
        assert_eq!(first, "test fail: t1");
        let failures = sink.failures();
        assert_eq!(failures.len(), 1);
        assert_eq!(
            failures[0].1.transcript,
            "main.t1 [ fail ]  timeout after 900 seconds\nTest case timeout after 900 seconds\n"
        );
    }

    #[tokio::test]
    async fn test_boundary_lines_close_failure() {
        let sink = Arc::new(MemorySink::new());
        let mut d = dispatcher(sink.clone(), RecordingStatus::new());

        d.on_line("main.t1 [ fail ]");
        d.on_line("diagnostic");
        d.on_line(&"-".repeat(60));
        d.on_line("after separator is dropped");
        d.on_line("main.t2 [ fail ]");
        d.on_line("main.t2 [ retry-pass ]  12");
        d.on_line("main.t3 [ fail ]");
        d.on_line("The servers were restarted 3 times");
        d.finish();
        d.drain().await;

        let transcripts: Vec<String> = sink.failures().into_iter().map(|(_, r)| r.transcript).collect();
        assert_eq!(transcripts.len(), 3);
        assert!(transcripts.contains(&"main.t1 [ fail ]\ndiagnostic\n".to_string()));
        assert!(transcripts.contains(&"main.t2 [ fail ]\n".to_string()));
        assert!(transcripts.contains(&"main.t3 [ fail ]\n".to_string()));
        assert_eq!(d.tests_seen(), 3);
    }

    #[tokio::test]
    async fn test_carriage_returns_are_stripped() {
        let sink = Arc::new(MemorySink::new());
        let mut d = dispatcher(sink.clone(), RecordingStatus::new());

        d.on_line("main.t1 [ fail ]  oops\r\n");
        d.on_line("detail\r\n");
        d.finish();
        d.drain().await;

        assert_eq!(sink.failures()[0].1.transcript, "main.t1 [ fail ]  oops\ndetail\n");
        assert_eq!(sink.failures()[0].1.info, "oops");
    }

    #[tokio::test]
    async fn test_summary_refreshes_on_each_list_change() {
        let status = RecordingStatus::new();
        let mut d = dispatcher(Arc::new(MemorySink::new()), status.clone());

        d.on_line("main.t1 [ pass ]  1");
        d.on_line("main.t2 [ fail ]");
        d.on_line("***Warnings generated in error logs during shutdown after running tests: main.t2");
        let final_text = d.finish();
        d.drain().await;

        let log = status.snapshot();
        assert_eq!(
            log.summaries,
            vec!["testing fail: t2", "testing fail: t2 warn: t2"]
        );
        assert_eq!(final_text, "test fail: t2 warn: t2");
        assert_eq!(log.finished.as_deref(), Some("test fail: t2 warn: t2"));
    }

    #[tokio::test]
    async fn test_sink_errors_do_not_stop_processing() {
        let sink = Arc::new(MemorySink::new().failing("store offline"));
        let status = RecordingStatus::new();
        let mut d = dispatcher(sink.clone(), status.clone());

        d.on_line("main.t1 [ fail ]");
        d.on_line("main.t2 [ fail ]");
        d.on_line("main.t3 [ pass ]");
        d.finish();
        d.drain().await;

        assert_eq!(status.test_counts(), vec![1, 2, 3]);
        assert_eq!(d.failures_emitted(), 2);
        assert!(sink.failures().is_empty());
    }

    #[tokio::test]
    async fn test_lines_after_finish_are_ignored() {
        let status = RecordingStatus::new();
        let mut d = dispatcher(Arc::new(MemorySink::new()), status.clone());

        d.on_line("main.t1 [ pass ]");
        d.finish();
        d.on_line("main.t2 [ pass ]");
        assert_eq!(d.tests_seen(), 1);
        assert_eq!(d.final_summary(), Some("test"));
    }

    #[tokio::test]
    async fn test_writes_survive_dropping_the_dispatcher() {
        let sink = Arc::new(MemorySink::new());
        let mut d = crate::ObserverBuilder::new()
            .shared_sink(sink.clone())
            .build()
            .unwrap();

        d.on_line("a.t1 'row' [ fail ]  info1");
        d.on_line("detail line");
        d.on_line("a.t2 [ pass ]  5");
        d.on_line("***Warnings generated in error logs during shutdown after running tests: a.t1");
        d.on_line("a.t3 [ fail ]  at end of stream");
        d.finish();
        drop(d);

        for _ in 0..10 {
            tokio::task::yield_now().await;
        }

        let mut names: Vec<String> = sink
            .failures()
            .into_iter()
            .map(|(_, record)| record.full_name())
            .collect();
        names.sort();
        assert_eq!(names, vec!["a.t1", "a.t3"]);
        assert_eq!(sink.warning_batches().len(), 1);
    }

    #[tokio::test]
    async fn test_plain_text_without_failure_is_discarded() {
        let sink = Arc::new(MemorySink::new());
        let mut d = dispatcher(sink.clone(), RecordingStatus::new());

        d.on_line("Logging: mysql-test-run.pl  --force");
        d.on_line(&"-".repeat(60));
        d.on_line("");
        d.finish();
        d.drain().await;

        assert!(sink.failures().is_empty());
        assert_eq!(d.tests_seen(), 0);
    }
}
