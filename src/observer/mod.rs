//! Stateful processing of the harness output stream.
//!
//! The observer sits between the host that runs mysql-test-run and the result
//! sink: `host lines → Dispatcher → (FailureAccumulator, SummaryBuilder) → ResultSink`.
//! Hosts that only see raw output chunks run them through a [`LineBuffer`] first.

mod accumulator;
mod dispatcher;
mod lines;
pub mod status;

pub use accumulator::{FailureAccumulator, FailureRecord};
pub use dispatcher::Dispatcher;
pub use lines::LineBuffer;
pub use status::{NullStatus, RecordingStatus, StatusLog, StatusReporter, TESTS_METRIC};
