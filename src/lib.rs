//! mtr-observer: streaming classifier for mysql-test-run console output.
//!
//! This library watches the output of a `mysql-test-run` style harness while it
//! is being produced and turns it into structured results: failing tests with
//! their full diagnostic transcript, batches of tests flagged with shutdown
//! warnings, a running test count, and a short summary for a status display.
//!
//! # Quick Start
//!
//! ```no_run
//! use mtr_observer::ObserverBuilder;
//! use mtr_observer::sink::LogSink;
//!
//! # async fn demo() -> mtr_observer::Result<()> {
//! let mut step = ObserverBuilder::new()
//!     .from_config_file("mtr-observer.toml")?
//!     .sink(LogSink::new())
//!     .start()
//!     .await?;
//!
//! step.feed_line("rpl.rpl_ssl 'stmt'                       [ pass ]  13697");
//! step.feed_line("main.t1                                  [ fail ]  timeout after 900 seconds");
//! step.feed_line("Test case timeout after 900 seconds");
//!
//! let outcome = step.finish().await;
//! println!("{}", outcome.summary); // "test fail: t1"
//! # Ok(())
//! # }
//! ```
//!
//! ## Configuration
//!
//! ```toml
//! [summary]
//! text-limit = 5
//! test-name-limit = 16
//!
//! [input]
//! max-line-length = 16384
//!
//! [profiles.ci.summary]
//! text-limit = 10
//! ```
//!
//! # Architecture
//!
//! - [`LineClassifier`](harness::LineClassifier): decides what one line means
//! - [`Dispatcher`](observer::Dispatcher): the state machine fed line by line
//! - [`SummaryBuilder`](harness::SummaryBuilder): the capped status text
//! - [`ResultSink`](sink::ResultSink): where closed failures and warning batches go
//! - [`StatusReporter`](observer::StatusReporter): where progress and summaries go
//!
//! Sink writes are spawned on a Tokio runtime and never block line processing.
//!
//! # Features
//!
//! - `default` - Enables `cli`
//! - `cli` - The `mtr-observer` binary
//! - `progress` - indicatif spinner status surface

pub mod config;
pub mod core;
pub mod harness;
pub mod observer;
#[cfg(feature = "progress")]
pub mod progress;
pub mod sink;
pub mod step;

// Re-export commonly used types
pub use crate::core::{Error, ObserverBuilder, Result, SinkError};
pub use config::Config;
pub use observer::{Dispatcher, FailureRecord};
pub use sink::{ResultSink, RunId, WarningBatch};
pub use step::{MtrStep, StepOutcome};

/// Create a new observer builder.
///
/// This is the main entry point for the fluent API.
pub fn builder() -> ObserverBuilder {
    ObserverBuilder::new()
}
