use crate::config::{Config, ConfigLoader};
use crate::core::error::{Error, Result};
use crate::observer::{Dispatcher, NullStatus, StatusReporter};
use crate::sink::{JsonLinesSink, LogSink, ResultSink, RunId};
use crate::step::MtrStep;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::runtime::Handle;

/// Builder for creating an observer for one mysql-test-run step.
pub struct ObserverBuilder {
    config: Option<Config>,
    sink: Option<Arc<dyn ResultSink>>,
    status: Option<Box<dyn StatusReporter>>,
    runtime: Option<Handle>,
    run_id: Option<RunId>,
}

impl ObserverBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: None,
            sink: None,
            status: None,
            runtime: None,
            run_id: None,
        }
    }

    /// Set the configuration directly.
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    /// Load configuration from a standalone TOML file plus env overrides.
    pub fn from_config_file(mut self, path: impl Into<PathBuf>) -> Result<Self> {
        self.config = Some(ConfigLoader::new().config_file(path).load()?);
        Ok(self)
    }

    // --- Sink Configuration ---

    /// Set a custom result sink.
    pub fn sink<S: ResultSink + 'static>(mut self, sink: S) -> Self {
        self.sink = Some(Arc::new(sink));
        self
    }

    /// Set a result sink the caller keeps a handle to.
    pub fn shared_sink(mut self, sink: Arc<dyn ResultSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Report results through `tracing` (the default).
    pub fn log_sink(self) -> Self {
        self.sink(LogSink::new())
    }

    /// Write results as JSON lines to `writer`.
    pub fn json_sink<W: Write + Send + 'static>(self, writer: W) -> Self {
        self.sink(JsonLinesSink::new(writer))
    }

    // --- Status Surface ---

    /// Set the surface that receives progress and summary updates.
    pub fn status<R: StatusReporter + 'static>(mut self, status: R) -> Self {
        self.status = Some(Box::new(status));
        self
    }

    // --- Runtime ---

    /// Set the Tokio runtime sink writes are spawned on.
    ///
    /// Defaults to the runtime of the calling context.
    pub fn runtime(mut self, handle: Handle) -> Self {
        self.runtime = Some(handle);
        self
    }

    /// Use this run id instead of the configured one.
    pub fn run_id(mut self, run_id: RunId) -> Self {
        self.run_id = Some(run_id);
        self
    }

    /// Build the dispatcher without registering the run with the sink.
    pub fn build(self) -> Result<Dispatcher> {
        let parts = self.into_parts()?;
        let run_id = parts.run_id.unwrap_or(RunId(parts.config.run.id));
        parts.into_dispatcher(run_id)
    }

    /// Register the run with the sink and return a step ready for output.
    pub async fn start(self) -> Result<MtrStep> {
        let parts = self.into_parts()?;
        let fallback = parts.run_id.unwrap_or(RunId(parts.config.run.id));
        let run_id = parts.sink.register_run(fallback).await?;
        tracing::debug!(%run_id, sink = parts.sink.name(), "registered test run");

        let max_line_length = parts.config.input.max_line_length;
        let dispatcher = parts.into_dispatcher(run_id)?;
        Ok(MtrStep::new(dispatcher, max_line_length))
    }

    fn into_parts(self) -> Result<Parts> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        let runtime = match self.runtime {
            Some(handle) => handle,
            None => Handle::try_current().map_err(|_| {
                Error::config("no Tokio runtime available for sink writes; set one with .runtime()")
            })?,
        };

        Ok(Parts {
            config,
            sink: self.sink.unwrap_or_else(|| Arc::new(LogSink::new())),
            status: self.status.unwrap_or_else(|| Box::new(NullStatus)),
            runtime,
            run_id: self.run_id,
        })
    }
}

impl Default for ObserverBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder state with defaults resolved.
struct Parts {
    config: Config,
    sink: Arc<dyn ResultSink>,
    status: Box<dyn StatusReporter>,
    runtime: Handle,
    run_id: Option<RunId>,
}

impl Parts {
    fn into_dispatcher(self, run_id: RunId) -> Result<Dispatcher> {
        Dispatcher::new(
            &self.config.summary,
            run_id,
            self.sink,
            self.status,
            self.runtime,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::MemorySink;

    #[test]
    fn test_build_without_runtime_fails() {
        let err = ObserverBuilder::new().build().err().unwrap();
        assert!(err.to_string().contains("no Tokio runtime"));
    }

    #[tokio::test]
    async fn test_build_uses_configured_run_id() {
        let mut config = Config::default();
        config.run.id = 12;
        let dispatcher = ObserverBuilder::new().with_config(config).build().unwrap();
        assert_eq!(dispatcher.run_id(), RunId(12));
    }

    #[tokio::test]
    async fn test_explicit_run_id_wins() {
        let mut config = Config::default();
        config.run.id = 12;
        let dispatcher = ObserverBuilder::new()
            .with_config(config)
            .run_id(RunId(40))
            .build()
            .unwrap();
        assert_eq!(dispatcher.run_id(), RunId(40));
    }

    #[tokio::test]
    async fn test_invalid_config_is_rejected() {
        let mut config = Config::default();
        config.summary.test_name_limit = 1;
        let err = ObserverBuilder::new().with_config(config).build().err().unwrap();
        assert!(matches!(err, Error::InvalidConfig { .. }));
    }

    #[tokio::test]
    async fn test_start_registers_run_with_sink() {
        let sink = Arc::new(MemorySink::new().with_run_id(RunId(77)));
        let step = ObserverBuilder::new()
            .shared_sink(sink.clone())
            .start()
            .await
            .unwrap();
        assert_eq!(step.run_id(), RunId(77));
    }

    #[tokio::test]
    async fn test_start_fails_when_registration_fails() {
        let err = ObserverBuilder::new()
            .sink(MemorySink::new().failing("no database"))
            .start()
            .await
            .err()
            .unwrap();
        assert!(matches!(err, Error::Sink(_)));
    }

    #[test]
    fn test_explicit_runtime_handle() {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap();
        let dispatcher = ObserverBuilder::new()
            .runtime(runtime.handle().clone())
            .build()
            .unwrap();
        assert_eq!(dispatcher.run_id(), RunId(0));
    }
}
