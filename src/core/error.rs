use std::path::PathBuf;

/// Result type alias for mtr-observer operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for mtr-observer.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Configuration-related errors.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid configuration value.
    #[error("Invalid configuration value for {field}: {value}")]
    InvalidConfig { field: String, value: String },

    /// Line classifier construction errors.
    #[error("Classifier error: {0}")]
    Classifier(String),

    /// A failure record was opened while another one was still open.
    #[error("Failure accumulator busy: '{open}' is still open, cannot open '{requested}'")]
    AccumulatorBusy { open: String, requested: String },

    /// Result sink errors that abort a step (run registration).
    #[error("Sink error: {0}")]
    Sink(#[from] SinkError),

    /// File not found.
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML deserialization error.
    #[error("TOML parsing error: {0}")]
    TomlDe(#[from] toml::de::Error),

    /// JSON error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Create a classifier error.
    pub fn classifier(msg: impl Into<String>) -> Self {
        Error::Classifier(msg.into())
    }

    /// Create an invalid configuration value error.
    pub fn invalid_config(field: impl Into<String>, value: impl ToString) -> Self {
        Error::InvalidConfig {
            field: field.into(),
            value: value.to_string(),
        }
    }
}

/// Errors reported by a [`ResultSink`](crate::sink::ResultSink).
///
/// The dispatcher logs these and keeps going; they never reach line processing.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    /// The backing store could not be reached or refused the write.
    #[error("sink unavailable: {0}")]
    Unavailable(String),

    /// IO error while writing a record.
    #[error("sink IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error while writing a record.
    #[error("sink JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SinkError {
    /// Create an unavailable-store error.
    pub fn unavailable(msg: impl Into<String>) -> Self {
        SinkError::Unavailable(msg.into())
    }
}
