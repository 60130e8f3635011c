//! Configuration types and loading from a standalone `mtr-observer.toml`.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::core::error::{Error, Result};

pub mod env;
mod loader;
pub use loader::ConfigLoader;

/// Smallest test-name budget that still leaves room for one character plus the ellipsis.
pub const MIN_TEST_NAME_LIMIT: usize = 3;

/// Complete configuration for the observer.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Config {
    /// Summary text configuration.
    #[serde(default)]
    pub summary: SummaryConfig,

    /// Inbound line stream configuration.
    #[serde(default)]
    pub input: InputConfig,

    /// Run identification.
    #[serde(default)]
    pub run: RunConfig,
}

/// Summary text configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SummaryConfig {
    /// Max fail/warn entries shown in the summary, per list.
    #[serde(rename = "text-limit")]
    pub text_limit: usize,

    /// Max display characters per test name.
    #[serde(rename = "test-name-limit")]
    pub test_name_limit: usize,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            text_limit: 5,
            test_name_limit: 16,
        }
    }
}

/// Inbound line stream configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct InputConfig {
    /// Lines longer than this many bytes are dropped by the chunk splitter.
    #[serde(rename = "max-line-length")]
    pub max_line_length: usize,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            max_line_length: 16384,
        }
    }
}

/// Run identification.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct RunConfig {
    /// Run id used when the sink does not assign one at registration.
    pub id: u64,
}

impl Config {
    /// Parse a configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("failed to read config file {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Reject values the summary builder and line splitter cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.summary.test_name_limit < MIN_TEST_NAME_LIMIT {
            return Err(Error::invalid_config(
                "summary.test-name-limit",
                self.summary.test_name_limit,
            ));
        }
        if self.input.max_line_length == 0 {
            return Err(Error::invalid_config(
                "input.max-line-length",
                self.input.max_line_length,
            ));
        }
        Ok(())
    }
}
