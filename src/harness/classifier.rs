//! Regex-based classifier for mysql-test-run console lines.

use regex::Regex;
use serde::Serialize;

use crate::core::error::{Error, Result};

/// `<name> ['<variant>'] [ pass|fail ] <info>`
const RESULT_PATTERN: &str = r"^([-._0-9a-zA-Z]+)( '[a-z]+')?\s+\[ (fail|pass) \]\s*(.*)$";
/// Same shape as a result line, any status word.
const STATUS_PATTERN: &str = r"^[-._0-9a-zA-Z]+(?: '[a-z]+')?\s+\[ ([-a-z]+) \]";
const WARNINGS_PATTERN: &str =
    r"^\*\*\*Warnings generated in error logs during shutdown after running tests: (.*)";
const RESTARTS_PATTERN: &str = r"^The servers were restarted [0-9]+ times$";
const INCOMPLETE_PATTERN: &str = r"^Only\s+[0-9]+\s+of\s+[0-9]+\s+completed\.$";

const SUITE_TIMEOUT_LINE: &str = "Test suite timeout! Terminating...";
const NOT_ALL_COMPLETED_PREFIX: &str = "mysql-test-run: *** ERROR: Not all tests completed";

/// Minimum run of dashes that separates sections in the harness output.
pub const SEPARATOR_WIDTH: usize = 60;

/// Outcome of a counted result line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Pass,
    Fail,
}

impl Outcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Outcome::Pass => "pass",
            Outcome::Fail => "fail",
        }
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fields extracted from a `pass`/`fail` result line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResultLine<'a> {
    /// The name token as printed, e.g. `rpl.rpl_ssl`.
    pub full_name: &'a str,
    /// Part of the name before the first `.`, empty if there is none.
    pub suite: &'a str,
    /// Part of the name after the first `.`.
    pub test_name: &'a str,
    /// Variant with quotes stripped, empty if absent.
    pub variant: &'a str,
    pub outcome: Outcome,
    /// Trailing annotation after the status, e.g. a duration or timeout reason.
    pub info: &'a str,
}

/// Lines that end any open failure transcript without carrying data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Boundary<'a> {
    /// A result line with a status other than `pass`/`fail`.
    OtherStatus(&'a str),
    /// `The servers were restarted N times`
    ServerRestarts,
    /// `Only M of N completed.`
    IncompleteRun,
    /// `Test suite timeout! Terminating...`
    SuiteTimeout,
    /// `mysql-test-run: *** ERROR: Not all tests completed`
    NotAllCompleted,
    /// A dashed separator seen while a failure is open.
    Separator,
}

/// Classification of a single line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Category<'a> {
    Result(ResultLine<'a>),
    /// Test names from a shutdown-warnings line, in order.
    Warnings(Vec<&'a str>),
    Boundary(Boundary<'a>),
    Text,
}

/// Stateless line classifier for the mtr console protocol.
pub struct LineClassifier {
    result_regex: Regex,
    status_regex: Regex,
    warnings_regex: Regex,
    restarts_regex: Regex,
    incomplete_regex: Regex,
}

impl LineClassifier {
    /// Compile the built-in pattern set.
    pub fn new() -> Result<Self> {
        Ok(Self {
            result_regex: compile(RESULT_PATTERN)?,
            status_regex: compile(STATUS_PATTERN)?,
            warnings_regex: compile(WARNINGS_PATTERN)?,
            restarts_regex: compile(RESTARTS_PATTERN)?,
            incomplete_regex: compile(INCOMPLETE_PATTERN)?,
        })
    }

    /// Classify one line whose line terminator has already been stripped.
    ///
    /// `failure_open` decides whether a dashed separator counts as a boundary;
    /// outside a failure it also appears in table headers and is plain text.
    pub fn classify<'a>(&self, line: &'a str, failure_open: bool) -> Category<'a> {
        if let Some(caps) = self.result_regex.captures(line) {
            let full_name = caps.get(1).map_or("", |m| m.as_str());
            let (suite, test_name) = split_suite(full_name);
            let variant = caps.get(2).map_or("", |m| strip_variant_quotes(m.as_str()));
            let outcome = match caps.get(3).map(|m| m.as_str()) {
                Some("fail") => Outcome::Fail,
                _ => Outcome::Pass,
            };
            let info = caps.get(4).map_or("", |m| m.as_str());
            return Category::Result(ResultLine {
                full_name,
                suite,
                test_name,
                variant,
                outcome,
                info,
            });
        }

        if let Some(caps) = self.warnings_regex.captures(line) {
            let names = caps
                .get(1)
                .map_or("", |m| m.as_str())
                .split(' ')
                .filter(|name| !name.is_empty())
                .collect();
            return Category::Warnings(names);
        }

        if let Some(boundary) = self.boundary(line, failure_open) {
            return Category::Boundary(boundary);
        }

        Category::Text
    }

    fn boundary<'a>(&self, line: &'a str, failure_open: bool) -> Option<Boundary<'a>> {
        if let Some(caps) = self.status_regex.captures(line) {
            return Some(Boundary::OtherStatus(caps.get(1).map_or("", |m| m.as_str())));
        }
        if self.restarts_regex.is_match(line) {
            return Some(Boundary::ServerRestarts);
        }
        if self.incomplete_regex.is_match(line) {
            return Some(Boundary::IncompleteRun);
        }
        if line == SUITE_TIMEOUT_LINE {
            return Some(Boundary::SuiteTimeout);
        }
        if line.starts_with(NOT_ALL_COMPLETED_PREFIX) {
            return Some(Boundary::NotAllCompleted);
        }
        if failure_open && is_separator(line) {
            return Some(Boundary::Separator);
        }
        None
    }
}

/// Strip trailing carriage-return and newline characters.
pub fn strip_line_ending(raw: &str) -> &str {
    raw.trim_end_matches(['\r', '\n'])
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern)
        .map_err(|e| Error::classifier(format!("invalid pattern '{}': {}", pattern, e)))
}

fn split_suite(full_name: &str) -> (&str, &str) {
    full_name.split_once('.').unwrap_or(("", full_name))
}

/// ` 'row'` -> `row`
fn strip_variant_quotes(raw: &str) -> &str {
    raw.trim_start().trim_matches('\'')
}

fn is_separator(line: &str) -> bool {
    line.len() >= SEPARATOR_WIDTH && line.bytes().take(SEPARATOR_WIDTH).all(|b| b == b'-')
}
