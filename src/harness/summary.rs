//! Short progress summary built from the failing and warning test lists.

use crate::config::SummaryConfig;

const ELLIPSIS: &str = "..";

/// Marker shown while the run is still in progress.
pub const MARKER_RUNNING: &str = "testing";
/// Marker shown once the run has finished.
pub const MARKER_DONE: &str = "test";

/// Accumulates display entries and renders the capped summary text.
#[derive(Debug, Clone)]
pub struct SummaryBuilder {
    text_limit: usize,
    test_name_limit: usize,
    fail_list: Vec<String>,
    warn_list: Vec<String>,
}

impl SummaryBuilder {
    pub fn new(config: &SummaryConfig) -> Self {
        Self {
            text_limit: config.text_limit,
            test_name_limit: config.test_name_limit,
            fail_list: Vec::new(),
            warn_list: Vec::new(),
        }
    }

    /// Record a failing test by its full printed name.
    pub fn add_failure(&mut self, full_name: &str) {
        self.fail_list
            .push(shorten_test_name(full_name, self.test_name_limit));
    }

    /// Record the test names of one warning batch.
    pub fn add_warnings<S: AsRef<str>>(&mut self, names: &[S]) {
        for name in names {
            self.warn_list
                .push(shorten_test_name(name.as_ref(), self.test_name_limit));
        }
    }

    pub fn fail_list(&self) -> &[String] {
        &self.fail_list
    }

    pub fn warn_list(&self) -> &[String] {
        &self.warn_list
    }

    /// Summary tokens: marker, then capped fail entries, then capped warn entries.
    pub fn tokens(&self, done: bool) -> Vec<String> {
        let marker = if done { MARKER_DONE } else { MARKER_RUNNING };
        let mut tokens = vec![marker.to_string()];
        self.push_section(&mut tokens, "fail:", &self.fail_list);
        self.push_section(&mut tokens, "warn:", &self.warn_list);
        tokens
    }

    /// Render the summary as a single line.
    pub fn render(&self, done: bool) -> String {
        self.tokens(done).join(" ")
    }

    fn push_section(&self, tokens: &mut Vec<String>, tag: &str, entries: &[String]) {
        if entries.is_empty() {
            return;
        }
        tokens.push(tag.to_string());
        tokens.extend(
            collapse_adjacent(entries)
                .into_iter()
                .take(self.text_limit)
                .map(str::to_string),
        );
    }
}

/// Collapse runs of identical neighbours; non-adjacent repeats are kept.
pub fn collapse_adjacent(entries: &[String]) -> Vec<&str> {
    let mut out: Vec<&str> = Vec::with_capacity(entries.len());
    for entry in entries {
        if out.last() != Some(&entry.as_str()) {
            out.push(entry);
        }
    }
    out
}

/// Drop a leading `suite.` component and cut the rest to `limit` characters.
///
/// Overlong names keep `limit - 2` characters followed by `..`. Limits too
/// small to fit the ellipsis cut the name to `limit` characters instead.
pub fn shorten_test_name(name: &str, limit: usize) -> String {
    let short = name.split_once('.').map_or(name, |(_, rest)| rest);
    if short.chars().count() <= limit {
        return short.to_string();
    }
    if limit <= ELLIPSIS.len() {
        return short.chars().take(limit).collect();
    }
    let keep = limit.saturating_sub(ELLIPSIS.len());
    let mut out: String = short.chars().take(keep).collect();
    out.push_str(ELLIPSIS);
    out
}
