//! Line classification and summary rendering for mysql-test-run output.
//!
//! The harness is the stateless half of the observer: the [`LineClassifier`]
//! decides what each console line means, and the [`SummaryBuilder`] turns the
//! failing and warning test lists into a short status string. Everything that
//! remembers state between lines lives in [`crate::observer`].

mod classifier;
mod summary;

pub use classifier::{
    Boundary, Category, LineClassifier, Outcome, ResultLine, SEPARATOR_WIDTH, strip_line_ending,
};
pub use summary::{
    MARKER_DONE, MARKER_RUNNING, SummaryBuilder, collapse_adjacent, shorten_test_name,
};
