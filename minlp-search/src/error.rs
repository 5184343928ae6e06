//! Error types for the search layer.
//!
//! Recoverable conditions (engine hiccups, iteration limits, numeric junk
//! in observations) are absorbed by the brancher and surfaced through
//! statuses and counters; `SearchError` is reserved for invariant
//! violations and malformed input.

use thiserror::Error;

use minlp_core::CoreError;

/// Errors raised by the search layer.
#[derive(Error, Debug)]
pub enum SearchError {
    /// A handler returned an empty branch set for the winning candidate.
    #[error("Handler '{handler}' returned no branches for candidate '{cand}'")]
    EmptyBranches {
        /// Handler that was asked to branch.
        handler: String,
        /// Candidate it was asked to branch on.
        cand: String,
    },

    /// The pseudo-cost snapshot does not cover the relaxation.
    #[error("Pseudo-cost snapshot has {actual} entries, relaxation has {expected} variables")]
    SnapshotDimension {
        /// Variables in the relaxation.
        expected: usize,
        /// Entries in the snapshot.
        actual: usize,
    },

    /// Error from the core layer.
    #[error(transparent)]
    Core(#[from] CoreError),
}

/// Result type for search operations.
pub type SearchResult<T> = Result<T, SearchError>;
