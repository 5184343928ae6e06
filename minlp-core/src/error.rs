//! Error types for the core layer.

use thiserror::Error;

/// Errors raised while building or mutating core model objects.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Problem data failed validation.
    #[error("Invalid problem: {0}")]
    InvalidProblem(String),

    /// Variable index outside the problem dimension.
    #[error("Variable index {index} out of range (problem has {num_vars} variables)")]
    BadVarIndex {
        /// Offending index.
        index: usize,
        /// Number of variables in the problem.
        num_vars: usize,
    },

    /// A bound update would create an empty or non-numeric domain.
    #[error("Invalid bounds [{lb}, {ub}] for variable {index}")]
    BadBounds {
        /// Variable index.
        index: usize,
        /// Requested lower bound.
        lb: f64,
        /// Requested upper bound.
        ub: f64,
    },
}

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;
