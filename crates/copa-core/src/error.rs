//! Unified error types for the COPA ecosystem
//!
//! This module provides a common error type [`CopaError`] that can represent
//! errors from any part of the system. Domain-specific error types can be
//! converted to `CopaError` for uniform error handling at API boundaries.
//!
//! # Example
//!
//! ```ignore
//! use copa_core::{CopaError, CopaResult};
//!
//! fn plan(path: &str) -> CopaResult<()> {
//!     let problems = load_problems(path)?;
//!     solve_reservation(&problems[0])?;
//!     Ok(())
//! }
//! ```

use thiserror::Error;

/// Unified error type for all COPA operations.
///
/// Only structurally invalid input (a missing performance entry, mismatched
/// workload lengths, a dangling cross-reference) is reported through this
/// type. Solver outcomes such as infeasibility or a hit time limit are not
/// errors; they travel inside the solution's solving stats.
#[derive(Error, Debug)]
pub enum CopaError {
    /// I/O errors (file access, decompression, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Parsing/deserialization errors
    #[error("Parse error: {0}")]
    Parse(String),

    /// Data validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Solver/backend errors that cannot be expressed as a solution status
    #[error("Solver error: {0}")]
    Solver(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic errors (for wrapping external errors)
    #[error("{0}")]
    Other(String),
}

/// Convenience type alias for Results using CopaError.
pub type CopaResult<T> = Result<T, CopaError>;

impl From<anyhow::Error> for CopaError {
    fn from(err: anyhow::Error) -> Self {
        CopaError::Other(err.to_string())
    }
}

impl From<String> for CopaError {
    fn from(s: String) -> Self {
        CopaError::Other(s)
    }
}

impl From<&str> for CopaError {
    fn from(s: &str) -> Self {
        CopaError::Other(s.to_string())
    }
}
