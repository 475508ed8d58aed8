//! The backend contract consumed by the solve orchestrator.
//!
//! A backend takes an abstract [`MilpModel`](super::MilpModel), hands it to a
//! concrete engine and reports a coarse status plus variable values. Engines
//! differ in how they expose gap/time/thread knobs, so the knobs are an
//! explicit configuration record rather than free-form parameters.

use super::MilpModel;
use thiserror::Error;

/// Knobs forwarded to every backend solve call.
#[derive(Debug, Clone, PartialEq)]
pub struct SolverConfig {
    /// Relative MIP optimality gap at which the engine may stop.
    pub frac_gap: Option<f64>,
    /// Wall-clock budget for one solve, in seconds.
    pub max_seconds: Option<f64>,
    /// Worker threads inside the engine. Parallelism never crosses the
    /// core/backend boundary, it lives entirely inside the engine.
    pub threads: u32,
    /// Engine random seed, for reproducible branching.
    pub seed: Option<i32>,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            frac_gap: None,
            max_seconds: None,
            threads: 1,
            seed: None,
        }
    }
}

/// Outcome classification as reported by the engine, before the orchestrator
/// maps it onto the solution status taxonomy.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendStatus {
    /// Proven optimal (within the configured gap).
    Optimal,
    /// No feasible point exists for the model as given to the engine.
    Infeasible,
    /// The objective is unbounded.
    Unbounded,
    /// The time budget ran out before the engine finished.
    TimeLimit,
    /// Anything the engine reported that fits none of the above.
    Unknown(String),
}

/// Result of one backend invocation.
#[derive(Debug, Clone)]
pub struct BackendSolution {
    pub status: BackendStatus,
    /// One value per model variable, in [`VarId`](super::VarId) order.
    /// Empty unless the status carries a usable point.
    pub values: Vec<f64>,
    /// Engine-reported objective value, if any.
    pub objective: Option<f64>,
}

impl BackendSolution {
    /// A result with no usable point.
    pub fn without_point(status: BackendStatus) -> Self {
        Self {
            status,
            values: Vec::new(),
            objective: None,
        }
    }
}

/// Hard engine failures (crashes, missing libraries, protocol errors).
///
/// Infeasibility and time limits are not errors; they come back as a
/// [`BackendStatus`].
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("solver backend failure: {0}")]
    Failure(String),
}

/// A pluggable MILP engine.
pub trait MilpBackend {
    /// Short engine name, recorded in solving stats.
    fn name(&self) -> &'static str;

    /// Solve `model` under `config`.
    fn solve(&self, model: &MilpModel, config: &SolverConfig)
        -> Result<BackendSolution, BackendError>;
}
