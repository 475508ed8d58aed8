//! Backend invocation and status translation.
//!
//! Both phases formulate a [`MilpModel`] and hand it to [`run_model`], which
//! drives the engine, times the call and maps the engine's coarse outcome
//! onto the solution [`Status`] taxonomy. When an integer model comes back
//! infeasible, one extra solve of the LP relaxation tells apart a model
//! without feasible points from one that merely lacks an integer solution.

use crate::milp::backend::{BackendStatus, MilpBackend, SolverConfig};
use crate::milp::MilpModel;
use crate::solution::Status;
use std::time::Instant;
use tracing::debug;

/// Outcome of one orchestrated solve.
#[derive(Debug, Clone)]
pub(crate) struct SolveOutcome {
    pub status: Status,
    /// Variable values in [`VarId`](crate::milp::VarId) order; empty unless
    /// the status carries a usable point.
    pub values: Vec<f64>,
    /// Objective value evaluated on `values`.
    pub objective: Option<f64>,
    /// Seconds spent inside the engine, probe included.
    pub solving_time: f64,
}

pub(crate) fn run_model<B: MilpBackend>(
    backend: &B,
    model: &MilpModel,
    config: &SolverConfig,
) -> SolveOutcome {
    let start = Instant::now();
    let result = backend.solve(model, config);

    let outcome = match result {
        Ok(solution) => match solution.status {
            BackendStatus::Optimal => SolveOutcome {
                status: Status::Optimal,
                objective: Some(model.objective().eval(&solution.values)),
                values: solution.values,
                solving_time: 0.0,
            },
            BackendStatus::Infeasible => {
                let status = if model.has_integer_vars() {
                    classify_infeasibility(backend, model, config)
                } else {
                    Status::Infeasible
                };
                SolveOutcome {
                    status,
                    values: Vec::new(),
                    objective: None,
                    solving_time: 0.0,
                }
            }
            BackendStatus::TimeLimit => SolveOutcome {
                status: Status::Aborted,
                values: Vec::new(),
                objective: None,
                solving_time: 0.0,
            },
            BackendStatus::Unbounded => SolveOutcome {
                status: Status::Unknown,
                values: Vec::new(),
                objective: None,
                solving_time: 0.0,
            },
            BackendStatus::Unknown(label) => {
                debug!(model = model.name(), %label, "unclassified engine status");
                SolveOutcome {
                    status: Status::Unknown,
                    values: Vec::new(),
                    objective: None,
                    solving_time: 0.0,
                }
            }
        },
        Err(err) => {
            debug!(model = model.name(), error = %err, "engine failure");
            SolveOutcome {
                status: Status::CbcError,
                values: Vec::new(),
                objective: None,
                solving_time: 0.0,
            }
        }
    };

    SolveOutcome {
        solving_time: start.elapsed().as_secs_f64(),
        ..outcome
    }
}

/// Solve the LP relaxation of an infeasible integer model to decide between
/// `infeasible` and `integer_infeasible`.
fn classify_infeasibility<B: MilpBackend>(
    backend: &B,
    model: &MilpModel,
    config: &SolverConfig,
) -> Status {
    match backend.solve(&model.relaxed(), config) {
        Ok(relaxed) if relaxed.status == BackendStatus::Optimal => Status::IntegerInfeasible,
        Ok(_) => Status::Infeasible,
        Err(_) => Status::Infeasible,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::milp::backend::{BackendError, BackendSolution};

    /// Scripted backend: answers with a fixed sequence of statuses.
    struct ScriptedBackend {
        script: std::cell::RefCell<Vec<Result<BackendSolution, BackendError>>>,
    }

    impl ScriptedBackend {
        fn new(script: Vec<Result<BackendSolution, BackendError>>) -> Self {
            Self {
                script: std::cell::RefCell::new(script),
            }
        }
    }

    impl MilpBackend for ScriptedBackend {
        fn name(&self) -> &'static str {
            "scripted"
        }

        fn solve(
            &self,
            _model: &MilpModel,
            _config: &SolverConfig,
        ) -> Result<BackendSolution, BackendError> {
            self.script.borrow_mut().remove(0)
        }
    }

    fn integer_model() -> MilpModel {
        let mut model = MilpModel::new("t");
        let x = model.add_integer_var(0, None, "x");
        let mut obj = crate::milp::LinExpr::new();
        obj.add_term(x, 1.0);
        model.set_objective(obj, crate::milp::ObjectiveSense::Minimize);
        model
    }

    #[test]
    fn test_optimal_passthrough() {
        let backend = ScriptedBackend::new(vec![Ok(BackendSolution {
            status: BackendStatus::Optimal,
            values: vec![3.0],
            objective: Some(3.0),
        })]);
        let outcome = run_model(&backend, &integer_model(), &SolverConfig::default());
        assert_eq!(outcome.status, Status::Optimal);
        assert_eq!(outcome.objective, Some(3.0));
    }

    #[test]
    fn test_integer_infeasibility_probe() {
        // MILP infeasible, relaxation optimal -> integer_infeasible
        let backend = ScriptedBackend::new(vec![
            Ok(BackendSolution::without_point(BackendStatus::Infeasible)),
            Ok(BackendSolution {
                status: BackendStatus::Optimal,
                values: vec![0.5],
                objective: Some(0.5),
            }),
        ]);
        let outcome = run_model(&backend, &integer_model(), &SolverConfig::default());
        assert_eq!(outcome.status, Status::IntegerInfeasible);
    }

    #[test]
    fn test_plain_infeasibility() {
        // MILP infeasible and relaxation infeasible too
        let backend = ScriptedBackend::new(vec![
            Ok(BackendSolution::without_point(BackendStatus::Infeasible)),
            Ok(BackendSolution::without_point(BackendStatus::Infeasible)),
        ]);
        let outcome = run_model(&backend, &integer_model(), &SolverConfig::default());
        assert_eq!(outcome.status, Status::Infeasible);
    }

    #[test]
    fn test_time_limit_maps_to_aborted() {
        let backend = ScriptedBackend::new(vec![Ok(BackendSolution::without_point(
            BackendStatus::TimeLimit,
        ))]);
        let outcome = run_model(&backend, &integer_model(), &SolverConfig::default());
        assert_eq!(outcome.status, Status::Aborted);
        assert!(outcome.objective.is_none());
    }

    #[test]
    fn test_engine_failure_maps_to_cbc_error() {
        let backend = ScriptedBackend::new(vec![Err(BackendError::Failure("crash".into()))]);
        let outcome = run_model(&backend, &integer_model(), &SolverConfig::default());
        assert_eq!(outcome.status, Status::CbcError);
    }
}
