//! HiGHS-backed MILP engine.
//!
//! Maps the abstract model onto a [`highs::RowProblem`] column by column and
//! row by row. Gap, time and thread knobs are forwarded as HiGHS options.

use super::backend::{BackendError, BackendSolution, BackendStatus, MilpBackend, SolverConfig};
use super::{ConstraintOp, MilpModel, ObjectiveSense};
use highs::{HighsModelStatus, RowProblem, Sense};
use std::collections::HashMap;
use tracing::debug;

/// The default engine: bundled HiGHS, branch-and-cut for integer models.
#[derive(Debug, Clone, Copy, Default)]
pub struct HighsBackend;

impl HighsBackend {
    pub fn new() -> Self {
        Self
    }
}

impl MilpBackend for HighsBackend {
    fn name(&self) -> &'static str {
        "highs"
    }

    fn solve(
        &self,
        model: &MilpModel,
        config: &SolverConfig,
    ) -> Result<BackendSolution, BackendError> {
        let mut problem = RowProblem::default();

        // Objective coefficient per column, merging repeated terms.
        let mut factors = vec![0.0; model.num_vars()];
        for (var, coeff) in &model.objective().terms {
            factors[var.index()] += coeff;
        }

        let mut cols = Vec::with_capacity(model.num_vars());
        for (def, &factor) in model.vars().iter().zip(&factors) {
            let col = match (def.is_integer, def.ub) {
                (true, Some(ub)) => problem.add_integer_column(factor, def.lb..=ub),
                (true, None) => problem.add_integer_column(factor, def.lb..),
                (false, Some(ub)) => problem.add_column(factor, def.lb..=ub),
                (false, None) => problem.add_column(factor, def.lb..),
            };
            cols.push(col);
        }

        for constraint in model.constraints() {
            // Merge duplicate terms and fold the expression constant into
            // the right-hand side.
            let mut row: HashMap<usize, f64> = HashMap::new();
            for (var, coeff) in &constraint.expr.terms {
                *row.entry(var.index()).or_insert(0.0) += coeff;
            }
            let row_factors: Vec<(highs::Col, f64)> =
                row.into_iter().map(|(i, c)| (cols[i], c)).collect();
            let rhs = constraint.rhs - constraint.expr.constant;
            match constraint.op {
                ConstraintOp::Le => {
                    problem.add_row(..=rhs, row_factors);
                }
                ConstraintOp::Ge => {
                    problem.add_row(rhs.., row_factors);
                }
                ConstraintOp::Eq => {
                    problem.add_row(rhs..=rhs, row_factors);
                }
            }
        }

        let sense = match model.sense() {
            ObjectiveSense::Minimize => Sense::Minimise,
            ObjectiveSense::Maximize => Sense::Maximise,
        };

        let mut highs_model = problem.optimise(sense);
        highs_model.make_quiet();
        highs_model.set_option("threads", config.threads as i32);
        if config.threads > 1 {
            highs_model.set_option("parallel", "on");
        }
        if let Some(limit) = config.max_seconds {
            highs_model.set_option("time_limit", limit);
        }
        if let Some(gap) = config.frac_gap {
            highs_model.set_option("mip_rel_gap", gap);
        }
        if let Some(seed) = config.seed {
            highs_model.set_option("random_seed", seed);
        }

        debug!(
            model = model.name(),
            vars = model.num_vars(),
            rows = model.constraints().len(),
            "solving with HiGHS"
        );

        let solved = highs_model.solve();
        let status = solved.status();
        match status {
            HighsModelStatus::Optimal => {
                let solution = solved.get_solution();
                let values = solution.columns().to_vec();
                let objective = Some(model.objective().eval(&values));
                Ok(BackendSolution {
                    status: BackendStatus::Optimal,
                    values,
                    objective,
                })
            }
            HighsModelStatus::Infeasible => {
                Ok(BackendSolution::without_point(BackendStatus::Infeasible))
            }
            HighsModelStatus::Unbounded => {
                Ok(BackendSolution::without_point(BackendStatus::Unbounded))
            }
            HighsModelStatus::UnboundedOrInfeasible => {
                // The engine could not separate the two; the orchestrator's
                // relaxation probe settles it.
                Ok(BackendSolution::without_point(BackendStatus::Infeasible))
            }
            other => {
                let label = format!("{other:?}");
                if label.contains("Time") {
                    Ok(BackendSolution::without_point(BackendStatus::TimeLimit))
                } else {
                    Ok(BackendSolution::without_point(BackendStatus::Unknown(label)))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::milp::LinExpr;

    #[test]
    fn test_small_integer_minimize() {
        // minimize 3x + 2y  s.t.  x + y >= 4, y <= 3, x, y in Z+
        let mut model = MilpModel::new("small");
        let x = model.add_integer_var(0, None, "x");
        let y = model.add_integer_var(0, Some(3), "y");

        let mut demand = LinExpr::new();
        demand.add_term(x, 1.0);
        demand.add_term(y, 1.0);
        model.add_constraint(demand, ConstraintOp::Ge, 4.0, "demand");

        let mut obj = LinExpr::new();
        obj.add_term(x, 3.0);
        obj.add_term(y, 2.0);
        model.set_objective(obj, ObjectiveSense::Minimize);

        let backend = HighsBackend::new();
        let result = backend.solve(&model, &SolverConfig::default()).unwrap();
        assert_eq!(result.status, BackendStatus::Optimal);
        assert!((result.objective.unwrap() - 9.0).abs() < 1e-6);
        assert!((result.values[x.index()] - 1.0).abs() < 1e-6);
        assert!((result.values[y.index()] - 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_integrality_rounds_up() {
        // minimize x  s.t.  2x >= 3; the LP optimum is 1.5, the IP optimum 2
        let mut model = MilpModel::new("round");
        let x = model.add_integer_var(0, None, "x");
        let mut expr = LinExpr::new();
        expr.add_term(x, 2.0);
        model.add_constraint(expr, ConstraintOp::Ge, 3.0, "c");
        let mut obj = LinExpr::new();
        obj.add_term(x, 1.0);
        model.set_objective(obj, ObjectiveSense::Minimize);

        let backend = HighsBackend::new();
        let result = backend.solve(&model, &SolverConfig::default()).unwrap();
        assert_eq!(result.status, BackendStatus::Optimal);
        assert!((result.values[x.index()] - 2.0).abs() < 1e-6);

        let relaxed = backend.solve(&model.relaxed(), &SolverConfig::default()).unwrap();
        assert!((relaxed.values[x.index()] - 1.5).abs() < 1e-6);
    }

    #[test]
    fn test_infeasible_model() {
        // x <= 1 and x >= 2 cannot both hold
        let mut model = MilpModel::new("bad");
        let x = model.add_integer_var(0, Some(1), "x");
        let mut expr = LinExpr::new();
        expr.add_term(x, 1.0);
        model.add_constraint(expr, ConstraintOp::Ge, 2.0, "too-much");
        let mut obj = LinExpr::new();
        obj.add_term(x, 1.0);
        model.set_objective(obj, ObjectiveSense::Minimize);

        let backend = HighsBackend::new();
        let result = backend.solve(&model, &SolverConfig::default()).unwrap();
        assert_eq!(result.status, BackendStatus::Infeasible);
    }
}
