//! Reservation phase: one MILP over the whole planning horizon.
//!
//! Decides how many reserved VMs of each class to keep running for the whole
//! horizon, together with the cheapest per-load-level on-demand complement.
//! The horizon enters the model through its load histogram, so the model
//! size grows with the number of distinct workload tuples, not with the
//! number of timeslots.

use crate::formulation::{class_views, limiting_set_members};
use crate::histogram::{gcd_rescale, LoadHistogram};
use crate::milp::backend::{MilpBackend, SolverConfig};
use crate::milp::{ConstraintOp, LinExpr, MilpModel, ObjectiveSense, VarId};
use crate::orchestrator::run_model;
use crate::solution::{
    AllocationInfo, AlgorithmInfo, ReservedAllocation, SolutionI, SolvingStats, Status,
};
use copa_core::{CopaResult, Problem};
use std::time::Instant;
use tracing::info;

/// Algorithm name recorded in solving stats.
pub const ALGORITHM_NAME: &str = "copa-milp";

/// Reservation-phase solver for one problem.
pub struct PhaseI<'a, B: MilpBackend> {
    problem: &'a Problem,
    backend: &'a B,
    config: SolverConfig,
    gcd: bool,
}

impl<'a, B: MilpBackend> PhaseI<'a, B> {
    /// Create a solver for `problem`, validating its structure first.
    pub fn new(problem: &'a Problem, backend: &'a B) -> CopaResult<Self> {
        problem.validate()?;
        Ok(Self {
            problem,
            backend,
            config: SolverConfig::default(),
            gcd: false,
        })
    }

    pub fn with_config(mut self, config: SolverConfig) -> Self {
        self.config = config;
        self
    }

    /// Enable dividing workloads and performances by their greatest common
    /// divisor before formulating.
    pub fn with_gcd(mut self, gcd: bool) -> Self {
        self.gcd = gcd;
        self
    }

    /// Solve the reservation problem.
    ///
    /// Solver outcomes (infeasible, aborted, engine failure) come back as a
    /// solution whose stats carry the status; only structural problems are
    /// errors, and those were caught in [`PhaseI::new`].
    pub fn solve(&self) -> CopaResult<SolutionI> {
        let started = Instant::now();

        let (scaled, multiplier) = if self.gcd {
            gcd_rescale(self.problem)
        } else {
            (self.problem.clone(), 1)
        };
        let histogram = LoadHistogram::from_problem(&scaled);

        if histogram.is_all_zero() {
            return Ok(self.trivial_solution(&histogram, multiplier, started));
        }

        let formulation = build_reservation_model(&scaled, &histogram);
        let creation_time = started.elapsed().as_secs_f64();

        let outcome = run_model(self.backend, &formulation.model, &self.config);
        info!(
            problem = %self.problem.id,
            status = %outcome.status,
            cost = ?outcome.objective,
            "reservation phase finished"
        );

        let stats = SolvingStats {
            creation_time,
            solving_time: outcome.solving_time,
            optimal_cost: outcome.objective,
            algorithm: self.algorithm_info(outcome.status, multiplier),
        };

        let (reserved_allocation, allocation) = if outcome.status == Status::Optimal {
            let reserved = extract_reserved(&scaled, &formulation, &outcome.values);
            let allocation = extract_allocation(
                &scaled,
                &histogram,
                &formulation,
                &outcome.values,
                multiplier,
            );
            (Some(reserved), Some(allocation))
        } else {
            (None, None)
        };

        Ok(SolutionI {
            id: format!("{}-phase-i", self.problem.id),
            problem: self.problem.id.clone(),
            solving_stats: stats,
            reserved_allocation,
            allocation,
        })
    }

    /// No workload anywhere: the optimum is renting nothing, no engine call.
    fn trivial_solution(
        &self,
        histogram: &LoadHistogram,
        multiplier: u64,
        started: Instant,
    ) -> SolutionI {
        let reserved = ReservedAllocation {
            instance_classes: self
                .problem
                .instance_classes
                .iter()
                .filter(|c| c.is_reserved)
                .map(|c| c.id.clone())
                .collect(),
            vms_number: self
                .problem
                .instance_classes
                .iter()
                .filter(|c| c.is_reserved)
                .map(|_| 0)
                .collect(),
        };

        let num_classes = self.problem.instance_classes.len();
        let num_apps = self.problem.workloads.len();
        let allocation = AllocationInfo {
            units: "vms".into(),
            apps: self.problem.app_ids().iter().map(|s| s.to_string()).collect(),
            instance_classes: self
                .problem
                .instance_classes
                .iter()
                .map(|c| c.id.clone())
                .collect(),
            load_levels: Some(histogram.levels.clone()),
            repeats: Some(histogram.repeats.clone()),
            values: vec![vec![vec![0; num_apps]; num_classes]; histogram.num_levels()],
        };

        SolutionI {
            id: format!("{}-phase-i", self.problem.id),
            problem: self.problem.id.clone(),
            solving_stats: SolvingStats {
                creation_time: started.elapsed().as_secs_f64(),
                solving_time: 0.0,
                optimal_cost: Some(0.0),
                algorithm: self.algorithm_info(Status::Trivial, multiplier),
            },
            reserved_allocation: Some(reserved),
            allocation: Some(allocation),
        }
    }

    fn algorithm_info(&self, status: Status, multiplier: u64) -> AlgorithmInfo {
        AlgorithmInfo {
            name: ALGORITHM_NAME.into(),
            status,
            frac_gap: self.config.frac_gap,
            max_seconds: self.config.max_seconds,
            threads: self.config.threads,
            gcd_multiplier: multiplier,
        }
    }
}

/// The reservation MILP plus the variable handles needed to read it back.
struct ReservationModel {
    model: MilpModel,
    /// `Y[k]`: horizon-wide reserved VM count, per class index (reserved
    /// classes only).
    y_vars: Vec<Option<VarId>>,
    /// `X[l][k][a]`: VMs of class `k` serving app `a` during level `l`.
    x_vars: Vec<Vec<Vec<VarId>>>,
}

fn build_reservation_model(problem: &Problem, histogram: &LoadHistogram) -> ReservationModel {
    let views = class_views(problem);
    let sets = limiting_set_members(problem);
    let num_apps = problem.workloads.len();
    let horizon = histogram.total_timeslots() as f64;

    let mut model = MilpModel::new(format!("{}-reservation", problem.id));

    // === Variables ===
    // Y[k] for reserved classes; bounded by the per-class VM cap when set.
    let mut y_vars: Vec<Option<VarId>> = Vec::with_capacity(views.len());
    for view in &views {
        if view.class.is_reserved {
            let ub = (view.class.max_vms > 0).then_some(view.class.max_vms);
            y_vars.push(Some(model.add_integer_var(
                0,
                ub,
                format!("Y_{}", view.class.id),
            )));
        } else {
            y_vars.push(None);
        }
    }

    // X[l][k][a] for every level, class and app.
    let mut x_vars: Vec<Vec<Vec<VarId>>> = Vec::with_capacity(histogram.num_levels());
    for l in 0..histogram.num_levels() {
        let mut x_level = Vec::with_capacity(views.len());
        for view in &views {
            let mut x_class = Vec::with_capacity(num_apps);
            for a in 0..num_apps {
                x_class.push(model.add_integer_var(
                    0,
                    None,
                    format!("X_l{}_{}_{}", l, view.class.id, problem.workloads[a].app.id),
                ));
            }
            x_level.push(x_class);
        }
        x_vars.push(x_level);
    }

    // === Objective ===
    // Reserved VMs are paid for every slot of the horizon; on-demand VMs
    // per slot of use, weighted by how often their level occurs.
    let mut objective = LinExpr::new();
    for (view, y) in views.iter().zip(&y_vars) {
        if let Some(y) = y {
            objective.add_term(*y, view.price_per_slot * horizon);
        }
    }
    for (l, repeats) in histogram.repeats.iter().enumerate() {
        for (k, view) in views.iter().enumerate() {
            if view.class.is_reserved {
                continue;
            }
            for a in 0..num_apps {
                objective.add_term(x_vars[l][k][a], *repeats as f64 * view.price_per_slot);
            }
        }
    }
    model.set_objective(objective, ObjectiveSense::Minimize);

    // === Performance constraints ===
    // Each app's workload must be served at every level.
    for (l, level) in histogram.levels.iter().enumerate() {
        for (a, workload) in level.iter().enumerate() {
            let mut served = LinExpr::new();
            for (k, view) in views.iter().enumerate() {
                served.add_term(x_vars[l][k][a], view.perf_per_slot[a]);
            }
            model.add_constraint(
                served,
                ConstraintOp::Ge,
                *workload as f64,
                format!("perf_l{}_{}", l, problem.workloads[a].app.id),
            );
        }
    }

    // === Reserved coupling ===
    // The per-app split of a reserved class may change level to level, but
    // never uses more VMs than were reserved.
    for (l, x_level) in x_vars.iter().enumerate() {
        for (k, view) in views.iter().enumerate() {
            let Some(y) = y_vars[k] else { continue };
            let mut used = LinExpr::new();
            for a in 0..num_apps {
                used.add_term(x_level[k][a], 1.0);
            }
            used.add_term(y, -1.0);
            model.add_constraint(
                used,
                ConstraintOp::Le,
                0.0,
                format!("reserved_l{}_{}", l, view.class.id),
            );
        }
    }

    // === Per-class caps (on-demand) ===
    for (l, x_level) in x_vars.iter().enumerate() {
        for (k, view) in views.iter().enumerate() {
            if view.class.is_reserved || view.class.max_vms == 0 {
                continue;
            }
            let mut used = LinExpr::new();
            for a in 0..num_apps {
                used.add_term(x_level[k][a], 1.0);
            }
            model.add_constraint(
                used,
                ConstraintOp::Le,
                view.class.max_vms as f64,
                format!("class_cap_l{}_{}", l, view.class.id),
            );
        }
    }

    // === Limiting-set caps ===
    // On-demand members count through X at the level; reserved members hold
    // their Y VMs at every level regardless of the split.
    for members in &sets {
        for (l, x_level) in x_vars.iter().enumerate() {
            if members.set.max_vms > 0 {
                let mut used = LinExpr::new();
                for &k in &members.ondemand {
                    for a in 0..num_apps {
                        used.add_term(x_level[k][a], 1.0);
                    }
                }
                for &k in &members.reserved {
                    if let Some(y) = y_vars[k] {
                        used.add_term(y, 1.0);
                    }
                }
                model.add_constraint(
                    used,
                    ConstraintOp::Le,
                    members.set.max_vms as f64,
                    format!("set_vms_l{}_{}", l, members.set.id),
                );
            }
            if members.set.max_cores > 0 {
                let mut used = LinExpr::new();
                for &k in &members.ondemand {
                    for a in 0..num_apps {
                        used.add_term(x_level[k][a], views[k].class.cores);
                    }
                }
                for &k in &members.reserved {
                    if let Some(y) = y_vars[k] {
                        used.add_term(y, views[k].class.cores);
                    }
                }
                model.add_constraint(
                    used,
                    ConstraintOp::Le,
                    members.set.max_cores as f64,
                    format!("set_cores_l{}_{}", l, members.set.id),
                );
            }
        }
    }

    ReservationModel {
        model,
        y_vars,
        x_vars,
    }
}

fn extract_reserved(
    problem: &Problem,
    formulation: &ReservationModel,
    values: &[f64],
) -> ReservedAllocation {
    let mut instance_classes = Vec::new();
    let mut vms_number = Vec::new();
    for (class, y) in problem.instance_classes.iter().zip(&formulation.y_vars) {
        if let Some(y) = y {
            instance_classes.push(class.id.clone());
            vms_number.push(values[y.index()].round() as u64);
        }
    }
    ReservedAllocation {
        instance_classes,
        vms_number,
    }
}

fn extract_allocation(
    problem: &Problem,
    histogram: &LoadHistogram,
    formulation: &ReservationModel,
    values: &[f64],
    multiplier: u64,
) -> AllocationInfo {
    // Level labels are reported in the original workload units, undoing any
    // rescaling.
    let load_levels = histogram
        .levels
        .iter()
        .map(|level| level.iter().map(|w| w * multiplier).collect())
        .collect();

    let tensor = formulation
        .x_vars
        .iter()
        .map(|level| {
            level
                .iter()
                .map(|class| {
                    class
                        .iter()
                        .map(|x| values[x.index()].round() as u64)
                        .collect()
                })
                .collect()
        })
        .collect();

    AllocationInfo {
        units: "vms".into(),
        apps: problem.app_ids().iter().map(|s| s.to_string()).collect(),
        instance_classes: problem
            .instance_classes
            .iter()
            .map(|c| c.id.clone())
            .collect(),
        load_levels: Some(load_levels),
        repeats: Some(histogram.repeats.clone()),
        values: tensor,
    }
}

#[cfg(all(test, feature = "solver-highs"))]
mod tests {
    use super::*;
    use crate::milp::highs::HighsBackend;
    use crate::test_utils::{core_limited_problem, example1_problem, minimal_problem};
    use copa_core::LimitingSet;

    fn assert_solution_feasible(problem: &Problem, solution: &SolutionI) {
        let reserved = solution.reserved_allocation.as_ref().unwrap();
        let allocation = solution.allocation.as_ref().unwrap();
        let levels = allocation.load_levels.as_ref().unwrap();

        for (l, level) in levels.iter().enumerate() {
            // served workload per app
            for (a, &demand) in level.iter().enumerate() {
                let served: f64 = problem
                    .instance_classes
                    .iter()
                    .enumerate()
                    .map(|(k, class)| {
                        let perf = problem.performance(&class.id, &allocation.apps[a]).unwrap();
                        perf * allocation.values[l][k][a] as f64
                    })
                    .sum();
                assert!(
                    served + 1e-6 >= demand as f64,
                    "level {l} app {a}: served {served} < demand {demand}"
                );
            }
            // reserved coupling
            for (k, class) in problem.instance_classes.iter().enumerate() {
                if class.is_reserved {
                    let used: u64 = allocation.values[l][k].iter().sum();
                    assert!(used <= reserved.get(&class.id));
                }
            }
            // limiting-set caps
            for set in &problem.limiting_sets {
                if set.max_vms == 0 {
                    continue;
                }
                let mut used = 0;
                for (k, class) in problem.instance_classes.iter().enumerate() {
                    if !class.limiting_sets.contains(&set.id) {
                        continue;
                    }
                    if class.is_reserved {
                        used += reserved.get(&class.id);
                    } else {
                        used += allocation.values[l][k].iter().sum::<u64>();
                    }
                }
                assert!(used <= set.max_vms, "set {} exceeded at level {l}", set.id);
            }
        }
    }

    #[test]
    fn test_minimal_problem_cost() {
        let problem = minimal_problem();
        let backend = HighsBackend::new();
        let solution = PhaseI::new(&problem, &backend).unwrap().solve().unwrap();

        assert_eq!(solution.solving_stats.algorithm.status, Status::Optimal);
        let cost = solution.solving_stats.optimal_cost.unwrap();
        assert!((cost - 178.0).abs() < 1e-6, "cost was {cost}");

        let reserved = solution.reserved_allocation.as_ref().unwrap();
        assert_eq!(reserved.get("m3large_r"), 6);

        let allocation = solution.allocation.as_ref().unwrap();
        assert_eq!(
            allocation.load_levels.as_ref().unwrap(),
            &vec![vec![30, 1003], vec![30, 1194], vec![32, 1200]]
        );
        assert_eq!(allocation.repeats.as_ref().unwrap(), &vec![2, 1, 1]);
        assert_solution_feasible(&problem, &solution);
    }

    #[test]
    fn test_core_limited_variant() {
        let problem = core_limited_problem();
        let backend = HighsBackend::new();
        let solution = PhaseI::new(&problem, &backend).unwrap().solve().unwrap();

        assert_eq!(solution.solving_stats.algorithm.status, Status::Optimal);
        // CloudR allows 10 cores and reserved VMs take 4 each, so at most 2.
        let reserved = solution.reserved_allocation.as_ref().unwrap();
        assert!(reserved.get("m3large_r") <= 2);
        let cost = solution.solving_stats.optimal_cost.unwrap();
        assert!((cost - 226.0).abs() < 1e-6, "cost was {cost}");
        assert_solution_feasible(&problem, &solution);

        // core caps hold at every level
        let allocation = solution.allocation.as_ref().unwrap();
        for level in &allocation.values {
            let od_cores = 2.0 * level[0].iter().sum::<u64>() as f64;
            assert!(od_cores <= 20.0);
            let reserved_cores = 4.0 * reserved.get("m3large_r") as f64;
            assert!(reserved_cores <= 10.0);
        }
    }

    #[test]
    fn test_example1_reservation() {
        let problem = example1_problem();
        let backend = HighsBackend::new();
        let solution = PhaseI::new(&problem, &backend).unwrap().solve().unwrap();

        assert_eq!(solution.solving_stats.algorithm.status, Status::Optimal);
        let reserved = solution.reserved_allocation.as_ref().unwrap();
        assert_eq!(reserved.get("m3large_z1"), 16);
        let cost = solution.solving_stats.optimal_cost.unwrap();
        assert!((cost - 1390.0).abs() < 1e-6, "cost was {cost}");
        assert_solution_feasible(&problem, &solution);
    }

    #[test]
    fn test_trivial_all_zero() {
        let mut problem = minimal_problem();
        problem.workloads[0].values = vec![0, 0, 0, 0];
        problem.workloads[1].values = vec![0, 0, 0, 0];

        let backend = HighsBackend::new();
        let solution = PhaseI::new(&problem, &backend).unwrap().solve().unwrap();

        assert_eq!(solution.solving_stats.algorithm.status, Status::Trivial);
        assert_eq!(solution.solving_stats.optimal_cost, Some(0.0));
        assert_eq!(solution.solving_stats.solving_time, 0.0);
        let reserved = solution.reserved_allocation.as_ref().unwrap();
        assert_eq!(reserved.total_vms(), 0);
        assert_eq!(solution.allocation.as_ref().unwrap().total_vms(), 0);
    }

    #[test]
    fn test_infeasible_when_caps_too_tight() {
        let mut problem = minimal_problem();
        // One VM serves 500 requests of a1 per slot; capping every cloud at
        // one VM leaves 1200 unservable.
        problem.limiting_sets = vec![
            LimitingSet::new("cloud1", "Cloud1").with_max_vms(1),
            LimitingSet::new("cloudr", "CloudR").with_max_vms(1),
        ];

        let backend = HighsBackend::new();
        let solution = PhaseI::new(&problem, &backend).unwrap().solve().unwrap();

        let status = solution.solving_stats.algorithm.status;
        assert!(
            matches!(status, Status::Infeasible | Status::IntegerInfeasible),
            "status was {status}"
        );
        assert!(solution.solving_stats.optimal_cost.is_none());
        assert!(solution.reserved_allocation.is_none());
    }

    #[test]
    fn test_gcd_cost_unchanged() {
        let mut problem = minimal_problem();
        problem.workloads[0].values = vec![30, 40, 30, 30];
        problem.workloads[1].values = vec![1000, 1200, 1190, 1000];
        let backend = HighsBackend::new();

        let plain = PhaseI::new(&problem, &backend).unwrap().solve().unwrap();
        let rescaled = PhaseI::new(&problem, &backend)
            .unwrap()
            .with_gcd(true)
            .solve()
            .unwrap();

        assert_eq!(plain.solving_stats.algorithm.gcd_multiplier, 1);
        // gcd(30, 40, 1000, 1200, 1190, 10, 500) = 10
        assert_eq!(rescaled.solving_stats.algorithm.gcd_multiplier, 10);
        let a = plain.solving_stats.optimal_cost.unwrap();
        let b = rescaled.solving_stats.optimal_cost.unwrap();
        assert!((a - b).abs() < 1e-6);

        // levels are reported in original units either way
        assert_eq!(
            plain.allocation.as_ref().unwrap().load_levels,
            rescaled.allocation.as_ref().unwrap().load_levels
        );
    }
}
