//! Per-timeslot phase: allocate on-demand VMs around fixed reservations.
//!
//! Each timeslot is a small MILP with the reserved VM counts from the
//! reservation phase entering as constants. Workload tuples repeat heavily
//! in practice, so results are memoized per tuple; a horizon of thousands of
//! slots usually costs a handful of engine calls.

use crate::formulation::{class_views, limiting_set_members, ClassView, SetMembers};
use crate::milp::backend::{MilpBackend, SolverConfig};
use crate::milp::{ConstraintOp, LinExpr, MilpModel, ObjectiveSense, VarId};
use crate::orchestrator::run_model;
use crate::phase1::ALGORITHM_NAME;
use crate::solution::{
    AllocationInfo, AlgorithmInfo, GlobalSolvingStats, ReservedAllocation, SolutionI, SolutionII,
    SolvingStats, Status,
};
use copa_core::{CopaError, CopaResult, Problem};
use std::collections::{BTreeMap, HashMap};
use std::time::Instant;
use tracing::{debug, info};

/// Allocation and stats for a single timeslot.
#[derive(Debug, Clone)]
pub struct TimeslotSolution {
    pub stats: SolvingStats,
    /// `vms[class][app]` in problem order.
    pub vms: Vec<Vec<u64>>,
}

/// Per-timeslot solver, parameterised by a reservation-phase solution.
///
/// Owns its memoization cache; two `PhaseII` values never share state.
pub struct PhaseII<'a, B: MilpBackend> {
    problem: &'a Problem,
    backend: &'a B,
    config: SolverConfig,
    reserved: ReservedAllocation,
    previous_phase: String,
    /// Per-(class, app) lower bounds on the allocation, for "hold at least
    /// these VMs running" policies.
    guided: BTreeMap<(String, String), u64>,
    cache: HashMap<Vec<u64>, TimeslotSolution>,
}

impl<'a, B: MilpBackend> PhaseII<'a, B> {
    /// Create a solver around the reserved VM counts of `previous`.
    ///
    /// `problem` may differ from the one Phase I solved (a realized workload
    /// instead of the forecast), but must use the same instance classes.
    pub fn new(problem: &'a Problem, backend: &'a B, previous: &SolutionI) -> CopaResult<Self> {
        problem.validate()?;
        let reserved = previous.reserved_allocation.clone().ok_or_else(|| {
            CopaError::Config(format!(
                "phase I solution '{}' carries no reserved allocation (status {})",
                previous.id, previous.solving_stats.algorithm.status
            ))
        })?;
        for class_id in &reserved.instance_classes {
            let known = problem
                .instance_classes
                .iter()
                .any(|c| c.id == *class_id && c.is_reserved);
            if !known {
                return Err(CopaError::Config(format!(
                    "reserved allocation names '{}', which is not a reserved class of problem '{}'",
                    class_id, problem.id
                )));
            }
        }
        Ok(Self {
            problem,
            backend,
            config: SolverConfig::default(),
            reserved,
            previous_phase: previous.id.clone(),
            guided: BTreeMap::new(),
            cache: HashMap::new(),
        })
    }

    pub fn with_config(mut self, config: SolverConfig) -> Self {
        self.config = config;
        self
    }

    /// Require at least `vms` VMs of `class_id` on `app_id` in every slot.
    pub fn with_guided(
        mut self,
        bounds: impl IntoIterator<Item = ((String, String), u64)>,
    ) -> CopaResult<Self> {
        for ((class_id, app_id), vms) in bounds {
            if !self.problem.instance_classes.iter().any(|c| c.id == class_id) {
                return Err(CopaError::Config(format!(
                    "guided bound names unknown instance class '{class_id}'"
                )));
            }
            if !self.problem.workloads.iter().any(|w| w.app.id == app_id) {
                return Err(CopaError::Config(format!(
                    "guided bound names unknown app '{app_id}'"
                )));
            }
            self.guided.insert((class_id, app_id), vms);
        }
        Ok(self)
    }

    pub fn reserved_allocation(&self) -> &ReservedAllocation {
        &self.reserved
    }

    /// Solve one timeslot, consulting the cache first.
    pub fn solve_timeslot(&mut self, load: &[u64]) -> CopaResult<TimeslotSolution> {
        if load.len() != self.problem.workloads.len() {
            return Err(CopaError::Config(format!(
                "load tuple has {} entries but problem '{}' has {} apps",
                load.len(),
                self.problem.id,
                self.problem.workloads.len()
            )));
        }

        if let Some(cached) = self.cache.get(load) {
            debug!(?load, "timeslot cache hit");
            let mut replay = cached.clone();
            replay.stats.creation_time = 0.0;
            replay.stats.solving_time = 0.0;
            return Ok(replay);
        }

        let solution = self.compute_timeslot(load);
        self.cache.insert(load.to_vec(), solution.clone());
        Ok(solution)
    }

    /// Solve a whole period by draining `tuples` in sequence order.
    ///
    /// The tuple producer is consumed exactly once; it does not have to be
    /// restartable.
    pub fn solve_period<I>(&mut self, tuples: I) -> CopaResult<SolutionII>
    where
        I: IntoIterator<Item = Vec<u64>>,
    {
        let mut solving_stats = Vec::new();
        let mut values = Vec::new();
        for tuple in tuples {
            let slot = self.solve_timeslot(&tuple)?;
            solving_stats.push(slot.stats);
            values.push(slot.vms);
        }

        let global_solving_stats = GlobalSolvingStats::aggregate(&solving_stats);
        info!(
            problem = %self.problem.id,
            timeslots = solving_stats.len(),
            status = %global_solving_stats.status,
            cost = ?global_solving_stats.optimal_cost,
            "timeslot phase finished"
        );

        Ok(SolutionII {
            id: format!("{}-phase-ii", self.problem.id),
            problem: self.problem.id.clone(),
            previous_phase: self.previous_phase.clone(),
            solving_stats,
            global_solving_stats,
            allocation: AllocationInfo {
                units: "vms".into(),
                apps: self.problem.app_ids().iter().map(|s| s.to_string()).collect(),
                instance_classes: self
                    .problem
                    .instance_classes
                    .iter()
                    .map(|c| c.id.clone())
                    .collect(),
                load_levels: None,
                repeats: None,
                values,
            },
        })
    }

    fn compute_timeslot(&self, load: &[u64]) -> TimeslotSolution {
        let started = Instant::now();
        let views = class_views(self.problem);
        let sets = limiting_set_members(self.problem);
        let reserved_cost: f64 = views
            .iter()
            .filter(|v| v.class.is_reserved)
            .map(|v| v.price_per_slot * self.reserved.get(&v.class.id) as f64)
            .sum();

        // Nothing to serve and nothing to hold: only the reservations cost.
        if load.iter().all(|&w| w == 0) && self.guided.is_empty() {
            return TimeslotSolution {
                stats: self.slot_stats(
                    started.elapsed().as_secs_f64(),
                    0.0,
                    Some(reserved_cost),
                    Status::Trivial,
                ),
                vms: zero_vms(&views, load.len()),
            };
        }

        let (model, x_vars, _cost) = self.build_slot_model(&views, &sets, load, reserved_cost);
        let creation_time = started.elapsed().as_secs_f64();
        let outcome = run_model(self.backend, &model, &self.config);

        match outcome.status {
            Status::Optimal => TimeslotSolution {
                stats: self.slot_stats(
                    creation_time,
                    outcome.solving_time,
                    outcome.objective,
                    Status::Optimal,
                ),
                vms: extract_vms(&x_vars, &outcome.values),
            },
            Status::Infeasible | Status::IntegerInfeasible => {
                self.overfull_timeslot(load, outcome.status, outcome.solving_time, started)
            }
            status => TimeslotSolution {
                stats: self.slot_stats(creation_time, outcome.solving_time, None, status),
                vms: zero_vms(&views, load.len()),
            },
        }
    }

    /// The workload cannot be served in full. Re-solve maximizing served
    /// performance under the same capacity constraints, without guided
    /// bounds, and report the cost actually incurred.
    fn overfull_timeslot(
        &self,
        load: &[u64],
        nominal_status: Status,
        nominal_solving: f64,
        started: Instant,
    ) -> TimeslotSolution {
        let views = class_views(self.problem);
        let sets = limiting_set_members(self.problem);
        let reserved_cost: f64 = views
            .iter()
            .filter(|v| v.class.is_reserved)
            .map(|v| v.price_per_slot * self.reserved.get(&v.class.id) as f64)
            .sum();

        let (model, x_vars, cost) = build_fallback_model(
            self.problem,
            &views,
            &sets,
            &self.reserved,
            load,
            reserved_cost,
        );
        let outcome = run_model(self.backend, &model, &self.config);
        let solving_time = nominal_solving + outcome.solving_time;
        let creation_time = started.elapsed().as_secs_f64() - solving_time;

        if outcome.status == Status::Optimal {
            let vms = extract_vms(&x_vars, &outcome.values);
            let achieved_cost = cost.eval(&outcome.values);
            TimeslotSolution {
                stats: self.slot_stats(
                    creation_time.max(0.0),
                    solving_time,
                    Some(achieved_cost),
                    Status::Overfull,
                ),
                vms,
            }
        } else {
            // Even serving nothing violates a cap; keep the nominal verdict.
            TimeslotSolution {
                stats: self.slot_stats(creation_time.max(0.0), solving_time, None, nominal_status),
                vms: zero_vms(&views, load.len()),
            }
        }
    }

    /// Nominal single-slot model: minimize cost, serve the whole tuple.
    fn build_slot_model(
        &self,
        views: &[ClassView<'_>],
        sets: &[SetMembers<'_>],
        load: &[u64],
        reserved_cost: f64,
    ) -> (MilpModel, Vec<Vec<VarId>>, LinExpr) {
        let mut model = MilpModel::new(format!("{}-timeslot", self.problem.id));
        let x_vars = add_slot_vars(&mut model, views, load.len(), self.problem);

        let cost = slot_cost_expr(views, &x_vars, reserved_cost);
        model.set_objective(cost.clone(), ObjectiveSense::Minimize);

        add_performance_constraints(&mut model, views, &x_vars, load, ConstraintOp::Ge, self.problem);
        self.add_capacity_constraints(&mut model, views, sets, &x_vars);

        for ((class_id, app_id), vms) in &self.guided {
            let k = self
                .problem
                .instance_classes
                .iter()
                .position(|c| c.id == *class_id)
                .expect("guided bounds validated on construction");
            let a = self
                .problem
                .workloads
                .iter()
                .position(|w| w.app.id == *app_id)
                .expect("guided bounds validated on construction");
            let mut expr = LinExpr::new();
            expr.add_term(x_vars[k][a], 1.0);
            model.add_constraint(
                expr,
                ConstraintOp::Ge,
                *vms as f64,
                format!("guided_{class_id}_{app_id}"),
            );
        }

        (model, x_vars, cost)
    }

    fn add_capacity_constraints(
        &self,
        model: &mut MilpModel,
        views: &[ClassView<'_>],
        sets: &[SetMembers<'_>],
        x_vars: &[Vec<VarId>],
    ) {
        let num_apps = self.problem.workloads.len();

        // Reserved coupling against the fixed counts.
        for (k, view) in views.iter().enumerate() {
            if !view.class.is_reserved {
                continue;
            }
            let mut used = LinExpr::new();
            for a in 0..num_apps {
                used.add_term(x_vars[k][a], 1.0);
            }
            model.add_constraint(
                used,
                ConstraintOp::Le,
                self.reserved.get(&view.class.id) as f64,
                format!("reserved_{}", view.class.id),
            );
        }

        // Per-class caps for on-demand classes.
        for (k, view) in views.iter().enumerate() {
            if view.class.is_reserved || view.class.max_vms == 0 {
                continue;
            }
            let mut used = LinExpr::new();
            for a in 0..num_apps {
                used.add_term(x_vars[k][a], 1.0);
            }
            model.add_constraint(
                used,
                ConstraintOp::Le,
                view.class.max_vms as f64,
                format!("class_cap_{}", view.class.id),
            );
        }

        // Limiting-set caps; reserved members contribute their fixed counts
        // as constants.
        for members in sets {
            if members.set.max_vms > 0 {
                let mut used = LinExpr::new();
                for &k in &members.ondemand {
                    for a in 0..num_apps {
                        used.add_term(x_vars[k][a], 1.0);
                    }
                }
                for &k in &members.reserved {
                    used.add_constant(self.reserved.get(&views[k].class.id) as f64);
                }
                model.add_constraint(
                    used,
                    ConstraintOp::Le,
                    members.set.max_vms as f64,
                    format!("set_vms_{}", members.set.id),
                );
            }
            if members.set.max_cores > 0 {
                let mut used = LinExpr::new();
                for &k in &members.ondemand {
                    for a in 0..num_apps {
                        used.add_term(x_vars[k][a], views[k].class.cores);
                    }
                }
                for &k in &members.reserved {
                    used.add_constant(
                        views[k].class.cores * self.reserved.get(&views[k].class.id) as f64,
                    );
                }
                model.add_constraint(
                    used,
                    ConstraintOp::Le,
                    members.set.max_cores as f64,
                    format!("set_cores_{}", members.set.id),
                );
            }
        }
    }

    fn slot_stats(
        &self,
        creation_time: f64,
        solving_time: f64,
        optimal_cost: Option<f64>,
        status: Status,
    ) -> SolvingStats {
        SolvingStats {
            creation_time,
            solving_time,
            optimal_cost,
            algorithm: AlgorithmInfo {
                name: ALGORITHM_NAME.into(),
                status,
                frac_gap: self.config.frac_gap,
                max_seconds: self.config.max_seconds,
                threads: self.config.threads,
                gcd_multiplier: 1,
            },
        }
    }
}

/// Workload tuples of a problem in timeslot order, for replaying its own
/// forecast through the per-timeslot phase.
pub fn workload_tuples(problem: &Problem) -> Vec<Vec<u64>> {
    (0..problem.num_timeslots())
        .map(|t| problem.workloads.iter().map(|w| w.values[t]).collect())
        .collect()
}

fn add_slot_vars(
    model: &mut MilpModel,
    views: &[ClassView<'_>],
    num_apps: usize,
    problem: &Problem,
) -> Vec<Vec<VarId>> {
    let mut x_vars = Vec::with_capacity(views.len());
    for view in views {
        let mut x_class = Vec::with_capacity(num_apps);
        for a in 0..num_apps {
            x_class.push(model.add_integer_var(
                0,
                None,
                format!("X_{}_{}", view.class.id, problem.workloads[a].app.id),
            ));
        }
        x_vars.push(x_class);
    }
    x_vars
}

/// Cost of one slot: on-demand VMs in use plus the fixed reservation cost.
fn slot_cost_expr(views: &[ClassView<'_>], x_vars: &[Vec<VarId>], reserved_cost: f64) -> LinExpr {
    let mut cost = LinExpr::constant(reserved_cost);
    for (k, view) in views.iter().enumerate() {
        if view.class.is_reserved {
            continue;
        }
        for &x in &x_vars[k] {
            cost.add_term(x, view.price_per_slot);
        }
    }
    cost
}

fn add_performance_constraints(
    model: &mut MilpModel,
    views: &[ClassView<'_>],
    x_vars: &[Vec<VarId>],
    load: &[u64],
    op: ConstraintOp,
    problem: &Problem,
) {
    for (a, &workload) in load.iter().enumerate() {
        let mut served = LinExpr::new();
        for (k, view) in views.iter().enumerate() {
            served.add_term(x_vars[k][a], view.perf_per_slot[a]);
        }
        model.add_constraint(
            served,
            op,
            workload as f64,
            format!("perf_{}", problem.workloads[a].app.id),
        );
    }
}

/// Fallback model: maximize served performance under the capacity
/// constraints, serving at most the workload of each app.
fn build_fallback_model(
    problem: &Problem,
    views: &[ClassView<'_>],
    sets: &[SetMembers<'_>],
    reserved: &ReservedAllocation,
    load: &[u64],
    reserved_cost: f64,
) -> (MilpModel, Vec<Vec<VarId>>, LinExpr) {
    let mut model = MilpModel::new(format!("{}-timeslot-overfull", problem.id));
    let x_vars = add_slot_vars(&mut model, views, load.len(), problem);
    let num_apps = load.len();

    let mut served_total = LinExpr::new();
    for (k, view) in views.iter().enumerate() {
        for a in 0..num_apps {
            served_total.add_term(x_vars[k][a], view.perf_per_slot[a]);
        }
    }
    model.set_objective(served_total, ObjectiveSense::Maximize);

    add_performance_constraints(&mut model, views, &x_vars, load, ConstraintOp::Le, problem);

    // Same capacity constraints as the nominal model.
    for (k, view) in views.iter().enumerate() {
        if view.class.is_reserved {
            let mut used = LinExpr::new();
            for a in 0..num_apps {
                used.add_term(x_vars[k][a], 1.0);
            }
            model.add_constraint(
                used,
                ConstraintOp::Le,
                reserved.get(&view.class.id) as f64,
                format!("reserved_{}", view.class.id),
            );
        } else if view.class.max_vms > 0 {
            let mut used = LinExpr::new();
            for a in 0..num_apps {
                used.add_term(x_vars[k][a], 1.0);
            }
            model.add_constraint(
                used,
                ConstraintOp::Le,
                view.class.max_vms as f64,
                format!("class_cap_{}", view.class.id),
            );
        }
    }
    for members in sets {
        if members.set.max_vms > 0 {
            let mut used = LinExpr::new();
            for &k in &members.ondemand {
                for a in 0..num_apps {
                    used.add_term(x_vars[k][a], 1.0);
                }
            }
            for &k in &members.reserved {
                used.add_constant(reserved.get(&views[k].class.id) as f64);
            }
            model.add_constraint(
                used,
                ConstraintOp::Le,
                members.set.max_vms as f64,
                format!("set_vms_{}", members.set.id),
            );
        }
        if members.set.max_cores > 0 {
            let mut used = LinExpr::new();
            for &k in &members.ondemand {
                for a in 0..num_apps {
                    used.add_term(x_vars[k][a], views[k].class.cores);
                }
            }
            for &k in &members.reserved {
                used.add_constant(views[k].class.cores * reserved.get(&views[k].class.id) as f64);
            }
            model.add_constraint(
                used,
                ConstraintOp::Le,
                members.set.max_cores as f64,
                format!("set_cores_{}", members.set.id),
            );
        }
    }

    let cost = slot_cost_expr(views, &x_vars, reserved_cost);
    (model, x_vars, cost)
}

fn extract_vms(x_vars: &[Vec<VarId>], values: &[f64]) -> Vec<Vec<u64>> {
    x_vars
        .iter()
        .map(|class| {
            class
                .iter()
                .map(|x| values[x.index()].round() as u64)
                .collect()
        })
        .collect()
}

fn zero_vms(views: &[ClassView<'_>], num_apps: usize) -> Vec<Vec<u64>> {
    vec![vec![0; num_apps]; views.len()]
}

#[cfg(all(test, feature = "solver-highs"))]
mod tests {
    use super::*;
    use crate::milp::backend::{BackendError, BackendSolution};
    use crate::milp::highs::HighsBackend;
    use crate::phase1::PhaseI;
    use crate::test_utils::{example1_problem, minimal_problem};
    use std::cell::Cell;

    /// Counts engine invocations; backends are pluggable, so the cache
    /// behaviour is observable from outside.
    struct CountingBackend {
        inner: HighsBackend,
        calls: Cell<usize>,
    }

    impl CountingBackend {
        fn new() -> Self {
            Self {
                inner: HighsBackend::new(),
                calls: Cell::new(0),
            }
        }
    }

    impl MilpBackend for CountingBackend {
        fn name(&self) -> &'static str {
            "counting-highs"
        }

        fn solve(
            &self,
            model: &MilpModel,
            config: &SolverConfig,
        ) -> Result<BackendSolution, BackendError> {
            self.calls.set(self.calls.get() + 1);
            self.inner.solve(model, config)
        }
    }

    #[test]
    fn test_replay_matches_reservation_cost() {
        let problem = minimal_problem();
        let backend = HighsBackend::new();
        let phase1 = PhaseI::new(&problem, &backend).unwrap().solve().unwrap();
        let phase1_cost = phase1.solving_stats.optimal_cost.unwrap();

        let mut phase2 = PhaseII::new(&problem, &backend, &phase1).unwrap();
        let solution = phase2.solve_period(workload_tuples(&problem)).unwrap();

        assert_eq!(solution.global_solving_stats.status, Status::Optimal);
        let replay_cost = solution.global_solving_stats.optimal_cost.unwrap();
        assert!(
            (replay_cost - phase1_cost).abs() < 1e-6,
            "replay {replay_cost} vs reservation {phase1_cost}"
        );

        // 6 reserved at 7 each cost 42 per slot; only the peak adds a VM.
        let per_slot: Vec<f64> = solution
            .solving_stats
            .iter()
            .map(|s| s.optimal_cost.unwrap())
            .collect();
        assert_eq!(per_slot.len(), 4);
        assert!((per_slot[0] - 42.0).abs() < 1e-6);
        assert!((per_slot[1] - 52.0).abs() < 1e-6);
        assert!((per_slot[2] - 42.0).abs() < 1e-6);
        assert!((per_slot[3] - 42.0).abs() < 1e-6);
    }

    #[test]
    fn test_example1_replay() {
        let problem = example1_problem();
        let backend = HighsBackend::new();
        let phase1 = PhaseI::new(&problem, &backend).unwrap().solve().unwrap();

        let mut phase2 = PhaseII::new(&problem, &backend, &phase1).unwrap();
        let solution = phase2.solve_period(workload_tuples(&problem)).unwrap();

        assert_eq!(solution.global_solving_stats.status, Status::Optimal);
        let cost = solution.global_solving_stats.optimal_cost.unwrap();
        assert!((cost - 1390.0).abs() < 1e-6, "cost was {cost}");
        assert_eq!(solution.allocation.num_rows(), 10);
    }

    #[test]
    fn test_cache_limits_engine_calls() {
        let problem = minimal_problem();
        let backend = HighsBackend::new();
        let phase1 = PhaseI::new(&problem, &backend).unwrap().solve().unwrap();

        // A long period cycling through the three distinct tuples.
        let base = workload_tuples(&problem);
        let tuples: Vec<Vec<u64>> = (0..1000).map(|t| base[t % base.len()].clone()).collect();

        let counting = CountingBackend::new();
        let mut phase2 = PhaseII::new(&problem, &counting, &phase1).unwrap();
        let solution = phase2.solve_period(tuples).unwrap();

        assert_eq!(solution.global_solving_stats.status, Status::Optimal);
        assert_eq!(solution.allocation.num_rows(), 1000);
        // 3 distinct tuples, one engine call each
        assert_eq!(counting.calls.get(), 3);

        // cached slots report zero solve time
        assert_eq!(solution.solving_stats[999].solving_time, 0.0);
    }

    #[test]
    fn test_cache_idempotence() {
        let problem = minimal_problem();
        let backend = HighsBackend::new();
        let phase1 = PhaseI::new(&problem, &backend).unwrap().solve().unwrap();
        let mut phase2 = PhaseII::new(&problem, &backend, &phase1).unwrap();

        let first = phase2.solve_timeslot(&[30, 1003]).unwrap();
        let second = phase2.solve_timeslot(&[30, 1003]).unwrap();
        assert_eq!(first.vms, second.vms);
        assert_eq!(first.stats.optimal_cost, second.stats.optimal_cost);
    }

    #[test]
    fn test_overfull_timeslot() {
        let problem = example1_problem();
        let backend = HighsBackend::new();
        let phase1 = PhaseI::new(&problem, &backend).unwrap().solve().unwrap();

        let counting = CountingBackend::new();
        let mut phase2 = PhaseII::new(&problem, &counting, &phase1).unwrap();
        let slot = phase2.solve_timeslot(&[10_000, 100_000]).unwrap();

        assert_eq!(slot.stats.algorithm.status, Status::Overfull);
        // All capacity goes to a1, the app each VM serves best: 16 reserved
        // plus the 10-VM on-demand cap, 7*16 + 10*10.
        let cost = slot.stats.optimal_cost.unwrap();
        assert!((cost - 212.0).abs() < 1e-6, "cost was {cost}");
        let total: u64 = slot.vms.iter().flatten().sum();
        assert_eq!(total, 26);

        // overfull results are cached like any other
        let calls_after_first = counting.calls.get();
        let replay = phase2.solve_timeslot(&[10_000, 100_000]).unwrap();
        assert_eq!(replay.stats.algorithm.status, Status::Overfull);
        assert_eq!(counting.calls.get(), calls_after_first);
    }

    #[test]
    fn test_zero_tuple_costs_reservations_only() {
        let problem = minimal_problem();
        let backend = HighsBackend::new();
        let phase1 = PhaseI::new(&problem, &backend).unwrap().solve().unwrap();

        let counting = CountingBackend::new();
        let mut phase2 = PhaseII::new(&problem, &counting, &phase1).unwrap();
        let slot = phase2.solve_timeslot(&[0, 0]).unwrap();

        assert_eq!(slot.stats.algorithm.status, Status::Trivial);
        // 6 reserved VMs at 7 per slot keep costing 42 with no load
        assert!((slot.stats.optimal_cost.unwrap() - 42.0).abs() < 1e-6);
        assert_eq!(slot.vms.iter().flatten().sum::<u64>(), 0);
        assert_eq!(counting.calls.get(), 0);
    }

    #[test]
    fn test_guided_lower_bound_holds() {
        let problem = minimal_problem();
        let backend = HighsBackend::new();
        let phase1 = PhaseI::new(&problem, &backend).unwrap().solve().unwrap();

        let mut phase2 = PhaseII::new(&problem, &backend, &phase1)
            .unwrap()
            .with_guided([(("m3large".to_string(), "a0".to_string()), 3)])
            .unwrap();
        let slot = phase2.solve_timeslot(&[30, 1003]).unwrap();

        assert_eq!(slot.stats.algorithm.status, Status::Optimal);
        assert!(slot.vms[0][0] >= 3);
        // three on-demand VMs on top of the 42 of reserved cost
        assert!((slot.stats.optimal_cost.unwrap() - 72.0).abs() < 1e-6);
    }

    #[test]
    fn test_guided_bound_beyond_caps_overflows() {
        let mut problem = minimal_problem();
        problem.limiting_sets[0].max_vms = 2; // cloud1 caps on-demand at 2
        let backend = HighsBackend::new();
        let phase1 = PhaseI::new(&problem, &backend).unwrap().solve().unwrap();

        let mut phase2 = PhaseII::new(&problem, &backend, &phase1)
            .unwrap()
            .with_guided([(("m3large".to_string(), "a0".to_string()), 3)])
            .unwrap();
        let slot = phase2.solve_timeslot(&[30, 1003]).unwrap();

        // the bound cannot be honored; the fallback drops it and serves
        // what the caps allow
        assert_eq!(slot.stats.algorithm.status, Status::Overfull);
        assert!(slot.vms[0].iter().sum::<u64>() <= 2);
    }

    #[test]
    fn test_unknown_guided_class_rejected() {
        let problem = minimal_problem();
        let backend = HighsBackend::new();
        let phase1 = PhaseI::new(&problem, &backend).unwrap().solve().unwrap();

        let result = PhaseII::new(&problem, &backend, &phase1)
            .unwrap()
            .with_guided([(("nope".to_string(), "a0".to_string()), 1)]);
        assert!(result.is_err());
    }

    #[test]
    fn test_unsolved_previous_phase_rejected() {
        let problem = minimal_problem();
        let backend = HighsBackend::new();
        let mut phase1 = PhaseI::new(&problem, &backend).unwrap().solve().unwrap();
        phase1.reserved_allocation = None;

        let result = PhaseII::new(&problem, &backend, &phase1);
        assert!(matches!(result, Err(CopaError::Config(_))));
    }

    #[test]
    fn test_wrong_tuple_arity_rejected() {
        let problem = minimal_problem();
        let backend = HighsBackend::new();
        let phase1 = PhaseI::new(&problem, &backend).unwrap().solve().unwrap();
        let mut phase2 = PhaseII::new(&problem, &backend, &phase1).unwrap();

        assert!(phase2.solve_timeslot(&[30]).is_err());
    }
}
