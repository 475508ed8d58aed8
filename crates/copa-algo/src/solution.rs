//! Solution data structures shared by both solve phases.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of one solve, as recorded in solving stats and documents.
///
/// `CbcError` names any internal engine failure; the label is kept for
/// compatibility with existing solution documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// Proven optimal (within the configured gap).
    Optimal,
    /// The LP relaxation itself has no feasible point.
    Infeasible,
    /// The relaxation is feasible but no integer solution exists.
    IntegerInfeasible,
    /// A timeslot could not be served in full; the reported allocation
    /// maximizes served performance instead.
    Overfull,
    /// No workload anywhere; solved without invoking the engine.
    Trivial,
    /// The time budget ran out before an incumbent was accepted.
    Aborted,
    /// Internal engine failure.
    CbcError,
    /// Unclassifiable engine outcome.
    Unknown,
}

impl Status {
    /// Whether the status carries a complete, fully-served allocation.
    pub fn is_success(&self) -> bool {
        matches!(self, Status::Optimal | Status::Trivial)
    }

    /// Ranking used when combining per-timeslot statuses; higher is worse.
    pub(crate) fn severity(&self) -> u8 {
        match self {
            Status::Optimal => 0,
            Status::Trivial => 1,
            Status::Overfull => 2,
            Status::IntegerInfeasible => 3,
            Status::Infeasible => 4,
            Status::Aborted => 5,
            Status::CbcError => 6,
            Status::Unknown => 7,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Status::Optimal => "optimal",
            Status::Infeasible => "infeasible",
            Status::IntegerInfeasible => "integer_infeasible",
            Status::Overfull => "overfull",
            Status::Trivial => "trivial",
            Status::Aborted => "aborted",
            Status::CbcError => "cbc_error",
            Status::Unknown => "unknown",
        };
        write!(f, "{label}")
    }
}

/// Description of the algorithm run that produced a solution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlgorithmInfo {
    /// Algorithm name, e.g. `copa-milp`.
    pub name: String,
    pub status: Status,
    pub frac_gap: Option<f64>,
    pub max_seconds: Option<f64>,
    pub threads: u32,
    /// Common divisor applied to workloads and performances before
    /// formulation (1 when rescaling was off or not applicable).
    pub gcd_multiplier: u64,
}

/// Timing and outcome of one solve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolvingStats {
    /// Seconds spent building the model.
    pub creation_time: f64,
    /// Seconds spent inside the engine.
    pub solving_time: f64,
    /// Objective value; absent unless the status carries a cost.
    pub optimal_cost: Option<f64>,
    pub algorithm: AlgorithmInfo,
}

/// Reserved VM counts fixed for the whole planning horizon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReservedAllocation {
    /// Ids of the reserved instance classes, in problem order.
    pub instance_classes: Vec<String>,
    /// VMs of each class, parallel to `instance_classes`.
    pub vms_number: Vec<u64>,
}

impl ReservedAllocation {
    pub fn get(&self, class_id: &str) -> u64 {
        self.instance_classes
            .iter()
            .position(|id| id == class_id)
            .map_or(0, |i| self.vms_number[i])
    }

    pub fn total_vms(&self) -> u64 {
        self.vms_number.iter().sum()
    }
}

/// VM counts per (row, instance class, app).
///
/// Rows are load levels for a reservation solution (with `repeats` and
/// `load_levels` labels) and timeslots for a period solution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationInfo {
    /// What the numbers count; always `vms`.
    pub units: String,
    /// App ids, the innermost axis.
    pub apps: Vec<String>,
    /// Instance class ids, the middle axis.
    pub instance_classes: Vec<String>,
    /// Workload tuple labelling each row (reservation solutions only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub load_levels: Option<Vec<Vec<u64>>>,
    /// Times each row occurs in the horizon (reservation solutions only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repeats: Option<Vec<u64>>,
    /// `values[row][class][app]` = VMs running.
    pub values: Vec<Vec<Vec<u64>>>,
}

impl AllocationInfo {
    pub fn num_rows(&self) -> usize {
        self.values.len()
    }

    pub fn vms_at(&self, row: usize, class: usize, app: usize) -> u64 {
        self.values[row][class][app]
    }

    /// Sum of all VM counts across rows, classes and apps.
    pub fn total_vms(&self) -> u64 {
        self.values
            .iter()
            .flat_map(|row| row.iter())
            .flat_map(|class| class.iter())
            .sum()
    }
}

/// Result of the reservation phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolutionI {
    pub id: String,
    /// Id of the solved problem; solutions reference problems, they do not
    /// copy them.
    pub problem: String,
    pub solving_stats: SolvingStats,
    /// Absent when the solve did not produce a usable point.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reserved_allocation: Option<ReservedAllocation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allocation: Option<AllocationInfo>,
}

impl SolutionI {
    pub fn is_solved(&self) -> bool {
        self.solving_stats.algorithm.status.is_success()
    }
}

/// Summary over all timeslots of a period solution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalSolvingStats {
    pub creation_time: f64,
    pub solving_time: f64,
    pub optimal_cost: Option<f64>,
    pub status: Status,
}

impl GlobalSolvingStats {
    /// Combine per-timeslot stats: times add up, costs add up when every
    /// slot has one, and the status is `overfull` if any slot overflowed,
    /// `optimal` only when every slot was served, otherwise the worst
    /// per-slot status.
    pub fn aggregate(per_slot: &[SolvingStats]) -> Self {
        let creation_time = per_slot.iter().map(|s| s.creation_time).sum();
        let solving_time = per_slot.iter().map(|s| s.solving_time).sum();

        let optimal_cost = per_slot
            .iter()
            .map(|s| s.optimal_cost)
            .try_fold(0.0, |acc, cost| cost.map(|c| acc + c));

        let statuses: Vec<Status> =
            per_slot.iter().map(|s| s.algorithm.status).collect();
        let status = if statuses.iter().any(|s| *s == Status::Overfull) {
            Status::Overfull
        } else if statuses.iter().all(|s| s.is_success()) {
            if statuses.iter().any(|s| *s == Status::Optimal) || statuses.is_empty() {
                Status::Optimal
            } else {
                Status::Trivial
            }
        } else {
            statuses
                .into_iter()
                .max_by_key(|s| s.severity())
                .unwrap_or(Status::Unknown)
        };

        Self {
            creation_time,
            solving_time,
            optimal_cost,
            status,
        }
    }
}

/// Result of the per-timeslot phase over a whole period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolutionII {
    pub id: String,
    pub problem: String,
    /// Id of the reservation solution whose fixed VM counts were used.
    pub previous_phase: String,
    /// One entry per timeslot, in sequence order.
    pub solving_stats: Vec<SolvingStats>,
    pub global_solving_stats: GlobalSolvingStats,
    pub allocation: AllocationInfo,
}
