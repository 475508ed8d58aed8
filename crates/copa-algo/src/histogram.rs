//! Load-level histogram of a multi-app workload.
//!
//! The reservation phase does not iterate over timeslots. It collapses the
//! per-app workload sequences into the set of distinct workload tuples and
//! the number of times each occurs; a year of hourly slots with a few
//! hundred distinct tuples becomes a few hundred MILP blocks instead of
//! 8760.

use copa_core::Problem;
use num::integer::gcd;
use std::collections::BTreeMap;

/// Distinct workload tuples of a horizon with their multiplicities.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadHistogram {
    /// Distinct tuples, ascending lexicographic. One entry per app, in the
    /// problem's workload order.
    pub levels: Vec<Vec<u64>>,
    /// Occurrences of each level; sums to the horizon length `T`.
    pub repeats: Vec<u64>,
    /// `index[t]` = position in `levels` of the tuple seen at timeslot `t`.
    pub index: Vec<usize>,
}

impl LoadHistogram {
    /// Build the histogram of a problem's workloads.
    pub fn from_problem(problem: &Problem) -> Self {
        let timeslots = problem.num_timeslots();
        let tuples: Vec<Vec<u64>> = (0..timeslots)
            .map(|t| problem.workloads.iter().map(|w| w.values[t]).collect())
            .collect();
        Self::from_tuples(&tuples)
    }

    /// Build the histogram of an explicit tuple sequence.
    pub fn from_tuples(tuples: &[Vec<u64>]) -> Self {
        let mut counts: BTreeMap<&[u64], u64> = BTreeMap::new();
        for tuple in tuples {
            *counts.entry(tuple.as_slice()).or_insert(0) += 1;
        }

        // BTreeMap iteration gives the deterministic ascending order.
        let levels: Vec<Vec<u64>> = counts.keys().map(|k| k.to_vec()).collect();
        let repeats: Vec<u64> = counts.values().copied().collect();
        let positions: BTreeMap<&[u64], usize> = counts
            .keys()
            .enumerate()
            .map(|(i, k)| (*k, i))
            .collect();
        let index = tuples
            .iter()
            .map(|tuple| positions[tuple.as_slice()])
            .collect();

        Self {
            levels,
            repeats,
            index,
        }
    }

    pub fn num_levels(&self) -> usize {
        self.levels.len()
    }

    /// Horizon length `T`.
    pub fn total_timeslots(&self) -> u64 {
        self.repeats.iter().sum()
    }

    /// Whether every value of every level is zero.
    pub fn is_all_zero(&self) -> bool {
        self.levels.iter().all(|level| level.iter().all(|&w| w == 0))
    }
}

/// Divide all workload and performance values of `problem` by their greatest
/// common divisor, shrinking the integer coefficients handed to the engine.
///
/// Returns the rescaled problem and the divisor. Applied only when every
/// performance value is a non-negative integer and the divisor exceeds 1;
/// otherwise the problem comes back unchanged with multiplier 1. The optimal
/// allocation and cost of the rescaled problem are identical to the
/// original's.
pub fn gcd_rescale(problem: &Problem) -> (Problem, u64) {
    let mut divisor: u64 = 0;

    for workload in &problem.workloads {
        for &value in &workload.values {
            divisor = gcd(divisor, value);
        }
    }

    for (_, _, value) in problem.performances.iter() {
        if value < 0.0 || value.fract() != 0.0 || value > u64::MAX as f64 {
            return (problem.clone(), 1);
        }
        divisor = gcd(divisor, value as u64);
    }

    if divisor <= 1 {
        return (problem.clone(), 1);
    }

    let mut rescaled = problem.clone();
    for workload in &mut rescaled.workloads {
        for value in &mut workload.values {
            *value /= divisor;
        }
    }
    for apps in rescaled.performances.values.values_mut() {
        for value in apps.values_mut() {
            *value /= divisor as f64;
        }
    }

    (rescaled, divisor)
}
