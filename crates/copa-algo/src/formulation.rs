//! Pieces shared by the reservation and timeslot formulations.

use copa_core::{InstanceClass, Problem};

/// Per-class data with prices and performances rescaled onto the workload
/// timeslot length, in problem class order.
#[derive(Debug)]
pub(crate) struct ClassView<'a> {
    pub class: &'a InstanceClass,
    /// Cost of one VM for one timeslot.
    pub price_per_slot: f64,
    /// Requests served in one timeslot for each app, in workload order.
    pub perf_per_slot: Vec<f64>,
}

pub(crate) fn class_views(problem: &Problem) -> Vec<ClassView<'_>> {
    let slot_unit = problem
        .timeslot_unit()
        .expect("validated problems have at least one workload");
    let perf_unit = problem.performances.time_unit;

    problem
        .instance_classes
        .iter()
        .map(|class| {
            let perf_per_slot = problem
                .workloads
                .iter()
                .map(|w| {
                    problem
                        .performance(&class.id, &w.app.id)
                        .expect("validated problems have full performance tables")
                        * perf_unit.ratio_to(slot_unit)
                })
                .collect();
            ClassView {
                class,
                price_per_slot: class.price * class.time_unit.ratio_to(slot_unit),
                perf_per_slot,
            }
        })
        .collect()
}

/// A limiting set together with the indices of its member classes, split by
/// pricing regime. Sets with both caps unbounded are dropped here, so the
/// formulations never emit vacuous rows for them.
#[derive(Debug)]
pub(crate) struct SetMembers<'a> {
    pub set: &'a copa_core::LimitingSet,
    pub reserved: Vec<usize>,
    pub ondemand: Vec<usize>,
}

pub(crate) fn limiting_set_members(problem: &Problem) -> Vec<SetMembers<'_>> {
    problem
        .limiting_sets
        .iter()
        .filter(|set| set.max_vms > 0 || set.max_cores > 0)
        .map(|set| {
            let mut reserved = Vec::new();
            let mut ondemand = Vec::new();
            for (k, class) in problem.instance_classes.iter().enumerate() {
                if class.limiting_sets.iter().any(|id| *id == set.id) {
                    if class.is_reserved {
                        reserved.push(k);
                    } else {
                        ondemand.push(k);
                    }
                }
            }
            SetMembers {
                set,
                reserved,
                ondemand,
            }
        })
        .collect()
}
