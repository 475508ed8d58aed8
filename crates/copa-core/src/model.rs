//! Domain model for allocation problems.
//!
//! A [`Problem`] bundles the catalog of instance classes, the limiting sets
//! they belong to, a performance table and one workload sequence per
//! application. Everything is immutable once constructed; solvers only read
//! these values.

use crate::error::{CopaError, CopaResult};
use crate::units::TimeUnit;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// An application whose workload must be served.
///
/// Identity is the `id`; `name` is display-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct App {
    pub id: String,
    pub name: String,
}

impl App {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// A group of instance classes sharing aggregate capacity caps, such as a
/// region or an availability zone.
///
/// A bound of 0 means "unbounded". This mirrors the provider documents the
/// catalog is loaded from, where an absent quota is written as zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LimitingSet {
    pub id: String,
    pub name: String,
    /// Maximum total VMs across the member classes (0 = unbounded).
    pub max_vms: u64,
    /// Maximum total cores across the member classes (0 = unbounded).
    pub max_cores: u64,
}

impl LimitingSet {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            max_vms: 0,
            max_cores: 0,
        }
    }

    pub fn with_max_vms(mut self, max_vms: u64) -> Self {
        self.max_vms = max_vms;
        self
    }

    pub fn with_max_cores(mut self, max_cores: u64) -> Self {
        self.max_cores = max_cores;
        self
    }
}

/// A rentable VM type with its pricing regime and capacity limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceClass {
    pub id: String,
    pub name: String,
    /// Cost of running one VM of this class for one `time_unit`.
    pub price: f64,
    /// Unit the price is quoted in.
    pub time_unit: TimeUnit,
    /// Reserved VMs are paid for the whole planning horizon; on-demand VMs
    /// are paid per timeslot of use.
    pub is_reserved: bool,
    /// Cores per VM, counted against limiting-set core caps.
    pub cores: f64,
    /// Maximum simultaneous VMs of this class (0 = uncapped).
    pub max_vms: u64,
    /// Ids of the limiting sets this class belongs to.
    pub limiting_sets: Vec<String>,
    /// Marks classes of a private cloud; carried through documents, not
    /// interpreted by the solver.
    pub is_private: bool,
}

impl InstanceClass {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        price: f64,
        time_unit: TimeUnit,
        is_reserved: bool,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            price,
            time_unit,
            is_reserved,
            cores: 1.0,
            max_vms: 0,
            limiting_sets: Vec::new(),
            is_private: false,
        }
    }

    pub fn with_cores(mut self, cores: f64) -> Self {
        self.cores = cores;
        self
    }

    pub fn with_max_vms(mut self, max_vms: u64) -> Self {
        self.max_vms = max_vms;
        self
    }

    pub fn with_limiting_sets<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.limiting_sets = ids.into_iter().map(Into::into).collect();
        self
    }

    pub fn private(mut self) -> Self {
        self.is_private = true;
        self
    }
}

/// Requests served per `time_unit` by one VM of each class running each app.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSet {
    pub id: String,
    pub time_unit: TimeUnit,
    /// class id -> app id -> requests per `time_unit`.
    pub values: BTreeMap<String, BTreeMap<String, f64>>,
}

impl PerformanceSet {
    pub fn new(id: impl Into<String>, time_unit: TimeUnit) -> Self {
        Self {
            id: id.into(),
            time_unit,
            values: BTreeMap::new(),
        }
    }

    /// Record the performance of one (class, app) pair.
    pub fn set(&mut self, class_id: impl Into<String>, app_id: impl Into<String>, value: f64) {
        self.values
            .entry(class_id.into())
            .or_default()
            .insert(app_id.into(), value);
    }

    pub fn get(&self, class_id: &str, app_id: &str) -> Option<f64> {
        self.values.get(class_id).and_then(|m| m.get(app_id)).copied()
    }

    /// Iterate over all (class id, app id, value) entries.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str, f64)> {
        self.values.iter().flat_map(|(class, apps)| {
            apps.iter().map(move |(app, v)| (class.as_str(), app.as_str(), *v))
        })
    }
}

/// The forecast request count per timeslot for one application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workload {
    pub id: String,
    /// The app this workload belongs to.
    pub app: App,
    /// Length of one timeslot.
    pub time_unit: TimeUnit,
    /// One request count per timeslot.
    pub values: Vec<u64>,
    pub description: Option<String>,
    /// Tag describing how requests spread inside a slot; informational.
    pub intra_slot_distribution: Option<String>,
}

impl Workload {
    pub fn new(
        id: impl Into<String>,
        app: App,
        time_unit: TimeUnit,
        values: Vec<u64>,
    ) -> Self {
        Self {
            id: id.into(),
            app,
            time_unit,
            values,
            description: None,
            intra_slot_distribution: None,
        }
    }
}

/// A complete allocation problem: workloads, instance classes, the limiting
/// sets those classes reference, and the performance table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Problem {
    pub id: String,
    pub name: String,
    /// One workload per app; their order fixes the app axis everywhere.
    pub workloads: Vec<Workload>,
    pub instance_classes: Vec<InstanceClass>,
    /// Catalog of every limiting set referenced by the classes.
    pub limiting_sets: Vec<LimitingSet>,
    pub performances: PerformanceSet,
}

impl Problem {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        workloads: Vec<Workload>,
        instance_classes: Vec<InstanceClass>,
        limiting_sets: Vec<LimitingSet>,
        performances: PerformanceSet,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            workloads,
            instance_classes,
            limiting_sets,
            performances,
        }
    }

    /// Number of timeslots `T` in the planning horizon.
    pub fn num_timeslots(&self) -> usize {
        self.workloads.first().map_or(0, |w| w.values.len())
    }

    /// App ids in workload order; this order fixes the app axis of every
    /// load level and allocation tensor.
    pub fn app_ids(&self) -> Vec<&str> {
        self.workloads.iter().map(|w| w.app.id.as_str()).collect()
    }

    /// The common timeslot length of all workloads.
    pub fn timeslot_unit(&self) -> Option<TimeUnit> {
        self.workloads.first().map(|w| w.time_unit)
    }

    pub fn limiting_set(&self, id: &str) -> Option<&LimitingSet> {
        self.limiting_sets.iter().find(|s| s.id == id)
    }

    /// Performance of one VM of `class_id` running `app_id`, in the
    /// performance set's own time unit.
    pub fn performance(&self, class_id: &str, app_id: &str) -> Option<f64> {
        self.performances.get(class_id, app_id)
    }

    /// Check the structural invariants of the problem.
    ///
    /// This is the only failure class that is reported as an error; a
    /// problem that passes validation can always be formulated, even if the
    /// solver later finds it infeasible.
    pub fn validate(&self) -> CopaResult<()> {
        if self.workloads.is_empty() {
            return Err(CopaError::Validation(format!(
                "problem '{}' has no workloads",
                self.id
            )));
        }
        if self.instance_classes.is_empty() {
            return Err(CopaError::Validation(format!(
                "problem '{}' has no instance classes",
                self.id
            )));
        }

        let mut seen_apps = HashSet::new();
        for workload in &self.workloads {
            if !seen_apps.insert(workload.app.id.as_str()) {
                return Err(CopaError::Validation(format!(
                    "app '{}' appears in more than one workload of problem '{}'",
                    workload.app.id, self.id
                )));
            }
        }

        let first = &self.workloads[0];
        if first.values.is_empty() {
            return Err(CopaError::Validation(format!(
                "workload '{}' is empty",
                first.id
            )));
        }
        for workload in &self.workloads[1..] {
            if workload.values.len() != first.values.len() {
                return Err(CopaError::Validation(format!(
                    "workload '{}' has {} timeslots but workload '{}' has {}",
                    workload.id,
                    workload.values.len(),
                    first.id,
                    first.values.len()
                )));
            }
            if workload.time_unit != first.time_unit {
                return Err(CopaError::Validation(format!(
                    "workload '{}' uses time unit '{}' but workload '{}' uses '{}'",
                    workload.id, workload.time_unit, first.id, first.time_unit
                )));
            }
        }

        for ic in &self.instance_classes {
            if ic.cores <= 0.0 {
                return Err(CopaError::Validation(format!(
                    "instance class '{}' has non-positive cores",
                    ic.id
                )));
            }
            for set_id in &ic.limiting_sets {
                if self.limiting_set(set_id).is_none() {
                    return Err(CopaError::Validation(format!(
                        "instance class '{}' references unknown limiting set '{}'",
                        ic.id, set_id
                    )));
                }
            }
            for workload in &self.workloads {
                match self.performance(&ic.id, &workload.app.id) {
                    None => {
                        return Err(CopaError::Validation(format!(
                            "no performance entry for instance class '{}' and app '{}'",
                            ic.id, workload.app.id
                        )));
                    }
                    Some(v) if v < 0.0 => {
                        return Err(CopaError::Validation(format!(
                            "negative performance for instance class '{}' and app '{}'",
                            ic.id, workload.app.id
                        )));
                    }
                    Some(_) => {}
                }
            }
        }

        Ok(())
    }
}
