//! Serde model of problem and solution documents.
//!
//! Documents cross-reference entities by id. YAML authors may also use
//! anchors and aliases; the YAML parser expands an alias into a copy of the
//! anchored mapping, so every reference position accepts either a plain id
//! string or a full inline entity via [`DocRef`].

use copa_algo::{SolutionI, SolutionII};
use copa_core::{CopaError, CopaResult, TimeUnit};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Entities addressable by id inside a document.
pub trait HasId {
    fn doc_id(&self) -> &str;
}

/// A cross-reference: either an id naming an entity declared at top level,
/// or the entity itself (the shape an expanded YAML alias arrives in).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DocRef<T> {
    Id(String),
    Inline(T),
}

impl<T: HasId> DocRef<T> {
    /// The id this reference points at.
    pub fn id(&self) -> &str {
        match self {
            DocRef::Id(id) => id,
            DocRef::Inline(item) => item.doc_id(),
        }
    }

    /// Resolve against the top-level index; inline entities resolve to
    /// themselves.
    pub fn resolve<'a>(
        &'a self,
        index: &'a HashMap<String, T>,
        kind: &str,
    ) -> CopaResult<&'a T> {
        match self {
            DocRef::Inline(item) => Ok(item),
            DocRef::Id(id) => index.get(id).ok_or_else(|| {
                CopaError::Validation(format!("reference to unknown {kind} '{id}'"))
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppDoc {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LimitingSetDoc {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub max_vms: u64,
    #[serde(default)]
    pub max_cores: u64,
}

fn default_cores() -> f64 {
    1.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InstanceClassDoc {
    pub id: String,
    pub name: String,
    pub max_vms: u64,
    pub price: f64,
    pub time_unit: TimeUnit,
    pub is_reserved: bool,
    pub limiting_sets: Vec<DocRef<LimitingSetDoc>>,
    #[serde(default = "default_cores")]
    pub cores: f64,
    #[serde(default)]
    pub is_private: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PerformanceValueDoc {
    pub instance_class: DocRef<InstanceClassDoc>,
    pub app: DocRef<AppDoc>,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PerformanceSetDoc {
    pub id: String,
    pub time_unit: TimeUnit,
    pub values: Vec<PerformanceValueDoc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WorkloadDoc {
    pub id: String,
    pub app: DocRef<AppDoc>,
    pub time_unit: TimeUnit,
    /// Inline request counts. Exactly one of `values` and `filename`.
    #[serde(default)]
    pub values: Option<Vec<u64>>,
    /// File with one request count per line, relative to the document.
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub intra_slot_distribution: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProblemDoc {
    pub id: String,
    pub name: String,
    pub workloads: Vec<DocRef<WorkloadDoc>>,
    pub instance_classes: Vec<DocRef<InstanceClassDoc>>,
    pub performances: DocRef<PerformanceSetDoc>,
}

/// A solution entry; the two phases are told apart by their fields
/// (a period solution carries `previous_phase` and per-slot stats).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SolutionDoc {
    PhaseII(SolutionII),
    PhaseI(SolutionI),
}

impl SolutionDoc {
    pub fn id(&self) -> &str {
        match self {
            SolutionDoc::PhaseII(s) => &s.id,
            SolutionDoc::PhaseI(s) => &s.id,
        }
    }
}

/// A whole document. Problem and solution documents share this shape;
/// sections that are absent stay empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(rename = "Apps", default, skip_serializing_if = "Vec::is_empty")]
    pub apps: Vec<AppDoc>,
    #[serde(rename = "Limiting_sets", default, skip_serializing_if = "Vec::is_empty")]
    pub limiting_sets: Vec<LimitingSetDoc>,
    #[serde(rename = "Instance_classes", default, skip_serializing_if = "Vec::is_empty")]
    pub instance_classes: Vec<InstanceClassDoc>,
    #[serde(rename = "Performances", default, skip_serializing_if = "Vec::is_empty")]
    pub performances: Vec<PerformanceSetDoc>,
    #[serde(rename = "Workloads", default, skip_serializing_if = "Vec::is_empty")]
    pub workloads: Vec<WorkloadDoc>,
    #[serde(rename = "Problems", default, skip_serializing_if = "Vec::is_empty")]
    pub problems: Vec<ProblemDoc>,
    #[serde(rename = "Solutions", default, skip_serializing_if = "Vec::is_empty")]
    pub solutions: Vec<SolutionDoc>,
}

macro_rules! impl_has_id {
    ($($ty:ty),*) => {
        $(impl HasId for $ty {
            fn doc_id(&self) -> &str {
                &self.id
            }
        })*
    };
}

impl_has_id!(
    AppDoc,
    LimitingSetDoc,
    InstanceClassDoc,
    PerformanceSetDoc,
    WorkloadDoc,
    ProblemDoc
);

/// Index a document section by id, rejecting duplicates.
pub(crate) fn index_by_id<T: HasId + Clone>(
    items: &[T],
    kind: &str,
) -> CopaResult<HashMap<String, T>> {
    let mut index = HashMap::with_capacity(items.len());
    for item in items {
        if index.insert(item.doc_id().to_string(), item.clone()).is_some() {
            return Err(CopaError::Validation(format!(
                "duplicate {kind} id '{}'",
                item.doc_id()
            )));
        }
    }
    Ok(index)
}
