//! Document validation without solving.

use crate::document::Document;
use crate::reader::{build_problems, load_document};
use copa_core::CopaResult;
use std::path::Path;

/// What a validated document contains.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentSummary {
    pub apps: usize,
    pub limiting_sets: usize,
    pub instance_classes: usize,
    pub performances: usize,
    pub workloads: usize,
    pub problems: usize,
    pub solutions: usize,
}

/// Check a parsed document: unique ids, resolvable references, workload
/// files readable, and every problem structurally sound.
pub fn validate_document(doc: &Document, base_dir: Option<&Path>) -> CopaResult<DocumentSummary> {
    build_problems(doc, base_dir)?;
    Ok(DocumentSummary {
        apps: doc.apps.len(),
        limiting_sets: doc.limiting_sets.len(),
        instance_classes: doc.instance_classes.len(),
        performances: doc.performances.len(),
        workloads: doc.workloads.len(),
        problems: doc.problems.len(),
        solutions: doc.solutions.len(),
    })
}

/// Load and validate a document file.
pub fn validate_path(path: &Path) -> CopaResult<DocumentSummary> {
    let doc = load_document(path)?;
    validate_document(&doc, path.parent())
}
