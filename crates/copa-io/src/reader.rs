//! Loading problem documents and resolving them into domain problems.

use crate::document::{index_by_id, Document, ProblemDoc, WorkloadDoc};
use copa_core::{
    App, CopaError, CopaResult, InstanceClass, LimitingSet, PerformanceSet, Problem, Workload,
};
use flate2::read::GzDecoder;
use std::collections::BTreeMap;
use std::fs;
use std::io::Read;
use std::path::Path;
use tracing::debug;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Read a document file into a string, transparently decompressing gzip.
pub fn read_to_string(path: &Path) -> CopaResult<String> {
    let bytes = fs::read(path)?;
    if bytes.starts_with(&GZIP_MAGIC) {
        debug!(path = %path.display(), "decompressing gzip document");
        let mut text = String::new();
        GzDecoder::new(bytes.as_slice()).read_to_string(&mut text)?;
        Ok(text)
    } else {
        String::from_utf8(bytes)
            .map_err(|e| CopaError::Parse(format!("{}: not valid UTF-8: {e}", path.display())))
    }
}

/// Parse document text.
pub fn parse_document(text: &str) -> CopaResult<Document> {
    serde_yaml::from_str(text).map_err(|e| CopaError::Parse(e.to_string()))
}

/// Read and parse a document file.
pub fn load_document(path: &Path) -> CopaResult<Document> {
    let text = read_to_string(path)?;
    parse_document(&text)
}

/// Resolve every problem in a document into a validated [`Problem`].
///
/// `base_dir` anchors workload `filename` references; pass the document's
/// directory.
pub fn build_problems(doc: &Document, base_dir: Option<&Path>) -> CopaResult<Vec<Problem>> {
    let apps = index_by_id(&doc.apps, "app")?;
    let limiting_sets = index_by_id(&doc.limiting_sets, "limiting set")?;
    let instance_classes = index_by_id(&doc.instance_classes, "instance class")?;
    let performances = index_by_id(&doc.performances, "performance set")?;
    let workloads = index_by_id(&doc.workloads, "workload")?;
    index_by_id(&doc.problems, "problem")?;

    doc.problems
        .iter()
        .map(|problem_doc| {
            let problem = build_problem(
                problem_doc,
                &apps,
                &limiting_sets,
                &instance_classes,
                &performances,
                &workloads,
                base_dir,
            )?;
            problem.validate()?;
            Ok(problem)
        })
        .collect()
}

/// Load a document and resolve all its problems.
pub fn load_problems(path: &Path) -> CopaResult<Vec<Problem>> {
    let doc = load_document(path)?;
    build_problems(&doc, path.parent())
}

#[allow(clippy::too_many_arguments)]
fn build_problem(
    doc: &ProblemDoc,
    apps: &std::collections::HashMap<String, crate::document::AppDoc>,
    limiting_sets: &std::collections::HashMap<String, crate::document::LimitingSetDoc>,
    instance_classes: &std::collections::HashMap<String, crate::document::InstanceClassDoc>,
    performances: &std::collections::HashMap<String, crate::document::PerformanceSetDoc>,
    workloads: &std::collections::HashMap<String, WorkloadDoc>,
    base_dir: Option<&Path>,
) -> CopaResult<Problem> {
    // Workloads, with their app references checked.
    let mut core_workloads = Vec::with_capacity(doc.workloads.len());
    for workload_ref in &doc.workloads {
        let workload_doc = workload_ref.resolve(workloads, "workload")?;
        let app = workload_ref_app(workload_doc, apps)?;
        let values = workload_values(workload_doc, base_dir)?;
        let mut workload = Workload::new(
            workload_doc.id.clone(),
            app,
            workload_doc.time_unit,
            values,
        );
        workload.description = workload_doc.description.clone();
        workload.intra_slot_distribution = workload_doc.intra_slot_distribution.clone();
        core_workloads.push(workload);
    }

    // Instance classes, collecting the limiting sets they reference.
    let mut core_classes = Vec::with_capacity(doc.instance_classes.len());
    let mut catalog: BTreeMap<String, LimitingSet> = BTreeMap::new();
    for class_ref in &doc.instance_classes {
        let class_doc = class_ref.resolve(instance_classes, "instance class")?;
        let mut set_ids = Vec::with_capacity(class_doc.limiting_sets.len());
        for set_ref in &class_doc.limiting_sets {
            let set_doc = set_ref.resolve(limiting_sets, "limiting set")?;
            set_ids.push(set_doc.id.clone());
            catalog.entry(set_doc.id.clone()).or_insert_with(|| LimitingSet {
                id: set_doc.id.clone(),
                name: set_doc.name.clone().unwrap_or_else(|| set_doc.id.clone()),
                max_vms: set_doc.max_vms,
                max_cores: set_doc.max_cores,
            });
        }
        let mut class = InstanceClass::new(
            class_doc.id.clone(),
            class_doc.name.clone(),
            class_doc.price,
            class_doc.time_unit,
            class_doc.is_reserved,
        )
        .with_cores(class_doc.cores)
        .with_max_vms(class_doc.max_vms)
        .with_limiting_sets(set_ids);
        if class_doc.is_private {
            class = class.private();
        }
        core_classes.push(class);
    }

    // Performance table.
    let perf_doc = doc.performances.resolve(performances, "performance set")?;
    let mut perf = PerformanceSet::new(perf_doc.id.clone(), perf_doc.time_unit);
    for entry in &perf_doc.values {
        if entry.value < 0.0 {
            return Err(CopaError::Validation(format!(
                "negative performance value for ('{}', '{}')",
                entry.instance_class.id(),
                entry.app.id()
            )));
        }
        perf.set(entry.instance_class.id(), entry.app.id(), entry.value);
    }

    Ok(Problem::new(
        doc.id.clone(),
        doc.name.clone(),
        core_workloads,
        core_classes,
        catalog.into_values().collect(),
        perf,
    ))
}

fn workload_ref_app(
    workload: &WorkloadDoc,
    apps: &std::collections::HashMap<String, crate::document::AppDoc>,
) -> CopaResult<App> {
    let app = workload.app.resolve(apps, "app")?;
    Ok(App::new(app.id.clone(), app.name.clone()))
}

/// Inline values or one integer per line of the referenced file; exactly one
/// of the two must be present.
fn workload_values(workload: &WorkloadDoc, base_dir: Option<&Path>) -> CopaResult<Vec<u64>> {
    match (&workload.values, &workload.filename) {
        (Some(values), None) => Ok(values.clone()),
        (None, Some(filename)) => {
            let path = match base_dir {
                Some(dir) => dir.join(filename),
                None => Path::new(filename).to_path_buf(),
            };
            let text = fs::read_to_string(&path)?;
            text.lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(|line| {
                    line.parse::<u64>().map_err(|_| {
                        CopaError::Parse(format!(
                            "workload file '{}': invalid value '{line}'",
                            path.display()
                        ))
                    })
                })
                .collect()
        }
        (Some(_), Some(_)) => Err(CopaError::Validation(format!(
            "workload '{}' declares both values and filename",
            workload.id
        ))),
        (None, None) => Err(CopaError::Validation(format!(
            "workload '{}' declares neither values nor filename",
            workload.id
        ))),
    }
}
