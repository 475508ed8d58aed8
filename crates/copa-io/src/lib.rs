//! # copa-io: Problem and Solution Documents
//!
//! YAML documents describing allocation problems (apps, limiting sets,
//! instance classes, performances, workloads) and the solutions the solvers
//! produce. Cross-references use ids or native YAML anchors/aliases;
//! gzip-compressed documents are accepted transparently.
//!
//! - [`reader`] loads documents and resolves them into `copa_core::Problem`s
//! - [`solutions`] writes and reads solution documents
//! - [`validate`] checks documents without solving

pub mod document;
pub mod reader;
pub mod solutions;
pub mod validate;

pub use document::{Document, SolutionDoc};
pub use reader::{build_problems, load_document, load_problems, parse_document, read_to_string};
pub use solutions::{read_solutions, solutions_to_yaml, write_solutions};
pub use validate::{validate_document, validate_path, DocumentSummary};
