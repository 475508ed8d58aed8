//! Writing and reading solution documents.

use crate::document::{Document, SolutionDoc};
use crate::reader::{parse_document, read_to_string};
use copa_core::{CopaError, CopaResult};
use std::fs;
use std::path::Path;

/// Render solutions as a YAML document.
pub fn solutions_to_yaml(solutions: &[SolutionDoc]) -> CopaResult<String> {
    let doc = Document {
        solutions: solutions.to_vec(),
        ..Document::default()
    };
    serde_yaml::to_string(&doc).map_err(|e| CopaError::Parse(e.to_string()))
}

/// Write solutions to a YAML file.
pub fn write_solutions(path: &Path, solutions: &[SolutionDoc]) -> CopaResult<()> {
    let yaml = solutions_to_yaml(solutions)?;
    fs::write(path, yaml)?;
    Ok(())
}

/// Read the solutions of a document file.
pub fn read_solutions(path: &Path) -> CopaResult<Vec<SolutionDoc>> {
    let doc = parse_document(&read_to_string(path)?)?;
    Ok(doc.solutions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use copa_algo::{
        AllocationInfo, AlgorithmInfo, GlobalSolvingStats, ReservedAllocation, SolutionI,
        SolutionII, SolvingStats, Status,
    };
    use tempfile::tempdir;

    fn stats(status: Status, cost: Option<f64>) -> SolvingStats {
        SolvingStats {
            creation_time: 0.01,
            solving_time: 0.2,
            optimal_cost: cost,
            algorithm: AlgorithmInfo {
                name: "copa-milp".into(),
                status,
                frac_gap: None,
                max_seconds: Some(60.0),
                threads: 1,
                gcd_multiplier: 1,
            },
        }
    }

    fn reservation_solution() -> SolutionI {
        SolutionI {
            id: "problem1-phase-i".into(),
            problem: "problem1".into(),
            solving_stats: stats(Status::Optimal, Some(178.0)),
            reserved_allocation: Some(ReservedAllocation {
                instance_classes: vec!["m3large_r".into()],
                vms_number: vec![6],
            }),
            allocation: Some(AllocationInfo {
                units: "vms".into(),
                apps: vec!["a0".into(), "a1".into()],
                instance_classes: vec!["m3large".into(), "m3large_r".into()],
                load_levels: Some(vec![vec![30, 1003], vec![30, 1194], vec![32, 1200]]),
                repeats: Some(vec![2, 1, 1]),
                values: vec![
                    vec![vec![0, 0], vec![3, 3]],
                    vec![vec![0, 0], vec![3, 3]],
                    vec![vec![1, 0], vec![3, 3]],
                ],
            }),
        }
    }

    fn period_solution() -> SolutionII {
        let per_slot = vec![stats(Status::Optimal, Some(42.0)); 4];
        SolutionII {
            id: "problem1-phase-ii".into(),
            problem: "problem1".into(),
            previous_phase: "problem1-phase-i".into(),
            global_solving_stats: GlobalSolvingStats::aggregate(&per_slot),
            solving_stats: per_slot,
            allocation: AllocationInfo {
                units: "vms".into(),
                apps: vec!["a0".into(), "a1".into()],
                instance_classes: vec!["m3large".into(), "m3large_r".into()],
                load_levels: None,
                repeats: None,
                values: vec![vec![vec![0, 0], vec![3, 3]]; 4],
            },
        }
    }

    #[test]
    fn test_roundtrip_both_phases() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("solutions.yaml");
        let written = vec![
            SolutionDoc::PhaseI(reservation_solution()),
            SolutionDoc::PhaseII(period_solution()),
        ];

        write_solutions(&path, &written).unwrap();
        let read = read_solutions(&path).unwrap();
        assert_eq!(read, written);

        // the discriminator is structural
        assert!(matches!(read[0], SolutionDoc::PhaseI(_)));
        assert!(matches!(read[1], SolutionDoc::PhaseII(_)));
    }

    #[test]
    fn test_status_written_in_document_vocabulary() {
        let yaml = solutions_to_yaml(&[SolutionDoc::PhaseI(SolutionI {
            solving_stats: stats(Status::IntegerInfeasible, None),
            reserved_allocation: None,
            allocation: None,
            ..reservation_solution()
        })])
        .unwrap();
        assert!(yaml.contains("integer_infeasible"));
        assert!(yaml.contains("Solutions"));
    }
}
