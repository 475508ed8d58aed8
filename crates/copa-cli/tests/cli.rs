//! CLI integration tests: exit codes and end-to-end solve output.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::tempdir;

const PROBLEM_DOC: &str = r#"
Apps:
  - {id: a0, name: Web server}
  - {id: a1, name: Database}
Limiting_sets:
  - {id: cloud1, name: Cloud1}
  - {id: cloudr, name: CloudR, max_vms: 20}
Instance_classes:
  - id: m3large
    name: m3large
    max_vms: 0
    price: 10
    time_unit: h
    is_reserved: false
    limiting_sets: [cloud1]
  - id: m3large_r
    name: m3large reserved
    max_vms: 0
    price: 7
    time_unit: h
    is_reserved: true
    limiting_sets: [cloudr]
Performances:
  - id: perf1
    time_unit: h
    values:
      - {instance_class: m3large, app: a0, value: 10}
      - {instance_class: m3large, app: a1, value: 500}
      - {instance_class: m3large_r, app: a0, value: 10}
      - {instance_class: m3large_r, app: a1, value: 500}
Workloads:
  - {id: w0, app: a0, time_unit: h, values: [30, 32, 30, 30]}
  - {id: w1, app: a1, time_unit: h, values: [1003, 1200, 1194, 1003]}
Problems:
  - id: problem1
    name: Minimal problem
    workloads: [w0, w1]
    instance_classes: [m3large, m3large_r]
    performances: perf1
"#;

fn copa() -> Command {
    Command::cargo_bin("copa").unwrap()
}

#[test]
fn test_validate_accepts_good_document() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("problems.yaml");
    fs::write(&path, PROBLEM_DOC).unwrap();

    copa()
        .args(["validate", path.to_str().unwrap(), "--verbose"])
        .assert()
        .success()
        .stdout(predicate::str::contains("OK"))
        .stdout(predicate::str::contains("problems:         1"));
}

#[test]
fn test_validate_rejects_bad_document() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("problems.yaml");
    fs::write(&path, PROBLEM_DOC.replace("workloads: [w0, w1]", "workloads: [w0, nope]"))
        .unwrap();

    copa()
        .args(["validate", path.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown workload"));
}

#[test]
fn test_solve_writes_solution_document() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("problems.yaml");
    let out = dir.path().join("solutions.yaml");
    fs::write(&path, PROBLEM_DOC).unwrap();

    copa()
        .args([
            "solve",
            path.to_str().unwrap(),
            "--phase-i-id",
            "problem1",
            "--phase-ii-id",
            "problem1",
            "--output",
            out.to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("phase I 'problem1': status optimal, cost 178.00"))
        .stdout(predicate::str::contains("phase II 'problem1': status optimal, cost 178.00"));

    let solutions = copa_io::read_solutions(&out).unwrap();
    assert_eq!(solutions.len(), 2);
    assert!(matches!(solutions[0], copa_io::SolutionDoc::PhaseI(_)));
    assert!(matches!(solutions[1], copa_io::SolutionDoc::PhaseII(_)));
}

#[test]
fn test_solve_unknown_problem_id_fails() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("problems.yaml");
    fs::write(&path, PROBLEM_DOC).unwrap();

    copa()
        .args(["solve", path.to_str().unwrap(), "--phase-i-id", "nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no problem with id 'nope'"));
}
