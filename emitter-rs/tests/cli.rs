//! CLI integration tests for emitter-rs

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

fn emitter_rs() -> Command {
    Command::cargo_bin("emitter-rs").unwrap()
}

fn bundled(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("scenarios")
        .join(name)
}

#[test]
fn simulate_bundled_yaml() {
    emitter_rs()
        .args(["simulate", "--steps", "20"])
        .arg(bundled("fountain.yaml"))
        .assert()
        .success()
        .stdout(predicate::str::contains("Simulation Summary"))
        .stdout(predicate::str::contains("Total emitted"));
}

#[test]
fn simulate_json_output() {
    let output = emitter_rs()
        .args(["simulate", "--steps", "3", "--json"])
        .arg(bundled("sand_burst.json"))
        .output()
        .unwrap();
    assert!(output.status.success());

    let summary: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(summary["steps"], 3);
    assert!(summary["emitter"]["total_emitted"].as_u64().unwrap() > 0);
}

#[test]
fn simulate_single_slot_scenario() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("single.yaml");
    fs::write(
        &path,
        "solver:\n  fixed_step: 1.0\n  gravity: [0.0, 0.0, 0.0]\nemitter:\n  capacity: 1\n  speed: 0.1\n  lifespan: 2.0\n",
    )
    .unwrap();

    let output = emitter_rs()
        .args(["simulate", "--steps", "3", "--json"])
        .arg(&path)
        .output()
        .unwrap();
    assert!(output.status.success());

    let summary: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(summary["emitter"]["total_emitted"], 2);
    assert_eq!(summary["emitter"]["total_killed"], 1);
    assert_eq!(summary["emitter"]["total_refused"], 1);
    assert_eq!(summary["emitter"]["active"], 1);
}

#[test]
fn inspect_reports_both_modes() {
    emitter_rs()
        .arg("inspect")
        .arg(bundled("sand_burst.json"))
        .assert()
        .success()
        .stdout(predicate::str::contains("Mode2D"))
        .stdout(predicate::str::contains("Mode3D"))
        .stdout(predicate::str::contains("granular"));
}

#[test]
fn unsupported_extension_fails() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("scenario.toml");
    fs::write(&path, "").unwrap();

    emitter_rs()
        .arg("simulate")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unsupported scenario format"));
}

#[test]
fn oversized_emitter_fails() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("big.json");
    fs::write(&path, r#"{"solver_capacity": 4, "emitter": {"capacity": 8}}"#).unwrap();

    emitter_rs()
        .arg("simulate")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("exceeds solver capacity"));
}

#[test]
fn completions_generate() {
    emitter_rs()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("emitter-rs"));
}
