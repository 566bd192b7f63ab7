//! Integration tests for the `ccsync` binary.
//!
//! Argument parsing, offline planning, and error exits. None of these
//! reach a controller.
#![allow(clippy::unwrap_used)]

use std::path::{Path, PathBuf};

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `ccsync` binary with env isolation.
///
/// Clears all `CCSYNC_*` env vars, points config directories at a
/// nonexistent path, and runs from an empty directory so no stray
/// `CC_Env.yml` is picked up.
fn ccsync_cmd(cwd: &Path) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("ccsync");
    cmd.current_dir(cwd)
        .env("HOME", "/tmp/ccsync-test-nonexistent")
        .env("XDG_CONFIG_HOME", "/tmp/ccsync-test-nonexistent")
        .env_remove("RUST_LOG")
        .env_remove("CCSYNC_PROFILE")
        .env_remove("CCSYNC_CONTROLLER")
        .env_remove("CCSYNC_USERNAME")
        .env_remove("CCSYNC_PASSWORD")
        .env_remove("CCSYNC_OUTPUT")
        .env_remove("CCSYNC_INSECURE")
        .env_remove("CCSYNC_TIMEOUT")
        .env_remove("CCSYNC_TASK_TIMEOUT");
    cmd
}

fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

const MANIFEST: &str = "\
pools:
  - name: US_CORP
    cidr: 10.201.0.0/16
    gateway: 10.201.0.1
sites:
  - { kind: area, name: US, parent: Global }
  - { kind: building, name: HQ, parent: Global/US, latitude: 34.1, longitude: -118.3 }
  - { kind: floor, name: F1, parent: Global/US/HQ, floor_number: 1 }
reservations:
  - { name: HQ_CORP, pool: US_CORP, site: Global/US/HQ, subnet: 10.201.1.0, prefix_length: 24 }
";

fn write_manifest(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let dir = tempfile::tempdir().unwrap();
    let output = ccsync_cmd(dir.path()).output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("Usage"));
}

#[test]
fn test_help_lists_verbs() {
    let dir = tempfile::tempdir().unwrap();
    ccsync_cmd(dir.path()).arg("--help").assert().success().stdout(
        predicate::str::contains("create")
            .and(predicate::str::contains("delete"))
            .and(predicate::str::contains("status"))
            .and(predicate::str::contains("plan")),
    );
}

#[test]
fn test_version_flag() {
    let dir = tempfile::tempdir().unwrap();
    ccsync_cmd(dir.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("ccsync"));
}

#[test]
fn test_completions_zsh() {
    let dir = tempfile::tempdir().unwrap();
    ccsync_cmd(dir.path())
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#compdef"));
}

// ── Offline planning ────────────────────────────────────────────────

#[test]
fn test_plan_orders_parents_first() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = write_manifest(dir.path(), "desired.yaml", MANIFEST);

    let output = ccsync_cmd(dir.path())
        .args(["-o", "plain", "plan"])
        .arg(&manifest)
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", combined_output(&output));
    let stdout = String::from_utf8(output.stdout).unwrap();
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(
        lines,
        [
            "create US_CORP",
            "create Global/US",
            "create Global/US/HQ",
            "create Global/US/HQ/F1",
            "create Global/US/HQ :: HQ_CORP",
        ]
    );
}

#[test]
fn test_plan_delete_is_reversed() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = write_manifest(dir.path(), "desired.yaml", MANIFEST);

    let output = ccsync_cmd(dir.path())
        .args(["-o", "plain", "plan", "--delete"])
        .arg(&manifest)
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", combined_output(&output));
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert_eq!(stdout.lines().next(), Some("delete Global/US/HQ :: HQ_CORP"));
    assert_eq!(stdout.lines().last(), Some("delete US_CORP"));
}

#[test]
fn test_plan_json_output() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = write_manifest(dir.path(), "desired.yaml", MANIFEST);

    let output = ccsync_cmd(dir.path())
        .args(["-o", "json", "plan"])
        .arg(&manifest)
        .output()
        .unwrap();
    assert!(output.status.success());
    let steps: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(steps.as_array().map(Vec::len), Some(5));
    assert_eq!(steps[0]["operation"], "create");
    assert_eq!(steps[0]["key"]["type"], "pool");
}

#[test]
fn test_plan_demo_inventory() {
    let dir = tempfile::tempdir().unwrap();
    let demo = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../demos/desired.yaml");

    let output = ccsync_cmd(dir.path())
        .args(["-o", "plain", "plan"])
        .arg(&demo)
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", combined_output(&output));
    let stdout = String::from_utf8(output.stdout).unwrap();
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 35);
    let position = |line: &str| lines.iter().position(|l| *l == line).unwrap();
    assert!(
        position("create Global/United States/Golden Hills Campus/Sunset Tower")
            < position("create Global/United States/Golden Hills Campus/Sunset Tower :: ST_CORP")
    );
}

#[test]
fn test_plan_rejects_dangling_parent() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = write_manifest(
        dir.path(),
        "dangling.yaml",
        "sites:\n  - { kind: floor, name: F1, parent: Global/US/Nowhere, floor_number: 1 }\n",
    );

    let output = ccsync_cmd(dir.path())
        .arg("plan")
        .arg(&manifest)
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("invalid_desired_state"));
}

#[test]
fn test_plan_missing_manifest() {
    let dir = tempfile::tempdir().unwrap();
    let output = ccsync_cmd(dir.path())
        .args(["plan", "does-not-exist.yaml"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("ccsync::manifest"));
}

// ── Controller-bound commands without a controller ──────────────────

#[test]
fn test_status_without_config() {
    let dir = tempfile::tempdir().unwrap();
    let output = ccsync_cmd(dir.path()).arg("status").output().unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(combined_output(&output).contains("No controller configured"));
}

#[test]
fn test_unknown_profile() {
    let dir = tempfile::tempdir().unwrap();
    let output = ccsync_cmd(dir.path())
        .args(["-p", "nope", "status"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(combined_output(&output).contains("profile_not_found"));
}

#[test]
fn test_incomplete_credential_file() {
    let dir = tempfile::tempdir().unwrap();
    let creds = write_manifest(dir.path(), "CC_Env.yml", "CC_IP: 10.10.20.85\n");

    let output = ccsync_cmd(dir.path())
        .arg("--config")
        .arg(&creds)
        .arg("status")
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("CC_PASSWORD"));
}

#[test]
fn test_delete_requires_confirmation_when_not_interactive() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = write_manifest(dir.path(), "desired.yaml", MANIFEST);

    let output = ccsync_cmd(dir.path())
        .args(["-c", "127.0.0.1:1", "-u", "admin", "--password", "pw", "delete"])
        .arg(&manifest)
        .write_stdin("")
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("confirmation_required"));
}

#[test]
fn test_invalid_output_format() {
    let dir = tempfile::tempdir().unwrap();
    let output = ccsync_cmd(dir.path())
        .args(["-o", "xml", "status"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
}
