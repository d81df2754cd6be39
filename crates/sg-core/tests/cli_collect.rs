//! CLI E2E tests for the sysgather binary.
//!
//! Validates:
//! - `plugins` lists the built-in plugin set with options
//! - `check` falls back to defaults when no config exists
//! - `collect --batch` produces a staging tree with a manifest
//! - Malformed config files and option overrides produce config errors

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::time::Duration;
use tempfile::tempdir;

/// Get a Command for the sysgather binary.
fn sysgather() -> Command {
    let mut cmd = Command::cargo_bin("sysgather").expect("binary built");
    cmd.timeout(Duration::from_secs(60));
    cmd
}

#[test]
fn plugins_lists_builtins_and_options() {
    sysgather()
        .arg("plugins")
        .assert()
        .success()
        .stdout(predicate::str::contains("gluster (profiles: storage, virt)"))
        .stdout(predicate::str::contains("navicli (profiles: storage, hardware)"))
        .stdout(predicate::str::contains("gluster.dump"))
        .stdout(predicate::str::contains("navicli.ipaddrs"));
}

#[test]
fn check_with_missing_config_uses_defaults() {
    let dir = tempdir().unwrap();
    sysgather()
        .args(["--config"])
        .arg(dir.path().join("absent.json"))
        .arg("check")
        .assert()
        .success()
        .stdout(predicate::str::contains("Defaults"));
}

#[test]
fn check_with_malformed_config_is_a_config_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(&path, "{ nope").unwrap();
    sysgather()
        .arg("--config")
        .arg(&path)
        .arg("check")
        .assert()
        .failure()
        .code(10);
}

#[test]
fn collect_batch_writes_a_manifest() {
    let staging = tempdir().unwrap();
    sysgather()
        .args(["collect", "--batch", "--staging-dir"])
        .arg(staging.path())
        .assert()
        .success();

    let manifest: Value =
        serde_json::from_slice(&std::fs::read(staging.path().join("manifest.json")).unwrap())
            .unwrap();
    assert_eq!(manifest["schema_version"], "1.0.0");
    assert_eq!(manifest["summary"]["plugins_considered"], 2);
    assert!(manifest["run_id"].as_str().unwrap().starts_with("run-"));
}

#[test]
fn collect_reports_summary_on_stdout() {
    let staging = tempdir().unwrap();
    sysgather()
        .args(["collect", "--batch", "--staging-dir"])
        .arg(staging.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("collected"))
        .stdout(predicate::str::contains("skipped"));
}

#[test]
fn malformed_plugin_option_is_a_config_error() {
    let staging = tempdir().unwrap();
    sysgather()
        .args(["collect", "--batch", "--staging-dir"])
        .arg(staging.path())
        .args(["-k", "glusterdump"])
        .assert()
        .failure()
        .code(10);
}

#[test]
fn option_for_unknown_plugin_is_a_config_error() {
    let staging = tempdir().unwrap();
    sysgather()
        .args(["collect", "--batch", "--staging-dir"])
        .arg(staging.path())
        .args(["-k", "ghost.dump=true"])
        .assert()
        .failure()
        .code(10);
}

#[test]
fn skip_for_unknown_plugin_is_a_config_error() {
    let staging = tempdir().unwrap();
    sysgather()
        .args(["collect", "--batch", "--staging-dir"])
        .arg(staging.path())
        .args(["--skip", "ghost"])
        .assert()
        .failure()
        .code(10);
}
