//! Smoke tests for the jsonwright CLI
//!
//! None of these launch a browser.

#![allow(deprecated)] // Allow deprecated Command::cargo_bin until assert_cmd is updated
#![allow(clippy::expect_used, clippy::unwrap_used)]

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// Get a command for the jsonwright binary with a clean environment
fn jsonwright() -> Command {
    let mut cmd = Command::cargo_bin("jsonwright").expect("jsonwright binary should exist");
    for var in [
        "JSONWRIGHT_BASE_URL",
        "JSONWRIGHT_BASE_URL_OVERRIDE",
        "JSONWRIGHT_ALLOW_NOOP",
        "JSONWRIGHT_FUNCTIONS",
        "JSONWRIGHT_LOCALE",
        "JSONWRIGHT_SEED",
        "RUST_LOG",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

// ============================================================================
// Basic CLI Tests
// ============================================================================

#[test]
fn test_version_flag() {
    jsonwright()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_help_flag() {
    jsonwright()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("check"))
        .stdout(predicate::str::contains("init"));
}

#[test]
fn test_run_help_lists_options() {
    jsonwright()
        .args(["run", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--base-url"))
        .stdout(predicate::str::contains("--allow-noop"))
        .stdout(predicate::str::contains("--functions"));
}

#[test]
fn test_missing_subcommand_fails() {
    jsonwright().assert().failure();
}

// ============================================================================
// Init
// ============================================================================

#[test]
fn test_init_scaffolds_project() {
    let temp = TempDir::new().unwrap();
    jsonwright()
        .arg("init")
        .arg(temp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Created"));

    assert!(temp.path().join("fixtures/example.json").is_file());
    assert!(temp.path().join("hooks/before-example.json").is_file());
    assert!(temp.path().join("help/plugin-func.yaml").is_file());

    jsonwright()
        .arg("init")
        .arg(temp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Nothing to do"));
}

// ============================================================================
// Check
// ============================================================================

#[test]
fn test_check_scaffold_with_base_url() {
    let temp = TempDir::new().unwrap();
    jsonwright().arg("init").arg(temp.path()).assert().success();

    jsonwright()
        .args(["--color", "never", "check"])
        .arg(temp.path().join("fixtures"))
        .args(["--base-url", "http://localhost:3000"])
        .assert()
        .success()
        .stderr(predicate::str::contains("example.json (2 cases)"));
}

#[test]
fn test_check_reports_relative_url_without_base() {
    let temp = TempDir::new().unwrap();
    jsonwright().arg("init").arg(temp.path()).assert().success();

    jsonwright()
        .args(["--color", "never", "check"])
        .arg(temp.path().join("fixtures"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("problem(s) found"));
}

#[test]
fn test_check_invalid_document() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("broken.json"), "{ not json").unwrap();

    jsonwright()
        .arg("check")
        .arg(temp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("broken.json"));
}

#[test]
fn test_check_empty_dir() {
    let temp = TempDir::new().unwrap();
    jsonwright()
        .arg("check")
        .arg(temp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("No specification documents"));

    jsonwright()
        .arg("check")
        .arg(temp.path())
        .arg("--allow-noop")
        .assert()
        .success();
}

// ============================================================================
// Run
// ============================================================================

#[test]
fn test_run_empty_dir_with_allow_noop() {
    let temp = TempDir::new().unwrap();
    jsonwright()
        .arg("run")
        .arg(temp.path())
        .args(["--allow-noop", "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"skipped\": 1"));
}

#[test]
fn test_run_missing_dir_fails() {
    let temp = TempDir::new().unwrap();
    jsonwright()
        .arg("run")
        .arg(temp.path().join("nope"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn test_run_rejects_unknown_locale() {
    let temp = TempDir::new().unwrap();
    jsonwright()
        .arg("run")
        .arg(temp.path())
        .args(["--allow-noop", "--locale", "fr-FR"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unsupported locale"));
}
