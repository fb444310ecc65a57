//! Smoke tests for the gocov CLI

#![allow(deprecated)] // Command::cargo_bin
#![allow(clippy::expect_used, clippy::unwrap_used)]

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

const SOURCE: &str = "package calc

func Div(a, b int) int {
	if b == 0 {
		// notest
		panic(\"division by zero\")
	}
	if a < 0 {
		return -(-a / b)
	}
	return a / b
}
";

const COVERED: &str = "mode: set
example.com/calc/calc.go:3.24,4.12 1 1
example.com/calc/calc.go:4.12,7.3 1 0
example.com/calc/calc.go:8.2,8.11 1 1
example.com/calc/calc.go:8.11,10.3 1 1
example.com/calc/calc.go:11.2,11.14 1 1
";

const GAP: &str = "mode: set
example.com/calc/calc.go:3.24,4.12 1 1
example.com/calc/calc.go:4.12,7.3 1 0
example.com/calc/calc.go:8.2,8.11 1 1
example.com/calc/calc.go:8.11,10.3 1 0
example.com/calc/calc.go:11.2,11.14 1 1
";

/// Get a command for the gocov binary
fn gocov() -> Command {
    Command::cargo_bin("gocov").expect("gocov binary should exist")
}

fn module(profile: &str) -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("go.mod"), "module example.com/calc\n").unwrap();
    fs::write(dir.path().join("calc.go"), SOURCE).unwrap();
    fs::create_dir(dir.path().join("cover")).unwrap();
    fs::write(dir.path().join("cover/calc.out"), profile).unwrap();
    dir
}

// ============================================================================
// Basic CLI Tests
// ============================================================================

#[test]
fn test_version_flag() {
    gocov()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_help_flag() {
    gocov()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("excluded"))
        .stdout(predicate::str::contains("scan"));
}

#[test]
fn test_no_args_fails() {
    gocov().assert().failure();
}

#[test]
fn test_excluded_rejects_unknown_marker() {
    gocov()
        .args(["excluded", "never"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("notest"));
}

// ============================================================================
// Run
// ============================================================================

#[test]
fn test_run_annotated_gap_passes() {
    let dir = module(COVERED);
    gocov()
        .current_dir(dir.path())
        .args(["--color", "never", "run", "-e", "--load", "cover/*.out", "-j", "1"])
        .assert()
        .success()
        .stderr(predicate::str::contains("coverage: 100.0% of statements"));
    let written = fs::read_to_string(dir.path().join("coverage.out")).unwrap();
    assert!(!written.contains("4.12,7.3"));
}

#[test]
fn test_run_enforce_reports_untested_code() {
    let dir = module(GAP);
    gocov()
        .current_dir(dir.path())
        .args(["run", "--enforce", "--load", "cover/*.out"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("The following lines are not tested:"))
        .stdout(predicate::str::contains("./calc.go:8:11"))
        .stderr(predicate::str::contains(
            "Error: untested code:\nexample.com/calc/calc.go:8-10:\n\tif a < 0 {\n\
            \t\treturn -(-a / b)\n\t}",
        ));
}

#[test]
fn test_run_without_enforce_succeeds() {
    let dir = module(GAP);
    gocov()
        .current_dir(dir.path())
        .args(["run", "--load", "cover/*.out"])
        .assert()
        .success();
}

#[test]
fn test_config_file_enables_enforcement() {
    let dir = module(GAP);
    fs::write(dir.path().join(".gocov.yaml"), "enforce: true\n").unwrap();
    gocov()
        .current_dir(dir.path())
        .args(["-q", "run", "--load", "cover/*.out"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("untested code"));
}

#[test]
fn test_malformed_config_file() {
    let dir = module(COVERED);
    fs::write(dir.path().join(".gocov.yaml"), "enforce: [\n").unwrap();
    gocov()
        .current_dir(dir.path())
        .args(["run", "--load", "cover/*.out"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Configuration error"));
}

#[test]
fn test_run_outside_module_fails() {
    let dir = TempDir::new().unwrap();
    gocov()
        .current_dir(dir.path())
        .args(["run", "--load", "*.out"])
        .assert()
        .failure()
        .stderr(predicate::str::starts_with("Error:"));
}

// ============================================================================
// Excluded and Scan
// ============================================================================

#[test]
fn test_excluded_lists_notest_blocks() {
    let dir = module(COVERED);
    gocov()
        .current_dir(dir.path())
        .args(["excluded", "notest", "--load", "cover/*.out"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "The following lines have instruction 'notest':",
        ))
        .stdout(predicate::str::contains("./calc.go:4:12"));
    let written = fs::read_to_string(dir.path().join("uncoverage.out")).unwrap();
    assert_eq!(written, "mode: set\nexample.com/calc/calc.go:4.12,7.3 1 0\n");
}

#[test]
fn test_scan_prints_annotated_lines() {
    let dir = module(COVERED);
    gocov()
        .current_dir(dir.path())
        .args(["scan", "calc.go"])
        .assert()
        .success()
        .stdout(predicate::str::contains("./calc.go:5 notest"))
        .stdout(predicate::str::contains("./calc.go:6 notest"))
        .stdout(predicate::str::contains("./calc.go:4 ").not());
}

#[test]
fn test_scan_json() {
    let dir = module(COVERED);
    gocov()
        .current_dir(dir.path())
        .args(["scan", "--format", "json", "calc.go"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"./calc.go\""));
}

#[test]
fn test_scan_parse_error() {
    let dir = module(COVERED);
    fs::write(dir.path().join("broken.go"), "package calc\nfunc F() {\n").unwrap();
    gocov()
        .current_dir(dir.path())
        .args(["scan", "broken.go"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Parse error"));
}
