//! CLI integration tests for the `rpmtx` demo binary: each test writes a
//! JSON transaction description to a temp file and asserts on the printed
//! problems/order, mirroring the scenarios of spec.md §8.

use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;
use tempfile::NamedTempFile;

fn rpmtx() -> Command {
    Command::new(cargo_bin!("rpmtx"))
}

fn write_doc(json: &str) -> NamedTempFile {
    let file = NamedTempFile::new().expect("failed to create temp file");
    std::fs::write(file.path(), json).expect("failed to write transaction doc");
    file
}

#[test]
fn help_output_mentions_the_engine() {
    rpmtx()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("transaction"));
}

#[test]
fn simple_order_places_dependency_first() {
    let file = write_doc(
        r#"{
            "add": [
                {"name": "A", "version": "1", "requires": [{"name": "B"}]},
                {"name": "B", "version": "1"}
            ]
        }"#,
    );
    rpmtx()
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("no dependency problems found"))
        .stdout(predicate::str::contains("B"));
}

#[test]
fn missing_requirement_is_reported_as_a_problem() {
    let file = write_doc(
        r#"{
            "add": [
                {"name": "app", "version": "1.0", "requires": [{"name": "libfoo"}]}
            ]
        }"#,
    );
    rpmtx()
        .arg(file.path())
        .assert()
        .failure()
        .stdout(predicate::str::contains("missing"))
        .stdout(predicate::str::contains("libfoo"));
}

#[test]
fn unbreakable_prereq_loop_fails_ordering() {
    let file = write_doc(
        r#"{
            "add": [
                {"name": "A", "version": "1", "requires": [{"name": "B", "flags": ["SCRIPT_PRE"]}]},
                {"name": "B", "version": "1", "requires": [{"name": "A", "flags": ["SCRIPT_PRE"]}]}
            ]
        }"#,
    );
    rpmtx()
        .arg(file.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("ordering failed"));
}

#[test]
fn missing_input_file_errors_cleanly() {
    rpmtx().arg("/nonexistent/path/does-not-exist.json").assert().failure();
}
