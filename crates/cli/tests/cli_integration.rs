//! CLI integration tests for every subcommand.
//!
//! Uses `assert_cmd` to spawn the `cschema` binary and verify exit codes,
//! stdout content, and stderr content.
//!
//! All tests set `current_dir` to the workspace root so that relative paths
//! to the fixtures resolve correctly.

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const PHOTO_APP: &str = "fixtures/valid/photo_app.cedarschema";
const SYNTAX_ERROR: &str = "fixtures/invalid/syntax_error.cedarschema";

/// Locate the workspace root by walking up from CARGO_MANIFEST_DIR.
fn workspace_root() -> PathBuf {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    // crates/cli -> workspace root is two levels up
    manifest_dir
        .parent()
        .and_then(|p| p.parent())
        .expect("workspace root")
        .to_path_buf()
}

/// Helper: create a Command for the `cschema` binary, rooted at workspace.
fn cschema() -> Command {
    let mut cmd = cargo_bin_cmd!("cschema");
    cmd.current_dir(workspace_root());
    cmd.env_remove("RUST_LOG");
    cmd
}

fn stdout_json(args: &[&str]) -> serde_json::Value {
    let out = cschema().args(args).assert().success().get_output().stdout.clone();
    serde_json::from_slice(&out).expect("stdout is JSON")
}

// ──────────────────────────────────────────────
// 1. Help and version
// ──────────────────────────────────────────────

#[test]
fn help_exits_0_with_description() {
    cschema()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Authorization schema toolchain"));
}

#[test]
fn version_exits_0() {
    cschema()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("cschema"));
}

#[test]
fn unknown_subcommand_fails() {
    cschema().arg("elaborate").assert().failure();
}

// ──────────────────────────────────────────────
// 2. check
// ──────────────────────────────────────────────

#[test]
fn check_valid_file_exits_0() {
    cschema()
        .args(["check", PHOTO_APP])
        .assert()
        .success()
        .stdout(predicate::str::contains("ok"))
        .stdout(predicate::str::contains("4 entity type(s), 1 enum(s), 4 action(s)"));
}

#[test]
fn check_json_output_counts_declarations() {
    let v = stdout_json(&["--output", "json", "check", PHOTO_APP]);
    assert_eq!(v["valid"], true);
    assert_eq!(v["entityTypes"], 4);
    assert_eq!(v["enums"], 1);
    assert_eq!(v["actions"], 4);
    assert_eq!(v["commonTypes"], 2);
    assert_eq!(v["namespaces"], 1);
}

#[test]
fn check_syntax_error_is_positioned() {
    cschema()
        .args(["check", SYNTAX_ERROR])
        .assert()
        .code(1)
        .stderr(predicate::str::contains(
            "fixtures/invalid/syntax_error.cedarschema:3:3: expected ',' or '}', found identifier 'age'",
        ));
}

#[test]
fn check_syntax_error_json_output() {
    let out = cschema()
        .args(["--output", "json", "check", SYNTAX_ERROR])
        .assert()
        .code(1)
        .get_output()
        .stderr
        .clone();
    let v: serde_json::Value = serde_json::from_slice(&out).expect("stderr is JSON");
    assert_eq!(v["kind"], "SyntaxError");
    assert_eq!(v["line"], 3);
    assert_eq!(v["column"], 3);
}

#[test]
fn check_resolution_errors_exit_1() {
    for (file, needle) in [
        ("fixtures/invalid/common_cycle.cedarschema", "common type cycle"),
        ("fixtures/invalid/action_cycle.cedarschema", "action cycle"),
        ("fixtures/invalid/undefined_type.cedarschema", "undefined type 'Group'"),
        ("fixtures/invalid/context_not_record.cedarschema", "must be a record"),
    ] {
        cschema()
            .args(["check", file])
            .assert()
            .code(1)
            .stderr(predicate::str::contains(needle));
    }
}

#[test]
fn check_missing_file_fails() {
    cschema()
        .args(["check", "fixtures/nope.cedarschema"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("cannot read"));
}

#[test]
fn quiet_suppresses_text_errors() {
    cschema()
        .args(["--quiet", "check", SYNTAX_ERROR])
        .assert()
        .code(1)
        .stderr(predicate::str::is_empty());
}

// ──────────────────────────────────────────────
// 3. format
// ──────────────────────────────────────────────

#[test]
fn format_canonical_file_is_unchanged() {
    let expected = fs::read_to_string(workspace_root().join(PHOTO_APP)).unwrap();
    cschema()
        .args(["format", PHOTO_APP])
        .assert()
        .success()
        .stdout(expected);
    cschema()
        .args(["format", "--check", PHOTO_APP])
        .assert()
        .success();
}

#[test]
fn format_check_and_write() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("messy.cedarschema");
    fs::write(&path, "entity A{x:Long};// note\n").unwrap();
    let p = path.to_str().unwrap();

    cschema()
        .args(["format", "--check", p])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("not in canonical format"));

    cschema()
        .args(["format", "--write", p])
        .assert()
        .success()
        .stdout(predicate::str::contains("formatted"));
    assert_eq!(
        fs::read_to_string(&path).unwrap(),
        "entity A {\n  x: Long,\n}; // note\n"
    );

    cschema().args(["format", "--check", p]).assert().success();
}

#[test]
fn format_check_conflicts_with_write() {
    cschema()
        .args(["format", "--check", "--write", PHOTO_APP])
        .assert()
        .failure();
}

// ──────────────────────────────────────────────
// 4. resolve / json / from-json / validate
// ──────────────────────────────────────────────

#[test]
fn resolve_prints_qualified_names() {
    let v = stdout_json(&["resolve", PHOTO_APP]);
    let user = &v["entities"]["PhotoApp::User"];
    assert_eq!(user["member_of"], serde_json::json!(["PhotoApp::UserGroup"]));
    assert_eq!(
        v["entities"]["PhotoApp::Photo"]["shape"]["attributes"]["visibility"]["type"],
        serde_json::json!({ "type": "Entity", "name": "PhotoApp::Visibility" })
    );
    let edit = &v["actions"]["PhotoApp::Action::\"edit photo\""];
    assert_eq!(
        edit["applies_to"]["context"]["attributes"]["authenticated"]["type"]["type"],
        "Bool"
    );
}

#[test]
fn json_output_validates_and_converts_back() {
    let v = stdout_json(&["json", PHOTO_APP]);
    assert!(v["PhotoApp"]["entityTypes"]["Visibility"]["enum"].is_array());

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("photo.json");
    fs::write(&path, v.to_string()).unwrap();
    let p = path.to_str().unwrap();

    cschema()
        .args(["validate", p])
        .assert()
        .success()
        .stdout(predicate::str::contains("valid"));

    cschema()
        .args(["from-json", p])
        .assert()
        .success()
        .stdout(predicate::str::contains("namespace PhotoApp {"))
        .stdout(predicate::str::contains(
            "entity Visibility enum [\"public\", \"friends\", \"private\"];",
        ));
}

#[test]
fn validate_rejects_malformed_document() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bad.json");
    fs::write(&path, r#"{ "N": { "entityTypes": { "E": { "enum": [] } } } }"#).unwrap();

    cschema()
        .args(["validate", path.to_str().unwrap()])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("invalid schema document"));
}

#[test]
fn from_json_shape_error_exits_1() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bad.json");
    fs::write(&path, r#"{ "N": { "actions": { "a": { "bogus": true } } } }"#).unwrap();

    cschema()
        .args(["from-json", path.to_str().unwrap()])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("N/actions/a/bogus: unknown field"));
}

#[test]
fn verbose_logs_to_stderr_only() {
    cschema()
        .args(["--verbose", "json", PHOTO_APP])
        .assert()
        .success()
        .stderr(predicate::str::contains("parsed schema"))
        .stdout(predicate::str::starts_with("{"));
}
