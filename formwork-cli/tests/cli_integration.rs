//! Integration tests for the `formwork` binary

use assert_cmd::prelude::*;
use predicates::prelude::*;
use serde_json::{json, Value};
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use tempfile::TempDir;

fn form() -> Value {
    json!({"components": [
        {"type": "textfield", "key": "name", "label": "Name", "validate": {"required": true}},
        {"type": "checkbox", "key": "hasPet"},
        {"type": "panel", "title": "Pet", "components": [
            {"type": "textfield", "key": "petName", "label": "Pet name",
             "validate": {"softRequired": true}}
        ], "conditional": {"show": true, "when": "hasPet", "eq": true}},
        {"type": "unknown-widget", "key": "legacy"}
    ]})
}

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("form.json"), form().to_string()).unwrap();
        Self { dir }
    }

    fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    fn formwork(&self) -> Command {
        let mut cmd = Command::cargo_bin("formwork").unwrap();
        cmd.current_dir(self.dir.path()).env_remove("RUST_LOG");
        cmd
    }

    fn stdout_json(&self, args: &[&str]) -> (Value, Option<i32>) {
        let output = self.formwork().args(args).output().unwrap();
        let value = serde_json::from_slice(&output.stdout).unwrap();
        (value, output.status.code())
    }
}

#[test]
fn help_lists_subcommands() {
    Command::cargo_bin("formwork")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("initial"))
        .stdout(predicate::str::contains("validate"));
}

#[test]
fn initial_prints_defaults() {
    let ws = Workspace::new();
    let (values, code) = ws.stdout_json(&["initial", "form.json"]);
    assert_eq!(code, Some(0));
    assert_eq!(values, json!({"name": "", "hasPet": false, "petName": ""}));
}

#[test]
fn initial_warns_about_unknown_types_on_stderr() {
    let ws = Workspace::new();
    ws.formwork()
        .args(["initial", "form.json"])
        .assert()
        .success()
        .stderr(predicate::str::contains("unknown-widget"));
}

#[test]
fn quiet_suppresses_warnings() {
    let ws = Workspace::new();
    ws.formwork()
        .args(["--quiet", "initial", "form.json"])
        .assert()
        .success()
        .stderr(predicate::str::is_empty());
}

#[test]
fn resolve_clears_hidden_values() {
    let ws = Workspace::new();
    ws.write(
        "values.json",
        r#"{"name": "Ann", "hasPet": false, "petName": "Rex"}"#,
    );
    let (out, code) = ws.stdout_json(&["-q", "resolve", "form.json", "values.json"]);
    assert_eq!(code, Some(0));
    assert_eq!(out["values"]["petName"], "");
    assert_eq!(out["cleared"], json!(["petName"]));
    assert_eq!(out["converged"], true);
    assert_eq!(out["validators"], json!(["name", "hasPet"]));
    assert!(out.get("tree").is_none());
}

#[test]
fn resolve_once_with_tree() {
    let ws = Workspace::new();
    ws.write("values.json", r#"{"hasPet": true, "petName": "Rex"}"#);
    let (out, code) =
        ws.stdout_json(&["-q", "resolve", "form.json", "values.json", "--once", "--tree"]);
    assert_eq!(code, Some(0));
    assert_eq!(out["values"]["petName"], "Rex");
    assert_eq!(out["tree"][2]["children"][0]["path"], "petName");
    assert!(out.get("passes").is_none());
}

#[test]
fn missing_exits_with_warning_code() {
    let ws = Workspace::new();
    ws.write("values.json", r#"{"name": "Ann", "hasPet": true, "petName": ""}"#);
    let (out, code) = ws.stdout_json(&["-q", "missing", "form.json", "values.json"]);
    assert_eq!(code, Some(1));
    assert_eq!(out, json!([{"path": "petName", "label": "Pet > Pet name"}]));
}

#[test]
fn missing_is_clean_when_hidden() {
    let ws = Workspace::new();
    ws.write("values.json", r#"{"name": "Ann", "hasPet": false, "petName": ""}"#);
    let (out, code) = ws.stdout_json(&["-q", "missing", "form.json", "values.json"]);
    assert_eq!(code, Some(0));
    assert_eq!(out, json!([]));
}

#[test]
fn validate_reports_issues() {
    let ws = Workspace::new();
    ws.write("values.json", r#"{"name": "", "hasPet": false}"#);
    let (out, code) = ws.stdout_json(&["-q", "validate", "form.json", "values.json"]);
    assert_eq!(code, Some(1));
    assert_eq!(out["valid"], false);
    assert_eq!(out["issues"][0]["path"], "name");
    assert_eq!(out["issues"][0]["severity"], "error");
}

#[test]
fn validate_passes_for_complete_values() {
    let ws = Workspace::new();
    ws.write(
        "values.json",
        r#"{"name": "Ann", "hasPet": true, "petName": "Rex"}"#,
    );
    let (out, code) = ws.stdout_json(&["-q", "validate", "form.json", "values.json"]);
    assert_eq!(code, Some(0));
    assert_eq!(out["valid"], true);
}

#[test]
fn yaml_output() {
    let ws = Workspace::new();
    ws.formwork()
        .args(["-q", "--format", "yaml", "initial", "form.json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("name: ''"));
}

#[test]
fn malformed_schema_is_an_error() {
    let ws = Workspace::new();
    ws.write("broken.json", "42");
    ws.formwork()
        .args(["initial", "broken.json"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("invalid schema"));
}

#[test]
fn values_must_be_an_object() {
    let ws = Workspace::new();
    ws.write("values.json", "[1, 2]");
    ws.formwork()
        .args(["resolve", "form.json", "values.json"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("must be a JSON object"));
}

#[test]
fn config_file_is_honored() {
    let ws = Workspace::new();
    ws.write("values.json", r#"{"hasPet": false, "petName": "Rex"}"#);
    let config = ws.write("engine.toml", "max_passes = 1\n");

    let (out, _) = ws.stdout_json(&[
        "-q",
        "--config",
        config.to_str().unwrap(),
        "resolve",
        "form.json",
        "values.json",
    ]);
    assert_eq!(out["passes"], 1);
}

#[test]
fn invalid_config_is_an_error() {
    let ws = Workspace::new();
    ws.write("formwork.toml", "max_passes = 0\n");
    ws.formwork()
        .args(["initial", "form.json"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("max_passes"));
}
