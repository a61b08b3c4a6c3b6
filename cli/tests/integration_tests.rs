use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

fn cmdbind(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_cmdbind"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run cmdbind")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

/// A small `deploy` tool: a level enum, a global flag and one subcommand.
fn write_schema(dir: &Path) -> PathBuf {
    let json = serde_json::json!({
        "version": "1.0",
        "name": "deploy",
        "description": "Test schema",
        "enums": [{"type_name": "Level", "values": {"low": 0, "high": 1}}],
        "root": {"fields": [
            {"name": "verbose", "ty": "bool", "tags": {"short": "v", "global": true}},
            {"name": "level", "ty": {"int": 8}, "type_name": "Level", "tags": {"default": "low"}},
            {"name": "target", "ty": {"optional": {"record": {"fields": [
                {"name": "host", "ty": "string", "tags": {"positional": true, "required": true}},
                {"name": "port", "ty": {"uint": 16}, "tags": {"default": "22"}}
            ]}}}}
        ]}
    });
    let path = dir.join("deploy.json");
    fs::write(&path, serde_json::to_string_pretty(&json).unwrap())
        .expect("failed to write schema");
    path
}

fn write_yaml_schema(dir: &Path) -> PathBuf {
    let yaml = r#"name: greet
root:
  fields:
    - name: names
      ty:
        list: string
      tags:
        positional: true
    - name: shout
      ty: bool
"#;
    let path = dir.join("greet.yaml");
    fs::write(&path, yaml).expect("failed to write schema");
    path
}

// ---------------------------------------------------------------------------
// check
// ---------------------------------------------------------------------------

#[test]
fn check_reports_commands_and_arguments() {
    let dir = tempfile::tempdir().unwrap();
    let schema = write_schema(dir.path());

    let output = cmdbind(&["check", schema.to_str().unwrap(), "--tree"]);
    assert!(output.status.success(), "check failed: {}", stderr(&output));

    let out = stdout(&output);
    assert!(out.contains("deploy [-v|--verbose] [--level=LEVEL]"), "{out}");
    assert!(out.contains("deploy target [--port=PORT] HOST"), "{out}");
    assert!(out.contains("2 command(s), 4 argument(s)"), "{out}");
}

#[test]
fn check_rejects_broken_schema() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.json");
    fs::write(
        &path,
        r#"{"name": "x", "root": {"fields": [{"name": "mode", "ty": {"int": 8}, "type_name": "Mode", "tags": {"default": "fast"}}]}}"#,
    )
    .unwrap();

    let output = cmdbind(&["check", path.to_str().unwrap()]);
    assert!(!output.status.success());
    assert!(stderr(&output).starts_with("error: Invalid schema"), "{}", stderr(&output));
}

// ---------------------------------------------------------------------------
// parse
// ---------------------------------------------------------------------------

#[test]
fn parse_prints_record_and_chain() {
    let dir = tempfile::tempdir().unwrap();
    let schema = write_schema(dir.path());

    let output = cmdbind(&[
        "parse",
        schema.to_str().unwrap(),
        "--globals",
        "--",
        "deploy",
        "--level",
        "HIGH",
        "target",
        "-v",
        "example.org",
    ]);
    assert!(output.status.success(), "parse failed: {}", stderr(&output));

    let parsed: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(parsed["command"], "deploy target");
    assert_eq!(parsed["chain"], serde_json::json!(["deploy", "deploy target"]));
    assert_eq!(parsed["record"]["verbose"], true);
    assert_eq!(parsed["record"]["level"], 1);
    assert_eq!(parsed["record"]["target"]["host"], "example.org");
    assert_eq!(parsed["record"]["target"]["port"], 22);
}

#[test]
fn parse_uses_given_environment() {
    let dir = tempfile::tempdir().unwrap();
    let schema = write_schema(dir.path());

    let output = cmdbind(&[
        "parse",
        schema.to_str().unwrap(),
        "--env",
        "HOST=env.example",
        "--env",
        "PORT=2222",
        "--",
        "deploy",
        "target",
    ]);
    assert!(output.status.success(), "parse failed: {}", stderr(&output));

    let parsed: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(parsed["record"]["target"]["host"], "env.example");
    assert_eq!(parsed["record"]["target"]["port"], 2222);
}

#[test]
fn parse_failure_exits_nonzero() {
    let dir = tempfile::tempdir().unwrap();
    let schema = write_schema(dir.path());

    let output = cmdbind(&["parse", schema.to_str().unwrap(), "--", "deploy", "target"]);
    assert!(!output.status.success());
    assert_eq!(stderr(&output).trim(), "error: required argument not set: HOST");

    let output = cmdbind(&["parse", schema.to_str().unwrap(), "--", "deploy", "--nope"]);
    assert_eq!(stderr(&output).trim(), "error: no such flag: --nope");
}

#[test]
fn parse_yaml_schema_with_yaml_output() {
    let dir = tempfile::tempdir().unwrap();
    let schema = write_yaml_schema(dir.path());

    let output = cmdbind(&[
        "parse",
        schema.to_str().unwrap(),
        "--format",
        "yaml",
        "--",
        "./bin/greet",
        "ada",
        "grace",
        "--shout",
    ]);
    assert!(output.status.success(), "parse failed: {}", stderr(&output));

    let parsed: serde_yaml::Value = serde_yaml::from_str(&stdout(&output)).unwrap();
    assert_eq!(parsed["record"]["shout"], serde_yaml::Value::Bool(true));
    assert_eq!(
        parsed["record"]["names"],
        serde_yaml::to_value(vec!["ada", "grace"]).unwrap()
    );
}

// ---------------------------------------------------------------------------
// complete
// ---------------------------------------------------------------------------

#[test]
fn complete_prints_one_candidate_per_line() {
    let dir = tempfile::tempdir().unwrap();
    let schema = write_schema(dir.path());

    let output = cmdbind(&["complete", schema.to_str().unwrap(), "--line", "deploy --level "]);
    assert!(output.status.success());
    assert_eq!(stdout(&output), "HIGH\nLOW\n");

    let output = cmdbind(&[
        "complete",
        schema.to_str().unwrap(),
        "--line",
        "deploy t --verbose",
        "--point",
        "8",
    ]);
    assert_eq!(stdout(&output), "target\n");
}
