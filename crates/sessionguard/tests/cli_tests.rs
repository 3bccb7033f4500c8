use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use serde_json::Value;
use tempfile::TempDir;

const START_MS: i64 = 1_767_225_600_000;

const IDLE_RETURN: &str = r#"
{"step":"send","args":["pageview",{"page":"/articles/intro"}]}
{"step":"advance","minutes":31}
{"step":"send","args":["event","Video","play"]}
"#;

/// Run the binary inside `dir` with an empty config file so nothing from the
/// user's environment leaks in
fn run_sessionguard(dir: &Path, scenario: &str, args: &[&str]) -> Output {
    let scenario_path = dir.join("scenario.jsonl");
    fs::write(&scenario_path, scenario).unwrap();
    let config_path = dir.join("empty.toml");
    fs::write(&config_path, "").unwrap();

    Command::new(env!("CARGO_BIN_EXE_sessionguard"))
        .current_dir(dir)
        .env_remove("RUST_LOG")
        .arg(&scenario_path)
        .arg("--config")
        .arg(&config_path)
        .arg("--log-format")
        .arg("compact")
        .args(args)
        .output()
        .unwrap()
}

#[test]
fn test_log_file_is_flushed_on_exit() {
    let dir = TempDir::new().unwrap();
    let log_path = dir.path().join("diag.log");

    let output = run_sessionguard(
        dir.path(),
        IDLE_RETURN,
        &["--log-level", "debug", "--log-file", log_path.to_str().unwrap()],
    );

    assert!(output.status.success());
    let content = fs::read_to_string(&log_path).unwrap();
    assert!(!content.is_empty());
    assert!(content.contains("Session guard installed"));
    assert!(content.contains("virtual pageview"));
}

#[test]
fn test_json_report_with_fixed_start() {
    let dir = TempDir::new().unwrap();
    let start = START_MS.to_string();

    let output = run_sessionguard(
        dir.path(),
        IDLE_RETURN,
        &["--json-output", "--start-ms", &start],
    );

    assert!(output.status.success());
    let report: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["steps"], 3);
    assert_eq!(report["failed_steps"], 0);
    assert_eq!(report["hits_by_type"]["pageview"], 2);
    assert_eq!(report["hits_by_type"]["event"], 1);
    assert_eq!(report["hits"][1]["hitType"], "pageview");
}

#[test]
fn test_failed_step_sets_exit_code() {
    let dir = TempDir::new().unwrap();

    let output = run_sessionguard(
        dir.path(),
        "{\"step\":\"remove\"}\n{\"step\":\"remove\"}\n",
        &["--json-output"],
    );

    assert_eq!(output.status.code(), Some(1));
    let report: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["failed_steps"], 1);
}

#[test]
fn test_oversized_advance_is_rejected_before_replay() {
    let dir = TempDir::new().unwrap();

    let output = run_sessionguard(
        dir.path(),
        "{\"step\":\"advance\",\"minutes\":1e300}\n",
        &["--json-output"],
    );

    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
    assert!(String::from_utf8_lossy(&output.stderr).contains("line 1"));
}
