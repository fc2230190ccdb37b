//! Basic CLI E2E tests.
//!
//! Each test runs the built `tweny` binary against its own data directory.

use std::io::Write;
use std::path::Path;
use std::process::{Command, Output, Stdio};

use tempfile::TempDir;

fn tweny(data_dir: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_tweny"));
    cmd.env("TWENY_DATA_DIR", data_dir).env("TWENY_LOG", "warn");
    cmd
}

/// Run a CLI command and return (code, stdout, stderr).
fn run_cli(data_dir: &Path, args: &[&str]) -> (i32, String, String) {
    let output = tweny(data_dir)
        .args(args)
        .output()
        .expect("Failed to execute CLI command");
    unpack(output)
}

fn unpack(output: Output) -> (i32, String, String) {
    (
        output.status.code().unwrap_or(-1),
        String::from_utf8_lossy(&output.stdout).to_string(),
        String::from_utf8_lossy(&output.stderr).to_string(),
    )
}

fn preset_names(data_dir: &Path) -> Vec<String> {
    let (code, stdout, _) = run_cli(data_dir, &["preset", "list", "--json"]);
    assert_eq!(code, 0);
    let presets: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    presets
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["name"].as_str().unwrap().to_string())
        .collect()
}

#[test]
fn test_preset_defaults_are_listed() {
    let dir = TempDir::new().unwrap();
    assert_eq!(preset_names(dir.path()).len(), 3);
}

#[test]
fn test_preset_add_update_remove() {
    let dir = TempDir::new().unwrap();
    let (code, stdout, _) = run_cli(
        dir.path(),
        &[
            "preset",
            "add",
            "Reading",
            "--goal-hours",
            "0.5",
            "--work-minutes",
            "15",
            "--break-seconds",
            "30",
        ],
    );
    assert_eq!(code, 0);
    assert!(uuid_like(stdout.trim()));
    assert!(preset_names(dir.path()).contains(&"Reading".to_string()));

    let (code, _, _) = run_cli(
        dir.path(),
        &["preset", "update", "reading", "--name", "Long Reading"],
    );
    assert_eq!(code, 0);
    assert!(preset_names(dir.path()).contains(&"Long Reading".to_string()));

    let (code, _, _) = run_cli(dir.path(), &["preset", "remove", "Long Reading"]);
    assert_eq!(code, 0);
    assert_eq!(preset_names(dir.path()).len(), 3);
}

fn uuid_like(s: &str) -> bool {
    s.len() == 36 && s.chars().filter(|c| *c == '-').count() == 4
}

#[test]
fn test_preset_remove_unknown_fails() {
    let dir = TempDir::new().unwrap();
    let (code, _, stderr) = run_cli(dir.path(), &["preset", "remove", "Nope"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("Preset not found"));
}

#[test]
fn test_preset_add_rejects_zero_work() {
    let dir = TempDir::new().unwrap();
    let (code, _, _) = run_cli(
        dir.path(),
        &["preset", "add", "Broken", "--work-minutes", "0"],
    );
    assert_eq!(code, 1);
}

#[test]
fn test_config_get_set() {
    let dir = TempDir::new().unwrap();
    let (code, stdout, _) = run_cli(dir.path(), &["config", "get", "notifications.enabled"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "true");

    let (code, _, _) = run_cli(dir.path(), &["config", "set", "debug.accelerated", "true"]);
    assert_eq!(code, 0);
    let (_, stdout, _) = run_cli(dir.path(), &["config", "get", "debug.accelerated"]);
    assert_eq!(stdout.trim(), "true");

    let (code, _, _) = run_cli(dir.path(), &["config", "set", "timer.nope", "1"]);
    assert_eq!(code, 1);
}

#[test]
fn test_empty_history_and_stats() {
    let dir = TempDir::new().unwrap();
    let (code, stdout, _) = run_cli(dir.path(), &["history", "list", "--json"]);
    assert_eq!(code, 0);
    assert_eq!(serde_json::from_str::<serde_json::Value>(&stdout).unwrap(), serde_json::json!([]));

    let (code, stdout, _) = run_cli(dir.path(), &["stats", "summary"]);
    assert_eq!(code, 0);
    let summary: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(summary["total_sessions"], 0);
}

#[test]
fn test_history_reset_requires_confirmation() {
    let dir = TempDir::new().unwrap();
    let (code, _, stderr) = run_cli(dir.path(), &["history", "reset"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("--yes"));
    let (code, _, _) = run_cli(dir.path(), &["history", "reset", "--yes"]);
    assert_eq!(code, 0);
}

#[test]
fn test_session_run_stops_from_stdin_and_records_history() {
    let dir = TempDir::new().unwrap();
    let mut child = tweny(dir.path())
        .args(["session", "run", "--accelerated", "--no-companion"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to spawn session");
    child
        .stdin
        .take()
        .unwrap()
        .write_all(b"stop\n")
        .unwrap();
    let (code, stdout, _) = unpack(child.wait_with_output().unwrap());
    assert_eq!(code, 0);

    let kinds: Vec<String> = stdout
        .lines()
        .map(|line| {
            let event: serde_json::Value = serde_json::from_str(line).unwrap();
            event["type"].as_str().unwrap().to_string()
        })
        .collect();
    assert_eq!(kinds.first().map(String::as_str), Some("session_started"));
    assert!(kinds.iter().any(|k| k == "session_stopped"));

    let (_, stdout, _) = run_cli(dir.path(), &["history", "list", "--json"]);
    let records: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(records.as_array().unwrap().len(), 1);
}

#[test]
fn test_session_run_unknown_preset_fails() {
    let dir = TempDir::new().unwrap();
    let (code, _, stderr) = run_cli(
        dir.path(),
        &["session", "run", "--preset", "Nope", "--no-companion"],
    );
    assert_eq!(code, 1);
    assert!(stderr.contains("Preset not found"));
}

#[test]
fn test_session_run_survives_broken_config() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("config.toml"), "timer = [not toml").unwrap();
    let mut child = tweny(dir.path())
        .args(["session", "run", "--no-companion"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to spawn session");
    child.stdin.take().unwrap().write_all(b"stop\n").unwrap();
    let (code, stdout, _) = unpack(child.wait_with_output().unwrap());
    assert_eq!(code, 0);
    assert!(stdout.lines().any(|line| line.contains("\"session_stopped\"")));

    let (code, _, _) = run_cli(dir.path(), &["config", "list"]);
    assert_eq!(code, 1);
}

#[test]
fn test_preset_add_rejects_durations_past_a_week() {
    let dir = TempDir::new().unwrap();
    let (code, _, stderr) = run_cli(
        dir.path(),
        &["preset", "add", "Forever", "--goal-hours", "3e12"],
    );
    assert_eq!(code, 1);
    assert!(stderr.contains("at most one week"));
    assert_eq!(preset_names(dir.path()).len(), 3);
}
