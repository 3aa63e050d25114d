//! Integration tests for the `bluelinky` CLI binary.
//!
//! Everything runs against the simulated vehicle service; no network and
//! no real configuration directory is touched.
#![allow(clippy::unwrap_used)]

use std::io::Write;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::NamedTempFile;

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `bluelinky` binary with env isolation.
///
/// Clears all `BLUELINKY_*` env vars and points config directories at a
/// nonexistent path so tests never touch the user's real configuration.
fn bluelinky_cmd() -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("bluelinky");
    cmd.env("HOME", "/tmp/bluelinky-cli-test-nonexistent")
        .env("XDG_CONFIG_HOME", "/tmp/bluelinky-cli-test-nonexistent")
        .env("NO_COLOR", "1")
        .env_remove("BLUELINKY_CONFIG")
        .env_remove("BLUELINKY_ACCOUNT")
        .env_remove("BLUELINKY_OUTPUT")
        .env_remove("BLUELINKY_DEFAULT_ACCOUNT")
        .env_remove("RUST_LOG");
    cmd
}

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

const FLOW: &str = r#"
default_account = "home"

[accounts.home]
username = "driver@example.com"
password = "hunter2"
pin = "1234"
vin = "KMHL14JA5KA000001"

[nodes.status]
type = "car-status"
msgproperty = "carStatus"

[nodes.odo]
type = "car-odometer"
bluelinky = "home"

[nodes.orphan]
type = "lock-car"
bluelinky = "garage"
"#;

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let output = bluelinky_cmd().output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_lists_commands() {
    bluelinky_cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("nodes")
            .and(predicate::str::contains("simulate"))
            .and(predicate::str::contains("config")),
    );
}

#[test]
fn test_version_flag() {
    bluelinky_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("bluelinky"));
}

#[test]
fn test_completions_bash() {
    bluelinky_cmd()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

// ── Node catalogue ──────────────────────────────────────────────────

#[test]
fn test_nodes_list_plain_names_every_type() {
    let output = bluelinky_cmd()
        .args(["nodes", "list", "-o", "plain"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let types: Vec<&str> = stdout.lines().collect();
    assert_eq!(
        types,
        [
            "login",
            "car-status",
            "car-fullstatus",
            "car-odometer",
            "car-location",
            "lock-car",
            "unlock-car",
            "start-car",
            "stop-car",
            "start-charge",
            "stop-charge",
        ]
    );
}

#[test]
fn test_nodes_show_json_defaults() {
    let output = bluelinky_cmd()
        .args(["nodes", "show", "car-status", "-o", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let info: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(info["name"], "Get car status");
    assert_eq!(info["dorefresh"], true);
    assert_eq!(info["parsed"], false);
    assert_eq!(info["msgproperty"], "payload");
    assert_eq!(info["ignoremessageifpending"], true);
}

#[test]
fn test_nodes_show_unknown_type() {
    let output = bluelinky_cmd()
        .args(["nodes", "show", "honk-horn"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(4));
    assert!(combined_output(&output).contains("Unknown node 'honk-horn'"));
}

// ── Config ──────────────────────────────────────────────────────────

#[test]
fn test_config_path_honours_flag() {
    bluelinky_cmd()
        .args(["config", "path", "--config", "/tmp/flow.toml"])
        .assert()
        .success()
        .stdout(predicate::str::contains("/tmp/flow.toml"));
}

#[test]
fn test_config_show_redacts_secrets() {
    let file = write_config(FLOW);
    let output = bluelinky_cmd()
        .args(["config", "show", "--config"])
        .arg(file.path())
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("driver@example.com"));
    assert!(stdout.contains("****"));
    assert!(!stdout.contains("hunter2"));
    assert!(!stdout.contains("1234"));
}

#[test]
fn test_config_validate_reports_dangling_account() {
    let file = write_config(FLOW);
    let output = bluelinky_cmd()
        .args(["config", "validate", "--config"])
        .arg(file.path())
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("nodes.orphan.bluelinky"));
}

#[test]
fn test_config_validate_summary() {
    let file = write_config(
        r#"
[accounts.home]
username = "driver@example.com"
vin = "KMHL14JA5KA000001"

[nodes.lock]
type = "lock-car"
bluelinky = "home"
"#,
    );
    bluelinky_cmd()
        .args(["config", "validate", "--config"])
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("1 account(s), 1 node(s)"));
}

// ── Simulate ────────────────────────────────────────────────────────

#[test]
fn test_simulate_lock_with_demo_account() {
    let output = bluelinky_cmd()
        .args(["simulate", "lock-car", "-o", "json"])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", combined_output(&output));

    let records: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(records[0]["output"], "primary");
    assert_eq!(records[0]["message"]["payload"], "Lock successful");

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Request sent..."));
    assert!(stderr.contains("Request finished at"));
}

#[test]
fn test_simulate_configured_node_uses_result_field() {
    let file = write_config(FLOW);
    let output = bluelinky_cmd()
        .args(["simulate", "status", "-o", "json", "--payload", "tick", "--config"])
        .arg(file.path())
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", combined_output(&output));

    let records: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let message = &records[0]["message"];
    assert_eq!(message["payload"], "tick");
    assert!(message["carStatus"].is_object());
}

#[test]
fn test_simulate_odometer_is_typed() {
    let output = bluelinky_cmd()
        .args(["simulate", "car-odometer", "-o", "json-compact"])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", combined_output(&output));
    let records: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert!(records[0]["message"]["payload"]["value"].is_number());
}

#[test]
fn test_simulate_login_failure_splits_to_secondary() {
    let output = bluelinky_cmd()
        .args([
            "simulate",
            "car-location",
            "-o",
            "json",
            "--login-fails",
            "bad pin",
            "--set",
            "senderrortoaltoutput=true",
        ])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));

    let records: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(records[0]["output"], "secondary");
    assert_eq!(
        records[0]["message"]["payload"],
        "Login failed: Unable to connect/login: bad pin"
    );
    assert!(combined_output(&output).contains("failed"));
}

#[test]
fn test_simulate_hanging_login_hits_deadline() {
    let output = bluelinky_cmd()
        .args([
            "simulate",
            "stop-car",
            "-o",
            "json",
            "--login-hangs",
            "--set",
            "timeoutamount=1",
        ])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    let records: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(
        records[0]["message"]["payload"],
        "Timed out after 1s waiting for login"
    );
}

#[test]
fn test_simulate_unknown_account_reference_runs_unconfigured() {
    let file = write_config(FLOW);
    let output = bluelinky_cmd()
        .args(["simulate", "orphan", "-o", "json", "--config"])
        .arg(file.path())
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    let records: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(records[0]["message"]["payload"], "Bluelinky Config Is Not Set");
}

#[test]
fn test_simulate_drops_triggers_while_pending() {
    let output = bluelinky_cmd()
        .args([
            "simulate",
            "unlock-car",
            "-o",
            "json",
            "--count",
            "3",
            "--latency-ms",
            "50",
        ])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", combined_output(&output));
    let records: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(records.as_array().unwrap().len(), 1);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("trigger 2 dropped"));
    assert!(stderr.contains("trigger 3 dropped"));
}

#[test]
fn test_simulate_queues_triggers_when_asked() {
    let output = bluelinky_cmd()
        .args([
            "simulate",
            "start-charge",
            "-o",
            "json",
            "--count",
            "2",
            "--set",
            "ignoremessageifpending=false",
        ])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", combined_output(&output));
    let records: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let records = records.as_array().unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[1]["trigger"], 2);
    assert_eq!(records[1]["message"]["payload"], "Charge started");
}

#[test]
fn test_simulate_unknown_account_flag() {
    let file = write_config(FLOW);
    let output = bluelinky_cmd()
        .args(["simulate", "lock-car", "--account", "garage", "--config"])
        .arg(file.path())
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(4));
    assert!(combined_output(&output).contains("Account 'garage' not found"));
}

#[test]
fn test_simulate_missing_secret_points_at_set_secret() {
    let file = write_config(
        r#"
[accounts.home]
username = "driver@example.com"
password = "hunter2"
vin = "KMHL14JA5KA000001"
"#,
    );
    let output = bluelinky_cmd()
        .args(["simulate", "lock-car", "--config"])
        .arg(file.path())
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(3));
    let text = combined_output(&output);
    assert!(text.contains("No pin configured for account 'home'"), "{text}");
}
