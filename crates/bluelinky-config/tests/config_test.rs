#![allow(clippy::unwrap_used)]
// Integration tests for loading flow configuration files.

use std::io::Write;

use pretty_assertions::assert_eq;
use serde_json::json;
use tempfile::NamedTempFile;

use bluelinky_config::{Config, ConfigError, load_config_from};
use bluelinky_core::{ActionKind, Deadline, DeadlineUnit, PendingPolicy};

// ── Helpers ─────────────────────────────────────────────────────────

const FLOW: &str = r#"
default_account = "home"

[accounts.home]
username = "driver@example.com"
password = "secret"
pin = "1234"
region = "US"
brand = "hyundai"
vin = "KMHL14JA5KA000001"

[accounts.cabin]
username = "driver@example.com"
password = "secret"
pin = "1234"
region = "ca"
brand = "kia"
vin = "KNDJ23AU1N7000002"
auto_login = false

[nodes.status]
type = "car-status"
bluelinky = "home"
msgproperty = "carStatus"
timeoutamount = "30"
parsed = true

[nodes.lock]
type = "lock-car"
name = "Night lock"
bluelinky = "home"
timeoutamount = 2
timeoutunits = "m"
senderrortoaltoutput = true
ignoremessageifpending = false
"#;

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

fn load(contents: &str) -> Config {
    let file = write_config(contents);
    load_config_from(file.path()).unwrap()
}

// ── Loading ─────────────────────────────────────────────────────────

#[test]
fn test_loads_accounts_and_nodes() {
    let config = load(FLOW);

    assert_eq!(config.default_account.as_deref(), Some("home"));
    assert_eq!(config.accounts.len(), 2);
    assert!(!config.accounts["cabin"].auto_login);
    assert!(config.accounts["home"].auto_login);
    config.validate().unwrap();
}

#[test]
fn test_missing_file_yields_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = load_config_from(&dir.path().join("absent.toml")).unwrap();

    assert!(config.accounts.is_empty());
    assert!(config.nodes.is_empty());
    assert!(matches!(config.account(None), Err(ConfigError::NoAccounts)));
}

#[test]
fn test_nodes_resolve_with_defaults() {
    let config = load(FLOW);

    let (kind, status) = config.nodes["status"].resolve().unwrap();
    assert_eq!(kind, ActionKind::Status);
    assert_eq!(status.name, "Get car status");
    assert_eq!(status.result_field, "carStatus");
    assert_eq!(status.error_field, "payload");
    assert_eq!(status.deadline, Deadline::new(30.0, DeadlineUnit::Seconds));
    assert!(status.refresh);
    assert!(status.parsed);
    assert_eq!(status.pending, PendingPolicy::Drop);

    let (kind, lock) = config.nodes["lock"].resolve().unwrap();
    assert_eq!(kind, ActionKind::Lock);
    assert_eq!(lock.name, "Night lock");
    assert_eq!(lock.deadline.duration(), Some(std::time::Duration::from_secs(120)));
    assert!(lock.split_errors);
    assert_eq!(lock.pending, PendingPolicy::Queue);
}

#[test]
fn test_host_config_keeps_host_keys() {
    let config = load(FLOW);
    assert_eq!(
        config.nodes["lock"].host_config(),
        json!({
            "name": "Night lock",
            "bluelinky": "home",
            "timeoutamount": 2,
            "timeoutunits": "m",
            "senderrortoaltoutput": true,
            "ignoremessageifpending": false
        })
    );
}

// ── Account selection ───────────────────────────────────────────────

#[test]
fn test_account_selection() {
    let config = load(FLOW);

    assert_eq!(config.account(None).unwrap().0, "home");
    assert_eq!(config.account(Some("cabin")).unwrap().0, "cabin");
    assert!(matches!(
        config.account(Some("garage")),
        Err(ConfigError::UnknownAccount { ref account }) if account == "garage"
    ));
}

#[test]
fn test_single_account_needs_no_default() {
    let config = load(
        r#"
[accounts.only]
username = "a@b.c"
vin = "VIN"
"#,
    );
    assert_eq!(config.account(None).unwrap().0, "only");
}

// ── Validation ──────────────────────────────────────────────────────

#[test]
fn test_unknown_node_type_is_reported() {
    let config = load(
        r#"
[nodes.horn]
type = "honk-horn"
"#,
    );
    let err = config.validate().unwrap_err();
    assert_eq!(
        err.to_string(),
        "invalid nodes.horn.type: unknown node type 'honk-horn'"
    );
}

#[test]
fn test_dangling_account_reference_is_reported() {
    let config = load(
        r#"
[nodes.odo]
type = "car-odometer"
bluelinky = "garage"
"#,
    );
    let err = config.validate().unwrap_err();
    assert!(matches!(
        err,
        ConfigError::Validation { ref field, .. } if field == "nodes.odo.bluelinky"
    ));
}

#[test]
fn test_bad_timeout_amount_is_reported() {
    let config = load(
        r#"
[nodes.start]
type = "start-car"
timeoutamount = "soon"
"#,
    );
    let err = config.validate().unwrap_err();
    assert!(matches!(
        err,
        ConfigError::Validation { ref field, .. } if field == "nodes.start.node"
    ));
}

#[test]
fn test_account_missing_vin_is_reported() {
    let config = load(
        r#"
[accounts.home]
username = "driver@example.com"
"#,
    );
    let err = config.validate().unwrap_err();
    assert_eq!(err.to_string(), "invalid accounts.home.vin: must be set");
}

// ── Unused tables ───────────────────────────────────────────────────

#[test]
fn test_unrecognised_tables_are_ignored() {
    let config = load(&format!("{FLOW}\n[defaults]\noutput = \"json\"\n"));

    assert_eq!(config.nodes.len(), 2);
    config.validate().unwrap();
}
