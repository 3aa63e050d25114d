//! Run one action node against the simulated vehicle service.
//!
//! The node is built exactly as a flow host would build it: settings from
//! the configuration (or a bare node type), an account registered under
//! its id, and a [`ConsoleHost`] that prints statuses and collects output.

use std::sync::Arc;
use std::time::Duration;

use secrecy::SecretString;
use serde::Serialize;
use serde_json::{Map, Value};
use tabled::Tabled;
use tokio::time::Instant;

use bluelinky_api::sim::{LoginBehavior, SIM_VIN, SimConfig, SimulatedConnector};
use bluelinky_api::{Brand, Credentials, Region};
use bluelinky_config::{Config, ConfigError, profile_to_account_config};
use bluelinky_core::{
    ACCOUNT_NODE_TYPE, AccountConfig, AccountRegistry, ActionKind, ActionNode, Delivery,
    LoginCoordinator, Message,
};

use crate::cli::{GlobalOpts, SimulateArgs};
use crate::error::CliError;
use crate::host::ConsoleHost;
use crate::output::{self, should_color, status_line};

use super::{available_accounts, load_config, nodes::parse_kind};

/// Account id used when the configuration has no accounts.
const DEMO_ACCOUNT: &str = "simulated";

// ── Output records ──────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct OutputRecord {
    trigger: usize,
    output: &'static str,
    message: Value,
}

#[derive(Tabled)]
struct OutputRow {
    #[tabled(rename = "#")]
    trigger: usize,
    #[tabled(rename = "Output")]
    output: &'static str,
    #[tabled(rename = "Message")]
    message: String,
}

impl From<&OutputRecord> for OutputRow {
    fn from(record: &OutputRecord) -> Self {
        let message = match &record.message {
            Value::Object(fields) => fields
                .iter()
                .map(|(k, v)| format!("{k}: {}", display_value(v)))
                .collect::<Vec<_>>()
                .join("\n"),
            other => display_value(other),
        };
        Self {
            trigger: record.trigger,
            output: record.output,
            message,
        }
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(args: SimulateArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let cfg = load_config(global)?;
    let (node_id, kind, mut settings) = resolve_target(&cfg, &args.target)?;
    for setting in &args.settings {
        apply_setting(&mut settings, setting)?;
    }

    let color = should_color(global.color);
    let registry = AccountRegistry::new();
    let account_id = match select_account(&cfg, global, &settings)? {
        Some((id, account)) => {
            let coordinator = LoginCoordinator::connect(account, &simulator(&args, &id, &cfg))?;
            watch_account(&id, &coordinator, color, global.quiet);
            registry.register(id.clone(), coordinator);
            settings.insert(ACCOUNT_NODE_TYPE.into(), Value::String(id.clone()));
            Some(id)
        }
        None => None,
    };

    let (host, mut outputs) = ConsoleHost::new(node_id.clone(), color, global.quiet);
    let host = Arc::new(host);
    let node = ActionNode::from_host_config(
        node_id.clone(),
        kind,
        Value::Object(settings),
        &registry,
        host.clone(),
    )?;

    let trigger = Message::with_payload(parse_payload(args.payload));
    let mut accepted = 0;
    for n in 1..=args.count.max(1) {
        match node.on_input(trigger.clone()) {
            Delivery::Accepted => accepted += 1,
            Delivery::Dropped => {
                if !global.quiet {
                    eprintln!("[{node_id}] trigger {n} dropped: request pending");
                }
            }
        }
    }

    let deadline = Instant::now() + Duration::from_secs(args.wait);
    let mut records = Vec::new();
    for trigger in 1..=accepted {
        let received = tokio::time::timeout_at(deadline, outputs.recv())
            .await
            .map_err(|_| CliError::Timeout { seconds: args.wait })?;
        let Some([primary, secondary]) = received else {
            break;
        };
        records.extend(record(trigger, "primary", primary));
        records.extend(record(trigger, "secondary", secondary));
    }

    node.close();
    if let Some(ref id) = account_id {
        registry.remove(id);
    }

    let out = output::render_list(
        global.output,
        &records,
        |r| OutputRow::from(r),
        |r| r.message.to_string(),
    )?;
    output::print_output(&out, global.quiet);

    match host.last_status() {
        Some(status) if status.is_error() => Err(CliError::NodeFailed {
            node: node_id,
            status: status.text,
        }),
        _ => Ok(()),
    }
}

fn record(trigger: usize, output: &'static str, message: Option<Message>) -> Option<OutputRecord> {
    message.map(|m| OutputRecord {
        trigger,
        output,
        message: m.into_value(),
    })
}

// ── Node resolution ─────────────────────────────────────────────────

/// A configured node id wins over a node type of the same name.
fn resolve_target(
    cfg: &Config,
    target: &str,
) -> Result<(String, ActionKind, Map<String, Value>), CliError> {
    if let Some(node) = cfg.nodes.get(target) {
        let kind = node.kind().map_err(|err| match err {
            ConfigError::Validation { reason, .. } => CliError::Validation {
                field: format!("nodes.{target}.type"),
                reason,
            },
            other => other.into(),
        })?;
        return Ok((target.to_string(), kind, node.settings.clone()));
    }
    let kind = parse_kind(target)?;
    Ok((kind.type_name().to_string(), kind, Map::new()))
}

fn apply_setting(settings: &mut Map<String, Value>, setting: &str) -> Result<(), CliError> {
    let Some((key, raw)) = setting.split_once('=') else {
        return Err(CliError::Validation {
            field: "--set".into(),
            reason: format!("expected KEY=VALUE, got '{setting}'"),
        });
    };
    let key = key.trim();
    if key.is_empty() {
        return Err(CliError::Validation {
            field: "--set".into(),
            reason: format!("empty key in '{setting}'"),
        });
    }
    let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    settings.insert(key.to_string(), value);
    Ok(())
}

fn parse_payload(payload: Option<String>) -> Value {
    match payload {
        Some(raw) => serde_json::from_str(&raw).unwrap_or(Value::String(raw)),
        None => Value::Null,
    }
}

// ── Account selection ───────────────────────────────────────────────

/// Pick the account the node runs with.
///
/// `--account` beats the node's own `bluelinky` reference, which beats
/// the configuration default. A node reference to an account the
/// configuration lacks yields `None`: the node runs unconfigured. With no
/// accounts configured at all, a demo account is used.
fn select_account(
    cfg: &Config,
    global: &GlobalOpts,
    settings: &Map<String, Value>,
) -> Result<Option<(String, AccountConfig)>, CliError> {
    let node_account = settings
        .get(ACCOUNT_NODE_TYPE)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string);

    let wanted = global.account.clone().or(node_account);
    let Some(id) = wanted else {
        return match cfg.account(None) {
            Ok((id, profile)) => Ok(Some((id.to_string(), profile_to_account_config(profile, id)?))),
            Err(ConfigError::NoAccounts) => Ok(Some((DEMO_ACCOUNT.to_string(), demo_account()))),
            Err(err) => Err(err.into()),
        };
    };

    match cfg.accounts.get(&id) {
        Some(profile) => {
            let account = profile_to_account_config(profile, &id)?;
            Ok(Some((id, account)))
        }
        None if global.account.is_some() => Err(CliError::AccountNotFound {
            name: id,
            available: available_accounts(cfg),
        }),
        None => {
            tracing::warn!(account = %id, "node references an unknown account");
            Ok(None)
        }
    }
}

fn demo_account() -> AccountConfig {
    let credentials = Credentials::new(
        "demo@example.com",
        SecretString::from("demo".to_string()),
        Region::default(),
        SecretString::from("0000".to_string()),
        Brand::default(),
    );
    AccountConfig::new(credentials, SIM_VIN)
}

fn simulator(args: &SimulateArgs, account_id: &str, cfg: &Config) -> SimulatedConnector {
    let login = if args.login_hangs {
        LoginBehavior::Hang
    } else if let Some(ref reason) = args.login_fails {
        LoginBehavior::Fail(reason.clone())
    } else {
        LoginBehavior::Succeed
    };
    let vin = cfg
        .accounts
        .get(account_id)
        .and_then(|p| p.vin.clone())
        .unwrap_or_else(|| SIM_VIN.to_string());
    SimulatedConnector::new(SimConfig {
        login,
        latency: Duration::from_millis(args.latency_ms),
        vehicles: vec![vin.trim().to_string()],
        reject_calls: args.reject.clone(),
    })
}

/// Echo account status transitions until the account goes away.
fn watch_account(id: &str, account: &LoginCoordinator, color: bool, quiet: bool) {
    if quiet {
        return;
    }
    let label = format!("{ACCOUNT_NODE_TYPE}:{id}");
    let mut status = account.status();
    tokio::spawn(async move {
        loop {
            let line = status_line(&status.borrow_and_update(), color);
            eprintln!("[{label}] {line}");
            if status.changed().await.is_err() {
                break;
            }
        }
    });
}
