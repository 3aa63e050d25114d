//! Config command handlers.

use std::io::BufRead;

use serde::Serialize;

use bluelinky_config::{Config, store_secret};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::{available_accounts, config_file, load_config};

const REDACTED: &str = "****";

#[derive(Debug, Serialize)]
struct ValidationSummary {
    path: String,
    accounts: usize,
    nodes: usize,
    default_account: Option<String>,
}

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Path => {
            output::print_output(&config_file(global).display().to_string(), global.quiet);
            Ok(())
        }

        ConfigCommand::Show => {
            let cfg = load_config(global)?;
            let redacted = redacted(&cfg)?;
            let out = output::render_single(
                global.output,
                &redacted,
                |v| toml::to_string_pretty(v).unwrap_or_else(|e| format!("# {e}")),
                |v| {
                    v.get("accounts")
                        .and_then(toml::Value::as_table)
                        .map(|t| t.keys().cloned().collect::<Vec<_>>().join("\n"))
                        .unwrap_or_default()
                },
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::Validate => {
            let cfg = load_config(global)?;
            cfg.validate()?;
            let summary = ValidationSummary {
                path: config_file(global).display().to_string(),
                accounts: cfg.accounts.len(),
                nodes: cfg.nodes.len(),
                default_account: cfg.default_account.clone(),
            };
            let out = output::render_single(
                global.output,
                &summary,
                |s| {
                    format!(
                        "✓ {}: {} account(s), {} node(s)",
                        s.path, s.accounts, s.nodes
                    )
                },
                |s| s.path.clone(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::SetSecret { account, secret } => {
            let cfg = load_config(global)?;
            if !cfg.accounts.contains_key(&account) {
                return Err(CliError::AccountNotFound {
                    name: account,
                    available: available_accounts(&cfg),
                });
            }

            let mut value = String::new();
            std::io::stdin().lock().read_line(&mut value)?;
            let value = value.trim_end_matches(['\r', '\n']);
            if value.is_empty() {
                return Err(CliError::Validation {
                    field: secret.key().into(),
                    reason: "value cannot be empty".into(),
                });
            }

            store_secret(&account, secret.key(), value)?;
            if !global.quiet {
                eprintln!("✓ {} stored in system keyring for account '{account}'", secret.key());
            }
            Ok(())
        }
    }
}

/// The configuration as TOML, with every plaintext secret masked.
fn redacted(cfg: &Config) -> Result<toml::Value, CliError> {
    let mut value = toml::Value::try_from(cfg).map_err(|e| CliError::Render {
        reason: e.to_string(),
    })?;
    if let Some(accounts) = value.get_mut("accounts").and_then(toml::Value::as_table_mut) {
        for account in accounts.iter_mut().map(|(_, v)| v).filter_map(toml::Value::as_table_mut) {
            for key in ["password", "pin"] {
                if let Some(secret) = account.get_mut(key) {
                    *secret = toml::Value::String(REDACTED.into());
                }
            }
        }
    }
    Ok(value)
}
