//! Flow configuration for bluelinky.
//!
//! TOML accounts and node declarations, credential resolution (env +
//! plaintext + keyring), and translation to `bluelinky_core` types. The CLI
//! and any host adapter load a [`Config`] and build accounts and action
//! nodes from it.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use bluelinky_api::{Brand, Credentials, Region};
use bluelinky_core::{AccountConfig, ActionConfig, ActionKind, CoreError, HostActionConfig};

/// Keyring service name secrets are stored under.
pub const KEYRING_SERVICE: &str = "bluelinky";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no {secret} configured for account '{account}'")]
    NoCredentials { account: String, secret: String },

    #[error("unknown account '{account}'")]
    UnknownAccount { account: String },

    #[error("no accounts configured")]
    NoAccounts,

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level flow configuration.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    /// Account used when a command does not name one.
    pub default_account: Option<String>,

    /// Account configuration nodes, keyed by id.
    #[serde(default)]
    pub accounts: BTreeMap<String, AccountProfile>,

    /// Action nodes, keyed by id.
    #[serde(default)]
    pub nodes: BTreeMap<String, NodeProfile>,
}

/// One account configuration node: a credential set plus the target vehicle.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct AccountProfile {
    pub username: Option<String>,

    /// Password (plaintext; prefer `password_env` or the keyring).
    pub password: Option<String>,

    /// Environment variable name containing the password.
    pub password_env: Option<String>,

    /// Remote-command PIN (plaintext; prefer `pin_env` or the keyring).
    pub pin: Option<String>,

    /// Environment variable name containing the PIN.
    pub pin_env: Option<String>,

    /// Service region code, e.g. "US", "CA", "EU".
    #[serde(default = "default_region")]
    pub region: String,

    /// "hyundai", "kia" or "genesis".
    #[serde(default = "default_brand")]
    pub brand: String,

    /// VIN of the vehicle this account's action nodes target.
    pub vin: Option<String>,

    /// Log in as soon as the account is created.
    #[serde(default = "default_auto_login")]
    pub auto_login: bool,
}

fn default_region() -> String {
    Region::default().to_string()
}
fn default_brand() -> String {
    Brand::default().to_string()
}
fn default_auto_login() -> bool {
    true
}

/// One action node declaration: its host type name plus host-persisted
/// settings (`bluelinky`, `timeoutamount`, `msgproperty`, ...).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NodeProfile {
    #[serde(rename = "type")]
    pub node_type: String,

    #[serde(flatten)]
    pub settings: Map<String, Value>,
}

impl NodeProfile {
    /// The action this node runs.
    pub fn kind(&self) -> Result<ActionKind, ConfigError> {
        ActionKind::from_str(self.node_type.trim()).map_err(|_| ConfigError::Validation {
            field: "type".into(),
            reason: format!("unknown node type '{}'", self.node_type),
        })
    }

    /// Settings as the host would hand them to the node constructor.
    pub fn host_config(&self) -> Value {
        Value::Object(self.settings.clone())
    }

    /// Kind and fully defaulted settings.
    pub fn resolve(&self) -> Result<(ActionKind, ActionConfig), ConfigError> {
        let kind = self.kind()?;
        let raw = HostActionConfig::from_value(self.host_config()).map_err(core_validation)?;
        Ok((kind, raw.resolve(kind)))
    }
}

fn core_validation(err: CoreError) -> ConfigError {
    match err {
        CoreError::Config { field, reason } => ConfigError::Validation { field, reason },
        other => ConfigError::Validation {
            field: "node".into(),
            reason: other.to_string(),
        },
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "bluelinky", "bluelinky").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("bluelinky");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from `path` + environment. A missing file yields
/// the defaults.
///
/// Environment keys use a double underscore between levels, e.g.
/// `BLUELINKY_ACCOUNTS__HOME__VIN` or `BLUELINKY_DEFAULT_ACCOUNT`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("BLUELINKY_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

// ── Lookup and validation ───────────────────────────────────────────

impl Config {
    /// Pick an account: the named one, else `default_account`, else the
    /// only configured account.
    pub fn account(&self, name: Option<&str>) -> Result<(&str, &AccountProfile), ConfigError> {
        let wanted = name.or(self.default_account.as_deref());
        if let Some(id) = wanted {
            return self
                .accounts
                .get_key_value(id)
                .map(|(k, v)| (k.as_str(), v))
                .ok_or_else(|| ConfigError::UnknownAccount {
                    account: id.to_string(),
                });
        }
        match self.accounts.len() {
            0 => Err(ConfigError::NoAccounts),
            1 => self
                .accounts
                .iter()
                .next()
                .map(|(k, v)| (k.as_str(), v))
                .ok_or(ConfigError::NoAccounts),
            _ => Err(ConfigError::Validation {
                field: "default_account".into(),
                reason: "several accounts configured; name one or set default_account".into(),
            }),
        }
    }

    /// Check every account and node declaration without touching secrets.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(ref id) = self.default_account {
            if !self.accounts.contains_key(id) {
                return Err(ConfigError::UnknownAccount {
                    account: id.clone(),
                });
            }
        }

        for (id, profile) in &self.accounts {
            validate_account(profile, id)?;
        }

        for (id, node) in &self.nodes {
            let (_, resolved) = node.resolve().map_err(|err| prefix_field(err, id))?;
            if let Some(ref account) = resolved.account {
                if !self.accounts.contains_key(account) {
                    return Err(ConfigError::Validation {
                        field: format!("nodes.{id}.bluelinky"),
                        reason: format!("unknown account '{account}'"),
                    });
                }
            }
        }
        Ok(())
    }
}

fn prefix_field(err: ConfigError, node_id: &str) -> ConfigError {
    match err {
        ConfigError::Validation { field, reason } => ConfigError::Validation {
            field: format!("nodes.{node_id}.{field}"),
            reason,
        },
        other => other,
    }
}

fn validate_account(profile: &AccountProfile, account: &str) -> Result<(), ConfigError> {
    required(profile.username.as_deref(), account, "username")?;
    required(profile.vin.as_deref(), account, "vin")?;
    parse_region(profile, account)?;
    parse_brand(profile, account)?;
    Ok(())
}

fn required<'a>(value: Option<&'a str>, account: &str, field: &str) -> Result<&'a str, ConfigError> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ConfigError::Validation {
            field: format!("accounts.{account}.{field}"),
            reason: "must be set".into(),
        })
}

fn parse_region(profile: &AccountProfile, account: &str) -> Result<Region, ConfigError> {
    Region::from_str(profile.region.trim()).map_err(|_| ConfigError::Validation {
        field: format!("accounts.{account}.region"),
        reason: format!("unknown region '{}'", profile.region),
    })
}

fn parse_brand(profile: &AccountProfile, account: &str) -> Result<Brand, ConfigError> {
    Brand::from_str(profile.brand.trim()).map_err(|_| ConfigError::Validation {
        field: format!("accounts.{account}.brand"),
        reason: format!("unknown brand '{}'", profile.brand),
    })
}

// ── Credential resolution ───────────────────────────────────────────

/// Resolve one secret: the profile's env var, then plaintext, then the
/// keyring entry `<account>/<secret>`.
fn resolve_secret(
    env_name: Option<&str>,
    plaintext: Option<&str>,
    account: &str,
    secret: &str,
) -> Result<SecretString, ConfigError> {
    // 1. Profile's *_env → env var lookup
    if let Some(env_name) = env_name {
        if let Ok(val) = std::env::var(env_name) {
            return Ok(SecretString::from(val));
        }
    }

    // 2. Plaintext in config
    if let Some(val) = plaintext {
        return Ok(SecretString::from(val.to_string()));
    }

    // 3. System keyring
    if let Ok(entry) = keyring::Entry::new(KEYRING_SERVICE, &format!("{account}/{secret}")) {
        if let Ok(val) = entry.get_password() {
            return Ok(SecretString::from(val));
        }
    }

    Err(ConfigError::NoCredentials {
        account: account.into(),
        secret: secret.into(),
    })
}

/// Store `value` in the system keyring as `<account>/<secret>`.
pub fn store_secret(account: &str, secret: &str, value: &str) -> Result<(), ConfigError> {
    let keyring_err = |e: keyring::Error| ConfigError::Validation {
        field: "keyring".into(),
        reason: format!("failed to store {secret} for '{account}': {e}"),
    };
    keyring::Entry::new(KEYRING_SERVICE, &format!("{account}/{secret}"))
        .map_err(keyring_err)?
        .set_password(value)
        .map_err(keyring_err)
}

/// Build the credential set of an account.
pub fn resolve_credentials(
    profile: &AccountProfile,
    account: &str,
) -> Result<Credentials, ConfigError> {
    let username = required(profile.username.as_deref(), account, "username")?;
    let password = resolve_secret(
        profile.password_env.as_deref(),
        profile.password.as_deref(),
        account,
        "password",
    )?;
    let pin = resolve_secret(
        profile.pin_env.as_deref(),
        profile.pin.as_deref(),
        account,
        "pin",
    )?;

    Ok(Credentials::new(
        username,
        password,
        parse_region(profile, account)?,
        pin,
        parse_brand(profile, account)?,
    ))
}

/// Build an `AccountConfig` from a profile.
pub fn profile_to_account_config(
    profile: &AccountProfile,
    account: &str,
) -> Result<AccountConfig, ConfigError> {
    let vin = required(profile.vin.as_deref(), account, "vin")?;
    let credentials = resolve_credentials(profile, account)?;
    Ok(AccountConfig {
        auto_login: profile.auto_login,
        ..AccountConfig::new(credentials, vin)
    })
}
