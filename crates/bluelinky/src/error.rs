//! CLI error types with miette diagnostics.
//!
//! Maps `ConfigError` and `CoreError` variants into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use bluelinky_config::ConfigError;
use bluelinky_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Configuration ────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(
        code(bluelinky::validation),
        help("Fix the value and run: bluelinky config validate")
    )]
    Validation { field: String, reason: String },

    #[error("No {secret} configured for account '{account}'")]
    #[diagnostic(
        code(bluelinky::no_credentials),
        help(
            "Set {secret} or {secret}_env in the account, or run:\n\
             bluelinky config set-secret {account} --secret {secret}"
        )
    )]
    NoCredentials { account: String, secret: String },

    #[error("Account '{name}' not found in configuration")]
    #[diagnostic(
        code(bluelinky::account_not_found),
        help("Available accounts: {available}")
    )]
    AccountNotFound { name: String, available: String },

    #[error("No accounts configured")]
    #[diagnostic(
        code(bluelinky::no_accounts),
        help("Add an [accounts.<id>] table to {path}")
    )]
    NoAccounts { path: String },

    #[error("Unknown node '{target}'")]
    #[diagnostic(
        code(bluelinky::unknown_node),
        help("Use a node id from the configuration or a type listed by: bluelinky nodes list")
    )]
    UnknownNode { target: String },

    #[error(transparent)]
    #[diagnostic(code(bluelinky::config))]
    Config(Box<figment::Error>),

    // ── Runtime ──────────────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    #[diagnostic(code(bluelinky::auth_failed))]
    AuthFailed { message: String },

    #[error("Node '{node}' failed: {status}")]
    #[diagnostic(code(bluelinky::node_failed))]
    NodeFailed { node: String, status: String },

    #[error("{message}")]
    #[diagnostic(code(bluelinky::operation))]
    Operation { message: String },

    #[error("No output after {seconds}s")]
    #[diagnostic(
        code(bluelinky::timeout),
        help("Raise --wait, or set a node deadline with --set timeoutamount=<n>")
    )]
    Timeout { seconds: u64 },

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to render output: {reason}")]
    #[diagnostic(code(bluelinky::render))]
    Render { reason: String },
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::AuthFailed { .. } | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::AccountNotFound { .. } | Self::UnknownNode { .. } => exit_code::NOT_FOUND,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::Validation { .. } | Self::NoAccounts { .. } | Self::Config(_) => {
                exit_code::USAGE
            }
            _ => exit_code::GENERAL,
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            ConfigError::NoCredentials { account, secret } => {
                Self::NoCredentials { account, secret }
            }
            ConfigError::UnknownAccount { account } => Self::AccountNotFound {
                name: account,
                available: "see `bluelinky config show`".into(),
            },
            ConfigError::NoAccounts => Self::NoAccounts {
                path: bluelinky_config::config_path().display().to_string(),
            },
            ConfigError::Figment(err) => Self::Config(err),
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Config { field, reason } => Self::Validation { field, reason },
            CoreError::AuthenticationFailed { message } => Self::AuthFailed { message },
            other => Self::Operation {
                message: other.to_string(),
            },
        }
    }
}
