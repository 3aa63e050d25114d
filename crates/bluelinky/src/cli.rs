//! Clap derive structures for the `bluelinky` CLI.
//!
//! Defines the command tree, global flags, and shared value enums.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// bluelinky -- inspect, validate and exercise vehicle flow nodes
#[derive(Debug, Parser)]
#[command(
    name = "bluelinky",
    version,
    about = "Inspect, validate and run bluelinky vehicle flow nodes",
    long_about = "Command-line harness for the bluelinky flow nodes.\n\n\
        Lists the action node types and their defaults, checks flow\n\
        configuration files, and runs any node against a simulated vehicle.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Flow configuration file (defaults to the platform config dir)
    #[arg(long, env = "BLUELINKY_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Account configuration to use
    #[arg(long, short = 'a', env = "BLUELINKY_ACCOUNT", global = true)]
    pub account: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "BLUELINKY_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List action node types and their defaults
    #[command(alias = "n")]
    Nodes(NodesArgs),

    /// Run one action node against a simulated vehicle
    #[command(alias = "sim")]
    Simulate(SimulateArgs),

    /// Inspect and validate the flow configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Nodes ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct NodesArgs {
    #[command(subcommand)]
    pub command: NodesCommand,
}

#[derive(Debug, Subcommand)]
pub enum NodesCommand {
    /// List every action node type
    #[command(alias = "ls")]
    List,

    /// Show the defaults a node type starts from
    Show {
        /// Node type name, e.g. car-status
        node_type: String,
    },
}

// ── Simulate ─────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct SimulateArgs {
    /// Node id from the configuration, or a node type name
    pub target: String,

    /// Trigger payload as JSON (plain text is sent as a string)
    #[arg(long)]
    pub payload: Option<String>,

    /// Override a node setting, e.g. --set timeoutamount=5 (repeatable)
    #[arg(long = "set", value_name = "KEY=VALUE")]
    pub settings: Vec<String>,

    /// Number of triggers to send back to back
    #[arg(long, default_value = "1")]
    pub count: usize,

    /// Simulated latency of every vehicle service call, in milliseconds
    #[arg(long, default_value = "0")]
    pub latency_ms: u64,

    /// Make the simulated login fail with this reason
    #[arg(long, value_name = "REASON", conflicts_with = "login_hangs")]
    pub login_fails: Option<String>,

    /// Make the simulated login never complete
    #[arg(long)]
    pub login_hangs: bool,

    /// Make every vehicle call fail with this reason
    #[arg(long, value_name = "REASON")]
    pub reject: Option<String>,

    /// Give up waiting for node output after this many seconds
    #[arg(long, default_value = "30")]
    pub wait: u64,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the configuration file path
    Path,

    /// Show the effective configuration (secrets redacted)
    Show,

    /// Check accounts and node declarations
    Validate,

    /// Store an account secret in the system keyring (read from stdin)
    SetSecret {
        /// Account id
        account: String,

        /// Which secret to store
        #[arg(long, default_value = "password")]
        secret: SecretKind,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SecretKind {
    /// Account password
    Password,
    /// Remote-command PIN
    Pin,
}

impl SecretKind {
    pub fn key(self) -> &'static str {
        match self {
            Self::Password => "password",
            Self::Pin => "pin",
        }
    }
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
