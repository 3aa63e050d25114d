//! Command handlers and the helpers they share.

pub mod config_cmd;
pub mod nodes;
pub mod simulate;

use std::path::PathBuf;

use bluelinky_config::{Config, config_path, load_config_from};

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// The configuration file in effect: `--config`, else the platform default.
pub fn config_file(global: &GlobalOpts) -> PathBuf {
    global.config.clone().unwrap_or_else(config_path)
}

/// Load the configuration file plus `BLUELINKY_*` environment overrides.
///
/// A missing file is not an error; it yields the defaults.
pub fn load_config(global: &GlobalOpts) -> Result<Config, CliError> {
    let path = config_file(global);
    tracing::debug!(path = %path.display(), "loading configuration");
    Ok(load_config_from(&path)?)
}

/// Comma-separated account ids, for help text.
pub(crate) fn available_accounts(cfg: &Config) -> String {
    if cfg.accounts.is_empty() {
        return "(none)".into();
    }
    cfg.accounts.keys().cloned().collect::<Vec<_>>().join(", ")
}
