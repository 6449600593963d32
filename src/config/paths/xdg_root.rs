//! XDG Base Directory lookup for the global config file.

use crate::error::WatchdogError;
use std::path::PathBuf;

/// Get XDG config home directory
///
/// Returns `$XDG_CONFIG_HOME` if set, otherwise defaults to `$HOME/.config`
pub(crate) fn config_home() -> Result<PathBuf, WatchdogError> {
    if let Ok(xdg_config_home) = std::env::var("XDG_CONFIG_HOME") {
        if !xdg_config_home.is_empty() {
            return Ok(PathBuf::from(xdg_config_home));
        }
    }

    let home = std::env::var("HOME").map_err(|_| {
        WatchdogError::ConfigError(
            "Could not determine XDG config home directory (HOME not set)".to_string(),
        )
    })?;

    Ok(PathBuf::from(home).join(".config"))
}

/// `$XDG_CONFIG_HOME/roomwatch/config.toml`
pub(crate) fn global_config_path() -> Result<PathBuf, WatchdogError> {
    Ok(config_home()?.join("roomwatch").join("config.toml"))
}
