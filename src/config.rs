//! Configuration
//!
//! Layered with the `config` crate: built-in defaults, then the global config
//! file, then `roomwatch.toml` in the working directory (or an explicit file),
//! then `ROOMWATCH__SECTION__KEY` environment variables.

mod facade;
pub mod merge {
    pub(crate) mod policy;
    pub mod service;
}
pub(crate) mod paths {
    pub(crate) mod xdg_root;
}
pub(crate) mod sources {
    pub(crate) mod environment;
    pub(crate) mod files;
}

pub use facade::ConfigLoader;

use crate::error::WatchdogError;
use crate::fetch::BackoffPolicy;
use crate::logging::LoggingConfig;
use crate::reconcile::WatchTiming;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;

/// Root configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchdogConfig {
    pub matrix: MatrixConfig,

    #[serde(default)]
    pub polling: PollConfig,

    /// Watched directories; empty means the homeserver's own public directory
    #[serde(default)]
    pub directories: Vec<DirectoryConfig>,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Chat server connection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatrixConfig {
    /// Homeserver base URL, e.g. `https://matrix.example.org`
    pub homeserver: String,

    /// Access token sent as a bearer token
    #[serde(default, skip_serializing)]
    pub access_token: Option<String>,

    /// Room that receives change reports and notices
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report_room: Option<String>,
}

/// Poll timing, backoff and request limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollConfig {
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    #[serde(default = "default_base_backoff_secs")]
    pub base_backoff_secs: u64,

    #[serde(default = "default_max_backoff_secs")]
    pub max_backoff_secs: u64,

    #[serde(default = "default_max_retries_steady")]
    pub max_retries_steady: u32,

    #[serde(default = "default_max_retries_seeding")]
    pub max_retries_seeding: u32,

    /// Entries requested per directory page
    #[serde(default = "default_page_limit")]
    pub page_limit: u32,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_sink_timeout_secs")]
    pub sink_timeout_secs: u64,
}

pub(crate) fn default_poll_interval_secs() -> u64 {
    300
}

pub(crate) fn default_base_backoff_secs() -> u64 {
    10
}

pub(crate) fn default_max_backoff_secs() -> u64 {
    1800
}

pub(crate) fn default_max_retries_steady() -> u32 {
    5
}

pub(crate) fn default_max_retries_seeding() -> u32 {
    999
}

pub(crate) fn default_page_limit() -> u32 {
    1000
}

pub(crate) fn default_request_timeout_secs() -> u64 {
    30
}

pub(crate) fn default_sink_timeout_secs() -> u64 {
    30
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
            base_backoff_secs: default_base_backoff_secs(),
            max_backoff_secs: default_max_backoff_secs(),
            max_retries_steady: default_max_retries_steady(),
            max_retries_seeding: default_max_retries_seeding(),
            page_limit: default_page_limit(),
            request_timeout_secs: default_request_timeout_secs(),
            sink_timeout_secs: default_sink_timeout_secs(),
        }
    }
}

impl PollConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn timing(&self) -> WatchTiming {
        WatchTiming {
            poll_interval: Duration::from_secs(self.poll_interval_secs),
            backoff: BackoffPolicy::new(
                Duration::from_secs(self.base_backoff_secs),
                Duration::from_secs(self.max_backoff_secs),
            ),
            max_retries_steady: self.max_retries_steady,
            max_retries_seeding: self.max_retries_seeding,
            sink_timeout: Duration::from_secs(self.sink_timeout_secs),
        }
    }
}

/// One watched room directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryConfig {
    /// Label used in logs and reports
    pub name: String,

    /// Remote server whose directory is listed; the homeserver's own if unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server: Option<String>,

    /// Report room override for this directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report_room: Option<String>,
}

impl DirectoryConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            server: None,
            report_room: None,
        }
    }
}

impl WatchdogConfig {
    /// Configured directories, or the homeserver's own directory when none are listed.
    pub fn directories(&self) -> Vec<DirectoryConfig> {
        if self.directories.is_empty() {
            vec![DirectoryConfig::new("public")]
        } else {
            self.directories.clone()
        }
    }

    pub fn directory(&self, name: &str) -> Result<DirectoryConfig, WatchdogError> {
        self.directories()
            .into_iter()
            .find(|d| d.name == name)
            .ok_or_else(|| WatchdogError::UnknownDirectory(name.to_string()))
    }

    pub fn homeserver_url(&self) -> Result<Url, WatchdogError> {
        Url::parse(&self.matrix.homeserver).map_err(|e| {
            WatchdogError::ConfigError(format!(
                "Invalid homeserver URL '{}': {}",
                self.matrix.homeserver, e
            ))
        })
    }

    /// Report room for a directory: its override, else the global room.
    pub fn report_room_for(&self, directory: &DirectoryConfig) -> Option<String> {
        directory
            .report_room
            .clone()
            .or_else(|| self.matrix.report_room.clone())
    }

    /// Validate settings shared by every command.
    pub fn validate(&self) -> Result<(), WatchdogError> {
        let url = self.homeserver_url()?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(WatchdogError::ConfigError(format!(
                "Homeserver URL must use http or https: {}",
                self.matrix.homeserver
            )));
        }

        let polling = &self.polling;
        if polling.poll_interval_secs == 0 {
            return Err(WatchdogError::ConfigError(
                "polling.poll_interval_secs must be greater than zero".to_string(),
            ));
        }
        if polling.page_limit == 0 {
            return Err(WatchdogError::ConfigError(
                "polling.page_limit must be greater than zero".to_string(),
            ));
        }
        if polling.base_backoff_secs > polling.max_backoff_secs {
            return Err(WatchdogError::ConfigError(format!(
                "polling.base_backoff_secs ({}) exceeds polling.max_backoff_secs ({})",
                polling.base_backoff_secs, polling.max_backoff_secs
            )));
        }

        let mut seen = HashSet::new();
        for directory in &self.directories {
            if directory.name.trim().is_empty() {
                return Err(WatchdogError::ConfigError(
                    "Directory name cannot be empty".to_string(),
                ));
            }
            if !seen.insert(directory.name.as_str()) {
                return Err(WatchdogError::ConfigError(format!(
                    "Duplicate directory name: {}",
                    directory.name
                )));
            }
        }

        Ok(())
    }

    /// Validate settings needed to post reports into rooms.
    pub fn validate_for_reporting(&self) -> Result<(), WatchdogError> {
        self.validate()?;
        for directory in self.directories() {
            if self.report_room_for(&directory).is_none() {
                return Err(WatchdogError::ConfigError(format!(
                    "No report room configured for directory '{}' (set matrix.report_room)",
                    directory.name
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> WatchdogConfig {
        WatchdogConfig {
            matrix: MatrixConfig {
                homeserver: "https://matrix.example.org".to_string(),
                access_token: Some("secret".to_string()),
                report_room: Some("!reports:example.org".to_string()),
            },
            polling: PollConfig::default(),
            directories: Vec::new(),
            logging: LoggingConfig::default(),
        }
    }

    #[test]
    fn test_default_poll_config() {
        let polling = PollConfig::default();
        let timing = polling.timing();
        assert_eq!(timing.poll_interval, Duration::from_secs(300));
        assert_eq!(timing.backoff.base, Duration::from_secs(10));
        assert_eq!(timing.backoff.max, Duration::from_secs(1800));
        assert_eq!(timing.max_retries_steady, 5);
        assert_eq!(timing.max_retries_seeding, 999);
        assert_eq!(polling.page_limit, 1000);
    }

    #[test]
    fn test_default_directory_is_public() {
        let config = config();
        assert_eq!(config.directories(), vec![DirectoryConfig::new("public")]);
        assert!(config.directory("public").is_ok());
        assert!(matches!(
            config.directory("missing"),
            Err(WatchdogError::UnknownDirectory(_))
        ));
    }

    #[test]
    fn test_validate_rejects_inverted_backoff() {
        let mut config = config();
        config.polling.base_backoff_secs = 60;
        config.polling.max_backoff_secs = 30;
        assert!(matches!(
            config.validate(),
            Err(WatchdogError::ConfigError(_))
        ));
    }

    #[test]
    fn test_validate_rejects_bad_homeserver_and_duplicates() {
        let mut bad = config();
        bad.matrix.homeserver = "not a url".to_string();
        assert!(bad.validate().is_err());

        let mut duplicated = config();
        duplicated.directories = vec![DirectoryConfig::new("a"), DirectoryConfig::new("a")];
        assert!(duplicated.validate().is_err());
    }

    #[test]
    fn test_report_room_override_and_requirement() {
        let mut config = config();
        let mut remote = DirectoryConfig::new("remote");
        remote.report_room = Some("!other:example.org".to_string());
        config.directories = vec![DirectoryConfig::new("local"), remote.clone()];

        assert_eq!(
            config.report_room_for(&remote).as_deref(),
            Some("!other:example.org")
        );
        assert!(config.validate_for_reporting().is_ok());

        config.matrix.report_room = None;
        assert!(config.validate_for_reporting().is_err());
    }

    #[test]
    fn test_access_token_is_not_serialized() {
        let json = serde_json::to_string(&config()).unwrap();
        assert!(!json.contains("secret"));
    }
}
