//! CLI Tooling
//!
//! Command-line interface for the room directory watchdog.

use super::format::{format_directory_json, format_directory_text};
use crate::config::{ConfigLoader, WatchdogConfig};
use crate::error::WatchdogError;
use crate::logging::LoggingConfig;
use crate::sink::LogSink;
use crate::watchdog::{fetch_directory, Watchdog};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// roomwatch - Matrix room directory watchdog
#[derive(Parser, Debug)]
#[command(name = "roomwatch")]
#[command(about = "Watch Matrix public room directories and report changes")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file path (overrides default config loading)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long, global = true)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file, file+stderr, both)
    #[arg(long, global = true)]
    pub log_output: Option<String>,

    /// Log file path (if output includes "file")
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Watch the configured directories until interrupted
    Watch {
        /// Log changes instead of posting them to the report room
        #[arg(long)]
        dry_run: bool,
    },
    /// Fetch a directory once and print its rooms
    List {
        /// Directory name from the configuration (default: the first one)
        #[arg(long)]
        directory: Option<String>,
        /// Output format (text or json)
        #[arg(long, default_value = "text", value_parser = ["text", "json"])]
        format: String,
    },
}

impl Cli {
    /// Apply logging flags on top of the configured logging settings.
    pub fn logging_config(&self, base: &LoggingConfig) -> LoggingConfig {
        let mut logging = base.clone();
        if let Some(level) = &self.log_level {
            logging.level = level.clone();
        }
        if let Some(format) = &self.log_format {
            logging.format = format.clone();
        }
        if let Some(output) = &self.log_output {
            logging.output = output.clone();
        }
        if let Some(file) = &self.log_file {
            logging.file = Some(file.clone());
        }
        logging
    }
}

/// CLI context holding the loaded configuration
pub struct CliContext {
    config: WatchdogConfig,
}

impl CliContext {
    /// Load configuration from `config_path`, or from the standard locations
    /// relative to `working_dir`.
    pub fn new(working_dir: PathBuf, config_path: Option<PathBuf>) -> Result<Self, WatchdogError> {
        let config = ConfigLoader::load(&working_dir, config_path.as_deref())?;
        Ok(Self { config })
    }

    pub fn from_config(config: WatchdogConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &WatchdogConfig {
        &self.config
    }

    /// Execute a command; returns text to print on stdout.
    pub async fn execute(
        &self,
        command: &Commands,
        cancel: CancellationToken,
    ) -> Result<String, WatchdogError> {
        match command {
            Commands::Watch { dry_run } => {
                let watchdog = if *dry_run {
                    info!("Dry run: changes are logged, not posted");
                    Watchdog::new(&self.config, Arc::new(LogSink))?
                } else {
                    Watchdog::with_room_sinks(&self.config)?
                };
                watchdog.run(cancel).await?;
                Ok(String::new())
            }
            Commands::List { directory, format } => {
                let directory = match directory {
                    Some(name) => self.config.directory(name)?,
                    None => self
                        .config
                        .directories()
                        .into_iter()
                        .next()
                        .ok_or_else(|| WatchdogError::UnknownDirectory("(none)".to_string()))?,
                };
                let snapshot = fetch_directory(&self.config, &directory, &cancel).await?;
                match format.as_str() {
                    "json" => Ok(format_directory_json(&directory.name, &snapshot)?),
                    _ => Ok(format_directory_text(&directory.name, &snapshot)),
                }
            }
        }
    }
}
