//! ConfigLoader facade delegating to merge service.

use super::merge::service::MergeService;
use super::WatchdogConfig;
use crate::error::WatchdogError;
use std::path::Path;

/// Configuration loader facade.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from an explicit file, or from the standard
    /// locations relative to `working_dir` when none is given.
    pub fn load(
        working_dir: &Path,
        explicit: Option<&Path>,
    ) -> Result<WatchdogConfig, WatchdogError> {
        let config = match explicit {
            Some(path) => MergeService::load_from_file(path)?,
            None => MergeService::load(working_dir)?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> Result<WatchdogConfig, WatchdogError> {
        let config = MergeService::load_from_file(path)?;
        config.validate()?;
        Ok(config)
    }
}
