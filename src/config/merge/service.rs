//! MergeService: orchestrates sources, applies merge policy, deserializes to WatchdogConfig.

use crate::config::sources::{environment, files};
use crate::config::WatchdogConfig;
use config::ConfigError;
use std::path::Path;

use super::policy;

/// Merge service for config composition.
pub struct MergeService;

impl MergeService {
    /// Load config from the standard locations.
    /// Precedence: defaults (lowest) -> global file -> working directory file -> environment (highest).
    pub fn load(working_dir: &Path) -> Result<WatchdogConfig, ConfigError> {
        let builder = policy::builder_with_defaults()?;
        let builder = files::add_global_file(builder);
        let builder = files::add_working_dir_file(builder, working_dir);
        let builder = environment::add_to_builder(builder);

        builder.build()?.try_deserialize()
    }

    /// Load config from a specific file with environment overlay.
    /// The file must exist.
    pub fn load_from_file(path: &Path) -> Result<WatchdogConfig, ConfigError> {
        let builder = policy::builder_with_defaults()?;
        let builder = files::add_required_file(builder, path);
        let builder = environment::add_to_builder(builder);

        builder.build()?.try_deserialize()
    }
}
