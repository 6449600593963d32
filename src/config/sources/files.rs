//! TOML file sources: global config file and working directory file.

use crate::config::paths::xdg_root;
use config::builder::DefaultState;
use config::{ConfigBuilder, File, FileFormat};
use std::path::Path;

/// File name looked up in the working directory
pub(crate) const WORKING_DIR_FILE: &str = "roomwatch.toml";

/// `$XDG_CONFIG_HOME/roomwatch/config.toml`, if it can be resolved.
pub(crate) fn add_global_file(builder: ConfigBuilder<DefaultState>) -> ConfigBuilder<DefaultState> {
    match xdg_root::global_config_path() {
        Ok(path) => builder.add_source(File::from(path).format(FileFormat::Toml).required(false)),
        Err(_) => builder,
    }
}

pub(crate) fn add_working_dir_file(
    builder: ConfigBuilder<DefaultState>,
    working_dir: &Path,
) -> ConfigBuilder<DefaultState> {
    let path = working_dir.join(WORKING_DIR_FILE);
    builder.add_source(File::from(path).format(FileFormat::Toml).required(false))
}

pub(crate) fn add_required_file(
    builder: ConfigBuilder<DefaultState>,
    path: &Path,
) -> ConfigBuilder<DefaultState> {
    builder.add_source(File::from(path).format(FileFormat::Toml).required(true))
}
