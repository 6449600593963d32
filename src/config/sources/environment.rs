//! Environment variable source: ROOMWATCH__ prefix with __ separator

use config::builder::DefaultState;
use config::ConfigBuilder;
use config::Environment;

/// Add environment variable overlay to builder.
/// `ROOMWATCH__MATRIX__ACCESS_TOKEN` maps to `matrix.access_token`.
pub(crate) fn add_to_builder(builder: ConfigBuilder<DefaultState>) -> ConfigBuilder<DefaultState> {
    builder.add_source(
        Environment::with_prefix("ROOMWATCH")
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true),
    )
}
