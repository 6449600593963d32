//! Built-in defaults: the lowest-precedence layer of every merge.

use crate::config::{
    default_base_backoff_secs, default_max_backoff_secs, default_max_retries_seeding,
    default_max_retries_steady, default_page_limit, default_poll_interval_secs,
    default_request_timeout_secs, default_sink_timeout_secs,
};
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError};

/// Start a builder seeded with default polling values.
pub(crate) fn builder_with_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Config::builder()
        .set_default("polling.poll_interval_secs", default_poll_interval_secs())?
        .set_default("polling.base_backoff_secs", default_base_backoff_secs())?
        .set_default("polling.max_backoff_secs", default_max_backoff_secs())?
        .set_default(
            "polling.max_retries_steady",
            u64::from(default_max_retries_steady()),
        )?
        .set_default(
            "polling.max_retries_seeding",
            u64::from(default_max_retries_seeding()),
        )?
        .set_default("polling.page_limit", u64::from(default_page_limit()))?
        .set_default("polling.request_timeout_secs", default_request_timeout_secs())?
        .set_default("polling.sink_timeout_secs", default_sink_timeout_secs())
}
