//! Error types for the watchdog.
//!
//! Errors are layered the way they are handled: a [`SourceError`] is a single
//! failed page request and is retried locally, a [`FetchError`] ends one full
//! enumeration, and a [`WatchdogError`] is what reaches the operator.

use std::time::Duration;
use thiserror::Error;

/// A single page request failed.
///
/// Both variants are retried identically by the fetcher; a malformed page is
/// repeated rather than skipped so no entries are silently dropped.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SourceError {
    /// Network or HTTP failure
    #[error("transient fetch error: {0}")]
    Transient(String),

    /// Page body could not be decoded into directory entries
    #[error("malformed page: {0}")]
    MalformedPage(String),
}

/// A full enumeration was abandoned.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("fetch exhausted after {retries} retries: {last}")]
    Exhausted { retries: u32, last: SourceError },

    #[error("fetch cancelled")]
    Cancelled,
}

/// Delivering a report or notice to the notification sink failed.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("sink request failed: {0}")]
    Request(String),

    #[error("sink rejected message with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("sink did not respond within {0:?}")]
    Timeout(Duration),
}

impl SinkError {
    /// Whether repeating the same request may succeed: transport failures,
    /// rate limiting and server errors.
    pub fn is_retryable(&self) -> bool {
        match self {
            SinkError::Request(_) => true,
            SinkError::Rejected { status, .. } => *status == 429 || (500..600).contains(status),
            SinkError::Timeout(_) => false,
        }
    }
}

/// Top-level errors surfaced by the service and the CLI.
#[derive(Debug, Error)]
pub enum WatchdogError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Seeding fetch for directory '{directory}' failed: {source}")]
    SeedFailed {
        directory: String,
        #[source]
        source: FetchError,
    },

    #[error("Fetch failed for directory '{directory}': {source}")]
    FetchFailed {
        directory: String,
        #[source]
        source: FetchError,
    },

    #[error("Unknown directory: {0}")]
    UnknownDirectory(String),

    #[error(transparent)]
    Sink(#[from] SinkError),

    #[error("Watch task failed: {0}")]
    TaskFailed(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<config::ConfigError> for WatchdogError {
    fn from(err: config::ConfigError) -> Self {
        WatchdogError::ConfigError(err.to_string())
    }
}
