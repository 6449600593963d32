//! Watchdog service: one watch loop per configured directory.

use crate::config::{DirectoryConfig, WatchdogConfig};
use crate::error::{FetchError, WatchdogError};
use crate::fetch::PaginatedFetcher;
use crate::matrix::{MatrixClient, MatrixDirectorySource, MatrixRoomSink};
use crate::reconcile::DirectoryWatch;
use crate::sink::{notice_within, NotificationSink};
use crate::snapshot::Snapshot;
use crate::source::DirectorySource;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

pub const STARTUP_NOTICE: &str = "🔔 watchdog now running";
pub const SHUTDOWN_NOTICE: &str = "🔔 watchdog shutting down";

/// Watch service
pub struct Watchdog {
    watches: Vec<DirectoryWatch>,
    notice_sinks: Vec<Arc<dyn NotificationSink>>,
    sink_timeout: Duration,
}

impl Watchdog {
    /// Watch every configured directory, reporting all of them to `sink`.
    pub fn new(
        config: &WatchdogConfig,
        sink: Arc<dyn NotificationSink>,
    ) -> Result<Self, WatchdogError> {
        let client = Arc::new(MatrixClient::from_config(config)?);
        let timing = config.polling.timing();
        let watches = config
            .directories()
            .iter()
            .map(|directory| {
                DirectoryWatch::new(
                    directory.name.clone(),
                    directory_source(&client, config, directory),
                    Arc::clone(&sink),
                    timing,
                )
            })
            .collect();
        Ok(Self::from_watches(watches, vec![sink], timing.sink_timeout))
    }

    /// Watch every configured directory, posting reports into each
    /// directory's report room.
    pub fn with_room_sinks(config: &WatchdogConfig) -> Result<Self, WatchdogError> {
        config.validate_for_reporting()?;
        let client = Arc::new(MatrixClient::from_config(config)?);
        let timing = config.polling.timing();

        // one sink per distinct room so notices are posted once per room
        let mut room_sinks: BTreeMap<String, Arc<dyn NotificationSink>> = BTreeMap::new();
        let mut watches = Vec::new();
        for directory in config.directories() {
            let room = config.report_room_for(&directory).ok_or_else(|| {
                WatchdogError::ConfigError(format!(
                    "No report room configured for directory '{}'",
                    directory.name
                ))
            })?;
            let sink = Arc::clone(room_sinks.entry(room.clone()).or_insert_with(|| {
                Arc::new(MatrixRoomSink::new(Arc::clone(&client), room)) as Arc<dyn NotificationSink>
            }));
            watches.push(DirectoryWatch::new(
                directory.name.clone(),
                directory_source(&client, config, &directory),
                sink,
                timing,
            ));
        }

        Ok(Self::from_watches(
            watches,
            room_sinks.into_values().collect(),
            timing.sink_timeout,
        ))
    }

    /// Assemble a service from prepared watch loops.
    pub fn from_watches(
        watches: Vec<DirectoryWatch>,
        notice_sinks: Vec<Arc<dyn NotificationSink>>,
        sink_timeout: Duration,
    ) -> Self {
        Self {
            watches,
            notice_sinks,
            sink_timeout,
        }
    }

    pub fn directories(&self) -> Vec<&str> {
        self.watches.iter().map(DirectoryWatch::name).collect()
    }

    /// Run all watch loops until `cancel` fires or one of them fails fatally.
    ///
    /// A fatal failure cancels the remaining loops and is returned once they
    /// have stopped.
    pub async fn run(self, cancel: CancellationToken) -> Result<(), WatchdogError> {
        let Watchdog {
            watches,
            notice_sinks,
            sink_timeout,
        } = self;

        announce(&notice_sinks, sink_timeout, STARTUP_NOTICE).await;
        info!(directories = watches.len(), "Watchdog running");

        let loops = cancel.child_token();
        let mut tasks = JoinSet::new();
        for watch in watches {
            tasks.spawn(watch.run(loops.clone()));
        }

        let mut first_error = None;
        while let Some(joined) = tasks.join_next().await {
            let result = joined
                .map_err(|e| WatchdogError::TaskFailed(e.to_string()))
                .and_then(|result| result);
            if let Err(err) = result {
                error!(error = %err, "Watch loop failed");
                if first_error.is_none() {
                    loops.cancel();
                    first_error = Some(err);
                }
            }
        }

        announce(&notice_sinks, sink_timeout, SHUTDOWN_NOTICE).await;
        info!("Watchdog stopped");
        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

async fn announce(sinks: &[Arc<dyn NotificationSink>], limit: Duration, text: &str) {
    for sink in sinks {
        if let Err(err) = notice_within(sink.as_ref(), limit, text).await {
            warn!(error = %err, notice = text, "Failed to post notice");
        }
    }
}

fn directory_source(
    client: &Arc<MatrixClient>,
    config: &WatchdogConfig,
    directory: &DirectoryConfig,
) -> Arc<dyn DirectorySource> {
    let source = MatrixDirectorySource::new(Arc::clone(client), config.polling.page_limit);
    match &directory.server {
        Some(server) => Arc::new(source.with_server(server.clone())),
        None => Arc::new(source),
    }
}

/// One-shot enumeration of a configured directory using the seeding retry ceiling.
pub async fn fetch_directory(
    config: &WatchdogConfig,
    directory: &DirectoryConfig,
    cancel: &CancellationToken,
) -> Result<Snapshot, WatchdogError> {
    let client = Arc::new(MatrixClient::from_config(config)?);
    let timing = config.polling.timing();
    let fetcher = PaginatedFetcher::new(directory_source(&client, config, directory), timing.backoff);
    fetcher
        .fetch_all(timing.max_retries_seeding, cancel)
        .await
        .map_err(|source: FetchError| WatchdogError::FetchFailed {
            directory: directory.name.clone(),
            source,
        })
}
