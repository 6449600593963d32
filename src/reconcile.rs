//! Reconciliation Loop
//!
//! Drives one watched directory: seeds a baseline snapshot, then on every
//! tick re-enumerates the directory, diffs against the stored snapshot,
//! forwards the ordered changes to the sink and commits the new snapshot.
//!
//! A seeding failure ends the loop with an error since there is no state to
//! fall back on. A failed steady-state cycle is logged and skipped, leaving
//! the stored snapshot untouched.

use crate::diff::{diff, ChangeReport};
use crate::error::{FetchError, WatchdogError};
use crate::fetch::{BackoffPolicy, PaginatedFetcher};
use crate::sink::{deliver_within, NotificationSink};
use crate::snapshot::{Snapshot, SnapshotStore};
use crate::source::DirectorySource;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Timing and retry policy for one watch loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchTiming {
    /// Fixed interval between cycle starts
    pub poll_interval: Duration,
    pub backoff: BackoffPolicy,
    /// Retry ceiling per page once a baseline exists
    pub max_retries_steady: u32,
    /// Retry ceiling per page for the seeding fetch
    pub max_retries_seeding: u32,
    /// Upper bound on a single sink delivery
    pub sink_timeout: Duration,
}

impl Default for WatchTiming {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(300),
            backoff: BackoffPolicy::default(),
            max_retries_steady: 5,
            max_retries_seeding: 999,
            sink_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchState {
    /// No confirmed snapshot yet
    Seeding,
    /// A baseline snapshot exists
    Steady,
}

/// Result of one steady-state cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    Unchanged,
    Changed {
        removed: usize,
        added: usize,
        changed: usize,
    },
    /// The fetch failed; the stored snapshot was kept
    Skipped(FetchError),
    Cancelled,
}

/// Watch loop for a single directory; owns that directory's snapshot store.
pub struct DirectoryWatch {
    name: String,
    fetcher: PaginatedFetcher,
    sink: Arc<dyn NotificationSink>,
    timing: WatchTiming,
    store: SnapshotStore,
}

impl DirectoryWatch {
    pub fn new(
        name: impl Into<String>,
        source: Arc<dyn DirectorySource>,
        sink: Arc<dyn NotificationSink>,
        timing: WatchTiming,
    ) -> Self {
        Self {
            name: name.into(),
            fetcher: PaginatedFetcher::new(source, timing.backoff),
            sink,
            timing,
            store: SnapshotStore::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> WatchState {
        if self.store.is_seeded() {
            WatchState::Steady
        } else {
            WatchState::Seeding
        }
    }

    pub fn snapshot(&self) -> Option<&Snapshot> {
        self.store.current()
    }

    /// Establish the baseline snapshot using the seeding retry ceiling.
    ///
    /// Nothing is reported for the seed even though every entry is new.
    pub async fn seed(&mut self, cancel: &CancellationToken) -> Result<(), FetchError> {
        let snapshot = self
            .fetcher
            .fetch_all(self.timing.max_retries_seeding, cancel)
            .await?;

        debug_assert!(diff(None, &snapshot).is_empty());
        info!(
            directory = %self.name,
            entries = snapshot.len(),
            "Seeded directory snapshot"
        );
        self.store.replace(snapshot);
        Ok(())
    }

    /// Run one steady-state cycle: fetch, diff, report, commit.
    pub async fn poll_once(&mut self, cancel: &CancellationToken) -> CycleOutcome {
        let snapshot = match self
            .fetcher
            .fetch_all(self.timing.max_retries_steady, cancel)
            .await
        {
            Ok(snapshot) => snapshot,
            Err(FetchError::Cancelled) => return CycleOutcome::Cancelled,
            Err(err) => {
                error!(
                    directory = %self.name,
                    error = %err,
                    "Failed to fetch directory while monitoring, keeping previous snapshot"
                );
                return CycleOutcome::Skipped(err);
            }
        };

        let change_set = diff(self.store.current(), &snapshot);
        if change_set.is_empty() {
            debug!(directory = %self.name, entries = snapshot.len(), "No directory changes");
            self.store.replace(snapshot);
            return CycleOutcome::Unchanged;
        }

        let outcome = CycleOutcome::Changed {
            removed: change_set.removed.len(),
            added: change_set.added.len(),
            changed: change_set.changed.len(),
        };
        info!(
            directory = %self.name,
            removed = change_set.removed.len(),
            added = change_set.added.len(),
            changed = change_set.changed.len(),
            "Directory changes detected"
        );

        // A non-empty change set implies a stored baseline.
        if let Some(previous) = self.store.current() {
            let report = ChangeReport::new(&self.name, change_set.events(previous, &snapshot));
            self.forward(&report, cancel).await;
        }

        self.store.replace(snapshot);
        outcome
    }

    async fn forward(&self, report: &ChangeReport, cancel: &CancellationToken) {
        let delivery = deliver_within(self.sink.as_ref(), self.timing.sink_timeout, report);
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                warn!(
                    directory = %self.name,
                    events = report.events.len(),
                    "Abandoned change report delivery on shutdown"
                );
                return;
            }
            result = delivery => result,
        };
        match result {
            Ok(()) => debug!(
                directory = %self.name,
                events = report.events.len(),
                "Delivered change report"
            ),
            Err(err) => warn!(
                directory = %self.name,
                error = %err,
                "Failed to deliver change report"
            ),
        }
    }

    /// Seed, then poll on a fixed interval until cancelled.
    ///
    /// Returns `Ok(())` on cancellation and `SeedFailed` if the baseline
    /// could not be established.
    pub async fn run(mut self, cancel: CancellationToken) -> Result<(), WatchdogError> {
        info!(directory = %self.name, "Starting directory watch");

        match self.seed(&cancel).await {
            Ok(()) => {}
            Err(FetchError::Cancelled) => {
                info!(directory = %self.name, "Directory watch cancelled while seeding");
                return Ok(());
            }
            Err(err) => {
                error!(
                    directory = %self.name,
                    error = %err,
                    "Seeding fetch failed, cannot watch directory"
                );
                return Err(WatchdogError::SeedFailed {
                    directory: self.name.clone(),
                    source: err,
                });
            }
        }

        let period = self.timing.poll_interval;
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }
            if self.poll_once(&cancel).await == CycleOutcome::Cancelled {
                break;
            }
        }

        info!(directory = %self.name, "Directory watch stopped");
        Ok(())
    }
}
