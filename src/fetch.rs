//! Paginated Fetcher
//!
//! Retrieves one complete enumeration of a [`DirectorySource`], following
//! pagination cursors and retrying failed pages with capped exponential
//! backoff. A fetch either returns a complete [`Snapshot`] or fails as a
//! whole; partially accumulated entries are dropped on failure.

use crate::error::{FetchError, SourceError};
use crate::snapshot::Snapshot;
use crate::source::{Cursor, DirectorySource};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

/// Capped exponential backoff: `min(base * 2^retry_count, max)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub base: Duration,
    pub max: Duration,
}

impl BackoffPolicy {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self { base, max }
    }

    /// Delay before retry number `retry_count + 1`.
    ///
    /// Saturates at `max` for any retry count.
    pub fn delay_for(&self, retry_count: u32) -> Duration {
        let factor = 1u32.checked_shl(retry_count).unwrap_or(u32::MAX);
        self.base
            .checked_mul(factor)
            .unwrap_or(Duration::MAX)
            .min(self.max)
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base: Duration::from_secs(10),
            max: Duration::from_secs(1800),
        }
    }
}

/// Retry bookkeeping for the page currently being fetched.
///
/// Lives for one fetch only and is reset after every successful page, so a
/// single flaky page does not erode the budget of the pages after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryState {
    retry_count: u32,
    max_retries: u32,
}

impl RetryState {
    pub fn new(max_retries: u32) -> Self {
        Self {
            retry_count: 0,
            max_retries,
        }
    }

    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Delay to wait before the next retry, or `None` once the ceiling is hit.
    pub fn next_delay(&mut self, policy: &BackoffPolicy) -> Option<Duration> {
        if self.retry_count >= self.max_retries {
            return None;
        }
        let delay = policy.delay_for(self.retry_count);
        self.retry_count += 1;
        Some(delay)
    }

    pub fn reset(&mut self) {
        self.retry_count = 0;
    }
}

/// Fetches full snapshots from one directory source
#[derive(Clone)]
pub struct PaginatedFetcher {
    source: Arc<dyn DirectorySource>,
    backoff: BackoffPolicy,
}

impl PaginatedFetcher {
    pub fn new(source: Arc<dyn DirectorySource>, backoff: BackoffPolicy) -> Self {
        Self { source, backoff }
    }

    pub fn backoff(&self) -> &BackoffPolicy {
        &self.backoff
    }

    /// Enumerate every page of the source into one snapshot.
    ///
    /// Each failed page is retried on the same cursor up to `max_retries`
    /// times. Cancellation is honoured during page requests and backoff
    /// sleeps.
    pub async fn fetch_all(
        &self,
        max_retries: u32,
        cancel: &CancellationToken,
    ) -> Result<Snapshot, FetchError> {
        let started = Instant::now();
        let source = self.source.describe();
        let mut snapshot = Snapshot::new();
        let mut cursor = Cursor::start();
        let mut retry = RetryState::new(max_retries);
        let mut pages = 0usize;

        loop {
            let result: Result<_, SourceError> = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(FetchError::Cancelled),
                result = self.source.list_page(&cursor) => result,
            };

            match result {
                Ok(page) => {
                    retry.reset();
                    pages += 1;
                    debug!(
                        source = %source,
                        page = pages,
                        entries = page.entries.len(),
                        "Fetched directory page"
                    );
                    snapshot.extend(page.entries);
                    match page.next_cursor {
                        Some(next) => cursor = next,
                        None => break,
                    }
                }
                Err(err) => {
                    let Some(delay) = retry.next_delay(&self.backoff) else {
                        error!(
                            source = %source,
                            retries = retry.retry_count(),
                            error = %err,
                            "Failed to query directory and exhausted retries"
                        );
                        return Err(FetchError::Exhausted {
                            retries: retry.retry_count(),
                            last: err,
                        });
                    };
                    warn!(
                        source = %source,
                        attempt = retry.retry_count(),
                        max_retries = retry.max_retries(),
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Failed to query directory, will retry"
                    );
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return Err(FetchError::Cancelled),
                        _ = sleep(delay) => {}
                    }
                }
            }
        }

        debug!(
            source = %source,
            pages,
            entries = snapshot.len(),
            duration_ms = started.elapsed().as_millis() as u64,
            "Directory enumeration complete"
        );
        Ok(snapshot)
    }
}
