//! roomwatch: Matrix Room Directory Watchdog
//!
//! Periodically enumerates paginated public room directories, diffs each
//! enumeration against the last confirmed snapshot and reports rooms that
//! were added, removed or renamed to a notification sink.

pub mod config;
pub mod diff;
pub mod error;
pub mod fetch;
pub mod logging;
pub mod matrix;
pub mod reconcile;
pub mod sink;
pub mod snapshot;
pub mod source;
pub mod tooling;
pub mod types;
pub mod watchdog;

#[cfg(test)]
mod testing;

pub use config::{ConfigLoader, DirectoryConfig, WatchdogConfig};
pub use diff::{diff, ChangeEvent, ChangeReport, ChangeSet};
pub use error::{FetchError, SinkError, SourceError, WatchdogError};
pub use fetch::{BackoffPolicy, PaginatedFetcher};
pub use reconcile::{CycleOutcome, DirectoryWatch, WatchState, WatchTiming};
pub use sink::{LogSink, NotificationSink};
pub use snapshot::Snapshot;
pub use source::{Cursor, DirectorySource, Page};
pub use types::{ResourceId, ResourceRecord, TrackedField};
pub use watchdog::Watchdog;
