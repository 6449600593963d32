//! Notification sink contract and the logging sink.

use crate::diff::{ChangeEvent, ChangeReport};
use crate::error::SinkError;
use async_trait::async_trait;
use std::time::Duration;
use tokio::time::timeout;
use tracing::info;

/// Receives ordered change reports from the watch loops.
///
/// Delivery is at-least-once from the loop's point of view: the loop never
/// retries a failed delivery, so implementations own their retry policy.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn deliver(&self, report: &ChangeReport) -> Result<(), SinkError>;

    /// Lifecycle notice (startup, shutdown)
    async fn notice(&self, text: &str) -> Result<(), SinkError>;
}

/// Deliver `report`, giving up with [`SinkError::Timeout`] after `limit`.
pub async fn deliver_within(
    sink: &dyn NotificationSink,
    limit: Duration,
    report: &ChangeReport,
) -> Result<(), SinkError> {
    timeout(limit, sink.deliver(report))
        .await
        .map_err(|_| SinkError::Timeout(limit))?
}

/// Post a notice, giving up with [`SinkError::Timeout`] after `limit`.
pub async fn notice_within(
    sink: &dyn NotificationSink,
    limit: Duration,
    text: &str,
) -> Result<(), SinkError> {
    timeout(limit, sink.notice(text))
        .await
        .map_err(|_| SinkError::Timeout(limit))?
}

/// Sink that writes every change as a structured log event.
#[derive(Debug, Default, Clone)]
pub struct LogSink;

#[async_trait]
impl NotificationSink for LogSink {
    async fn deliver(&self, report: &ChangeReport) -> Result<(), SinkError> {
        for event in &report.events {
            match event {
                ChangeEvent::Removed(record) | ChangeEvent::Added(record) => info!(
                    directory = %report.directory,
                    kind = event.kind(),
                    room_id = %record.id,
                    name = record.display_name(),
                    "Directory change"
                ),
                ChangeEvent::Changed {
                    previous,
                    current,
                    fields,
                } => {
                    for field in fields {
                        info!(
                            directory = %report.directory,
                            kind = event.kind(),
                            room_id = %current.id,
                            field = field.as_str(),
                            old = previous.field(*field).unwrap_or_default(),
                            new = current.field(*field).unwrap_or_default(),
                            "Directory change"
                        );
                    }
                }
            }
        }
        Ok(())
    }

    async fn notice(&self, text: &str) -> Result<(), SinkError> {
        info!(notice = text, "Watchdog notice");
        Ok(())
    }
}
