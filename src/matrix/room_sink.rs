//! Posts change reports into a Matrix room.

use super::client::{MatrixClient, MessageContent};
use crate::diff::{ChangeEvent, ChangeReport};
use crate::error::SinkError;
use crate::sink::NotificationSink;
use crate::types::{ResourceRecord, TrackedField};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

const REMOVED_HEADING: &str = "➖ Rooms removed:";
const ADDED_HEADING: &str = "➕ Rooms added:";

pub struct MatrixRoomSink {
    client: Arc<MatrixClient>,
    room_id: String,
}

impl MatrixRoomSink {
    pub fn new(client: Arc<MatrixClient>, room_id: impl Into<String>) -> Self {
        Self {
            client,
            room_id: room_id.into(),
        }
    }

    pub fn room_id(&self) -> &str {
        &self.room_id
    }
}

#[async_trait]
impl NotificationSink for MatrixRoomSink {
    async fn deliver(&self, report: &ChangeReport) -> Result<(), SinkError> {
        let messages = render_report(report);
        for message in &messages {
            self.client.send_message(&self.room_id, message).await?;
        }
        debug!(
            room_id = %self.room_id,
            directory = %report.directory,
            messages = messages.len(),
            "Posted change report"
        );
        Ok(())
    }

    async fn notice(&self, text: &str) -> Result<(), SinkError> {
        self.client
            .send_message(&self.room_id, &MessageContent::notice(text))
            .await
            .map(|_| ())
    }
}

/// Render a report as room messages: one list of removed rooms, one list of
/// added rooms, then one message per changed field.
pub fn render_report(report: &ChangeReport) -> Vec<MessageContent> {
    let mut messages = Vec::new();

    let removed: Vec<&ResourceRecord> = report.removed().collect();
    if !removed.is_empty() {
        messages.push(render_list(REMOVED_HEADING, &removed));
    }
    let added: Vec<&ResourceRecord> = report.added().collect();
    if !added.is_empty() {
        messages.push(render_list(ADDED_HEADING, &added));
    }

    for event in &report.events {
        if let ChangeEvent::Changed {
            previous,
            current,
            fields,
        } = event
        {
            for field in fields {
                messages.push(match field {
                    TrackedField::Name => render_name_update(previous, current),
                    TrackedField::Topic => render_topic_update(previous, current),
                });
            }
        }
    }

    messages
}

fn render_list(heading: &str, records: &[&ResourceRecord]) -> MessageContent {
    let mut text = format!("**{}**\n", heading);
    let mut html = format!("<strong>{}</strong><br><ul>", heading);
    for record in records {
        text.push_str(&format!("{} `{}`\n", record.display_name(), record.id));
        html.push_str(&format!(
            "<li>{} <code>{}</code></li>",
            escape_html(record.display_name()),
            escape_html(record.id.as_str())
        ));
    }
    html.push_str("</ul>");
    MessageContent::text(text, html)
}

fn render_name_update(previous: &ResourceRecord, current: &ResourceRecord) -> MessageContent {
    let old = shown(previous.name.as_deref());
    let new = shown(current.name.as_deref());
    let text = format!(
        "**Room name update:**\n`{}` -> `{}`\n`{}`",
        old, new, current.id
    );
    let html = format!(
        "<strong>Room name update:</strong><br><code>{}</code> -> <code>{}</code><br><code>{}</code>",
        escape_html(old),
        escape_html(new),
        escape_html(current.id.as_str())
    );
    MessageContent::text(text, html)
}

fn render_topic_update(previous: &ResourceRecord, current: &ResourceRecord) -> MessageContent {
    let old = shown(previous.topic.as_deref());
    let new = shown(current.topic.as_deref());
    let text = format!(
        "**Room topic update:**\n`{}`\n`{}` -> `{}`\n`{}`",
        current.display_name(),
        old,
        new,
        current.id
    );
    let html = format!(
        "<strong>Room topic update:</strong><br><code>{}</code><br>Old topic: <code>{}</code><br>New topic: <code>{}</code><br><code>{}</code>",
        escape_html(current.display_name()),
        escape_html(old),
        escape_html(new),
        escape_html(current.id.as_str())
    );
    MessageContent::text(text, html)
}

fn shown(value: Option<&str>) -> &str {
    value.unwrap_or("(none)")
}

fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
