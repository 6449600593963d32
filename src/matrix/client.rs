//! Minimal Matrix client-server API client.
//!
//! Covers the two calls the watchdog needs: listing the public room
//! directory and sending a message into a room.

use crate::config::WatchdogConfig;
use crate::error::{SinkError, SourceError, WatchdogError};
use crate::fetch::{BackoffPolicy, RetryState};
use reqwest::{header, Client, StatusCode, Url};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// One entry of a `publicRooms` response chunk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicRoomChunk {
    pub room_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub canonical_alias: Option<String>,
    #[serde(default)]
    pub num_joined_members: u64,
}

/// Body of `GET /_matrix/client/v3/publicRooms`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicRoomsResponse {
    pub chunk: Vec<PublicRoomChunk>,
    #[serde(default)]
    pub next_batch: Option<String>,
    #[serde(default)]
    pub prev_batch: Option<String>,
    #[serde(default)]
    pub total_room_count_estimate: Option<u64>,
}

/// `m.room.message` content with an optional HTML rendering
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageContent {
    pub msgtype: String,
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formatted_body: Option<String>,
}

impl MessageContent {
    pub fn text(body: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            msgtype: "m.text".to_string(),
            body: body.into(),
            format: Some("org.matrix.custom.html".to_string()),
            formatted_body: Some(html.into()),
        }
    }

    pub fn notice(body: impl Into<String>) -> Self {
        Self {
            msgtype: "m.notice".to_string(),
            body: body.into(),
            format: None,
            formatted_body: None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SendResponse {
    event_id: String,
}

/// Standard Matrix error body; `retry_after_ms` accompanies `M_LIMIT_EXCEEDED`
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    retry_after_ms: Option<u64>,
}

/// Retry policy for message sends.
///
/// Rate limiting (429), server errors (5xx) and transport failures are
/// retried with the same transaction ID, so the homeserver deduplicates a
/// send that did land.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SendRetry {
    pub max_retries: u32,
    pub backoff: BackoffPolicy,
}

impl Default for SendRetry {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff: BackoffPolicy::new(Duration::from_secs(1), Duration::from_secs(16)),
        }
    }
}

/// A failed send attempt and the server's requested wait, if any
struct SendFailure {
    error: SinkError,
    retry_after: Option<Duration>,
}

impl From<SinkError> for SendFailure {
    fn from(error: SinkError) -> Self {
        Self {
            error,
            retry_after: None,
        }
    }
}

/// HTTP client bound to one homeserver
#[derive(Debug)]
pub struct MatrixClient {
    http: Client,
    homeserver: Url,
    access_token: Option<String>,
    txn_counter: AtomicU64,
    send_retry: SendRetry,
}

impl MatrixClient {
    pub fn new(
        homeserver: Url,
        access_token: Option<String>,
        request_timeout: Duration,
    ) -> Result<Self, WatchdogError> {
        let http = Client::builder()
            .timeout(request_timeout)
            .user_agent(concat!("roomwatch/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                WatchdogError::ConfigError(format!("Failed to build HTTP client: {}", e))
            })?;
        Ok(Self {
            http,
            homeserver,
            access_token,
            txn_counter: AtomicU64::new(0),
            send_retry: SendRetry::default(),
        })
    }

    pub fn with_send_retry(mut self, send_retry: SendRetry) -> Self {
        self.send_retry = send_retry;
        self
    }

    pub fn from_config(config: &WatchdogConfig) -> Result<Self, WatchdogError> {
        Self::new(
            config.homeserver_url()?,
            config.matrix.access_token.clone(),
            config.polling.request_timeout(),
        )
    }

    pub fn homeserver(&self) -> &Url {
        &self.homeserver
    }

    /// Build `<homeserver>/<segments...>`; each segment is percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, String> {
        let mut url = self.homeserver.clone();
        url.path_segments_mut()
            .map_err(|_| format!("Homeserver URL cannot be a base: {}", self.homeserver))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.access_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Fetch one page of a public room directory.
    ///
    /// `server` selects a remote server's directory; the homeserver's own
    /// directory is listed when it is `None`.
    #[instrument(skip(self), level = "debug")]
    pub async fn public_rooms(
        &self,
        since: Option<&str>,
        limit: u32,
        server: Option<&str>,
    ) -> Result<PublicRoomsResponse, SourceError> {
        let url = self
            .endpoint(&["_matrix", "client", "v3", "publicRooms"])
            .map_err(SourceError::Transient)?;

        let mut query: Vec<(&str, String)> = vec![("limit", limit.to_string())];
        if let Some(since) = since {
            query.push(("since", since.to_string()));
        }
        if let Some(server) = server {
            query.push(("server", server.to_string()));
        }

        let response = self
            .authorize(self.http.get(url))
            .header(header::ACCEPT, "application/json")
            .query(&query)
            .send()
            .await
            .map_err(|e| SourceError::Transient(format!("request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| SourceError::Transient(format!("failed to read body: {}", e)))?;

        if !status.is_success() {
            return Err(SourceError::Transient(format!(
                "HTTP {}: {}",
                status.as_u16(),
                truncate(&body, 200)
            )));
        }

        let page: PublicRoomsResponse = serde_json::from_str(&body)
            .map_err(|e| SourceError::MalformedPage(e.to_string()))?;
        debug!(
            entries = page.chunk.len(),
            has_next = page.next_batch.is_some(),
            "Fetched public rooms page"
        );
        Ok(page)
    }

    /// Send `content` into `room_id`; returns the new event ID.
    ///
    /// Retryable failures are retried per [`SendRetry`]; a 429 waits for the
    /// server's `retry_after_ms` (or `Retry-After`) instead of the backoff.
    #[instrument(skip(self, content), fields(msgtype = %content.msgtype), level = "debug")]
    pub async fn send_message(
        &self,
        room_id: &str,
        content: &MessageContent,
    ) -> Result<String, SinkError> {
        let txn_id = self.next_txn_id();
        let url = self
            .endpoint(&[
                "_matrix",
                "client",
                "v3",
                "rooms",
                room_id,
                "send",
                "m.room.message",
                &txn_id,
            ])
            .map_err(SinkError::Request)?;

        let mut retry = RetryState::new(self.send_retry.max_retries);
        loop {
            let failure = match self.put_message(url.clone(), content).await {
                Ok(event_id) => {
                    debug!(event_id = %event_id, "Message sent");
                    return Ok(event_id);
                }
                Err(failure) => failure,
            };

            if !failure.error.is_retryable() {
                return Err(failure.error);
            }
            let Some(delay) = retry.next_delay(&self.send_retry.backoff) else {
                warn!(
                    room_id,
                    retries = retry.retry_count(),
                    error = %failure.error,
                    "Failed to send message and exhausted retries"
                );
                return Err(failure.error);
            };
            let wait = failure.retry_after.unwrap_or(delay);
            warn!(
                room_id,
                attempt = retry.retry_count(),
                wait_ms = wait.as_millis() as u64,
                error = %failure.error,
                "Failed to send message, will retry"
            );
            tokio::time::sleep(wait).await;
        }
    }

    async fn put_message(&self, url: Url, content: &MessageContent) -> Result<String, SendFailure> {
        let response = self
            .authorize(self.http.put(url))
            .json(content)
            .send()
            .await
            .map_err(|e| SinkError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let header_wait = response
                .headers()
                .get(header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(parse_retry_after);
            let body = response.text().await.unwrap_or_default();
            let retry_after = if status == StatusCode::TOO_MANY_REQUESTS {
                serde_json::from_str::<ErrorBody>(&body)
                    .ok()
                    .and_then(|b| b.retry_after_ms)
                    .map(Duration::from_millis)
                    .or(header_wait)
            } else {
                None
            };
            return Err(SendFailure {
                error: SinkError::Rejected {
                    status: status.as_u16(),
                    body: truncate(&body, 200).to_string(),
                },
                retry_after,
            });
        }

        let sent: SendResponse = response
            .json()
            .await
            .map_err(|e| SinkError::Request(format!("invalid send response: {}", e)))?;
        Ok(sent.event_id)
    }

    fn next_txn_id(&self) -> String {
        let seq = self.txn_counter.fetch_add(1, Ordering::Relaxed);
        format!(
            "roomwatch.{}.{}",
            chrono::Utc::now().timestamp_millis(),
            seq
        )
    }
}

/// `Retry-After` in delta-seconds form
fn parse_retry_after(value: &str) -> Option<Duration> {
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}

fn truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
