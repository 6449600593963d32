//! Watch cycles against a mock homeserver, reporting into a mock room.

use super::{rooms_page, sent_bodies};
use reqwest::Url;
use roomwatch::matrix::{MatrixClient, MatrixDirectorySource, MatrixRoomSink};
use roomwatch::watchdog::{SHUTDOWN_NOTICE, STARTUP_NOTICE};
use roomwatch::{
    BackoffPolicy, CycleOutcome, DirectorySource, DirectoryWatch, NotificationSink, WatchState,
    WatchTiming, Watchdog, WatchdogConfig,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn timing() -> WatchTiming {
    WatchTiming {
        poll_interval: Duration::from_secs(3600),
        backoff: BackoffPolicy::new(Duration::from_millis(1), Duration::from_millis(4)),
        max_retries_steady: 1,
        max_retries_seeding: 3,
        sink_timeout: Duration::from_secs(5),
    }
}

async fn serve_directory(server: &MockServer, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/_matrix/client/v3/publicRooms"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

async fn accept_messages(server: &MockServer) {
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"event_id": "$e"})))
        .mount(server)
        .await;
}

fn watch(server: &MockServer) -> DirectoryWatch {
    let client = Arc::new(
        MatrixClient::new(
            Url::parse(&server.uri()).unwrap(),
            Some("token".to_string()),
            Duration::from_secs(5),
        )
        .unwrap(),
    );
    let source: Arc<dyn DirectorySource> =
        Arc::new(MatrixDirectorySource::new(Arc::clone(&client), 100));
    let sink: Arc<dyn NotificationSink> =
        Arc::new(MatrixRoomSink::new(client, "!reports:example.org"));
    DirectoryWatch::new("public", source, sink, timing())
}

#[tokio::test]
async fn test_seed_then_report_changes_to_room() {
    let server = MockServer::start().await;
    serve_directory(
        &server,
        rooms_page(&[("!a:x", "Alpha"), ("!b:x", "Beta")], None),
    )
    .await;
    accept_messages(&server).await;

    let cancel = CancellationToken::new();
    let mut watch = watch(&server);
    watch.seed(&cancel).await.unwrap();
    assert_eq!(watch.state(), WatchState::Steady);
    assert!(sent_bodies(&server).await.is_empty());

    server.reset().await;
    serve_directory(
        &server,
        rooms_page(&[("!b:x", "Bravo"), ("!c:x", "Gamma")], None),
    )
    .await;
    accept_messages(&server).await;

    let outcome = watch.poll_once(&cancel).await;
    assert_eq!(
        outcome,
        CycleOutcome::Changed {
            removed: 1,
            added: 1,
            changed: 1
        }
    );

    let bodies: Vec<String> = sent_bodies(&server)
        .await
        .iter()
        .map(|b| b["body"].as_str().unwrap_or_default().to_string())
        .collect();
    assert_eq!(bodies.len(), 3);
    assert!(bodies[0].contains("Rooms removed") && bodies[0].contains("!a:x"));
    assert!(bodies[1].contains("Rooms added") && bodies[1].contains("Gamma"));
    assert!(bodies[2].contains("Room name update") && bodies[2].contains("`Beta` -> `Bravo`"));
}

#[tokio::test]
async fn test_failed_poll_keeps_snapshot_and_sends_nothing() {
    let server = MockServer::start().await;
    serve_directory(&server, rooms_page(&[("!a:x", "Alpha")], None)).await;
    accept_messages(&server).await;

    let cancel = CancellationToken::new();
    let mut watch = watch(&server);
    watch.seed(&cancel).await.unwrap();
    let before = watch.snapshot().cloned();

    server.reset().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    accept_messages(&server).await;

    assert!(matches!(
        watch.poll_once(&cancel).await,
        CycleOutcome::Skipped(_)
    ));
    assert_eq!(watch.snapshot().cloned(), before);
    assert!(sent_bodies(&server).await.is_empty());
}

#[tokio::test]
async fn test_rate_limited_report_is_still_posted() {
    let server = MockServer::start().await;
    serve_directory(&server, rooms_page(&[("!a:x", "Alpha")], None)).await;

    let cancel = CancellationToken::new();
    let mut watch = watch(&server);
    watch.seed(&cancel).await.unwrap();

    server.reset().await;
    serve_directory(&server, rooms_page(&[], None)).await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "errcode": "M_LIMIT_EXCEEDED",
            "error": "Too many requests",
            "retry_after_ms": 10
        })))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    accept_messages(&server).await;

    let outcome = watch.poll_once(&cancel).await;
    assert_eq!(
        outcome,
        CycleOutcome::Changed {
            removed: 1,
            added: 0,
            changed: 0
        }
    );

    let bodies = sent_bodies(&server).await;
    assert_eq!(bodies.len(), 2);
    assert_eq!(bodies[0], bodies[1]);
    assert!(bodies[1]["body"].as_str().unwrap().contains("!a:x"));
    assert_eq!(watch.snapshot().map(|s| s.len()), Some(0));
}

#[tokio::test]
async fn test_watchdog_posts_lifecycle_notices() {
    let server = MockServer::start().await;
    serve_directory(&server, rooms_page(&[("!a:x", "Alpha")], None)).await;
    accept_messages(&server).await;

    let config: WatchdogConfig = serde_json::from_value(json!({
        "matrix": {
            "homeserver": server.uri(),
            "access_token": "token",
            "report_room": "!reports:example.org"
        }
    }))
    .unwrap();

    let cancel = CancellationToken::new();
    let watchdog = Watchdog::with_room_sinks(&config).unwrap();
    let handle = tokio::spawn(watchdog.run(cancel.clone()));
    tokio::time::sleep(Duration::from_millis(300)).await;
    cancel.cancel();
    handle.await.unwrap().unwrap();

    let bodies = sent_bodies(&server).await;
    assert_eq!(bodies.len(), 2);
    assert_eq!(bodies[0]["body"], STARTUP_NOTICE);
    assert_eq!(bodies[0]["msgtype"], "m.notice");
    assert_eq!(bodies[1]["body"], SHUTDOWN_NOTICE);
}

#[tokio::test]
async fn test_watchdog_requires_report_room() {
    let config: WatchdogConfig = serde_json::from_value(json!({
        "matrix": {"homeserver": "https://matrix.example.org"}
    }))
    .unwrap();
    assert!(Watchdog::with_room_sinks(&config).is_err());
}
