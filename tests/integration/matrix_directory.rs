//! Paginated enumeration of a mock public room directory.

use super::rooms_page;
use reqwest::Url;
use roomwatch::matrix::{MatrixClient, MatrixDirectorySource};
use roomwatch::{BackoffPolicy, DirectorySource, FetchError, PaginatedFetcher, ResourceId, SourceError};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fetcher(server: &MockServer) -> PaginatedFetcher {
    let client = MatrixClient::new(
        Url::parse(&server.uri()).unwrap(),
        Some("token".to_string()),
        Duration::from_secs(5),
    )
    .unwrap();
    let source: Arc<dyn DirectorySource> = Arc::new(MatrixDirectorySource::new(Arc::new(client), 2));
    PaginatedFetcher::new(
        source,
        BackoffPolicy::new(Duration::from_millis(1), Duration::from_millis(4)),
    )
}

#[tokio::test]
async fn test_fetch_all_follows_next_batch_and_retries_failed_page() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/_matrix/client/v3/publicRooms"))
        .and(query_param_is_missing("since"))
        .respond_with(ResponseTemplate::new(200).set_body_json(rooms_page(
            &[("!a:example.org", "Alpha"), ("!b:example.org", "Beta")],
            Some("p2"),
        )))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/_matrix/client/v3/publicRooms"))
        .and(query_param("since", "p2"))
        .respond_with(ResponseTemplate::new(502))
        .up_to_n_times(2)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/_matrix/client/v3/publicRooms"))
        .and(query_param("since", "p2"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(rooms_page(&[("!c:example.org", "Gamma")], None)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let snapshot = fetcher(&server)
        .fetch_all(5, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(snapshot.len(), 3);
    assert_eq!(
        snapshot
            .get(&ResourceId::from("!c:example.org"))
            .and_then(|r| r.name.as_deref()),
        Some("Gamma")
    );
    // first page fetched once, failed page retried on the same cursor
    assert_eq!(server.received_requests().await.unwrap().len(), 4);
}

#[tokio::test]
async fn test_fetch_all_exhausts_on_persistent_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = fetcher(&server)
        .fetch_all(2, &CancellationToken::new())
        .await
        .unwrap_err();

    match err {
        FetchError::Exhausted { retries, last } => {
            assert_eq!(retries, 2);
            assert!(matches!(last, SourceError::Transient(_)));
        }
        other => panic!("expected exhaustion, got {:?}", other),
    }
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
}
