//! `list` command against a mock homeserver.

use super::rooms_page;
use roomwatch::tooling::cli::{CliContext, Commands};
use roomwatch::WatchdogError;
use std::fs;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn write_config(dir: &TempDir, homeserver: &str) -> std::path::PathBuf {
    let config = dir.path().join("roomwatch.toml");
    fs::write(
        &config,
        format!(
            r#"
[matrix]
homeserver = "{}"
report_room = "!reports:example.org"

[polling]
base_backoff_secs = 0
page_limit = 50

[[directories]]
name = "local"

[[directories]]
name = "remote"
server = "other.example.net"
"#,
            homeserver
        ),
    )
    .unwrap();
    config
}

#[tokio::test]
async fn test_list_prints_json_for_named_directory() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/_matrix/client/v3/publicRooms"))
        .and(query_param("server", "other.example.net"))
        .and(query_param("limit", "50"))
        .respond_with(ResponseTemplate::new(200).set_body_json(rooms_page(
            &[("!z:other.example.net", "Zulu"), ("!y:other.example.net", "Yankee")],
            None,
        )))
        .expect(1)
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let config = write_config(&temp, &server.uri());
    let context = CliContext::new(temp.path().to_path_buf(), Some(config)).unwrap();

    let output = context
        .execute(
            &Commands::List {
                directory: Some("remote".to_string()),
                format: "json".to_string(),
            },
            CancellationToken::new(),
        )
        .await
        .unwrap();

    let value: serde_json::Value = serde_json::from_str(&output).unwrap();
    assert_eq!(value["directory"], "remote");
    assert_eq!(value["count"], 2);
    assert_eq!(value["rooms"][0]["name"], "Yankee");
}

#[tokio::test]
async fn test_list_defaults_to_first_directory_as_table() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/_matrix/client/v3/publicRooms"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(rooms_page(&[("!a:example.org", "Alpha")], None)),
        )
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    write_config(&temp, &server.uri());
    let context = CliContext::new(temp.path().to_path_buf(), None).unwrap();

    let output = context
        .execute(
            &Commands::List {
                directory: None,
                format: "text".to_string(),
            },
            CancellationToken::new(),
        )
        .await
        .unwrap();

    assert!(output.starts_with("Directory: local (1 rooms)"));
    assert!(output.contains("Alpha"));
}

#[tokio::test]
async fn test_list_unknown_directory() {
    let temp = TempDir::new().unwrap();
    let config = write_config(&temp, "https://matrix.example.org");
    let context = CliContext::new(temp.path().to_path_buf(), Some(config)).unwrap();

    let err = context
        .execute(
            &Commands::List {
                directory: Some("missing".to_string()),
                format: "text".to_string(),
            },
            CancellationToken::new(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, WatchdogError::UnknownDirectory(name) if name == "missing"));
}
