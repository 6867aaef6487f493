use super::test_utils::StubServer;
use serde_json::json;
use std::sync::Arc;
use tempfile::TempDir;
use watchpost::config::{HttpMethod, MonitorConfig, TargetConfig};
use watchpost::fetch::{Fetcher, HttpFetcher};
use watchpost::{FetchError, JsonFileStore, ProbeError, Prober};

fn target(url: String, method: HttpMethod) -> TargetConfig {
    TargetConfig {
        url,
        method,
        connect_timeout_secs: 2,
        request_timeout_secs: 5,
        ..TargetConfig::default()
    }
}

#[tokio::test]
async fn test_get_returns_body_text() {
    let server = StubServer::start("{\"items\":[1,2,3]}").await;
    let fetcher = HttpFetcher::from_config(&target(server.url(), HttpMethod::Get)).unwrap();

    let body = fetcher.fetch().await.unwrap();

    assert_eq!(body, "{\"items\":[1,2,3]}");
    let requests = server.requests();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].starts_with("GET /api"));
}

#[tokio::test]
async fn test_post_sends_json_body_and_content_type() {
    let server = StubServer::start("ok").await;
    let mut config = target(server.url(), HttpMethod::Post);
    config.body = Some(json!({ "title": "probe", "user": 1 }));
    config
        .headers
        .insert("X-Probe".to_string(), "watchpost".to_string());
    let fetcher = HttpFetcher::from_config(&config).unwrap();

    fetcher.fetch().await.unwrap();

    let request = server.requests().remove(0);
    assert!(request.starts_with("POST /api"));
    let lower = request.to_ascii_lowercase();
    assert!(lower.contains("content-type: application/json"));
    assert!(lower.contains("x-probe: watchpost"));
    let (_, body) = request.split_once("\r\n\r\n").unwrap();
    let sent: serde_json::Value = serde_json::from_str(body).unwrap();
    assert_eq!(sent, json!({ "title": "probe", "user": 1 }));
}

#[tokio::test]
async fn test_configured_body_keys_are_sent_as_written() {
    let server = StubServer::start("ok").await;
    let temp_dir = TempDir::new().unwrap();
    let config_file = temp_dir.path().join("watchpost.toml");
    std::fs::write(
        &config_file,
        format!(
            "[target]\nurl = \"{}\"\nbody = '{{\"title\": \"foo\", \"userId\": 1}}'\n",
            server.url()
        ),
    )
    .unwrap();
    let config = MonitorConfig::load(Some(&config_file)).unwrap();
    let fetcher = HttpFetcher::from_config(&config.target).unwrap();

    fetcher.fetch().await.unwrap();

    let request = server.requests().remove(0);
    let (_, body) = request.split_once("\r\n\r\n").unwrap();
    let sent: serde_json::Value = serde_json::from_str(body).unwrap();
    assert_eq!(sent, json!({ "title": "foo", "userId": 1 }));
}

#[tokio::test]
async fn test_post_without_body_sends_empty_object() {
    let server = StubServer::start("ok").await;
    let fetcher = HttpFetcher::from_config(&target(server.url(), HttpMethod::Post)).unwrap();

    fetcher.fetch().await.unwrap();

    let request = server.requests().remove(0);
    let (_, body) = request.split_once("\r\n\r\n").unwrap();
    assert_eq!(body, "{}");
}

#[tokio::test]
async fn test_error_status_is_fetch_error() {
    let server = StubServer::start("down").await;
    server.set_status(500);
    let fetcher = HttpFetcher::from_config(&target(server.url(), HttpMethod::Get)).unwrap();

    let error = fetcher.fetch().await.unwrap_err();

    assert!(
        matches!(error, FetchError::Status { status: 500, .. }),
        "unexpected error: {:?}",
        error
    );
}

#[tokio::test]
async fn test_invalid_utf8_body_is_rejected() {
    let server = StubServer::start("").await;
    server.set_raw_body(b"v=\xFF");
    let fetcher = HttpFetcher::from_config(&target(server.url(), HttpMethod::Get)).unwrap();

    let error = fetcher.fetch().await.unwrap_err();

    assert!(matches!(error, FetchError::Body(_)), "unexpected error: {:?}", error);
}

#[tokio::test]
async fn test_distinct_invalid_payloads_are_not_reported_unchanged() {
    let server = StubServer::start("").await;
    server.set_raw_body(b"v=\xFF");
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("state.json");
    let fetcher = Arc::new(HttpFetcher::from_config(&target(server.url(), HttpMethod::Get)).unwrap());
    let prober = Prober::new(fetcher, Arc::new(JsonFileStore::new(&path)));

    let first = prober.run_once().await;
    server.set_raw_body(b"v=\xFE");
    let second = prober.run_once().await;

    for outcome in [&first, &second] {
        assert!(matches!(outcome.error, Some(ProbeError::Fetch(FetchError::Body(_)))));
        assert!(outcome.comparison.is_none());
    }
    assert!(!path.exists());
}

#[tokio::test]
async fn test_prober_detects_change_over_http() {
    let server = StubServer::start("{\"v\":1}").await;
    let temp_dir = TempDir::new().unwrap();
    let fetcher = Arc::new(HttpFetcher::from_config(&target(server.url(), HttpMethod::Get)).unwrap());
    let store = Arc::new(JsonFileStore::new(temp_dir.path().join("state.json")));
    let prober = Prober::new(fetcher, store);

    assert!(prober.run_once().await.changed(), "first run");
    assert!(!prober.run_once().await.changed());

    server.set_body("{\"v\":2}");
    assert!(prober.run_once().await.changed());

    server.set_status(503);
    let outcome = prober.run_once().await;
    assert!(matches!(outcome.error, Some(ProbeError::Fetch(_))));
    assert!(!outcome.changed());
}
