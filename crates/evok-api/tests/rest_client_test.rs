// Integration tests for `RestClient` using wiremock.

use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use evok_api::{Error, RestClient};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, RestClient) {
    let server = MockServer::start().await;
    let client = RestClient::from_reqwest(&server.uri(), reqwest::Client::new()).unwrap();
    (server, client)
}

// ── Happy-path tests ────────────────────────────────────────────────

#[tokio::test]
async fn test_fetch_all_returns_device_listing() {
    let (server, client) = setup().await;

    let body = json!([
        { "dev": "relay", "circuit": "1_01", "value": 1, "relay_type": "physical" },
        { "dev": "relay", "circuit": "2_01", "value": 0, "relay_type": "digital" },
        { "dev": "input", "circuit": "1_01", "value": 0, "debounce": 50 },
        { "dev": "ai", "circuit": "1_01", "value": 4.82 },
        { "dev": "neuron", "circuit": "1", "model": "L203", "sn": 181, "ver2": "1.0" },
    ]);

    Mock::given(method("GET"))
        .and(path("/rest/all"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .mount(&server)
        .await;

    let devices = client.fetch_all().await.unwrap();

    assert_eq!(devices.len(), 5);
    assert_eq!(devices[0].dev, "relay");
    assert_eq!(devices[0].relay_type.as_deref(), Some("physical"));
    assert_eq!(devices[2].dev, "input");
    assert_eq!(devices[2].extra["debounce"], 50);
    assert_eq!(devices[3].value, Some(4.82));
    assert_eq!(devices[4].extra["model"], "L203");
}

// ── Failure tests ───────────────────────────────────────────────────

#[tokio::test]
async fn test_fetch_all_non_2xx_is_http_error() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/rest/all"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let err = client.fetch_all().await.unwrap_err();
    match err {
        Error::Http { status } => assert_eq!(status, 500),
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(err.is_transient());
}

#[tokio::test]
async fn test_fetch_all_malformed_body_keeps_payload() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/rest/all"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let err = client.fetch_all().await.unwrap_err();
    match err {
        Error::Deserialization { ref body, .. } => assert_eq!(body, "<html>oops</html>"),
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(!err.is_transient());
}

#[tokio::test]
async fn test_fetch_all_connection_refused_is_transport_error() {
    // Port 1 is never listening.
    let client = RestClient::from_reqwest("http://127.0.0.1:1", reqwest::Client::new()).unwrap();

    let err = client.fetch_all().await.unwrap_err();
    assert!(matches!(err, Error::Transport(_)));
    assert!(err.is_transient());
}
