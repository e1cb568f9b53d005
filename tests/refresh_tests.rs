//! Integration tests for the refresh flow against a mocked token endpoint

use sp_api_auth::auth::{ConfigStore, TokenState};
use sp_api_auth::{ClientCredentials, FailureKind, OAuthConfig, RefreshError, TokenRefresher};
use std::collections::HashMap;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOKEN_PATH: &str = "/auth/o2/token";

const STORED: &str = r#"{
  "client_id": "amzn1.application-oa2-client.test",
  "client_secret": "test-secret",
  "refresh_token": "Atzr|R1",
  "access_token": "Atza|A1",
  "access_token_expires_at": 1700003600,
  "access_token_obtained_at": 1700000000,
  "marketplace_id": "ATVPDKIKX0DER"
}"#;

fn credentials() -> ClientCredentials {
    ClientCredentials::new("amzn1.application-oa2-client.test", "test-secret")
}

fn refresher_for(server: &MockServer, storage: ConfigStore) -> TokenRefresher {
    let config = OAuthConfig::builder()
        .token_url(format!("{}{TOKEN_PATH}", server.uri()))
        .http_timeout(Duration::from_secs(5))
        .build();
    TokenRefresher::new(&config, storage).unwrap()
}

fn seeded_store(temp_dir: &TempDir) -> ConfigStore {
    let storage = ConfigStore::with_path(temp_dir.path().join("config.json"));
    std::fs::write(storage.path(), STORED).unwrap();
    storage
}

#[tokio::test]
async fn test_refresh_updates_only_access_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .and(body_string_contains("grant_type=refresh_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "Atza|A2",
            "token_type": "bearer",
            "expires_in": 3600
        })))
        .expect(1)
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let storage = seeded_store(&temp_dir);
    let before = storage.load().unwrap();

    let tokens = refresher_for(&server, storage.clone())
        .refresh(&credentials())
        .await
        .unwrap();
    assert_eq!(tokens.refresh_token, "Atzr|R1");
    assert_eq!(tokens.access_token, "Atza|A2");

    let after = storage.load().unwrap();
    assert_eq!(after.refresh_token, before.refresh_token);
    assert_eq!(after.access_token.as_deref(), Some("Atza|A2"));
    assert_eq!(after.access_token_expires_at, tokens.expires_at);
    assert_ne!(after.access_token_expires_at, before.access_token_expires_at);
    assert_eq!(after.client_id, before.client_id);
    assert_eq!(after.client_secret, before.client_secret);
    assert_eq!(after.extra, before.extra);

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let form: HashMap<String, String> = url::form_urlencoded::parse(&requests[0].body)
        .into_owned()
        .collect();
    assert_eq!(form["grant_type"], "refresh_token");
    assert_eq!(form["refresh_token"], "Atzr|R1");
    assert_eq!(form["client_id"], "amzn1.application-oa2-client.test");
    assert_eq!(form["client_secret"], "test-secret");
    assert!(!form.contains_key("code"));
}

#[tokio::test]
async fn test_refresh_without_refresh_token_sends_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let storage = ConfigStore::with_path(temp_dir.path().join("config.json"));

    let err = refresher_for(&server, storage.clone())
        .refresh(&credentials())
        .await
        .unwrap_err();
    assert!(matches!(err, RefreshError::NoRefreshToken));
    assert!(!storage.path().exists());

    // Credentials alone are not enough either
    std::fs::write(
        storage.path(),
        r#"{"client_id":"amzn1.application-oa2-client.test","client_secret":"test-secret"}"#,
    )
    .unwrap();
    let err = refresher_for(&server, storage)
        .refresh(&credentials())
        .await
        .unwrap_err();
    assert!(matches!(err, RefreshError::NoRefreshToken));
}

#[tokio::test]
async fn test_revoked_refresh_token_is_fatal_and_leaves_store_unchanged() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(400).set_body_string(
            r#"{"error_description":"The request has an invalid grant parameter : refresh_token","error":"invalid_grant"}"#,
        ))
        .expect(1)
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let storage = seeded_store(&temp_dir);

    let err = refresher_for(&server, storage.clone())
        .refresh(&credentials())
        .await
        .unwrap_err();

    assert!(matches!(err, RefreshError::ExchangeFailed { status: 400, .. }));
    assert_eq!(err.failure_kind(), FailureKind::Fatal);
    assert!(err.response_body().unwrap().contains("invalid_grant"));
    assert!(err.hint().contains("re-run obtain-tokens"));
    assert_eq!(std::fs::read_to_string(storage.path()).unwrap(), STORED);
}

#[tokio::test]
async fn test_server_error_is_retryable_and_leaves_store_unchanged() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(503).set_body_string("Service Unavailable"))
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let storage = seeded_store(&temp_dir);

    let err = refresher_for(&server, storage.clone())
        .refresh(&credentials())
        .await
        .unwrap_err();

    assert!(matches!(err, RefreshError::ExchangeFailed { status: 503, .. }));
    assert_eq!(err.failure_kind(), FailureKind::Retryable);
    assert_eq!(std::fs::read_to_string(storage.path()).unwrap(), STORED);
}

#[tokio::test]
async fn test_retry_after_failure_succeeds() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "Atza|A2",
            "expires_in": 3600
        })))
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let storage = seeded_store(&temp_dir);
    let refresher = refresher_for(&server, storage.clone());

    assert!(refresher.refresh(&credentials()).await.is_err());
    assert_eq!(std::fs::read_to_string(storage.path()).unwrap(), STORED);

    let tokens = refresher.refresh(&credentials()).await.unwrap();
    assert_eq!(tokens.access_token, "Atza|A2");

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].body, requests[1].body);
}

#[tokio::test]
async fn test_rotated_refresh_token_is_stored() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "Atza|A2",
            "refresh_token": "Atzr|R2",
            "expires_in": 3600
        })))
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let storage = seeded_store(&temp_dir);

    let tokens = refresher_for(&server, storage.clone())
        .refresh(&credentials())
        .await
        .unwrap();
    assert_eq!(tokens.refresh_token, "Atzr|R2");

    let after = storage.load().unwrap();
    assert_eq!(after.refresh_token.as_deref(), Some("Atzr|R2"));
    assert_eq!(after.access_token.as_deref(), Some("Atza|A2"));
}

#[tokio::test]
async fn test_response_without_access_token_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "expires_in": 3600
        })))
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let storage = seeded_store(&temp_dir);

    let err = refresher_for(&server, storage.clone())
        .refresh(&credentials())
        .await
        .unwrap_err();
    assert!(matches!(err, RefreshError::MalformedResponse(_)));
    assert_eq!(std::fs::read_to_string(storage.path()).unwrap(), STORED);
}

#[tokio::test]
async fn test_unreachable_endpoint_is_retryable() {
    // Bind then drop to get a port nobody listens on
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let temp_dir = TempDir::new().unwrap();
    let storage = seeded_store(&temp_dir);
    let config = OAuthConfig::builder()
        .token_url(format!("http://127.0.0.1:{port}{TOKEN_PATH}"))
        .http_timeout(Duration::from_secs(2))
        .build();

    let err = TokenRefresher::new(&config, storage.clone())
        .unwrap()
        .refresh(&credentials())
        .await
        .unwrap_err();

    assert!(matches!(err, RefreshError::Transport(_)));
    assert_eq!(err.failure_kind(), FailureKind::Retryable);
    assert_eq!(std::fs::read_to_string(storage.path()).unwrap(), STORED);
}

#[tokio::test]
async fn test_oversized_expires_in_saturates() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{"access_token":"Atza|A2","expires_in":18446744073709551615}"#,
        ))
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let storage = seeded_store(&temp_dir);

    let tokens = refresher_for(&server, storage.clone())
        .refresh(&credentials())
        .await
        .unwrap();
    assert_eq!(tokens.expires_at, Some(u64::MAX));

    let after = storage.load().unwrap();
    assert_eq!(after.access_token.as_deref(), Some("Atza|A2"));
    assert_eq!(after.access_token_expires_at, Some(u64::MAX));
}

#[tokio::test]
async fn test_missing_expires_in_assumes_one_hour() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "Atza|A2",
            "token_type": "bearer"
        })))
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let storage = seeded_store(&temp_dir);

    let tokens = refresher_for(&server, storage.clone())
        .refresh(&credentials())
        .await
        .unwrap();
    assert_eq!(tokens.expires_at, Some(tokens.obtained_at + 3600));

    let after = storage.load().unwrap();
    assert_eq!(after.access_token_expires_at, tokens.expires_at);
    assert!(matches!(after.state(), TokenState::Valid { .. }));
}
