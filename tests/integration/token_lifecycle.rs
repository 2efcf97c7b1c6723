//! Integration tests for authenticate, refresh and sign-out

use super::*;
use oauth2_session::{
    InMemorySecureStore, MockAuthorizer, NetworkError, ProviderError, ReqwestTokenExchanger,
    SessionError, SessionKeys, SessionStore, StoredValue, TokenLifecycleManager,
};
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{body_json, method};
use wiremock::{Mock, ResponseTemplate};

fn authorizer_with_code(code: &str) -> Arc<MockAuthorizer> {
    let authorizer = Arc::new(MockAuthorizer::new());
    authorizer.queue_callback(&format!("myapp://oauth/callback?code={}&state=xyz", code));
    authorizer
}

#[tokio::test]
async fn test_authenticate_then_refresh() {
    let server = setup_mock_server().await;

    token_endpoint()
        .and(body_json(json!({
            "code": "first-code",
            "client_id": "integration-client",
            "client_secret": "integration-secret",
            "redirect_uri": "myapp://oauth/callback",
            "grant_type": "authorization_code"
        })))
        .respond_with(token_response(json!({
            "access_token": "access-1",
            "refresh_token": "refresh-1",
            "expires_in": 3600,
            "token_type": "Bearer"
        })))
        .expect(1)
        .mount(&server)
        .await;

    token_endpoint()
        .and(body_json(json!({
            "refresh_token": "refresh-1",
            "client_id": "integration-client",
            "client_secret": "integration-secret",
            "redirect_uri": "myapp://oauth/callback",
            "grant_type": "refresh_token"
        })))
        .respond_with(token_response(json!({
            "access_token": "access-2",
            "refresh_token": "refresh-2",
            "expires_in": 3600
        })))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(InMemorySecureStore::new());
    let manager = manager_with(&server, authorizer_with_code("first-code"), store.clone());

    let first = manager.authenticate().await.expect("authenticate");
    assert_eq!(first.access_token(), "access-1");
    assert!(first.can_refresh());

    let second = manager.refresh().await.expect("refresh");
    assert_eq!(second.access_token(), "access-2");
    assert_eq!(second.refresh_token(), Some("refresh-2"));

    assert_eq!(
        store.value("integration_access_token"),
        Some(StoredValue::Text("access-2".to_string()))
    );
    assert!(matches!(
        store.value("integration_expires_at"),
        Some(StoredValue::Integer(_))
    ));
}

#[tokio::test]
async fn test_session_survives_new_manager_instance() {
    let server = setup_mock_server().await;

    token_endpoint()
        .respond_with(token_response(json!({
            "access_token": "persisted-access",
            "refresh_token": "persisted-refresh",
            "expires_in": 600
        })))
        .mount(&server)
        .await;

    let store = Arc::new(InMemorySecureStore::new());
    let issued = manager_with(&server, authorizer_with_code("c"), store.clone())
        .authenticate()
        .await
        .expect("authenticate");

    let restarted = manager_with(&server, Arc::new(MockAuthorizer::new()), store.clone());
    restarted.initialize().expect("hydrate");

    assert_eq!(restarted.current_session().unwrap(), Some(issued.clone()));
    assert_eq!(restarted.valid_session().unwrap(), issued);

    let other_namespace = SessionStore::new(store, SessionKeys::new("other"));
    assert_eq!(other_namespace.load().unwrap(), None);
}

#[tokio::test]
async fn test_provider_error_document() {
    let server = setup_mock_server().await;

    token_endpoint()
        .respond_with(error_response(
            400,
            json!({
                "error": "invalid_grant",
                "error_description": "Authorization code expired"
            }),
        ))
        .mount(&server)
        .await;

    let store = Arc::new(InMemorySecureStore::new());
    let manager = manager_with(&server, authorizer_with_code("stale"), store.clone());

    match manager.authenticate().await {
        Err(SessionError::Provider(ProviderError::InvalidGrant { message })) => {
            assert_eq!(message, "Authorization code expired");
        }
        other => panic!("unexpected result: {:?}", other),
    }
    assert!(store.keys().is_empty());
    assert_eq!(manager.current_session().unwrap(), None);
}

#[tokio::test]
async fn test_non_json_response_is_malformed() {
    let server = setup_mock_server().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream unavailable"))
        .mount(&server)
        .await;

    let manager = manager_with(
        &server,
        authorizer_with_code("c"),
        Arc::new(InMemorySecureStore::new()),
    );

    assert!(matches!(
        manager.authenticate().await,
        Err(SessionError::MalformedResponse { status: 503, .. })
    ));
}

#[tokio::test]
async fn test_unreachable_token_endpoint_is_network_error() {
    let server = setup_mock_server().await;
    let config = config_for(&server, "integration");
    drop(server);

    let manager = TokenLifecycleManager::new(
        config,
        authorizer_with_code("c"),
        Arc::new(ReqwestTokenExchanger::new().unwrap()),
        Arc::new(InMemorySecureStore::new()),
    );

    assert!(matches!(
        manager.authenticate().await,
        Err(SessionError::Network(NetworkError::ConnectionFailed { .. }))
    ));
}

#[tokio::test]
async fn test_refresh_of_access_only_session_sends_nothing() {
    let server = setup_mock_server().await;

    token_endpoint()
        .respond_with(token_response(json!({ "access_token": "no-refresh" })))
        .expect(1)
        .mount(&server)
        .await;

    let manager = manager_with(
        &server,
        authorizer_with_code("c"),
        Arc::new(InMemorySecureStore::new()),
    );

    let session = manager.authenticate().await.unwrap();
    assert!(!session.can_refresh());
    assert!(!session.is_expired());

    assert!(matches!(manager.refresh().await, Err(SessionError::Expired)));
}

#[tokio::test]
async fn test_sign_out_clears_persisted_session() {
    let server = setup_mock_server().await;

    token_endpoint()
        .respond_with(token_response(json!({
            "access_token": "a",
            "refresh_token": "r",
            "expires_in": 60
        })))
        .mount(&server)
        .await;

    let store = Arc::new(InMemorySecureStore::new());
    let manager = manager_with(&server, authorizer_with_code("c"), store.clone());
    manager.authenticate().await.unwrap();

    manager.sign_out().unwrap();

    assert!(store.keys().is_empty());
    assert!(matches!(manager.valid_session(), Err(SessionError::NoSession)));
}

#[tokio::test]
async fn test_temporarily_unavailable_reports_retry_after() {
    let server = setup_mock_server().await;

    token_endpoint()
        .respond_with(
            error_response(503, json!({ "error": "temporarily_unavailable" }))
                .insert_header("Retry-After", "45"),
        )
        .mount(&server)
        .await;

    let manager = manager_with(
        &server,
        authorizer_with_code("c"),
        Arc::new(InMemorySecureStore::new()),
    );

    let error = manager.authenticate().await.unwrap_err();
    assert!(matches!(
        error,
        SessionError::Provider(ProviderError::TemporarilyUnavailable { .. })
    ));
    assert_eq!(error.retry_after(), Some(std::time::Duration::from_secs(45)));
}
