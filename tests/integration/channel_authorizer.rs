//! Integration tests for channel-driven authorization

use super::*;
use oauth2_session::{AuthorizerError, ChannelAuthorizer, InMemorySecureStore, SessionError};
use serde_json::json;
use std::sync::Arc;
use url::Url;
use wiremock::matchers::body_partial_json;

#[tokio::test]
async fn test_channel_authorizer_completes_flow() {
    let server = setup_mock_server().await;

    token_endpoint()
        .and(body_partial_json(json!({ "code": "from-browser" })))
        .respond_with(token_response(json!({
            "access_token": "browser-access",
            "refresh_token": "browser-refresh",
            "expires_in": 3600
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (authorizer, mut prompts) = ChannelAuthorizer::new(1);
    let browser = tokio::spawn(async move {
        let prompt = prompts.recv().await.expect("prompt");
        assert_eq!(prompt.callback_scheme, "myapp");
        assert_eq!(
            prompt.authorization_url.as_str(),
            "https://auth.example.com/authorize?client_id=integration-client"
        );
        prompt.complete(Url::parse("myapp://oauth/callback?code=from-browser").unwrap());
    });

    let manager = manager_with(
        &server,
        Arc::new(authorizer),
        Arc::new(InMemorySecureStore::new()),
    );

    let session = manager.authenticate().await.expect("authenticate");
    browser.await.unwrap();

    assert_eq!(session.access_token(), "browser-access");
}

#[tokio::test]
async fn test_user_dismissal_is_cancellation() {
    let server = setup_mock_server().await;

    let (authorizer, mut prompts) = ChannelAuthorizer::new(1);
    tokio::spawn(async move {
        if let Some(prompt) = prompts.recv().await {
            prompt.fail(AuthorizerError::Canceled);
        }
    });

    let manager = manager_with(
        &server,
        Arc::new(authorizer),
        Arc::new(InMemorySecureStore::new()),
    );

    assert!(matches!(
        manager.authenticate().await,
        Err(SessionError::Canceled { .. })
    ));
    assert!(server.received_requests().await.unwrap_or_default().is_empty());
}

#[tokio::test]
async fn test_dropped_prompt_is_cancellation() {
    let server = setup_mock_server().await;

    let (authorizer, mut prompts) = ChannelAuthorizer::new(1);
    tokio::spawn(async move {
        drop(prompts.recv().await);
    });

    let manager = manager_with(
        &server,
        Arc::new(authorizer),
        Arc::new(InMemorySecureStore::new()),
    );

    assert!(matches!(
        manager.authenticate().await,
        Err(SessionError::Canceled { .. })
    ));
}
