//! Integration tests using WireMock
//!
//! These tests drive the session manager against a mock token endpoint over
//! real HTTP, covering request encoding, persistence and error mapping.

pub mod channel_authorizer;
pub mod token_lifecycle;

use std::sync::Arc;

use oauth2_session::{
    session_config, InMemorySecureStore, ReqwestTokenExchanger, SessionConfig,
    TokenLifecycleManager,
};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub type HttpManager<A> =
    TokenLifecycleManager<A, ReqwestTokenExchanger, InMemorySecureStore>;

/// Helper to create a mock token server
pub async fn setup_mock_server() -> MockServer {
    MockServer::start().await
}

/// Configuration pointing at the mock server's token endpoint.
pub fn config_for(server: &MockServer, key_prefix: &str) -> SessionConfig {
    session_config()
        .authorization_url("https://auth.example.com/authorize?client_id=integration-client")
        .token_url(format!("{}/token", server.uri()))
        .redirect_uri("myapp://oauth/callback")
        .client_id("integration-client")
        .client_secret("integration-secret")
        .key_prefix(key_prefix)
        .build()
        .expect("valid config")
}

pub fn manager_with<A: oauth2_session::Authorizer>(
    server: &MockServer,
    authorizer: Arc<A>,
    store: Arc<InMemorySecureStore>,
) -> HttpManager<A> {
    TokenLifecycleManager::new(
        config_for(server, "integration"),
        authorizer,
        Arc::new(ReqwestTokenExchanger::new().expect("http client")),
        store,
    )
}

/// Token endpoint mock accepting JSON bodies.
pub fn token_endpoint() -> wiremock::MockBuilder {
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(header("content-type", "application/json"))
}

/// Helper to create success response templates
pub fn token_response(body: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(body)
}

/// Helper to create error response templates
pub fn error_response(status: u16, error_body: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(status).set_body_json(error_body)
}
