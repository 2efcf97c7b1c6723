//! OAuth2 Session Module
//!
//! Authorization-code session lifecycle for native clients: interactive
//! authorization, code exchange, refresh, and persistence of the resulting
//! session in a secure store.
//!
//! # Features
//!
//! - Authorization Code Flow (RFC 6749 Section 4.1) driven by a pluggable [`Authorizer`]
//! - Token Refresh (RFC 6749 Section 6) with local eligibility checks
//! - Session persistence in a [`SecureStore`] (in-memory, or platform keychain
//!   with the `keychain` feature)
//! - Cancel-and-replace for overlapping authorizations
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use oauth2_session::{
//!     session_config, ChannelAuthorizer, InMemorySecureStore, ReqwestTokenExchanger,
//!     TokenLifecycleManager,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = session_config()
//!         .authorization_url("https://provider.com/authorize?client_id=my-client-id")
//!         .token_url("https://provider.com/token")
//!         .redirect_uri("myapp://oauth/callback")
//!         .client_id("my-client-id")
//!         .client_secret("my-client-secret")
//!         .key_prefix("provider")
//!         .build()?;
//!
//!     let (authorizer, mut prompts) = ChannelAuthorizer::new(1);
//!     tokio::spawn(async move {
//!         while let Some(prompt) = prompts.recv().await {
//!             // Open prompt.authorization_url in a browser and complete the
//!             // prompt with the redirect it lands on.
//!         }
//!     });
//!
//!     let manager = TokenLifecycleManager::new(
//!         config,
//!         Arc::new(authorizer),
//!         Arc::new(ReqwestTokenExchanger::new()?),
//!         Arc::new(InMemorySecureStore::new()),
//!     );
//!
//!     let session = manager.authenticate().await?;
//!     println!("Authorization: {}", session.authorization_header());
//!
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - `types`: session, token request/response and configuration types
//! - `error`: error hierarchy with OAuth2 error document mapping
//! - `core`: capabilities (token exchange transport, authorizer, secure store)
//! - `token`: session persistence and the lifecycle manager
//! - `builders`: fluent configuration builder
//! - `telemetry`: structured logging and metrics

pub mod builders;
pub mod core;
pub mod error;
pub mod telemetry;
pub mod token;
pub mod types;

// Re-export builders
pub use builders::{session_config, SessionConfigBuilder};

// Re-export errors
pub use error::{
    get_user_message, map_token_error, parse_error_response, ConfigurationError, NetworkError,
    OAuth2ErrorResponse, ProviderError, SessionError, SessionResult, StorageError,
};

// Re-export types
pub use types::{
    // Config
    ClientCredentials, GrantType, SessionConfig,
    // Session
    Session, SessionKeys,
    // Token
    TokenRequest, TokenResponse,
    // Callback
    CallbackParams,
};

// Re-export core components
pub use crate::core::{
    // Transport
    ExchangeRequest, ExchangeResponse, MockTokenExchanger, ReqwestTokenExchanger,
    TokenExchanger,
    // Authorizer
    AuthorizationPrompt, Authorizer, AuthorizerError, ChannelAuthorizer, MockAuthorizer,
    // Secure store
    InMemorySecureStore, MockSecureStore, SecureStore, StoreOperation, StoredValue,
};

#[cfg(feature = "keychain")]
pub use crate::core::KeyringSecureStore;

// Re-export session management
pub use token::{SessionStore, TokenLifecycleManager};

// Re-export telemetry
pub use telemetry::{
    // Metrics
    create_in_memory_metrics, no_op_metrics, InMemoryMetrics, MetricEntry, MetricLabels,
    NoOpMetrics, SessionMetricNames, SessionMetrics,
    // Logging
    create_in_memory_logger, create_tracing_logger, no_op_logger, InMemoryLogger, LogEntry,
    LogLevel, Logger, NoOpLogger, SessionLogContext, TracingLogger,
};
