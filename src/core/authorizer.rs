//! Authorizer
//!
//! Interactive authorization capability. An authorizer opens the
//! authorization URL for the user and resolves with the callback URL the
//! provider redirected to.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use url::Url;

/// Authorizer failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthorizerError {
    #[error("Authorization canceled by user")]
    Canceled,

    #[error("Authorization failed: {message}")]
    Failed { message: String },
}

/// Interactive authorization capability (for dependency injection).
#[async_trait]
pub trait Authorizer: Send + Sync {
    /// Drive the interactive flow and return the callback URL.
    async fn authorize(
        &self,
        authorization_url: &Url,
        callback_scheme: &str,
    ) -> Result<Url, AuthorizerError>;
}

/// A pending authorization handed to the embedding application.
#[derive(Debug)]
pub struct AuthorizationPrompt {
    /// URL to open for the user.
    pub authorization_url: Url,
    /// Scheme of the redirect to intercept.
    pub callback_scheme: String,
    responder: oneshot::Sender<Result<Url, AuthorizerError>>,
}

impl AuthorizationPrompt {
    /// Complete the flow with the intercepted callback URL.
    pub fn complete(self, callback_url: Url) {
        let _ = self.responder.send(Ok(callback_url));
    }

    /// Fail the flow.
    pub fn fail(self, error: AuthorizerError) {
        let _ = self.responder.send(Err(error));
    }
}

/// Authorizer that delegates the interactive step over a channel.
///
/// Each call sends an [`AuthorizationPrompt`] to the receiver returned by
/// [`ChannelAuthorizer::new`]. Dropping a prompt without answering it is a
/// cancellation.
pub struct ChannelAuthorizer {
    prompts: mpsc::Sender<AuthorizationPrompt>,
}

impl ChannelAuthorizer {
    /// Create an authorizer and the prompt receiver the application drains.
    pub fn new(buffer: usize) -> (Self, mpsc::Receiver<AuthorizationPrompt>) {
        let (prompts, receiver) = mpsc::channel(buffer.max(1));
        (Self { prompts }, receiver)
    }
}

#[async_trait]
impl Authorizer for ChannelAuthorizer {
    async fn authorize(
        &self,
        authorization_url: &Url,
        callback_scheme: &str,
    ) -> Result<Url, AuthorizerError> {
        let (responder, response) = oneshot::channel();
        let prompt = AuthorizationPrompt {
            authorization_url: authorization_url.clone(),
            callback_scheme: callback_scheme.to_string(),
            responder,
        };

        self.prompts
            .send(prompt)
            .await
            .map_err(|_| AuthorizerError::Failed {
                message: "authorization prompt receiver closed".to_string(),
            })?;

        response.await.unwrap_or(Err(AuthorizerError::Canceled))
    }
}

enum MockAuthorization {
    Ready(Result<Url, AuthorizerError>),
    Pending(oneshot::Receiver<Result<Url, AuthorizerError>>),
}

/// Mock authorizer for testing.
#[derive(Default)]
pub struct MockAuthorizer {
    outcomes: Mutex<VecDeque<MockAuthorization>>,
    history: Mutex<Vec<(Url, String)>>,
}

impl MockAuthorizer {
    /// Create new mock authorizer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a callback URL to resolve with.
    pub fn queue_callback(&self, callback_url: &str) -> &Self {
        let outcome = Url::parse(callback_url).map_err(|e| AuthorizerError::Failed {
            message: e.to_string(),
        });
        self.outcomes
            .lock()
            .unwrap()
            .push_back(MockAuthorization::Ready(outcome));
        self
    }

    /// Queue an authorizer failure.
    pub fn queue_error(&self, error: AuthorizerError) -> &Self {
        self.outcomes
            .lock()
            .unwrap()
            .push_back(MockAuthorization::Ready(Err(error)));
        self
    }

    /// Queue a flow that stays pending until the returned sender resolves it.
    pub fn queue_pending(&self) -> oneshot::Sender<Result<Url, AuthorizerError>> {
        let (sender, receiver) = oneshot::channel();
        self.outcomes
            .lock()
            .unwrap()
            .push_back(MockAuthorization::Pending(receiver));
        sender
    }

    /// Get `(authorization_url, callback_scheme)` pairs seen so far.
    pub fn get_history(&self) -> Vec<(Url, String)> {
        self.history.lock().unwrap().clone()
    }

    /// Number of authorize calls.
    pub fn call_count(&self) -> usize {
        self.history.lock().unwrap().len()
    }
}

#[async_trait]
impl Authorizer for MockAuthorizer {
    async fn authorize(
        &self,
        authorization_url: &Url,
        callback_scheme: &str,
    ) -> Result<Url, AuthorizerError> {
        self.history
            .lock()
            .unwrap()
            .push((authorization_url.clone(), callback_scheme.to_string()));

        let outcome = self.outcomes.lock().unwrap().pop_front();
        match outcome {
            Some(MockAuthorization::Ready(result)) => result,
            Some(MockAuthorization::Pending(receiver)) => {
                receiver.await.unwrap_or(Err(AuthorizerError::Canceled))
            }
            None => Err(AuthorizerError::Canceled),
        }
    }
}

/// Create mock authorizer for testing.
pub fn create_mock_authorizer() -> MockAuthorizer {
    MockAuthorizer::new()
}
