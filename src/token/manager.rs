//! Token Lifecycle Manager
//!
//! Orchestrates authorization, token exchange, refresh and the cached
//! session for one session namespace.
//!
//! Results are returned to the task that awaited the call. The apply step of
//! an exchange (secure store write plus cache replacement) runs under the
//! cache write lock, so concurrent exchanges never leave a torn session.

use chrono::Utc;
use futures::future::{AbortHandle, Abortable};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::core::{
    Authorizer, AuthorizerError, ExchangeRequest, ExchangeResponse, SecureStore, TokenExchanger,
};
use crate::error::{
    map_token_error, parse_error_response, ProviderError, SessionError, SessionResult,
};
use crate::telemetry::{Logger, NoOpMetrics, SessionLogContext, SessionMetrics, TracingLogger};
use crate::token::SessionStore;
use crate::types::{CallbackParams, Session, SessionConfig, TokenRequest, TokenResponse};

#[derive(Default)]
struct CachedSession {
    hydrated: bool,
    session: Option<Session>,
}

struct InFlightAuthorization {
    attempt: u64,
    abort: AbortHandle,
}

/// Manages one OAuth2 authorization-code session.
pub struct TokenLifecycleManager<A: Authorizer, T: TokenExchanger, S: SecureStore> {
    config: SessionConfig,
    authorizer: Arc<A>,
    exchanger: Arc<T>,
    store: SessionStore<S>,
    cache: RwLock<CachedSession>,
    in_flight: Mutex<Option<InFlightAuthorization>>,
    attempts: AtomicU64,
    logger: Arc<dyn Logger>,
    metrics: Arc<dyn SessionMetrics>,
}

impl<A: Authorizer, T: TokenExchanger, S: SecureStore> TokenLifecycleManager<A, T, S> {
    /// Create new manager.
    pub fn new(config: SessionConfig, authorizer: Arc<A>, exchanger: Arc<T>, store: Arc<S>) -> Self {
        let store = SessionStore::new(store, config.keys());
        Self {
            config,
            authorizer,
            exchanger,
            store,
            cache: RwLock::new(CachedSession::default()),
            in_flight: Mutex::new(None),
            attempts: AtomicU64::new(0),
            logger: Arc::new(TracingLogger),
            metrics: Arc::new(NoOpMetrics),
        }
    }

    /// Replace the logger.
    pub fn with_logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = logger;
        self
    }

    /// Replace the metrics sink.
    pub fn with_metrics(mut self, metrics: Arc<dyn SessionMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Manager configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Hydrate the cache from the secure store now rather than on first read.
    pub fn initialize(&self) -> SessionResult<()> {
        self.current_session().map(|_| ())
    }

    /// Cached session. The first call reads the secure store; later calls
    /// never do.
    pub fn current_session(&self) -> SessionResult<Option<Session>> {
        {
            let cache = self.read_cache();
            if cache.hydrated {
                return Ok(cache.session.clone());
            }
        }

        let mut cache = self.write_cache();
        if !cache.hydrated {
            cache.session = self.store.load()?;
            cache.hydrated = true;
            self.logger.debug(
                "Session hydrated from secure store",
                &self
                    .log_context("hydrate")
                    .extra("present", cache.session.is_some()),
            );
        }
        Ok(cache.session.clone())
    }

    /// Cached session whose access token is still valid. Never refreshes.
    pub fn valid_session(&self) -> SessionResult<Session> {
        match self.current_session()? {
            None => Err(SessionError::NoSession),
            Some(session) if session.is_expired() => Err(SessionError::Expired),
            Some(session) => Ok(session),
        }
    }

    /// Run the interactive authorization and exchange the resulting code.
    ///
    /// Starting a new authorization aborts the authorizer wait of any earlier
    /// one, which then resolves as canceled.
    pub async fn authenticate(&self) -> SessionResult<Session> {
        let (attempt, registration) = self.begin_authorization();
        let context = self.log_context("authenticate").extra("attempt", attempt);
        self.logger.info("Authorization started", &context);
        self.metrics
            .record_authorization_request(&self.config.key_prefix);

        let authorization = Abortable::new(
            self.authorizer
                .authorize(&self.config.authorization_url, &self.config.callback_scheme),
            registration,
        )
        .await;
        self.finish_authorization(attempt);

        let callback_url = match authorization {
            Err(_aborted) => {
                return Err(self.fail(
                    &context,
                    SessionError::canceled("superseded by a newer authorization"),
                ))
            }
            Ok(Err(AuthorizerError::Canceled)) => {
                return Err(self.fail(&context, SessionError::canceled("canceled by user")))
            }
            Ok(Err(AuthorizerError::Failed { message })) => {
                return Err(self.fail(&context, SessionError::canceled(message)))
            }
            Ok(Ok(url)) => url,
        };

        let params = CallbackParams::from_url(&callback_url);
        let code = match params.authorization_code() {
            Some(code) => code.to_string(),
            None => {
                return Err(self.fail(&context, SessionError::canceled(params.failure_reason())))
            }
        };

        self.exchange(TokenRequest::authorization_code(code)).await
    }

    /// Refresh the cached session.
    ///
    /// A session without a refresh token or with a past expiry fails with
    /// [`SessionError::Expired`] locally; no request is sent. The stored
    /// session is left untouched in that case.
    pub async fn refresh(&self) -> SessionResult<Session> {
        let context = self.log_context("refresh");
        let now = Utc::now();

        let eligible = self
            .current_session()?
            .filter(|session| session.can_refresh_at(now))
            .and_then(|session| session.refresh_token().map(str::to_string));

        let refresh_token = match eligible {
            Some(refresh_token) => refresh_token,
            None => {
                self.logger
                    .warn("Refresh rejected: session is not refreshable", &context);
                self.metrics
                    .record_token_refresh(&self.config.key_prefix, false);
                return Err(self.fail(&context, SessionError::Expired));
            }
        };

        let result = self
            .exchange(TokenRequest::refresh_token(refresh_token))
            .await;
        self.metrics
            .record_token_refresh(&self.config.key_prefix, result.is_ok());
        result
    }

    /// Send a token request, then persist and cache the resulting session.
    pub async fn exchange(&self, request: TokenRequest) -> SessionResult<Session> {
        let grant_type = request.grant_type();
        let context = self
            .log_context("exchange")
            .grant_type(grant_type.as_str());

        self.logger.debug("Token exchange started", &context);
        self.metrics
            .record_token_request(&self.config.key_prefix, grant_type.as_str());

        let response = match self.exchanger.send(self.build_request(&request)).await {
            Ok(response) => response,
            Err(e) => return Err(self.fail(&context, SessionError::Network(e))),
        };

        let token = match parse_token_response(&response) {
            Ok(token) => token,
            Err(e) => return Err(self.fail(&context.clone().extra("status", response.status), e)),
        };

        let session = match Session::from_token_response(token, Utc::now()) {
            Ok(session) => session,
            Err(e) => return Err(self.fail(&context, e)),
        };

        if let Err(e) = self.apply(&session) {
            return Err(self.fail(&context, e));
        }

        self.logger.info(
            "Token exchange succeeded",
            &context
                .extra("refreshable", session.can_refresh())
                .extra(
                    "expires_at",
                    session
                        .expires_at()
                        .map(|at| at.timestamp().to_string())
                        .unwrap_or_default(),
                ),
        );
        Ok(session)
    }

    /// Remove the persisted session, clear the cache and abort any pending
    /// authorization.
    pub fn sign_out(&self) -> SessionResult<()> {
        if let Some(in_flight) = self.lock_in_flight().take() {
            in_flight.abort.abort();
        }

        let mut cache = self.write_cache();
        self.store.clear()?;
        cache.session = None;
        cache.hydrated = true;

        self.logger
            .info("Signed out", &self.log_context("sign_out"));
        Ok(())
    }

    fn apply(&self, session: &Session) -> SessionResult<()> {
        let mut cache = self.write_cache();
        self.store.save(session)?;
        cache.session = Some(session.clone());
        cache.hydrated = true;
        Ok(())
    }

    fn build_request(&self, request: &TokenRequest) -> ExchangeRequest {
        let headers: HashMap<String, String> = [
            ("content-type".to_string(), "application/json".to_string()),
            ("accept".to_string(), "application/json".to_string()),
        ]
        .into_iter()
        .collect();

        ExchangeRequest {
            url: self.config.token_url.clone(),
            headers,
            body: request.to_json(&self.config),
            timeout: Some(self.config.timeout),
        }
    }

    fn begin_authorization(&self) -> (u64, futures::future::AbortRegistration) {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        let (abort, registration) = AbortHandle::new_pair();

        let previous = self
            .lock_in_flight()
            .replace(InFlightAuthorization { attempt, abort });
        if let Some(previous) = previous {
            self.logger.info(
                "Superseding pending authorization",
                &self
                    .log_context("authenticate")
                    .extra("attempt", previous.attempt),
            );
            previous.abort.abort();
        }

        (attempt, registration)
    }

    fn finish_authorization(&self, attempt: u64) {
        let mut in_flight = self.lock_in_flight();
        if in_flight.as_ref().map(|f| f.attempt) == Some(attempt) {
            *in_flight = None;
        }
    }

    fn fail(&self, context: &SessionLogContext, error: SessionError) -> SessionError {
        let context = context.clone().extra("error_code", error.error_code());
        match &error {
            SessionError::Canceled { .. } | SessionError::Expired => {
                self.logger.info(&error.to_string(), &context)
            }
            _ => self.logger.error(&error.to_string(), &context),
        }
        self.metrics
            .record_error(&self.config.key_prefix, error.error_code());
        error
    }

    fn log_context(&self, operation: &str) -> SessionLogContext {
        SessionLogContext::new()
            .operation(operation)
            .session(self.config.key_prefix.as_str())
            .client_id(self.config.credentials.client_id.as_str())
    }

    fn read_cache(&self) -> RwLockReadGuard<'_, CachedSession> {
        self.cache.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_cache(&self) -> RwLockWriteGuard<'_, CachedSession> {
        self.cache.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_in_flight(&self) -> MutexGuard<'_, Option<InFlightAuthorization>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Interpret a token endpoint response.
///
/// A body with a non-empty `access_token` is a success whatever the status.
/// Otherwise an OAuth2 error document maps to a provider error, and anything
/// else is a malformed response.
fn parse_token_response(response: &ExchangeResponse) -> SessionResult<TokenResponse> {
    let parsed = serde_json::from_slice::<TokenResponse>(&response.body);
    match parsed {
        Ok(token) if !token.access_token.is_empty() => Ok(token),
        Ok(_) => Err(SessionError::MalformedResponse {
            status: response.status,
            message: "empty access_token".to_string(),
        }),
        Err(e) => match parse_error_response(&response.body) {
            Some(error) => {
                let error = match map_token_error(&error) {
                    ProviderError::TemporarilyUnavailable { .. } => {
                        ProviderError::TemporarilyUnavailable {
                            retry_after: response.retry_after(),
                        }
                    }
                    other => other,
                };
                Err(SessionError::Provider(error))
            }
            None => Err(SessionError::MalformedResponse {
                status: response.status,
                message: e.to_string(),
            }),
        },
    }
}
