//! Token Exchange Transport
//!
//! HTTP round trip to the token endpoint and its implementations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;
use url::Url;

use crate::error::{ConfigurationError, NetworkError, SessionError};

/// Default response size cap.
pub const DEFAULT_MAX_RESPONSE_SIZE: usize = 1_048_576;

/// Token exchange request. Always a POST.
#[derive(Clone, Debug)]
pub struct ExchangeRequest {
    /// Token endpoint.
    pub url: Url,
    /// Request headers.
    pub headers: HashMap<String, String>,
    /// Request body.
    pub body: String,
    /// Request timeout.
    pub timeout: Option<Duration>,
}

/// Raw token endpoint response.
#[derive(Clone, Debug)]
pub struct ExchangeResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response headers (lowercased names).
    pub headers: HashMap<String, String>,
    /// Response body.
    pub body: Vec<u8>,
}

impl ExchangeResponse {
    /// Build a response with a JSON body.
    pub fn json(status: u16, body: &serde_json::Value) -> Self {
        Self {
            status,
            headers: [("content-type".to_string(), "application/json".to_string())]
                .into_iter()
                .collect(),
            body: body.to_string().into_bytes(),
        }
    }

    /// Build a response with a raw body.
    pub fn raw(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: body.into(),
        }
    }

    /// Add a header.
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_lowercase(), value.into());
        self
    }

    /// Delay requested by a `Retry-After` header, in delta-seconds or
    /// HTTP-date form. A date in the past yields zero.
    pub fn retry_after(&self) -> Option<Duration> {
        let value = self.headers.get("retry-after")?.trim();

        if let Ok(secs) = value.parse::<u64>() {
            return Some(Duration::from_secs(secs));
        }

        let at = DateTime::parse_from_rfc2822(value).ok()?;
        Some(
            (at.with_timezone(&Utc) - Utc::now())
                .to_std()
                .unwrap_or(Duration::ZERO),
        )
    }
}

/// Token exchange capability (for dependency injection).
#[async_trait]
pub trait TokenExchanger: Send + Sync {
    /// Send a token request and return the raw response.
    async fn send(&self, request: ExchangeRequest) -> Result<ExchangeResponse, NetworkError>;
}

/// reqwest-based token exchanger.
pub struct ReqwestTokenExchanger {
    client: reqwest::Client,
    default_timeout: Duration,
    max_response_size: usize,
}

impl ReqwestTokenExchanger {
    /// Create new exchanger with default settings.
    pub fn new() -> Result<Self, SessionError> {
        Self::with_options(Duration::from_secs(30), DEFAULT_MAX_RESPONSE_SIZE)
    }

    /// Create exchanger with custom options.
    pub fn with_options(timeout: Duration, max_response_size: usize) -> Result<Self, SessionError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| {
                SessionError::Configuration(ConfigurationError::InvalidConfig {
                    message: format!("failed to create HTTP client: {}", e),
                })
            })?;

        Ok(Self {
            client,
            default_timeout: timeout,
            max_response_size,
        })
    }
}

#[async_trait]
impl TokenExchanger for ReqwestTokenExchanger {
    async fn send(&self, request: ExchangeRequest) -> Result<ExchangeResponse, NetworkError> {
        let timeout = request.timeout.unwrap_or(self.default_timeout);

        let mut req_builder = self.client.post(request.url.clone());
        for (key, value) in &request.headers {
            req_builder = req_builder.header(key, value);
        }

        let response = req_builder
            .body(request.body)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    NetworkError::Timeout { timeout }
                } else {
                    NetworkError::ConnectionFailed {
                        message: e.to_string(),
                    }
                }
            })?;

        let status = response.status().as_u16();

        if let Some(len) = response.content_length() {
            if len as usize > self.max_response_size {
                return Err(NetworkError::ResponseTooLarge { size: len as usize });
            }
        }

        let mut headers = HashMap::new();
        for (key, value) in response.headers() {
            if let Ok(v) = value.to_str() {
                headers.insert(key.as_str().to_lowercase(), v.to_string());
            }
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| NetworkError::ConnectionFailed {
                message: e.to_string(),
            })?;

        if body.len() > self.max_response_size {
            return Err(NetworkError::ResponseTooLarge { size: body.len() });
        }

        Ok(ExchangeResponse {
            status,
            headers,
            body: body.to_vec(),
        })
    }
}

/// Mock token exchanger for testing.
///
/// Responses are served in the order they were queued.
#[derive(Default)]
pub struct MockTokenExchanger {
    responses: Mutex<VecDeque<Result<ExchangeResponse, NetworkError>>>,
    request_history: Mutex<Vec<ExchangeRequest>>,
}

impl MockTokenExchanger {
    /// Create new mock exchanger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response to return.
    pub fn queue_response(&self, response: ExchangeResponse) -> &Self {
        self.responses.lock().unwrap().push_back(Ok(response));
        self
    }

    /// Queue a JSON response.
    pub fn queue_json_response(&self, status: u16, body: serde_json::Value) -> &Self {
        self.queue_response(ExchangeResponse::json(status, &body))
    }

    /// Queue a transport error.
    pub fn queue_error(&self, error: NetworkError) -> &Self {
        self.responses.lock().unwrap().push_back(Err(error));
        self
    }

    /// Get request history.
    pub fn get_requests(&self) -> Vec<ExchangeRequest> {
        self.request_history.lock().unwrap().clone()
    }

    /// Get last request.
    pub fn get_last_request(&self) -> Option<ExchangeRequest> {
        self.request_history.lock().unwrap().last().cloned()
    }

    /// Number of requests sent.
    pub fn request_count(&self) -> usize {
        self.request_history.lock().unwrap().len()
    }
}

#[async_trait]
impl TokenExchanger for MockTokenExchanger {
    async fn send(&self, request: ExchangeRequest) -> Result<ExchangeResponse, NetworkError> {
        self.request_history.lock().unwrap().push(request);

        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Err(NetworkError::ConnectionFailed {
                    message: "No mock response available".to_string(),
                })
            })
    }
}

/// Create production token exchanger.
pub fn create_exchanger(timeout: Option<Duration>) -> Result<ReqwestTokenExchanger, SessionError> {
    match timeout {
        Some(t) => ReqwestTokenExchanger::with_options(t, DEFAULT_MAX_RESPONSE_SIZE),
        None => ReqwestTokenExchanger::new(),
    }
}

/// Create mock token exchanger for testing.
pub fn create_mock_exchanger() -> MockTokenExchanger {
    MockTokenExchanger::new()
}
