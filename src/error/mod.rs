//! Session Error Types
//!
//! Error hierarchy for the session lifecycle. Every operation terminates in
//! exactly one `SessionResult`.

use std::time::Duration;
use thiserror::Error;

/// Root error type for session operations.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Authorization canceled: {reason}")]
    Canceled { reason: String },

    #[error("Session expired or cannot be refreshed")]
    Expired,

    #[error("No session available")]
    NoSession,

    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("Malformed token response (HTTP {status}): {message}")]
    MalformedResponse { status: u16, message: String },

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Invalid session: {message}")]
    InvalidSession { message: String },
}

impl SessionError {
    /// Build a cancellation with the given reason.
    pub fn canceled(reason: impl Into<String>) -> Self {
        Self::Canceled {
            reason: reason.into(),
        }
    }

    /// Get error code for telemetry.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Canceled { .. } => "SESSION_CANCELED",
            Self::Expired => "SESSION_EXPIRED",
            Self::NoSession => "SESSION_NONE",
            Self::Network(_) => "SESSION_NETWORK",
            Self::MalformedResponse { .. } => "SESSION_MALFORMED_RESPONSE",
            Self::Provider(_) => "SESSION_PROVIDER",
            Self::Storage(_) => "SESSION_STORAGE",
            Self::Configuration(_) => "SESSION_CONFIG",
            Self::InvalidSession { .. } => "SESSION_INVALID",
        }
    }

    /// Check if the caller may reasonably try the same call again.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(e) => e.is_retryable(),
            Self::Provider(ProviderError::ServerError { .. }) => true,
            Self::Provider(ProviderError::TemporarilyUnavailable { .. }) => true,
            _ => false,
        }
    }

    /// Get retry-after duration if applicable.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::Provider(ProviderError::TemporarilyUnavailable { retry_after }) => *retry_after,
            _ => None,
        }
    }

    /// Check if error requires the user to authenticate again.
    pub fn needs_reauth(&self) -> bool {
        matches!(
            self,
            Self::Expired
                | Self::NoSession
                | Self::Provider(ProviderError::InvalidGrant { .. })
        )
    }
}

/// Configuration error.
#[derive(Error, Debug)]
pub enum ConfigurationError {
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("Missing required field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid endpoint URL: {url}")]
    InvalidEndpoint { url: String },
}

/// Network/transport error.
#[derive(Error, Debug, Clone)]
pub enum NetworkError {
    #[error("Connection failed: {message}")]
    ConnectionFailed { message: String },

    #[error("Request timeout after {timeout:?}")]
    Timeout { timeout: Duration },

    #[error("Response too large: {size} bytes")]
    ResponseTooLarge { size: usize },
}

impl NetworkError {
    /// Check if error is retryable.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::ResponseTooLarge { .. })
    }
}

/// Secure store error.
#[derive(Error, Debug, Clone)]
pub enum StorageError {
    #[error("Read failed for {key}: {message}")]
    ReadFailed { key: String, message: String },

    #[error("Write failed for {key}: {message}")]
    WriteFailed { key: String, message: String },

    #[error("Delete failed for {key}: {message}")]
    DeleteFailed { key: String, message: String },

    #[error("Corrupted data for {key}: {message}")]
    CorruptedData { key: String, message: String },
}

/// Provider (OAuth2 server) error.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Invalid client credentials")]
    InvalidClient { error_description: Option<String> },

    #[error("Invalid grant: {message}")]
    InvalidGrant { message: String },

    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("Invalid scope: {scope}")]
    InvalidScope { scope: String },

    #[error("Unauthorized client for this grant type")]
    UnauthorizedClient { error_description: Option<String> },

    #[error("Unsupported grant type: {grant_type}")]
    UnsupportedGrantType { grant_type: String },

    #[error("Server error: {message}")]
    ServerError { message: String },

    #[error("Server temporarily unavailable")]
    TemporarilyUnavailable { retry_after: Option<Duration> },
}

/// Result type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;

/// OAuth2 error document returned by a token endpoint.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct OAuth2ErrorResponse {
    pub error: String,
    #[serde(default)]
    pub error_description: Option<String>,
    #[serde(default)]
    pub error_uri: Option<String>,
}

/// Map token endpoint error document to error type.
pub fn map_token_error(response: &OAuth2ErrorResponse) -> ProviderError {
    let description = || response.error_description.clone();
    match response.error.as_str() {
        "invalid_client" => ProviderError::InvalidClient {
            error_description: description(),
        },
        "invalid_grant" => ProviderError::InvalidGrant {
            message: description().unwrap_or_else(|| "Invalid grant".to_string()),
        },
        "invalid_scope" => ProviderError::InvalidScope {
            scope: description().unwrap_or_default(),
        },
        "unauthorized_client" => ProviderError::UnauthorizedClient {
            error_description: description(),
        },
        "unsupported_grant_type" => ProviderError::UnsupportedGrantType {
            grant_type: description().unwrap_or_default(),
        },
        "server_error" => ProviderError::ServerError {
            message: description().unwrap_or_else(|| "Server error".to_string()),
        },
        "temporarily_unavailable" => ProviderError::TemporarilyUnavailable { retry_after: None },
        _ => ProviderError::InvalidRequest {
            message: description().unwrap_or_else(|| response.error.clone()),
        },
    }
}

/// Parse an OAuth2 error document from a response body.
pub fn parse_error_response(body: &[u8]) -> Option<OAuth2ErrorResponse> {
    serde_json::from_slice(body).ok()
}

/// Get user-friendly error message.
pub fn get_user_message(error: &SessionError) -> String {
    match error {
        SessionError::Canceled { .. } => "Sign-in was canceled.".to_string(),
        SessionError::Expired | SessionError::NoSession => {
            "Your session has expired. Please sign in again.".to_string()
        }
        SessionError::Provider(ProviderError::InvalidGrant { .. }) => {
            "Your session can no longer be renewed. Please sign in again.".to_string()
        }
        SessionError::Network(NetworkError::Timeout { .. }) => {
            "The request timed out. Please check your connection and try again.".to_string()
        }
        SessionError::Network(_) => {
            "Could not reach the sign-in service. Please check your connection.".to_string()
        }
        SessionError::Provider(ProviderError::ServerError { .. })
        | SessionError::Provider(ProviderError::TemporarilyUnavailable { .. })
        | SessionError::MalformedResponse { .. } => {
            "The authentication service is temporarily unavailable. Please try again later."
                .to_string()
        }
        _ => "An authentication error occurred. Please try again.".to_string(),
    }
}
