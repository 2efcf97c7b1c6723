//! Configuration Builder
//!
//! Fluent builder for session manager configuration.

use std::time::Duration;

use crate::error::{ConfigurationError, SessionError};
use crate::types::{ClientCredentials, SessionConfig, DEFAULT_TIMEOUT_SECS};
use secrecy::SecretString;
use url::Url;

/// Session configuration builder.
#[derive(Default)]
pub struct SessionConfigBuilder {
    authorization_url: Option<String>,
    token_url: Option<String>,
    redirect_uri: Option<String>,
    client_id: Option<String>,
    client_secret: Option<SecretString>,
    key_prefix: Option<String>,
    timeout: Duration,
}

impl SessionConfigBuilder {
    /// Create new configuration builder.
    pub fn new() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            ..Default::default()
        }
    }

    /// Set authorization endpoint.
    pub fn authorization_url(mut self, url: impl Into<String>) -> Self {
        self.authorization_url = Some(url.into());
        self
    }

    /// Set token exchange endpoint.
    pub fn token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = Some(url.into());
        self
    }

    /// Set redirect URI.
    pub fn redirect_uri(mut self, uri: impl Into<String>) -> Self {
        self.redirect_uri = Some(uri.into());
        self
    }

    /// Set client ID.
    pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    /// Set client secret.
    pub fn client_secret(mut self, client_secret: impl Into<String>) -> Self {
        self.client_secret = Some(SecretString::new(client_secret.into()));
        self
    }

    /// Set the secure store key prefix.
    pub fn key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = Some(prefix.into());
        self
    }

    /// Set token exchange timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build the session configuration.
    pub fn build(self) -> Result<SessionConfig, SessionError> {
        let authorization_url = parse_endpoint(required(self.authorization_url, "authorization_url")?)?;
        let token_url = parse_endpoint(required(self.token_url, "token_url")?)?;

        let redirect_uri = required(self.redirect_uri, "redirect_uri")?;
        let callback_scheme = parse_endpoint(redirect_uri.clone())?.scheme().to_string();

        let client_id = required(self.client_id, "client_id")?;
        if client_id.is_empty() {
            return Err(invalid("client_id must not be empty"));
        }

        let client_secret = self.client_secret.ok_or_else(|| missing("client_secret"))?;

        let key_prefix = required(self.key_prefix, "key_prefix")?;
        if key_prefix.is_empty() {
            return Err(invalid("key_prefix must not be empty"));
        }

        Ok(SessionConfig {
            authorization_url,
            token_url,
            redirect_uri,
            callback_scheme,
            credentials: ClientCredentials {
                client_id,
                client_secret,
            },
            key_prefix,
            timeout: self.timeout,
        })
    }
}

fn required(value: Option<String>, field: &str) -> Result<String, SessionError> {
    value.ok_or_else(|| missing(field))
}

fn missing(field: &str) -> SessionError {
    SessionError::Configuration(ConfigurationError::MissingRequired {
        field: field.to_string(),
    })
}

fn invalid(message: &str) -> SessionError {
    SessionError::Configuration(ConfigurationError::InvalidConfig {
        message: message.to_string(),
    })
}

fn parse_endpoint(url: String) -> Result<Url, SessionError> {
    Url::parse(&url)
        .map_err(|_| SessionError::Configuration(ConfigurationError::InvalidEndpoint { url }))
}

/// Create a new session configuration builder.
pub fn session_config() -> SessionConfigBuilder {
    SessionConfigBuilder::new()
}
