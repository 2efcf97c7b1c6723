//! Token Types
//!
//! Token endpoint request and response shapes.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::types::{GrantType, SessionConfig};

/// Token response from the token endpoint.
#[derive(Clone, Debug, Deserialize)]
pub struct TokenResponse {
    /// Access token.
    pub access_token: String,
    /// Refresh token.
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Expires in seconds. Numeric strings are accepted; a negative or
    /// non-numeric value is treated as absent.
    #[serde(default, deserialize_with = "lenient_expires_in")]
    pub expires_in: Option<u64>,
}

fn lenient_expires_in<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|value| match value {
        Value::Number(n) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|secs| secs.is_finite() && *secs >= 0.0)
                .map(|secs| secs as u64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }))
}

/// Grant-specific part of a token request.
#[derive(Clone, Debug)]
pub enum TokenRequest {
    /// Exchange an authorization code.
    AuthorizationCode { code: String },
    /// Exchange a refresh token.
    RefreshToken { refresh_token: SecretString },
}

impl TokenRequest {
    pub fn authorization_code(code: impl Into<String>) -> Self {
        Self::AuthorizationCode { code: code.into() }
    }

    pub fn refresh_token(refresh_token: impl Into<String>) -> Self {
        Self::RefreshToken {
            refresh_token: SecretString::new(refresh_token.into()),
        }
    }

    pub fn grant_type(&self) -> GrantType {
        match self {
            Self::AuthorizationCode { .. } => GrantType::AuthorizationCode,
            Self::RefreshToken { .. } => GrantType::RefreshToken,
        }
    }

    /// Build the JSON body fields for this grant.
    pub fn to_body(&self, config: &SessionConfig) -> BTreeMap<&'static str, String> {
        let mut body = BTreeMap::new();

        match self {
            Self::AuthorizationCode { code } => {
                body.insert("code", code.clone());
            }
            Self::RefreshToken { refresh_token } => {
                body.insert("refresh_token", refresh_token.expose_secret().clone());
            }
        }

        body.insert("client_id", config.credentials.client_id.clone());
        body.insert(
            "client_secret",
            config.credentials.client_secret.expose_secret().clone(),
        );
        body.insert("redirect_uri", config.redirect_uri.clone());
        body.insert("grant_type", self.grant_type().as_str().to_string());
        body
    }

    /// JSON-encoded body.
    pub fn to_json(&self, config: &SessionConfig) -> String {
        // A map of strings always serializes.
        serde_json::to_string(&self.to_body(config)).unwrap_or_default()
    }
}
