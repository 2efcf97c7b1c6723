//! Session Types
//!
//! Immutable credential snapshot and its secure store key namespace.

use chrono::{DateTime, Duration, Utc};
use secrecy::{ExposeSecret, SecretString};

use crate::error::{SessionError, SessionResult};
use crate::types::TokenResponse;

/// Credential snapshot produced by a token exchange.
///
/// A `Session` is never mutated; every exchange yields a new value. Expiry is
/// kept at whole-second precision so it survives the integer round trip
/// through the secure store.
#[derive(Clone)]
pub struct Session {
    access_token: SecretString,
    refresh_token: Option<SecretString>,
    expires_at: Option<DateTime<Utc>>,
}

impl Session {
    /// Create a session with an absolute expiry.
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        expires_at: Option<DateTime<Utc>>,
    ) -> SessionResult<Self> {
        let access_token = access_token.into();
        if access_token.is_empty() {
            return Err(SessionError::InvalidSession {
                message: "access token must not be empty".to_string(),
            });
        }

        Ok(Self {
            access_token: SecretString::new(access_token),
            refresh_token: refresh_token.map(SecretString::new),
            expires_at: expires_at.map(truncate_to_seconds),
        })
    }

    /// Create a session with a lifetime relative to `now`.
    ///
    /// A lifetime past the representable range saturates at
    /// [`DateTime::<Utc>::MAX_UTC`].
    pub fn with_expires_in(
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        expires_in: Option<u64>,
        now: DateTime<Utc>,
    ) -> SessionResult<Self> {
        let expires_at = expires_in.map(|secs| {
            i64::try_from(secs)
                .ok()
                .and_then(Duration::try_seconds)
                .and_then(|lifetime| now.checked_add_signed(lifetime))
                .unwrap_or(DateTime::<Utc>::MAX_UTC)
        });
        Self::new(access_token, refresh_token, expires_at)
    }

    /// Create a session from a token endpoint response received at `now`.
    pub fn from_token_response(response: TokenResponse, now: DateTime<Utc>) -> SessionResult<Self> {
        Self::with_expires_in(
            response.access_token,
            response.refresh_token,
            response.expires_in,
            now,
        )
    }

    /// Access token value.
    pub fn access_token(&self) -> &str {
        self.access_token.expose_secret()
    }

    /// Refresh token value, if issued.
    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_ref().map(|t| t.expose_secret().as_str())
    }

    /// Absolute expiry, if known.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// Whether the access token has expired at `now`. No expiry means never.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map(|exp| exp <= now).unwrap_or(false)
    }

    /// Whether the access token has expired.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Refresh eligibility: a refresh token and a future expiry are both required.
    pub fn can_refresh_at(&self, now: DateTime<Utc>) -> bool {
        self.refresh_token.is_some() && self.expires_at.map(|exp| exp > now).unwrap_or(false)
    }

    /// Refresh eligibility against the current time.
    pub fn can_refresh(&self) -> bool {
        self.can_refresh_at(Utc::now())
    }

    /// Remaining access token lifetime in seconds, clamped at zero.
    pub fn remaining_lifetime(&self) -> Option<i64> {
        self.expires_at
            .map(|exp| (exp - Utc::now()).num_seconds().max(0))
    }

    /// Format as Authorization header value.
    pub fn authorization_header(&self) -> String {
        format!("Bearer {}", self.access_token.expose_secret())
    }
}

impl PartialEq for Session {
    fn eq(&self, other: &Self) -> bool {
        self.access_token() == other.access_token()
            && self.refresh_token() == other.refresh_token()
            && self.expires_at == other.expires_at
    }
}

impl Eq for Session {}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("access_token", &"[REDACTED]")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

fn truncate_to_seconds(at: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp(at.timestamp(), 0).unwrap_or(at)
}

/// Secure store keys derived from a single prefix.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionKeys {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: String,
}

impl SessionKeys {
    /// Derive the three keys for `prefix`.
    pub fn new(prefix: &str) -> Self {
        Self {
            access_token: format!("{}_access_token", prefix),
            refresh_token: format!("{}_refresh_token", prefix),
            expires_at: format!("{}_expires_at", prefix),
        }
    }

    /// All keys, in write order.
    pub fn all(&self) -> [&str; 3] {
        [&self.access_token, &self.refresh_token, &self.expires_at]
    }
}
