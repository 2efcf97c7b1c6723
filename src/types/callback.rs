//! Callback Types
//!
//! Parameters carried by the authorization redirect.

use url::Url;

/// Callback parameters from authorization redirect.
#[derive(Clone, Debug, Default)]
pub struct CallbackParams {
    /// Authorization code (if success).
    pub code: Option<String>,
    /// State parameter.
    pub state: Option<String>,
    /// Error code (if authorization failed).
    pub error: Option<String>,
    /// Error description.
    pub error_description: Option<String>,
}

impl CallbackParams {
    /// Parse callback parameters from URL.
    pub fn from_url(url: &Url) -> Self {
        let mut params = Self::default();

        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "code" => params.code = Some(value.into_owned()),
                "state" => params.state = Some(value.into_owned()),
                "error" => params.error = Some(value.into_owned()),
                "error_description" => params.error_description = Some(value.into_owned()),
                _ => {}
            }
        }

        params
    }

    /// Check if callback contains an error.
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Authorization code, if the callback succeeded with a non-empty one.
    pub fn authorization_code(&self) -> Option<&str> {
        if self.is_error() {
            return None;
        }
        self.code.as_deref().filter(|code| !code.is_empty())
    }

    /// Human-readable reason a callback carries no usable code.
    pub fn failure_reason(&self) -> String {
        match (&self.error, &self.error_description) {
            (Some(error), Some(description)) => format!("{}: {}", error, description),
            (Some(error), None) => error.clone(),
            _ => "callback carried no authorization code".to_string(),
        }
    }
}
