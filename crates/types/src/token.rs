//! Bearer token representation.

use crate::{BroxyError, Result};
use reqwest::header::HeaderValue;
use secrecy::{ExposeSecret as _, SecretString};
use std::fmt;

/// An opaque bearer credential.
///
/// There is no expiry tracking: a token is fetched for one outbound request
/// and dropped afterwards. `Debug` never prints the secret.
pub struct BearerToken(SecretString);

impl BearerToken {
    /// Wraps a raw access token.
    pub fn new(token: impl Into<String>) -> Self {
        Self(SecretString::from(token.into()))
    }

    /// Returns the raw token string.
    #[must_use]
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }

    /// Builds the `Authorization: Bearer <token>` header value, marked sensitive.
    ///
    /// # Errors
    ///
    /// Returns [`BroxyError::Credential`] if the token contains bytes that are
    /// not allowed in a header value.
    pub fn authorization(&self) -> Result<HeaderValue> {
        let mut value = HeaderValue::from_str(&format!("Bearer {}", self.expose()))
            .map_err(|_| BroxyError::Credential("token is not a valid header value".into()))?;
        value.set_sensitive(true);
        Ok(value)
    }
}

impl fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BearerToken([REDACTED])")
    }
}
