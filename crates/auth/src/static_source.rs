//! A token source that always returns the same configured token.

use async_trait::async_trait;
use broxy_types::{BearerToken, Result, TokenSource};
use secrecy::{ExposeSecret as _, SecretString};

/// Returns a fixed token, as a fresh [`BearerToken`] per call.
pub struct StaticTokenSource {
    token: SecretString,
}

impl StaticTokenSource {
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: SecretString::from(token.into()),
        }
    }
}

#[async_trait]
impl TokenSource for StaticTokenSource {
    async fn get_token(&self) -> Result<BearerToken> {
        Ok(BearerToken::new(self.token.expose_secret()))
    }
}
