//! Async traits at the seams of the proxy core.
//!
//! The proxy depends only on these two abstractions, so tests can swap in
//! fakes and the binary can pick a token source from configuration.

use crate::{BearerToken, Result};
use async_trait::async_trait;

/// Produces a bearer token for the broker.
///
/// Called once per outbound request; implementations must be safe to call
/// concurrently from many request tasks.
#[async_trait]
pub trait TokenSource: Send + Sync {
    /// Obtain a currently valid token.
    async fn get_token(&self) -> Result<BearerToken>;
}

/// Executes one fully formed HTTP request against the broker.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Send `request` and return the response head with a streaming body.
    ///
    /// Any response status is `Ok`; only failures to complete the exchange are
    /// errors.
    async fn execute(&self, request: reqwest::Request) -> Result<reqwest::Response>;
}

#[async_trait]
impl HttpTransport for reqwest::Client {
    async fn execute(&self, request: reqwest::Request) -> Result<reqwest::Response> {
        Ok(Self::execute(self, request).await?)
    }
}
