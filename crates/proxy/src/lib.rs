//! Reverse proxy core: startup check, per-request forwarding, and error mapping.
//!
//! [`BrokerProxy`] holds the broker endpoint plus the two injected seams
//! ([`TokenSource`], [`HttpTransport`]). It checks the broker once at boot with
//! [`BrokerProxy::perform_startup_check`] and then serves an axum [`Router`]
//! whose fallback forwards every path to the broker with a fresh token.

mod error;
mod forward;
mod startup;
#[cfg(test)]
mod testing;

pub use error::ApiError;

use axum::{Router, http::HeaderMap};
use broxy_types::{BackendEndpoint, BearerToken, BroxyError, HttpTransport, Result, TokenSource};
use reqwest::header::{AUTHORIZATION, HeaderValue};
use std::{sync::Arc, time::Duration};
use tower_http::trace::TraceLayer;

/// Path of the broker's catalog endpoint, used by the startup check.
pub const CATALOG_PATH: &str = "/v2/catalog";
/// Protocol version header sent on every broker call.
pub const API_VERSION_HEADER: &str = "x-broker-api-version";
/// Protocol version the proxy speaks.
pub const API_VERSION: &str = "2.14";

/// A credential-injecting proxy in front of exactly one broker.
pub struct BrokerProxy {
    backend: BackendEndpoint,
    tokens: Arc<dyn TokenSource>,
    transport: Arc<dyn HttpTransport>,
}

impl BrokerProxy {
    #[must_use]
    pub fn new(
        backend: BackendEndpoint,
        tokens: Arc<dyn TokenSource>,
        transport: Arc<dyn HttpTransport>,
    ) -> Self {
        Self {
            backend,
            tokens,
            transport,
        }
    }

    #[must_use]
    pub fn backend(&self) -> &BackendEndpoint {
        &self.backend
    }

    /// Build the axum router. Every method and path goes to the forwarder.
    pub fn router(self: Arc<Self>) -> Router {
        Router::new()
            .fallback(forward::forward)
            .with_state(self)
            .layer(TraceLayer::new_for_http())
    }

    /// Fetch a token for exactly one outbound request.
    async fn fetch_token(&self) -> Result<BearerToken> {
        self.tokens
            .get_token()
            .await
            .map_err(BroxyError::into_credential)
    }
}

/// Sets `Authorization` and the API version header, replacing any existing values.
fn apply_broker_headers(headers: &mut HeaderMap, token: &BearerToken) -> Result<()> {
    headers.insert(AUTHORIZATION, token.authorization()?);
    headers.insert(API_VERSION_HEADER, HeaderValue::from_static(API_VERSION));
    Ok(())
}

/// Build the HTTP client used for broker calls.
///
/// Redirects are not followed so the broker's 3xx responses reach the caller
/// as-is.
///
/// # Errors
///
/// Returns [`BroxyError::Config`] if `proxy_url` is invalid or the client
/// cannot be built.
pub fn build_http_client(
    proxy_url: Option<&str>,
    timeout: Option<Duration>,
) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder().redirect(reqwest::redirect::Policy::none());
    if let Some(url) = proxy_url {
        let proxy = reqwest::Proxy::all(url)
            .map_err(|e| BroxyError::Config(format!("invalid proxy_url {url}: {e}")))?;
        builder = builder.proxy(proxy);
    }
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    builder
        .build()
        .map_err(|e| BroxyError::Config(format!("failed to build http client: {e}")))
}
