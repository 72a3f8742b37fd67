//! Boot-time check that the broker is reachable and accepts our credentials.

use broxy_types::{BroxyError, Result};
use reqwest::{Method, StatusCode};

use crate::{BrokerProxy, CATALOG_PATH, apply_broker_headers};

impl BrokerProxy {
    /// Calls `GET <backend>/v2/catalog` once with a fresh token.
    ///
    /// Succeeds only on `200 OK`. Nothing is retried; callers should refuse to
    /// serve traffic when this fails.
    ///
    /// # Errors
    ///
    /// - [`BroxyError::Credential`] if no token could be obtained.
    /// - [`BroxyError::Transport`] if the broker could not be reached.
    /// - [`BroxyError::BackendRejection`] with the status and body otherwise.
    pub async fn perform_startup_check(&self) -> Result<()> {
        let token = self.fetch_token().await?;

        let mut request = reqwest::Request::new(Method::GET, self.backend.join(CATALOG_PATH)?);
        apply_broker_headers(request.headers_mut(), &token)?;

        let response = self.transport.execute(request).await?;
        let status = response.status();
        if status != StatusCode::OK {
            let body = response
                .text()
                .await
                .unwrap_or_else(|e| format!("<unreadable body: {e}>"));
            return Err(BroxyError::BackendRejection {
                status: status.as_u16(),
                body,
            });
        }

        tracing::info!(backend = %self.backend, "broker catalog check passed");
        Ok(())
    }
}
