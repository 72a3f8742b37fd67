//! GCE metadata server token source.
//!
//! On Google Cloud the instance's service account token is served by the
//! metadata server; the server itself handles refresh, so every fetch is a
//! plain GET.

use async_trait::async_trait;
use broxy_types::{BearerToken, BroxyError, Result, TokenSource};
use serde::Deserialize;

/// Default service-account token endpoint.
pub const DEFAULT_TOKEN_URL: &str =
    "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token";

/// Header the metadata server requires on every request.
const METADATA_FLAVOR: (&str, &str) = ("Metadata-Flavor", "Google");

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

/// Token source backed by the metadata server.
pub struct MetadataTokenSource {
    http: reqwest::Client,
    url: String,
}

impl MetadataTokenSource {
    /// Uses [`DEFAULT_TOKEN_URL`] unless `url` is given.
    #[must_use]
    pub fn new(http: reqwest::Client, url: Option<String>) -> Self {
        Self {
            http,
            url: url.unwrap_or_else(|| DEFAULT_TOKEN_URL.to_string()),
        }
    }
}

#[async_trait]
impl TokenSource for MetadataTokenSource {
    async fn get_token(&self) -> Result<BearerToken> {
        let resp = self
            .http
            .get(&self.url)
            .header(METADATA_FLAVOR.0, METADATA_FLAVOR.1)
            .send()
            .await
            .map_err(|e| BroxyError::from(e).into_credential())?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(BroxyError::Credential(format!(
                "metadata server returned {status}: {text}"
            )));
        }

        let body: TokenResponse = resp.json().await.map_err(|e| {
            BroxyError::Credential(format!("failed to parse metadata token response: {e}"))
        })?;
        if body.access_token.is_empty() {
            return Err(BroxyError::Credential(
                "metadata server returned an empty access_token".into(),
            ));
        }
        tracing::debug!(expires_in = ?body.expires_in, "obtained token from metadata server");
        Ok(BearerToken::new(body.access_token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const TOKEN_PATH: &str = "/computeMetadata/v1/instance/service-accounts/default/token";

    fn source_for(server: &MockServer) -> MetadataTokenSource {
        MetadataTokenSource::new(
            reqwest::Client::new(),
            Some(format!("{}{TOKEN_PATH}", server.uri())),
        )
    }

    #[test]
    fn test_default_url() {
        let source = MetadataTokenSource::new(reqwest::Client::new(), None);
        assert_eq!(source.url, DEFAULT_TOKEN_URL);
    }

    #[tokio::test]
    async fn test_fetches_access_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(TOKEN_PATH))
            .and(header("metadata-flavor", "Google"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "ya29.test-token",
                "expires_in": 3599,
                "token_type": "Bearer"
            })))
            .expect(2)
            .mount(&server)
            .await;

        let source = source_for(&server);
        assert_eq!(source.get_token().await.unwrap().expose(), "ya29.test-token");
        // No caching: the second fetch hits the server again.
        assert_eq!(source.get_token().await.unwrap().expose(), "ya29.test-token");
    }

    #[tokio::test]
    async fn test_error_status_is_credential_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(TOKEN_PATH))
            .respond_with(ResponseTemplate::new(404).set_body_string("no service account"))
            .mount(&server)
            .await;

        let err = source_for(&server).get_token().await.unwrap_err();
        assert!(matches!(err, BroxyError::Credential(_)));
        assert!(err.to_string().contains("404"));
        assert!(err.to_string().contains("no service account"));
    }

    #[tokio::test]
    async fn test_malformed_body_is_credential_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let err = source_for(&server).get_token().await.unwrap_err();
        assert!(matches!(err, BroxyError::Credential(_)));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_credential_error() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let source = MetadataTokenSource::new(
            reqwest::Client::new(),
            Some(format!("http://127.0.0.1:{port}{TOKEN_PATH}")),
        );
        assert!(matches!(
            source.get_token().await,
            Err(BroxyError::Credential(_))
        ));
    }
}
