//! API error type that maps [`BroxyError`] variants to HTTP status codes.
//!
//! Only failures on the proxy's side of a forward end up here; whatever
//! status the broker itself answers with is relayed untouched. A request
//! target that cannot be forwarded unchanged is the one client error.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use broxy_types::BroxyError;
use serde_json::json;

/// Wrapper around [`BroxyError`] that implements [`IntoResponse`].
#[derive(Debug)]
pub struct ApiError(pub BroxyError);

impl ApiError {
    /// Returns `(status, error_type, error_code)` for the wrapped error.
    fn classify(&self) -> (StatusCode, &'static str, &'static str) {
        match &self.0 {
            BroxyError::Credential(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "server_error",
                "credential_error",
            ),
            BroxyError::UnforwardableTarget(_) => (
                StatusCode::BAD_REQUEST,
                "invalid_request_error",
                "invalid_request_target",
            ),
            // BackendRejection is only raised by the startup check; forwarded
            // broker responses are relayed, never wrapped.
            BroxyError::Transport(_) | BroxyError::BackendRejection { .. } => {
                (StatusCode::BAD_GATEWAY, "server_error", "upstream_error")
            }
            BroxyError::InvalidBackendUrl(_) | BroxyError::Config(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "server_error",
                "internal_error",
            ),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, error_code) = self.classify();
        let msg = self.0.to_string();
        tracing::warn!(status = status.as_u16(), code = error_code, error = %msg, "forward failed");
        (
            status,
            Json(json!({
                "error": {
                    "message": msg,
                    "type": error_type,
                    "code": error_code,
                }
            })),
        )
            .into_response()
    }
}

impl From<BroxyError> for ApiError {
    fn from(e: BroxyError) -> Self {
        Self(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt as _;

    async fn extract_error_body(err: ApiError) -> (StatusCode, serde_json::Value) {
        let resp = err.into_response();
        let status = resp.status();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        (status, body)
    }

    #[tokio::test]
    async fn test_credential_error() {
        let (status, body) =
            extract_error_body(ApiError(BroxyError::Credential("oops".into()))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"]["type"], "server_error");
        assert_eq!(body["error"]["code"], "credential_error");
        assert!(body["error"]["message"].as_str().unwrap().contains("oops"));
    }

    #[tokio::test]
    async fn test_transport_error() {
        let (status, body) =
            extract_error_body(ApiError(BroxyError::Transport("connection refused".into())))
                .await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["error"]["code"], "upstream_error");
    }

    #[tokio::test]
    async fn test_backend_rejection_error() {
        let (status, _) = extract_error_body(ApiError(BroxyError::BackendRejection {
            status: 401,
            body: "unauthorized".into(),
        }))
        .await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn test_internal_error() {
        let (status, body) =
            extract_error_body(ApiError(BroxyError::Config("bad config".into()))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"]["code"], "internal_error");
    }

    #[tokio::test]
    async fn test_unforwardable_target_is_bad_request() {
        let (status, body) = extract_error_body(ApiError(BroxyError::UnforwardableTarget(
            "/v2/a{b} would be sent as /v2/a%7Bb%7D".into(),
        )))
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["type"], "invalid_request_error");
        assert_eq!(body["error"]["code"], "invalid_request_target");
    }

    #[test]
    fn test_failures_on_our_side_are_server_errors() {
        let errors = [
            BroxyError::Credential(String::new()),
            BroxyError::Transport(String::new()),
            BroxyError::BackendRejection {
                status: 404,
                body: String::new(),
            },
            BroxyError::InvalidBackendUrl(String::new()),
            BroxyError::Config(String::new()),
        ];
        for err in errors {
            assert!(ApiError(err).classify().0.is_server_error());
        }
    }
}
