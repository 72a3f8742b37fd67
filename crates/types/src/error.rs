//! Unified error type for the broxy workspace.

use std::error::Error as StdError;
use thiserror::Error;

/// Enumerates all error kinds that can occur across broxy crates.
#[derive(Debug, Error)]
pub enum BroxyError {
    /// The token source could not produce a bearer token.
    #[error("failed to obtain token: {0}")]
    Credential(String),

    /// The HTTP call to the broker could not complete (connect, DNS, timeout).
    #[error("broker request failed: {0}")]
    Transport(String),

    /// The broker answered, but not with the expected status.
    #[error("broker responded with non-successful status code {status}: {body}")]
    BackendRejection { status: u16, body: String },

    /// The configured broker URL is not a usable base URL.
    #[error("invalid backend url: {0}")]
    InvalidBackendUrl(String),

    /// The inbound path or query cannot be sent to the broker byte for byte.
    #[error("request target cannot be forwarded unchanged: {0}")]
    UnforwardableTarget(String),

    /// Configuration loading or validation error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<reqwest::Error> for BroxyError {
    fn from(e: reqwest::Error) -> Self {
        Self::Transport(error_chain(&e))
    }
}

impl BroxyError {
    /// Reclassifies any error raised while fetching a token as a
    /// [`BroxyError::Credential`], keeping the original message.
    #[must_use]
    pub fn into_credential(self) -> Self {
        match self {
            Self::Credential(_) => self,
            other => Self::Credential(other.to_string()),
        }
    }
}

/// Renders an error together with its `source()` chain, `outer: inner: ...`.
///
/// `reqwest` keeps the useful part ("connection refused") in the source, not
/// in the top-level message.
#[must_use]
pub fn error_chain(err: &dyn StdError) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(inner) = source {
        let msg = inner.to_string();
        if !out.contains(&msg) {
            out.push_str(": ");
            out.push_str(&msg);
        }
        source = inner.source();
    }
    out
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, BroxyError>;
