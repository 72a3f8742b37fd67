//! The broker's base URL and how inbound paths map onto it.

use crate::{BroxyError, Result};
use reqwest::Url;
use std::{fmt, str::FromStr};

/// Absolute base URL of the broker. Immutable once validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendEndpoint {
    base: Url,
}

impl BackendEndpoint {
    /// Parses and validates a broker base URL.
    ///
    /// Accepts `http` and `https` URLs with a host and an optional path prefix.
    ///
    /// # Errors
    ///
    /// Returns [`BroxyError::InvalidBackendUrl`] if the URL does not parse, uses
    /// another scheme, has no host, or carries a query or fragment.
    pub fn parse(raw: &str) -> Result<Self> {
        let base =
            Url::parse(raw).map_err(|e| BroxyError::InvalidBackendUrl(format!("{raw}: {e}")))?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(BroxyError::InvalidBackendUrl(format!(
                "{raw}: unsupported scheme '{}'",
                base.scheme()
            )));
        }
        if base.host_str().is_none_or(str::is_empty) {
            return Err(BroxyError::InvalidBackendUrl(format!("{raw}: missing host")));
        }
        if base.query().is_some() || base.fragment().is_some() {
            return Err(BroxyError::InvalidBackendUrl(format!(
                "{raw}: query and fragment are not allowed"
            )));
        }
        Ok(Self { base })
    }

    /// Host name (or IP literal) of the broker.
    #[must_use]
    pub fn host(&self) -> &str {
        self.base.host_str().unwrap_or_default()
    }

    /// `host[:port]`, as it appears in the outbound `Host` header.
    #[must_use]
    pub fn authority(&self) -> String {
        match self.base.port() {
            Some(port) => format!("{}:{port}", self.host()),
            None => self.host().to_string(),
        }
    }

    /// The validated base URL.
    #[must_use]
    pub fn as_url(&self) -> &Url {
        &self.base
    }

    /// Maps an inbound `path?query` onto the broker.
    ///
    /// Scheme and authority come from the endpoint. The endpoint's path prefix
    /// and the inbound path are joined with exactly one slash. Path and query
    /// reach the broker byte for byte.
    ///
    /// # Errors
    ///
    /// Returns [`BroxyError::UnforwardableTarget`] when the URL parser would
    /// change the target, e.g. dot segments (plain or `%2e`) that would be
    /// resolved, or characters such as `{` or `'` that would be re-encoded.
    pub fn join(&self, path_and_query: &str) -> Result<Url> {
        let (path, query) = match path_and_query.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (path_and_query, None),
        };
        let prefix = self.base.path().trim_end_matches('/');
        let joined = if path.starts_with('/') {
            format!("{prefix}{path}")
        } else {
            format!("{prefix}/{path}")
        };

        // The base carries no query or fragment, so it ends with its path.
        let base = self.base.as_str();
        let origin = base.strip_suffix(self.base.path()).unwrap_or(base);
        let raw = match query {
            Some(query) => format!("{origin}{joined}?{query}"),
            None => format!("{origin}{joined}"),
        };

        let url = Url::parse(&raw)
            .map_err(|e| BroxyError::UnforwardableTarget(format!("{path_and_query}: {e}")))?;
        if url.path() != joined || url.query() != query || url.fragment().is_some() {
            let sent = match url.query() {
                Some(q) => format!("{}?{q}", url.path()),
                None => url.path().to_string(),
            };
            return Err(BroxyError::UnforwardableTarget(format!(
                "{path_and_query} would be sent as {sent}"
            )));
        }
        Ok(url)
    }
}

impl FromStr for BackendEndpoint {
    type Err = BroxyError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for BackendEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.base.as_str().trim_end_matches('/'))
    }
}
