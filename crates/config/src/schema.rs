use broxy_types::{BackendEndpoint, BroxyError};
use figment::{
    Figment,
    providers::{Env, Format as _, Serialized, Yaml},
};
use serde::{Deserialize, Serialize};
use std::{fmt, path::Path, time::Duration};

/// Prefix for environment overrides; nested keys are separated by `__`.
pub const ENV_PREFIX: &str = "BROXY_";

fn default_port() -> u16 {
    8080
}
fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_level() -> String {
    "info".to_string()
}

/// Where the proxy gets its bearer tokens from.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TokenSourceConfig {
    /// A fixed token.
    Static { token: String },
    /// Run a command per request and use its trimmed stdout,
    /// e.g. `gcloud auth print-access-token`.
    Command {
        command: String,
        #[serde(default)]
        args: Vec<String>,
    },
    /// The GCE metadata server of the host the proxy runs on.
    Metadata {
        /// Overrides the metadata token URL.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        url: Option<String>,
    },
}

impl fmt::Debug for TokenSourceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static { .. } => f
                .debug_struct("Static")
                .field("token", &"[REDACTED]")
                .finish(),
            Self::Command { command, args } => f
                .debug_struct("Command")
                .field("command", command)
                .field("args", args)
                .finish(),
            Self::Metadata { url } => f.debug_struct("Metadata").field("url", url).finish(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Logging configuration. `RUST_LOG` takes precedence over `level`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    #[serde(default = "default_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: LogFormat::default(),
        }
    }
}

/// Top-level application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Listen port (defaults to 8080).
    #[serde(default = "default_port")]
    pub port: u16,
    /// Listen address (defaults to `127.0.0.1`).
    #[serde(default = "default_host")]
    pub host: String,
    /// Base URL of the broker every request is forwarded to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend_url: Option<String>,
    /// Outbound HTTP proxy used for broker calls.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy_url: Option<String>,
    /// Per-request timeout for broker calls, in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_source: Option<TokenSourceConfig>,
    #[serde(default)]
    pub log: LogConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            backend_url: None,
            proxy_url: None,
            timeout_secs: None,
            token_source: None,
            log: LogConfig::default(),
        }
    }
}

impl Config {
    /// Parses configuration from a YAML string, merged with defaults.
    ///
    /// # Errors
    ///
    /// Returns a [`figment::Error`] if the YAML is invalid or extraction fails.
    #[allow(clippy::result_large_err)]
    pub fn from_yaml(yaml: &str) -> Result<Self, figment::Error> {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Yaml::string(yaml))
            .extract()
    }

    /// Loads configuration from a file path, merged with defaults.
    ///
    /// # Errors
    ///
    /// Returns a [`figment::Error`] if the file cannot be read or parsed.
    #[allow(clippy::result_large_err)]
    pub fn from_file(path: &Path) -> Result<Self, figment::Error> {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path))
            .extract()
    }

    /// Loads defaults, then the optional YAML file, then `BROXY_*` variables.
    ///
    /// # Errors
    ///
    /// Returns a [`figment::Error`] if any layer fails to parse.
    #[allow(clippy::result_large_err)]
    pub fn load(path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(path) = path {
            figment = figment.merge(Yaml::file(path));
        }
        figment.merge(Env::prefixed(ENV_PREFIX).split("__")).extract()
    }

    /// Checks that the configuration is complete enough to start the proxy.
    ///
    /// # Errors
    ///
    /// Returns [`BroxyError::Config`] or [`BroxyError::InvalidBackendUrl`]
    /// describing the first problem found.
    pub fn validate(&self) -> broxy_types::Result<()> {
        self.backend_endpoint()?;
        match &self.token_source {
            None => {
                return Err(BroxyError::Config("token_source is not configured".into()));
            }
            Some(TokenSourceConfig::Static { token }) if token.trim().is_empty() => {
                return Err(BroxyError::Config("static token is empty".into()));
            }
            Some(TokenSourceConfig::Command { command, .. }) if command.trim().is_empty() => {
                return Err(BroxyError::Config("token command is empty".into()));
            }
            Some(_) => {}
        }
        if self.timeout_secs == Some(0) {
            return Err(BroxyError::Config("timeout_secs must be positive".into()));
        }
        Ok(())
    }

    /// The validated broker endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if `backend_url` is missing or invalid.
    pub fn backend_endpoint(&self) -> broxy_types::Result<BackendEndpoint> {
        let raw = self
            .backend_url
            .as_deref()
            .ok_or_else(|| BroxyError::Config("backend_url is not configured".into()))?;
        BackendEndpoint::parse(raw)
    }

    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    /// `host:port` to bind the listener on.
    #[must_use]
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
