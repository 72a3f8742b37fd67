//! Configuration loading for the broxy proxy.
//!
//! Uses figment to layer serialized defaults, an optional YAML file and
//! `BROXY_`-prefixed environment variables.

pub mod schema;

pub use schema::{Config, LogConfig, LogFormat, TokenSourceConfig};
