//! Builds the configured [`TokenSource`].

use broxy_config::TokenSourceConfig;
use broxy_types::TokenSource;
use std::sync::Arc;

use crate::{CommandTokenSource, MetadataTokenSource, StaticTokenSource};

/// Creates the token source described by `config`.
///
/// `http` is only used by sources that talk HTTP themselves (the metadata
/// server); it should not route through the broker's outbound proxy.
#[must_use]
pub fn build_token_source(
    config: &TokenSourceConfig,
    http: reqwest::Client,
) -> Arc<dyn TokenSource> {
    match config {
        TokenSourceConfig::Static { token } => Arc::new(StaticTokenSource::new(token.clone())),
        TokenSourceConfig::Command { command, args } => {
            Arc::new(CommandTokenSource::new(command.clone(), args.clone()))
        }
        TokenSourceConfig::Metadata { url } => {
            Arc::new(MetadataTokenSource::new(http, url.clone()))
        }
    }
}
