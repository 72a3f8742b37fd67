//! Token sources for authenticating the proxy to the broker.
//!
//! Every source fetches on demand; nothing here caches a token across calls.

pub mod command;
pub mod factory;
pub mod metadata;
pub mod static_source;

pub use command::CommandTokenSource;
pub use factory::build_token_source;
pub use metadata::MetadataTokenSource;
pub use static_source::StaticTokenSource;
