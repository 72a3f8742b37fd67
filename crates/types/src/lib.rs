//! Core types and traits for the broxy workspace.
//!
//! This crate defines the abstractions the proxy core is built on: the
//! [`TokenSource`] and [`HttpTransport`] seams, the validated
//! [`BackendEndpoint`], the redacting [`BearerToken`], and the shared
//! [`BroxyError`] type.

pub mod backend;
pub mod error;
pub mod token;
pub mod traits;

pub use backend::BackendEndpoint;
pub use error::{BroxyError, Result};
pub use token::BearerToken;
pub use traits::{HttpTransport, TokenSource};
