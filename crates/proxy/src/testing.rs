//! Test doubles for the two seams.

use async_trait::async_trait;
use axum::http::{HeaderMap, Method};
use broxy_types::{BearerToken, BroxyError, HttpTransport, Result, TokenSource};
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};

/// Token source that counts calls and either succeeds or fails.
pub(crate) struct FakeTokenSource {
    token: &'static str,
    error: Option<&'static str>,
    calls: AtomicUsize,
}

impl FakeTokenSource {
    pub(crate) fn returning(token: &'static str) -> Self {
        Self {
            token,
            error: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn failing(message: &'static str) -> Self {
        Self {
            token: "",
            error: Some(message),
            calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenSource for FakeTokenSource {
    async fn get_token(&self) -> Result<BearerToken> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.error {
            Some(message) => Err(BroxyError::Credential(message.to_string())),
            None => Ok(BearerToken::new(self.token)),
        }
    }
}

/// What a [`FakeTransport`] saw.
pub(crate) struct RecordedRequest {
    pub(crate) method: Method,
    pub(crate) url: reqwest::Url,
    pub(crate) headers: HeaderMap,
}

enum Reply {
    Canned { status: u16, body: &'static str },
    BrokenBody { status: u16 },
    Fail(&'static str),
    Hang(Arc<AtomicBool>),
}

/// Sets its flag when dropped.
struct DropFlag(Arc<AtomicBool>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

/// Transport that records requests and answers with a canned reply.
pub(crate) struct FakeTransport {
    reply: Reply,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl FakeTransport {
    fn new(reply: Reply) -> Self {
        Self {
            reply,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn responding(status: u16, body: &'static str) -> Self {
        Self::new(Reply::Canned { status, body })
    }

    /// Answers with `status`, but reading the body fails.
    pub(crate) fn with_broken_body(status: u16) -> Self {
        Self::new(Reply::BrokenBody { status })
    }

    pub(crate) fn failing(message: &'static str) -> Self {
        Self::new(Reply::Fail(message))
    }

    /// Never answers. `dropped` is set once the pending call is dropped.
    pub(crate) fn hanging(dropped: Arc<AtomicBool>) -> Self {
        Self::new(Reply::Hang(dropped))
    }

    pub(crate) fn take_requests(&self) -> Vec<RecordedRequest> {
        std::mem::take(&mut *self.requests.lock().unwrap())
    }
}

#[async_trait]
impl HttpTransport for FakeTransport {
    async fn execute(&self, request: reqwest::Request) -> Result<reqwest::Response> {
        self.requests.lock().unwrap().push(RecordedRequest {
            method: request.method().clone(),
            url: request.url().clone(),
            headers: request.headers().clone(),
        });
        let (status, body) = match &self.reply {
            Reply::Canned { status, body } => (*status, reqwest::Body::from(*body)),
            Reply::BrokenBody { status } => {
                let chunks: Vec<std::io::Result<Vec<u8>>> =
                    vec![Err(std::io::Error::other("connection reset"))];
                (*status, reqwest::Body::wrap_stream(futures_util::stream::iter(chunks)))
            }
            Reply::Fail(message) => return Err(BroxyError::Transport((*message).to_string())),
            Reply::Hang(dropped) => {
                let _guard = DropFlag(dropped.clone());
                std::future::pending::<()>().await;
                unreachable!("pending never resolves");
            }
        };
        let response = axum::http::Response::builder()
            .status(status)
            .body(body)
            .unwrap();
        Ok(reqwest::Response::from(response))
    }
}
