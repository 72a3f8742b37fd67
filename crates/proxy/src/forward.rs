//! Per-request forwarding.
//!
//! Same method, path and query; new authority; a fresh token on every call.
//! The broker's status, headers and body stream back to the caller as-is.

use axum::{
    body::Body,
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, HeaderName, HeaderValue, header, uri::PathAndQuery},
    response::Response,
};
use http_body::Body as _;
use std::{
    net::{IpAddr, SocketAddr},
    sync::Arc,
};

use crate::{ApiError, BrokerProxy, apply_broker_headers};

/// Headers that must not be forwarded (hop-by-hop).
const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "proxy-connection",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Fallback handler: forwards any inbound request to the broker.
pub(crate) async fn forward(
    State(proxy): State<Arc<BrokerProxy>>,
    request: Request,
) -> Result<Response, ApiError> {
    let (parts, body) = request.into_parts();
    let path_and_query = parts.uri.path_and_query().map_or("/", PathAndQuery::as_str);
    let target = proxy.backend.join(path_and_query)?;

    let token = proxy.fetch_token().await?;

    let mut headers = upstream_headers(&parts.headers);
    if let Some(ConnectInfo(peer)) = parts.extensions.get::<ConnectInfo<SocketAddr>>() {
        append_forwarded_for(&mut headers, peer.ip());
    }
    apply_broker_headers(&mut headers, &token)?;

    tracing::debug!(method = %parts.method, path = %parts.uri.path(), "forwarding to broker");

    let mut outbound = reqwest::Request::new(parts.method, target);
    *outbound.headers_mut() = headers;
    if !body.is_end_stream() {
        *outbound.body_mut() = Some(reqwest::Body::wrap_stream(body.into_data_stream()));
    }

    let upstream = proxy.transport.execute(outbound).await?;
    Ok(relay(upstream))
}

/// Turns the broker's response into ours without buffering the body.
fn relay(upstream: reqwest::Response) -> Response {
    let status = upstream.status();
    let headers = strip_hop_by_hop(upstream.headers());
    let mut response = Response::new(Body::from_stream(upstream.bytes_stream()));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}

/// Inbound headers minus hop-by-hop headers and `Host`.
///
/// The outbound `Host` is derived from the target URL by the client.
fn upstream_headers(inbound: &HeaderMap) -> HeaderMap {
    let mut headers = strip_hop_by_hop(inbound);
    headers.remove(header::HOST);
    headers
}

fn strip_hop_by_hop(source: &HeaderMap) -> HeaderMap {
    let listed = connection_listed(source);
    let mut out = HeaderMap::with_capacity(source.len());
    for (name, value) in source {
        let name_str = name.as_str();
        if HOP_BY_HOP.contains(&name_str) || listed.iter().any(|n| n == name) {
            continue;
        }
        out.append(name.clone(), value.clone());
    }
    out
}

/// Header names the sender marked hop-by-hop through `Connection`.
fn connection_listed(headers: &HeaderMap) -> Vec<HeaderName> {
    headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|token| HeaderName::from_bytes(token.trim().as_bytes()).ok())
        .collect()
}

fn append_forwarded_for(headers: &mut HeaderMap, peer: IpAddr) {
    let prior: Vec<&str> = headers
        .get_all(X_FORWARDED_FOR)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .collect();
    let value = if prior.is_empty() {
        peer.to_string()
    } else {
        format!("{}, {peer}", prior.join(", "))
    };
    if let Ok(value) = HeaderValue::from_str(&value) {
        headers.insert(X_FORWARDED_FOR, value);
    }
}
