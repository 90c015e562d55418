//! Header manipulation for forwarded requests and relayed responses.
//!
//! # Responsibilities
//! - Strip hop-by-hop headers in both directions (RFC 9110 §7.6.1)
//! - Add X-Forwarded-For, X-Forwarded-Proto, X-Forwarded-Host
//! - Rewrite Host to the upstream unless the route preserves it

use std::net::SocketAddr;

use axum::http::{
    header::{self, HeaderName, HeaderValue},
    uri::Authority,
    HeaderMap,
};

pub const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");
pub const X_FORWARDED_HOST: HeaderName = HeaderName::from_static("x-forwarded-host");
pub const X_FORWARDED_PROTO: HeaderName = HeaderName::from_static("x-forwarded-proto");
pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

const KEEP_ALIVE: HeaderName = HeaderName::from_static("keep-alive");
const PROXY_CONNECTION: HeaderName = HeaderName::from_static("proxy-connection");

const HOP_BY_HOP: [HeaderName; 9] = [
    header::CONNECTION,
    KEEP_ALIVE,
    PROXY_CONNECTION,
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

/// Remove hop-by-hop headers, including any listed in `Connection`.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let listed: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();

    for name in listed {
        headers.remove(name);
    }
    for name in HOP_BY_HOP {
        headers.remove(name);
    }
}

/// Inputs for rewriting request headers toward one upstream.
#[derive(Debug)]
pub struct UpstreamHeaders<'a> {
    pub upstream: &'a Authority,
    pub preserve_host: bool,
    pub original_host: Option<&'a HeaderValue>,
    pub client_addr: Option<SocketAddr>,
    pub request_id: Option<&'a str>,
}

/// Turn client request headers into upstream request headers.
pub fn prepare_request_headers(headers: &mut HeaderMap, target: &UpstreamHeaders<'_>) {
    strip_hop_by_hop(headers);

    if !target.preserve_host {
        if let Ok(host) = HeaderValue::from_str(target.upstream.as_str()) {
            headers.insert(header::HOST, host);
        }
    }

    if let Some(addr) = target.client_addr {
        let ip = addr.ip().to_string();
        let value = match headers.get(&X_FORWARDED_FOR).and_then(|v| v.to_str().ok()) {
            Some(prior) if !prior.is_empty() => format!("{prior}, {ip}"),
            _ => ip,
        };
        if let Ok(value) = HeaderValue::from_str(&value) {
            headers.insert(X_FORWARDED_FOR, value);
        }
    }

    if let Some(host) = target.original_host {
        headers.insert(X_FORWARDED_HOST, host.clone());
    }
    headers.insert(X_FORWARDED_PROTO, HeaderValue::from_static("http"));

    if let Some(id) = target.request_id.and_then(|id| HeaderValue::from_str(id).ok()) {
        headers.insert(X_REQUEST_ID, id);
    }
}
