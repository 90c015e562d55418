//! Request admission.
//!
//! Pulls the facts the forwarding engine needs out of an inbound request:
//! the request id assigned by the id layer and the peer address recorded by
//! the connect-info service.

use std::net::SocketAddr;

use axum::{extract::ConnectInfo, http::Request};

use crate::forward::headers::X_REQUEST_ID;
use crate::forward::ForwardContext;

impl ForwardContext {
    pub fn from_request<B>(request: &Request<B>) -> Self {
        let request_id = request
            .headers()
            .get(&X_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let client_addr = request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);

        Self {
            request_id,
            client_addr,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_from_request() {
        let mut request = Request::builder()
            .uri("/api")
            .header("x-request-id", "abc-123")
            .body(())
            .unwrap();
        let peer: SocketAddr = "10.1.2.3:4567".parse().unwrap();
        request.extensions_mut().insert(ConnectInfo(peer));

        let ctx = ForwardContext::from_request(&request);
        assert_eq!(ctx.request_id.as_deref(), Some("abc-123"));
        assert_eq!(ctx.client_addr, Some(peer));
    }

    #[test]
    fn test_context_without_metadata() {
        let request = Request::builder().uri("/").body(()).unwrap();
        let ctx = ForwardContext::from_request(&request);
        assert!(ctx.request_id.is_none());
        assert!(ctx.client_addr.is_none());
    }
}
