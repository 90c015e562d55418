//! The forwarding engine.
//!
//! # Responsibilities
//! - Select an upstream from the matched group
//! - Rewrite path and headers for the upstream
//! - Send over a pooled keep-alive client, under one per-request deadline
//! - Retry once on a different upstream after a transport failure
//! - Stream the response back and emit one outcome record

use std::error::Error as StdError;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{header, request::Parts, Request, Response, Uri, Version},
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::{TokioExecutor, TokioTimer},
};

use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::forward::body::{DeferredBody, RelayBody, RequestBodySlot};
use crate::forward::headers::{prepare_request_headers, strip_hop_by_hop, UpstreamHeaders};
use crate::forward::in_flight::{InFlightRequest, OutcomeDraft};
use crate::load_balancer::Upstream;
use crate::observability::OutcomeSink;
use crate::resilience::{Deadline, RetryPolicy};
use crate::routing::{rewrite_path, Route};
use crate::state::RouteMatch;

/// Per-request facts gathered by the front-end.
#[derive(Debug, Clone, Default)]
pub struct ForwardContext {
    pub request_id: Option<String>,
    pub client_addr: Option<SocketAddr>,
}

/// Client pool and retry settings.
#[derive(Debug, Clone, Copy)]
pub struct EngineSettings {
    pub connect_timeout: Duration,
    pub pool_idle_timeout: Duration,
    pub pool_max_idle_per_host: usize,
    pub retry: RetryPolicy,
}

impl EngineSettings {
    pub fn from_config(config: &GatewayConfig) -> Self {
        Self {
            connect_timeout: Duration::from_millis(config.timeouts.connect_ms),
            pool_idle_timeout: Duration::from_millis(config.timeouts.pool_idle_ms),
            pool_max_idle_per_host: config.timeouts.pool_max_idle_per_host,
            retry: RetryPolicy::new(config.retries.enabled),
        }
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self::from_config(&GatewayConfig::default())
    }
}

/// Forwards requests to upstreams. Cheap to clone; clones share the pool.
#[derive(Clone)]
pub struct ForwardingEngine {
    client: Client<HttpConnector, DeferredBody>,
    retry: RetryPolicy,
    sink: Arc<dyn OutcomeSink>,
}

impl ForwardingEngine {
    pub fn new(settings: &EngineSettings, sink: Arc<dyn OutcomeSink>) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_nodelay(true);
        connector.set_connect_timeout(Some(settings.connect_timeout));

        let client = Client::builder(TokioExecutor::new())
            .pool_idle_timeout(settings.pool_idle_timeout)
            .pool_max_idle_per_host(settings.pool_max_idle_per_host)
            .pool_timer(TokioTimer::new())
            .build(connector);

        Self {
            client,
            retry: settings.retry,
            sink,
        }
    }

    /// Forward `request` to the group of `matched`.
    ///
    /// Returns once the response head is in; the body keeps streaming (and
    /// keeps the upstream lease) until the client has read it or gone away.
    pub async fn forward(
        &self,
        request: Request<Body>,
        matched: &RouteMatch,
        ctx: &ForwardContext,
    ) -> Result<Response<Body>, GatewayError> {
        let route = &matched.route;
        let deadline = Deadline::after(route.timeout);
        let (parts, body) = request.into_parts();
        let draft = OutcomeDraft::new(ctx, &parts, route.prefix());

        let lease = match matched.group.select() {
            Ok(lease) => lease,
            Err(err) => {
                tracing::warn!(route = %route.prefix(), group = %matched.group.id(), "No healthy upstream");
                self.sink
                    .emit(draft.finish(None, Some(err.status().as_u16()), Some(err.tag()), 0, 0));
                return Err(err);
            }
        };
        let mut in_flight = InFlightRequest::new(lease, draft, self.sink.clone());

        let path = rewrite_path(&parts.uri, route.prefix(), route.strip_prefix);
        let slot = RequestBodySlot::new(body);

        let response = loop {
            let upstream = in_flight.upstream().clone();
            let attempt = in_flight.attempts();

            let result = match build_upstream_request(&parts, &upstream, &path, route, ctx, slot.attempt()) {
                Ok(outbound) => deadline
                    .run(self.client.request(outbound))
                    .await
                    .and_then(|res| res.map_err(classify_client_error)),
                Err(err) => Err(err),
            };

            match result {
                Ok(response) => break response,
                Err(err) => {
                    if self.retry.should_retry(attempt, &err, slot.is_replayable()) {
                        if let Ok(next) = matched.group.select_excluding(&upstream) {
                            tracing::warn!(
                                request_id = ctx.request_id.as_deref().unwrap_or("-"),
                                failed = %upstream.address(),
                                retry = %next.upstream().address(),
                                error = %err,
                                "Retrying on another upstream"
                            );
                            in_flight.retry_with(next);
                            continue;
                        }
                    }

                    if !matches!(err, GatewayError::ClientDisconnected) {
                        tracing::warn!(
                            request_id = ctx.request_id.as_deref().unwrap_or("-"),
                            upstream = %upstream.address(),
                            attempts = attempt,
                            error = %err,
                            "Forward failed"
                        );
                        in_flight.set_status(err.status().as_u16());
                    }
                    in_flight.fail(&err);
                    return Err(err);
                }
            }
        };

        in_flight.set_status(response.status().as_u16());
        tracing::debug!(
            request_id = ctx.request_id.as_deref().unwrap_or("-"),
            upstream = %in_flight.upstream().address(),
            status = response.status().as_u16(),
            "Upstream response head received"
        );

        let (mut head, incoming) = response.into_parts();
        strip_hop_by_hop(&mut head.headers);
        let body = RelayBody::new(incoming, in_flight, deadline);
        Ok(Response::from_parts(head, Body::new(body)))
    }
}

fn build_upstream_request(
    parts: &Parts,
    upstream: &Upstream,
    path: &str,
    route: &Route,
    ctx: &ForwardContext,
    body: DeferredBody,
) -> Result<Request<DeferredBody>, GatewayError> {
    let uri: Uri = format!("http://{}{}", upstream.authority(), path)
        .parse()
        .map_err(|e| GatewayError::Internal(format!("upstream uri: {e}")))?;

    let mut headers = parts.headers.clone();
    prepare_request_headers(
        &mut headers,
        &UpstreamHeaders {
            upstream: upstream.authority(),
            preserve_host: route.preserve_host,
            original_host: parts.headers.get(header::HOST),
            client_addr: ctx.client_addr,
            request_id: ctx.request_id.as_deref(),
        },
    );

    let mut request = Request::new(body);
    *request.method_mut() = parts.method.clone();
    *request.uri_mut() = uri;
    *request.version_mut() = Version::HTTP_11;
    *request.headers_mut() = headers;
    Ok(request)
}

fn classify_client_error(error: hyper_util::client::legacy::Error) -> GatewayError {
    if error.is_connect() {
        return GatewayError::UpstreamConnectionFailed {
            reason: error.to_string(),
        };
    }
    let reason = match error.source() {
        Some(source) => source.to_string(),
        None => error.to_string(),
    };
    match error.source().and_then(|s| s.downcast_ref::<hyper::Error>()) {
        Some(e) if e.is_parse() => GatewayError::MalformedUpstreamResponse { reason },
        Some(e) if e.is_user() => GatewayError::ClientDisconnected,
        _ => GatewayError::UpstreamConnectionFailed { reason },
    }
}
