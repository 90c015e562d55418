//! In-flight request accounting.
//!
//! An [`InFlightRequest`] exists from upstream selection until the response
//! body has been relayed (or abandoned). It owns the upstream lease, so the
//! connection count is released exactly once, and it emits exactly one
//! outcome record, whichever way the exchange ends.

use std::sync::Arc;

use axum::http::request::Parts;
use tokio::time::Instant;

use crate::error::GatewayError;
use crate::forward::ForwardContext;
use crate::load_balancer::{Upstream, UpstreamLease};
use crate::observability::{ForwardOutcome, OutcomeSink};

/// Request facts captured at admission.
#[derive(Debug, Clone)]
pub(crate) struct OutcomeDraft {
    request_id: Option<String>,
    method: String,
    path: String,
    route: String,
    started: Instant,
}

impl OutcomeDraft {
    pub(crate) fn new(ctx: &ForwardContext, parts: &Parts, route: &str) -> Self {
        Self {
            request_id: ctx.request_id.clone(),
            method: parts.method.to_string(),
            path: parts.uri.path().to_string(),
            route: route.to_string(),
            started: Instant::now(),
        }
    }

    pub(crate) fn finish(
        &self,
        upstream: Option<&Upstream>,
        status: Option<u16>,
        error: Option<&'static str>,
        bytes: u64,
        attempts: u32,
    ) -> ForwardOutcome {
        ForwardOutcome {
            request_id: self.request_id.clone(),
            method: self.method.clone(),
            path: self.path.clone(),
            route: self.route.clone(),
            upstream: upstream.map(|u| u.address().to_string()),
            status,
            error,
            latency: self.started.elapsed(),
            bytes,
            attempts,
        }
    }
}

/// One forwarded request, from selection to the last relayed byte.
pub struct InFlightRequest {
    lease: UpstreamLease,
    draft: OutcomeDraft,
    sink: Arc<dyn OutcomeSink>,
    attempts: u32,
    status: Option<u16>,
    bytes: u64,
    finished: bool,
}

impl InFlightRequest {
    pub(crate) fn new(lease: UpstreamLease, draft: OutcomeDraft, sink: Arc<dyn OutcomeSink>) -> Self {
        Self {
            lease,
            draft,
            sink,
            attempts: 1,
            status: None,
            bytes: 0,
            finished: false,
        }
    }

    pub fn upstream(&self) -> &Arc<Upstream> {
        self.lease.upstream()
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Move to another upstream; the previous lease is released here.
    pub(crate) fn retry_with(&mut self, lease: UpstreamLease) {
        self.lease = lease;
        self.attempts += 1;
    }

    pub(crate) fn set_status(&mut self, status: u16) {
        self.status = Some(status);
    }

    pub(crate) fn record_bytes(&mut self, n: usize) {
        self.bytes += n as u64;
    }

    pub(crate) fn complete(&mut self) {
        self.emit(None);
    }

    pub(crate) fn fail(&mut self, error: &GatewayError) {
        self.emit(Some(error.tag()));
    }

    fn emit(&mut self, error: Option<&'static str>) {
        if self.finished {
            return;
        }
        self.finished = true;
        let outcome = self.draft.finish(
            Some(self.lease.upstream()),
            self.status,
            error,
            self.bytes,
            self.attempts,
        );
        self.sink.emit(outcome);
    }
}

impl Drop for InFlightRequest {
    fn drop(&mut self) {
        if !self.finished {
            tracing::debug!(
                upstream = %self.lease.upstream().address(),
                path = %self.draft.path,
                "Client disconnected before the exchange finished"
            );
            self.emit(Some(GatewayError::ClientDisconnected.tag()));
        }
    }
}
