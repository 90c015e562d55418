//! Streaming body adapters.
//!
//! Both directions stream frame by frame as hyper pulls them, so memory use
//! is bounded by a frame regardless of payload size.
//!
//! - [`RequestBodySlot`] / [`DeferredBody`]: the client's request body is
//!   handed to hyper lazily. If an attempt fails before hyper ever polled
//!   the body, the body is still in the slot and the attempt can be retried.
//! - [`RelayBody`]: the upstream response body, relayed under the request
//!   deadline while counting bytes into the in-flight record.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use axum::body::{Body, Bytes};
use http_body::{Body as HttpBody, Frame, SizeHint};
use hyper::body::Incoming;
use tokio::time::Sleep;

use crate::error::GatewayError;
use crate::forward::in_flight::InFlightRequest;
use crate::resilience::Deadline;

/// Holds the client request body until an attempt starts sending it.
pub struct RequestBodySlot {
    shared: Arc<Mutex<Option<Body>>>,
    empty: bool,
    size_hint: SizeHint,
}

impl RequestBodySlot {
    pub fn new(body: Body) -> Self {
        let empty = body.is_end_stream();
        let size_hint = body.size_hint();
        Self {
            shared: Arc::new(Mutex::new(Some(body))),
            empty,
            size_hint,
        }
    }

    /// Body for the next attempt.
    pub fn attempt(&self) -> DeferredBody {
        DeferredBody {
            shared: self.shared.clone(),
            inner: None,
            empty: self.empty,
            size_hint: self.size_hint.clone(),
        }
    }

    /// True while no attempt has started consuming the body.
    pub fn is_replayable(&self) -> bool {
        self.empty || lock(&self.shared).is_some()
    }
}

fn lock(shared: &Mutex<Option<Body>>) -> std::sync::MutexGuard<'_, Option<Body>> {
    shared.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Request body of one attempt; takes the real body on first poll.
pub struct DeferredBody {
    shared: Arc<Mutex<Option<Body>>>,
    inner: Option<Body>,
    empty: bool,
    size_hint: SizeHint,
}

impl HttpBody for DeferredBody {
    type Data = Bytes;
    type Error = axum::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.get_mut();
        if this.empty {
            return Poll::Ready(None);
        }
        if this.inner.is_none() {
            match lock(&this.shared).take() {
                Some(body) => this.inner = Some(body),
                None => return Poll::Ready(None),
            }
        }
        match this.inner.as_mut() {
            Some(body) => Pin::new(body).poll_frame(cx),
            None => Poll::Ready(None),
        }
    }

    fn is_end_stream(&self) -> bool {
        self.empty || self.inner.as_ref().is_some_and(|b| b.is_end_stream())
    }

    fn size_hint(&self) -> SizeHint {
        match &self.inner {
            Some(body) => body.size_hint(),
            None => self.size_hint.clone(),
        }
    }
}

/// Upstream response body relayed to the client.
pub struct RelayBody {
    inner: Incoming,
    timer: Pin<Box<Sleep>>,
    deadline: Deadline,
    in_flight: InFlightRequest,
    done: bool,
}

impl RelayBody {
    pub fn new(inner: Incoming, in_flight: InFlightRequest, deadline: Deadline) -> Self {
        Self {
            inner,
            timer: Box::pin(deadline.sleep()),
            deadline,
            in_flight,
            done: false,
        }
    }

    fn abort(&mut self, error: GatewayError) -> Poll<Option<Result<Frame<Bytes>, GatewayError>>> {
        self.done = true;
        tracing::warn!(
            upstream = %self.in_flight.upstream().address(),
            error = %error,
            "Response stream aborted"
        );
        self.in_flight.fail(&error);
        Poll::Ready(Some(Err(error)))
    }
}

impl HttpBody for RelayBody {
    type Data = Bytes;
    type Error = GatewayError;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.get_mut();
        if this.done {
            return Poll::Ready(None);
        }

        // The deadline is checked first so a steadily streaming body cannot outrun it.
        if this.timer.as_mut().poll(cx).is_ready() {
            let error = this.deadline.expired_error();
            return this.abort(error);
        }

        match Pin::new(&mut this.inner).poll_frame(cx) {
            Poll::Ready(Some(Ok(frame))) => {
                if let Some(data) = frame.data_ref() {
                    this.in_flight.record_bytes(data.len());
                }
                Poll::Ready(Some(Ok(frame)))
            }
            Poll::Ready(Some(Err(e))) => this.abort(classify_body_error(&e)),
            Poll::Ready(None) => {
                this.done = true;
                this.in_flight.complete();
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }

    fn is_end_stream(&self) -> bool {
        self.done || self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}

impl Drop for RelayBody {
    fn drop(&mut self) {
        // Bodiless responses (HEAD, 204, 304) may never be polled.
        if !self.done && self.inner.is_end_stream() {
            self.in_flight.complete();
        }
    }
}

fn classify_body_error(error: &hyper::Error) -> GatewayError {
    if error.is_parse() {
        GatewayError::MalformedUpstreamResponse {
            reason: error.to_string(),
        }
    } else {
        GatewayError::UpstreamConnectionFailed {
            reason: error.to_string(),
        }
    }
}
