//! HTTP server setup.
//!
//! # Responsibilities
//! - Build the axum router: one fallback handler, every method and path
//! - Wire up middleware (request id, tracing)
//! - Serve on a bound listener until the shutdown signal, then drain

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    response::{IntoResponse, Response},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::forward::ForwardContext;
use crate::gateway::Gateway;

/// Application state injected into the handler.
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<Gateway>,
}

/// HTTP front-end of the gateway.
pub struct GatewayServer {
    router: Router,
}

impl GatewayServer {
    pub fn new(gateway: Arc<Gateway>) -> Self {
        let router = Self::build_router(AppState { gateway });
        Self { router }
    }

    fn build_router(state: AppState) -> Router {
        Router::new()
            .fallback(proxy_handler)
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::x_request_id()),
            )
    }

    /// The assembled router, for embedding or in-process tests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve until `shutdown` fires, then stop accepting and drain.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self
            .router
            .into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server draining");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let ctx = ForwardContext::from_request(&request);

    tracing::debug!(
        request_id = ctx.request_id.as_deref().unwrap_or("-"),
        method = %request.method(),
        path = %request.uri().path(),
        "Proxying request"
    );

    match state.gateway.handle(request, &ctx).await {
        Ok(response) => response,
        Err(err) => err.into_response(),
    }
}
