//! Metrics and health endpoint

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use prometheus::Registry;
use tracing::info;

use crate::metrics::encode;
use crate::Error;

/// Shared state for the HTTP handlers
#[derive(Clone)]
pub struct MetricsState {
    registry: Arc<Registry>,
}

/// Handler for GET /metrics
pub async fn metrics_handler(State(state): State<MetricsState>) -> Response {
    match encode(&state.registry) {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

/// Handler for GET /healthz
pub async fn health_handler() -> &'static str {
    "ok"
}

/// Router serving `/metrics` and `/healthz`
pub fn router(registry: Arc<Registry>) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/healthz", get(health_handler))
        .with_state(MetricsState { registry })
}

/// Serve the router on `addr` until the process exits
pub async fn serve(addr: SocketAddr, registry: Arc<Registry>) -> Result<(), Error> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| Error::bootstrap(format!("failed to bind metrics server on {addr}: {e}")))?;
    info!(%addr, "metrics server listening");
    axum::serve(listener, router(registry))
        .await
        .map_err(|e| Error::bootstrap(format!("metrics server failed: {e}")))
}
