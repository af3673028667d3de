//! HTTP route handlers for admin.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                          - Liveness
//! GET  /health/ready                    - Readiness (order store reachable)
//!
//! # Auth
//! GET  /login                           - Paste-a-token login page
//! POST /login                           - Verify token, start session
//! POST /logout                          - End session
//!
//! # Order pages
//! GET  /orders                          - List
//! GET  /orders/{id}                     - Detail
//! POST /orders/{id}/status              - Status form
//! POST /orders/{id}/refund              - Refund form
//!
//! # JSON API (bearer token)
//! GET  /api/admin/orders                - List
//! GET  /api/admin/orders/statistics     - Statistics
//! GET  /api/admin/orders/{id}           - Detail
//! PUT  /api/admin/orders/{id}/status    - Status transition
//! POST /api/admin/orders/{id}/refund    - Refund
//! ```

pub mod api;
pub mod auth;
pub mod orders;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    routing::get,
};
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tower_sessions::{SessionManagerLayer, SessionStore};
use tracing::Span;

use crate::middleware::{request_id_middleware, security_headers_middleware};
use crate::state::AppState;

/// All routes, without middleware.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .merge(auth::router())
        .merge(orders::router())
        .merge(api::router())
}

/// The complete application: routes, session, and the middleware stack.
///
/// Sentry layers are added by the binary, outside this.
pub fn app<S>(state: AppState, session_layer: SessionManagerLayer<S>) -> Router
where
    S: SessionStore + Clone,
{
    routes()
        .layer(session_layer)
        .layer(axum::middleware::from_fn(security_headers_middleware))
        .layer(axum::middleware::from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state)
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the order store is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match state.orders().ping().await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
