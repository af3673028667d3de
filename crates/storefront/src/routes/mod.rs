//! HTTP route handlers for the storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                        - Liveness
//! GET  /health/ready                  - Readiness (catalog store reachable)
//!
//! # JSON API (rate limited)
//! GET  /api/products                  - Filtered, sorted catalog
//! GET  /api/products/{slug}           - Product detail with rating summary
//! GET  /api/products/{slug}/reviews   - Filtered, sorted, paginated reviews
//! GET  /api/quiz                      - Quiz questions
//! POST /api/quiz                      - Quiz recommendations
//! ```

pub mod products;
pub mod quiz;
pub mod reviews;

use axum::{
    Json, Router,
    extract::{State, rejection::QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Serialize;
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tracing::Span;

use crate::error::AppError;
use crate::middleware::{RateLimiterLayer, request_id_middleware, security_headers_middleware};
use crate::state::AppState;

/// Public catalog data may be cached briefly by browsers and the CDN.
pub(crate) const CATALOG_CACHE_CONTROL: &str = "public, max-age=60";

/// Success envelope: `{ success: true, data }`.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub const fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

pub(crate) fn query_error(rejection: &QueryRejection) -> AppError {
    AppError::BadRequest(rejection.body_text())
}

/// The JSON API router.
pub fn api_router() -> Router<AppState> {
    Router::new()
        .route("/api/products", get(products::index))
        .route("/api/products/{slug}", get(products::show))
        .route("/api/products/{slug}/reviews", get(reviews::index))
        .route("/api/quiz", get(quiz::questions).post(quiz::submit))
}

/// The complete application with its middleware stack.
///
/// `rate_limiter` applies to `/api/*` only. Sentry layers are added by the
/// binary, outside this.
pub fn app(state: AppState, rate_limiter: Option<RateLimiterLayer>) -> Router {
    let api = match rate_limiter {
        Some(limiter) => api_router().layer(limiter),
        None => api_router(),
    };

    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .merge(api)
        .fallback(not_found)
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
async fn health() -> &'static str {
    "ok"
}

/// Readiness: 503 when the catalog store is unreachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match state.catalog().ping().await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

async fn not_found() -> AppError {
    AppError::NotFound("Resource".to_string())
}
