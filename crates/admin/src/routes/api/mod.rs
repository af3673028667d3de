//! JSON API for the back-office.
//!
//! Every response uses the same envelope: `{ success, message?, data }` on
//! success and `{ success: false, message }` on failure.

pub mod orders;

use axum::{
    Json, Router,
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use serde::Serialize;

use crate::state::AppState;

/// Success envelope.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub const fn ok(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data,
        }
    }

    pub fn with_message(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

/// Build the API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/admin/orders", get(orders::index))
        .route("/api/admin/orders/statistics", get(orders::statistics))
        .route("/api/admin/orders/{id}", get(orders::show))
        .route("/api/admin/orders/{id}/status", put(orders::update_status))
        .route("/api/admin/orders/{id}/refund", post(orders::refund))
}
