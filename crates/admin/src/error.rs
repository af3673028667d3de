//! Unified error handling for admin.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::{OrderError, PaymentError};

/// Application-level error type for the back-office.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Order operation failed.
    #[error(transparent)]
    Order(#[from] OrderError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// User lacks permission.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Order(err) => match err {
                OrderError::NotFound => StatusCode::NOT_FOUND,
                OrderError::Transition(_) => StatusCode::UNPROCESSABLE_ENTITY,
                OrderError::RefundRejected(_) => StatusCode::BAD_REQUEST,
                OrderError::RefundInProgress | OrderError::Conflict => StatusCode::CONFLICT,
                OrderError::Payment(_) => StatusCode::BAD_GATEWAY,
                OrderError::RefundNotRecorded { .. } | OrderError::Repository(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
        }
    }

    /// Message safe to show to the operator.
    ///
    /// Internal details are replaced with a generic message; provider
    /// declines are passed through verbatim.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self {
            Self::Database(_) | Self::Internal(_) => "Internal server error".to_string(),
            Self::Order(err) => match err {
                OrderError::Repository(_) => "Internal server error".to_string(),
                OrderError::Payment(PaymentError::Declined(message)) => message.clone(),
                OrderError::Payment(_) => "Payment provider error".to_string(),
                OrderError::RefundNotRecorded {
                    provider_refund_id, ..
                } => format!(
                    "The refund was processed by the payment provider but could not be \
                     saved. Reference: {provider_refund_id}"
                ),
                _ => err.to_string(),
            },
            _ => self.to_string(),
        }
    }

    /// Whether this error should be reported to Sentry.
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        self.status().is_server_error()
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log server errors with Sentry
        if self.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Admin request error"
            );
        }

        let body = json!({
            "success": false,
            "message": self.public_message(),
        });

        (self.status(), Json(body)).into_response()
    }
}
