//! Order management pages.
//!
//! ```text
//! GET  /orders               - List with statistics, filters, pagination
//! GET  /orders/{id}          - Detail with status and refund forms
//! POST /orders/{id}/status   - Status form submission
//! POST /orders/{id}/refund   - Refund form submission
//! ```

mod detail;
mod list;
pub mod types;

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

pub use detail::{OrderShowTemplate, refund, show, update_status};
pub use list::{OrdersIndexTemplate, index};
pub use types::{OrderDetailView, OrderTableView, OrdersQuery, StatisticsQuery};

/// Build the order pages router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/orders", get(index))
        .route("/orders/{id}", get(show))
        .route("/orders/{id}/status", post(update_status))
        .route("/orders/{id}/refund", post(refund))
}
