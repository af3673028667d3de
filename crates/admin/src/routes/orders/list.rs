//! Orders list page handler.

use askama::Template;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use tower_sessions::Session;
use tracing::instrument;

use crate::{
    filters,
    middleware::{RequireAdminAuth, take_flash},
    models::{Flash, StatisticsRange},
    state::AppState,
};

use super::types::{
    AdminUserView, OrderTableView, OrdersQuery, PaginationView, SelectOption, StatsView,
    payment_filter_options, status_filter_options,
};

/// Orders list page template.
#[derive(Template)]
#[template(path = "orders/index.html")]
pub struct OrdersIndexTemplate {
    pub admin_user: AdminUserView,
    pub current_path: String,
    pub flash: Option<Flash>,
    /// Statistics cards; `None` when they could not be loaded.
    pub stats: Option<StatsView>,
    pub status_options: Vec<SelectOption>,
    pub payment_options: Vec<SelectOption>,
    pub search_value: String,
    pub orders: Vec<OrderTableView>,
    pub pagination: Option<PaginationView>,
    /// Shown in place of the table when the listing failed.
    pub error: Option<String>,
}

/// Orders list page handler.
#[instrument(skip(admin, state, session, query))]
pub async fn index(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<OrdersQuery>,
) -> Response {
    let flash = take_flash(&session).await;

    let stats = match state.orders().statistics(&StatisticsRange::default()).await {
        Ok(stats) => Some(StatsView::from(&stats)),
        Err(e) => {
            tracing::error!(error = %e, "Failed to fetch order statistics");
            None
        }
    };

    let filter = query.filter();
    let page = query.page_request();

    let (selected_status, selected_payment) = filter
        .as_ref()
        .map(|f| (f.status, f.payment_status))
        .unwrap_or_default();

    let (orders, pagination, error) = match (filter, page) {
        (Ok(filter), Ok(page)) => match state.orders().list(&filter, page).await {
            Ok(result) => (
                result.orders.iter().map(OrderTableView::from).collect(),
                Some(PaginationView::new(
                    &result.pagination,
                    &query.preserve_params(),
                )),
                None,
            ),
            Err(e) => {
                tracing::error!(error = %e, "Failed to fetch orders");
                (vec![], None, Some("Failed to fetch orders".to_string()))
            }
        },
        (Err(e), _) | (_, Err(e)) => (vec![], None, Some(e.public_message())),
    };

    let template = OrdersIndexTemplate {
        admin_user: AdminUserView::from(&admin),
        current_path: "/orders".to_string(),
        flash,
        stats,
        status_options: status_filter_options(selected_status),
        payment_options: payment_filter_options(selected_payment),
        search_value: query.search.clone().unwrap_or_default(),
        orders,
        pagination,
        error,
    };

    match template.render() {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            tracing::error!("Template render error: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
        }
    }
}
