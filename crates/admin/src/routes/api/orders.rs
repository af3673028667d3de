//! Order API handlers.

use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
};
use serde::Serialize;
use tracing::instrument;

use dewdrop_core::OrderId;

use super::ApiResponse;
use crate::error::AppError;
use crate::middleware::RequireAdminAuth;
use crate::models::{Order, OrderPage, OrderStatistics, OrderUpdate, RefundInput};
use crate::routes::orders::types::{OrdersQuery, StatisticsQuery};
use crate::services::OrderError;
use crate::state::AppState;

/// Parse a path segment as an order id. Anything else is an unknown order.
pub(crate) fn parse_order_id(raw: &str) -> Result<OrderId, AppError> {
    raw.trim()
        .parse::<i64>()
        .map(OrderId::new)
        .map_err(|_| OrderError::NotFound.into())
}

fn query_error(rejection: &QueryRejection) -> AppError {
    AppError::BadRequest(rejection.body_text())
}

fn body_error(rejection: &JsonRejection) -> AppError {
    AppError::BadRequest(rejection.body_text())
}

/// Statistics payload, wrapped so the envelope reads `data.statistics`.
#[derive(Debug, Serialize)]
pub struct StatisticsData {
    pub statistics: OrderStatistics,
}

/// `GET /api/admin/orders`
#[instrument(skip(_admin, state, query))]
pub async fn index(
    RequireAdminAuth(_admin): RequireAdminAuth,
    State(state): State<AppState>,
    query: Result<Query<OrdersQuery>, QueryRejection>,
) -> Result<ApiResponse<OrderPage>, AppError> {
    let Query(query) = query.map_err(|e| query_error(&e))?;
    let filter = query.filter()?;
    let page = query.page_request()?;

    let result = state.orders().list(&filter, page).await.map_err(|e| {
        tracing::error!(error = %e, "Failed to fetch orders");
        e
    })?;

    Ok(ApiResponse::ok(result))
}

/// `GET /api/admin/orders/statistics`
#[instrument(skip(_admin, state, query))]
pub async fn statistics(
    RequireAdminAuth(_admin): RequireAdminAuth,
    State(state): State<AppState>,
    query: Result<Query<StatisticsQuery>, QueryRejection>,
) -> Result<ApiResponse<StatisticsData>, AppError> {
    let Query(query) = query.map_err(|e| query_error(&e))?;
    let range = query.range()?;
    let statistics = state.orders().statistics(&range).await?;
    Ok(ApiResponse::ok(StatisticsData { statistics }))
}

/// `GET /api/admin/orders/{id}`
#[instrument(skip(_admin, state))]
pub async fn show(
    RequireAdminAuth(_admin): RequireAdminAuth,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<ApiResponse<Order>, AppError> {
    let order = state.orders().get(parse_order_id(&id)?).await?;
    Ok(ApiResponse::ok(order))
}

/// `PUT /api/admin/orders/{id}/status`
#[instrument(skip(admin, state, body), fields(actor = %admin.email))]
pub async fn update_status(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<OrderUpdate>, JsonRejection>,
) -> Result<ApiResponse<Order>, AppError> {
    let id = parse_order_id(&id)?;
    let Json(update) = body.map_err(|e| body_error(&e))?;
    let order = state.orders().update_status(id, &update, &admin).await?;
    Ok(ApiResponse::ok(order))
}

/// `POST /api/admin/orders/{id}/refund`
#[instrument(skip(admin, state, body), fields(actor = %admin.email))]
pub async fn refund(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<RefundInput>, JsonRejection>,
) -> Result<ApiResponse<Order>, AppError> {
    let id = parse_order_id(&id)?;
    let Json(input) = body.map_err(|e| body_error(&e))?;
    let outcome = state.orders().refund(id, &input, &admin).await?;
    Ok(ApiResponse::with_message(outcome.message(), outcome.order))
}
