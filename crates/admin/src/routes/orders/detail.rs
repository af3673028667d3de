//! Order detail page and its form handlers.

use askama::Template;
use axum::{
    Form,
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
};
use tower_sessions::Session;
use tracing::instrument;

use dewdrop_core::OrderId;

use crate::{
    error::AppError,
    filters,
    middleware::{RequireAdminAuth, set_flash, take_flash},
    models::{CurrentAdmin, Flash},
    routes::api::orders::parse_order_id,
    state::AppState,
};

use super::types::{AdminUserView, OrderDetailView, RefundFormInput, StatusFormInput};

/// Order detail page template.
#[derive(Template)]
#[template(path = "orders/show.html")]
pub struct OrderShowTemplate {
    pub admin_user: AdminUserView,
    pub current_path: String,
    pub flash: Option<Flash>,
    pub order: OrderDetailView,
}

fn order_path(id: OrderId) -> String {
    format!("/orders/{id}")
}

/// Load the order and render the detail page, or an error page.
async fn render_detail(
    state: &AppState,
    admin: &CurrentAdmin,
    id: OrderId,
    flash: Option<Flash>,
) -> Response {
    let order = match state.orders().get(id).await {
        Ok(order) => order,
        Err(e) => {
            let error = AppError::from(e);
            if error.is_server_error() {
                tracing::error!(order_id = %id, error = %error, "Failed to fetch order");
            }
            return (error.status(), error.public_message()).into_response();
        }
    };

    let template = OrderShowTemplate {
        admin_user: AdminUserView::from(admin),
        current_path: "/orders".to_string(),
        flash,
        order: OrderDetailView::from(&order),
    };

    match template.render() {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            tracing::error!("Template render error: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
        }
    }
}

/// Order detail page handler.
#[instrument(skip(admin, state, session))]
pub async fn show(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<String>,
) -> Response {
    let id = match parse_order_id(&id) {
        Ok(id) => id,
        Err(e) => return (e.status(), e.public_message()).into_response(),
    };
    let flash = take_flash(&session).await;
    render_detail(&state, &admin, id, flash).await
}

/// Status form handler.
///
/// On success, redirects back to the order with a notice. On failure,
/// re-renders the page with the error so the operator sees current state.
#[instrument(skip(admin, state, session, input), fields(actor = %admin.email))]
pub async fn update_status(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<String>,
    Form(input): Form<StatusFormInput>,
) -> Response {
    let id = match parse_order_id(&id) {
        Ok(id) => id,
        Err(e) => return (e.status(), e.public_message()).into_response(),
    };

    let result = match input.into_update() {
        Ok(update) => state
            .orders()
            .update_status(id, &update, &admin)
            .await
            .map_err(AppError::from),
        Err(e) => Err(e),
    };

    match result {
        Ok(order) => {
            set_flash(
                &session,
                Flash::success(format!("Order {} updated", order.display_number())),
            )
            .await;
            Redirect::to(&order_path(id)).into_response()
        }
        Err(e) => {
            tracing::warn!(order_id = %id, error = %e, "Order update rejected");
            render_detail(&state, &admin, id, Some(Flash::error(e.public_message()))).await
        }
    }
}

/// Refund form handler.
#[instrument(skip(admin, state, session, input), fields(actor = %admin.email))]
pub async fn refund(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<String>,
    Form(input): Form<RefundFormInput>,
) -> Response {
    let id = match parse_order_id(&id) {
        Ok(id) => id,
        Err(e) => return (e.status(), e.public_message()).into_response(),
    };

    let result = match input.into_input() {
        Ok(input) => state
            .orders()
            .refund(id, &input, &admin)
            .await
            .map_err(AppError::from),
        Err(e) => Err(e),
    };

    match result {
        Ok(outcome) => {
            set_flash(&session, Flash::success(outcome.message())).await;
            Redirect::to(&order_path(id)).into_response()
        }
        Err(e) => {
            if e.is_server_error() {
                tracing::error!(order_id = %id, error = %e, "Refund failed");
            }
            render_detail(&state, &admin, id, Some(Flash::error(e.public_message()))).await
        }
    }
}
