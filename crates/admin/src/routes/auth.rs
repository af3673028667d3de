//! Authentication route handlers for admin.
//!
//! Operators sign in by pasting a token from the identity issuer. The token
//! is verified once and the resulting identity is kept in the server
//! session; the token itself is not stored.

use askama::Template;
use axum::{
    Form, Router,
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
};
use serde::Deserialize;
use tower_sessions::Session;

use crate::filters;
use crate::middleware::{OptionalAdminAuth, clear_current_admin, set_current_admin};
use crate::services::AuthError;
use crate::state::AppState;

/// Login page template.
#[derive(Template)]
#[template(path = "auth/login.html")]
struct LoginPageTemplate {
    error: Option<String>,
}

/// Login form input.
#[derive(Debug, Deserialize)]
pub struct LoginFormInput {
    pub token: String,
}

/// Build the auth router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(home))
        .route("/login", get(login_page).post(login))
        .route("/logout", post(logout))
}

fn render_login(status: StatusCode, error: Option<String>) -> Response {
    match (LoginPageTemplate { error }).render() {
        Ok(html) => (status, Html(html)).into_response(),
        Err(e) => {
            tracing::error!("Template render error: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Error rendering template").into_response()
        }
    }
}

/// GET /
async fn home() -> Redirect {
    Redirect::to("/orders")
}

/// Render the login page, or skip it when already signed in.
///
/// GET /login
async fn login_page(OptionalAdminAuth(admin): OptionalAdminAuth) -> Response {
    if admin.is_some() {
        return Redirect::to("/orders").into_response();
    }
    render_login(StatusCode::OK, None)
}

/// Verify the pasted token and start a session.
///
/// POST /login
async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(input): Form<LoginFormInput>,
) -> Response {
    let admin = match state.tokens().authenticate(input.token.trim()) {
        Ok(admin) => admin,
        Err(e) => {
            tracing::warn!(error = %e, "Login rejected");
            let message = match e {
                AuthError::Expired => "That token has expired.",
                AuthError::Forbidden(_) => "That account does not have admin access.",
                _ => "That token is not valid.",
            };
            return render_login(StatusCode::UNAUTHORIZED, Some(message.to_string()));
        }
    };

    if let Err(e) = set_current_admin(&session, &admin).await {
        tracing::error!(error = %e, "Failed to store session");
        return render_login(
            StatusCode::INTERNAL_SERVER_ERROR,
            Some("Could not start a session. Try again.".to_string()),
        );
    }

    tracing::info!(admin = %admin.email, role = %admin.role, "Operator signed in");
    Redirect::to("/orders").into_response()
}

/// Logout and clear session.
///
/// POST /logout
async fn logout(session: Session) -> impl IntoResponse {
    if let Err(e) = clear_current_admin(&session).await {
        tracing::warn!(error = %e, "Failed to clear session");
    }
    Redirect::to("/login")
}
