//! Authentication extractors for admin.
//!
//! API clients send `Authorization: Bearer <token>`. HTML pages use the
//! identity stored in the session at login. Either way the handler sees a
//! verified [`CurrentAdmin`].

use axum::{
    Json,
    extract::{FromRef, FromRequestParts},
    http::{HeaderMap, StatusCode, header::AUTHORIZATION, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use serde_json::json;
use tower_sessions::Session;

use crate::models::{CurrentAdmin, Flash, session_keys};
use crate::services::AuthError;
use crate::state::AppState;

/// Path of the login page.
pub const LOGIN_PATH: &str = "/login";

/// Extractor that requires operator authentication.
///
/// If the operator is not logged in, returns a redirect to the login page
/// for HTML requests, or 401 Unauthorized for API requests.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireAdminAuth(admin): RequireAdminAuth,
/// ) -> impl IntoResponse {
///     format!("Hello, {}!", admin.name)
/// }
/// ```
pub struct RequireAdminAuth(pub CurrentAdmin);

/// Error returned when operator authentication fails.
#[derive(Debug)]
pub enum AdminAuthRejection {
    /// Redirect to login page (for HTML requests).
    RedirectToLogin,
    /// Unauthorized response (for API requests).
    Unauthorized(&'static str),
    /// Authenticated, but not a staff role.
    Forbidden,
}

impl AdminAuthRejection {
    fn from_auth_error(error: &AuthError) -> Self {
        match error {
            AuthError::Forbidden(_) => Self::Forbidden,
            AuthError::Expired => Self::Unauthorized("Token has expired"),
            _ => Self::Unauthorized("Invalid token"),
        }
    }
}

impl IntoResponse for AdminAuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin => Redirect::to(LOGIN_PATH).into_response(),
            Self::Unauthorized(message) => (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "success": false, "message": message })),
            )
                .into_response(),
            Self::Forbidden => (
                StatusCode::FORBIDDEN,
                Json(json!({
                    "success": false,
                    "message": "Admin access required",
                })),
            )
                .into_response(),
        }
    }
}

/// Extract the token from an `Authorization: Bearer` header.
pub(crate) fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// Read the session identity, ignoring identities whose token has expired.
async fn session_admin(parts: &Parts) -> Option<CurrentAdmin> {
    let session = parts.extensions.get::<Session>()?;
    let admin: CurrentAdmin = session
        .get(session_keys::CURRENT_ADMIN)
        .await
        .ok()
        .flatten()?;

    (!admin.is_expired(chrono::Utc::now().timestamp())).then_some(admin)
}

impl<S> FromRequestParts<S> for RequireAdminAuth
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AdminAuthRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let is_api = parts.uri.path().starts_with("/api/");

        if let Some(token) = bearer_token(&parts.headers) {
            let state = AppState::from_ref(state);
            return state.tokens().authenticate(token).map(Self).map_err(|e| {
                tracing::debug!(error = %e, "Bearer token rejected");
                AdminAuthRejection::from_auth_error(&e)
            });
        }

        match session_admin(parts).await {
            Some(admin) => Ok(Self(admin)),
            None if is_api => Err(AdminAuthRejection::Unauthorized("Authentication required")),
            None => Err(AdminAuthRejection::RedirectToLogin),
        }
    }
}

/// Extractor that optionally gets the current operator from the session.
///
/// Unlike `RequireAdminAuth`, this does not reject the request if the
/// operator is not logged in.
pub struct OptionalAdminAuth(pub Option<CurrentAdmin>);

impl<S> FromRequestParts<S> for OptionalAdminAuth
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(session_admin(parts).await))
    }
}

/// Helper to set the current operator in the session.
///
/// The session id is cycled first so a pre-login id cannot be reused.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_admin(
    session: &Session,
    admin: &CurrentAdmin,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(session_keys::CURRENT_ADMIN, admin).await
}

/// Helper to clear the session (logout).
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_admin(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.flush().await
}

/// Queue a notice for the next page render.
pub async fn set_flash(session: &Session, flash: Flash) {
    if let Err(e) = session.insert(session_keys::FLASH, flash).await {
        tracing::warn!(error = %e, "Failed to store flash message");
    }
}

/// Take the pending notice, if any.
pub async fn take_flash(session: &Session) -> Option<Flash> {
    session
        .remove::<Flash>(session_keys::FLASH)
        .await
        .ok()
        .flatten()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token(&headers("Bearer abc.def")), Some("abc.def"));
        assert_eq!(bearer_token(&headers("bearer abc")), Some("abc"));
        assert_eq!(bearer_token(&headers("Basic abc")), None);
        assert_eq!(bearer_token(&headers("Bearer ")), None);
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }

    #[test]
    fn test_rejection_status_codes() {
        assert_eq!(
            AdminAuthRejection::Unauthorized("x").into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AdminAuthRejection::Forbidden.into_response().status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AdminAuthRejection::RedirectToLogin.into_response().status(),
            StatusCode::SEE_OTHER
        );
    }

    #[test]
    fn test_forbidden_role_maps_to_forbidden() {
        let rejection =
            AdminAuthRejection::from_auth_error(&AuthError::Forbidden(dewdrop_core::AdminRole::Customer));
        assert!(matches!(rejection, AdminAuthRejection::Forbidden));

        let rejection = AdminAuthRejection::from_auth_error(&AuthError::Expired);
        assert!(matches!(rejection, AdminAuthRejection::Unauthorized(_)));
    }
}
