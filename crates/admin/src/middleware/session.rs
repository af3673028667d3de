//! Session middleware configuration for admin.
//!
//! Production uses the `PostgreSQL` store from `tower-sessions-sqlx-store`
//! (table `tower_sessions.session`, created by `dewdrop-cli migrate admin`).
//! Cookies are SameSite=Strict and expire after 12 hours of inactivity.

use tower_sessions::{Expiry, SessionManagerLayer, SessionStore};

/// Session cookie name for admin.
pub const SESSION_COOKIE_NAME: &str = "dewdrop_admin_session";

/// Inactivity expiry in seconds. Matches the default operator token lifetime.
const SESSION_EXPIRY_SECONDS: i64 = 12 * 60 * 60;

/// Create the session layer over `store`.
///
/// `is_secure` sets the `Secure` cookie flag; pass `true` when served over
/// HTTPS.
#[must_use]
pub fn create_session_layer<S>(store: S, is_secure: bool) -> SessionManagerLayer<S>
where
    S: SessionStore + Clone,
{
    SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(is_secure)
        .with_same_site(tower_sessions::cookie::SameSite::Strict)
        .with_http_only(true)
        .with_path("/")
}
