//! HTTP middleware for admin.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors, transactions)
//! 2. `TraceLayer` (request span with status and latency)
//! 3. Request ID (correlation id on span, Sentry scope, and response)
//! 4. Security headers
//! 5. Session layer (tower-sessions)
//!
//! Authentication is an extractor ([`RequireAdminAuth`]) rather than a
//! layer, so the health endpoints stay public.

pub mod auth;
pub mod request_id;
pub mod security_headers;
pub mod session;

pub use auth::{
    OptionalAdminAuth, RequireAdminAuth, clear_current_admin, set_current_admin, set_flash,
    take_flash,
};
pub use request_id::request_id_middleware;
pub use security_headers::security_headers_middleware;
pub use session::create_session_layer;
