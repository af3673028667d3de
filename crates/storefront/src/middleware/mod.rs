//! HTTP middleware for the storefront.

pub mod rate_limit;
pub mod request_id;
pub mod security_headers;

pub use rate_limit::{RateLimiterLayer, api_rate_limiter};
pub use request_id::{REQUEST_ID_HEADER, request_id_middleware};
pub use security_headers::security_headers_middleware;
