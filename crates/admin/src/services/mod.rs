//! Business logic services for the back-office.
//!
//! # Services
//!
//! - `auth` - Operator JWT verification and minting
//! - `locks` - Per-order refund locks
//! - `orders` - Listing, status transitions, refunds, statistics
//! - `payments` - Payment provider refund client

pub mod auth;
pub mod locks;
pub mod orders;
pub mod payments;

pub use auth::{AdminClaims, AuthError, TokenKeys};
pub use locks::{RefundGuard, RefundLocks};
pub use orders::{OrderError, OrderService, RefundOutcome};
pub use payments::{HttpPaymentGateway, PaymentError, PaymentGateway, ProviderRefund, RefundRequest};
