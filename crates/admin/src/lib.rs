//! Dewdrop Admin library.
//!
//! The order back-office as a library, so the router can be driven
//! in-process by tests and reused by the binary.
//!
//! # Security
//!
//! This crate holds HIGH PRIVILEGE access:
//! - Payment provider secret key (refunds move money)
//! - Customer PII (names, emails, addresses)
//!
//! Every route except `/health*` and `/login` requires a staff token.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod filters;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

pub use routes::app;
pub use state::AppState;
