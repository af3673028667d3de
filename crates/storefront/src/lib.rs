//! Dewdrop Storefront library.
//!
//! Catalog, reviews, and skin quiz JSON API. The binary in `main.rs` wires
//! this to `PostgreSQL`; tests drive it with an in-memory catalog store.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

pub use routes::app;
pub use state::AppState;
