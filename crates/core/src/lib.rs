//! Dewdrop Core - Shared domain types.
//!
//! This crate provides the types shared by every Dewdrop component:
//! - `storefront` - Public catalog, reviews, and quiz API
//! - `admin` - Order back-office (statistics, status transitions, refunds)
//! - `cli` - Migrations, demo data, and operator tokens
//!
//! # Architecture
//!
//! The core crate contains only types and pure rules - no I/O, no database
//! access, no HTTP clients. Order lifecycle rules live here so that the
//! admin service, its templates, and its tests all agree on them.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, emails, money, and order/payment statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
