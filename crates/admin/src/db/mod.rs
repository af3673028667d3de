//! Order persistence for the back-office.
//!
//! # Database: `dewdrop_admin`
//!
//! ## Tables
//!
//! - `orders` - Order header, money totals, statuses, customer snapshot
//! - `order_line_items` - Purchased lines, ordered by `position`
//! - `order_refunds` - Audit trail of provider refunds
//! - `tower_sessions.session` - Operator sessions (tower-sessions store)
//!
//! # Migrations
//!
//! Migrations are stored in `crates/admin/migrations/` and run via:
//! ```bash
//! cargo run -p dewdrop-cli -- migrate admin
//! ```
//!
//! Handlers never talk to a store directly; they go through
//! [`crate::services::orders::OrderService`], which holds an
//! `Arc<dyn OrderStore>`. [`PgOrderStore`] is the production store and
//! [`MemoryOrderStore`] backs tests and local demos.

pub mod memory;
pub mod orders;

use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use dewdrop_core::OrderId;

use crate::models::{
    NewRefund, Order, OrderChanges, OrderFilter, OrderStatistics, PageRequest, StatisticsRange,
};

pub use memory::MemoryOrderStore;
pub use orders::PgOrderStore;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// The row changed since it was read (version mismatch) or a
    /// constraint was violated.
    #[error("conflict: {0}")]
    Conflict(String),
}

/// Storage for orders.
///
/// Every write takes the version the caller read and fails with
/// [`RepositoryError::Conflict`] if the row has moved on since.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// One page of orders matching `filter`, newest first, plus the total
    /// number of matching orders.
    async fn list(
        &self,
        filter: &OrderFilter,
        page: PageRequest,
    ) -> Result<(Vec<Order>, u64), RepositoryError>;

    /// Load a single order with its items and refunds.
    async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError>;

    /// Write operator-editable fields.
    async fn update(
        &self,
        id: OrderId,
        expected_version: i32,
        changes: &OrderChanges,
    ) -> Result<Order, RepositoryError>;

    /// Record an executed refund and move the order to its post-refund
    /// statuses in one atomic step.
    async fn record_refund(
        &self,
        id: OrderId,
        expected_version: i32,
        refund: &NewRefund,
    ) -> Result<Order, RepositoryError>;

    /// Aggregate figures over orders created inside `range`.
    async fn statistics(&self, range: &StatisticsRange)
    -> Result<OrderStatistics, RepositoryError>;

    /// Check the store is reachable.
    async fn ping(&self) -> Result<(), RepositoryError>;
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
