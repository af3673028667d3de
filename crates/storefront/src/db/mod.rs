//! Catalog persistence for the storefront.
//!
//! # Database: `dewdrop_storefront`
//!
//! ## Tables
//!
//! - `products` - Catalog entries with skin type and concern tags
//! - `reviews` - Customer reviews, visible once `approved`
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p dewdrop-cli -- migrate storefront
//! ```

pub mod catalog;
pub mod memory;

use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use dewdrop_core::ProductId;

use crate::models::{Product, Review};

pub use catalog::PgCatalogStore;
pub use memory::MemoryCatalogStore;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),
}

/// Read access to the catalog.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Every published product with its approved-review aggregate.
    async fn products(&self) -> Result<Vec<Product>, RepositoryError>;

    /// Approved reviews for one product, in no particular order.
    async fn approved_reviews(&self, product_id: ProductId)
    -> Result<Vec<Review>, RepositoryError>;

    /// Check the store is reachable.
    async fn ping(&self) -> Result<(), RepositoryError>;
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
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
