//! In-memory catalog store for tests and local demos.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use dewdrop_core::ProductId;

use super::{CatalogStore, RepositoryError};
use crate::models::{Product, Review};

/// Catalog held in vectors. Counts product loads so cache behaviour can be
/// observed, and can be made unavailable on demand.
#[derive(Debug, Default)]
pub struct MemoryCatalogStore {
    products: RwLock<Vec<Product>>,
    reviews: RwLock<Vec<Review>>,
    product_loads: AtomicUsize,
    unavailable: AtomicBool,
}

impl MemoryCatalogStore {
    #[must_use]
    pub fn new(products: Vec<Product>, reviews: Vec<Review>) -> Self {
        Self {
            products: RwLock::new(products),
            reviews: RwLock::new(reviews),
            ..Self::default()
        }
    }

    /// Replace the product list.
    pub async fn set_products(&self, products: Vec<Product>) {
        *self.products.write().await = products;
    }

    /// How many times [`CatalogStore::products`] has been called.
    #[must_use]
    pub fn product_loads(&self) -> usize {
        self.product_loads.load(Ordering::SeqCst)
    }

    /// Make every subsequent read fail with a database error.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), RepositoryError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(RepositoryError::Database(sqlx::Error::PoolClosed));
        }
        Ok(())
    }
}

#[async_trait]
impl CatalogStore for MemoryCatalogStore {
    async fn products(&self) -> Result<Vec<Product>, RepositoryError> {
        self.check_available()?;
        self.product_loads.fetch_add(1, Ordering::SeqCst);
        Ok(self.products.read().await.clone())
    }

    async fn approved_reviews(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<Review>, RepositoryError> {
        self.check_available()?;
        Ok(self
            .reviews
            .read()
            .await
            .iter()
            .filter(|review| review.product_id == product_id)
            .cloned()
            .collect())
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        self.check_available()
    }
}
