//! Product catalog with a cached snapshot.
//!
//! The whole published catalog is small, so it is loaded once, kept in a
//! `moka` cache (5-minute TTL), and filtered and sorted in memory per
//! request.

use std::cmp::Ordering;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use rust_decimal::Decimal;
use tracing::instrument;

use dewdrop_core::ProductId;

use crate::db::{CatalogStore, RepositoryError};
use crate::models::{Concern, Product, Review, SkinType};

/// How long a catalog snapshot is served before it is reloaded.
pub const CATALOG_TTL: Duration = Duration::from_secs(300);

/// Cache key for catalog data.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
enum CacheKey {
    Products,
}

/// Product listing order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ProductSort {
    /// Merchandising position.
    #[default]
    Featured,
    PriceAsc,
    PriceDesc,
    /// Highest rated first, more reviews breaking ties.
    Rating,
    Newest,
}

impl ProductSort {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Featured => "featured",
            Self::PriceAsc => "price_asc",
            Self::PriceDesc => "price_desc",
            Self::Rating => "rating",
            Self::Newest => "newest",
        }
    }

    fn compare(self, a: &Product, b: &Product) -> Ordering {
        let by_position = || a.position.cmp(&b.position).then_with(|| a.id.cmp(&b.id));
        match self {
            Self::Featured => by_position(),
            Self::PriceAsc => a.price.cmp(&b.price).then_with(by_position),
            Self::PriceDesc => b.price.cmp(&a.price).then_with(by_position),
            Self::Rating => b
                .rating
                .total_cmp(&a.rating)
                .then_with(|| b.review_count.cmp(&a.review_count))
                .then_with(by_position),
            Self::Newest => b
                .created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id)),
        }
    }
}

impl FromStr for ProductSort {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "featured" => Ok(Self::Featured),
            "price_asc" => Ok(Self::PriceAsc),
            "price_desc" => Ok(Self::PriceDesc),
            "rating" => Ok(Self::Rating),
            "newest" => Ok(Self::Newest),
            other => Err(format!("unknown sort: {other}")),
        }
    }
}

/// Catalog filters. Every `Some` field must match.
#[derive(Debug, Clone, Default)]
pub struct ProductQuery {
    pub category: Option<String>,
    pub concern: Option<Concern>,
    pub skin_type: Option<SkinType>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub in_stock: Option<bool>,
    /// Case-insensitive substring over name, tagline, description, category.
    pub search: Option<String>,
    pub sort: ProductSort,
}

impl ProductQuery {
    /// Whether `product` satisfies every supplied filter.
    #[must_use]
    pub fn matches(&self, product: &Product) -> bool {
        if let Some(category) = &self.category
            && !product.category.eq_ignore_ascii_case(category)
        {
            return false;
        }
        if self.concern.is_some_and(|c| !product.targets(c)) {
            return false;
        }
        if self.skin_type.is_some_and(|t| !product.suits_skin_type(t)) {
            return false;
        }
        if self.min_price.is_some_and(|min| product.price < min) {
            return false;
        }
        if self.max_price.is_some_and(|max| product.price > max) {
            return false;
        }
        if self.in_stock.is_some_and(|in_stock| product.in_stock != in_stock) {
            return false;
        }
        if let Some(term) = &self.search {
            let term = term.to_lowercase();
            let found = [
                Some(product.name.as_str()),
                product.tagline.as_deref(),
                Some(product.description.as_str()),
                Some(product.category.as_str()),
            ]
            .into_iter()
            .flatten()
            .any(|field| field.to_lowercase().contains(&term));
            if !found {
                return false;
            }
        }
        true
    }
}

/// Filter and sort a catalog snapshot.
#[must_use]
pub fn search_products(products: &[Product], query: &ProductQuery) -> Vec<Product> {
    let mut matched: Vec<Product> = products
        .iter()
        .filter(|p| query.matches(p))
        .cloned()
        .collect();
    matched.sort_by(|a, b| query.sort.compare(a, b));
    matched
}

/// Catalog service: cached product snapshot plus review lookups.
#[derive(Clone)]
pub struct Catalog {
    store: Arc<dyn CatalogStore>,
    cache: Cache<CacheKey, Arc<Vec<Product>>>,
}

impl Catalog {
    #[must_use]
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        Self::with_ttl(store, CATALOG_TTL)
    }

    #[must_use]
    pub fn with_ttl(store: Arc<dyn CatalogStore>, ttl: Duration) -> Self {
        let cache = Cache::builder().max_capacity(1).time_to_live(ttl).build();
        Self { store, cache }
    }

    /// The current catalog snapshot, loading it on a cache miss.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the store cannot be read.
    pub async fn snapshot(&self) -> Result<Arc<Vec<Product>>, RepositoryError> {
        if let Some(products) = self.cache.get(&CacheKey::Products).await {
            return Ok(products);
        }

        let products = Arc::new(self.store.products().await?);
        tracing::debug!(count = products.len(), "Catalog snapshot loaded");
        self.cache
            .insert(CacheKey::Products, Arc::clone(&products))
            .await;
        Ok(products)
    }

    /// Products matching `query`, in its sort order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the store cannot be read.
    #[instrument(skip(self))]
    pub async fn search(&self, query: &ProductQuery) -> Result<Vec<Product>, RepositoryError> {
        let snapshot = self.snapshot().await?;
        Ok(search_products(&snapshot, query))
    }

    /// Look up a product by slug.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the store cannot be read.
    pub async fn product(&self, slug: &str) -> Result<Option<Product>, RepositoryError> {
        let snapshot = self.snapshot().await?;
        Ok(snapshot.iter().find(|p| p.slug == slug).cloned())
    }

    /// Approved reviews for a product, read straight from the store.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the store cannot be read.
    pub async fn reviews(&self, product_id: ProductId) -> Result<Vec<Review>, RepositoryError> {
        self.store.approved_reviews(product_id).await
    }

    /// Drop the cached snapshot so the next read reloads it.
    pub async fn invalidate(&self) {
        self.cache.invalidate_all();
        self.cache.run_pending_tasks().await;
    }

    /// Check the store is reachable.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the store cannot be reached.
    pub async fn ping(&self) -> Result<(), RepositoryError> {
        self.store.ping().await
    }
}
