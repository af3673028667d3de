//! Application state shared across handlers.

use std::sync::Arc;

use crate::db::CatalogStore;
use crate::services::Catalog;

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    base_url: String,
    catalog: Catalog,
}

impl AppState {
    /// Create application state over a catalog store.
    #[must_use]
    pub fn new(base_url: impl Into<String>, store: Arc<dyn CatalogStore>) -> Self {
        Self::with_catalog(base_url, Catalog::new(store))
    }

    /// Create application state from an already-built catalog.
    #[must_use]
    pub fn with_catalog(base_url: impl Into<String>, catalog: Catalog) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                base_url: base_url.into(),
                catalog,
            }),
        }
    }

    /// Public base URL of the storefront.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.inner.catalog
    }
}
