//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::AdminConfig;
use crate::db::OrderStore;
use crate::services::{OrderService, PaymentGateway, TokenKeys};

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`. Holds no database handle directly; all
/// persistence goes through the `OrderService`'s store so the router can run
/// against an in-memory store in tests.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    base_url: String,
    tokens: TokenKeys,
    orders: OrderService,
}

impl AppState {
    /// Create application state from its parts.
    #[must_use]
    pub fn new(base_url: impl Into<String>, tokens: TokenKeys, orders: OrderService) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                base_url: base_url.into(),
                tokens,
                orders,
            }),
        }
    }

    /// Create application state for a configured deployment.
    #[must_use]
    pub fn from_config(
        config: &AdminConfig,
        store: Arc<dyn OrderStore>,
        payments: Arc<dyn PaymentGateway>,
    ) -> Self {
        Self::new(
            config.base_url.clone(),
            TokenKeys::from_secret(&config.jwt_secret),
            OrderService::new(store, payments),
        )
    }

    /// Public base URL of the back-office.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    /// Whether the back-office is served over HTTPS.
    #[must_use]
    pub fn is_https(&self) -> bool {
        self.inner.base_url.starts_with("https://")
    }

    /// Operator token keys.
    #[must_use]
    pub fn tokens(&self) -> &TokenKeys {
        &self.inner.tokens
    }

    /// Order operations.
    #[must_use]
    pub fn orders(&self) -> &OrderService {
        &self.inner.orders
    }
}
