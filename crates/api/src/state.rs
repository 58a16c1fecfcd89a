//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::ApiConfig;
use crate::db::{
    CartStore, CatalogStore, MemoryCartStore, MemoryCatalogStore, PgCartStore, PgCatalogStore,
};
use crate::services::{CartService, CatalogService, PaymentProcessor, StubPaymentProcessor};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// configuration and the catalog and cart services.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ApiConfig,
    catalog: CatalogService,
    carts: CartService,
}

impl AppState {
    /// Create application state over the given stores.
    #[must_use]
    pub fn new(
        config: ApiConfig,
        catalog_store: Arc<dyn CatalogStore>,
        cart_store: Arc<dyn CartStore>,
        payments: Arc<dyn PaymentProcessor>,
    ) -> Self {
        let catalog = CatalogService::new(Arc::clone(&catalog_store));
        let carts = CartService::new(cart_store, catalog_store, payments);

        Self {
            inner: Arc::new(AppStateInner {
                config,
                catalog,
                carts,
            }),
        }
    }

    /// State backed by `PostgreSQL`.
    #[must_use]
    pub fn postgres(config: ApiConfig, pool: PgPool) -> Self {
        Self::new(
            config,
            Arc::new(PgCatalogStore::new(pool.clone())),
            Arc::new(PgCartStore::new(pool)),
            Arc::new(StubPaymentProcessor),
        )
    }

    /// State backed by fresh in-memory stores.
    #[must_use]
    pub fn in_memory(config: ApiConfig) -> Self {
        Self::new(
            config,
            Arc::new(MemoryCatalogStore::new()),
            Arc::new(MemoryCartStore::new()),
            Arc::new(StubPaymentProcessor),
        )
    }

    /// Get a reference to the API configuration.
    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.inner.config
    }

    /// Get a reference to the catalog service.
    #[must_use]
    pub fn catalog(&self) -> &CatalogService {
        &self.inner.catalog
    }

    /// Get a reference to the cart service.
    #[must_use]
    pub fn carts(&self) -> &CartService {
        &self.inner.carts
    }
}
