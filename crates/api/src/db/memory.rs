//! In-memory stores.
//!
//! Used when `BAZAAR_STORE=memory` and by the HTTP tests. Data lives for the
//! lifetime of the process.
//!
//! Each cart sits behind its own mutex. The outer map lock is only held long
//! enough to find or insert the entry, so updates to different carts run in
//! parallel while updates to one cart are serialized.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, RwLock};

use bazaar_core::{CartId, ProductId};

use super::{
    CartMutation, CartStore, CartUpdate, CartUpdateError, CatalogStore, RepositoryError,
};
use super::products::duplicate_name;
use crate::models::{Cart, NewProduct, Product, Review};

/// In-memory product collection.
#[derive(Debug, Clone, Default)]
pub struct MemoryCatalogStore {
    products: Arc<RwLock<Vec<Product>>>,
}

impl MemoryCatalogStore {
    /// Create an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored products.
    pub async fn product_count(&self) -> usize {
        self.products.read().await.len()
    }
}

#[async_trait]
impl CatalogStore for MemoryCatalogStore {
    async fn list_products(&self) -> Result<Vec<Product>, RepositoryError> {
        Ok(self.products.read().await.clone())
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let products = self.products.read().await;
        Ok(products.iter().find(|p| p.id == id).cloned())
    }

    async fn create_product(&self, product: NewProduct) -> Result<Product, RepositoryError> {
        let mut products = self.products.write().await;
        if products.iter().any(|p| p.name == product.name) {
            return Err(RepositoryError::Conflict(duplicate_name(&product.name)));
        }

        let product = product.into_product(ProductId::generate(), Utc::now());
        products.push(product.clone());
        tracing::info!(product_id = %product.id, name = %product.name, "Product created");
        Ok(product)
    }

    async fn append_review(
        &self,
        id: ProductId,
        review: Review,
    ) -> Result<Vec<Review>, RepositoryError> {
        let mut products = self.products.write().await;
        let product = products
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(RepositoryError::NotFound)?;
        product.reviews.push(review);
        Ok(product.reviews.clone())
    }

    async fn list_reviews(&self, id: ProductId) -> Result<Option<Vec<Review>>, RepositoryError> {
        let products = self.products.read().await;
        Ok(products
            .iter()
            .find(|p| p.id == id)
            .map(|p| p.reviews.clone()))
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
}

/// In-memory cart collection.
#[derive(Debug, Clone, Default)]
pub struct MemoryCartStore {
    carts: Arc<RwLock<HashMap<CartId, Arc<Mutex<Cart>>>>>,
}

impl MemoryCartStore {
    /// Create an empty cart collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored carts.
    pub async fn cart_count(&self) -> usize {
        self.carts.read().await.len()
    }

    async fn entry(&self, id: CartId) -> Option<Arc<Mutex<Cart>>> {
        self.carts.read().await.get(&id).cloned()
    }
}

#[async_trait]
impl CartStore for MemoryCartStore {
    async fn get_or_create(&self, id: CartId) -> Result<Cart, RepositoryError> {
        let entry = match self.entry(id).await {
            Some(entry) => entry,
            None => {
                let mut carts = self.carts.write().await;
                Arc::clone(carts.entry(id).or_insert_with(|| {
                    tracing::debug!(cart_id = %id, "Cart created");
                    Arc::new(Mutex::new(Cart::new(id, Utc::now())))
                }))
            }
        };

        Ok(entry.lock().await.clone())
    }

    async fn find(&self, id: CartId) -> Result<Option<Cart>, RepositoryError> {
        match self.entry(id).await {
            Some(entry) => Ok(Some(entry.lock().await.clone())),
            None => Ok(None),
        }
    }

    async fn update(
        &self,
        id: CartId,
        mutation: CartMutation,
    ) -> Result<CartUpdate, CartUpdateError> {
        let entry = self.entry(id).await.ok_or(RepositoryError::NotFound)?;
        let mut stored = entry.lock().await;

        // Work on a copy so a rejected mutation leaves the stored cart untouched.
        let mut cart = stored.clone();
        let changed = mutation(&mut cart)?;
        if changed {
            *stored = cart.clone();
            tracing::debug!(cart_id = %id, version = cart.version, "Cart updated");
        }

        Ok(CartUpdate { cart, changed })
    }
}
