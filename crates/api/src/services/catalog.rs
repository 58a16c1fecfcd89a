//! Catalog service: products and their reviews.

use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tracing::instrument;

use bazaar_core::ProductId;

use crate::db::{CatalogStore, RepositoryError};
use crate::models::{NewProduct, NewReview, Product, Review};

/// Errors that can occur during catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// No product has this id.
    #[error("product {0} not found")]
    ProductNotFound(ProductId),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Catalog service.
#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn CatalogStore>,
}

impl CatalogService {
    /// Create a new catalog service.
    #[must_use]
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        Self { store }
    }

    /// All products, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the store fails.
    #[instrument(skip(self))]
    pub async fn list_products(&self) -> Result<Vec<Product>, CatalogError> {
        Ok(self.store.list_products().await?)
    }

    /// A single product.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::ProductNotFound` if the id is unknown.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn get_product(&self, id: ProductId) -> Result<Product, CatalogError> {
        self.store
            .get_product(id)
            .await?
            .ok_or(CatalogError::ProductNotFound(id))
    }

    /// Add a product to the catalog.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the store fails.
    #[instrument(skip(self, product), fields(name = %product.name))]
    pub async fn create_product(&self, product: NewProduct) -> Result<Product, CatalogError> {
        Ok(self.store.create_product(product).await?)
    }

    /// Append a review to a product.
    ///
    /// Returns the product's reviews including the new one.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::ProductNotFound` if the id is unknown.
    #[instrument(skip(self, review), fields(product_id = %id, rating = %review.rating))]
    pub async fn add_review(
        &self,
        id: ProductId,
        review: NewReview,
    ) -> Result<Vec<Review>, CatalogError> {
        let reviews = self
            .store
            .append_review(id, review.into_review(Utc::now()))
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => CatalogError::ProductNotFound(id),
                other => CatalogError::Repository(other),
            })?;

        tracing::info!(review_count = reviews.len(), "Review added");
        Ok(reviews)
    }

    /// Reviews of a product in submission order.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::ProductNotFound` if the id is unknown.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn list_reviews(&self, id: ProductId) -> Result<Vec<Review>, CatalogError> {
        self.store
            .list_reviews(id)
            .await?
            .ok_or(CatalogError::ProductNotFound(id))
    }

    /// Check that the catalog store is reachable.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if it is not.
    pub async fn ping(&self) -> Result<(), CatalogError> {
        Ok(self.store.ping().await?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::MemoryCatalogStore;
    use rust_decimal::Decimal;

    fn service() -> CatalogService {
        CatalogService::new(Arc::new(MemoryCatalogStore::new()))
    }

    async fn create(service: &CatalogService, name: &str) -> Product {
        service
            .create_product(NewProduct::parse(name, "desc", Decimal::new(999, 2), None).unwrap())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_get_unknown_product() {
        let id = ProductId::generate();
        let err = service().get_product(id).await.unwrap_err();
        assert!(matches!(err, CatalogError::ProductNotFound(found) if found == id));
    }

    #[tokio::test]
    async fn test_reviews_append_in_order() {
        let service = service();
        let product = create(&service, "Pineapple").await;

        service
            .add_review(product.id, NewReview::parse("Ana", 5, "Lovely").unwrap())
            .await
            .unwrap();
        let before = service.list_reviews(product.id).await.unwrap();

        let after = service
            .add_review(product.id, NewReview::parse("Ben", 2, "Sour").unwrap())
            .await
            .unwrap();

        assert_eq!(after.len(), 2);
        assert_eq!(after.first(), before.first());
        assert_eq!(after.last().map(|r| r.name.as_str()), Some("Ben"));
        assert_eq!(service.list_reviews(product.id).await.unwrap(), after);
    }

    #[tokio::test]
    async fn test_review_unknown_product() {
        let service = service();
        let id = ProductId::generate();
        let err = service
            .add_review(id, NewReview::parse("Ana", 5, "Lovely").unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::ProductNotFound(_)));
        assert!(matches!(
            service.list_reviews(id).await.unwrap_err(),
            CatalogError::ProductNotFound(_)
        ));
    }
}
