//! `PostgreSQL` product collection.
//!
//! Product names are unique (`product_name_key`); the CLI seed relies on it to
//! skip products that already exist.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::types::Json;

use bazaar_core::{Price, ProductId};

use super::{CatalogStore, RepositoryError};
use crate::models::{NewProduct, Product, Review};

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: ProductId,
    name: String,
    description: String,
    price: Price,
    image: Option<String>,
    reviews: Json<Vec<Review>>,
    created_at: DateTime<Utc>,
}

/// Conflict message for a product name that is already taken.
pub(super) fn duplicate_name(name: &str) -> String {
    format!("a product named {name:?} already exists")
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            description: row.description,
            price: row.price,
            image: row.image,
            reviews: row.reviews.0,
            created_at: row.created_at,
        }
    }
}

/// Product store backed by `shop.product`.
#[derive(Clone)]
pub struct PgCatalogStore {
    pool: PgPool,
}

impl PgCatalogStore {
    /// Create a new product store.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CatalogStore for PgCatalogStore {
    async fn list_products(&self) -> Result<Vec<Product>, RepositoryError> {
        let rows = sqlx::query_as::<_, ProductRow>(
            r"
            SELECT id, name, description, price, image, reviews, created_at
            FROM shop.product
            ORDER BY created_at ASC, id ASC
            ",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Product::from).collect())
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(
            r"
            SELECT id, name, description, price, image, reviews, created_at
            FROM shop.product
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Product::from))
    }

    async fn create_product(&self, product: NewProduct) -> Result<Product, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(
            r"
            INSERT INTO shop.product (id, name, description, price, image, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, name, description, price, image, reviews, created_at
            ",
        )
        .bind(ProductId::generate())
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price)
        .bind(product.image.as_deref())
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return RepositoryError::Conflict(duplicate_name(&product.name));
            }
            RepositoryError::Database(e)
        })?;

        tracing::info!(product_id = %row.id, name = %row.name, "Product created");
        Ok(row.into())
    }

    async fn append_review(
        &self,
        id: ProductId,
        review: Review,
    ) -> Result<Vec<Review>, RepositoryError> {
        // Single-statement append: concurrent reviews never overwrite each other.
        let reviews = sqlx::query_scalar::<_, Json<Vec<Review>>>(
            r"
            UPDATE shop.product
            SET reviews = reviews || $2
            WHERE id = $1
            RETURNING reviews
            ",
        )
        .bind(id)
        .bind(Json(vec![review]))
        .fetch_optional(&self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        Ok(reviews.0)
    }

    async fn list_reviews(&self, id: ProductId) -> Result<Option<Vec<Review>>, RepositoryError> {
        let reviews = sqlx::query_scalar::<_, Json<Vec<Review>>>(
            r"
            SELECT reviews
            FROM shop.product
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(reviews.map(|r| r.0))
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
