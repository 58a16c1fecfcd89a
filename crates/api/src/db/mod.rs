//! Document storage for products and carts.
//!
//! # Collections
//!
//! - `shop.product` - Catalog entries, reviews embedded as a JSONB array
//! - `shop.cart` - Carts, product snapshots embedded as a JSONB array
//! - `tower_sessions.session` - Cookie sessions (created by `bazaar migrate`)
//!
//! Both collections sit behind the [`CatalogStore`] and [`CartStore`] traits,
//! implemented for `PostgreSQL` ([`PgCatalogStore`], [`PgCartStore`]) and for
//! process memory ([`MemoryCatalogStore`], [`MemoryCartStore`]).
//!
//! # Concurrency
//!
//! [`CartStore::update`] gives exclusive access to one cart for the duration
//! of a mutation, so read-modify-write sequences on the same cart never lose
//! updates. Different carts never wait on each other.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/api/migrations/` and run via:
//! ```bash
//! cargo run -p bazaar-cli -- migrate
//! ```

pub mod carts;
pub mod memory;
pub mod products;

use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use bazaar_core::{CartId, ProductId};

use crate::models::{Cart, CartError, NewProduct, Product, Review};

pub use carts::PgCartStore;
pub use memory::{MemoryCartStore, MemoryCatalogStore};
pub use products::PgCatalogStore;

/// Embedded schema migrations.
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

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

    /// Constraint violation (e.g., duplicate id).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

impl RepositoryError {
    /// Whether the store itself could not be reached.
    ///
    /// Callers surface these as 503s; the request may succeed if retried.
    #[must_use]
    pub const fn is_unavailable(&self) -> bool {
        matches!(
            self,
            Self::Database(sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_))
        )
    }
}

/// Error from [`CartStore::update`].
#[derive(Debug, Error)]
pub enum CartUpdateError {
    /// The mutation refused to apply; nothing was written.
    #[error(transparent)]
    Rejected(#[from] CartError),

    /// The store failed or the cart does not exist.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// A change applied to one cart under exclusive access.
///
/// Returns `Ok(true)` if the cart changed and must be written back,
/// `Ok(false)` for a no-op. An error discards the change.
pub type CartMutation = Box<dyn FnOnce(&mut Cart) -> Result<bool, CartError> + Send>;

/// Outcome of [`CartStore::update`].
#[derive(Debug, Clone)]
pub struct CartUpdate {
    /// The cart as stored afterwards.
    pub cart: Cart,
    /// What the mutation returned: whether the cart changed and was written.
    pub changed: bool,
}

/// Product collection.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// All products, oldest first.
    async fn list_products(&self) -> Result<Vec<Product>, RepositoryError>;

    /// A single product, or `None` if the id is unknown.
    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError>;

    /// Persist a new product with an empty review list.
    async fn create_product(&self, product: NewProduct) -> Result<Product, RepositoryError>;

    /// Append `review` to the product's reviews in one atomic step.
    ///
    /// Returns the updated review list.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the product does not exist
    async fn append_review(
        &self,
        id: ProductId,
        review: Review,
    ) -> Result<Vec<Review>, RepositoryError>;

    /// Reviews of a product in submission order, or `None` if the id is unknown.
    async fn list_reviews(&self, id: ProductId) -> Result<Option<Vec<Review>>, RepositoryError>;

    /// Check that the store is reachable.
    async fn ping(&self) -> Result<(), RepositoryError>;
}

/// Cart collection.
#[async_trait]
pub trait CartStore: Send + Sync {
    /// The persisted cart for `id`, inserting an empty one first if absent.
    ///
    /// Concurrent calls for the same absent id create exactly one cart.
    async fn get_or_create(&self, id: CartId) -> Result<Cart, RepositoryError>;

    /// The cart for `id`, or `None` if it was never created.
    async fn find(&self, id: CartId) -> Result<Option<Cart>, RepositoryError>;

    /// Apply `mutation` to the cart while holding it exclusively, then persist.
    ///
    /// # Errors
    ///
    /// - `Repository(NotFound)` if the cart does not exist
    /// - `Rejected` if the mutation refused to apply
    async fn update(
        &self,
        id: CartId,
        mutation: CartMutation,
    ) -> Result<CartUpdate, CartUpdateError>;
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
