//! `PostgreSQL` cart collection.
//!
//! Mutations run inside a transaction holding a `FOR UPDATE` row lock, so
//! concurrent requests for the same cart apply one after another.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Transaction};

use bazaar_core::{CartId, CartStatus, Price};

use super::{CartMutation, CartStore, CartUpdate, CartUpdateError, RepositoryError};
use crate::models::{Cart, CartProduct};

#[derive(sqlx::FromRow)]
struct CartRow {
    id: CartId,
    status: CartStatus,
    products: Json<Vec<CartProduct>>,
    subtotal: Price,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    checked_out_at: Option<DateTime<Utc>>,
    order_reference: Option<String>,
}

impl TryFrom<CartRow> for Cart {
    type Error = RepositoryError;

    fn try_from(row: CartRow) -> Result<Self, Self::Error> {
        let cart = Self {
            id: row.id,
            status: row.status,
            products: row.products.0,
            subtotal: row.subtotal,
            version: row.version,
            created_at: row.created_at,
            updated_at: row.updated_at,
            checked_out_at: row.checked_out_at,
            order_reference: row.order_reference,
        };

        if cart.subtotal != cart.computed_subtotal() {
            return Err(RepositoryError::DataCorruption(format!(
                "cart {} subtotal {} does not match its products",
                cart.id, cart.subtotal
            )));
        }
        Ok(cart)
    }
}

const SELECT_CART: &str = r"
    SELECT id, status, products, subtotal, version,
           created_at, updated_at, checked_out_at, order_reference
    FROM shop.cart
    WHERE id = $1
";

/// Cart store backed by `shop.cart`.
#[derive(Clone)]
pub struct PgCartStore {
    pool: PgPool,
}

impl PgCartStore {
    /// Create a new cart store.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn lock(
        tx: &mut Transaction<'_, Postgres>,
        id: CartId,
    ) -> Result<Option<Cart>, RepositoryError> {
        let row = sqlx::query_as::<_, CartRow>(&format!("{SELECT_CART} FOR UPDATE"))
            .bind(id)
            .fetch_optional(&mut **tx)
            .await?;

        row.map(Cart::try_from).transpose()
    }

    async fn write(tx: &mut Transaction<'_, Postgres>, cart: &Cart) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            UPDATE shop.cart
            SET status = $2,
                products = $3,
                subtotal = $4,
                version = $5,
                updated_at = $6,
                checked_out_at = $7,
                order_reference = $8
            WHERE id = $1
            ",
        )
        .bind(cart.id)
        .bind(cart.status)
        .bind(Json(&cart.products))
        .bind(cart.subtotal)
        .bind(cart.version)
        .bind(cart.updated_at)
        .bind(cart.checked_out_at)
        .bind(cart.order_reference.as_deref())
        .execute(&mut **tx)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl CartStore for PgCartStore {
    async fn get_or_create(&self, id: CartId) -> Result<Cart, RepositoryError> {
        let now = Utc::now();
        let inserted = sqlx::query(
            r"
            INSERT INTO shop.cart (id, created_at, updated_at)
            VALUES ($1, $2, $2)
            ON CONFLICT (id) DO NOTHING
            ",
        )
        .bind(id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if inserted.rows_affected() > 0 {
            tracing::debug!(cart_id = %id, "Cart created");
        }

        self.find(id).await?.ok_or_else(|| {
            RepositoryError::DataCorruption(format!("cart {id} vanished after insert"))
        })
    }

    async fn find(&self, id: CartId) -> Result<Option<Cart>, RepositoryError> {
        let row = sqlx::query_as::<_, CartRow>(SELECT_CART)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Cart::try_from).transpose()
    }

    async fn update(
        &self,
        id: CartId,
        mutation: CartMutation,
    ) -> Result<CartUpdate, CartUpdateError> {
        let mut tx = self.pool.begin().await.map_err(RepositoryError::from)?;

        let mut cart = Self::lock(&mut tx, id)
            .await?
            .ok_or(RepositoryError::NotFound)?;

        // Dropping `tx` on rejection rolls back and releases the row lock.
        let changed = mutation(&mut cart)?;
        if changed {
            Self::write(&mut tx, &cart).await?;
            tx.commit().await.map_err(RepositoryError::from)?;
            tracing::debug!(cart_id = %id, version = cart.version, "Cart updated");
        }

        Ok(CartUpdate { cart, changed })
    }
}
