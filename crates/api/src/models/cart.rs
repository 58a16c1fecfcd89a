//! The cart aggregate.
//!
//! A cart holds by-value snapshots of the products added to it and a
//! denormalized subtotal. Every method here keeps
//! `subtotal == sum(products[i].price)`; stores persist whatever the
//! aggregate produced and never touch those fields themselves.
//!
//! ```text
//! (absent) --get_or_create--> Active --begin_checkout--> CheckingOut
//!                              |  ^ <--cancel_checkout--     |
//!                              +--+ add / remove             | complete_checkout
//!                                                            v
//!                                                        CheckedOut
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use bazaar_core::{CartId, CartStatus, Price, ProductId};

use super::product::Product;

/// Rule violations raised by the cart aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartError {
    /// The cart was checked out and is read-only.
    #[error("cart {0} has already been checked out")]
    Finalized(CartId),

    /// A checkout holds the cart while its payment is in flight.
    #[error("cart {0} is being checked out")]
    CheckoutInProgress(CartId),

    /// Checkout was attempted with nothing in the cart.
    #[error("cart {0} is empty")]
    Empty(CartId),

    /// The cart is not in the state the checkout reserved.
    #[error("cart {id} changed during checkout (expected version {expected}, found {found})")]
    Changed {
        id: CartId,
        expected: i64,
        found: i64,
    },

    /// The stored subtotal no longer matches the products.
    #[error("cart {0} subtotal is inconsistent with its products")]
    SubtotalMismatch(CartId),

    /// Adding the product would push the subtotal past `Price::MAX`.
    #[error("cart {0} subtotal would exceed the maximum price")]
    SubtotalOverflow(CartId),
}

/// A product as it was when added to a cart.
///
/// Later catalog edits do not reach carts that already hold the product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartProduct {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub price: Price,
    pub image: Option<String>,
}

impl From<&Product> for CartProduct {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id,
            name: product.name.clone(),
            description: product.description.clone(),
            price: product.price,
            image: product.image.clone(),
        }
    }
}

/// A shopping cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    pub id: CartId,
    pub status: CartStatus,
    /// Snapshots in the order they were added; duplicates allowed.
    pub products: Vec<CartProduct>,
    pub subtotal: Price,
    /// Incremented on every state change.
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub checked_out_at: Option<DateTime<Utc>>,
    /// Reference issued by the payment collaborator at checkout.
    pub order_reference: Option<String>,
}

impl Cart {
    /// A new, empty, active cart.
    #[must_use]
    pub fn new(id: CartId, now: DateTime<Utc>) -> Self {
        Self {
            id,
            status: CartStatus::Active,
            products: Vec::new(),
            subtotal: Price::ZERO,
            version: 0,
            created_at: now,
            updated_at: now,
            checked_out_at: None,
            order_reference: None,
        }
    }

    /// Whether checkout has finalized this cart.
    #[must_use]
    pub const fn is_finalized(&self) -> bool {
        self.status.is_terminal()
    }

    /// Number of product entries, counting duplicates.
    #[must_use]
    pub fn item_count(&self) -> usize {
        self.products.len()
    }

    /// Subtotal recomputed from the product snapshots.
    #[must_use]
    pub fn computed_subtotal(&self) -> Price {
        self.products.iter().map(|p| &p.price).sum()
    }

    /// Append a snapshot of `product` and add its price to the subtotal.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Finalized` or `CartError::CheckoutInProgress` if
    /// the cart is not active and `CartError::SubtotalOverflow` if the
    /// subtotal would pass `Price::MAX`.
    pub fn add_product(&mut self, product: &Product, now: DateTime<Utc>) -> Result<(), CartError> {
        self.ensure_active()?;

        let subtotal = self
            .subtotal
            .checked_add(product.price)
            .ok_or(CartError::SubtotalOverflow(self.id))?;

        self.products.push(CartProduct::from(product));
        self.subtotal = subtotal;
        self.touch(now);
        Ok(())
    }

    /// Remove the first entry for `product_id`.
    ///
    /// The removed entry's price is captured before the sequence shrinks and
    /// subtracted from the subtotal. Returns `None` without touching the cart
    /// when the product is not in it.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Finalized` or `CartError::CheckoutInProgress` if
    /// the cart is not active and `CartError::SubtotalMismatch` if the
    /// stored subtotal is smaller than the removed price.
    pub fn remove_product(
        &mut self,
        product_id: ProductId,
        now: DateTime<Utc>,
    ) -> Result<Option<CartProduct>, CartError> {
        self.ensure_active()?;

        let Some(index) = self.products.iter().position(|p| p.id == product_id) else {
            return Ok(None);
        };

        let price = self.products.get(index).map_or(Price::ZERO, |p| p.price);
        let subtotal = self
            .subtotal
            .checked_sub(price)
            .ok_or(CartError::SubtotalMismatch(self.id))?;

        let removed = self.products.remove(index);
        self.subtotal = subtotal;
        self.touch(now);
        Ok(Some(removed))
    }

    /// Check that the cart can be checked out.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Finalized`, `CartError::CheckoutInProgress`, or
    /// `CartError::Empty`.
    pub fn ensure_checkout_ready(&self) -> Result<(), CartError> {
        self.ensure_active()?;
        if self.products.is_empty() {
            return Err(CartError::Empty(self.id));
        }
        Ok(())
    }

    /// Reserve the cart for a checkout.
    ///
    /// While reserved the cart refuses every other change, including a
    /// second checkout, so exactly one payment is taken for it.
    ///
    /// # Errors
    ///
    /// Anything `ensure_checkout_ready` returns.
    pub fn begin_checkout(&mut self, now: DateTime<Utc>) -> Result<(), CartError> {
        self.ensure_checkout_ready()?;
        self.status = CartStatus::CheckingOut;
        self.touch(now);
        Ok(())
    }

    /// Finalize a reservation made at `reserved_version`.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Finalized` if already checked out and
    /// `CartError::Changed` if the cart is not the reservation being finalized.
    pub fn complete_checkout(
        &mut self,
        reserved_version: i64,
        order_reference: String,
        now: DateTime<Utc>,
    ) -> Result<(), CartError> {
        self.ensure_reserved(reserved_version)?;

        self.status = CartStatus::CheckedOut;
        self.checked_out_at = Some(now);
        self.order_reference = Some(order_reference);
        self.touch(now);
        Ok(())
    }

    /// Release a reservation made at `reserved_version` after a failed payment.
    ///
    /// # Errors
    ///
    /// Same as `complete_checkout`.
    pub fn cancel_checkout(
        &mut self,
        reserved_version: i64,
        now: DateTime<Utc>,
    ) -> Result<(), CartError> {
        self.ensure_reserved(reserved_version)?;

        self.status = CartStatus::Active;
        self.touch(now);
        Ok(())
    }

    fn ensure_reserved(&self, reserved_version: i64) -> Result<(), CartError> {
        if self.is_finalized() {
            return Err(CartError::Finalized(self.id));
        }
        if self.status != CartStatus::CheckingOut || self.version != reserved_version {
            return Err(CartError::Changed {
                id: self.id,
                expected: reserved_version,
                found: self.version,
            });
        }
        Ok(())
    }

    fn ensure_active(&self) -> Result<(), CartError> {
        match self.status {
            CartStatus::Active => Ok(()),
            CartStatus::CheckingOut => Err(CartError::CheckoutInProgress(self.id)),
            CartStatus::CheckedOut => Err(CartError::Finalized(self.id)),
        }
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.version += 1;
        self.updated_at = now;
    }
}
