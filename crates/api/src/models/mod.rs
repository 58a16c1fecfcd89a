//! Domain models for the shop.
//!
//! - [`product`] - Catalog entries and their embedded reviews
//! - [`cart`] - The cart aggregate and its invariants
//! - [`session`] - Keys stored in the anonymous cookie session

pub mod cart;
pub mod product;
pub mod session;

use thiserror::Error;

pub use cart::{Cart, CartError, CartProduct};
pub use product::{NewProduct, NewReview, Product, Review};
pub use session::keys as session_keys;

/// Input rejected at the store boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    /// The offending field, named as it appears in request bodies.
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    /// Create a validation error for `field`.
    #[must_use]
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}
