//! Payment collaborator used at checkout.
//!
//! The shop does not take real payments yet. [`StubPaymentProcessor`]
//! approves every charge and issues an order reference, which is enough for
//! the checkout flow to finalize carts.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use bazaar_core::Price;

use crate::models::Cart;

/// Prefix of issued order references.
pub const ORDER_REFERENCE_PREFIX: &str = "ord_";

/// Errors that can occur when charging a cart.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaymentError {
    /// The processor refused the charge.
    #[error("payment declined: {0}")]
    Declined(String),
}

/// Proof of a successful charge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentReceipt {
    /// Reference stored on the finalized cart, `ord_` followed by 32 hex digits.
    pub order_reference: String,
    pub amount: Price,
    pub charged_at: DateTime<Utc>,
}

/// Charges a cart's subtotal.
#[async_trait]
pub trait PaymentProcessor: Send + Sync {
    /// Charge `cart.subtotal`.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError::Declined` if the charge was refused.
    async fn charge(&self, cart: &Cart) -> Result<PaymentReceipt, PaymentError>;
}

/// Approves every charge.
#[derive(Debug, Clone, Copy, Default)]
pub struct StubPaymentProcessor;

#[async_trait]
impl PaymentProcessor for StubPaymentProcessor {
    async fn charge(&self, cart: &Cart) -> Result<PaymentReceipt, PaymentError> {
        let receipt = PaymentReceipt {
            order_reference: format!("{ORDER_REFERENCE_PREFIX}{}", Uuid::new_v4().simple()),
            amount: cart.subtotal,
            charged_at: Utc::now(),
        };

        tracing::info!(
            cart_id = %cart.id,
            amount = %receipt.amount,
            order_reference = %receipt.order_reference,
            "Payment approved (stub)"
        );
        Ok(receipt)
    }
}
