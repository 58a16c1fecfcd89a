//! Business logic services.
//!
//! # Services
//!
//! - [`catalog`] - Product listing, creation, and reviews
//! - [`cart`] - Cart mutations and checkout
//! - [`payment`] - Payment collaborator used by checkout

pub mod cart;
pub mod catalog;
pub mod payment;

pub use cart::{CartService, CartServiceError, Checkout, Removal};
pub use catalog::{CatalogError, CatalogService};
pub use payment::{PaymentError, PaymentProcessor, PaymentReceipt, StubPaymentProcessor};
