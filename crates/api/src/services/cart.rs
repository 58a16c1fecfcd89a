//! Cart service: add, remove, view, and check out.
//!
//! Every mutation goes through [`CartStore::update`], so the read-modify-write
//! on a cart happens while the store holds it exclusively.
//!
//! Checkout takes two updates around the payment call. The first reserves the
//! cart (`CheckingOut`), which makes every other add, remove, or checkout of
//! it fail fast, so a cart is charged at most once. The second finalizes the
//! reservation, or releases it if the charge failed.

use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tracing::instrument;

use bazaar_core::{CartId, ProductId};

use super::payment::{PaymentError, PaymentProcessor, PaymentReceipt};
use crate::db::{CartStore, CartUpdateError, CatalogStore, RepositoryError};
use crate::models::{Cart, CartError};

/// Errors that can occur during cart operations.
#[derive(Debug, Error)]
pub enum CartServiceError {
    /// The product to add does not exist.
    #[error("product {0} not found")]
    ProductNotFound(ProductId),

    /// The cart was never created.
    #[error("cart {0} not found")]
    CartNotFound(CartId),

    /// The cart refused the operation.
    #[error(transparent)]
    Cart(#[from] CartError),

    /// Payment failed.
    #[error(transparent)]
    Payment(#[from] PaymentError),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

impl CartServiceError {
    fn from_update(id: CartId, err: CartUpdateError) -> Self {
        match err {
            CartUpdateError::Rejected(e) => Self::Cart(e),
            CartUpdateError::Repository(RepositoryError::NotFound) => Self::CartNotFound(id),
            CartUpdateError::Repository(e) => Self::Repository(e),
        }
    }
}

/// Outcome of removing a product.
#[derive(Debug, Clone)]
pub struct Removal {
    pub cart: Cart,
    /// Whether an entry was removed; `false` means the product was not in the cart.
    pub removed: bool,
}

/// Outcome of a successful checkout.
#[derive(Debug, Clone)]
pub struct Checkout {
    /// The finalized cart.
    pub cart: Cart,
    pub receipt: PaymentReceipt,
}

/// Cart service.
#[derive(Clone)]
pub struct CartService {
    carts: Arc<dyn CartStore>,
    catalog: Arc<dyn CatalogStore>,
    payments: Arc<dyn PaymentProcessor>,
}

impl CartService {
    /// Create a new cart service.
    #[must_use]
    pub fn new(
        carts: Arc<dyn CartStore>,
        catalog: Arc<dyn CatalogStore>,
        payments: Arc<dyn PaymentProcessor>,
    ) -> Self {
        Self {
            carts,
            catalog,
            payments,
        }
    }

    /// The cart for `id`, created empty if it does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns `CartServiceError::Repository` if the store fails.
    #[instrument(skip(self), fields(cart_id = %id))]
    pub async fn get_cart(&self, id: CartId) -> Result<Cart, CartServiceError> {
        Ok(self.carts.get_or_create(id).await?)
    }

    /// Append a snapshot of a catalog product to the cart.
    ///
    /// The product is resolved before the cart is touched, so an unknown
    /// product leaves the cart as it was.
    ///
    /// # Errors
    ///
    /// Returns `CartServiceError::ProductNotFound` for an unknown product and
    /// `CartServiceError::Cart` if the cart is checked out.
    #[instrument(skip(self), fields(cart_id = %cart_id, product_id = %product_id))]
    pub async fn add_to_cart(
        &self,
        cart_id: CartId,
        product_id: ProductId,
    ) -> Result<Cart, CartServiceError> {
        let product = self
            .catalog
            .get_product(product_id)
            .await?
            .ok_or(CartServiceError::ProductNotFound(product_id))?;

        self.carts.get_or_create(cart_id).await?;

        let cart = self
            .carts
            .update(
                cart_id,
                Box::new(move |cart| {
                    cart.add_product(&product, Utc::now())?;
                    Ok(true)
                }),
            )
            .await
            .map_err(|e| CartServiceError::from_update(cart_id, e))?
            .cart;

        tracing::info!(
            item_count = cart.item_count(),
            subtotal = %cart.subtotal,
            "Product added to cart"
        );
        Ok(cart)
    }

    /// Remove the first entry for `product_id` from the cart.
    ///
    /// Removing a product that is not in the cart succeeds without changes.
    ///
    /// # Errors
    ///
    /// Returns `CartServiceError::CartNotFound` if the cart does not exist and
    /// `CartServiceError::Cart` if it is checked out or being checked out.
    #[instrument(skip(self), fields(cart_id = %cart_id, product_id = %product_id))]
    pub async fn remove_from_cart(
        &self,
        cart_id: CartId,
        product_id: ProductId,
    ) -> Result<Removal, CartServiceError> {
        let update = self
            .carts
            .update(
                cart_id,
                Box::new(move |cart| Ok(cart.remove_product(product_id, Utc::now())?.is_some())),
            )
            .await
            .map_err(|e| CartServiceError::from_update(cart_id, e))?;

        let (cart, removed) = (update.cart, update.changed);
        if removed {
            tracing::info!(subtotal = %cart.subtotal, "Product removed from cart");
        } else {
            tracing::debug!("Product not in cart, nothing removed");
        }
        Ok(Removal { cart, removed })
    }

    /// Charge the cart and finalize it.
    ///
    /// # Errors
    ///
    /// - `CartNotFound` if the cart does not exist
    /// - `Cart(Finalized)` / `Cart(Empty)` if it cannot be checked out
    /// - `Cart(CheckoutInProgress)` if another checkout holds the cart
    /// - `Payment` if the charge is declined; the cart is active again
    #[instrument(skip(self), fields(cart_id = %cart_id))]
    pub async fn checkout(&self, cart_id: CartId) -> Result<Checkout, CartServiceError> {
        let reserved = self
            .carts
            .update(
                cart_id,
                Box::new(|cart| {
                    cart.begin_checkout(Utc::now())?;
                    Ok(true)
                }),
            )
            .await
            .map_err(|e| CartServiceError::from_update(cart_id, e))?
            .cart;
        let reserved_version = reserved.version;

        let receipt = match self.payments.charge(&reserved).await {
            Ok(receipt) => receipt,
            Err(e) => {
                tracing::info!(error = %e, "Payment declined, releasing cart");
                self.release(cart_id, reserved_version).await;
                return Err(e.into());
            }
        };

        let order_reference = receipt.order_reference.clone();
        let cart = self
            .carts
            .update(
                cart_id,
                Box::new(move |cart| {
                    cart.complete_checkout(reserved_version, order_reference, Utc::now())?;
                    Ok(true)
                }),
            )
            .await
            .map_err(|e| {
                tracing::error!(
                    order_reference = %receipt.order_reference,
                    error = %e,
                    "Charged cart could not be finalized"
                );
                CartServiceError::from_update(cart_id, e)
            })?
            .cart;

        tracing::info!(
            order_reference = %receipt.order_reference,
            subtotal = %cart.subtotal,
            "Checkout complete"
        );
        Ok(Checkout { cart, receipt })
    }

    /// Return a reserved cart to `Active` after its charge failed.
    async fn release(&self, cart_id: CartId, reserved_version: i64) {
        let released = self
            .carts
            .update(
                cart_id,
                Box::new(move |cart| {
                    cart.cancel_checkout(reserved_version, Utc::now())?;
                    Ok(true)
                }),
            )
            .await;

        if let Err(e) = released {
            tracing::error!(error = %e, "Failed to release cart after declined payment");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::{MemoryCartStore, MemoryCatalogStore};
    use crate::models::{NewProduct, Product};
    use crate::services::payment::StubPaymentProcessor;
    use async_trait::async_trait;
    use bazaar_core::{CartStatus, Price};
    use rust_decimal::Decimal;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct Declining;

    #[async_trait]
    impl PaymentProcessor for Declining {
        async fn charge(&self, _cart: &Cart) -> Result<PaymentReceipt, PaymentError> {
            Err(PaymentError::Declined("card expired".to_owned()))
        }
    }

    /// Tries to add a product to the cart while the charge is in flight.
    /// Declines unless the store refuses the add.
    struct Interfering {
        carts: MemoryCartStore,
        product: Product,
    }

    #[async_trait]
    impl PaymentProcessor for Interfering {
        async fn charge(&self, cart: &Cart) -> Result<PaymentReceipt, PaymentError> {
            let product = self.product.clone();
            let result = self
                .carts
                .update(
                    cart.id,
                    Box::new(move |c| {
                        c.add_product(&product, Utc::now())?;
                        Ok(true)
                    }),
                )
                .await;
            match result {
                Err(CartUpdateError::Rejected(CartError::CheckoutInProgress(_))) => {
                    StubPaymentProcessor.charge(cart).await
                }
                other => Err(PaymentError::Declined(format!("add was not refused: {other:?}"))),
            }
        }
    }

    /// Counts charges, holding each one long enough for another to race it.
    #[derive(Default)]
    struct Counting {
        charges: AtomicUsize,
    }

    #[async_trait]
    impl PaymentProcessor for Counting {
        async fn charge(&self, cart: &Cart) -> Result<PaymentReceipt, PaymentError> {
            self.charges.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            StubPaymentProcessor.charge(cart).await
        }
    }

    struct Fixture {
        service: CartService,
        catalog: MemoryCatalogStore,
        carts: MemoryCartStore,
    }

    fn fixture_with(
        payments: impl FnOnce(&MemoryCartStore) -> Arc<dyn PaymentProcessor>,
    ) -> Fixture {
        let catalog = MemoryCatalogStore::new();
        let carts = MemoryCartStore::new();
        let service = CartService::new(
            Arc::new(carts.clone()),
            Arc::new(catalog.clone()),
            payments(&carts),
        );
        Fixture {
            service,
            catalog,
            carts,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(|_| Arc::new(StubPaymentProcessor))
    }

    async fn product(catalog: &MemoryCatalogStore, name: &str, cents: i64) -> Product {
        catalog
            .create_product(NewProduct::parse(name, "", Decimal::new(cents, 2), None).unwrap())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_scenario_add_add_remove_remove() {
        let f = fixture();
        let a = product(&f.catalog, "A", 1000).await;
        let b = product(&f.catalog, "B", 500).await;
        let id = CartId::generate();

        let cart = f.service.add_to_cart(id, a.id).await.unwrap();
        assert_eq!(cart.subtotal, Price::from_cents(1000));

        let cart = f.service.add_to_cart(id, b.id).await.unwrap();
        assert_eq!(cart.subtotal, Price::from_cents(1500));

        let removal = f.service.remove_from_cart(id, a.id).await.unwrap();
        assert!(removal.removed);
        assert_eq!(removal.cart.subtotal, Price::from_cents(500));
        assert_eq!(
            removal.cart.products.iter().map(|p| p.id).collect::<Vec<_>>(),
            vec![b.id]
        );

        let again = f.service.remove_from_cart(id, a.id).await.unwrap();
        assert!(!again.removed);
        assert_eq!(again.cart, removal.cart);
    }

    #[tokio::test]
    async fn test_add_unknown_product_leaves_cart_alone() {
        let f = fixture();
        let id = CartId::generate();
        let before = f.service.get_cart(id).await.unwrap();

        let err = f
            .service
            .add_to_cart(id, ProductId::generate())
            .await
            .unwrap_err();
        assert!(matches!(err, CartServiceError::ProductNotFound(_)));
        assert_eq!(f.service.get_cart(id).await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_add_unknown_product_does_not_create_cart() {
        let f = fixture();
        f.service
            .add_to_cart(CartId::generate(), ProductId::generate())
            .await
            .unwrap_err();
        assert_eq!(f.carts.cart_count().await, 0);
    }

    #[tokio::test]
    async fn test_remove_from_missing_cart() {
        let f = fixture();
        let err = f
            .service
            .remove_from_cart(CartId::generate(), ProductId::generate())
            .await
            .unwrap_err();
        assert!(matches!(err, CartServiceError::CartNotFound(_)));
    }

    #[tokio::test]
    async fn test_checkout_finalizes_and_blocks_further_adds() {
        let f = fixture();
        let a = product(&f.catalog, "A", 1000).await;
        let id = CartId::generate();
        f.service.add_to_cart(id, a.id).await.unwrap();

        let checkout = f.service.checkout(id).await.unwrap();
        assert_eq!(checkout.cart.status, CartStatus::CheckedOut);
        assert_eq!(
            checkout.cart.order_reference.as_deref(),
            Some(checkout.receipt.order_reference.as_str())
        );
        assert_eq!(checkout.receipt.amount, Price::from_cents(1000));

        let err = f.service.add_to_cart(id, a.id).await.unwrap_err();
        assert!(matches!(err, CartServiceError::Cart(CartError::Finalized(_))));
        let err = f.service.checkout(id).await.unwrap_err();
        assert!(matches!(err, CartServiceError::Cart(CartError::Finalized(_))));
    }

    #[tokio::test]
    async fn test_checkout_empty_and_missing() {
        let f = fixture();
        let id = CartId::generate();
        assert!(matches!(
            f.service.checkout(id).await.unwrap_err(),
            CartServiceError::CartNotFound(_)
        ));

        f.service.get_cart(id).await.unwrap();
        assert!(matches!(
            f.service.checkout(id).await.unwrap_err(),
            CartServiceError::Cart(CartError::Empty(_))
        ));
    }

    #[tokio::test]
    async fn test_declined_payment_keeps_cart_active() {
        let f = fixture_with(|_| Arc::new(Declining));
        let a = product(&f.catalog, "A", 1000).await;
        let id = CartId::generate();
        f.service.add_to_cart(id, a.id).await.unwrap();

        let err = f.service.checkout(id).await.unwrap_err();
        assert!(matches!(err, CartServiceError::Payment(_)));

        // Reserve and release each bump the version
        let cart = f.service.get_cart(id).await.unwrap();
        assert_eq!(cart.status, CartStatus::Active);
        assert_eq!(cart.version, 3);

        let cart = f.service.add_to_cart(id, a.id).await.unwrap();
        assert_eq!(cart.subtotal, Price::from_cents(2000));
        let err = f.service.checkout(id).await.unwrap_err();
        assert!(matches!(err, CartServiceError::Payment(_)));
    }

    #[tokio::test]
    async fn test_cart_is_locked_while_payment_is_in_flight() {
        let extra = NewProduct::parse("Extra", "", Decimal::new(100, 2), None)
            .unwrap()
            .into_product(ProductId::generate(), Utc::now());
        let f = fixture_with(move |carts| {
            Arc::new(Interfering {
                carts: carts.clone(),
                product: extra,
            })
        });
        let a = product(&f.catalog, "A", 1000).await;
        let id = CartId::generate();
        f.service.add_to_cart(id, a.id).await.unwrap();

        let checkout = f.service.checkout(id).await.unwrap();
        assert_eq!(checkout.receipt.amount, Price::from_cents(1000));

        let cart = f.service.get_cart(id).await.unwrap();
        assert_eq!(cart.status, CartStatus::CheckedOut);
        assert_eq!(cart.item_count(), 1);
        assert_eq!(cart.subtotal, Price::from_cents(1000));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_checkouts_charge_once() {
        let counting = Arc::new(Counting::default());
        let payments = Arc::clone(&counting);
        let f = fixture_with(move |_| payments as Arc<dyn PaymentProcessor>);
        let a = product(&f.catalog, "A", 1000).await;
        let id = CartId::generate();
        f.service.add_to_cart(id, a.id).await.unwrap();

        let (first, second) = tokio::join!(f.service.checkout(id), f.service.checkout(id));

        assert_eq!(counting.charges.load(Ordering::SeqCst), 1);
        let (won, lost) = match (first, second) {
            (Ok(won), Err(lost)) | (Err(lost), Ok(won)) => (won, lost),
            other => panic!("expected exactly one successful checkout, got {other:?}"),
        };
        assert_eq!(won.cart.status, CartStatus::CheckedOut);
        assert!(matches!(
            lost,
            CartServiceError::Cart(CartError::CheckoutInProgress(_) | CartError::Finalized(_))
        ));
    }

    #[tokio::test]
    async fn test_concurrent_adds_across_carts() {
        let f = fixture();
        let a = product(&f.catalog, "A", 300).await;
        let ids: Vec<_> = (0..4).map(|_| CartId::generate()).collect();

        let handles: Vec<_> = ids
            .iter()
            .cycle()
            .take(40)
            .map(|&id| {
                let service = f.service.clone();
                tokio::spawn(async move { service.add_to_cart(id, a.id).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        for id in ids {
            let cart = f.service.get_cart(id).await.unwrap();
            assert_eq!(cart.item_count(), 10);
            assert_eq!(cart.subtotal, Price::from_cents(3000));
        }
    }
}
