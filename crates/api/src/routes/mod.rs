//! HTTP route handlers.
//!
//! # Route Structure
//!
//! Every route below is also mounted under `/api`.
//!
//! ```text
//! # Catalog
//! GET  /products               - Product listing
//! POST /products               - Create product (admin dashboard)
//!
//! # Cart (cart id carried by the session cookie)
//! GET  /cart                   - Current cart
//! POST /add-to-cart            - Add a product
//! POST /remove-from-cart       - Remove a product
//! POST /checkout               - Charge and finalize the cart
//!
//! # Reviews
//! POST /add-review             - Append a review to a product
//! GET  /product/{id}/reviews   - Reviews of a product
//! ```

pub mod cart;
pub mod products;
pub mod reviews;

use axum::extract::FromRequest;
use axum::{
    Router,
    routing::{get, post},
};
use serde::Serialize;

use crate::error::AppError;
use crate::state::AppState;

/// JSON extractor whose rejections use the API's error body.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// Body of responses that only confirm an action.
#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    /// Create a confirmation message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Shop routes, unprefixed.
pub fn shop_routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(products::index).post(products::create))
        .route("/cart", get(cart::show))
        .route("/add-to-cart", post(cart::add))
        .route("/remove-from-cart", post(cart::remove))
        .route("/checkout", post(cart::checkout))
        .route("/add-review", post(reviews::create))
        .route("/product/{id}/reviews", get(reviews::index))
}

/// Create all routes: shop routes at the root and under `/api`.
pub fn routes() -> Router<AppState> {
    shop_routes().nest("/api", shop_routes())
}
