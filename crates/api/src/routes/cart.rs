//! Cart route handlers.
//!
//! The cart is chosen by the session cookie; see [`CartSession`].

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use bazaar_core::ProductId;

use super::{ApiJson, MessageResponse};
use crate::error::Result;
use crate::middleware::CartSession;
use crate::models::Cart;
use crate::state::AppState;

/// Body of `POST /add-to-cart` and `POST /remove-from-cart`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItemRequest {
    pub product_id: ProductId,
}

/// Body of a successful `POST /checkout`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResponse {
    pub message: String,
    pub order_reference: String,
}

/// Show the session's cart, creating it if needed.
#[instrument(skip(state, session), fields(cart_id = %session.cart_id()))]
pub async fn show(State(state): State<AppState>, session: CartSession) -> Result<Json<Cart>> {
    Ok(Json(state.carts().get_cart(session.cart_id()).await?))
}

/// Add a product to the session's cart.
#[instrument(skip(state, session, request), fields(cart_id = %session.cart_id()))]
pub async fn add(
    State(state): State<AppState>,
    session: CartSession,
    ApiJson(request): ApiJson<CartItemRequest>,
) -> Result<Json<MessageResponse>> {
    state
        .carts()
        .add_to_cart(session.cart_id(), request.product_id)
        .await?;
    Ok(Json(MessageResponse::new("Product added to cart")))
}

/// Remove one entry of a product from the session's cart.
///
/// Succeeds even if the product was not in the cart.
#[instrument(skip(state, session, request), fields(cart_id = %session.cart_id()))]
pub async fn remove(
    State(state): State<AppState>,
    session: CartSession,
    ApiJson(request): ApiJson<CartItemRequest>,
) -> Result<Json<MessageResponse>> {
    state
        .carts()
        .remove_from_cart(session.cart_id(), request.product_id)
        .await?;
    Ok(Json(MessageResponse::new("Product removed from cart")))
}

/// Check out the session's cart and start a new one.
#[instrument(skip(state, session), fields(cart_id = %session.cart_id()))]
pub async fn checkout(
    State(state): State<AppState>,
    mut session: CartSession,
) -> Result<Json<CheckoutResponse>> {
    let checkout = state.carts().checkout(session.cart_id()).await?;
    session.rotate().await?;

    Ok(Json(CheckoutResponse {
        message: "Checkout successful".to_string(),
        order_reference: checkout.receipt.order_reference,
    }))
}
