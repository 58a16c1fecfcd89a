//! Session-carried cart identity.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use tower_sessions::Session;

use bazaar_core::CartId;

use crate::error::AppError;
use crate::models::session_keys;

/// Extractor for the visitor's cart id.
///
/// Reads the cart id stored in the session, minting and storing a fresh one
/// on the first request. The session layer then sets the cookie.
///
/// # Example
///
/// ```rust,ignore
/// async fn view_cart(State(state): State<AppState>, cart: CartSession) -> Result<Json<Cart>> {
///     Ok(Json(state.carts().get_cart(cart.cart_id()).await?))
/// }
/// ```
#[derive(Debug, Clone)]
pub struct CartSession {
    session: Session,
    cart_id: CartId,
}

impl CartSession {
    /// The cart this session is working on.
    #[must_use]
    pub const fn cart_id(&self) -> CartId {
        self.cart_id
    }

    /// Point the session at a fresh cart id and return it.
    ///
    /// Called after checkout so the next request starts a new cart.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Internal` if the session cannot be written.
    pub async fn rotate(&mut self) -> Result<CartId, AppError> {
        let next = CartId::generate();
        self.session
            .insert(session_keys::CART_ID, next)
            .await
            .map_err(|e| AppError::Internal(format!("failed to store cart id: {e}")))?;

        tracing::debug!(previous = %self.cart_id, cart_id = %next, "Cart id rotated");
        self.cart_id = next;
        Ok(next)
    }
}

impl<S> FromRequestParts<S> for CartSession
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Get the session from extensions (set by SessionManagerLayer)
        let session = parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or_else(|| AppError::Internal("session layer is not installed".to_string()))?;

        // An unreadable value is replaced rather than rejected.
        let stored: Option<CartId> = session.get(session_keys::CART_ID).await.ok().flatten();

        let cart_id = match stored {
            Some(id) => id,
            None => {
                let id = CartId::generate();
                session
                    .insert(session_keys::CART_ID, id)
                    .await
                    .map_err(|e| AppError::Internal(format!("failed to store cart id: {e}")))?;
                tracing::debug!(cart_id = %id, "Cart id assigned to session");
                id
            }
        };

        Ok(Self { session, cart_id })
    }
}
