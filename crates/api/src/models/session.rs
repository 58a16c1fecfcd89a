//! Session-related types.
//!
//! The shop has no accounts; the session only remembers which cart belongs
//! to the browser holding the cookie.

/// Session keys.
pub mod keys {
    /// Key for storing the current cart ID.
    pub const CART_ID: &str = "cart_id";
}
