//! HTTP middleware stack for the API.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors, transactions)
//! 2. `TraceLayer` (request spans)
//! 3. Request ID (add unique ID to each request)
//! 4. CORS (dashboard origins)
//! 5. Session layer (tower-sessions, `PostgreSQL` or memory store)

pub mod cart_session;
pub mod request_id;
pub mod session;

pub use cart_session::CartSession;
pub use request_id::{REQUEST_ID_HEADER, RequestId, request_id_middleware};
pub use session::{SESSION_COOKIE_NAME, create_session_layer};
