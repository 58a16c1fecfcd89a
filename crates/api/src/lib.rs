//! Bazaar shop API library.
//!
//! Product catalog, session-scoped carts, reviews, and checkout over a JSON
//! HTTP API. The binary in `main.rs` wires configuration, tracing, and Sentry
//! around [`app::build_router`]; tests use the same router.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod app;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

pub use app::{build_router, serve};
pub use config::{ApiConfig, ConfigError, StoreBackend};
pub use state::AppState;
