//! Database migration command.
//!
//! Runs the embedded migrations from `crates/api/migrations/` (schema `shop`)
//! and creates the session table used by `tower-sessions`
//! (`tower_sessions.session`).
//!
//! Migration files follow the usual sqlx layout:
//! ```text
//! migrations/
//! ├── 20261019000001_create_products.sql
//! ├── 20261019000002_create_carts.sql
//! └── 20261019000003_checkout_reservation_and_unique_names.sql
//! ```

use thiserror::Error;
use tower_sessions_sqlx_store::PostgresStore;

use bazaar_api::config::{self, ConfigError};
use bazaar_api::db;

/// Errors that can occur while migrating.
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Run all database migrations.
///
/// # Errors
///
/// Returns an error if the database is unreachable or a migration fails.
pub async fn run() -> Result<(), MigrationError> {
    let database_url = config::database_url_from_env()?;

    tracing::info!("Connecting to database...");
    let pool = db::create_pool(&database_url).await?;

    tracing::info!("Running shop migrations...");
    db::MIGRATOR.run(&pool).await?;

    tracing::info!("Creating session table...");
    PostgresStore::new(pool.clone()).migrate().await?;

    tracing::info!("Migrations complete!");
    Ok(())
}
