//! Database operations for the storefront `PostgreSQL` database.
//!
//! ## Tables
//!
//! - `users` - Accounts, roles and the forced reset flag
//! - `password_resets` - One-time reset codes
//! - `products` - Catalog and stock levels
//! - `cart_items` - Per-user cart lines
//! - `orders`, `order_items`, `payments`, `shipping_details` - Written by checkout
//! - `tower_sessions.session` - Tower-sessions storage
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/`, embedded as
//! [`MIGRATOR`] and run via:
//! ```bash
//! cargo run -p grocer-cli -- migrate
//! ```

pub mod cart;
pub mod orders;
pub mod password_resets;
pub mod products;
pub mod stats;
pub mod users;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use crate::config::StorefrontConfig;

pub use cart::CartRepository;
pub use orders::OrderRepository;
pub use password_resets::PasswordResetRepository;
pub use products::ProductRepository;
pub use stats::StatsRepository;
pub use users::UserRepository;

/// Embedded storefront migrations.
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

impl RepositoryError {
    /// Map unique violations to [`RepositoryError::Conflict`] with `message`.
    pub(crate) fn unique_violation(e: sqlx::Error, message: &str) -> Self {
        if let sqlx::Error::Database(ref db_err) = e
            && db_err.is_unique_violation()
        {
            return Self::Conflict(message.to_owned());
        }
        Self::Database(e)
    }

    /// Map foreign key violations to [`RepositoryError::Conflict`] with `message`.
    pub(crate) fn foreign_key_violation(e: sqlx::Error, message: &str) -> Self {
        if let sqlx::Error::Database(ref db_err) = e
            && db_err.is_foreign_key_violation()
        {
            return Self::Conflict(message.to_owned());
        }
        Self::Database(e)
    }
}

/// Create a `PostgreSQL` connection pool from the storefront configuration.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(config: &StorefrontConfig) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(2.min(config.database.max_connections))
        .acquire_timeout(config.database.acquire_timeout)
        .connect(config.database_url.expose_secret())
        .await
}
