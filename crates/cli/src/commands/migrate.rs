//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! grocer-cli migrate
//! ```
//!
//! Applies the storefront migrations in `crates/storefront/migrations/`
//! and then creates the `tower_sessions` schema used by the session store.

use tower_sessions_sqlx_store::PostgresStore;

use grocer_storefront::db::MIGRATOR;

use super::{CommandError, connect};

/// Run storefront database migrations.
///
/// # Errors
///
/// Returns an error if the database is unreachable or a migration fails.
pub async fn run() -> Result<(), CommandError> {
    let pool = connect().await?;

    tracing::info!("Running storefront migrations...");
    MIGRATOR.run(&pool).await?;

    tracing::info!("Creating session store table...");
    PostgresStore::new(pool).migrate().await?;

    tracing::info!("Storefront migrations complete!");
    Ok(())
}
