//! User management commands.
//!
//! # Usage
//!
//! ```bash
//! grocer-cli user promote -e admin@example.com
//! ```

use grocer_core::{Email, UserRole};
use grocer_storefront::db::{RepositoryError, UserRepository};

use super::{CommandError, connect};

/// Grant the admin role to an existing user.
///
/// The user must log in again for the new role to reach their session.
///
/// # Errors
///
/// Returns `CommandError::UserNotFound` if no user has this email.
pub async fn promote(email: &str) -> Result<(), CommandError> {
    let email = Email::parse(email)?;
    let pool = connect().await?;

    let user = UserRepository::new(&pool)
        .set_role(&email, UserRole::Admin)
        .await
        .map_err(|e| match e {
            RepositoryError::NotFound => CommandError::UserNotFound(email.to_string()),
            other => other.into(),
        })?;

    tracing::info!(user_id = %user.id, email = %email.masked(), "User promoted to admin");
    Ok(())
}
