//! User domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use grocer_core::{Email, UserId, UserRole};

/// A storefront account.
///
/// The password hash is never part of this type; it is only read by the
/// login path through [`crate::db::UserRepository::get_password_hash`].
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: Email,
    pub address: String,
    pub contact: String,
    pub role: UserRole,
    /// Set by an admin to force a password change on next login.
    pub reset_required: bool,
    pub created_at: DateTime<Utc>,
}

/// Fields required to insert a new user.
#[derive(Debug, Clone, Copy)]
pub struct NewUser<'a> {
    pub username: &'a str,
    pub email: &'a Email,
    pub password_hash: &'a str,
    pub address: &'a str,
    pub contact: &'a str,
}
