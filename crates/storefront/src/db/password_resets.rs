//! One-time password reset codes.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;

use grocer_core::{Email, PasswordResetId};

use super::RepositoryError;

/// A stored reset code.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct PasswordReset {
    pub id: PasswordResetId,
    pub email: Email,
    pub otp: String,
    pub expires_at: DateTime<Utc>,
    pub used: bool,
    pub created_at: DateTime<Utc>,
}

/// Repository for reset codes.
pub struct PasswordResetRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> PasswordResetRepository<'a> {
    /// Create a new password reset repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Store a new code for `email`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(
        &self,
        email: &Email,
        otp: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<PasswordReset, RepositoryError> {
        let reset = sqlx::query_as::<_, PasswordReset>(
            r"
            INSERT INTO password_resets (email, otp, expires_at)
            VALUES ($1, $2, $3)
            RETURNING id, email, otp, expires_at, used, created_at
            ",
        )
        .bind(email)
        .bind(otp)
        .bind(expires_at)
        .fetch_one(self.pool)
        .await?;

        Ok(reset)
    }

    /// Redeem a code and set a new password hash.
    ///
    /// The code must equal the newest unused, unexpired code for `email`.
    /// In one transaction the password is replaced, `reset_required` is
    /// cleared and the code is marked used.
    ///
    /// Returns `false` (and changes nothing) when the code is not valid.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if any statement fails.
    pub async fn redeem(
        &self,
        email: &Email,
        otp: &str,
        password_hash: &str,
    ) -> Result<bool, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let latest = sqlx::query_as::<_, (PasswordResetId, String)>(
            r"
            SELECT id, otp
            FROM password_resets
            WHERE email = $1 AND used = FALSE AND expires_at > now()
            ORDER BY created_at DESC, id DESC
            LIMIT 1
            FOR UPDATE
            ",
        )
        .bind(email)
        .fetch_optional(&mut *tx)
        .await?;

        let Some((reset_id, stored)) = latest else {
            return Ok(false);
        };
        if stored != otp {
            return Ok(false);
        }

        let updated = sqlx::query(
            r"
            UPDATE users
            SET password_hash = $2, reset_required = FALSE, updated_at = now()
            WHERE email = $1
            ",
        )
        .bind(email)
        .bind(password_hash)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            return Ok(false);
        }

        sqlx::query("UPDATE password_resets SET used = TRUE WHERE id = $1")
            .bind(reset_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(true)
    }
}
