//! Authentication service.
//!
//! Password accounts with Argon2id hashes, and password resets through
//! one-time codes delivered by a mock mailer.

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::{DateTime, TimeDelta, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::instrument;

use grocer_core::{Email, UserId};

use crate::db::{PasswordResetRepository, RepositoryError, UserRepository};
use crate::models::user::{NewUser, User};

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 6;

/// Digits in a reset code.
const OTP_DIGITS: usize = 6;

/// Sender address on mock emails.
const MAIL_FROM: &str = "no-reply@grocer.local";

/// Registration form.
#[derive(Debug, Clone, Deserialize)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
    pub address: String,
    pub contact: String,
}

/// Profile edit. Blank fields keep the current value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    pub username: Option<String>,
    pub address: Option<String>,
    pub contact: Option<String>,
}

/// Email that would have been sent. Returned to the caller instead of
/// being delivered.
#[derive(Debug, Clone, Serialize)]
pub struct MockEmail {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
    pub otp: String,
    pub expires_at: DateTime<Utc>,
}

/// Authentication service.
pub struct AuthService<'a> {
    users: UserRepository<'a>,
    resets: PasswordResetRepository<'a>,
    otp_ttl: TimeDelta,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub fn new(pool: &'a PgPool, otp_ttl: std::time::Duration) -> Self {
        Self {
            users: UserRepository::new(pool),
            resets: PasswordResetRepository::new(pool),
            otp_ttl: TimeDelta::from_std(otp_ttl).unwrap_or(TimeDelta::minutes(10)),
        }
    }

    // =========================================================================
    // Password Authentication
    // =========================================================================

    /// Register a new shopper account.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::MissingField` if any field is blank.
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::WeakPassword` if the password is too short.
    /// Returns `AuthError::UserAlreadyExists` if the email is already registered.
    #[instrument(skip_all)]
    pub async fn register(&self, form: &Registration) -> Result<User, AuthError> {
        let username = required("username", &form.username)?;
        required("email", &form.email)?;
        let address = required("address", &form.address)?;
        let contact = required("contact", &form.contact)?;

        let email = Email::parse(&form.email)?;
        validate_password(&form.password)?;
        let password_hash = hash_password(&form.password)?;

        let user = self
            .users
            .create(NewUser {
                username,
                email: &email,
                password_hash: &password_hash,
                address,
                contact,
            })
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })?;

        tracing::info!(user_id = %user.id, email = %email.masked(), "User registered");
        Ok(user)
    }

    /// Login with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong.
    #[instrument(skip_all)]
    pub async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;

        let (user, password_hash) = self
            .users
            .get_password_hash(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &password_hash)?;

        Ok(user)
    }

    /// Get a user by ID.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` if the user doesn't exist.
    pub async fn get_user(&self, user_id: UserId) -> Result<User, AuthError> {
        self.users
            .get_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)
    }

    /// Apply a profile edit.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` if the user doesn't exist.
    pub async fn update_profile(
        &self,
        user_id: UserId,
        update: &ProfileUpdate,
    ) -> Result<User, AuthError> {
        let current = self.get_user(user_id).await?;

        let pick = |new: &Option<String>, old: &str| {
            new.as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .unwrap_or(old)
                .to_owned()
        };
        let username = pick(&update.username, &current.username);
        let address = pick(&update.address, &current.address);
        let contact = pick(&update.contact, &current.contact);

        self.users
            .update_profile(user_id, &username, &address, &contact)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => AuthError::UserNotFound,
                other => AuthError::Repository(other),
            })
    }

    // =========================================================================
    // Password Reset
    // =========================================================================

    /// Self-service reset request.
    ///
    /// Returns `None` for unknown emails so callers can respond the same way
    /// whether or not an account exists.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::MissingField` or `AuthError::InvalidEmail` for a
    /// malformed email.
    #[instrument(skip_all)]
    pub async fn request_password_reset(&self, email: &str) -> Result<Option<MockEmail>, AuthError> {
        required("email", email)?;
        let email = Email::parse(email)?;

        if self.users.get_by_email(&email).await?.is_none() {
            tracing::info!(email = %email.masked(), "Reset requested for unknown email");
            return Ok(None);
        }

        self.issue_code(&email).await.map(Some)
    }

    /// Admin-initiated reset request for an existing account.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` if no account has this email.
    #[instrument(skip_all)]
    pub async fn admin_request_reset(&self, email: &str) -> Result<MockEmail, AuthError> {
        required("email", email)?;
        let email = Email::parse(email)?;

        if self.users.get_by_email(&email).await?.is_none() {
            return Err(AuthError::UserNotFound);
        }

        self.issue_code(&email).await
    }

    /// Set a new password using a reset code.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::MissingField` for blank inputs,
    /// `AuthError::WeakPassword` for a short password and
    /// `AuthError::InvalidOtp` if the code is not the newest valid one.
    #[instrument(skip_all)]
    pub async fn reset_password(
        &self,
        email: &str,
        otp: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        required("email", email)?;
        let otp = required("otp", otp)?;
        required("new_password", new_password)?;

        let email = Email::parse(email)?;
        validate_password(new_password)?;
        let password_hash = hash_password(new_password)?;

        if !self.resets.redeem(&email, otp, &password_hash).await? {
            return Err(AuthError::InvalidOtp);
        }

        tracing::info!(email = %email.masked(), "Password reset");
        Ok(())
    }

    /// Require the user to choose a new password at next login.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` if the user doesn't exist.
    pub async fn force_reset(&self, user_id: UserId) -> Result<(), AuthError> {
        self.users
            .set_reset_required(user_id, true)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => AuthError::UserNotFound,
                other => AuthError::Repository(other),
            })?;

        tracing::info!(user_id = %user_id, "Password reset forced");
        Ok(())
    }

    async fn issue_code(&self, email: &Email) -> Result<MockEmail, AuthError> {
        let otp = generate_otp();
        let expires_at = Utc::now() + self.otp_ttl;
        self.resets.create(email, &otp, expires_at).await?;

        tracing::info!(email = %email.masked(), "Reset code issued");
        Ok(mock_email(email, otp, expires_at, self.otp_ttl))
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Trimmed value of a required field.
fn required<'s>(field: &'static str, value: &'s str) -> Result<&'s str, AuthError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AuthError::MissingField(field));
    }
    Ok(trimmed)
}

/// Validate password strength.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }

    Ok(())
}

/// Hash a password using Argon2id.
fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

/// Random zero-padded numeric code.
fn generate_otp() -> String {
    let code: u32 = rand::rng().random_range(0..1_000_000);
    format!("{code:0width$}", width = OTP_DIGITS)
}

fn mock_email(to: &Email, otp: String, expires_at: DateTime<Utc>, ttl: TimeDelta) -> MockEmail {
    let minutes = ttl.num_minutes();
    MockEmail {
        from: MAIL_FROM.to_owned(),
        to: to.to_string(),
        subject: "Your password reset code".to_owned(),
        body: format!(
            "Your one-time password reset code is {otp}. It expires in {minutes} minutes."
        ),
        otp,
        expires_at,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_required_trims_and_rejects_blank() {
        assert_eq!(required("username", "  ana ").unwrap(), "ana");
        assert!(matches!(
            required("address", "   "),
            Err(AuthError::MissingField("address"))
        ));
    }

    #[test]
    fn test_validate_password_min_length() {
        assert!(validate_password("12345").is_err());
        assert!(validate_password("123456").is_ok());
    }

    #[test]
    fn test_hash_and_verify_password() {
        let hash = hash_password("correct horse").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("correct horse", &hash).is_ok());
        assert!(matches!(
            verify_password("wrong horse", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_verify_password_rejects_garbage_hash() {
        assert!(matches!(
            verify_password("anything", "not-a-phc-string"),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_generate_otp_is_six_digits() {
        for _ in 0..50 {
            let otp = generate_otp();
            assert_eq!(otp.len(), OTP_DIGITS);
            assert!(otp.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn test_mock_email_mentions_code() {
        let to = Email::parse("ana@example.com").unwrap();
        let expires_at = Utc::now();
        let mail = mock_email(&to, "042137".to_string(), expires_at, TimeDelta::minutes(10));
        assert_eq!(mail.to, "ana@example.com");
        assert_eq!(mail.from, MAIL_FROM);
        assert!(mail.body.contains("042137"));
        assert!(mail.body.contains("10 minutes"));
        assert_eq!(mail.otp, "042137");
    }
}
