//! Authentication route handlers.
//!
//! Login and registration are browser form flows answered with redirects.
//! The password reset endpoints speak JSON.

use axum::{
    Form, Json,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tower_sessions::Session;
use tracing::instrument;

use crate::error::{AppError, Result, clear_sentry_user, set_sentry_user};
use crate::middleware::password_reset::FORCED_RESET_PATH;
use crate::middleware::{
    OptionalAuth, clear_current_user, refresh_current_user, set_current_user, take_flash,
    take_return_to,
};
use crate::models::{CurrentUser, FlashMessage};
use crate::routes::redirect_with;
use crate::services::auth::{AuthError, Registration};
use crate::state::AppState;

/// Flash shown after a successful registration.
pub const REGISTERED_MESSAGE: &str = "Registration successful! Please log in.";

// =============================================================================
// Form Types
// =============================================================================

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

/// Reset request body.
#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    #[serde(default)]
    pub email: String,
}

/// Reset confirmation body.
#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub otp: String,
    #[serde(default)]
    pub new_password: String,
}

/// Query for the reset page.
#[derive(Debug, Default, Deserialize)]
pub struct ResetPageQuery {
    #[serde(default)]
    pub forced: bool,
}

/// Login and register pages.
#[derive(Debug, Serialize)]
pub struct AuthPageView {
    pub current_user: Option<CurrentUser>,
    pub flash: Vec<FlashMessage>,
}

/// Reset password page.
#[derive(Debug, Serialize)]
pub struct ResetPageView {
    pub forced: bool,
    /// Prefilled for a logged-in user.
    pub email: Option<String>,
    pub flash: Vec<FlashMessage>,
}

/// Where a freshly logged-in user lands.
fn landing_path(user: &CurrentUser, return_to: Option<String>) -> String {
    if user.reset_required {
        return FORCED_RESET_PATH.to_owned();
    }
    if let Some(path) = return_to {
        return path;
    }
    if user.is_admin() {
        "/admin/inventory".to_owned()
    } else {
        "/products".to_owned()
    }
}

// =============================================================================
// Login Routes
// =============================================================================

/// Display the login page.
pub async fn login_page(session: Session, OptionalAuth(user): OptionalAuth) -> Json<AuthPageView> {
    Json(AuthPageView {
        current_user: user,
        flash: take_flash(&session).await,
    })
}

/// Handle login form submission.
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Result<Redirect> {
    let user = match state.auth().login(&form.email, &form.password).await {
        Ok(user) => user,
        Err(AuthError::InvalidCredentials) => {
            tracing::info!("Login failed");
            let message = AppError::from(AuthError::InvalidCredentials).public_message();
            return redirect_with(&session, "/auth/login", [FlashMessage::error(message)]).await;
        }
        Err(e) => return Err(e.into()),
    };

    let current = CurrentUser::from(&user);
    let return_to = take_return_to(&session).await;
    set_current_user(&session, &current).await?;
    set_sentry_user(&current.id, Some(current.email.as_str()));
    tracing::info!(user_id = %current.id, "User logged in");

    let target = landing_path(&current, return_to);
    redirect_with(
        &session,
        &target,
        [FlashMessage::success(format!("Welcome back, {}", current.username))],
    )
    .await
}

// =============================================================================
// Registration Routes
// =============================================================================

/// Display the registration page.
pub async fn register_page(
    session: Session,
    OptionalAuth(user): OptionalAuth,
) -> Json<AuthPageView> {
    Json(AuthPageView {
        current_user: user,
        flash: take_flash(&session).await,
    })
}

/// Handle registration form submission.
#[instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<Registration>,
) -> Result<Redirect> {
    match state.auth().register(&form).await {
        Ok(_) => {
            redirect_with(&session, "/auth/login", [FlashMessage::success(REGISTERED_MESSAGE)])
                .await
        }
        Err(e) if e.is_client_error() => {
            let message = AppError::from(e).public_message();
            redirect_with(&session, "/auth/register", [FlashMessage::error(message)]).await
        }
        Err(e) => Err(e.into()),
    }
}

// =============================================================================
// Logout Route
// =============================================================================

/// Handle logout by destroying the whole session.
pub async fn logout(session: Session) -> Response {
    if let Err(e) = clear_current_user(&session).await {
        tracing::error!(error = %e, "Failed to flush session");
    }
    clear_sentry_user();

    Redirect::to("/").into_response()
}

// =============================================================================
// Password Reset Routes
// =============================================================================

/// Display the reset page. `?forced=true` marks an admin-forced reset.
pub async fn reset_password_page(
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Query(query): Query<ResetPageQuery>,
) -> Json<ResetPageView> {
    let forced = query.forced || user.as_ref().is_some_and(|u| u.reset_required);

    Json(ResetPageView {
        forced,
        email: user.map(|u| u.email.into_inner()),
        flash: take_flash(&session).await,
    })
}

/// Issue a reset code.
///
/// Answers the same way whether or not the account exists; `mock_email` is
/// `null` for unknown addresses.
#[instrument(skip_all)]
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(body): Json<ForgotPasswordRequest>,
) -> Result<Json<Value>> {
    let mock_email = state.auth().request_password_reset(&body.email).await?;

    Ok(Json(json!({
        "success": true,
        "message": "If an account exists for this email, a reset code has been sent.",
        "mock_email": mock_email,
    })))
}

/// Redeem a reset code and set a new password.
///
/// A logged-in user resetting their own password has the forced-reset flag
/// cleared from the session as well.
#[instrument(skip_all)]
pub async fn reset_password(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Json(body): Json<ResetPasswordRequest>,
) -> Result<Json<Value>> {
    state
        .auth()
        .reset_password(&body.email, &body.otp, &body.new_password)
        .await?;

    if let Some(mut current) = user
        && current.email.as_str() == body.email.trim().to_lowercase()
    {
        current.reset_required = false;
        refresh_current_user(&session, &current).await?;
    }

    Ok(Json(json!({
        "success": true,
        "message": "Password reset successful",
    })))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use grocer_core::{Email, UserId, UserRole};

    use super::*;

    fn user(role: UserRole, reset_required: bool) -> CurrentUser {
        CurrentUser {
            id: UserId::new(1),
            username: "ana".to_string(),
            email: Email::parse("ana@example.com").unwrap(),
            role,
            reset_required,
        }
    }

    #[test]
    fn test_landing_path_by_role() {
        assert_eq!(landing_path(&user(UserRole::User, false), None), "/products");
        assert_eq!(
            landing_path(&user(UserRole::Admin, false), None),
            "/admin/inventory"
        );
    }

    #[test]
    fn test_landing_path_prefers_return_to() {
        assert_eq!(
            landing_path(&user(UserRole::User, false), Some("/checkout".to_string())),
            "/checkout"
        );
    }

    #[test]
    fn test_forced_reset_wins() {
        assert_eq!(
            landing_path(&user(UserRole::Admin, true), Some("/orders".to_string())),
            FORCED_RESET_PATH
        );
    }
}
