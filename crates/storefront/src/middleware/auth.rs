//! Authentication middleware and extractors.
//!
//! Provides extractors for requiring a logged-in user (and optionally the
//! admin role) in route handlers.

use axum::{
    extract::FromRequestParts,
    http::{Method, StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use crate::middleware::flash::push_flash;
use crate::models::{CurrentUser, FlashMessage, session_keys};

/// Login page path.
pub const LOGIN_PATH: &str = "/auth/login";

/// Shown when a guest opens a protected page.
pub const LOGIN_REQUIRED_MESSAGE: &str = "Please log in to view this resource";

/// Shown when a shopper opens an admin page.
pub const ACCESS_DENIED_MESSAGE: &str = "Access denied";

/// Extractor that requires a logged-in user.
///
/// Guests are redirected to the login page with a flash message and the
/// requested path remembered for after login. `/api/` requests get `401`.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireAuth(user): RequireAuth,
/// ) -> impl IntoResponse {
///     format!("Hello, {}!", user.username)
/// }
/// ```
pub struct RequireAuth(pub CurrentUser);

/// Extractor that requires a logged-in admin.
///
/// Non-admins are redirected to `/products` with an "Access denied" flash.
pub struct RequireAdmin(pub CurrentUser);

/// Rejection for [`RequireAuth`] and [`RequireAdmin`].
pub enum AuthRejection {
    /// Redirect to login page (for browser requests).
    RedirectToLogin,
    /// Redirect away from an admin page.
    RedirectForbidden,
    /// Unauthorized response (for API requests).
    Unauthorized,
    /// Forbidden response (for API requests).
    Forbidden,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin => Redirect::to(LOGIN_PATH).into_response(),
            Self::RedirectForbidden => Redirect::to("/products").into_response(),
            Self::Unauthorized => StatusCode::UNAUTHORIZED.into_response(),
            Self::Forbidden => StatusCode::FORBIDDEN.into_response(),
        }
    }
}

fn is_api(parts: &Parts) -> bool {
    parts.uri.path().starts_with("/api/")
}

async fn session_user(session: &Session) -> Option<CurrentUser> {
    session
        .get::<CurrentUser>(session_keys::CURRENT_USER)
        .await
        .ok()
        .flatten()
}

async fn reject_guest(parts: &Parts, session: &Session) -> AuthRejection {
    if is_api(parts) {
        return AuthRejection::Unauthorized;
    }

    if parts.method == Method::GET {
        let return_to = parts
            .uri
            .path_and_query()
            .map_or_else(|| parts.uri.path().to_owned(), |pq| pq.as_str().to_owned());
        if let Err(e) = session.insert(session_keys::RETURN_TO, return_to).await {
            tracing::warn!(error = %e, "Failed to store return path");
        }
    }
    if let Err(e) = push_flash(session, [FlashMessage::error(LOGIN_REQUIRED_MESSAGE)]).await {
        tracing::warn!(error = %e, "Failed to store flash message");
    }

    AuthRejection::RedirectToLogin
}

impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Get the session from extensions (set by SessionManagerLayer)
        let session = parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or(AuthRejection::Unauthorized)?;

        match session_user(&session).await {
            Some(user) => Ok(Self(user)),
            None => Err(reject_guest(parts, &session).await),
        }
    }
}

impl<S> FromRequestParts<S> for RequireAdmin
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let RequireAuth(user) = RequireAuth::from_request_parts(parts, state).await?;
        if user.is_admin() {
            return Ok(Self(user));
        }

        tracing::warn!(user_id = %user.id, path = %parts.uri.path(), "Admin access denied");
        if is_api(parts) {
            return Err(AuthRejection::Forbidden);
        }
        if let Some(session) = parts.extensions.get::<Session>().cloned()
            && let Err(e) = push_flash(&session, [FlashMessage::error(ACCESS_DENIED_MESSAGE)]).await
        {
            tracing::warn!(error = %e, "Failed to store flash message");
        }
        Err(AuthRejection::RedirectForbidden)
    }
}

/// Extractor that optionally gets the current user.
///
/// Unlike `RequireAuth`, this does not reject the request if the user is not logged in.
pub struct OptionalAuth(pub Option<CurrentUser>);

impl<S> FromRequestParts<S> for OptionalAuth
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = match parts.extensions.get::<Session>().cloned() {
            Some(session) => session_user(&session).await,
            None => None,
        };

        Ok(Self(user))
    }
}

/// Store the logged-in user in the session.
///
/// The session id is cycled first to prevent fixation.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_user(
    session: &Session,
    user: &CurrentUser,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(session_keys::CURRENT_USER, user).await
}

/// Replace the stored user without cycling the session id.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn refresh_current_user(
    session: &Session,
    user: &CurrentUser,
) -> Result<(), tower_sessions::session::Error> {
    session.insert(session_keys::CURRENT_USER, user).await
}

/// Take the remembered post-login path, if any.
pub async fn take_return_to(session: &Session) -> Option<String> {
    session
        .remove::<String>(session_keys::RETURN_TO)
        .await
        .ok()
        .flatten()
        .filter(|path| path.starts_with('/') && !path.starts_with("//"))
}

/// Drop all session data (logout).
///
/// # Errors
///
/// Returns an error if the session store cannot be updated.
pub async fn clear_current_user(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.flush().await
}
