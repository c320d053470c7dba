//! Forced password reset gate.
//!
//! While the logged-in user has `reset_required` set, every page except the
//! reset flow itself redirects to the reset form.

use axum::{
    extract::Request,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use crate::models::{CurrentUser, session_keys};

/// Where gated users are sent.
pub const FORCED_RESET_PATH: &str = "/reset-password?forced=true";

const EXEMPT_PATHS: &[&str] = &[
    "/auth/logout",
    "/reset-password",
    "/auth/reset-password",
    "/auth/forgot-password",
];

const EXEMPT_PREFIXES: &[&str] = &["/api/", "/health"];

/// Whether `path` stays reachable during a forced reset.
#[must_use]
pub fn is_exempt(path: &str) -> bool {
    EXEMPT_PATHS.contains(&path) || EXEMPT_PREFIXES.iter().any(|p| path.starts_with(p))
}

/// Middleware redirecting users with a pending forced reset.
///
/// Must run inside the session layer.
pub async fn password_reset_gate(request: Request, next: Next) -> Response {
    if is_exempt(request.uri().path()) {
        return next.run(request).await;
    }

    let user = match request.extensions().get::<Session>().cloned() {
        Some(session) => session
            .get::<CurrentUser>(session_keys::CURRENT_USER)
            .await
            .ok()
            .flatten(),
        None => None,
    };

    if user.is_some_and(|u| u.reset_required) {
        return Redirect::to(FORCED_RESET_PATH).into_response();
    }

    next.run(request).await
}
