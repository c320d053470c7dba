//! Profile route handlers.

use axum::{Form, Json, extract::State, response::Redirect};
use serde::Serialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::Result;
use crate::middleware::{RequireAuth, refresh_current_user, take_flash};
use crate::models::{CurrentUser, FlashMessage, User};
use crate::routes::redirect_with;
use crate::services::auth::ProfileUpdate;
use crate::state::AppState;

/// Profile page.
#[derive(Debug, Serialize)]
pub struct ProfileView {
    pub user: User,
    pub flash: Vec<FlashMessage>,
}

/// Display the current user's profile.
#[instrument(skip(state, session, user), fields(user_id = %user.id))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
) -> Result<Json<ProfileView>> {
    let user = state.auth().get_user(user.id).await?;

    Ok(Json(ProfileView {
        user,
        flash: take_flash(&session).await,
    }))
}

/// Save profile edits. Blank fields keep their current value.
#[instrument(skip(state, session, user, form), fields(user_id = %user.id))]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Form(form): Form<ProfileUpdate>,
) -> Result<Redirect> {
    let updated = state.auth().update_profile(user.id, &form).await?;
    refresh_current_user(&session, &CurrentUser::from(&updated)).await?;

    redirect_with(&session, "/profile", [FlashMessage::success("Profile updated")]).await
}
