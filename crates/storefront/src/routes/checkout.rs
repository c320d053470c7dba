//! Checkout route handlers.

use axum::{
    Form, Json,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use serde::Serialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::Result;
use crate::middleware::{RequireAuth, push_flash, push_flash_or_log, take_flash};
use crate::models::{CartSummary, CheckoutForm, CurrentUser, FlashMessage, RequestContext};
use crate::routes::redirect_with;
use crate::services::checkout::CheckoutError;
use crate::state::AppState;

/// Checkout page: what will be charged.
#[derive(Debug, Serialize)]
pub struct CheckoutView {
    #[serde(flatten)]
    pub summary: CartSummary,
    pub user: CurrentUser,
    pub flash: Vec<FlashMessage>,
}

/// Display the checkout summary, or send the user back to an empty cart.
#[instrument(skip(state, session, user), fields(user_id = %user.id))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
) -> Result<Response> {
    let ctx = RequestContext::new(user);

    match state.checkout().summary(&ctx).await {
        Ok(summary) => Ok(Json(CheckoutView {
            summary,
            user: ctx.user,
            flash: take_flash(&session).await,
        })
        .into_response()),
        Err(CheckoutError::Transient(e)) => Err(e.into()),
        Err(err) => {
            push_flash(&session, [err.flash()]).await?;
            Ok(Redirect::to("/cart").into_response())
        }
    }
}

/// Place the order.
///
/// Success lands on the receipt; any failure returns to the cart with the
/// reason flashed. Nothing is written on failure.
#[instrument(skip(state, session, user, form), fields(user_id = %user.id))]
pub async fn place_order(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Form(form): Form<CheckoutForm>,
) -> Result<Redirect> {
    let request = match form.into_request() {
        Ok(request) => request,
        Err(e) => {
            tracing::info!(field = e.field, "Checkout form rejected");
            return redirect_with(&session, "/cart", [FlashMessage::error(e.to_string())]).await;
        }
    };

    let mut ctx = RequestContext::new(user);
    let result = state.checkout().checkout(&mut ctx, &request).await;

    // The order may already be committed
    push_flash_or_log(&session, ctx.take_messages()).await;

    Ok(match result {
        Ok(order_id) => Redirect::to(&format!("/orders/{order_id}")),
        Err(_) => Redirect::to("/cart"),
    })
}
