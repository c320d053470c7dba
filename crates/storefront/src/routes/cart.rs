//! Cart route handlers.
//!
//! Every handler requires a logged-in user. Adding to the cart answers with
//! JSON for AJAX clients so the page can update without a reload.

use axum::{
    Form, Json,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_sessions::Session;
use tracing::instrument;

use grocer_core::ProductId;

use crate::db::{CartRepository, ProductRepository};
use crate::error::{AppError, Result};
use crate::middleware::{RequireAuth, take_flash};
use crate::models::cart::addable_quantity;
use crate::models::{CartSummary, FlashMessage};
use crate::routes::{redirect_with, wants_json};
use crate::state::AppState;

/// Shown when nothing more of a product can be added.
pub const OUT_OF_STOCK_MESSAGE: &str = "Out of Stock";

/// Add/update form data. Quantities arrive as text so blank or malformed
/// values fall back instead of rejecting the request.
#[derive(Debug, Default, Deserialize)]
pub struct QuantityForm {
    pub quantity: Option<String>,
}

impl QuantityForm {
    fn parsed(&self) -> Option<i32> {
        self.quantity.as_deref().and_then(|q| q.trim().parse().ok())
    }

    /// Requested units to add: default 1, at least 1.
    fn to_add(&self) -> i32 {
        self.parsed().unwrap_or(1).max(1)
    }

    /// Requested line quantity: default 0 (remove), never negative.
    fn to_set(&self) -> i32 {
        self.parsed().unwrap_or(0).max(0)
    }
}

/// Cart page.
#[derive(Debug, Serialize)]
pub struct CartView {
    #[serde(flatten)]
    pub summary: CartSummary,
    pub flash: Vec<FlashMessage>,
}

/// Display the cart.
#[instrument(skip(state, session, user), fields(user_id = %user.id))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
) -> Result<Json<CartView>> {
    let lines = CartRepository::new(state.pool()).lines(user.id).await?;

    Ok(Json(CartView {
        summary: CartSummary::from_lines(lines),
        flash: take_flash(&session).await,
    }))
}

/// Number of distinct lines in the cart.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn count(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<serde_json::Value>> {
    let count = CartRepository::new(state.pool()).count(user.id).await?;
    Ok(Json(json!({ "count": count })))
}

/// Add a product to the cart, clamped to what is left in stock.
#[instrument(skip(state, session, user, headers, form), fields(user_id = %user.id))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Path(product_id): Path<ProductId>,
    headers: HeaderMap,
    Form(form): Form<QuantityForm>,
) -> Result<Response> {
    let product = ProductRepository::new(state.pool())
        .get(product_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("product {product_id}")))?;

    let cart = CartRepository::new(state.pool());
    let in_cart = cart.quantity_of(user.id, product_id).await?;
    let qty = addable_quantity(product.stock_quantity, in_cart, form.to_add());
    let json = wants_json(&headers);

    if qty == 0 {
        tracing::info!(product_id = %product_id, in_cart, "Add to cart rejected: out of stock");
        if json {
            let body = Json(json!({ "success": false, "error": OUT_OF_STOCK_MESSAGE }));
            return Ok((StatusCode::BAD_REQUEST, body).into_response());
        }
        let redirect = redirect_with(
            &session,
            "/products",
            [FlashMessage::error(OUT_OF_STOCK_MESSAGE)],
        )
        .await?;
        return Ok(redirect.into_response());
    }

    cart.add(user.id, product_id, qty).await?;
    let cart_count = cart.count(user.id).await?;
    tracing::info!(product_id = %product_id, qty, "Added to cart");

    if json {
        return Ok(Json(json!({
            "success": true,
            "qty": qty,
            "product_name": product.name,
            "cart_count": cart_count,
        }))
        .into_response());
    }

    let message = format!("Added {qty} × {} to cart", product.name);
    Ok(redirect_with(&session, "/cart", [FlashMessage::success(message)])
        .await?
        .into_response())
}

/// Set a line's quantity, clamped to stock. Zero removes the line.
#[instrument(skip(state, session, user, form), fields(user_id = %user.id))]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Path(product_id): Path<ProductId>,
    Form(form): Form<QuantityForm>,
) -> Result<Response> {
    let product = ProductRepository::new(state.pool())
        .get(product_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("product {product_id}")))?;

    let requested = form.to_set();
    let qty = addable_quantity(product.stock_quantity, 0, requested);
    CartRepository::new(state.pool())
        .set_quantity(user.id, product_id, qty)
        .await?;

    let message = if qty == 0 {
        FlashMessage::success("Item removed from cart")
    } else if qty < requested {
        FlashMessage::info(format!(
            "Only {qty} × {} available; quantity adjusted",
            product.name
        ))
    } else {
        FlashMessage::success("Cart updated")
    };

    Ok(redirect_with(&session, "/cart", [message])
        .await?
        .into_response())
}

/// Remove a product from the cart.
#[instrument(skip(state, session, user), fields(user_id = %user.id))]
pub async fn remove(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Path(product_id): Path<ProductId>,
) -> Result<Response> {
    CartRepository::new(state.pool())
        .remove(user.id, product_id)
        .await?;

    Ok(
        redirect_with(&session, "/cart", [FlashMessage::success("Item removed from cart")])
            .await?
            .into_response(),
    )
}

/// Empty the cart.
#[instrument(skip(state, session, user), fields(user_id = %user.id))]
pub async fn clear(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
) -> Result<Response> {
    CartRepository::new(state.pool()).clear(user.id).await?;

    Ok(
        redirect_with(&session, "/cart", [FlashMessage::success("Cart cleared")])
            .await?
            .into_response(),
    )
}
