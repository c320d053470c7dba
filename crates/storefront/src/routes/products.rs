//! Catalog route handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tower_sessions::Session;
use tracing::instrument;

use grocer_core::ProductId;

use crate::db::ProductRepository;
use crate::error::{AppError, Result};
use crate::middleware::{OptionalAuth, take_flash};
use crate::models::{CurrentUser, FlashMessage, Product};
use crate::state::AppState;

/// Query parameters for the product listing.
#[derive(Debug, Default, Deserialize)]
pub struct ProductQuery {
    pub category: Option<String>,
}

impl ProductQuery {
    fn category(&self) -> Option<&str> {
        self.category
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
    }
}

/// Product listing page.
#[derive(Debug, Serialize)]
pub struct ProductListView {
    pub products: Vec<Product>,
    pub categories: Vec<String>,
    pub selected_category: Option<String>,
    pub current_user: Option<CurrentUser>,
    pub flash: Vec<FlashMessage>,
}

/// Product detail page.
#[derive(Debug, Serialize)]
pub struct ProductView {
    pub product: Product,
    pub category: String,
    pub in_stock: bool,
    pub flash: Vec<FlashMessage>,
}

/// Display the product listing, optionally filtered by category.
#[instrument(skip(state, session, user))]
pub async fn index(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Query(query): Query<ProductQuery>,
) -> Result<Json<ProductListView>> {
    let repo = ProductRepository::new(state.pool());
    let selected_category = query.category().map(str::to_owned);
    let products = repo.list(selected_category.as_deref()).await?;
    let categories = repo.categories().await?;

    Ok(Json(ProductListView {
        products,
        categories,
        selected_category,
        current_user: user,
        flash: take_flash(&session).await,
    }))
}

/// Display a single product.
#[instrument(skip(state, session), fields(product_id = %id))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<ProductId>,
) -> Result<Json<ProductView>> {
    let product = ProductRepository::new(state.pool())
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("product {id}")))?;

    Ok(Json(ProductView {
        category: product.category_label().to_owned(),
        in_stock: product.in_stock(),
        product,
        flash: take_flash(&session).await,
    }))
}

/// Sorted distinct category labels.
#[instrument(skip(state))]
pub async fn categories(State(state): State<AppState>) -> Result<Json<Vec<String>>> {
    let categories = ProductRepository::new(state.pool()).categories().await?;
    Ok(Json(categories))
}

/// Product listing in the API envelope.
#[instrument(skip(state))]
pub async fn api_index(
    State(state): State<AppState>,
    Query(query): Query<ProductQuery>,
) -> Result<Json<Value>> {
    let products = ProductRepository::new(state.pool())
        .list(query.category())
        .await?;

    Ok(Json(json!({ "success": true, "data": products })))
}
