//! Admin route handlers.
//!
//! Every handler requires the admin role via [`RequireAdmin`].

use axum::{
    Form, Json,
    extract::{Path, Query, State},
    response::Redirect,
};
use chrono::{NaiveDate, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tower_sessions::Session;
use tracing::instrument;

use grocer_core::{ProductId, UserId};

use crate::db::stats::{DailyRevenue, DashboardStats, Engagement};
use crate::db::{ProductRepository, RepositoryError, StatsRepository, UserRepository};
use crate::error::{AppError, Result};
use crate::middleware::{RequireAdmin, take_flash};
use crate::models::{FlashMessage, Product, ProductInput, User};
use crate::routes::redirect_with;
use crate::state::AppState;

const INVENTORY_PATH: &str = "/admin/inventory";

/// Default page size for the user list.
pub const DEFAULT_PAGE_SIZE: i64 = 20;

/// Smallest and largest page size accepted for the user list.
pub const PAGE_SIZE_RANGE: (i64, i64) = (5, 200);

/// Default revenue report length, in days, ending today.
pub const DEFAULT_REVENUE_DAYS: i64 = 30;

/// Window of the engagement report, in days.
pub const ENGAGEMENT_DAYS: i32 = 30;

// =============================================================================
// Query Types
// =============================================================================

/// `?page&limit` for the user list.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// `?start&end` (ISO dates) for the revenue report.
#[derive(Debug, Default, Deserialize)]
pub struct RangeQuery {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

/// Reset request body.
#[derive(Debug, Deserialize)]
pub struct ResetRequest {
    #[serde(default)]
    pub email: String,
}

/// Reset confirmation body.
#[derive(Debug, Deserialize)]
pub struct ConfirmReset {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub otp: String,
    #[serde(default)]
    pub new_password: String,
}

/// Normalize `page` and `limit`.
///
/// Pages start at 1. The limit falls back to [`DEFAULT_PAGE_SIZE`] and is
/// clamped to [`PAGE_SIZE_RANGE`].
#[must_use]
pub fn clamp_pagination(page: Option<i64>, limit: Option<i64>) -> (i64, i64) {
    let (min, max) = PAGE_SIZE_RANGE;
    let page = page.unwrap_or(1).max(1);
    let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(min, max);
    (page, limit)
}

/// Row offset of a page.
///
/// # Errors
///
/// Returns `AppError::BadRequest` if the offset does not fit in an `i64`.
pub fn page_offset(page: i64, limit: i64) -> Result<i64> {
    page.checked_sub(1)
        .and_then(|p| p.checked_mul(limit))
        .ok_or_else(|| AppError::BadRequest("page out of range".to_string()))
}

/// Resolve the revenue report range. Both ends are inclusive.
///
/// # Errors
///
/// Returns `AppError::BadRequest` if `start` is after `end`, or if the
/// default start would fall before the earliest representable date.
pub fn resolve_range(
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    today: NaiveDate,
) -> Result<(NaiveDate, NaiveDate)> {
    let end = end.unwrap_or(today);
    let start = match start {
        Some(start) => start,
        None => end
            .checked_sub_signed(TimeDelta::days(DEFAULT_REVENUE_DAYS - 1))
            .ok_or_else(|| AppError::BadRequest("end date out of range".to_string()))?,
    };
    if start > end {
        return Err(AppError::BadRequest(
            "start date must not be after end date".to_string(),
        ));
    }
    Ok((start, end))
}

// =============================================================================
// View Types
// =============================================================================

/// Inventory page.
#[derive(Debug, Serialize)]
pub struct InventoryView {
    pub products: Vec<Product>,
    pub low_stock_threshold: i32,
    pub flash: Vec<FlashMessage>,
}

/// One page of users.
#[derive(Debug, Serialize)]
pub struct UserPage {
    pub users: Vec<User>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
    pub pages: i64,
}

/// Revenue report.
#[derive(Debug, Serialize)]
pub struct RevenueReport {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub days: Vec<DailyRevenue>,
}

// =============================================================================
// Inventory
// =============================================================================

/// List every product.
#[instrument(skip(state, session, admin), fields(admin_id = %admin.id))]
pub async fn inventory(
    State(state): State<AppState>,
    session: Session,
    RequireAdmin(admin): RequireAdmin,
) -> Result<Json<InventoryView>> {
    let products = ProductRepository::new(state.pool()).list(None).await?;

    Ok(Json(InventoryView {
        products,
        low_stock_threshold: state.config().low_stock_threshold,
        flash: take_flash(&session).await,
    }))
}

/// Create a product.
#[instrument(skip(state, session, admin, input), fields(admin_id = %admin.id))]
pub async fn create_product(
    State(state): State<AppState>,
    session: Session,
    RequireAdmin(admin): RequireAdmin,
    Form(input): Form<ProductInput>,
) -> Result<Redirect> {
    let input = match input.validated() {
        Ok(input) => input,
        Err(e) => {
            return redirect_with(&session, INVENTORY_PATH, [FlashMessage::error(e.to_string())])
                .await;
        }
    };

    let product = ProductRepository::new(state.pool()).create(&input).await?;
    tracing::info!(product_id = %product.id, "Product created");

    redirect_with(
        &session,
        INVENTORY_PATH,
        [FlashMessage::success(format!("Added {}", product.name))],
    )
    .await
}

/// Update a product.
#[instrument(skip(state, session, admin, input), fields(admin_id = %admin.id, product_id = %id))]
pub async fn update_product(
    State(state): State<AppState>,
    session: Session,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<ProductId>,
    Form(input): Form<ProductInput>,
) -> Result<Redirect> {
    let input = match input.validated() {
        Ok(input) => input,
        Err(e) => {
            return redirect_with(&session, INVENTORY_PATH, [FlashMessage::error(e.to_string())])
                .await;
        }
    };

    let product = ProductRepository::new(state.pool())
        .update(id, &input)
        .await
        .map_err(|e| match e {
            RepositoryError::NotFound => AppError::NotFound(format!("product {id}")),
            other => other.into(),
        })?;
    tracing::info!("Product updated");

    redirect_with(
        &session,
        INVENTORY_PATH,
        [FlashMessage::success(format!("Updated {}", product.name))],
    )
    .await
}

/// Delete a product. Products that appear in orders are kept.
#[instrument(skip(state, session, admin), fields(admin_id = %admin.id, product_id = %id))]
pub async fn delete_product(
    State(state): State<AppState>,
    session: Session,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<ProductId>,
) -> Result<Redirect> {
    let message = match ProductRepository::new(state.pool()).delete(id).await {
        Ok(()) => {
            tracing::info!("Product deleted");
            FlashMessage::success("Product deleted")
        }
        Err(RepositoryError::NotFound) => {
            return Err(AppError::NotFound(format!("product {id}")));
        }
        Err(RepositoryError::Conflict(msg)) => {
            FlashMessage::error(format!("Cannot delete: {msg}"))
        }
        Err(e) => return Err(e.into()),
    };

    redirect_with(&session, INVENTORY_PATH, [message]).await
}

// =============================================================================
// Reports
// =============================================================================

/// Dashboard counters.
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn stats(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
) -> Result<Json<DashboardStats>> {
    let stats = StatsRepository::new(state.pool())
        .dashboard(state.config().low_stock_threshold)
        .await?;
    Ok(Json(stats))
}

/// Paginated user list, newest first.
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn users(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Query(query): Query<PageQuery>,
) -> Result<Json<UserPage>> {
    let (page, limit) = clamp_pagination(query.page, query.limit);
    let offset = page_offset(page, limit)?;
    let (users, total) = UserRepository::new(state.pool())
        .list_page(limit, offset)
        .await?;

    Ok(Json(UserPage {
        users,
        total,
        page,
        limit,
        pages: (total + limit - 1) / limit,
    }))
}

/// Revenue per day over an inclusive date range.
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn revenue(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Query(query): Query<RangeQuery>,
) -> Result<Json<RevenueReport>> {
    let (start, end) = resolve_range(query.start, query.end, Utc::now().date_naive())?;
    let days = StatsRepository::new(state.pool())
        .revenue_by_day(start, end)
        .await?;

    Ok(Json(RevenueReport { start, end, days }))
}

/// Shopper activity over the last 30 days.
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn engagement(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
) -> Result<Json<Engagement>> {
    let engagement = StatsRepository::new(state.pool())
        .engagement(ENGAGEMENT_DAYS)
        .await?;
    Ok(Json(engagement))
}

// =============================================================================
// Password Resets
// =============================================================================

/// Issue a reset code for an existing account.
#[instrument(skip_all)]
pub async fn request_reset(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(body): Json<ResetRequest>,
) -> Result<Json<Value>> {
    let mock_email = state.auth().admin_request_reset(&body.email).await?;
    tracing::info!(admin_id = %admin.id, "Admin issued reset code");

    Ok(Json(json!({ "success": true, "mock_email": mock_email })))
}

/// Redeem a reset code on a user's behalf.
#[instrument(skip_all)]
pub async fn confirm_reset(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(body): Json<ConfirmReset>,
) -> Result<Json<Value>> {
    state
        .auth()
        .reset_password(&body.email, &body.otp, &body.new_password)
        .await?;
    tracing::info!(admin_id = %admin.id, "Admin confirmed password reset");

    Ok(Json(json!({
        "success": true,
        "message": "Password reset successful",
    })))
}

/// Require a user to choose a new password at next login.
#[instrument(skip(state, session, admin), fields(admin_id = %admin.id, user_id = %user_id))]
pub async fn force_reset(
    State(state): State<AppState>,
    session: Session,
    RequireAdmin(admin): RequireAdmin,
    Path(user_id): Path<UserId>,
) -> Result<Redirect> {
    state.auth().force_reset(user_id).await?;

    redirect_with(
        &session,
        "/admin/users",
        [FlashMessage::success(
            "User must reset their password at next login",
        )],
    )
    .await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_clamp_pagination_defaults() {
        assert_eq!(clamp_pagination(None, None), (1, 20));
    }

    #[test]
    fn test_clamp_pagination_bounds() {
        assert_eq!(clamp_pagination(Some(0), Some(1)), (1, 5));
        assert_eq!(clamp_pagination(Some(-3), Some(1000)), (1, 200));
        assert_eq!(clamp_pagination(Some(4), Some(50)), (4, 50));
    }

    #[test]
    fn test_page_offset() {
        assert_eq!(page_offset(1, 20).unwrap(), 0);
        assert_eq!(page_offset(3, 20).unwrap(), 40);
    }

    #[test]
    fn test_page_offset_rejects_overflow() {
        let (page, limit) = clamp_pagination(Some(i64::MAX), None);
        let err = page_offset(page, limit).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn test_resolve_range_defaults_to_last_30_days() {
        let today = date("2026-03-31");
        let (start, end) = resolve_range(None, None, today).unwrap();
        assert_eq!(end, today);
        assert_eq!(start, date("2026-03-02"));
        assert_eq!((end - start).num_days() + 1, DEFAULT_REVENUE_DAYS);
    }

    #[test]
    fn test_resolve_range_explicit() {
        let (start, end) = resolve_range(
            Some(date("2026-01-01")),
            Some(date("2026-01-01")),
            date("2026-03-31"),
        )
        .unwrap();
        assert_eq!(start, end);
    }

    #[test]
    fn test_resolve_range_rejects_inverted() {
        let err = resolve_range(
            Some(date("2026-02-01")),
            Some(date("2026-01-01")),
            date("2026-03-31"),
        )
        .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn test_resolve_range_rejects_earliest_end() {
        let err = resolve_range(None, Some(NaiveDate::MIN), date("2026-03-31")).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));

        let (start, end) =
            resolve_range(Some(NaiveDate::MIN), Some(NaiveDate::MIN), date("2026-03-31")).unwrap();
        assert_eq!((start, end), (NaiveDate::MIN, NaiveDate::MIN));
    }

    #[test]
    fn test_range_query_parses_extreme_dates() {
        let query: RangeQuery = serde_json::from_str(r#"{"end":"-262143-01-01"}"#).unwrap();
        let err = resolve_range(query.start, query.end, date("2026-03-31")).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }
}
