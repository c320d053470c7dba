//! Order history and receipt route handlers.

use axum::{
    Json,
    extract::{Path, State},
};
use rust_decimal::Decimal;
use serde::Serialize;
use tower_sessions::Session;
use tracing::instrument;

use grocer_core::OrderId;

use crate::db::OrderRepository;
use crate::error::{AppError, Result};
use crate::middleware::{RequireAuth, take_flash};
use crate::models::{
    CurrentUser, FlashMessage, Order, OrderLine, Payment, Receipt, ShippingDetails,
};
use crate::state::AppState;

/// Order history page.
#[derive(Debug, Serialize)]
pub struct OrderListView {
    pub orders: Vec<Order>,
    pub flash: Vec<FlashMessage>,
}

/// Receipt line with its computed total.
#[derive(Debug, Serialize)]
pub struct ReceiptLineView {
    #[serde(flatten)]
    pub line: OrderLine,
    pub line_total: Decimal,
}

/// Receipt page.
#[derive(Debug, Serialize)]
pub struct ReceiptView {
    pub order: Order,
    pub items: Vec<ReceiptLineView>,
    pub payment: Option<Payment>,
    pub shipping: Option<ShippingDetails>,
    pub flash: Vec<FlashMessage>,
}

impl ReceiptView {
    fn new(receipt: Receipt, flash: Vec<FlashMessage>) -> Self {
        Self {
            order: receipt.order,
            items: receipt
                .items
                .into_iter()
                .map(|line| ReceiptLineView {
                    line_total: line.line_total(),
                    line,
                })
                .collect(),
            payment: receipt.payment,
            shipping: receipt.shipping,
            flash,
        }
    }
}

/// Whether `user` may read `order`.
fn can_view(user: &CurrentUser, order: &Order) -> bool {
    order.user_id == user.id || user.is_admin()
}

/// Display the current user's orders, newest first.
#[instrument(skip(state, session, user), fields(user_id = %user.id))]
pub async fn index(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
) -> Result<Json<OrderListView>> {
    let orders = OrderRepository::new(state.pool())
        .list_for_user(user.id)
        .await?;

    Ok(Json(OrderListView {
        orders,
        flash: take_flash(&session).await,
    }))
}

/// Display a receipt. Only the owner or an admin may see it.
#[instrument(skip(state, session, user), fields(user_id = %user.id, order_id = %id))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Path(id): Path<OrderId>,
) -> Result<Json<ReceiptView>> {
    let receipt = OrderRepository::new(state.pool())
        .receipt(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("order {id}")))?;

    if !can_view(&user, &receipt.order) {
        tracing::warn!("Receipt access denied");
        return Err(AppError::Forbidden("Access denied".to_string()));
    }

    Ok(Json(ReceiptView::new(receipt, take_flash(&session).await)))
}
