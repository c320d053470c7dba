//! Inventory guard: lock the cart's product rows and check stock.

use rust_decimal::Decimal;
use sqlx::PgConnection;

use grocer_core::{ProductId, UserId};

use super::CheckoutError;

/// A cart line read under lock, with the product's current stock and price.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct LockedLine {
    pub product_id: ProductId,
    pub quantity: i32,
    pub product_name: String,
    pub stock_quantity: i32,
    pub unit_price: Decimal,
}

/// Cart lines whose quantities all fit within the locked stock.
///
/// Only [`verify_stock`] constructs this, so the committer cannot be handed
/// an unchecked cart.
#[derive(Debug, Clone)]
pub struct VerifiedCart {
    lines: Vec<LockedLine>,
}

impl VerifiedCart {
    #[must_use]
    pub fn lines(&self) -> &[LockedLine] {
        &self.lines
    }
}

/// Read the user's cart joined with product stock, locking every row read.
///
/// Rows are locked in product id order so concurrent checkouts over
/// overlapping carts acquire locks in the same order. Under READ COMMITTED
/// a checkout that waited on a lock sees the stock as committed by the
/// transaction it waited for.
///
/// # Errors
///
/// Returns `sqlx::Error` if the query fails (including lock timeouts).
pub async fn lock_cart_lines(
    conn: &mut PgConnection,
    user_id: UserId,
) -> Result<Vec<LockedLine>, sqlx::Error> {
    sqlx::query_as::<_, LockedLine>(
        r"
        SELECT ci.product_id, ci.quantity, p.name AS product_name,
               p.stock_quantity, p.price AS unit_price
        FROM cart_items ci
        JOIN products p ON p.id = ci.product_id
        WHERE ci.user_id = $1
        ORDER BY p.id
        FOR UPDATE
        ",
    )
    .bind(user_id)
    .fetch_all(conn)
    .await
}

/// Check every line against its locked stock, stopping at the first shortfall.
///
/// # Errors
///
/// Returns `CheckoutError::EmptyCart` for an empty cart and
/// `CheckoutError::InsufficientStock` for the first line that asks for more
/// than is available.
pub fn verify_stock(lines: Vec<LockedLine>) -> Result<VerifiedCart, CheckoutError> {
    if lines.is_empty() {
        return Err(CheckoutError::EmptyCart);
    }

    if let Some(short) = lines.iter().find(|l| l.quantity > l.stock_quantity) {
        return Err(CheckoutError::InsufficientStock {
            product_id: short.product_id,
            product_name: short.product_name.clone(),
            requested: short.quantity,
            available: short.stock_quantity,
        });
    }

    Ok(VerifiedCart { lines })
}
