//! Cart view types.

use rust_decimal::Decimal;
use serde::Serialize;

use grocer_core::{Money, ProductId};

/// One cart line joined with its product.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CartLine {
    pub product_id: ProductId,
    pub name: String,
    /// Current catalog price. Checkout re-reads it under lock.
    pub price: Decimal,
    pub quantity: i32,
    pub image: Option<String>,
    pub stock_quantity: i32,
}

impl CartLine {
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        Money::line_total(self.price, self.quantity)
    }
}

/// A rendered cart: lines plus totals.
#[derive(Debug, Clone, Serialize)]
pub struct CartSummary {
    pub lines: Vec<CartLineView>,
    pub total: Decimal,
    /// Number of distinct lines.
    pub item_count: usize,
}

/// A cart line with its computed line total.
#[derive(Debug, Clone, Serialize)]
pub struct CartLineView {
    #[serde(flatten)]
    pub line: CartLine,
    pub line_total: Decimal,
}

impl CartSummary {
    #[must_use]
    pub fn from_lines(lines: Vec<CartLine>) -> Self {
        let lines: Vec<CartLineView> = lines
            .into_iter()
            .map(|line| CartLineView {
                line_total: line.line_total(),
                line,
            })
            .collect();
        let total = lines.iter().map(|l| l.line_total).sum();
        let item_count = lines.len();
        Self {
            lines,
            total,
            item_count,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// How many units of a request can be added without exceeding stock.
///
/// Returns 0 when the cart already holds all available stock.
#[must_use]
pub fn addable_quantity(stock: i32, already_in_cart: i32, requested: i32) -> i32 {
    let room = (stock - already_in_cart).max(0);
    requested.max(0).min(room)
}
