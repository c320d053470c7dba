//! Order committer: turn a verified cart into an order.

use rust_decimal::Decimal;
use sqlx::PgConnection;
use uuid::Uuid;

use grocer_core::{
    CurrencyCode, Money, OrderId, OrderStatus, PaymentId, PaymentStatus, ShippingStatus, UserId,
};

use super::guard::{LockedLine, VerifiedCart};
use crate::models::order::{CheckoutRequest, ShippingAddress};

/// Prefix of mock provider transaction ids.
const MOCK_TRANSACTION_PREFIX: &str = "MOCK_";

/// Sum of `unit_price * quantity` over the locked lines.
#[must_use]
pub fn order_total(lines: &[LockedLine]) -> Decimal {
    lines
        .iter()
        .map(|l| Money::line_total(l.unit_price, l.quantity))
        .sum()
}

/// A fresh mock transaction id. UUID v4 keeps ids unique across concurrent
/// checkouts.
#[must_use]
pub fn mock_transaction_id() -> String {
    format!("{MOCK_TRANSACTION_PREFIX}{}", Uuid::new_v4().simple())
}

/// Write the order, its items, payment and shipping, decrement stock and
/// empty the cart.
///
/// Must run on the connection of the transaction that produced `cart`, so
/// the product rows are still locked.
///
/// # Errors
///
/// Returns `sqlx::Error` from the first failing statement. The caller rolls
/// back.
pub async fn commit_order(
    conn: &mut PgConnection,
    user_id: UserId,
    cart: &VerifiedCart,
    request: &CheckoutRequest,
) -> Result<OrderId, sqlx::Error> {
    let total = order_total(cart.lines());

    let order_id: OrderId = sqlx::query_scalar(
        "INSERT INTO orders (user_id, total_amount, status) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(user_id)
    .bind(total)
    .bind(OrderStatus::Paid)
    .fetch_one(&mut *conn)
    .await?;

    for line in cart.lines() {
        sqlx::query(
            "INSERT INTO order_items (order_id, product_id, quantity, unit_price) VALUES ($1, $2, $3, $4)",
        )
        .bind(order_id)
        .bind(line.product_id)
        .bind(line.quantity)
        .bind(line.unit_price)
        .execute(&mut *conn)
        .await?;

        sqlx::query("UPDATE products SET stock_quantity = stock_quantity - $1 WHERE id = $2")
            .bind(line.quantity)
            .bind(line.product_id)
            .execute(&mut *conn)
            .await?;
    }

    let payment_id: PaymentId = sqlx::query_scalar(
        r"
        INSERT INTO payments
            (order_id, user_id, method, amount, currency, status, provider_transaction_id)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING id
        ",
    )
    .bind(order_id)
    .bind(user_id)
    .bind(&request.method)
    .bind(total)
    .bind(CurrencyCode::default().code())
    .bind(PaymentStatus::Success)
    .bind(mock_transaction_id())
    .fetch_one(&mut *conn)
    .await?;

    sqlx::query("UPDATE orders SET payment_id = $1 WHERE id = $2")
        .bind(payment_id)
        .bind(order_id)
        .execute(&mut *conn)
        .await?;

    if let Some(shipping) = &request.shipping {
        insert_shipping(&mut *conn, order_id, shipping).await?;
    }

    sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
        .bind(user_id)
        .execute(&mut *conn)
        .await?;

    Ok(order_id)
}

async fn insert_shipping(
    conn: &mut PgConnection,
    order_id: OrderId,
    shipping: &ShippingAddress,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r"
        INSERT INTO shipping_details
            (order_id, recipient_name, address_line1, address_line2, city, region,
             postal_code, country, phone, status)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        ",
    )
    .bind(order_id)
    .bind(&shipping.recipient_name)
    .bind(&shipping.address_line1)
    .bind(&shipping.address_line2)
    .bind(&shipping.city)
    .bind(&shipping.region)
    .bind(&shipping.postal_code)
    .bind(&shipping.country)
    .bind(&shipping.phone)
    .bind(ShippingStatus::Packing)
    .execute(conn)
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use grocer_core::ProductId;

    use super::*;

    fn line(quantity: i32, cents: i64) -> LockedLine {
        LockedLine {
            product_id: ProductId::new(1),
            quantity,
            product_name: "Tomatoes".to_string(),
            stock_quantity: 100,
            unit_price: Decimal::new(cents, 2),
        }
    }

    #[test]
    fn test_order_total_uses_locked_prices() {
        assert_eq!(order_total(&[line(3, 200)]), Decimal::new(600, 2));
        assert_eq!(
            order_total(&[line(2, 199), line(1, 1), line(10, 5)]),
            Decimal::new(449, 2)
        );
        assert_eq!(order_total(&[]), Decimal::ZERO);
    }

    #[test]
    fn test_mock_transaction_ids_are_unique() {
        let a = mock_transaction_id();
        let b = mock_transaction_id();
        assert!(a.starts_with("MOCK_"));
        assert_eq!(a.len(), MOCK_TRANSACTION_PREFIX.len() + 32);
        assert_ne!(a, b);
    }
}
