//! Order history repository.
//!
//! Read side only. Orders are written exclusively by
//! [`crate::services::checkout::CheckoutService`].

use sqlx::PgPool;

use grocer_core::{OrderId, UserId};

use super::RepositoryError;
use crate::models::order::{Order, OrderLine, Payment, Receipt, ShippingDetails};

const ORDER_COLUMNS: &str = "id, user_id, total_amount, status, payment_id, created_at";

/// Repository for reading orders and their receipts.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// A user's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        let orders = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = $1 ORDER BY created_at DESC, id DESC"
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        Ok(orders)
    }

    /// Get an order by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let order = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(order)
    }

    /// Items of an order with product names.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn items(&self, order_id: OrderId) -> Result<Vec<OrderLine>, RepositoryError> {
        let items = sqlx::query_as::<_, OrderLine>(
            r"
            SELECT oi.product_id, p.name AS product_name, oi.quantity, oi.unit_price
            FROM order_items oi
            JOIN products p ON p.id = oi.product_id
            WHERE oi.order_id = $1
            ORDER BY oi.id
            ",
        )
        .bind(order_id)
        .fetch_all(self.pool)
        .await?;

        Ok(items)
    }

    /// Payment recorded for an order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn payment(&self, order_id: OrderId) -> Result<Option<Payment>, RepositoryError> {
        let payment = sqlx::query_as::<_, Payment>(
            r"
            SELECT id, order_id, user_id, method, amount, currency, status,
                   provider_transaction_id, created_at
            FROM payments
            WHERE order_id = $1
            ",
        )
        .bind(order_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(payment)
    }

    /// Shipping details for an order, if any were captured.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn shipping(
        &self,
        order_id: OrderId,
    ) -> Result<Option<ShippingDetails>, RepositoryError> {
        let shipping = sqlx::query_as::<_, ShippingDetails>(
            r"
            SELECT id, order_id, recipient_name, address_line1, address_line2, city, region,
                   postal_code, country, phone, status, created_at
            FROM shipping_details
            WHERE order_id = $1
            ",
        )
        .bind(order_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(shipping)
    }

    /// Full receipt for an order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if any query fails.
    pub async fn receipt(&self, order_id: OrderId) -> Result<Option<Receipt>, RepositoryError> {
        let Some(order) = self.get(order_id).await? else {
            return Ok(None);
        };

        Ok(Some(Receipt {
            items: self.items(order.id).await?,
            payment: self.payment(order.id).await?,
            shipping: self.shipping(order.id).await?,
            order,
        }))
    }
}
