//! Aggregations for the admin dashboard.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;

use super::RepositoryError;

/// Dashboard counters.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardStats {
    pub total_users: i64,
    pub total_products: i64,
    pub total_orders: i64,
    pub total_revenue: Decimal,
    pub low_stock_count: i64,
    /// Orders per day over the last 7 days.
    pub recent_orders: Vec<DailyOrders>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct DailyOrders {
    pub day: NaiveDate,
    pub orders: i64,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct DailyRevenue {
    pub day: NaiveDate,
    pub revenue: Decimal,
    pub orders: i64,
}

/// Shopper activity over a trailing window.
#[derive(Debug, Clone, Serialize)]
pub struct Engagement {
    pub days: i32,
    /// Distinct users who placed at least one order.
    pub active_users: i64,
    /// Cart lines created in the window.
    pub cart_adds: i64,
}

/// Read-only reporting queries.
pub struct StatsRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> StatsRepository<'a> {
    /// Create a new stats repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Headline dashboard numbers.
    ///
    /// Products with stock strictly below `low_stock_threshold` count as
    /// low stock.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if any query fails.
    pub async fn dashboard(
        &self,
        low_stock_threshold: i32,
    ) -> Result<DashboardStats, RepositoryError> {
        let (total_users, total_products, total_orders, total_revenue, low_stock_count) =
            sqlx::query_as::<_, (i64, i64, i64, Decimal, i64)>(
                r"
                SELECT
                    (SELECT COUNT(*) FROM users),
                    (SELECT COUNT(*) FROM products),
                    (SELECT COUNT(*) FROM orders),
                    (SELECT COALESCE(SUM(total_amount), 0)::NUMERIC FROM orders),
                    (SELECT COUNT(*) FROM products WHERE stock_quantity < $1)
                ",
            )
            .bind(low_stock_threshold)
            .fetch_one(self.pool)
            .await?;

        let recent_orders = sqlx::query_as::<_, DailyOrders>(
            r"
            SELECT created_at::date AS day, COUNT(*) AS orders
            FROM orders
            WHERE created_at >= CURRENT_DATE - 6
            GROUP BY day
            ORDER BY day
            ",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(DashboardStats {
            total_users,
            total_products,
            total_orders,
            total_revenue,
            low_stock_count,
            recent_orders,
        })
    }

    /// Revenue per day for the inclusive date range. Days without orders
    /// are omitted.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn revenue_by_day(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyRevenue>, RepositoryError> {
        let rows = sqlx::query_as::<_, DailyRevenue>(
            r"
            SELECT created_at::date AS day,
                   SUM(total_amount)::NUMERIC AS revenue,
                   COUNT(*) AS orders
            FROM orders
            WHERE created_at::date BETWEEN $1 AND $2
            GROUP BY day
            ORDER BY day
            ",
        )
        .bind(start)
        .bind(end)
        .fetch_all(self.pool)
        .await?;

        Ok(rows)
    }

    /// Ordering users and cart additions over the last `days` days.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn engagement(&self, days: i32) -> Result<Engagement, RepositoryError> {
        let (active_users, cart_adds) = sqlx::query_as::<_, (i64, i64)>(
            r"
            SELECT
                (SELECT COUNT(DISTINCT user_id) FROM orders
                 WHERE created_at >= now() - make_interval(days => $1)),
                (SELECT COUNT(*) FROM cart_items
                 WHERE created_at >= now() - make_interval(days => $1))
            ",
        )
        .bind(days)
        .fetch_one(self.pool)
        .await?;

        Ok(Engagement {
            days,
            active_users,
            cart_adds,
        })
    }
}
