//! Checkout: the atomic cart-to-order transaction.
//!
//! One transaction runs the inventory guard ([`guard`]) and then the order
//! committer ([`committer`]). Any failure rolls the whole transaction back,
//! leaving the cart and stock untouched.

pub mod committer;
mod error;
pub mod guard;

pub use error::CheckoutError;

use sqlx::{PgPool, Postgres, Transaction};
use tracing::instrument;

use grocer_core::OrderId;

use crate::db::{CartRepository, RepositoryError};
use crate::models::cart::CartSummary;
use crate::models::context::{FlashMessage, RequestContext};
use crate::models::order::CheckoutRequest;

/// Flash message shown after a successful checkout.
pub const CHECKOUT_SUCCESS_MESSAGE: &str = "Payment successful and order created";

/// Checkout service.
pub struct CheckoutService<'a> {
    pool: &'a PgPool,
}

impl<'a> CheckoutService<'a> {
    /// Create a new checkout service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Pre-checkout summary of the user's cart at current prices.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::EmptyCart` if there is nothing to check out.
    /// Returns `CheckoutError::Transient` if the cart cannot be read.
    pub async fn summary(&self, ctx: &RequestContext) -> Result<CartSummary, CheckoutError> {
        let lines = CartRepository::new(self.pool).lines(ctx.user.id).await?;
        if lines.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }
        Ok(CartSummary::from_lines(lines))
    }

    /// Place an order for everything in the acting user's cart.
    ///
    /// The outcome is also queued on `ctx` as a flash message.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::EmptyCart`, `CheckoutError::InsufficientStock`
    /// or `CheckoutError::Transient`. In every case nothing was written.
    #[instrument(skip(self, ctx, request), fields(user_id = %ctx.user.id))]
    pub async fn checkout(
        &self,
        ctx: &mut RequestContext,
        request: &CheckoutRequest,
    ) -> Result<OrderId, CheckoutError> {
        let result = self.run(ctx, request).await;

        match &result {
            Ok(order_id) => {
                tracing::info!(order_id = %order_id, "Checkout committed");
                ctx.flash(FlashMessage::success(CHECKOUT_SUCCESS_MESSAGE));
            }
            Err(err) => {
                if let CheckoutError::Transient(e) = err {
                    let event_id = sentry::capture_error(e);
                    tracing::error!(error = %e, sentry_event_id = %event_id, "Checkout failed");
                } else {
                    tracing::info!(reason = %err, "Checkout rejected");
                }
                ctx.flash(err.flash());
            }
        }

        result
    }

    async fn run(
        &self,
        ctx: &RequestContext,
        request: &CheckoutRequest,
    ) -> Result<OrderId, CheckoutError> {
        let user_id = ctx.user.id;
        let mut tx = self.pool.begin().await?;

        let lines = match guard::lock_cart_lines(&mut tx, user_id).await {
            Ok(lines) => lines,
            Err(e) => return Err(rollback(tx, e.into()).await),
        };

        let cart = match guard::verify_stock(lines) {
            Ok(cart) => cart,
            Err(err) => return Err(rollback(tx, err).await),
        };

        let order_id = match committer::commit_order(&mut tx, user_id, &cart, request).await {
            Ok(order_id) => order_id,
            Err(e) => return Err(rollback(tx, e.into()).await),
        };

        tx.commit().await.map_err(RepositoryError::from)?;

        Ok(order_id)
    }
}

/// Roll back and hand the original error back. A failed rollback is only
/// logged; the connection is discarded by the pool either way.
async fn rollback(tx: Transaction<'_, Postgres>, err: CheckoutError) -> CheckoutError {
    if let Err(e) = tx.rollback().await {
        tracing::warn!(error = %e, "Checkout rollback failed");
    }
    err
}
