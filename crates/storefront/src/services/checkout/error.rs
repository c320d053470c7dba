//! Checkout outcomes other than success.

use thiserror::Error;

use grocer_core::ProductId;

use crate::db::RepositoryError;
use crate::models::context::FlashMessage;

/// Why a checkout did not produce an order.
///
/// Every variant is reported after the transaction has been rolled back,
/// so the cart and stock are exactly as they were before the attempt.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// The user has no cart lines.
    #[error("cart is empty")]
    EmptyCart,

    /// A cart line asks for more than the locked stock level.
    #[error("not enough stock for {product_name}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: ProductId,
        product_name: String,
        requested: i32,
        available: i32,
    },

    /// Database failure (connection, constraint, lock timeout).
    #[error("checkout failed: {0}")]
    Transient(#[from] RepositoryError),
}

impl From<sqlx::Error> for CheckoutError {
    fn from(e: sqlx::Error) -> Self {
        Self::Transient(RepositoryError::Database(e))
    }
}

impl CheckoutError {
    /// Message shown to the shopper. Never includes infrastructure details.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::EmptyCart => "Your cart is empty".to_string(),
            Self::InsufficientStock {
                product_name,
                available,
                ..
            } => format!("Not enough stock for {product_name}. Available: {available}"),
            Self::Transient(_) => "Checkout failed".to_string(),
        }
    }

    /// Flash message for this outcome. An empty cart is informational.
    #[must_use]
    pub fn flash(&self) -> FlashMessage {
        match self {
            Self::EmptyCart => FlashMessage::info(self.user_message()),
            _ => FlashMessage::error(self.user_message()),
        }
    }
}
