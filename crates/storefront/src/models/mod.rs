//! Domain models for the storefront.
//!
//! Row types derive `sqlx::FromRow` and are mapped at the repository
//! boundary; input types carry the validation for form and JSON bodies.

pub mod cart;
pub mod context;
pub mod order;
pub mod product;
pub mod session;
pub mod user;

pub use cart::{CartLine, CartSummary};
pub use context::{FlashLevel, FlashMessage, RequestContext};
pub use order::{
    CheckoutForm, CheckoutRequest, Order, OrderLine, Payment, Receipt, ShippingAddress,
    ShippingDetails,
};
pub use product::{Product, ProductInput, UNCATEGORIZED};
pub use session::{CurrentUser, keys as session_keys};
pub use user::{NewUser, User};
