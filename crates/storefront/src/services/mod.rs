//! Business logic services for the storefront.
//!
//! - `auth` - Accounts, login and OTP password resets
//! - `checkout` - The atomic cart-to-order transaction

pub mod auth;
pub mod checkout;
