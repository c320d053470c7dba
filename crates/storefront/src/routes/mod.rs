//! HTTP route handlers for the storefront.
//!
//! Page routes answer with JSON view models. Browser form posts answer with
//! `303 See Other` redirects and queue flash messages in the session; the
//! next page view drains them into its `flash` field.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                            - Redirect to /products
//! GET  /health                      - Liveness
//! GET  /health/ready                - Readiness (database)
//!
//! # Catalog
//! GET  /products?category=          - Product listing
//! GET  /products/{id}               - Product detail
//! GET  /categories                  - Category labels
//! GET  /api/products                - Product listing (JSON envelope)
//!
//! # Cart (requires auth)
//! GET  /cart                        - Cart page
//! GET  /cart/count                  - Distinct line count
//! POST /cart/add/{product_id}       - Add (JSON for AJAX clients)
//! POST /cart/update/{product_id}    - Set quantity (0 removes)
//! POST /cart/remove/{product_id}    - Remove line
//! POST /cart/clear                  - Empty cart
//!
//! # Checkout & orders (requires auth)
//! GET  /checkout                    - Checkout summary
//! POST /checkout                    - Place order
//! GET  /orders                      - Order history
//! GET  /orders/{id}                 - Receipt
//!
//! # Auth & profile
//! GET  /auth/login                  - Login page
//! POST /auth/login                  - Login action
//! GET  /auth/register               - Register page
//! POST /auth/register               - Register action
//! POST /auth/logout                 - Logout action
//! POST /auth/forgot-password        - Issue reset code (JSON)
//! POST /auth/reset-password         - Redeem reset code (JSON)
//! GET  /reset-password              - Reset page
//! GET  /profile, POST /profile      - Profile
//!
//! # Admin (requires admin role)
//! GET  /admin/inventory             - All products
//! POST /admin/products              - Create product
//! POST /admin/products/{id}         - Update product
//! POST /admin/products/{id}/delete  - Delete product
//! GET  /admin/stats                 - Dashboard counters
//! GET  /admin/users                 - Paginated users
//! GET  /admin/revenue               - Revenue per day
//! GET  /admin/engagement            - Activity over 30 days
//! POST /admin/request-reset         - Issue reset code for a user (JSON)
//! POST /admin/confirm-reset         - Redeem reset code (JSON)
//! POST /admin/force-reset/{user_id} - Force reset at next login
//! ```

pub mod admin;
pub mod auth;
pub mod cart;
pub mod checkout;
pub mod orders;
pub mod products;
pub mod profile;

use axum::{
    Router,
    http::{HeaderMap, header},
    response::Redirect,
    routing::{get, post},
};
use tower_sessions::Session;

use crate::error::Result;
use crate::middleware::{api_rate_limiter, auth_rate_limiter, push_flash};
use crate::models::FlashMessage;
use crate::state::AppState;

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/register", get(auth::register_page).post(auth::register))
        .route("/logout", post(auth::logout))
        .route("/forgot-password", post(auth::forgot_password))
        .route("/reset-password", post(auth::reset_password))
        .route_layer(auth_rate_limiter())
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index))
        .route("/{id}", get(products::show))
}

/// Create the JSON API routes router.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(products::api_index))
        .route_layer(api_rate_limiter())
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/count", get(cart::count))
        .route("/add/{product_id}", post(cart::add))
        .route("/update/{product_id}", post(cart::update))
        .route("/remove/{product_id}", post(cart::remove))
        .route("/clear", post(cart::clear))
        .route_layer(api_rate_limiter())
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(orders::index))
        .route("/{id}", get(orders::show))
}

/// Create the admin routes router.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/inventory", get(admin::inventory))
        .route("/products", post(admin::create_product))
        .route("/products/{id}", post(admin::update_product))
        .route("/products/{id}/delete", post(admin::delete_product))
        .route("/stats", get(admin::stats))
        .route("/users", get(admin::users))
        .route("/revenue", get(admin::revenue))
        .route("/engagement", get(admin::engagement))
        .route("/request-reset", post(admin::request_reset))
        .route("/confirm-reset", post(admin::confirm_reset))
        .route("/force-reset/{user_id}", post(admin::force_reset))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(|| async { Redirect::to("/products") }))
        .nest("/products", product_routes())
        .route("/categories", get(products::categories))
        .nest("/api", api_routes())
        .nest("/cart", cart_routes())
        .route("/checkout", get(checkout::show).post(checkout::place_order))
        .nest("/orders", order_routes())
        .nest("/auth", auth_routes())
        .route("/reset-password", get(auth::reset_password_page))
        .route("/profile", get(profile::show).post(profile::update))
        .nest("/admin", admin_routes())
}

// =============================================================================
// Helpers
// =============================================================================

/// Whether the client asked for JSON (AJAX) rather than a redirect.
pub(crate) fn wants_json(headers: &HeaderMap) -> bool {
    let accepts_json = headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains("application/json"));
    let is_xhr = headers
        .get("x-requested-with")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.eq_ignore_ascii_case("XMLHttpRequest"));
    accepts_json || is_xhr
}

/// Queue flash messages and redirect with `303 See Other`.
pub(crate) async fn redirect_with(
    session: &Session,
    to: &str,
    messages: impl IntoIterator<Item = FlashMessage>,
) -> Result<Redirect> {
    push_flash(session, messages).await?;
    Ok(Redirect::to(to))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn test_wants_json() {
        let mut headers = HeaderMap::new();
        assert!(!wants_json(&headers));

        headers.insert(header::ACCEPT, HeaderValue::from_static("text/html"));
        assert!(!wants_json(&headers));

        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("application/json, text/plain, */*"),
        );
        assert!(wants_json(&headers));

        let mut xhr = HeaderMap::new();
        xhr.insert("x-requested-with", HeaderValue::from_static("XMLHttpRequest"));
        assert!(wants_json(&xhr));
    }
}
