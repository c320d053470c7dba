//! HTTP middleware stack for the storefront.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, HTTP context)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//! 4. Session layer (tower-sessions with `PostgreSQL` store)
//! 5. Forced password reset gate
//! 6. Rate limiting (governor) on auth and API route groups

pub mod auth;
pub mod flash;
pub mod password_reset;
pub mod rate_limit;
pub mod request_id;
pub mod session;

pub use auth::{
    OptionalAuth, RequireAdmin, RequireAuth, clear_current_user, refresh_current_user,
    set_current_user, take_return_to,
};
pub use flash::{push_flash, push_flash_or_log, take_flash};
pub use password_reset::password_reset_gate;
pub use rate_limit::{api_rate_limiter, auth_rate_limiter};
pub use request_id::request_id_middleware;
pub use session::create_session_layer;
