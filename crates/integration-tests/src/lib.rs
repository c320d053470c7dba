//! Integration test harness for Grocer.
//!
//! # Running Tests
//!
//! ```bash
//! # Requires a local Docker daemon
//! cargo test -p grocer-integration-tests
//! ```
//!
//! Each test binary starts one shared `PostgreSQL` container, applies the
//! storefront migrations and the session store schema, and hands every test
//! its own pool. Tests never truncate tables; they isolate themselves by
//! creating uniquely named users and products.
//!
//! # Test Categories
//!
//! - `checkout` - The checkout transaction (atomicity, stock, totals, races)
//! - `cart` - Cart repository behavior
//! - `auth` - Registration, login and one-time reset codes
//! - `admin_stats` - Dashboard and report queries
//! - `http_flow` - End-to-end requests through the axum router

use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response, header};
use rust_decimal::Decimal;
use secrecy::SecretString;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;
use tower::ServiceExt;
use tower_sessions_sqlx_store::PostgresStore;
use uuid::Uuid;

use grocer_core::{ProductId, UserRole};
use grocer_storefront::config::{DatabaseConfig, SentryConfig, StorefrontConfig};
use grocer_storefront::db::{CartRepository, MIGRATOR, ProductRepository, UserRepository};
use grocer_storefront::models::{CurrentUser, Product, ProductInput, User};
use grocer_storefront::services::auth::{AuthService, Registration};
use grocer_storefront::state::AppState;

/// Password given to every user created by [`create_user`].
pub const TEST_PASSWORD: &str = "secret123";

/// Session secret used by the test configuration.
const TEST_SESSION_SECRET: &str = "k8Zq2vLr9XwT4mNp7sYc3BfHj6GdEa1Ru5Vo0Ki";

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

/// Global shared container
static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default()
                .start()
                .await
                .expect("Failed to start postgres container");

            let host = container.get_host().await.expect("container host");
            let port = container
                .get_host_port_ipv4(5432)
                .await
                .expect("container port");

            let connection_string = format!("postgres://postgres:postgres@{host}:{port}/postgres");

            // Create a temporary pool just for migrations
            let temp_pool = PgPool::connect(&connection_string)
                .await
                .expect("Failed to connect for migrations");
            MIGRATOR
                .run(&temp_pool)
                .await
                .expect("Failed to run migrations");
            PostgresStore::new(temp_pool.clone())
                .migrate()
                .await
                .expect("Failed to create session table");
            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// A fresh pool on the shared, migrated database.
///
/// Each test gets its own pool so no connection outlives its runtime.
pub async fn test_pool() -> PgPool {
    let info = container_info().await;

    PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(10))
        .connect(&info.connection_string)
        .await
        .expect("Failed to create test pool")
}

/// Configuration pointing at the shared database.
pub async fn test_config() -> StorefrontConfig {
    let info = container_info().await;

    StorefrontConfig {
        database_url: SecretString::from(info.connection_string.clone()),
        host: IpAddr::V4(Ipv4Addr::LOCALHOST),
        port: 0,
        base_url: "http://localhost:3000".to_string(),
        session_secret: SecretString::from(TEST_SESSION_SECRET),
        database: DatabaseConfig::default(),
        otp_ttl: Duration::from_secs(10 * 60),
        low_stock_threshold: 10,
        sentry: SentryConfig::default(),
    }
}

/// Application state and router over a fresh pool.
pub async fn test_app() -> (Router, PgPool) {
    let pool = test_pool().await;
    let state = AppState::new(test_config().await, pool.clone());
    (grocer_storefront::app(state), pool)
}

/// A name no other test will use.
#[must_use]
pub fn unique(prefix: &str) -> String {
    format!("{prefix}-{}", Uuid::new_v4().simple())
}

/// Register a shopper with [`TEST_PASSWORD`].
pub async fn create_user(pool: &PgPool) -> User {
    let email = format!("{}@example.com", unique("user"));
    let auth = AuthService::new(pool, Duration::from_secs(600));

    auth.register(&Registration {
        username: unique("shopper"),
        email,
        password: TEST_PASSWORD.to_string(),
        address: "1 Market Street".to_string(),
        contact: "555-0100".to_string(),
    })
    .await
    .expect("Failed to register test user")
}

/// Register an admin with [`TEST_PASSWORD`].
pub async fn create_admin(pool: &PgPool) -> User {
    let user = create_user(pool).await;
    UserRepository::new(pool)
        .set_role(&user.email, UserRole::Admin)
        .await
        .expect("Failed to promote test admin")
}

/// Session identity for a user.
#[must_use]
pub fn current_user(user: &User) -> CurrentUser {
    CurrentUser::from(user)
}

/// Insert a product with a unique name.
///
/// `price` is given in cents.
pub async fn create_product(pool: &PgPool, stock: i32, price_cents: i64) -> Product {
    ProductRepository::new(pool)
        .create(&ProductInput {
            name: unique("Product"),
            stock_quantity: stock,
            price: Decimal::new(price_cents, 2),
            image: None,
            category: Some(unique("Category")),
            featured: false,
            brand: None,
            best_before: None,
            deal: false,
        })
        .await
        .expect("Failed to create test product")
}

/// Put `quantity` units of a product in a user's cart.
pub async fn add_to_cart(pool: &PgPool, user: &User, product: ProductId, quantity: i32) {
    CartRepository::new(pool)
        .add(user.id, product, quantity)
        .await
        .expect("Failed to add to cart");
}

/// Current stock of a product.
pub async fn stock_of(pool: &PgPool, product: ProductId) -> i32 {
    sqlx::query_scalar("SELECT stock_quantity FROM products WHERE id = $1")
        .bind(product)
        .fetch_one(pool)
        .await
        .expect("Failed to read stock")
}

/// Number of orders a user has.
pub async fn order_count(pool: &PgPool, user: &User) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE user_id = $1")
        .bind(user.id)
        .fetch_one(pool)
        .await
        .expect("Failed to count orders")
}

// =============================================================================
// HTTP helpers
// =============================================================================

static NEXT_CLIENT: AtomicU32 = AtomicU32::new(1);

/// A browser-like client: a cookie jar plus a client IP of its own, so
/// per-IP rate limits never leak between tests.
pub struct TestClient {
    app: Router,
    ip: String,
    cookie: Option<String>,
}

impl TestClient {
    #[must_use]
    pub fn new(app: Router) -> Self {
        let n = NEXT_CLIENT.fetch_add(1, Ordering::Relaxed);
        let ip = format!("10.{}.{}.{}", (n >> 16) & 0xff, (n >> 8) & 0xff, n & 0xff);
        Self {
            app,
            ip,
            cookie: None,
        }
    }

    /// Send a request, carrying and updating the session cookie.
    pub async fn send(&mut self, builder: axum::http::request::Builder, body: Body) -> Response<Body> {
        let mut builder = builder.header("x-forwarded-for", &self.ip);
        if let Some(cookie) = &self.cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let request = builder.body(body).expect("valid request");

        let response = self
            .app
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");

        if let Some(set_cookie) = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            && let Some(pair) = set_cookie.split(';').next()
        {
            self.cookie = Some(pair.to_string());
        }

        response
    }

    pub async fn get(&mut self, uri: &str) -> Response<Body> {
        self.send(Request::get(uri), Body::empty()).await
    }

    /// POST a urlencoded form given as key/value pairs.
    pub async fn post_form(&mut self, uri: &str, fields: &[(&str, &str)]) -> Response<Body> {
        let body = serde_urlencoded::to_string(fields).expect("encodable form");
        let builder = Request::post(uri).header(
            header::CONTENT_TYPE,
            "application/x-www-form-urlencoded",
        );
        self.send(builder, Body::from(body)).await
    }

    /// POST a JSON body.
    pub async fn post_json(&mut self, uri: &str, json: &serde_json::Value) -> Response<Body> {
        let builder = Request::post(uri).header(header::CONTENT_TYPE, "application/json");
        self.send(builder, Body::from(json.to_string())).await
    }

    /// Log in through the form and return the redirect target.
    pub async fn login(&mut self, user: &User) -> String {
        let response = self
            .post_form(
                "/auth/login",
                &[("email", user.email.as_str()), ("password", TEST_PASSWORD)],
            )
            .await;
        location(&response)
    }
}

/// The `Location` header of a redirect.
#[must_use]
pub fn location(response: &Response<Body>) -> String {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

/// Read a JSON response body.
pub async fn json_body(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body");
    serde_json::from_slice(&bytes).expect("Body is not JSON")
}
