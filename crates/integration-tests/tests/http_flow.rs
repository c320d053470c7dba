//! End-to-end requests through the storefront router.
//!
//! Each test drives the full middleware stack (sessions, forced reset
//! gate, rate limits) with a cookie-carrying [`TestClient`].

use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode, header};

use grocer_integration_tests::{
    TestClient, create_admin, create_product, create_user, json_body, location, order_count,
    stock_of, test_app,
};
use grocer_storefront::services::auth::AuthService;
use grocer_storefront::services::checkout::CHECKOUT_SUCCESS_MESSAGE;

#[tokio::test]
async fn health_endpoints() {
    let (app, _pool) = test_app().await;
    let mut client = TestClient::new(app);

    assert_eq!(client.get("/health").await.status(), StatusCode::OK);
    assert_eq!(client.get("/health/ready").await.status(), StatusCode::OK);
}

#[tokio::test]
async fn guest_is_sent_to_login_and_back() {
    let (app, pool) = test_app().await;
    let user = create_user(&pool).await;
    let mut client = TestClient::new(app);

    let response = client.get("/cart").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/auth/login");

    assert_eq!(client.login(&user).await, "/cart");
    assert_eq!(client.get("/cart").await.status(), StatusCode::OK);
}

#[tokio::test]
async fn login_lands_on_products() {
    let (app, pool) = test_app().await;
    let user = create_user(&pool).await;
    let mut client = TestClient::new(app);

    assert_eq!(client.login(&user).await, "/products");

    let body = json_body(client.get("/products").await).await;
    assert_eq!(body["current_user"]["id"], user.id.as_i32());
    let flash = body["flash"].as_array().expect("flash list");
    assert!(flash[0]["text"].as_str().unwrap().starts_with("Welcome back"));
}

#[tokio::test]
async fn wrong_password_returns_to_login() {
    let (app, pool) = test_app().await;
    let user = create_user(&pool).await;
    let mut client = TestClient::new(app);

    let response = client
        .post_form(
            "/auth/login",
            &[("email", user.email.as_str()), ("password", "not-it")],
        )
        .await;
    assert_eq!(location(&response), "/auth/login");
    assert_eq!(location(&client.get("/cart").await), "/auth/login");
}

#[tokio::test]
async fn product_api_envelope() {
    let (app, pool) = test_app().await;
    let product = create_product(&pool, 3, 199).await;
    let mut client = TestClient::new(app);

    let response = client.get("/api/products").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["success"], true);
    let data = body["data"].as_array().expect("data list");
    assert!(data.iter().any(|p| p["name"] == product.name.as_str()));
}

#[tokio::test]
async fn unknown_product_is_not_found() {
    let (app, _pool) = test_app().await;
    let mut client = TestClient::new(app);

    assert_eq!(
        client.get("/products/999999999").await.status(),
        StatusCode::NOT_FOUND
    );
}

#[tokio::test]
async fn add_to_cart_as_json_is_capped_by_stock() {
    let (app, pool) = test_app().await;
    let user = create_user(&pool).await;
    let product = create_product(&pool, 2, 250).await;
    let mut client = TestClient::new(app);
    client.login(&user).await;

    let uri = format!("/cart/add/{}", product.id);
    let add = |quantity: &'static str| {
        (
            Request::post(uri.as_str())
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .header(header::ACCEPT, "application/json"),
            Body::from(format!("quantity={quantity}")),
        )
    };

    let (builder, body) = add("5");
    let response = client.send(builder, body).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["qty"], 2);
    assert_eq!(body["cart_count"], 1);

    let (builder, body) = add("1");
    let response = client.send(builder, body).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Out of Stock");
}

#[tokio::test]
async fn checkout_through_the_router() {
    let (app, pool) = test_app().await;
    let buyer = create_user(&pool).await;
    let stranger = create_user(&pool).await;
    let product = create_product(&pool, 4, 300).await;

    let mut client = TestClient::new(app.clone());
    client.login(&buyer).await;
    let added = client
        .post_form(&format!("/cart/add/{}", product.id), &[("quantity", "3")])
        .await;
    assert_eq!(location(&added), "/cart");

    let review = json_body(client.get("/checkout").await).await;
    assert_eq!(review["total"], "9.00");

    let placed = client
        .post_form(
            "/checkout",
            &[("recipient_name", "Ana Lima"), ("address_line1", "12 Orchard Road")],
        )
        .await;
    assert_eq!(placed.status(), StatusCode::SEE_OTHER);
    let receipt_path = location(&placed);
    assert!(receipt_path.starts_with("/orders/"));
    assert_eq!(stock_of(&pool, product.id).await, 1);

    let receipt = json_body(client.get(&receipt_path).await).await;
    assert_eq!(receipt["order"]["total_amount"], "9.00");
    assert_eq!(receipt["shipping"]["recipient_name"], "Ana Lima");
    assert_eq!(receipt["flash"][0]["text"], CHECKOUT_SUCCESS_MESSAGE);

    let mut other = TestClient::new(app);
    other.login(&stranger).await;
    assert_eq!(other.get(&receipt_path).await.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn checkout_with_empty_cart_goes_back_to_cart() {
    let (app, pool) = test_app().await;
    let user = create_user(&pool).await;
    let mut client = TestClient::new(app);
    client.login(&user).await;

    let response = client.post_form("/checkout", &[]).await;
    assert_eq!(location(&response), "/cart");

    let cart = json_body(client.get("/cart").await).await;
    assert_eq!(cart["flash"][0]["text"], "Your cart is empty");
}

#[tokio::test]
async fn oversized_checkout_field_is_a_validation_error() {
    let (app, pool) = test_app().await;
    let user = create_user(&pool).await;
    let product = create_product(&pool, 4, 300).await;
    let mut client = TestClient::new(app);
    client.login(&user).await;
    client
        .post_form(&format!("/cart/add/{}", product.id), &[("quantity", "1")])
        .await;

    let long_method = "m".repeat(80);
    let response = client
        .post_form("/checkout", &[("method", long_method.as_str())])
        .await;
    assert_eq!(location(&response), "/cart");
    assert_eq!(stock_of(&pool, product.id).await, 4);
    assert_eq!(order_count(&pool, &user).await, 0);

    let cart = json_body(client.get("/cart").await).await;
    let flash = cart["flash"].as_array().expect("flash list");
    assert!(
        flash
            .iter()
            .any(|m| m["text"] == "method must be at most 50 characters")
    );
    assert_eq!(cart["lines"].as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn shoppers_are_kept_out_of_admin() {
    let (app, pool) = test_app().await;
    let shopper = create_user(&pool).await;
    let admin = create_admin(&pool).await;

    let mut client = TestClient::new(app.clone());
    client.login(&shopper).await;
    let response = client.get("/admin/inventory").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/products");

    let mut admin_client = TestClient::new(app);
    assert_eq!(admin_client.login(&admin).await, "/admin/inventory");
    assert_eq!(
        admin_client.get("/admin/inventory").await.status(),
        StatusCode::OK
    );
    assert_eq!(admin_client.get("/admin/stats").await.status(), StatusCode::OK);
}

#[tokio::test]
async fn forced_reset_gates_every_page() {
    let (app, pool) = test_app().await;
    let user = create_user(&pool).await;
    AuthService::new(&pool, Duration::from_secs(600))
        .force_reset(user.id)
        .await
        .unwrap();

    let mut client = TestClient::new(app);
    let landing = client.login(&user).await;
    assert_eq!(landing, "/reset-password?forced=true");

    assert_eq!(location(&client.get("/products").await), landing);
    assert_eq!(location(&client.get("/cart").await), landing);
    assert_eq!(
        client.get("/reset-password?forced=true").await.status(),
        StatusCode::OK
    );
    assert_eq!(client.get("/api/products").await.status(), StatusCode::OK);

    let requested = json_body(
        client
            .post_json(
                "/auth/forgot-password",
                &serde_json::json!({ "email": user.email.as_str() }),
            )
            .await,
    )
    .await;
    let otp = requested["mock_email"]["otp"].as_str().unwrap().to_string();

    let reset = client
        .post_json(
            "/auth/reset-password",
            &serde_json::json!({
                "email": user.email.as_str(),
                "otp": otp,
                "new_password": "fresh-secret",
            }),
        )
        .await;
    assert_eq!(reset.status(), StatusCode::OK);

    assert_eq!(client.get("/products").await.status(), StatusCode::OK);
}
