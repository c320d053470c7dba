//! Integration tests for the checkout transaction.
//!
//! Run with:
//!
//! ```bash
//! cargo test -p grocer-integration-tests --test checkout
//! ```

use rust_decimal::Decimal;

use grocer_core::{OrderStatus, PaymentStatus, ShippingStatus};
use grocer_integration_tests::{
    add_to_cart, create_product, create_user, current_user, order_count, stock_of, test_pool,
};
use grocer_storefront::db::{CartRepository, OrderRepository};
use grocer_storefront::models::{CheckoutRequest, FlashLevel, RequestContext, ShippingAddress};
use grocer_storefront::services::checkout::{
    CHECKOUT_SUCCESS_MESSAGE, CheckoutError, CheckoutService,
};

fn shipping(recipient_name: &str) -> ShippingAddress {
    ShippingAddress {
        recipient_name: recipient_name.to_string(),
        address_line1: "12 Orchard Road".to_string(),
        address_line2: None,
        city: Some("Springfield".to_string()),
        region: None,
        postal_code: Some("12345".to_string()),
        country: Some("US".to_string()),
        phone: None,
    }
}

// ============================================================================
// Scenarios
// ============================================================================

#[tokio::test]
async fn successful_checkout_creates_order_and_decrements_stock() {
    let pool = test_pool().await;
    let user = create_user(&pool).await;
    let x = create_product(&pool, 5, 200).await;
    add_to_cart(&pool, &user, x.id, 3).await;

    let mut ctx = RequestContext::new(current_user(&user));
    let order_id = CheckoutService::new(&pool)
        .checkout(&mut ctx, &CheckoutRequest::mock())
        .await
        .expect("checkout should succeed");

    let receipt = OrderRepository::new(&pool)
        .receipt(order_id)
        .await
        .unwrap()
        .expect("order exists");

    assert_eq!(receipt.order.total_amount, Decimal::new(600, 2));
    assert_eq!(receipt.order.status, OrderStatus::Paid);
    assert_eq!(receipt.order.user_id, user.id);
    assert_eq!(receipt.items.len(), 1);
    assert_eq!(receipt.items[0].quantity, 3);
    assert_eq!(receipt.items[0].unit_price, Decimal::new(200, 2));
    assert_eq!(receipt.items[0].product_name, x.name);

    let payment = receipt.payment.expect("payment recorded");
    assert_eq!(receipt.order.payment_id, Some(payment.id));
    assert_eq!(payment.status, PaymentStatus::Success);
    assert_eq!(payment.amount, Decimal::new(600, 2));
    assert_eq!(payment.currency, "USD");
    assert_eq!(payment.method, "mock");
    assert!(
        payment
            .provider_transaction_id
            .as_deref()
            .is_some_and(|id| id.starts_with("MOCK_"))
    );
    assert!(receipt.shipping.is_none());

    assert_eq!(stock_of(&pool, x.id).await, 2);
    assert_eq!(CartRepository::new(&pool).count(user.id).await.unwrap(), 0);

    let messages = ctx.messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].level, FlashLevel::Success);
    assert_eq!(messages[0].text, CHECKOUT_SUCCESS_MESSAGE);
}

#[tokio::test]
async fn insufficient_stock_rolls_back() {
    let pool = test_pool().await;
    let user = create_user(&pool).await;
    let y = create_product(&pool, 1, 350).await;
    add_to_cart(&pool, &user, y.id, 2).await;

    let mut ctx = RequestContext::new(current_user(&user));
    let err = CheckoutService::new(&pool)
        .checkout(&mut ctx, &CheckoutRequest::mock())
        .await
        .expect_err("checkout should fail");

    match &err {
        CheckoutError::InsufficientStock {
            product_id,
            product_name,
            requested,
            available,
        } => {
            assert_eq!(*product_id, y.id);
            assert_eq!(product_name, &y.name);
            assert_eq!(*requested, 2);
            assert_eq!(*available, 1);
        }
        other => panic!("unexpected error: {other:?}"),
    }

    assert_eq!(stock_of(&pool, y.id).await, 1);
    assert_eq!(CartRepository::new(&pool).quantity_of(user.id, y.id).await.unwrap(), 2);
    assert_eq!(order_count(&pool, &user).await, 0);

    let messages = ctx.messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].level, FlashLevel::Error);
    assert_eq!(
        messages[0].text,
        format!("Not enough stock for {}. Available: 1", y.name)
    );
}

#[tokio::test]
async fn empty_cart_is_rejected_without_side_effects() {
    let pool = test_pool().await;
    let user = create_user(&pool).await;

    let mut ctx = RequestContext::new(current_user(&user));
    let err = CheckoutService::new(&pool)
        .checkout(&mut ctx, &CheckoutRequest::mock())
        .await
        .expect_err("checkout should fail");

    assert!(matches!(err, CheckoutError::EmptyCart));
    assert_eq!(order_count(&pool, &user).await, 0);
    assert_eq!(ctx.messages()[0].level, FlashLevel::Info);
    assert_eq!(ctx.messages()[0].text, "Your cart is empty");
}

#[tokio::test]
async fn concurrent_checkouts_for_last_unit() {
    let pool = test_pool().await;
    let alice = create_user(&pool).await;
    let bob = create_user(&pool).await;
    let z = create_product(&pool, 1, 999).await;
    add_to_cart(&pool, &alice, z.id, 1).await;
    add_to_cart(&pool, &bob, z.id, 1).await;

    let request = CheckoutRequest::mock();
    let mut alice_ctx = RequestContext::new(current_user(&alice));
    let mut bob_ctx = RequestContext::new(current_user(&bob));
    let service = CheckoutService::new(&pool);

    let (a, b) = tokio::join!(
        service.checkout(&mut alice_ctx, &request),
        service.checkout(&mut bob_ctx, &request),
    );

    let outcomes = [a, b];
    let committed = outcomes.iter().filter(|r| r.is_ok()).count();
    assert_eq!(committed, 1, "exactly one checkout must win: {outcomes:?}");

    let loser = outcomes
        .iter()
        .find_map(|r| r.as_ref().err())
        .expect("one checkout lost");
    assert!(
        matches!(loser, CheckoutError::InsufficientStock { available: 0, .. }),
        "unexpected loser outcome: {loser:?}"
    );

    assert_eq!(stock_of(&pool, z.id).await, 0);
    assert_eq!(
        order_count(&pool, &alice).await + order_count(&pool, &bob).await,
        1
    );
}

// ============================================================================
// Properties
// ============================================================================

#[tokio::test]
async fn total_is_computed_from_locked_prices() {
    let pool = test_pool().await;
    let user = create_user(&pool).await;
    let a = create_product(&pool, 10, 125).await;
    let b = create_product(&pool, 10, 1999).await;
    let c = create_product(&pool, 10, 5).await;
    add_to_cart(&pool, &user, a.id, 4).await;
    add_to_cart(&pool, &user, b.id, 1).await;
    add_to_cart(&pool, &user, c.id, 7).await;

    let mut ctx = RequestContext::new(current_user(&user));
    let order_id = CheckoutService::new(&pool)
        .checkout(&mut ctx, &CheckoutRequest::mock())
        .await
        .unwrap();

    let receipt = OrderRepository::new(&pool)
        .receipt(order_id)
        .await
        .unwrap()
        .unwrap();

    // 4 x 1.25 + 1 x 19.99 + 7 x 0.05
    assert_eq!(receipt.order.total_amount, Decimal::new(2534, 2));
    let sum: Decimal = receipt.items.iter().map(|i| i.line_total()).sum();
    assert_eq!(sum, receipt.order.total_amount);
    assert_eq!(receipt.items.len(), 3);
}

#[tokio::test]
async fn shipping_is_recorded_when_given() {
    let pool = test_pool().await;
    let user = create_user(&pool).await;
    let p = create_product(&pool, 3, 450).await;
    add_to_cart(&pool, &user, p.id, 1).await;

    let request = CheckoutRequest::mock().with_shipping(shipping("Ana Lima"));
    let mut ctx = RequestContext::new(current_user(&user));
    let order_id = CheckoutService::new(&pool)
        .checkout(&mut ctx, &request)
        .await
        .unwrap();

    let shipping = OrderRepository::new(&pool)
        .shipping(order_id)
        .await
        .unwrap()
        .expect("shipping recorded");
    assert_eq!(shipping.recipient_name, "Ana Lima");
    assert_eq!(shipping.address_line1, "12 Orchard Road");
    assert_eq!(shipping.status, ShippingStatus::Packing);
}

#[tokio::test]
async fn failure_after_writes_leaves_nothing_behind() {
    let pool = test_pool().await;
    let user = create_user(&pool).await;
    let p = create_product(&pool, 4, 300).await;
    add_to_cart(&pool, &user, p.id, 2).await;

    // The recipient column holds 100 characters; the shipping insert fails
    // after the order, items, stock and payment writes.
    let request = CheckoutRequest::mock().with_shipping(shipping(&"x".repeat(150)));
    let mut ctx = RequestContext::new(current_user(&user));
    let err = CheckoutService::new(&pool)
        .checkout(&mut ctx, &request)
        .await
        .expect_err("checkout should fail");

    assert!(matches!(err, CheckoutError::Transient(_)));
    assert_eq!(err.user_message(), "Checkout failed");
    assert_eq!(stock_of(&pool, p.id).await, 4);
    assert_eq!(CartRepository::new(&pool).quantity_of(user.id, p.id).await.unwrap(), 2);
    assert_eq!(order_count(&pool, &user).await, 0);

    let payments: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM payments WHERE user_id = $1")
        .bind(user.id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(payments, 0);
}

#[tokio::test]
async fn failed_checkout_can_be_retried_with_same_result() {
    let pool = test_pool().await;
    let user = create_user(&pool).await;
    let p = create_product(&pool, 1, 100).await;
    add_to_cart(&pool, &user, p.id, 3).await;
    let service = CheckoutService::new(&pool);

    for _ in 0..3 {
        let mut ctx = RequestContext::new(current_user(&user));
        let err = service
            .checkout(&mut ctx, &CheckoutRequest::mock())
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::InsufficientStock { available: 1, .. }));
    }

    assert_eq!(stock_of(&pool, p.id).await, 1);
    assert_eq!(CartRepository::new(&pool).quantity_of(user.id, p.id).await.unwrap(), 3);
    assert_eq!(order_count(&pool, &user).await, 0);
}

#[tokio::test]
async fn first_short_line_is_reported() {
    let pool = test_pool().await;
    let user = create_user(&pool).await;
    let first = create_product(&pool, 0, 100).await;
    let second = create_product(&pool, 0, 100).await;
    add_to_cart(&pool, &user, first.id, 1).await;
    add_to_cart(&pool, &user, second.id, 1).await;

    let mut ctx = RequestContext::new(current_user(&user));
    let err = CheckoutService::new(&pool)
        .checkout(&mut ctx, &CheckoutRequest::mock())
        .await
        .unwrap_err();

    // Lines are locked in product id order; `first` was inserted first
    assert!(matches!(
        err,
        CheckoutError::InsufficientStock { product_id, .. } if product_id == first.id
    ));
}
