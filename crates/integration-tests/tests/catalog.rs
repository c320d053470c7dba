//! Integration tests for the product catalog.

use rust_decimal::Decimal;

use grocer_integration_tests::{
    add_to_cart, create_product, create_user, current_user, test_pool, unique,
};
use grocer_storefront::db::{CartRepository, ProductRepository, RepositoryError};
use grocer_storefront::models::{CheckoutRequest, ProductInput, RequestContext};
use grocer_storefront::services::checkout::CheckoutService;

fn input(name: &str, category: Option<&str>) -> ProductInput {
    ProductInput {
        name: name.to_string(),
        stock_quantity: 8,
        price: Decimal::new(325, 2),
        image: Some("apples.jpg".to_string()),
        category: category.map(str::to_string),
        featured: false,
        brand: None,
        best_before: None,
        deal: false,
    }
}

#[tokio::test]
async fn list_filters_by_category() {
    let pool = test_pool().await;
    let products = ProductRepository::new(&pool);
    let category = unique("Orchard");

    let apple = products.create(&input(&unique("Apple"), Some(&category))).await.unwrap();
    products.create(&input(&unique("Bread"), Some(&unique("Bakery")))).await.unwrap();

    let listed = products.list(Some(&category)).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, apple.id);

    assert!(products.categories().await.unwrap().contains(&category));
}

#[tokio::test]
async fn missing_category_reads_as_uncategorized() {
    let pool = test_pool().await;
    let products = ProductRepository::new(&pool);

    let loose = products.create(&input(&unique("Loose"), None)).await.unwrap();
    assert_eq!(loose.category_label(), "Uncategorized");

    let listed = products.list(Some("Uncategorized")).await.unwrap();
    assert!(listed.iter().any(|p| p.id == loose.id));
    assert!(
        products
            .list_uncategorized()
            .await
            .unwrap()
            .iter()
            .any(|p| p.id == loose.id)
    );

    products.set_category(loose.id, "Produce").await.unwrap();
    let fixed = products.get(loose.id).await.unwrap().unwrap();
    assert_eq!(fixed.category.as_deref(), Some("Produce"));
}

#[tokio::test]
async fn update_without_image_keeps_stored_image() {
    let pool = test_pool().await;
    let products = ProductRepository::new(&pool);
    let created = products.create(&input(&unique("Pear"), None)).await.unwrap();

    let mut edit = input(&created.name, Some("Produce"));
    edit.image = None;
    edit.stock_quantity = 3;
    let updated = products.update(created.id, &edit).await.unwrap();

    assert_eq!(updated.image.as_deref(), Some("apples.jpg"));
    assert_eq!(updated.stock_quantity, 3);
    assert_eq!(updated.category.as_deref(), Some("Produce"));
}

#[tokio::test]
async fn stock_cannot_go_negative() {
    let pool = test_pool().await;
    let product = create_product(&pool, 1, 100).await;

    let result = sqlx::query("UPDATE products SET stock_quantity = stock_quantity - 2 WHERE id = $1")
        .bind(product.id)
        .execute(&pool)
        .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn ordered_products_cannot_be_deleted() {
    let pool = test_pool().await;
    let user = create_user(&pool).await;
    let product = create_product(&pool, 5, 100).await;
    add_to_cart(&pool, &user, product.id, 1).await;
    let mut ctx = RequestContext::new(current_user(&user));
    CheckoutService::new(&pool)
        .checkout(&mut ctx, &CheckoutRequest::mock())
        .await
        .unwrap();

    let products = ProductRepository::new(&pool);
    assert!(matches!(
        products.delete(product.id).await.unwrap_err(),
        RepositoryError::Conflict(_)
    ));

    // Cart lines go with the product
    let unsold = create_product(&pool, 5, 100).await;
    add_to_cart(&pool, &user, unsold.id, 1).await;
    products.delete(unsold.id).await.unwrap();
    assert!(products.get(unsold.id).await.unwrap().is_none());
    assert_eq!(CartRepository::new(&pool).count(user.id).await.unwrap(), 0);
    assert!(matches!(
        products.delete(unsold.id).await.unwrap_err(),
        RepositoryError::NotFound
    ));
}
