//! Seed the catalog with sample products.
//!
//! Names follow `"<Category> Product <n>"`, stock is random in `0..=120`
//! and prices are random in `1.00..=30.00`. Every 11th product is featured.

use rand::Rng;
use rust_decimal::Decimal;

use grocer_storefront::db::ProductRepository;
use grocer_storefront::models::ProductInput;

use super::{CommandError, connect};

/// Categories sample products are spread across.
pub const SEED_CATEGORIES: [&str; 10] = [
    "Fruits",
    "Vegetables",
    "Dairy",
    "Meat",
    "Bakery",
    "Pantry",
    "Beverages",
    "Frozen",
    "Snacks",
    "Household",
];

const MAX_STOCK: i32 = 120;
const PRICE_CENTS: std::ops::RangeInclusive<i64> = 100..=3000;
const FEATURED_EVERY: u32 = 11;

/// Build the `n`th sample product (1-based).
fn sample_product(n: u32, rng: &mut impl Rng) -> ProductInput {
    let category = SEED_CATEGORIES[n as usize % SEED_CATEGORIES.len()];

    ProductInput {
        name: format!("{category} Product {n}"),
        stock_quantity: rng.random_range(0..=MAX_STOCK),
        price: Decimal::new(rng.random_range(PRICE_CENTS), 2),
        image: None,
        category: Some(category.to_owned()),
        featured: n % FEATURED_EVERY == 0,
        brand: None,
        best_before: None,
        deal: false,
    }
}

/// Insert `count` sample products.
///
/// # Errors
///
/// Returns an error if the database is unreachable or an insert fails.
pub async fn products(count: u32) -> Result<(), CommandError> {
    let pool = connect().await?;
    let repo = ProductRepository::new(&pool);

    let inputs: Vec<ProductInput> = {
        let mut rng = rand::rng();
        (1..=count).map(|n| sample_product(n, &mut rng)).collect()
    };

    for input in &inputs {
        repo.create(input).await?;
    }

    tracing::info!(count, "Seeding complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_products_stay_in_range() {
        let mut rng = rand::rng();
        for n in 1..=200 {
            let product = sample_product(n, &mut rng);
            assert!((0..=MAX_STOCK).contains(&product.stock_quantity));
            assert!(product.price >= Decimal::new(100, 2));
            assert!(product.price <= Decimal::new(3000, 2));
            assert_eq!(product.price.scale(), 2);
        }
    }

    #[test]
    fn test_every_eleventh_is_featured() {
        let mut rng = rand::rng();
        let featured: Vec<u32> = (1..=33)
            .filter(|&n| sample_product(n, &mut rng).featured)
            .collect();
        assert_eq!(featured, vec![11, 22, 33]);
    }

    #[test]
    fn test_names_carry_category() {
        let mut rng = rand::rng();
        let product = sample_product(3, &mut rng);
        assert_eq!(product.name, "Dairy Product 3");
        assert_eq!(product.category.as_deref(), Some("Dairy"));
        assert!(product.validated().is_ok());
    }
}
