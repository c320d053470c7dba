//! Assign categories to uncategorized products from their names.
//!
//! Mappings are tried in order and the first keyword hit wins. Single-word
//! keywords match the start of any word in the name (`egg` matches
//! "Free Range Eggs" but `tea` does not match "Steak"); multi-word keywords
//! match anywhere. Products with no hit are labelled `Uncategorized`.

use grocer_storefront::db::ProductRepository;
use grocer_storefront::models::UNCATEGORIZED;

use super::{CommandError, connect};

/// Category keyword table.
const CATEGORY_KEYWORDS: &[(&str, &[&str])] = &[
    (
        "Fruits & Vegetables",
        &[
            "banana", "apple", "tomato", "lettuce", "spinach", "carrot", "cucumber", "onion",
            "garlic", "fruit",
        ],
    ),
    (
        "Dairy & Eggs",
        &["milk", "egg", "butter", "cheese", "yogurt", "cottage", "dairy"],
    ),
    (
        "Meat & Seafood",
        &["chicken", "beef", "salmon", "fish", "sausage", "meat"],
    ),
    ("Bakery", &["bread", "bagel", "croissant", "pancake", "muffin"]),
    (
        "Beverages",
        &["water", "juice", "tea", "coffee", "drink", "energy"],
    ),
    (
        "Snacks & Candy",
        &["chip", "chocolate", "candy", "muesli", "cracker", "seaweed"],
    ),
    (
        "Canned & Packaged Foods",
        &[
            "noodle", "spam", "tuna", "bean", "pasta", "rice", "sardine", "corn", "lentil",
        ],
    ),
    ("Frozen Foods", &["frozen", "ice cream", "pizza"]),
    (
        "Personal Care",
        &["shampoo", "soap", "toothpaste", "shave", "face wash", "lip balm"],
    ),
    (
        "Household",
        &["toilet", "dishwash", "dog food", "cat food", "paper"],
    ),
];

/// Category for a product name, or `None` when no keyword matches.
#[must_use]
pub fn category_for(name: &str) -> Option<&'static str> {
    let lower = name.to_lowercase();
    let words: Vec<&str> = lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();

    let hit = |keyword: &str| {
        if keyword.contains(' ') {
            lower.contains(keyword)
        } else {
            words.iter().any(|w| w.starts_with(keyword))
        }
    };

    CATEGORY_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| hit(k)))
        .map(|(category, _)| *category)
}

/// Categorize every uncategorized product.
///
/// # Errors
///
/// Returns an error if the database is unreachable or an update fails.
pub async fn run(dry_run: bool) -> Result<(), CommandError> {
    let pool = connect().await?;
    let repo = ProductRepository::new(&pool);

    let products = repo.list_uncategorized().await?;
    tracing::info!(count = products.len(), dry_run, "Found uncategorized products");

    let mut matched = 0usize;
    for product in &products {
        let category = match category_for(&product.name) {
            Some(category) => {
                matched += 1;
                category
            }
            None => UNCATEGORIZED,
        };

        tracing::info!(product_id = %product.id, name = %product.name, category, "Assigned");
        if !dry_run {
            repo.set_category(product.id, category).await?;
        }
    }

    tracing::info!(
        matched,
        unmatched = products.len() - matched,
        "Categorization complete"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_matches() {
        assert_eq!(category_for("Cavendish Bananas"), Some("Fruits & Vegetables"));
        assert_eq!(category_for("Free Range Eggs 12pk"), Some("Dairy & Eggs"));
        assert_eq!(category_for("Atlantic Salmon Fillet"), Some("Meat & Seafood"));
        assert_eq!(category_for("Sourdough Bread"), Some("Bakery"));
        assert_eq!(category_for("Green Tea"), Some("Beverages"));
        assert_eq!(category_for("Potato Chips"), Some("Snacks & Candy"));
        assert_eq!(category_for("Vanilla Ice Cream"), Some("Frozen Foods"));
        assert_eq!(category_for("Mint Toothpaste"), Some("Personal Care"));
        assert_eq!(category_for("Adult Dog Food 2kg"), Some("Household"));
    }

    #[test]
    fn test_first_mapping_wins() {
        // "apple" and "juice" both hit; produce comes first
        assert_eq!(category_for("Apple Juice"), Some("Fruits & Vegetables"));
    }

    #[test]
    fn test_word_start_only() {
        assert_eq!(category_for("Ribeye Steak"), None);
        assert_eq!(category_for("Crabapple"), None);
    }

    #[test]
    fn test_no_match() {
        assert_eq!(category_for("Mystery Item"), None);
        assert_eq!(category_for(""), None);
    }
}
