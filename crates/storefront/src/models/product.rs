//! Catalog types.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

use grocer_core::ProductId;

/// Category label for products with no category set.
pub const UNCATEGORIZED: &str = "Uncategorized";

/// A catalog product.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub stock_quantity: i32,
    pub price: Decimal,
    /// Stored file name of the product image.
    pub image: Option<String>,
    pub category: Option<String>,
    pub featured: bool,
    pub brand: Option<String>,
    pub best_before: Option<NaiveDate>,
    pub deal: bool,
    pub created_at: DateTime<Utc>,
}

impl Product {
    /// Category shown to shoppers.
    #[must_use]
    pub fn category_label(&self) -> &str {
        self.category.as_deref().unwrap_or(UNCATEGORIZED)
    }

    #[must_use]
    pub const fn in_stock(&self) -> bool {
        self.stock_quantity > 0
    }
}

/// Admin create/update payload.
///
/// Blank optional text fields are treated as unset.
#[derive(Debug, Clone, Deserialize)]
pub struct ProductInput {
    pub name: String,
    pub stock_quantity: i32,
    pub price: Decimal,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub image: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub category: Option<String>,
    #[serde(default)]
    pub featured: bool,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub brand: Option<String>,
    #[serde(default, deserialize_with = "blank_date_as_none")]
    pub best_before: Option<NaiveDate>,
    #[serde(default)]
    pub deal: bool,
}

/// Reasons a [`ProductInput`] is rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProductValidationError {
    #[error("product name is required")]
    MissingName,
    #[error("price cannot be negative")]
    NegativePrice,
    #[error("stock quantity cannot be negative")]
    NegativeStock,
}

impl ProductInput {
    /// Check the input and return it with the name trimmed.
    ///
    /// # Errors
    ///
    /// Returns the first [`ProductValidationError`] found.
    pub fn validated(mut self) -> Result<Self, ProductValidationError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(ProductValidationError::MissingName);
        }
        if self.price < Decimal::ZERO {
            return Err(ProductValidationError::NegativePrice);
        }
        if self.stock_quantity < 0 {
            return Err(ProductValidationError::NegativeStock);
        }
        self.name = name.to_owned();
        Ok(self)
    }
}

fn blank_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value
        .map(|s| s.trim().to_owned())
        .filter(|s| !s.is_empty()))
}

fn blank_date_as_none<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    match blank_as_none(deserializer)? {
        Some(s) => NaiveDate::parse_from_str(&s, "%Y-%m-%d")
            .map(Some)
            .map_err(serde::de::Error::custom),
        None => Ok(None),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn input(name: &str, price: Decimal, stock: i32) -> ProductInput {
        ProductInput {
            name: name.to_string(),
            stock_quantity: stock,
            price,
            image: None,
            category: None,
            featured: false,
            brand: None,
            best_before: None,
            deal: false,
        }
    }

    #[test]
    fn test_validated_trims_name() {
        let ok = input("  Oat Milk ", Decimal::new(349, 2), 4).validated().unwrap();
        assert_eq!(ok.name, "Oat Milk");
    }

    #[test]
    fn test_validated_rejects_bad_values() {
        assert_eq!(
            input("  ", Decimal::ONE, 1).validated().unwrap_err(),
            ProductValidationError::MissingName
        );
        assert_eq!(
            input("Eggs", Decimal::new(-1, 2), 1).validated().unwrap_err(),
            ProductValidationError::NegativePrice
        );
        assert_eq!(
            input("Eggs", Decimal::ONE, -1).validated().unwrap_err(),
            ProductValidationError::NegativeStock
        );
        assert!(input("Free sample", Decimal::ZERO, 0).validated().is_ok());
    }

    #[test]
    fn test_deserialize_blank_fields() {
        let parsed: ProductInput = serde_json::from_str(
            r#"{"name":"Rye Bread","stock_quantity":3,"price":"2.50",
                "category":"  ","brand":"Miller","best_before":""}"#,
        )
        .unwrap();
        assert_eq!(parsed.category, None);
        assert_eq!(parsed.brand.as_deref(), Some("Miller"));
        assert_eq!(parsed.best_before, None);
        assert_eq!(parsed.price, Decimal::new(250, 2));
        assert!(!parsed.featured);

        let dated: ProductInput = serde_json::from_str(
            r#"{"name":"Yogurt","stock_quantity":1,"price":"1.00","best_before":"2026-11-02"}"#,
        )
        .unwrap();
        assert_eq!(dated.best_before, NaiveDate::from_ymd_opt(2026, 11, 2));
    }
}
