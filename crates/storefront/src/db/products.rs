//! Product catalog repository.

use sqlx::PgPool;

use grocer_core::ProductId;

use super::RepositoryError;
use crate::models::product::{Product, ProductInput, UNCATEGORIZED};

const PRODUCT_COLUMNS: &str = "id, name, stock_quantity, price, image, category, featured, \
                               brand, best_before, deal, created_at";

/// Repository for catalog reads and admin edits.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List products ordered by name, optionally limited to one category.
    ///
    /// Products without a category match [`UNCATEGORIZED`].
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, category: Option<&str>) -> Result<Vec<Product>, RepositoryError> {
        let products = sqlx::query_as::<_, Product>(&format!(
            r"
            SELECT {PRODUCT_COLUMNS}
            FROM products
            WHERE $1::text IS NULL OR COALESCE(category, $2) = $1
            ORDER BY name, id
            "
        ))
        .bind(category)
        .bind(UNCATEGORIZED)
        .fetch_all(self.pool)
        .await?;

        Ok(products)
    }

    /// Get a product by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(product)
    }

    /// Distinct category labels, sorted.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn categories(&self) -> Result<Vec<String>, RepositoryError> {
        let categories = sqlx::query_scalar::<_, String>(
            "SELECT DISTINCT COALESCE(category, $1) AS category FROM products ORDER BY category",
        )
        .bind(UNCATEGORIZED)
        .fetch_all(self.pool)
        .await?;

        Ok(categories)
    }

    /// Insert a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(&self, input: &ProductInput) -> Result<Product, RepositoryError> {
        let product = sqlx::query_as::<_, Product>(&format!(
            r"
            INSERT INTO products
                (name, stock_quantity, price, image, category, featured, brand, best_before, deal)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {PRODUCT_COLUMNS}
            "
        ))
        .bind(&input.name)
        .bind(input.stock_quantity)
        .bind(input.price)
        .bind(&input.image)
        .bind(&input.category)
        .bind(input.featured)
        .bind(&input.brand)
        .bind(input.best_before)
        .bind(input.deal)
        .fetch_one(self.pool)
        .await?;

        Ok(product)
    }

    /// Replace a product's editable fields.
    ///
    /// An input without an image keeps the stored image.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product doesn't exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn update(
        &self,
        id: ProductId,
        input: &ProductInput,
    ) -> Result<Product, RepositoryError> {
        sqlx::query_as::<_, Product>(&format!(
            r"
            UPDATE products
            SET name = $2, stock_quantity = $3, price = $4, image = COALESCE($5, image),
                category = $6, featured = $7, brand = $8, best_before = $9, deal = $10
            WHERE id = $1
            RETURNING {PRODUCT_COLUMNS}
            "
        ))
        .bind(id)
        .bind(&input.name)
        .bind(input.stock_quantity)
        .bind(input.price)
        .bind(&input.image)
        .bind(&input.category)
        .bind(input.featured)
        .bind(&input.brand)
        .bind(input.best_before)
        .bind(input.deal)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    /// Delete a product. Cart lines referencing it are removed with it.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product doesn't exist.
    /// Returns `RepositoryError::Conflict` if orders reference the product.
    pub async fn delete(&self, id: ProductId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await
            .map_err(|e| {
                RepositoryError::foreign_key_violation(e, "product appears in existing orders")
            })?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    /// Products with no category, for bulk categorization.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_uncategorized(&self) -> Result<Vec<Product>, RepositoryError> {
        let products = sqlx::query_as::<_, Product>(&format!(
            r"
            SELECT {PRODUCT_COLUMNS}
            FROM products
            WHERE category IS NULL OR btrim(category) = '' OR category = $1
            ORDER BY id
            "
        ))
        .bind(UNCATEGORIZED)
        .fetch_all(self.pool)
        .await?;

        Ok(products)
    }

    /// Set a product's category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product doesn't exist.
    pub async fn set_category(&self, id: ProductId, category: &str) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE products SET category = $2 WHERE id = $1")
            .bind(id)
            .bind(category)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }
}
