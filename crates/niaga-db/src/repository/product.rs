//! # Product Repository
//!
//! Catalog products. Codes are unique; removal is a soft delete so old
//! sales order lines keep their `product_id`.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::changes::{ChangeFeed, Collection};
use crate::error::{DbError, DbResult};
use niaga_core::validation::{validate_price, validate_product_code, validate_product_name};
use niaga_core::Product;

const SELECT_PRODUCT: &str = r#"
    SELECT id, code, name, unit, price_rupiah, is_active, created_at, updated_at
    FROM products
"#;

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.products();
/// let hits = repo.search("pipa", 20).await?;
/// let product = repo.get_by_code("PIPE-PVC-4").await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
    changes: ChangeFeed,
}

impl ProductRepository {
    pub fn new(pool: SqlitePool, changes: ChangeFeed) -> Self {
        ProductRepository { pool, changes }
    }

    fn validate(product: &Product) -> DbResult<()> {
        validate_product_code(&product.code)?;
        validate_product_name(&product.name)?;
        validate_price(product.price_rupiah)?;
        Ok(())
    }

    /// Inserts a product.
    ///
    /// ## Errors
    /// `DbError::UniqueViolation` when the code is already taken.
    pub async fn insert(&self, product: &Product) -> DbResult<Product> {
        Self::validate(product)?;
        debug!(id = %product.id, code = %product.code, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (id, code, name, unit, price_rupiah, is_active, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&product.id)
        .bind(product.code.trim())
        .bind(product.name.trim())
        .bind(&product.unit)
        .bind(product.price_rupiah)
        .bind(product.is_active)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { field, .. } => DbError::duplicate(field, product.code.trim()),
            other => other,
        })?;

        self.changes.created(Collection::Products, &product.id);
        self.get_by_id(&product.id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", &product.id))
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(&format!("{SELECT_PRODUCT} WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(product)
    }

    pub async fn get_by_code(&self, code: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(&format!("{SELECT_PRODUCT} WHERE code = ?1"))
            .bind(code.trim())
            .fetch_optional(&self.pool)
            .await?;
        Ok(product)
    }

    /// Active products ordered by name.
    pub async fn list_active(&self, limit: u32) -> DbResult<Vec<Product>> {
        let mut conn = self.pool.acquire().await?;
        load_active(&mut conn, limit).await
    }

    /// Matches code prefix or name substring among active products.
    pub async fn search(&self, query: &str, limit: u32) -> DbResult<Vec<Product>> {
        let query = query.trim();
        debug!(query = %query, limit, "Searching products");

        if query.is_empty() {
            return self.list_active(limit).await;
        }

        let products = sqlx::query_as::<_, Product>(&format!(
            r#"{SELECT_PRODUCT}
            WHERE is_active = 1 AND (code LIKE ?1 OR name LIKE ?2)
            ORDER BY code
            LIMIT ?3"#
        ))
        .bind(format!("{}%", query))
        .bind(format!("%{}%", query))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        debug!(count = products.len(), "Search returned products");
        Ok(products)
    }

    pub async fn update(&self, product: &Product) -> DbResult<()> {
        Self::validate(product)?;
        debug!(id = %product.id, "Updating product");

        let result = sqlx::query(
            r#"
            UPDATE products SET
                code = ?2, name = ?3, unit = ?4, price_rupiah = ?5, is_active = ?6, updated_at = ?7
            WHERE id = ?1
            "#,
        )
        .bind(&product.id)
        .bind(product.code.trim())
        .bind(product.name.trim())
        .bind(&product.unit)
        .bind(product.price_rupiah)
        .bind(product.is_active)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", &product.id));
        }

        self.changes.updated(Collection::Products, &product.id);
        Ok(())
    }

    /// Marks a product inactive.
    pub async fn soft_delete(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("UPDATE products SET is_active = 0, updated_at = ?2 WHERE id = ?1")
            .bind(id)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        self.changes.updated(Collection::Products, id);
        Ok(())
    }

    /// Number of active products.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE is_active = 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

pub(crate) async fn load_active(conn: &mut SqliteConnection, limit: u32) -> DbResult<Vec<Product>> {
    let products = sqlx::query_as::<_, Product>(&format!(
        "{SELECT_PRODUCT} WHERE is_active = 1 ORDER BY name COLLATE NOCASE LIMIT ?1"
    ))
    .bind(limit)
    .fetch_all(&mut *conn)
    .await?;
    Ok(products)
}
