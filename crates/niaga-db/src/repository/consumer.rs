//! # Consumer Repository
//!
//! Customers the company invoices. Invoices, orders and SPDs reference a
//! consumer by id, so deleting one that still has documents fails with a
//! foreign key violation.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::changes::{ChangeFeed, Collection};
use crate::error::{DbError, DbResult};
use niaga_core::validation::{validate_consumer_name, validate_npwp};
use niaga_core::Consumer;

const SELECT_CONSUMER: &str = r#"
    SELECT id, name, address, npwp, phone, email, created_at, updated_at
    FROM consumers
"#;

/// Repository for consumer database operations.
#[derive(Debug, Clone)]
pub struct ConsumerRepository {
    pool: SqlitePool,
    changes: ChangeFeed,
}

impl ConsumerRepository {
    pub fn new(pool: SqlitePool, changes: ChangeFeed) -> Self {
        ConsumerRepository { pool, changes }
    }

    fn validate(consumer: &Consumer) -> DbResult<()> {
        validate_consumer_name(&consumer.name)?;
        if let Some(npwp) = consumer.npwp.as_deref().filter(|n| !n.trim().is_empty()) {
            validate_npwp(npwp)?;
        }
        Ok(())
    }

    /// Inserts a consumer after validating name and NPWP.
    pub async fn insert(&self, consumer: &Consumer) -> DbResult<Consumer> {
        Self::validate(consumer)?;
        debug!(id = %consumer.id, name = %consumer.name, "Inserting consumer");

        sqlx::query(
            r#"
            INSERT INTO consumers (id, name, address, npwp, phone, email, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&consumer.id)
        .bind(consumer.name.trim())
        .bind(&consumer.address)
        .bind(&consumer.npwp)
        .bind(&consumer.phone)
        .bind(&consumer.email)
        .bind(consumer.created_at)
        .bind(consumer.updated_at)
        .execute(&self.pool)
        .await?;

        self.changes.created(Collection::Consumers, &consumer.id);
        self.get_by_id(&consumer.id)
            .await?
            .ok_or_else(|| DbError::not_found("Consumer", &consumer.id))
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Consumer>> {
        let consumer = sqlx::query_as::<_, Consumer>(&format!("{SELECT_CONSUMER} WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(consumer)
    }

    /// All consumers ordered by name.
    pub async fn list(&self) -> DbResult<Vec<Consumer>> {
        let mut conn = self.pool.acquire().await?;
        load_all(&mut conn).await
    }

    /// Case-insensitive name substring search.
    pub async fn search(&self, query: &str, limit: u32) -> DbResult<Vec<Consumer>> {
        let query = query.trim();
        debug!(query = %query, limit, "Searching consumers");

        if query.is_empty() {
            let mut all = self.list().await?;
            all.truncate(limit as usize);
            return Ok(all);
        }

        let pattern = format!("%{}%", query);
        let consumers = sqlx::query_as::<_, Consumer>(&format!(
            "{SELECT_CONSUMER} WHERE name LIKE ?1 ORDER BY name COLLATE NOCASE LIMIT ?2"
        ))
        .bind(pattern)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(consumers)
    }

    pub async fn update(&self, consumer: &Consumer) -> DbResult<()> {
        Self::validate(consumer)?;
        debug!(id = %consumer.id, "Updating consumer");

        let result = sqlx::query(
            r#"
            UPDATE consumers SET
                name = ?2, address = ?3, npwp = ?4, phone = ?5, email = ?6, updated_at = ?7
            WHERE id = ?1
            "#,
        )
        .bind(&consumer.id)
        .bind(consumer.name.trim())
        .bind(&consumer.address)
        .bind(&consumer.npwp)
        .bind(&consumer.phone)
        .bind(&consumer.email)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Consumer", &consumer.id));
        }

        self.changes.updated(Collection::Consumers, &consumer.id);
        Ok(())
    }

    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM consumers WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Consumer", id));
        }

        self.changes.deleted(Collection::Consumers, id);
        Ok(())
    }
}

/// Every consumer by name, read on `conn`.
pub(crate) async fn load_all(conn: &mut SqliteConnection) -> DbResult<Vec<Consumer>> {
    let consumers =
        sqlx::query_as::<_, Consumer>(&format!("{SELECT_CONSUMER} ORDER BY name COLLATE NOCASE, id"))
            .fetch_all(&mut *conn)
            .await?;
    Ok(consumers)
}
