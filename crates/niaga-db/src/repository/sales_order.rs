//! # Sales Order Repository
//!
//! ## Sales Order Lifecycle
//! ```text
//! insert() ──► Open ──► InvoiceRepository::create(so_number) ──► Invoiced
//!               │
//!               └──► set_status(Cancelled) ──► Cancelled
//! ```
//! SO numbers are typed by people and may repeat; duplicate detection
//! reports repeats instead of the schema rejecting them.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use std::collections::HashMap;
use tracing::debug;

use crate::changes::{ChangeFeed, Collection};
use crate::error::{DbError, DbResult};
use niaga_core::validation::{
    validate_document_number, validate_line_count, validate_price, validate_quantity,
};
use niaga_core::{SalesOrder, SalesOrderItem, SalesOrderStatus};

const SELECT_ORDER: &str = r#"
    SELECT id, so_number, consumer_id, order_date, status, notes, created_at, updated_at
    FROM sales_orders
"#;

const SELECT_ITEM: &str = r#"
    SELECT id, sales_order_id, product_id, description, quantity, price_rupiah
    FROM sales_order_items
"#;

/// Repository for sales orders and their lines.
#[derive(Debug, Clone)]
pub struct SalesOrderRepository {
    pool: SqlitePool,
    changes: ChangeFeed,
}

impl SalesOrderRepository {
    pub fn new(pool: SqlitePool, changes: ChangeFeed) -> Self {
        SalesOrderRepository { pool, changes }
    }

    /// Inserts an order and all of its lines in one transaction.
    pub async fn insert(&self, order: &SalesOrder) -> DbResult<SalesOrder> {
        validate_document_number("so number", &order.so_number)?;
        validate_line_count(order.items.len())?;
        for item in &order.items {
            validate_quantity(item.quantity)?;
            validate_price(item.price_rupiah)?;
        }

        debug!(id = %order.id, so_number = %order.so_number, lines = order.items.len(), "Inserting sales order");

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO sales_orders (id, so_number, consumer_id, order_date, status, notes, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&order.id)
        .bind(order.so_number.trim())
        .bind(&order.consumer_id)
        .bind(order.order_date)
        .bind(order.status)
        .bind(&order.notes)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&mut *tx)
        .await?;

        for (line_no, item) in order.items.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO sales_order_items (id, sales_order_id, line_no, product_id, description, quantity, price_rupiah)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
            )
            .bind(&item.id)
            .bind(&order.id)
            .bind(line_no as i64)
            .bind(&item.product_id)
            .bind(&item.description)
            .bind(item.quantity)
            .bind(item.price_rupiah)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        self.changes.created(Collection::SalesOrders, &order.id);

        self.get_by_id(&order.id)
            .await?
            .ok_or_else(|| DbError::not_found("SalesOrder", &order.id))
    }

    async fn items_for(&self, order_id: &str) -> DbResult<Vec<SalesOrderItem>> {
        let items = sqlx::query_as::<_, SalesOrderItem>(&format!(
            "{SELECT_ITEM} WHERE sales_order_id = ?1 ORDER BY line_no"
        ))
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(items)
    }

    /// Gets an order with its lines.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<SalesOrder>> {
        let order = sqlx::query_as::<_, SalesOrder>(&format!("{SELECT_ORDER} WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match order {
            Some(mut order) => {
                order.items = self.items_for(&order.id).await?;
                Ok(Some(order))
            }
            None => Ok(None),
        }
    }

    /// Gets the earliest order carrying `so_number`.
    pub async fn get_by_number(&self, so_number: &str) -> DbResult<Option<SalesOrder>> {
        let id: Option<String> = sqlx::query_scalar(
            "SELECT id FROM sales_orders WHERE so_number = ?1 ORDER BY created_at, id LIMIT 1",
        )
        .bind(so_number.trim())
        .fetch_optional(&self.pool)
        .await?;

        match id {
            Some(id) => self.get_by_id(&id).await,
            None => Ok(None),
        }
    }

    /// All orders with their lines, oldest first.
    pub async fn list(&self) -> DbResult<Vec<SalesOrder>> {
        let mut conn = self.pool.acquire().await?;
        load_all(&mut conn).await
    }

    pub async fn set_status(&self, id: &str, status: SalesOrderStatus) -> DbResult<()> {
        debug!(id = %id, status = status.as_str(), "Setting sales order status");

        let result = sqlx::query("UPDATE sales_orders SET status = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(id)
            .bind(status)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("SalesOrder", id));
        }

        self.changes.updated(Collection::SalesOrders, id);
        Ok(())
    }
}

/// Every order with its lines, oldest first. Both reads run on `conn`.
pub(crate) async fn load_all(conn: &mut SqliteConnection) -> DbResult<Vec<SalesOrder>> {
    let mut orders =
        sqlx::query_as::<_, SalesOrder>(&format!("{SELECT_ORDER} ORDER BY order_date, created_at, id"))
            .fetch_all(&mut *conn)
            .await?;

    let items = sqlx::query_as::<_, SalesOrderItem>(&format!(
        "{SELECT_ITEM} ORDER BY sales_order_id, line_no"
    ))
    .fetch_all(&mut *conn)
    .await?;

    let mut by_order: HashMap<String, Vec<SalesOrderItem>> = HashMap::new();
    for item in items {
        by_order.entry(item.sales_order_id.clone()).or_default().push(item);
    }
    for order in &mut orders {
        order.items = by_order.remove(&order.id).unwrap_or_default();
    }

    Ok(orders)
}
