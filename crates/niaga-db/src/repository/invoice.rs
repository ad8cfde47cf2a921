//! # Invoice Repository
//!
//! SAR and KW invoices share one table, told apart by `kind`.
//!
//! ## Creating an Invoice
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  InvoiceDraft                                                           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  InvoiceTotals::compute (niaga-core) ── rejects bad lines / deductions  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  BEGIN IMMEDIATE (write lock held from the first read)                  │
//! │   ├── look up referenced sales order(s)                                 │
//! │   ├── claim next number for (kind, invoice year)                        │
//! │   ├── INSERT invoice + items                                            │
//! │   └── open sales order(s) ──► invoiced                                  │
//! │  COMMIT ──► ChangeFeed: invoice created, orders updated                 │
//! │                                                                         │
//! │  Lost the claim race? roll back, retry (allocation_attempts)            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{Datelike, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use std::collections::HashMap;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{begin_write, claim_next_number, clean_optional};
use crate::changes::{ChangeFeed, Collection};
use crate::error::{DbError, DbResult};
use niaga_core::validation::validate_document_number;
use niaga_core::{
    Invoice, InvoiceDraft, InvoiceItem, InvoiceKind, InvoiceTotals, Money, NumberScheme,
    SchemeKind, TaxPolicy, ValidationError,
};

const SELECT_INVOICE: &str = r#"
    SELECT id, kind, number, consumer_id, so_number, invoice_date, due_date,
           negotiation_rupiah, dp_rupiah, pelunasan_rupiah,
           subtotal_rupiah, goods_rupiah, dpp_vat_rupiah, vat_rupiah, total_rupiah,
           notes, created_at, updated_at
    FROM invoices
"#;

const SELECT_ITEM: &str = r#"
    SELECT id, invoice_id, description, quantity, price_rupiah
    FROM invoice_items
"#;

/// Repository for SAR / KW invoices.
#[derive(Debug, Clone)]
pub struct InvoiceRepository {
    pool: SqlitePool,
    changes: ChangeFeed,
    allocation_attempts: u32,
    policy: TaxPolicy,
}

impl InvoiceRepository {
    pub fn new(
        pool: SqlitePool,
        changes: ChangeFeed,
        allocation_attempts: u32,
        policy: TaxPolicy,
    ) -> Self {
        InvoiceRepository {
            pool,
            changes,
            allocation_attempts: allocation_attempts.max(1),
            policy,
        }
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Creates an invoice with the next number of `scheme` for the
    /// invoice's year.
    ///
    /// ## Errors
    /// - `Domain` when totals or validation reject the draft
    /// - `NotFound` when `so_number` names no sales order
    /// - `AllocationConflict` when every attempt lost the numbering race
    pub async fn create(&self, draft: &InvoiceDraft, scheme: NumberScheme) -> DbResult<Invoice> {
        if scheme.kind != SchemeKind::from(draft.kind) {
            return Err(ValidationError::InvalidFormat {
                field: "scheme".to_string(),
                reason: format!("{} invoices cannot use {} numbers", draft.kind, scheme.kind),
            }
            .into());
        }
        let totals = self.validate_draft(draft)?;
        let year = draft.invoice_date.year();

        for attempt in 1..=self.allocation_attempts {
            match self.try_create(draft, &scheme, year, &totals).await {
                Ok((invoice, invoiced_orders)) => {
                    info!(
                        id = %invoice.id,
                        number = %invoice.number,
                        total = %invoice.totals().total,
                        "Invoice created"
                    );
                    self.changes.created(Collection::Invoices, &invoice.id);
                    for order_id in &invoiced_orders {
                        self.changes.updated(Collection::SalesOrders, order_id);
                    }
                    return Ok(invoice);
                }
                Err(e) if e.is_retryable() => {
                    warn!(attempt, error = %e, scheme = %scheme.kind, year, "Invoice number allocation lost a race, retrying");
                }
                Err(e) => return Err(e),
            }
        }

        Err(DbError::AllocationConflict {
            scheme: scheme.kind.to_string(),
            year,
            attempts: self.allocation_attempts,
        })
    }

    async fn try_create(
        &self,
        draft: &InvoiceDraft,
        scheme: &NumberScheme,
        year: i32,
        totals: &InvoiceTotals,
    ) -> DbResult<(Invoice, Vec<String>)> {
        let mut tx = begin_write(&self.pool).await?;

        let so_number = clean_optional(&draft.so_number);
        let open_orders = match &so_number {
            Some(so) => {
                let orders: Vec<(String, String)> =
                    sqlx::query_as("SELECT id, status FROM sales_orders WHERE so_number = ?1")
                        .bind(so)
                        .fetch_all(&mut *tx)
                        .await?;
                if orders.is_empty() {
                    return Err(DbError::not_found("SalesOrder", so));
                }
                orders
                    .into_iter()
                    .filter(|(_, status)| status == "open")
                    .map(|(id, _)| id)
                    .collect()
            }
            None => Vec::new(),
        };

        let existing: Vec<String> = sqlx::query_scalar("SELECT number FROM invoices WHERE kind = ?1")
            .bind(draft.kind)
            .fetch_all(&mut *tx)
            .await?;

        let number = claim_next_number(&mut *tx, scheme, year, &existing).await?;
        let invoice = build_invoice(draft, number, totals);

        insert_rows(&mut *tx, &invoice).await?;

        let now = Utc::now();
        for order_id in &open_orders {
            sqlx::query("UPDATE sales_orders SET status = 'invoiced', updated_at = ?2 WHERE id = ?1")
                .bind(order_id)
                .bind(now)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok((invoice, open_orders))
    }

    /// Records an invoice that already has a number (legacy import).
    ///
    /// The number is stored as given; repeats are allowed and show up in
    /// duplicate detection. Totals are still recomputed from the lines.
    pub async fn insert_with_number(&self, draft: &InvoiceDraft, number: &str) -> DbResult<Invoice> {
        let mut imported = self
            .import_batch(&[(number.to_string(), draft.clone())])
            .await?;
        imported
            .pop()
            .ok_or_else(|| DbError::Internal("import stored no invoice".to_string()))
    }

    /// Records a batch of numbered invoices, all or nothing.
    ///
    /// Every record is validated before the first insert, and the inserts
    /// share one transaction. A rejected record leaves the ledger as it was.
    pub async fn import_batch(&self, records: &[(String, InvoiceDraft)]) -> DbResult<Vec<Invoice>> {
        let mut invoices = Vec::with_capacity(records.len());
        for (index, (number, draft)) in records.iter().enumerate() {
            let checked = validate_document_number("invoice number", number)
                .map_err(DbError::from)
                .and_then(|_| self.validate_draft(draft));
            match checked {
                Ok(totals) => invoices.push(build_invoice(draft, number.trim().to_string(), &totals)),
                Err(e) => {
                    warn!(index, number = %number, error = %e, "Import record rejected, nothing stored");
                    return Err(e);
                }
            }
        }

        let mut tx = begin_write(&self.pool).await?;
        for invoice in &invoices {
            debug!(id = %invoice.id, number = %invoice.number, "Importing invoice");
            insert_rows(&mut *tx, invoice).await?;
        }
        tx.commit().await?;

        for invoice in &invoices {
            self.changes.created(Collection::Invoices, &invoice.id);
        }
        Ok(invoices)
    }

    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM invoices WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Invoice", id));
        }

        self.changes.deleted(Collection::Invoices, id);
        Ok(())
    }

    fn validate_draft(&self, draft: &InvoiceDraft) -> DbResult<InvoiceTotals> {
        if draft.consumer_id.trim().is_empty() {
            return Err(ValidationError::Required {
                field: "consumer".to_string(),
            }
            .into());
        }
        if let Some(so) = clean_optional(&draft.so_number) {
            validate_document_number("so number", &so)?;
        }
        let totals = InvoiceTotals::compute(
            &draft.line_inputs(),
            Money::from_rupiah(draft.negotiation_rupiah),
            Money::from_rupiah(draft.dp_rupiah),
            Money::from_rupiah(draft.pelunasan_rupiah),
            self.policy,
        )?;
        Ok(totals)
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Invoice>> {
        let invoice = sqlx::query_as::<_, Invoice>(&format!("{SELECT_INVOICE} WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match invoice {
            Some(mut invoice) => {
                invoice.items = sqlx::query_as::<_, InvoiceItem>(&format!(
                    "{SELECT_ITEM} WHERE invoice_id = ?1 ORDER BY line_no"
                ))
                .bind(&invoice.id)
                .fetch_all(&self.pool)
                .await?;
                Ok(Some(invoice))
            }
            None => Ok(None),
        }
    }

    /// Gets the earliest invoice carrying `number` (any kind).
    pub async fn get_by_number(&self, number: &str) -> DbResult<Option<Invoice>> {
        let id: Option<String> = sqlx::query_scalar(
            "SELECT id FROM invoices WHERE number = ?1 ORDER BY created_at, id LIMIT 1",
        )
        .bind(number.trim())
        .fetch_optional(&self.pool)
        .await?;

        match id {
            Some(id) => self.get_by_id(&id).await,
            None => Ok(None),
        }
    }

    /// Invoices of one kind with their items, oldest first.
    pub async fn list_by_kind(&self, kind: InvoiceKind) -> DbResult<Vec<Invoice>> {
        let mut conn = self.pool.acquire().await?;
        let invoices = sqlx::query_as::<_, Invoice>(&format!(
            "{SELECT_INVOICE} WHERE kind = ?1 ORDER BY invoice_date, created_at, id"
        ))
        .bind(kind)
        .fetch_all(&mut *conn)
        .await?;
        attach_items(&mut conn, invoices).await
    }

    /// Every invoice with items, oldest first.
    pub async fn list_all(&self) -> DbResult<Vec<Invoice>> {
        let mut conn = self.pool.acquire().await?;
        load_all(&mut conn).await
    }

    /// Raw numbers of one kind, for allocation and reporting.
    pub async fn numbers_for_kind(&self, kind: InvoiceKind) -> DbResult<Vec<String>> {
        let numbers = sqlx::query_scalar("SELECT number FROM invoices WHERE kind = ?1 ORDER BY created_at, id")
            .bind(kind)
            .fetch_all(&self.pool)
            .await?;
        Ok(numbers)
    }

}

// =============================================================================
// Helpers
// =============================================================================

pub(crate) async fn load_all(conn: &mut SqliteConnection) -> DbResult<Vec<Invoice>> {
    let invoices = sqlx::query_as::<_, Invoice>(&format!(
        "{SELECT_INVOICE} ORDER BY invoice_date, created_at, id"
    ))
    .fetch_all(&mut *conn)
    .await?;
    attach_items(conn, invoices).await
}

async fn attach_items(conn: &mut SqliteConnection, mut invoices: Vec<Invoice>) -> DbResult<Vec<Invoice>> {
    let items = sqlx::query_as::<_, InvoiceItem>(&format!(
        "{SELECT_ITEM} ORDER BY invoice_id, line_no"
    ))
    .fetch_all(&mut *conn)
    .await?;

    let mut by_invoice: HashMap<String, Vec<InvoiceItem>> = HashMap::new();
    for item in items {
        by_invoice.entry(item.invoice_id.clone()).or_default().push(item);
    }
    for invoice in &mut invoices {
        invoice.items = by_invoice.remove(&invoice.id).unwrap_or_default();
    }
    Ok(invoices)
}

fn build_invoice(draft: &InvoiceDraft, number: String, totals: &InvoiceTotals) -> Invoice {
    let id = Uuid::new_v4().to_string();
    let now = Utc::now();

    let items = draft
        .items
        .iter()
        .map(|line| InvoiceItem {
            id: Uuid::new_v4().to_string(),
            invoice_id: id.clone(),
            description: line.description.trim().to_string(),
            quantity: line.quantity,
            price_rupiah: line.price_rupiah,
        })
        .collect();

    let mut invoice = Invoice {
        id,
        kind: draft.kind,
        number,
        consumer_id: draft.consumer_id.trim().to_string(),
        so_number: clean_optional(&draft.so_number),
        invoice_date: draft.invoice_date,
        due_date: draft.due_date,
        negotiation_rupiah: draft.negotiation_rupiah,
        dp_rupiah: draft.dp_rupiah,
        pelunasan_rupiah: draft.pelunasan_rupiah,
        subtotal_rupiah: 0,
        goods_rupiah: 0,
        dpp_vat_rupiah: 0,
        vat_rupiah: 0,
        total_rupiah: 0,
        notes: clean_optional(&draft.notes),
        items,
        created_at: now,
        updated_at: now,
    };
    totals.apply_to(&mut invoice);
    invoice
}

async fn insert_rows(conn: &mut SqliteConnection, invoice: &Invoice) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO invoices (
            id, kind, number, consumer_id, so_number, invoice_date, due_date,
            negotiation_rupiah, dp_rupiah, pelunasan_rupiah,
            subtotal_rupiah, goods_rupiah, dpp_vat_rupiah, vat_rupiah, total_rupiah,
            notes, created_at, updated_at
        ) VALUES (
            ?1, ?2, ?3, ?4, ?5, ?6, ?7,
            ?8, ?9, ?10,
            ?11, ?12, ?13, ?14, ?15,
            ?16, ?17, ?18
        )
        "#,
    )
    .bind(&invoice.id)
    .bind(invoice.kind)
    .bind(&invoice.number)
    .bind(&invoice.consumer_id)
    .bind(&invoice.so_number)
    .bind(invoice.invoice_date)
    .bind(invoice.due_date)
    .bind(invoice.negotiation_rupiah)
    .bind(invoice.dp_rupiah)
    .bind(invoice.pelunasan_rupiah)
    .bind(invoice.subtotal_rupiah)
    .bind(invoice.goods_rupiah)
    .bind(invoice.dpp_vat_rupiah)
    .bind(invoice.vat_rupiah)
    .bind(invoice.total_rupiah)
    .bind(&invoice.notes)
    .bind(invoice.created_at)
    .bind(invoice.updated_at)
    .execute(&mut *conn)
    .await?;

    for (line_no, item) in invoice.items.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO invoice_items (id, invoice_id, line_no, description, quantity, price_rupiah)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&item.id)
        .bind(&item.invoice_id)
        .bind(line_no as i64)
        .bind(&item.description)
        .bind(item.quantity)
        .bind(item.price_rupiah)
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}
