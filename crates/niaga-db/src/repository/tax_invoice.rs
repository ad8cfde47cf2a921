//! # Tax Invoice Repository
//!
//! Faktur pajak registered against invoice numbers. The link is by number,
//! not by id, because the tax office serial is often recorded before or
//! after the invoice itself is entered.

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::changes::{ChangeFeed, Collection};
use crate::error::{DbError, DbResult};
use niaga_core::validation::{validate_deduction, validate_document_number};
use niaga_core::TaxInvoice;

const SELECT_TAX_INVOICE: &str = r#"
    SELECT id, tax_number, invoice_number, consumer_id, tax_date, dpp_rupiah, vat_rupiah, created_at
    FROM tax_invoices
"#;

#[derive(Debug, Clone)]
pub struct TaxInvoiceRepository {
    pool: SqlitePool,
    changes: ChangeFeed,
}

impl TaxInvoiceRepository {
    pub fn new(pool: SqlitePool, changes: ChangeFeed) -> Self {
        TaxInvoiceRepository { pool, changes }
    }

    /// Inserts a tax invoice. Repeated (tax number, invoice number) pairs
    /// are stored and reported by duplicate detection.
    pub async fn insert(&self, tax: &TaxInvoice) -> DbResult<TaxInvoice> {
        validate_document_number("tax number", &tax.tax_number)?;
        validate_document_number("invoice number", &tax.invoice_number)?;
        validate_deduction("dpp", tax.dpp_rupiah)?;
        validate_deduction("vat", tax.vat_rupiah)?;

        debug!(id = %tax.id, tax_number = %tax.tax_number, invoice = %tax.invoice_number, "Inserting tax invoice");

        sqlx::query(
            r#"
            INSERT INTO tax_invoices (id, tax_number, invoice_number, consumer_id, tax_date, dpp_rupiah, vat_rupiah, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&tax.id)
        .bind(tax.tax_number.trim())
        .bind(tax.invoice_number.trim())
        .bind(&tax.consumer_id)
        .bind(tax.tax_date)
        .bind(tax.dpp_rupiah)
        .bind(tax.vat_rupiah)
        .bind(tax.created_at)
        .execute(&self.pool)
        .await?;

        self.changes.created(Collection::TaxInvoices, &tax.id);
        self.get_by_id(&tax.id)
            .await?
            .ok_or_else(|| DbError::not_found("TaxInvoice", &tax.id))
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<TaxInvoice>> {
        let tax = sqlx::query_as::<_, TaxInvoice>(&format!("{SELECT_TAX_INVOICE} WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(tax)
    }

    pub async fn list(&self) -> DbResult<Vec<TaxInvoice>> {
        let mut conn = self.pool.acquire().await?;
        load_all(&mut conn).await
    }

    /// Tax invoices covering one invoice number.
    pub async fn list_for_invoice(&self, invoice_number: &str) -> DbResult<Vec<TaxInvoice>> {
        let taxes = sqlx::query_as::<_, TaxInvoice>(&format!(
            "{SELECT_TAX_INVOICE} WHERE invoice_number = ?1 ORDER BY created_at, id"
        ))
        .bind(invoice_number.trim())
        .fetch_all(&self.pool)
        .await?;
        Ok(taxes)
    }

    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM tax_invoices WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("TaxInvoice", id));
        }

        self.changes.deleted(Collection::TaxInvoices, id);
        Ok(())
    }
}

pub(crate) async fn load_all(conn: &mut SqliteConnection) -> DbResult<Vec<TaxInvoice>> {
    let taxes = sqlx::query_as::<_, TaxInvoice>(&format!(
        "{SELECT_TAX_INVOICE} ORDER BY tax_date, created_at, id"
    ))
    .fetch_all(&mut *conn)
    .await?;
    Ok(taxes)
}
