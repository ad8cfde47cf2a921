//! # Repository Module
//!
//! One repository per stored collection.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  CLI command                                                            │
//! │       │  db.invoices().create(&draft, NumberScheme::sar())              │
//! │       ▼                                                                 │
//! │  InvoiceRepository                                                      │
//! │  ├── niaga-core: totals, numbering, validation                          │
//! │  ├── SQL in one transaction                                             │
//! │  └── ChangeFeed::created after commit                                   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite Database                                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`ConsumerRepository`](consumer::ConsumerRepository) - Customers
//! - [`ProductRepository`](product::ProductRepository) - Catalog
//! - [`SalesOrderRepository`](sales_order::SalesOrderRepository) - Orders and lines
//! - [`InvoiceRepository`](invoice::InvoiceRepository) - SAR / KW invoices
//! - [`TaxInvoiceRepository`](tax_invoice::TaxInvoiceRepository) - Faktur pajak
//! - [`SpdRepository`](spd::SpdRepository) - Transmittal documents

pub mod consumer;
pub mod invoice;
pub mod product;
pub mod sales_order;
pub mod spd;
pub mod tax_invoice;

use chrono::Utc;
use niaga_core::NumberScheme;
use sqlx::{Sqlite, SqliteConnection, SqlitePool, Transaction};
use tracing::debug;

use crate::error::DbResult;

// =============================================================================
// Sequence Claims
// =============================================================================

/// Opens a transaction that holds the SQLite write lock from its first
/// statement.
///
/// A deferred transaction that reads before writing fails with
/// `SQLITE_BUSY` when another writer commits first, without waiting.
/// `BEGIN IMMEDIATE` queues on the busy timeout instead.
pub(crate) async fn begin_write(pool: &SqlitePool) -> DbResult<Transaction<'static, Sqlite>> {
    Ok(pool.begin_with("BEGIN IMMEDIATE").await?)
}

/// Picks the next number for `scheme`/`year` and claims it.
///
/// ## How It Works
/// ```text
/// existing numbers ──► highest parsed seq ─┐
///                                          ├─► max ─► +1 ─► INSERT sequence_claims
/// sequence_claims  ──► MAX(seq)  ──────────┘                    │
///                                                               ├─ ok: number is ours
///                                                               └─ UNIQUE failed: lost race
/// ```
/// Must run inside the same `begin_write` transaction as the document
/// insert. A lost race surfaces as `DbError::UniqueViolation` or
/// `DbError::Busy`; the caller retries on `is_retryable()`.
pub(crate) async fn claim_next_number(
    conn: &mut SqliteConnection,
    scheme: &NumberScheme,
    year: i32,
    existing: &[String],
) -> DbResult<String> {
    let claimed: Option<i64> = sqlx::query_scalar(
        "SELECT MAX(seq) FROM sequence_claims WHERE kind = ?1 AND year = ?2",
    )
    .bind(scheme.kind.as_str())
    .bind(year)
    .fetch_one(&mut *conn)
    .await?;

    let from_numbers = scheme.highest(existing, year);
    let from_claims = claimed.and_then(|c| u32::try_from(c).ok());
    let highest = from_numbers.max(from_claims);

    let seq = scheme.sequence_after(highest, year)?;
    let number = scheme.format(year, seq)?;

    debug!(scheme = %scheme.kind, year, seq, number = %number, "Claiming sequence");

    sqlx::query("INSERT INTO sequence_claims (kind, year, seq, claimed_at) VALUES (?1, ?2, ?3, ?4)")
        .bind(scheme.kind.as_str())
        .bind(year)
        .bind(i64::from(seq))
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

    Ok(number)
}

/// Trims optional text, mapping blank to `None`.
pub(crate) fn clean_optional(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
