//! # Ledger Snapshot
//!
//! An in-memory view of every collection. Reports and previews run
//! against the snapshot with the pure functions from `niaga-core` and
//! never touch SQL themselves.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Database::snapshot()                                                   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  LedgerSnapshot                                                         │
//! │  ├── duplicate_report()              → niaga_core::duplicates           │
//! │  ├── next_number(scheme, year)       → niaga_core::numbering            │
//! │  ├── outstanding_sales_orders()      → status == Open                   │
//! │  ├── invoices_without_tax_invoice()  → SAR with no faktur               │
//! │  └── summary()                       → counts for `niaga report`        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use tracing::debug;

use crate::changes::Collection;
use crate::error::DbResult;
use crate::pool::Database;
use crate::repository;
use niaga_core::duplicates::{
    duplicate_invoice_numbers, duplicate_so_numbers, duplicate_tax_invoices, DuplicateGroup,
};
use niaga_core::{
    Consumer, CoreResult, Invoice, InvoiceKind, NumberScheme, Product, SalesOrder,
    SalesOrderStatus, SchemeKind, SpdDocument, TaxInvoice,
};

/// Every collection as of one point in time (one read transaction).
#[derive(Debug, Clone, Serialize)]
pub struct LedgerSnapshot {
    pub consumers: Vec<Consumer>,
    pub products: Vec<Product>,
    pub sales_orders: Vec<SalesOrder>,
    pub invoices: Vec<Invoice>,
    pub tax_invoices: Vec<TaxInvoice>,
    pub spd_documents: Vec<SpdDocument>,
    /// Highest claimed sequence per (scheme, year).
    #[serde(skip)]
    claims: HashMap<(SchemeKind, i32), u32>,
    pub loaded_at: DateTime<Utc>,
}

/// One record inside a duplicate group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateMember {
    pub id: String,
    pub collection: Collection,
    pub date: NaiveDate,
    pub consumer_id: Option<String>,
}

/// All duplicate groups found in a snapshot.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DuplicateReport {
    /// SAR and KW invoices sharing a number.
    pub invoice_numbers: Vec<DuplicateGroup<String, DuplicateMember>>,
    /// Tax invoices repeating a (tax number, invoice number) pair.
    pub tax_invoices: Vec<DuplicateGroup<(String, String), DuplicateMember>>,
    /// Sales orders sharing an SO number.
    pub so_numbers: Vec<DuplicateGroup<String, DuplicateMember>>,
}

impl DuplicateReport {
    pub fn is_empty(&self) -> bool {
        self.invoice_numbers.is_empty() && self.tax_invoices.is_empty() && self.so_numbers.is_empty()
    }

    pub fn group_count(&self) -> usize {
        self.invoice_numbers.len() + self.tax_invoices.len() + self.so_numbers.len()
    }
}

/// Headline numbers for a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SnapshotSummary {
    pub consumers: usize,
    pub products: usize,
    pub sales_orders: usize,
    pub sar_invoices: usize,
    pub kw_invoices: usize,
    pub tax_invoices: usize,
    pub spd_documents: usize,
    pub invoiced_total_rupiah: i64,
    pub vat_total_rupiah: i64,
    pub outstanding_sales_orders: usize,
    pub invoices_without_tax_invoice: usize,
    pub duplicate_groups: usize,
}

impl LedgerSnapshot {
    /// Loads every collection plus the highest sequence claims.
    ///
    /// All reads share one transaction on one connection, so in WAL mode
    /// they see the same committed state.
    pub(crate) async fn load(db: &Database) -> DbResult<Self> {
        let mut tx = db.pool().begin().await?;

        let consumers = repository::consumer::load_all(&mut tx).await?;
        let products = repository::product::load_active(&mut tx, u32::MAX).await?;
        let sales_orders = repository::sales_order::load_all(&mut tx).await?;
        let invoices = repository::invoice::load_all(&mut tx).await?;
        let tax_invoices = repository::tax_invoice::load_all(&mut tx).await?;
        let spd_documents = repository::spd::load_all(&mut tx).await?;

        let rows: Vec<(String, i32, i64)> =
            sqlx::query_as("SELECT kind, year, MAX(seq) FROM sequence_claims GROUP BY kind, year")
                .fetch_all(&mut *tx)
                .await?;
        tx.commit().await?;

        let claims = rows
            .into_iter()
            .filter_map(|(kind, year, seq)| {
                let kind = kind.parse::<SchemeKind>().ok()?;
                Some(((kind, year), u32::try_from(seq).ok()?))
            })
            .collect();

        debug!(
            invoices = invoices.len(),
            sales_orders = sales_orders.len(),
            tax_invoices = tax_invoices.len(),
            "Snapshot loaded"
        );

        Ok(LedgerSnapshot {
            consumers,
            products,
            sales_orders,
            invoices,
            tax_invoices,
            spd_documents,
            claims,
            loaded_at: Utc::now(),
        })
    }

    /// Groups every natural key used more than once.
    pub fn duplicate_report(&self) -> DuplicateReport {
        let invoice_member = |inv: &Invoice| DuplicateMember {
            id: inv.id.clone(),
            collection: Collection::Invoices,
            date: inv.invoice_date,
            consumer_id: Some(inv.consumer_id.clone()),
        };

        DuplicateReport {
            invoice_numbers: duplicate_invoice_numbers(&self.invoices)
                .into_iter()
                .map(|g| g.map_members(invoice_member))
                .collect(),
            tax_invoices: duplicate_tax_invoices(&self.tax_invoices)
                .into_iter()
                .map(|g| {
                    g.map_members(|t| DuplicateMember {
                        id: t.id.clone(),
                        collection: Collection::TaxInvoices,
                        date: t.tax_date,
                        consumer_id: t.consumer_id.clone(),
                    })
                })
                .collect(),
            so_numbers: duplicate_so_numbers(&self.sales_orders)
                .into_iter()
                .map(|g| {
                    g.map_members(|so| DuplicateMember {
                        id: so.id.clone(),
                        collection: Collection::SalesOrders,
                        date: so.order_date,
                        consumer_id: Some(so.consumer_id.clone()),
                    })
                })
                .collect(),
        }
    }

    /// Stored numbers of one scheme.
    pub fn numbers_for(&self, kind: SchemeKind) -> Vec<&str> {
        match kind {
            SchemeKind::Sar => self.invoice_numbers(InvoiceKind::Sar),
            SchemeKind::Kw => self.invoice_numbers(InvoiceKind::Kw),
            SchemeKind::Spd => self.spd_documents.iter().map(|d| d.spd_number.as_str()).collect(),
        }
    }

    fn invoice_numbers(&self, kind: InvoiceKind) -> Vec<&str> {
        self.invoices
            .iter()
            .filter(|i| i.kind == kind)
            .map(|i| i.number.as_str())
            .collect()
    }

    /// The number `create` would hand out next for `scheme` in `year`,
    /// counting claims whose documents were since deleted.
    pub fn next_number(&self, scheme: NumberScheme, year: i32) -> CoreResult<String> {
        let from_numbers = scheme.highest(self.numbers_for(scheme.kind), year);
        let from_claims = self.claims.get(&(scheme.kind, year)).copied();
        let seq = scheme.sequence_after(from_numbers.max(from_claims), year)?;
        scheme.format(year, seq)
    }

    /// Orders not yet invoiced or cancelled.
    pub fn outstanding_sales_orders(&self) -> Vec<&SalesOrder> {
        self.sales_orders
            .iter()
            .filter(|so| so.status == SalesOrderStatus::Open)
            .collect()
    }

    /// SAR invoices that no tax invoice references.
    pub fn invoices_without_tax_invoice(&self) -> Vec<&Invoice> {
        let covered: HashSet<&str> = self
            .tax_invoices
            .iter()
            .map(|t| t.invoice_number.trim())
            .collect();

        self.invoices
            .iter()
            .filter(|i| i.kind == InvoiceKind::Sar && !covered.contains(i.number.trim()))
            .collect()
    }

    pub fn summary(&self) -> SnapshotSummary {
        let count_kind = |kind| self.invoices.iter().filter(|i| i.kind == kind).count();
        SnapshotSummary {
            consumers: self.consumers.len(),
            products: self.products.len(),
            sales_orders: self.sales_orders.len(),
            sar_invoices: count_kind(InvoiceKind::Sar),
            kw_invoices: count_kind(InvoiceKind::Kw),
            tax_invoices: self.tax_invoices.len(),
            spd_documents: self.spd_documents.len(),
            invoiced_total_rupiah: self.invoices.iter().map(|i| i.total_rupiah).sum(),
            vat_total_rupiah: self.invoices.iter().map(|i| i.vat_rupiah).sum(),
            outstanding_sales_orders: self.outstanding_sales_orders().len(),
            invoices_without_tax_invoice: self.invoices_without_tax_invoice().len(),
            duplicate_groups: self.duplicate_report().group_count(),
        }
    }
}
