//! # Domain Types
//!
//! Core records used throughout Niaga.
//!
//! ## Record Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Records                                  │
//! │                                                                         │
//! │  ┌──────────────┐      ┌──────────────┐      ┌──────────────┐          │
//! │  │   Consumer   │◄─────│  SalesOrder  │      │   Product    │          │
//! │  │  name, NPWP  │      │  so_number   │      │ code, price  │          │
//! │  └──────▲───────┘      └──────▲───────┘      └──────────────┘          │
//! │         │                     │ so_number                               │
//! │  ┌──────┴───────┐      ┌──────┴───────┐      ┌──────────────┐          │
//! │  │ SpdDocument  │─────►│   Invoice    │◄─────│  TaxInvoice  │          │
//! │  │  spd_number  │ inv# │ SAR / KW     │ inv# │  tax_number  │          │
//! │  │  entries[]   │      │ items[]      │      │  DPP, VAT    │          │
//! │  └──────────────┘      └──────────────┘      └──────────────┘          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every record has:
//! - `id`: UUID v4, immutable, never reused
//! - a business key (invoice number, SO number, tax number, ...) that
//!   people read and type, and that duplicate detection groups on

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::totals::{InvoiceTotals, LineInput};

// =============================================================================
// Consumer
// =============================================================================

/// A customer the company invoices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Consumer {
    pub id: String,
    pub name: String,
    pub address: Option<String>,
    /// Taxpayer number, printed on tax invoices.
    pub npwp: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Product
// =============================================================================

/// A catalog product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    pub id: String,
    /// Business identifier (e.g. `PIPE-PVC-4`).
    pub code: String,
    pub name: String,
    /// Unit of measure (pcs, kg, m, ...).
    pub unit: Option<String>,
    /// List price in whole Rupiah.
    pub price_rupiah: i64,
    /// Soft delete flag.
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns the list price as Money.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_rupiah(self.price_rupiah)
    }
}

// =============================================================================
// Sales Order
// =============================================================================

/// Lifecycle of a sales order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum SalesOrderStatus {
    /// Accepted, not yet invoiced.
    #[default]
    Open,
    /// At least one invoice references this order.
    Invoiced,
    /// Withdrawn by the customer.
    Cancelled,
}

impl SalesOrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SalesOrderStatus::Open => "open",
            SalesOrderStatus::Invoiced => "invoiced",
            SalesOrderStatus::Cancelled => "cancelled",
        }
    }
}

impl std::str::FromStr for SalesOrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "open" => Ok(SalesOrderStatus::Open),
            "invoiced" => Ok(SalesOrderStatus::Invoiced),
            "cancelled" | "canceled" => Ok(SalesOrderStatus::Cancelled),
            other => Err(format!("unknown sales order status '{}'", other)),
        }
    }
}

/// A customer order that invoices and SPD entries reference by `so_number`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SalesOrder {
    pub id: String,
    pub so_number: String,
    pub consumer_id: String,
    #[ts(as = "String")]
    pub order_date: NaiveDate,
    pub status: SalesOrderStatus,
    pub notes: Option<String>,
    #[cfg_attr(feature = "sqlx", sqlx(skip))]
    #[serde(default)]
    pub items: Vec<SalesOrderItem>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl SalesOrder {
    /// Order value before any invoice adjustments.
    pub fn subtotal(&self) -> Money {
        self.items.iter().map(SalesOrderItem::line_total).sum()
    }
}

/// A line on a sales order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SalesOrderItem {
    pub id: String,
    pub sales_order_id: String,
    pub product_id: Option<String>,
    pub description: String,
    pub quantity: i64,
    pub price_rupiah: i64,
}

impl SalesOrderItem {
    pub fn line_total(&self) -> Money {
        Money::from_rupiah(self.price_rupiah).multiply_quantity(self.quantity)
    }
}

// =============================================================================
// Invoice
// =============================================================================

/// Which numbering scheme an invoice belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceKind {
    /// Standard tax invoice, numbered `NNNN/SAR/YYYY`.
    Sar,
    /// Proforma / receipt (kwitansi), numbered `KW/YYYY/NNNN`.
    Kw,
}

impl InvoiceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceKind::Sar => "sar",
            InvoiceKind::Kw => "kw",
        }
    }
}

impl std::fmt::Display for InvoiceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.as_str().to_uppercase())
    }
}

impl std::str::FromStr for InvoiceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sar" => Ok(InvoiceKind::Sar),
            "kw" => Ok(InvoiceKind::Kw),
            other => Err(format!("unknown invoice kind '{}'", other)),
        }
    }
}

/// An issued invoice with its derived totals frozen at creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Invoice {
    pub id: String,
    pub kind: InvoiceKind,
    pub number: String,
    pub consumer_id: String,
    /// Sales order this invoice bills, if any.
    pub so_number: Option<String>,
    #[ts(as = "String")]
    pub invoice_date: NaiveDate,
    #[ts(as = "Option<String>")]
    pub due_date: Option<NaiveDate>,
    pub negotiation_rupiah: i64,
    pub dp_rupiah: i64,
    pub pelunasan_rupiah: i64,
    pub subtotal_rupiah: i64,
    pub goods_rupiah: i64,
    pub dpp_vat_rupiah: i64,
    pub vat_rupiah: i64,
    pub total_rupiah: i64,
    pub notes: Option<String>,
    #[cfg_attr(feature = "sqlx", sqlx(skip))]
    #[serde(default)]
    pub items: Vec<InvoiceItem>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Invoice {
    /// The stored totals as a pipeline result.
    pub fn totals(&self) -> InvoiceTotals {
        InvoiceTotals {
            subtotal: Money::from_rupiah(self.subtotal_rupiah),
            goods: Money::from_rupiah(self.goods_rupiah),
            dpp_vat: Money::from_rupiah(self.dpp_vat_rupiah),
            vat: Money::from_rupiah(self.vat_rupiah),
            total: Money::from_rupiah(self.total_rupiah),
        }
    }

    /// Line inputs for re-running the totals pipeline.
    pub fn line_inputs(&self) -> Vec<LineInput> {
        self.items.iter().map(InvoiceItem::line_input).collect()
    }

    pub fn negotiation(&self) -> Money {
        Money::from_rupiah(self.negotiation_rupiah)
    }

    pub fn dp(&self) -> Money {
        Money::from_rupiah(self.dp_rupiah)
    }

    pub fn pelunasan(&self) -> Money {
        Money::from_rupiah(self.pelunasan_rupiah)
    }
}

/// A billed line on an invoice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct InvoiceItem {
    pub id: String,
    pub invoice_id: String,
    pub description: String,
    pub quantity: i64,
    pub price_rupiah: i64,
}

impl InvoiceItem {
    pub fn line_input(&self) -> LineInput {
        LineInput::new(self.quantity, Money::from_rupiah(self.price_rupiah))
    }
}

/// Input for creating an invoice; the number and totals are derived.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct InvoiceDraft {
    pub kind: InvoiceKind,
    pub consumer_id: String,
    pub so_number: Option<String>,
    #[ts(as = "String")]
    pub invoice_date: NaiveDate,
    #[ts(as = "Option<String>")]
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub negotiation_rupiah: i64,
    #[serde(default)]
    pub dp_rupiah: i64,
    #[serde(default)]
    pub pelunasan_rupiah: i64,
    #[serde(default)]
    pub notes: Option<String>,
    pub items: Vec<LineDraft>,
}

impl InvoiceDraft {
    pub fn line_inputs(&self) -> Vec<LineInput> {
        self.items.iter().map(LineDraft::line_input).collect()
    }
}

/// A line as typed by the user, before it has an id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LineDraft {
    #[serde(default)]
    pub product_id: Option<String>,
    pub description: String,
    pub quantity: i64,
    pub price_rupiah: i64,
}

impl LineDraft {
    pub fn line_input(&self) -> LineInput {
        LineInput::new(self.quantity, Money::from_rupiah(self.price_rupiah))
    }
}

// =============================================================================
// Tax Invoice
// =============================================================================

/// A faktur pajak registered against an invoice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct TaxInvoice {
    pub id: String,
    /// Serial issued by the tax office (NSFP).
    pub tax_number: String,
    /// Invoice this faktur covers.
    pub invoice_number: String,
    pub consumer_id: Option<String>,
    #[ts(as = "String")]
    pub tax_date: NaiveDate,
    pub dpp_rupiah: i64,
    pub vat_rupiah: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// SPD (Surat Pengantar Dokumen)
// =============================================================================

/// A transmittal document listing invoices sent to a customer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SpdDocument {
    pub id: String,
    pub spd_number: String,
    pub consumer_id: String,
    #[ts(as = "String")]
    pub sent_date: NaiveDate,
    pub notes: Option<String>,
    pub total_rupiah: i64,
    #[cfg_attr(feature = "sqlx", sqlx(skip))]
    #[serde(default)]
    pub entries: Vec<SpdEntry>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// One invoice listed on an SPD.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SpdEntry {
    pub id: String,
    pub spd_id: String,
    pub invoice_number: String,
    pub so_number: Option<String>,
    pub tax_number: Option<String>,
    pub amount_rupiah: i64,
}

/// Input for creating an SPD.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SpdDraft {
    pub consumer_id: String,
    #[ts(as = "String")]
    pub sent_date: NaiveDate,
    #[serde(default)]
    pub notes: Option<String>,
    pub entries: Vec<SpdEntryDraft>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SpdEntryDraft {
    pub invoice_number: String,
    #[serde(default)]
    pub so_number: Option<String>,
    #[serde(default)]
    pub tax_number: Option<String>,
    pub amount_rupiah: i64,
}

impl SpdDraft {
    /// Sum of the listed amounts.
    pub fn total(&self) -> Money {
        self.entries
            .iter()
            .map(|e| Money::from_rupiah(e.amount_rupiah))
            .sum()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invoice_kind_parsing() {
        assert_eq!("sar".parse::<InvoiceKind>().unwrap(), InvoiceKind::Sar);
        assert_eq!(" KW ".parse::<InvoiceKind>().unwrap(), InvoiceKind::Kw);
        assert!("proforma".parse::<InvoiceKind>().is_err());
        assert_eq!(InvoiceKind::Sar.to_string(), "SAR");
    }

    #[test]
    fn test_sales_order_status_default() {
        assert_eq!(SalesOrderStatus::default(), SalesOrderStatus::Open);
        assert_eq!(
            "canceled".parse::<SalesOrderStatus>().unwrap(),
            SalesOrderStatus::Cancelled
        );
    }

    #[test]
    fn test_spd_draft_total() {
        let draft = SpdDraft {
            consumer_id: "c1".to_string(),
            sent_date: NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
            notes: None,
            entries: vec![
                SpdEntryDraft {
                    invoice_number: "0001/SAR/2026".to_string(),
                    so_number: None,
                    tax_number: None,
                    amount_rupiah: 222_000,
                },
                SpdEntryDraft {
                    invoice_number: "0002/SAR/2026".to_string(),
                    so_number: Some("SO-17".to_string()),
                    tax_number: None,
                    amount_rupiah: 111_000,
                },
            ],
        };
        assert_eq!(draft.total().rupiah(), 333_000);
    }

    #[test]
    fn test_sales_order_subtotal() {
        let now = Utc::now();
        let order = SalesOrder {
            id: "so".to_string(),
            so_number: "SO-1".to_string(),
            consumer_id: "c".to_string(),
            order_date: NaiveDate::from_ymd_opt(2026, 1, 5).unwrap(),
            status: SalesOrderStatus::Open,
            notes: None,
            items: vec![SalesOrderItem {
                id: "i".to_string(),
                sales_order_id: "so".to_string(),
                product_id: None,
                description: "Pipa PVC 4\"".to_string(),
                quantity: 4,
                price_rupiah: 25_000,
            }],
            created_at: now,
            updated_at: now,
        };
        assert_eq!(order.subtotal().rupiah(), 100_000);
    }

    #[test]
    fn test_draft_json_uses_snake_case_and_defaults() {
        let draft: InvoiceDraft = serde_json::from_str(
            r#"{
                "kind": "kw",
                "consumer_id": "c1",
                "so_number": null,
                "invoice_date": "2026-02-01",
                "items": [{ "description": "Semen 50 kg", "quantity": 2, "price_rupiah": 100000 }]
            }"#,
        )
        .unwrap();

        assert_eq!(draft.kind, InvoiceKind::Kw);
        assert_eq!(draft.dp_rupiah, 0);
        assert_eq!(draft.due_date, None);
        assert_eq!(draft.items[0].product_id, None);

        let status = serde_json::to_string(&SalesOrderStatus::Invoiced).unwrap();
        assert_eq!(status, "\"invoiced\"");
    }
}
