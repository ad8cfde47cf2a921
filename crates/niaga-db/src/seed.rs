//! # Demo Data
//!
//! Fills an empty database with a small, realistic ledger: consumers,
//! products, sales orders, SAR and KW invoices, tax invoices and one SPD.
//! One legacy invoice is imported with a number that is already in use so
//! `niaga duplicates` has something to show.
//!
//! Used by the `seed` binary and by `niaga seed`.

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::pool::Database;
use niaga_core::{
    Consumer, InvoiceDraft, InvoiceKind, LineDraft, NumberScheme, Product, SalesOrder,
    SalesOrderItem, SalesOrderStatus, SpdDraft, SpdEntryDraft, TaxInvoice,
};

const CONSUMERS: &[(&str, &str, Option<&str>)] = &[
    ("PT Sinar Abadi", "Jl. Gatot Subroto 12, Jakarta", Some("01.234.567.8-901.000")),
    ("CV Maju Jaya", "Jl. Asia Afrika 8, Bandung", Some("02.345.678.9-012.000")),
    ("Toko Bangunan Sentosa", "Jl. Pemuda 40, Semarang", None),
    ("PT Karya Mandiri", "Jl. Diponegoro 3, Surabaya", Some("3201234567890001")),
];

const PRODUCTS: &[(&str, &str, &str, i64)] = &[
    ("PIPE-PVC-4", "Pipa PVC 4 inch", "btg", 85_000),
    ("PIPE-PVC-2", "Pipa PVC 2 inch", "btg", 42_500),
    ("SEMEN-50", "Semen 50 kg", "sak", 68_000),
    ("CAT-TEMBOK-5", "Cat Tembok 5 kg", "pail", 125_000),
    ("KABEL-NYM-2.5", "Kabel NYM 2x2.5", "roll", 540_000),
    ("BESI-10", "Besi Beton 10 mm", "btg", 78_000),
];

/// What a seed run inserted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SeedSummary {
    pub consumers: usize,
    pub products: usize,
    pub sales_orders: usize,
    pub invoices: usize,
    pub tax_invoices: usize,
    pub spd_documents: usize,
    /// True when the database already held data and nothing was inserted.
    pub skipped: bool,
}

fn date(year: i32, month: u32, day: u32) -> DbResult<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| DbError::Internal(format!("invalid seed date {year}-{month}-{day}")))
}

/// Inserts the demo ledger for `year`. Does nothing when consumers exist.
pub async fn seed_demo(db: &Database, year: i32) -> DbResult<SeedSummary> {
    if !db.consumers().list().await?.is_empty() {
        info!("Database already has data, skipping seed");
        return Ok(SeedSummary {
            skipped: true,
            ..SeedSummary::default()
        });
    }

    let mut summary = SeedSummary::default();
    let now = Utc::now();

    let mut consumers = Vec::new();
    for (name, address, npwp) in CONSUMERS {
        let consumer = db
            .consumers()
            .insert(&Consumer {
                id: Uuid::new_v4().to_string(),
                name: name.to_string(),
                address: Some(address.to_string()),
                npwp: npwp.map(str::to_string),
                phone: None,
                email: None,
                created_at: now,
                updated_at: now,
            })
            .await?;
        consumers.push(consumer);
        summary.consumers += 1;
    }

    let mut products = Vec::new();
    for (code, name, unit, price) in PRODUCTS {
        let product = db
            .products()
            .insert(&Product {
                id: Uuid::new_v4().to_string(),
                code: code.to_string(),
                name: name.to_string(),
                unit: Some(unit.to_string()),
                price_rupiah: *price,
                is_active: true,
                created_at: now,
                updated_at: now,
            })
            .await?;
        products.push(product);
        summary.products += 1;
    }

    // One order per consumer, three lines each, rotating through the catalog.
    let mut orders = Vec::new();
    for (i, consumer) in consumers.iter().enumerate() {
        let order_id = Uuid::new_v4().to_string();
        let items = (0..3)
            .map(|j| {
                let product = &products[(i + j) % products.len()];
                SalesOrderItem {
                    id: Uuid::new_v4().to_string(),
                    sales_order_id: order_id.clone(),
                    product_id: Some(product.id.clone()),
                    description: product.name.clone(),
                    quantity: (j as i64 + 1) * 2,
                    price_rupiah: product.price_rupiah,
                }
            })
            .collect();
        let order = db
            .sales_orders()
            .insert(&SalesOrder {
                id: order_id,
                so_number: format!("SO-{}-{:03}", year, i + 1),
                consumer_id: consumer.id.clone(),
                order_date: date(year, 1, 5 + i as u32)?,
                status: SalesOrderStatus::Open,
                notes: None,
                items,
                created_at: now,
                updated_at: now,
            })
            .await?;
        orders.push(order);
        summary.sales_orders += 1;
    }

    // Invoice the first three orders: two SAR, one KW with a down payment.
    let mut issued = Vec::new();
    for (i, order) in orders.iter().take(3).enumerate() {
        let (kind, scheme, dp) = if i < 2 {
            (InvoiceKind::Sar, NumberScheme::sar(), 0)
        } else {
            (InvoiceKind::Kw, NumberScheme::kw(), order.subtotal().rupiah() / 10)
        };
        let draft = InvoiceDraft {
            kind,
            consumer_id: order.consumer_id.clone(),
            so_number: Some(order.so_number.clone()),
            invoice_date: date(year, 2, 1 + i as u32)?,
            due_date: Some(date(year, 3, 1 + i as u32)?),
            negotiation_rupiah: 0,
            dp_rupiah: dp,
            pelunasan_rupiah: 0,
            notes: None,
            items: order
                .items
                .iter()
                .map(|item| LineDraft {
                    product_id: item.product_id.clone(),
                    description: item.description.clone(),
                    quantity: item.quantity,
                    price_rupiah: item.price_rupiah,
                })
                .collect(),
        };
        issued.push(db.invoices().create(&draft, scheme).await?);
        summary.invoices += 1;
    }

    // A legacy invoice re-using the first SAR number.
    let legacy = InvoiceDraft {
        kind: InvoiceKind::Sar,
        consumer_id: consumers[3].id.clone(),
        so_number: None,
        invoice_date: date(year, 1, 20)?,
        due_date: None,
        negotiation_rupiah: 0,
        dp_rupiah: 0,
        pelunasan_rupiah: 0,
        notes: Some("Imported from spreadsheet".to_string()),
        items: vec![LineDraft {
            product_id: None,
            description: "Jasa pemasangan".to_string(),
            quantity: 1,
            price_rupiah: 1_500_000,
        }],
    };
    db.invoices()
        .insert_with_number(&legacy, &issued[0].number)
        .await?;
    summary.invoices += 1;

    // Faktur pajak for the first SAR invoice only.
    let first = &issued[0];
    db.tax_invoices()
        .insert(&TaxInvoice {
            id: Uuid::new_v4().to_string(),
            tax_number: format!("010.000-{}.00000001", year % 100),
            invoice_number: first.number.clone(),
            consumer_id: Some(first.consumer_id.clone()),
            tax_date: first.invoice_date,
            dpp_rupiah: first.dpp_vat_rupiah,
            vat_rupiah: first.vat_rupiah,
            created_at: now,
        })
        .await?;
    summary.tax_invoices += 1;

    db.spd()
        .create(&SpdDraft {
            consumer_id: first.consumer_id.clone(),
            sent_date: date(year, 2, 10)?,
            notes: None,
            entries: vec![SpdEntryDraft {
                invoice_number: first.number.clone(),
                so_number: first.so_number.clone(),
                tax_number: Some(format!("010.000-{}.00000001", year % 100)),
                amount_rupiah: first.total_rupiah,
            }],
        })
        .await?;
    summary.spd_documents += 1;

    info!(?summary, "Seed complete");
    Ok(summary)
}
