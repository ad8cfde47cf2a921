#![allow(dead_code)]

use chrono::{NaiveDate, Utc};
use niaga_core::{
    Consumer, InvoiceDraft, InvoiceKind, LineDraft, SalesOrder, SalesOrderItem, SalesOrderStatus,
};
use niaga_db::{Database, DbConfig};
use tempfile::TempDir;
use uuid::Uuid;

pub async fn setup() -> Database {
    Database::new(DbConfig::in_memory()).await.unwrap()
}

/// A ledger file inside `dir` with a pool wide enough for real races.
pub async fn setup_file(dir: &TempDir, max_connections: u32) -> Database {
    let config = DbConfig::new(dir.path().join("ledger.db")).max_connections(max_connections);
    Database::new(config).await.unwrap()
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub async fn add_consumer(db: &Database, name: &str) -> Consumer {
    let now = Utc::now();
    db.consumers()
        .insert(&Consumer {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            address: None,
            npwp: None,
            phone: None,
            email: None,
            created_at: now,
            updated_at: now,
        })
        .await
        .unwrap()
}

pub async fn add_order(db: &Database, consumer: &Consumer, so_number: &str) -> SalesOrder {
    let now = Utc::now();
    let id = Uuid::new_v4().to_string();
    db.sales_orders()
        .insert(&SalesOrder {
            id: id.clone(),
            so_number: so_number.to_string(),
            consumer_id: consumer.id.clone(),
            order_date: date(2026, 1, 10),
            status: SalesOrderStatus::Open,
            notes: None,
            items: vec![SalesOrderItem {
                id: Uuid::new_v4().to_string(),
                sales_order_id: id,
                product_id: None,
                description: "Semen 50 kg".to_string(),
                quantity: 2,
                price_rupiah: 100_000,
            }],
            created_at: now,
            updated_at: now,
        })
        .await
        .unwrap()
}

/// Two units at Rp 100.000: subtotal 200.000, DPP 183.333, VAT 22.000.
pub fn draft(kind: InvoiceKind, consumer: &Consumer, on: NaiveDate) -> InvoiceDraft {
    InvoiceDraft {
        kind,
        consumer_id: consumer.id.clone(),
        so_number: None,
        invoice_date: on,
        due_date: None,
        negotiation_rupiah: 0,
        dp_rupiah: 0,
        pelunasan_rupiah: 0,
        notes: None,
        items: vec![LineDraft {
            product_id: None,
            description: "Semen 50 kg".to_string(),
            quantity: 2,
            price_rupiah: 100_000,
        }],
    }
}
