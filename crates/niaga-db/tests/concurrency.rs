//! Races between writers on a file-backed ledger with a multi-connection
//! pool. `DbConfig::in_memory()` has a single connection and would
//! serialize every task.

mod common;

use common::{add_consumer, date, draft, setup_file};
use niaga_core::{InvoiceKind, NumberScheme, SpdDraft, SpdEntryDraft};
use tempfile::TempDir;

const WRITERS: usize = 16;

fn sorted_unique(mut numbers: Vec<String>) -> Vec<String> {
    numbers.sort();
    numbers.dedup();
    numbers
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_parallel_invoice_creates_get_distinct_numbers() {
    let dir = TempDir::new().unwrap();
    let db = setup_file(&dir, 8).await;
    let consumer = add_consumer(&db, "PT Sinar Abadi").await;

    let mut handles = Vec::new();
    for _ in 0..WRITERS {
        let repo = db.invoices();
        let d = draft(InvoiceKind::Sar, &consumer, date(2026, 6, 1));
        handles.push(tokio::spawn(async move { repo.create(&d, NumberScheme::sar()).await }));
    }

    let mut numbers = Vec::new();
    for handle in handles {
        let invoice = handle.await.unwrap().expect("every writer gets a number");
        numbers.push(invoice.number);
    }

    let numbers = sorted_unique(numbers);
    assert_eq!(numbers.len(), WRITERS);
    assert_eq!(numbers.first().unwrap(), "0001/SAR/2026");
    assert_eq!(numbers.last().unwrap(), "0016/SAR/2026");

    let stored = db.invoices().list_by_kind(InvoiceKind::Sar).await.unwrap();
    assert_eq!(stored.len(), WRITERS);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_parallel_spd_creates_get_distinct_numbers() {
    let dir = TempDir::new().unwrap();
    let db = setup_file(&dir, 8).await;
    let consumer = add_consumer(&db, "CV Maju Jaya").await;

    let mut handles = Vec::new();
    for i in 0..WRITERS {
        let repo = db.spd();
        let d = SpdDraft {
            consumer_id: consumer.id.clone(),
            sent_date: date(2026, 7, 1),
            notes: None,
            entries: vec![SpdEntryDraft {
                invoice_number: format!("{:04}/SAR/2026", i + 1),
                so_number: None,
                tax_number: None,
                amount_rupiah: 222_000,
            }],
        };
        handles.push(tokio::spawn(async move { repo.create(&d).await }));
    }

    let mut numbers = Vec::new();
    for handle in handles {
        let doc = handle.await.unwrap().expect("every writer gets a number");
        numbers.push(doc.spd_number);
    }

    let numbers = sorted_unique(numbers);
    assert_eq!(numbers.len(), WRITERS);
    assert_eq!(numbers.first().unwrap(), "SPD/2026/001");
    assert_eq!(numbers.last().unwrap(), "SPD/2026/016");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_snapshot_is_consistent_while_writers_run() {
    let dir = TempDir::new().unwrap();
    let db = setup_file(&dir, 4).await;
    let consumer = add_consumer(&db, "Toko Sentosa").await;

    let writer = {
        let repo = db.invoices();
        let d = draft(InvoiceKind::Sar, &consumer, date(2026, 8, 1));
        tokio::spawn(async move {
            for _ in 0..20 {
                repo.create(&d, NumberScheme::sar()).await.unwrap();
            }
        })
    };

    // Each create commits its claim and its invoice together, so a
    // consistent view always has claims == invoices.
    for _ in 0..10 {
        let snapshot = db.snapshot().await.unwrap();
        let count = snapshot.invoices.len() as u32;
        let expected = NumberScheme::sar().format(2026, count + 1).unwrap();
        assert_eq!(snapshot.next_number(NumberScheme::sar(), 2026).unwrap(), expected);
        assert_eq!(snapshot.invoices_without_tax_invoice().len(), snapshot.invoices.len());
    }

    writer.await.unwrap();
    let done = db.snapshot().await.unwrap();
    assert_eq!(done.next_number(NumberScheme::sar(), 2026).unwrap(), "0021/SAR/2026");
}
