mod common;

use chrono::Utc;
use common::{add_consumer, add_order, date, setup};
use niaga_core::{
    NumberScheme, Product, SalesOrderStatus, SpdDraft, SpdEntryDraft, TaxInvoice,
};
use niaga_db::DbError;
use uuid::Uuid;

fn product(code: &str, name: &str, price: i64) -> Product {
    let now = Utc::now();
    Product {
        id: Uuid::new_v4().to_string(),
        code: code.to_string(),
        name: name.to_string(),
        unit: Some("pcs".to_string()),
        price_rupiah: price,
        is_active: true,
        created_at: now,
        updated_at: now,
    }
}

#[tokio::test]
async fn test_consumer_crud_and_search() {
    let db = setup().await;
    let repo = db.consumers();

    let mut sinar = add_consumer(&db, "PT Sinar Abadi").await;
    add_consumer(&db, "CV Maju Jaya").await;

    let names: Vec<String> = repo.list().await.unwrap().into_iter().map(|c| c.name).collect();
    assert_eq!(names, vec!["CV Maju Jaya", "PT Sinar Abadi"]);

    let hits = repo.search("sinar", 10).await.unwrap();
    assert_eq!(hits.len(), 1);

    sinar.npwp = Some("01.234.567.8-901.000".to_string());
    repo.update(&sinar).await.unwrap();
    let stored = repo.get_by_id(&sinar.id).await.unwrap().unwrap();
    assert_eq!(stored.npwp.as_deref(), Some("01.234.567.8-901.000"));

    sinar.npwp = Some("123".to_string());
    assert!(matches!(repo.update(&sinar).await, Err(DbError::Domain(_))));

    repo.delete(&sinar.id).await.unwrap();
    assert!(repo.get_by_id(&sinar.id).await.unwrap().is_none());
    assert!(matches!(repo.delete(&sinar.id).await, Err(DbError::NotFound { .. })));
}

#[tokio::test]
async fn test_consumer_with_documents_cannot_be_deleted() {
    let db = setup().await;
    let consumer = add_consumer(&db, "PT Sinar Abadi").await;
    add_order(&db, &consumer, "SO-1").await;

    let err = db.consumers().delete(&consumer.id).await.unwrap_err();
    assert!(matches!(err, DbError::ForeignKeyViolation { .. }));
}

#[tokio::test]
async fn test_product_codes_are_unique_and_soft_deleted() {
    let db = setup().await;
    let repo = db.products();

    let pipe = repo.insert(&product("PIPE-PVC-4", "Pipa PVC 4 inch", 85_000)).await.unwrap();
    repo.insert(&product("SEMEN-50", "Semen 50 kg", 68_000)).await.unwrap();

    let err = repo.insert(&product("PIPE-PVC-4", "Other", 1)).await.unwrap_err();
    assert!(err.is_unique_violation());

    assert_eq!(repo.get_by_code("PIPE-PVC-4").await.unwrap().unwrap().id, pipe.id);
    assert_eq!(repo.search("pipa", 10).await.unwrap().len(), 1);
    assert_eq!(repo.search("SEM", 10).await.unwrap().len(), 1);
    assert_eq!(repo.count().await.unwrap(), 2);

    repo.soft_delete(&pipe.id).await.unwrap();
    assert_eq!(repo.count().await.unwrap(), 1);
    assert_eq!(repo.list_active(10).await.unwrap().len(), 1);
    assert!(!repo.get_by_id(&pipe.id).await.unwrap().unwrap().is_active);
}

#[tokio::test]
async fn test_invalid_product_is_rejected() {
    let db = setup().await;
    let err = db.products().insert(&product("BAD CODE", "x", 10)).await.unwrap_err();
    assert!(matches!(err, DbError::Domain(_)));
    let err = db.products().insert(&product("OK", "x", -10)).await.unwrap_err();
    assert!(matches!(err, DbError::Domain(_)));
}

#[tokio::test]
async fn test_sales_order_roundtrip_and_status() {
    let db = setup().await;
    let consumer = add_consumer(&db, "CV Maju Jaya").await;
    let order = add_order(&db, &consumer, "SO-2026-007").await;

    assert_eq!(order.items.len(), 1);
    assert_eq!(order.subtotal().rupiah(), 200_000);

    let by_number = db.sales_orders().get_by_number("SO-2026-007").await.unwrap().unwrap();
    assert_eq!(by_number.id, order.id);

    db.sales_orders()
        .set_status(&order.id, SalesOrderStatus::Cancelled)
        .await
        .unwrap();
    let listed = db.sales_orders().list().await.unwrap();
    assert_eq!(listed[0].status, SalesOrderStatus::Cancelled);
    assert_eq!(listed[0].items.len(), 1);
}

#[tokio::test]
async fn test_tax_invoices_by_invoice_number() {
    let db = setup().await;
    let repo = db.tax_invoices();

    for (tax_number, invoice) in [("010.000-26.1", "0001/SAR/2026"), ("010.000-26.2", "0002/SAR/2026")] {
        repo.insert(&TaxInvoice {
            id: Uuid::new_v4().to_string(),
            tax_number: tax_number.to_string(),
            invoice_number: invoice.to_string(),
            consumer_id: None,
            tax_date: date(2026, 2, 1),
            dpp_rupiah: 183_333,
            vat_rupiah: 22_000,
            created_at: Utc::now(),
        })
        .await
        .unwrap();
    }

    assert_eq!(repo.list().await.unwrap().len(), 2);
    let covering = repo.list_for_invoice("0002/SAR/2026").await.unwrap();
    assert_eq!(covering.len(), 1);
    assert_eq!(covering[0].tax_number, "010.000-26.2");

    repo.delete(&covering[0].id).await.unwrap();
    assert!(repo.list_for_invoice("0002/SAR/2026").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_spd_numbers_and_totals() {
    let db = setup().await;
    let consumer = add_consumer(&db, "PT Sinar Abadi").await;

    let entry = |number: &str, amount: i64| SpdEntryDraft {
        invoice_number: number.to_string(),
        so_number: None,
        tax_number: None,
        amount_rupiah: amount,
    };

    let first = db
        .spd()
        .create(&SpdDraft {
            consumer_id: consumer.id.clone(),
            sent_date: date(2026, 4, 1),
            notes: None,
            entries: vec![entry("0001/SAR/2026", 222_000), entry("0002/SAR/2026", 111_000)],
        })
        .await
        .unwrap();
    assert_eq!(first.spd_number, "SPD/2026/001");
    assert_eq!(first.total_rupiah, 333_000);

    let second = db
        .spd()
        .create(&SpdDraft {
            consumer_id: consumer.id.clone(),
            sent_date: date(2026, 4, 2),
            notes: Some("  ".to_string()),
            entries: vec![entry("KW/2026/0001", 50_000)],
        })
        .await
        .unwrap();
    assert_eq!(second.spd_number, "SPD/2026/002");
    assert_eq!(second.notes, None);

    let stored = db.spd().get_by_id(&first.id).await.unwrap().unwrap();
    assert_eq!(stored.entries.len(), 2);
    assert_eq!(stored.entries[0].invoice_number, "0001/SAR/2026");

    let wide = db
        .spd()
        .create_with_scheme(
            &SpdDraft {
                consumer_id: consumer.id.clone(),
                sent_date: date(2026, 4, 3),
                notes: None,
                entries: vec![entry("KW/2026/0002", 1)],
            },
            NumberScheme::spd().with_width(5),
        )
        .await
        .unwrap();
    assert_eq!(wide.spd_number, "SPD/2026/00003");

    assert!(db
        .spd()
        .create(&SpdDraft {
            consumer_id: consumer.id.clone(),
            sent_date: date(2026, 4, 4),
            notes: None,
            entries: vec![],
        })
        .await
        .is_err());

    assert_eq!(db.spd().list().await.unwrap().len(), 3);
}
