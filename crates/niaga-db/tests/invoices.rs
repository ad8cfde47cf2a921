mod common;

use common::{add_consumer, add_order, date, draft, setup};
use niaga_core::{CoreError, InvoiceKind, NumberScheme, SalesOrderStatus};
use niaga_db::{ChangeKind, Collection, DbError};

#[tokio::test]
async fn test_create_computes_totals_and_first_number() {
    let db = setup().await;
    let consumer = add_consumer(&db, "PT Sinar Abadi").await;

    let invoice = db
        .invoices()
        .create(&draft(InvoiceKind::Sar, &consumer, date(2026, 2, 1)), NumberScheme::sar())
        .await
        .unwrap();

    assert_eq!(invoice.number, "0001/SAR/2026");
    assert_eq!(invoice.subtotal_rupiah, 200_000);
    assert_eq!(invoice.goods_rupiah, 200_000);
    assert_eq!(invoice.dpp_vat_rupiah, 183_333);
    assert_eq!(invoice.vat_rupiah, 22_000);
    assert_eq!(invoice.total_rupiah, 222_000);

    let stored = db.invoices().get_by_id(&invoice.id).await.unwrap().unwrap();
    assert_eq!(stored.items.len(), 1);
    assert_eq!(stored.totals(), invoice.totals());
}

#[tokio::test]
async fn test_numbers_increase_per_kind_and_reset_per_year() {
    let db = setup().await;
    let consumer = add_consumer(&db, "CV Maju Jaya").await;
    let repo = db.invoices();

    let mut sar = Vec::new();
    for day in 1..=3 {
        let inv = repo
            .create(&draft(InvoiceKind::Sar, &consumer, date(2026, 3, day)), NumberScheme::sar())
            .await
            .unwrap();
        sar.push(inv.number);
    }
    assert_eq!(sar, vec!["0001/SAR/2026", "0002/SAR/2026", "0003/SAR/2026"]);

    let kw = repo
        .create(&draft(InvoiceKind::Kw, &consumer, date(2026, 3, 4)), NumberScheme::kw())
        .await
        .unwrap();
    assert_eq!(kw.number, "KW/2026/0001");

    let next_year = repo
        .create(&draft(InvoiceKind::Sar, &consumer, date(2027, 1, 2)), NumberScheme::sar())
        .await
        .unwrap();
    assert_eq!(next_year.number, "0001/SAR/2027");
}

#[tokio::test]
async fn test_allocation_continues_after_imported_numbers() {
    let db = setup().await;
    let consumer = add_consumer(&db, "PT Karya Mandiri").await;
    let repo = db.invoices();

    repo.insert_with_number(&draft(InvoiceKind::Sar, &consumer, date(2026, 1, 3)), "0041/SAR/2026")
        .await
        .unwrap();
    repo.insert_with_number(&draft(InvoiceKind::Sar, &consumer, date(2026, 1, 4)), "legacy-7")
        .await
        .unwrap();

    let next = repo
        .create(&draft(InvoiceKind::Sar, &consumer, date(2026, 1, 5)), NumberScheme::sar())
        .await
        .unwrap();
    assert_eq!(next.number, "0042/SAR/2026");
}

#[tokio::test]
async fn test_deleted_numbers_are_not_reissued() {
    let db = setup().await;
    let consumer = add_consumer(&db, "Toko Sentosa").await;
    let repo = db.invoices();

    let first = repo
        .create(&draft(InvoiceKind::Kw, &consumer, date(2026, 5, 1)), NumberScheme::kw())
        .await
        .unwrap();
    repo.delete(&first.id).await.unwrap();

    let second = repo
        .create(&draft(InvoiceKind::Kw, &consumer, date(2026, 5, 2)), NumberScheme::kw())
        .await
        .unwrap();
    assert_eq!(second.number, "KW/2026/0002");
}

#[tokio::test]
async fn test_create_marks_sales_order_invoiced() {
    let db = setup().await;
    let consumer = add_consumer(&db, "CV Maju Jaya").await;
    let order = add_order(&db, &consumer, "SO-2026-001").await;
    let mut rx = db.subscribe();

    let mut d = draft(InvoiceKind::Sar, &consumer, date(2026, 2, 1));
    d.so_number = Some(" SO-2026-001 ".to_string());
    let invoice = db.invoices().create(&d, NumberScheme::sar()).await.unwrap();
    assert_eq!(invoice.so_number.as_deref(), Some("SO-2026-001"));

    let order = db.sales_orders().get_by_id(&order.id).await.unwrap().unwrap();
    assert_eq!(order.status, SalesOrderStatus::Invoiced);

    let first = rx.recv().await.unwrap();
    assert_eq!(first.collection, Collection::Invoices);
    assert_eq!(first.kind, ChangeKind::Created);
    let second = rx.recv().await.unwrap();
    assert_eq!(second.collection, Collection::SalesOrders);
    assert_eq!(second.id, order.id);
}

#[tokio::test]
async fn test_unknown_sales_order_is_rejected_without_consuming_a_number() {
    let db = setup().await;
    let consumer = add_consumer(&db, "CV Maju Jaya").await;

    let mut d = draft(InvoiceKind::Sar, &consumer, date(2026, 2, 1));
    d.so_number = Some("SO-404".to_string());
    let err = db.invoices().create(&d, NumberScheme::sar()).await.unwrap_err();
    assert!(matches!(err, DbError::NotFound { .. }));

    d.so_number = None;
    let invoice = db.invoices().create(&d, NumberScheme::sar()).await.unwrap();
    assert_eq!(invoice.number, "0001/SAR/2026");
}

#[tokio::test]
async fn test_invalid_drafts_are_rejected() {
    let db = setup().await;
    let consumer = add_consumer(&db, "PT Sinar Abadi").await;

    let mut overpaid = draft(InvoiceKind::Sar, &consumer, date(2026, 2, 1));
    overpaid.dp_rupiah = 150_000;
    overpaid.pelunasan_rupiah = 100_000;
    let err = db.invoices().create(&overpaid, NumberScheme::sar()).await.unwrap_err();
    assert!(matches!(err, DbError::Domain(CoreError::NegativeGoodsValue { goods: -50_000 })));

    let mut empty = draft(InvoiceKind::Sar, &consumer, date(2026, 2, 1));
    empty.items.clear();
    let err = db.invoices().create(&empty, NumberScheme::sar()).await.unwrap_err();
    assert!(matches!(err, DbError::Domain(CoreError::EmptyDocument)));

    let wrong_scheme = draft(InvoiceKind::Kw, &consumer, date(2026, 2, 1));
    assert!(db.invoices().create(&wrong_scheme, NumberScheme::sar()).await.is_err());

    assert!(db.invoices().list_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_listing_and_lookup() {
    let db = setup().await;
    let consumer = add_consumer(&db, "PT Sinar Abadi").await;
    let repo = db.invoices();

    let sar = repo
        .create(&draft(InvoiceKind::Sar, &consumer, date(2026, 2, 1)), NumberScheme::sar())
        .await
        .unwrap();
    repo.create(&draft(InvoiceKind::Kw, &consumer, date(2026, 2, 2)), NumberScheme::kw())
        .await
        .unwrap();

    assert_eq!(repo.list_by_kind(InvoiceKind::Sar).await.unwrap().len(), 1);
    assert_eq!(repo.list_all().await.unwrap().len(), 2);
    assert_eq!(
        repo.numbers_for_kind(InvoiceKind::Kw).await.unwrap(),
        vec!["KW/2026/0001".to_string()]
    );

    let found = repo.get_by_number("0001/SAR/2026").await.unwrap().unwrap();
    assert_eq!(found.id, sar.id);
    assert!(repo.get_by_number("0009/SAR/2026").await.unwrap().is_none());
}

#[tokio::test]
async fn test_import_batch_is_all_or_nothing() {
    let db = setup().await;
    let consumer = add_consumer(&db, "PT Karya Mandiri").await;
    let repo = db.invoices();

    let good = draft(InvoiceKind::Sar, &consumer, date(2026, 1, 3));
    let mut empty = draft(InvoiceKind::Sar, &consumer, date(2026, 1, 4));
    empty.items.clear();

    let err = repo
        .import_batch(&[
            ("0041/SAR/2026".to_string(), good.clone()),
            ("0042/SAR/2026".to_string(), empty),
        ])
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::Domain(CoreError::EmptyDocument)));
    assert!(repo.list_all().await.unwrap().is_empty());

    // Passes validation, fails on insert: the earlier row is rolled back.
    let mut stranger = draft(InvoiceKind::Sar, &consumer, date(2026, 1, 5));
    stranger.consumer_id = "no-such-consumer".to_string();
    let err = repo
        .import_batch(&[
            ("0041/SAR/2026".to_string(), good.clone()),
            ("0043/SAR/2026".to_string(), stranger),
        ])
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::ForeignKeyViolation { .. }));
    assert!(repo.list_all().await.unwrap().is_empty());

    let mut rx = db.subscribe();
    let imported = repo
        .import_batch(&[
            ("0041/SAR/2026".to_string(), good.clone()),
            (" 0042/SAR/2026 ".to_string(), good),
        ])
        .await
        .unwrap();
    assert_eq!(imported.len(), 2);
    assert_eq!(imported[1].number, "0042/SAR/2026");
    assert_eq!(repo.list_all().await.unwrap().len(), 2);
    assert_eq!(rx.recv().await.unwrap().id, imported[0].id);
    assert_eq!(rx.recv().await.unwrap().id, imported[1].id);
}
