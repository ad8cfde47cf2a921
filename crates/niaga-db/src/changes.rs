//! # Change Feed
//!
//! Every successful repository write publishes a [`ChangeEvent`]. Screens,
//! reports or a future sync agent subscribe and refresh what they show.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  InvoiceRepository::create ──┐                                          │
//! │  SpdRepository::create ──────┼──► ChangeFeed (broadcast, cap 256)       │
//! │  ConsumerRepository::update ─┘          │                               │
//! │                                ┌────────┼────────┐                      │
//! │                                ▼        ▼        ▼                      │
//! │                             rx #1    rx #2    rx #3                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A slow receiver that falls more than 256 events behind gets
//! `RecvError::Lagged` and should reload its collection from a snapshot.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;
use tracing::trace;

/// Channel capacity.
pub const CHANGE_FEED_CAPACITY: usize = 256;

/// The stored collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Consumers,
    Products,
    SalesOrders,
    Invoices,
    TaxInvoices,
    SpdDocuments,
}

impl Collection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Consumers => "consumers",
            Collection::Products => "products",
            Collection::SalesOrders => "sales_orders",
            Collection::Invoices => "invoices",
            Collection::TaxInvoices => "tax_invoices",
            Collection::SpdDocuments => "spd_documents",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What happened to the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Created,
    Updated,
    Deleted,
}

/// One committed write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub collection: Collection,
    pub id: String,
    pub kind: ChangeKind,
}

impl ChangeEvent {
    pub fn new(collection: Collection, id: impl Into<String>, kind: ChangeKind) -> Self {
        ChangeEvent {
            collection,
            id: id.into(),
            kind,
        }
    }
}

/// Broadcast sender shared by every repository of one [`crate::Database`].
#[derive(Debug, Clone)]
pub struct ChangeFeed {
    tx: broadcast::Sender<ChangeEvent>,
}

impl ChangeFeed {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANGE_FEED_CAPACITY);
        ChangeFeed { tx }
    }

    /// Publishes an event. Having no subscribers is fine.
    pub fn publish(&self, event: ChangeEvent) {
        trace!(collection = %event.collection, id = %event.id, kind = ?event.kind, "change");
        let _ = self.tx.send(event);
    }

    pub fn created(&self, collection: Collection, id: &str) {
        self.publish(ChangeEvent::new(collection, id, ChangeKind::Created));
    }

    pub fn updated(&self, collection: Collection, id: &str) {
        self.publish(ChangeEvent::new(collection, id, ChangeKind::Updated));
    }

    pub fn deleted(&self, collection: Collection, id: &str) {
        self.publish(ChangeEvent::new(collection, id, ChangeKind::Deleted));
    }

    /// A new receiver that sees events published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for ChangeFeed {
    fn default() -> Self {
        ChangeFeed::new()
    }
}
