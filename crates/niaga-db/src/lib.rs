//! # niaga-db: Database Layer for Niaga
//!
//! SQLite persistence for consumers, products, sales orders, invoices,
//! tax invoices and SPD documents.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Niaga Data Flow                                  │
//! │                                                                         │
//! │  niaga CLI (invoice create, duplicates, report)                         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     niaga-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐   │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │   │   │
//! │  │   │   (pool.rs)   │◄───│ Invoice, SPD  │    │  (embedded)  │   │   │
//! │  │   │  ChangeFeed   │    │ SalesOrder .. │    │ 001_init.sql │   │   │
//! │  │   └───────┬───────┘    └───────────────┘    └──────────────┘   │   │
//! │  │           ▼                                                     │   │
//! │  │   LedgerSnapshot: duplicates, next numbers, outstanding work    │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite file (WAL)                                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool, configuration and repository access
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - One repository per collection
//! - [`changes`] - Broadcast feed of committed writes
//! - [`snapshot`] - In-memory ledger view and derived reports
//! - [`seed`] - Demo ledger for development
//!
//! ## Usage
//!
//! ```rust,ignore
//! use niaga_db::{Database, DbConfig};
//! use niaga_core::NumberScheme;
//!
//! let db = Database::new(DbConfig::new("niaga.db")).await?;
//! let invoice = db.invoices().create(&draft, NumberScheme::sar()).await?;
//! let report = db.snapshot().await?.duplicate_report();
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod changes;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod seed;
pub mod snapshot;

// =============================================================================
// Re-exports
// =============================================================================

pub use changes::{ChangeEvent, ChangeFeed, ChangeKind, Collection};
pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use snapshot::{DuplicateMember, DuplicateReport, LedgerSnapshot, SnapshotSummary};

// Repository re-exports for convenience
pub use repository::consumer::ConsumerRepository;
pub use repository::invoice::InvoiceRepository;
pub use repository::product::ProductRepository;
pub use repository::sales_order::SalesOrderRepository;
pub use repository::spd::SpdRepository;
pub use repository::tax_invoice::TaxInvoiceRepository;
