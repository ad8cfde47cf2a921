//! # Database Pool Management
//!
//! Connection pool creation and configuration for SQLite.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Database Connection Pool                           │
//! │                                                                         │
//! │  CLI startup                                                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbConfig::new(path) ← pool size, allocation retries, tax policy        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Database::new(config).await ← create pool + run migrations             │
//! │       │                                                                 │
//! │       ├──► SqlitePool (WAL, foreign keys on)                            │
//! │       └──► ChangeFeed (shared by every repository)                      │
//! │                                                                         │
//! │  db.invoices() / db.spd() / db.consumers() ... ← cheap handles          │
//! │  db.snapshot().await                          ← coordinator view        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use niaga_core::TaxPolicy;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::changes::{ChangeEvent, ChangeFeed};
use crate::error::{DbError, DbResult};
use crate::migrations;
use crate::repository::consumer::ConsumerRepository;
use crate::repository::invoice::InvoiceRepository;
use crate::repository::product::ProductRepository;
use crate::repository::sales_order::SalesOrderRepository;
use crate::repository::spd::SpdRepository;
use crate::repository::tax_invoice::TaxInvoiceRepository;
use crate::snapshot::LedgerSnapshot;

// =============================================================================
// Configuration
// =============================================================================

/// How to open the ledger and how its repositories behave.
///
/// ## Example
/// ```rust,ignore
/// let config = DbConfig::new("/srv/niaga/ledger.db")
///     .max_connections(8)
///     .allocation_attempts(10)
///     .tax_policy(TaxPolicy::legacy());
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Ledger file; `:memory:` for a throwaway database.
    pub database_path: PathBuf,

    /// Pool ceiling (5).
    pub max_connections: u32,

    /// Connections kept open while idle (1).
    pub min_connections: u32,

    /// Longest wait for a pooled connection (30 s).
    pub connect_timeout: Duration,

    /// Idle connections above the minimum close after this (10 min).
    pub idle_timeout: Duration,

    /// Apply embedded migrations in `Database::new` (true).
    pub run_migrations: bool,

    /// Times a create may lose the numbering race before
    /// `DbError::AllocationConflict` (5).
    pub allocation_attempts: u32,

    /// DPP / VAT ratios for new invoices (standard).
    pub tax_policy: TaxPolicy,
}

impl DbConfig {
    /// Defaults for a file-backed ledger at `path`. The file is created on
    /// first connect.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 5,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
            run_migrations: true,
            allocation_attempts: 5,
            tax_policy: TaxPolicy::default(),
        }
    }

    /// A private in-memory ledger for tests.
    ///
    /// One connection only: every connection to `:memory:` would otherwise
    /// see its own empty database.
    pub fn in_memory() -> Self {
        DbConfig {
            max_connections: 1,
            connect_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(60),
            ..DbConfig::new(":memory:")
        }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    /// Clamped to at least 1.
    pub fn allocation_attempts(mut self, attempts: u32) -> Self {
        self.allocation_attempts = attempts.max(1);
        self
    }

    pub fn tax_policy(mut self, policy: TaxPolicy) -> Self {
        self.tax_policy = policy;
        self
    }
}

// =============================================================================
// Database
// =============================================================================

/// Handle to an open ledger. Hands out repositories that share one pool
/// and one change feed; clones share them too.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
    changes: ChangeFeed,
    allocation_attempts: u32,
    tax_policy: TaxPolicy,
}

impl Database {
    /// Opens the ledger.
    ///
    /// ## Connection Setup
    /// ```text
    /// sqlite://<path>?mode=rwc
    ///   ├── journal_mode = WAL       readers never block the writer
    ///   ├── synchronous  = NORMAL
    ///   ├── foreign_keys = ON        consumers with documents cannot vanish
    ///   └── create file if missing
    /// then: pool → migrations (unless disabled) → shared ChangeFeed
    /// ```
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        let path = config.database_path.display().to_string();
        info!(path = %path, "Opening ledger");

        let options = SqliteConnectOptions::from_str(&format!("sqlite://{}?mode=rwc", path))
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true)
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.connect_timeout)
            .idle_timeout(Some(config.idle_timeout))
            .connect_with(options)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        debug!(
            max = config.max_connections,
            min = config.min_connections,
            "Pool ready"
        );

        let db = Database {
            pool,
            changes: ChangeFeed::new(),
            allocation_attempts: config.allocation_attempts.max(1),
            tax_policy: config.tax_policy,
        };

        if config.run_migrations {
            db.run_migrations().await?;
        }

        Ok(db)
    }

    /// Applies pending migrations. Called by `new()` unless disabled.
    pub async fn run_migrations(&self) -> DbResult<()> {
        migrations::run_migrations(&self.pool).await
    }

    /// Raw pool, for queries no repository covers.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Tax policy applied to newly created invoices.
    pub fn tax_policy(&self) -> TaxPolicy {
        self.tax_policy
    }

    pub fn consumers(&self) -> ConsumerRepository {
        ConsumerRepository::new(self.pool.clone(), self.changes.clone())
    }

    pub fn products(&self) -> ProductRepository {
        ProductRepository::new(self.pool.clone(), self.changes.clone())
    }

    pub fn sales_orders(&self) -> SalesOrderRepository {
        SalesOrderRepository::new(self.pool.clone(), self.changes.clone())
    }

    /// Returns the invoice repository (SAR and KW).
    ///
    /// ## Example
    /// ```rust,ignore
    /// let invoice = db.invoices().create(&draft, NumberScheme::sar()).await?;
    /// ```
    pub fn invoices(&self) -> InvoiceRepository {
        InvoiceRepository::new(
            self.pool.clone(),
            self.changes.clone(),
            self.allocation_attempts,
            self.tax_policy,
        )
    }

    pub fn tax_invoices(&self) -> TaxInvoiceRepository {
        TaxInvoiceRepository::new(self.pool.clone(), self.changes.clone())
    }

    pub fn spd(&self) -> SpdRepository {
        SpdRepository::new(
            self.pool.clone(),
            self.changes.clone(),
            self.allocation_attempts,
        )
    }

    /// Subscribes to committed writes from every repository.
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.changes.subscribe()
    }

    /// Loads every collection into one in-memory view.
    pub async fn snapshot(&self) -> DbResult<LedgerSnapshot> {
        LedgerSnapshot::load(self).await
    }

    /// Waits for checked-out connections, then closes the pool.
    pub async fn close(&self) {
        debug!("Closing ledger");
        self.pool.close().await;
    }

    /// True when a trivial query round-trips.
    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_database() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        assert!(db.health_check().await);

        let (total, applied) = migrations::migration_status(db.pool()).await.unwrap();
        assert_eq!(total, applied);
    }

    #[test]
    fn test_config_builder() {
        let config = DbConfig::new("/tmp/niaga.db")
            .max_connections(10)
            .min_connections(2)
            .allocation_attempts(0)
            .tax_policy(TaxPolicy::legacy());

        assert_eq!(config.max_connections, 10);
        assert_eq!(config.min_connections, 2);
        assert_eq!(config.allocation_attempts, 1);
        assert_eq!(config.tax_policy, TaxPolicy::legacy());
    }
}
