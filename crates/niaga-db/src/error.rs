//! # Database Error Types
//!
//! Everything a repository call can fail with.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error)        CoreError (totals, numbering)       │
//! │       │                                   │                             │
//! │       ▼                                   ▼                             │
//! │  DbError (this module) ← categorized: constraint, pool, domain         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  anyhow::Error (CLI) ← printed with context                            │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use niaga_core::{CoreError, ValidationError};
use thiserror::Error;

/// Failure of a ledger read or write.
#[derive(Debug, Error)]
pub enum DbError {
    /// No row for the given key.
    ///
    /// ## When This Occurs
    /// - ID doesn't exist
    /// - Business number doesn't exist
    /// - Sales order referenced by an invoice is missing
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// A UNIQUE or PRIMARY KEY constraint rejected the write.
    ///
    /// ## When This Occurs
    /// - Inserting a product code that already exists
    /// - Claiming a sequence another writer already claimed
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// The write points at a missing row, or a delete would orphan one.
    ///
    /// ## When This Occurs
    /// - Invoice or order for a consumer that does not exist
    /// - Deleting a consumer that still has documents
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// Every allocation attempt lost its race.
    ///
    /// ## When This Occurs
    /// ```text
    /// writer A: read max=41 ─► claim 42 ✓
    /// writer B: read max=41 ─► claim 42 ✗ ─► retry ─► claim 43 ✓
    ///                                          ...
    /// after `allocation_attempts` losses ─► AllocationConflict
    /// ```
    #[error("Could not allocate a {scheme} number for {year} after {attempts} attempts")]
    AllocationConflict {
        scheme: String,
        year: i32,
        attempts: u32,
    },

    /// A business rule rejected the data (totals, numbering, validation).
    #[error(transparent)]
    Domain(#[from] CoreError),

    /// The ledger file could not be opened.
    #[error("Cannot open ledger: {0}")]
    ConnectionFailed(String),

    /// An embedded migration did not apply.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// SQLite rejected a statement for a reason not mapped above.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// SQLite could not take the write lock (`SQLITE_BUSY`).
    ///
    /// ## When This Occurs
    /// - Another writer held the lock past the busy timeout
    /// - A read snapshot went stale before the transaction wrote
    #[error("Ledger is busy: {0}")]
    Busy(String),

    /// Timed out waiting for a pooled connection.
    #[error("No database connection available")]
    PoolExhausted,

    /// Anything else, including decode failures.
    #[error("Database error: {0}")]
    Internal(String),
}

impl DbError {
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::UniqueViolation {
            field: field.into(),
            value: value.into(),
        }
    }

    /// True for unique constraint failures.
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, DbError::UniqueViolation { .. })
    }

    /// True when the write lost a race and may succeed on a fresh attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, DbError::UniqueViolation { .. } | DbError::Busy(_))
    }
}

/// Classifies sqlx failures by the SQLite constraint message.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::RowNotFound    → DbError::NotFound
/// sqlx::Error::Database       → Analyze message for constraint type
///                               (SQLITE_BUSY family → DbError::Busy)
/// sqlx::Error::PoolTimedOut   → DbError::PoolExhausted
/// Other                       → DbError::Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::not_found("Record", "unknown"),

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();
                let code = db_err.code();

                // "UNIQUE constraint failed: <table>.<column>[, <table>.<column>]"
                if msg.contains("UNIQUE constraint failed") {
                    let field = msg
                        .split("UNIQUE constraint failed: ")
                        .nth(1)
                        .unwrap_or("unknown")
                        .to_string();
                    DbError::UniqueViolation {
                        field,
                        value: "unknown".to_string(),
                    }
                } else if msg.contains("FOREIGN KEY constraint failed") {
                    DbError::ForeignKeyViolation {
                        message: msg.to_string(),
                    }
                } else if is_busy_code(code.as_deref()) || msg.contains("database is locked") {
                    DbError::Busy(msg.to_string())
                } else {
                    DbError::QueryFailed(msg.to_string())
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

/// SQLITE_BUSY and its extended codes: RECOVERY, SNAPSHOT, TIMEOUT.
fn is_busy_code(code: Option<&str>) -> bool {
    matches!(code, Some("5" | "261" | "517" | "773"))
}

impl From<ValidationError> for DbError {
    fn from(err: ValidationError) -> Self {
        DbError::Domain(CoreError::Validation(err))
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;
