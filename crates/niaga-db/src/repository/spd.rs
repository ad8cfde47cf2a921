//! # SPD Repository
//!
//! Surat Pengantar Dokumen: a numbered cover letter listing the invoices
//! handed to a customer in one batch. Numbers follow `SPD/YYYY/NNN` and are
//! allocated the same way invoice numbers are, keyed on the sent date.

use chrono::{Datelike, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use std::collections::HashMap;
use tracing::{info, warn};
use uuid::Uuid;

use super::{begin_write, claim_next_number, clean_optional};
use crate::changes::{ChangeFeed, Collection};
use crate::error::{DbError, DbResult};
use niaga_core::validation::{validate_deduction, validate_document_number};
use niaga_core::{CoreError, NumberScheme, SchemeKind, SpdDocument, SpdDraft, SpdEntry, ValidationError};

const SELECT_SPD: &str = r#"
    SELECT id, spd_number, consumer_id, sent_date, notes, total_rupiah, created_at
    FROM spd_documents
"#;

const SELECT_ENTRY: &str = r#"
    SELECT id, spd_id, invoice_number, so_number, tax_number, amount_rupiah
    FROM spd_entries
"#;

#[derive(Debug, Clone)]
pub struct SpdRepository {
    pool: SqlitePool,
    changes: ChangeFeed,
    allocation_attempts: u32,
}

impl SpdRepository {
    pub fn new(pool: SqlitePool, changes: ChangeFeed, allocation_attempts: u32) -> Self {
        SpdRepository {
            pool,
            changes,
            allocation_attempts: allocation_attempts.max(1),
        }
    }

    /// Creates an SPD numbered with the default SPD scheme.
    pub async fn create(&self, draft: &SpdDraft) -> DbResult<SpdDocument> {
        self.create_with_scheme(draft, NumberScheme::spd()).await
    }

    /// Creates an SPD, allocating the next number of `scheme` for the
    /// sent date's year. `total_rupiah` is the sum of the entries.
    pub async fn create_with_scheme(
        &self,
        draft: &SpdDraft,
        scheme: NumberScheme,
    ) -> DbResult<SpdDocument> {
        if scheme.kind != SchemeKind::Spd {
            return Err(ValidationError::InvalidFormat {
                field: "scheme".to_string(),
                reason: format!("SPD documents cannot use {} numbers", scheme.kind),
            }
            .into());
        }
        validate_draft(draft)?;
        let year = draft.sent_date.year();

        for attempt in 1..=self.allocation_attempts {
            match self.try_create(draft, &scheme, year).await {
                Ok(spd) => {
                    info!(id = %spd.id, number = %spd.spd_number, entries = spd.entries.len(), "SPD created");
                    self.changes.created(Collection::SpdDocuments, &spd.id);
                    return Ok(spd);
                }
                Err(e) if e.is_retryable() => {
                    warn!(attempt, error = %e, year, "SPD number allocation lost a race, retrying");
                }
                Err(e) => return Err(e),
            }
        }

        Err(DbError::AllocationConflict {
            scheme: scheme.kind.to_string(),
            year,
            attempts: self.allocation_attempts,
        })
    }

    async fn try_create(&self, draft: &SpdDraft, scheme: &NumberScheme, year: i32) -> DbResult<SpdDocument> {
        let mut tx = begin_write(&self.pool).await?;

        let existing: Vec<String> = sqlx::query_scalar("SELECT spd_number FROM spd_documents")
            .fetch_all(&mut *tx)
            .await?;
        let spd_number = claim_next_number(&mut *tx, scheme, year, &existing).await?;

        let id = Uuid::new_v4().to_string();
        let entries: Vec<SpdEntry> = draft
            .entries
            .iter()
            .map(|e| SpdEntry {
                id: Uuid::new_v4().to_string(),
                spd_id: id.clone(),
                invoice_number: e.invoice_number.trim().to_string(),
                so_number: clean_optional(&e.so_number),
                tax_number: clean_optional(&e.tax_number),
                amount_rupiah: e.amount_rupiah,
            })
            .collect();

        let total = draft
            .entries
            .iter()
            .try_fold(0i64, |acc, e| acc.checked_add(e.amount_rupiah))
            .ok_or_else(|| CoreError::Overflow {
                context: "SPD total".to_string(),
            })?;

        let spd = SpdDocument {
            id,
            spd_number,
            consumer_id: draft.consumer_id.trim().to_string(),
            sent_date: draft.sent_date,
            notes: clean_optional(&draft.notes),
            total_rupiah: total,
            entries,
            created_at: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO spd_documents (id, spd_number, consumer_id, sent_date, notes, total_rupiah, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&spd.id)
        .bind(&spd.spd_number)
        .bind(&spd.consumer_id)
        .bind(spd.sent_date)
        .bind(&spd.notes)
        .bind(spd.total_rupiah)
        .bind(spd.created_at)
        .execute(&mut *tx)
        .await?;

        for (line_no, entry) in spd.entries.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO spd_entries (id, spd_id, line_no, invoice_number, so_number, tax_number, amount_rupiah)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
            )
            .bind(&entry.id)
            .bind(&entry.spd_id)
            .bind(line_no as i64)
            .bind(&entry.invoice_number)
            .bind(&entry.so_number)
            .bind(&entry.tax_number)
            .bind(entry.amount_rupiah)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(spd)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<SpdDocument>> {
        let spd = sqlx::query_as::<_, SpdDocument>(&format!("{SELECT_SPD} WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match spd {
            Some(mut spd) => {
                spd.entries = sqlx::query_as::<_, SpdEntry>(&format!(
                    "{SELECT_ENTRY} WHERE spd_id = ?1 ORDER BY line_no"
                ))
                .bind(&spd.id)
                .fetch_all(&self.pool)
                .await?;
                Ok(Some(spd))
            }
            None => Ok(None),
        }
    }

    /// Every SPD with its entries, oldest first.
    pub async fn list(&self) -> DbResult<Vec<SpdDocument>> {
        let mut conn = self.pool.acquire().await?;
        load_all(&mut conn).await
    }

    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM spd_documents WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("SpdDocument", id));
        }

        self.changes.deleted(Collection::SpdDocuments, id);
        Ok(())
    }
}

fn validate_draft(draft: &SpdDraft) -> DbResult<()> {
    if draft.consumer_id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "consumer".to_string(),
        }
        .into());
    }
    if draft.entries.is_empty() {
        return Err(CoreError::EmptyDocument.into());
    }
    for entry in &draft.entries {
        validate_document_number("invoice number", &entry.invoice_number)?;
        validate_deduction("amount", entry.amount_rupiah)?;
    }
    Ok(())
}

pub(crate) async fn load_all(conn: &mut SqliteConnection) -> DbResult<Vec<SpdDocument>> {
    let mut docs = sqlx::query_as::<_, SpdDocument>(&format!(
        "{SELECT_SPD} ORDER BY sent_date, created_at, id"
    ))
    .fetch_all(&mut *conn)
    .await?;

    let entries = sqlx::query_as::<_, SpdEntry>(&format!("{SELECT_ENTRY} ORDER BY spd_id, line_no"))
        .fetch_all(&mut *conn)
        .await?;

    let mut by_doc: HashMap<String, Vec<SpdEntry>> = HashMap::new();
    for entry in entries {
        by_doc.entry(entry.spd_id.clone()).or_default().push(entry);
    }
    for doc in &mut docs {
        doc.entries = by_doc.remove(&doc.id).unwrap_or_default();
    }
    Ok(docs)
}
