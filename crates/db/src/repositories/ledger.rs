//! Ledger repository for posting expanded journals into the partitioned store.

use std::collections::HashMap;

use chrono::{NaiveDate, Utc};
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, DbBackend, DbErr, EntityTrait, NotSet,
    PaginatorTrait, QueryFilter, QueryOrder, Set, Statement, TransactionTrait,
};

use saldo_core::journal::{ExpandedJournal, JournalLine};
use saldo_shared::{Period, RunId};

use crate::entities::{je_header_staging, ledger_entry_headers, ledger_entry_lines};
use crate::repositories::staging;

/// Error types for ledger posting.
#[derive(Debug, thiserror::Error)]
pub enum PostingError {
    /// Partition provisioning failed ahead of the line insert.
    #[error("Could not provision ledger partition for {period_start}: {source}")]
    PartitionProvision {
        period_start: NaiveDate,
        source: DbErr,
    },

    /// A line references a journal header the store does not know.
    #[error("Posted line references unknown journal {je_number}")]
    HeaderMissing { je_number: String },

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

/// Outcome of one posting call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostOutcome {
    /// The run was posted by this call.
    Posted { headers: usize, lines: usize },
    /// The run's staging rows were already marked posted; nothing was
    /// written.
    AlreadyPosted,
}

/// Repository that writes posted journals into the ledger.
pub struct LedgerRepository {
    db: DatabaseConnection,
    chunk_size: usize,
}

impl LedgerRepository {
    /// Creates a new ledger repository. `chunk_size` caps rows per bulk
    /// insert statement.
    #[must_use]
    pub const fn new(db: DatabaseConnection, chunk_size: usize) -> Self {
        Self { db, chunk_size }
    }

    /// Posts one expansion run into the ledger.
    ///
    /// Header insert, line insert, and the staging posted-flip commit as a
    /// single transaction; a failure anywhere rolls the whole run back.
    /// Re-posting an already-posted run id is a no-op. Concurrent posters
    /// racing on the same journal identity are stopped by the unique
    /// constraint on (je_number, template_code, template_version).
    pub async fn post(&self, journal: &ExpandedJournal) -> Result<PostOutcome, PostingError> {
        let txn = self.db.begin().await?;

        // 1. Idempotency probe against the staging marker.
        if run_already_posted(&txn, journal.run_id).await? {
            txn.commit().await?;
            return Ok(PostOutcome::AlreadyPosted);
        }

        let outcome = PostOutcome::Posted {
            headers: journal.headers.len(),
            lines: journal.lines.len(),
        };
        if journal.headers.is_empty() {
            txn.commit().await?;
            return Ok(outcome);
        }

        // 2. Insert headers; je_id values are assigned by the store.
        let run_id = journal.run_id.into_inner();
        let now = Utc::now().into();
        let mut headers = journal
            .headers
            .iter()
            .map(|h| ledger_entry_headers::ActiveModel {
                je_id: NotSet,
                je_number: Set(h.je_number.clone()),
                je_date: Set(h.je_date),
                je_type: Set(h.je_type.clone()),
                source_rowid: Set(h.source_rowid),
                template_code: Set(journal.template.code.clone()),
                template_version: Set(journal.template.version),
                run_id: Set(run_id),
                created_by: Set(journal.created_by.clone()),
                created_at: Set(now),
            })
            .peekable();
        let chunk_size = self.chunk_size.max(1);
        while headers.peek().is_some() {
            let chunk: Vec<_> = headers.by_ref().take(chunk_size).collect();
            ledger_entry_headers::Entity::insert_many(chunk)
                .exec_without_returning(&txn)
                .await?;
        }

        // 3. Read the assigned ids back for this run.
        let ids: HashMap<String, i64> = ledger_entry_headers::Entity::find()
            .filter(ledger_entry_headers::Column::RunId.eq(run_id))
            .all(&txn)
            .await?
            .into_iter()
            .map(|row| (row.je_number, row.je_id))
            .collect();

        // 4. Ensure the monthly line partition exists before inserting.
        ensure_line_partition(&txn, journal.period).await?;

        // 5. Insert lines keyed by their assigned header ids, in date order.
        let mut ordered: Vec<&JournalLine> = journal.lines.iter().collect();
        ordered.sort_by(|a, b| {
            a.je_date
                .cmp(&b.je_date)
                .then_with(|| a.je_number.cmp(&b.je_number))
                .then_with(|| a.line_no.cmp(&b.line_no))
        });
        let mut lines = Vec::with_capacity(ordered.len());
        for line in ordered {
            let je_id = *ids
                .get(&line.je_number)
                .ok_or_else(|| PostingError::HeaderMissing {
                    je_number: line.je_number.clone(),
                })?;
            lines.push(ledger_entry_lines::ActiveModel {
                je_id: Set(je_id),
                line_no: Set(line.line_no),
                je_date: Set(line.je_date),
                side: Set(line.side.as_db_str().to_string()),
                account_code: Set(line.account_code.clone()),
                fund: Set(line.fund_code.clone()),
                amount: Set(line.amount),
                created_at: Set(now),
            });
        }
        let mut lines = lines.into_iter().peekable();
        while lines.peek().is_some() {
            let chunk: Vec<_> = lines.by_ref().take(chunk_size).collect();
            ledger_entry_lines::Entity::insert_many(chunk)
                .exec_without_returning(&txn)
                .await?;
        }

        // 6. Flip the staging markers inside the same transaction.
        staging::mark_posted(&txn, journal.run_id, now).await?;

        txn.commit().await?;
        Ok(outcome)
    }

    /// Posted ledger headers for a run, ordered by journal number.
    pub async fn headers_for_run(
        &self,
        run_id: RunId,
    ) -> Result<Vec<ledger_entry_headers::Model>, PostingError> {
        let rows = ledger_entry_headers::Entity::find()
            .filter(ledger_entry_headers::Column::RunId.eq(run_id.into_inner()))
            .order_by_asc(ledger_entry_headers::Column::JeNumber)
            .all(&self.db)
            .await?;
        Ok(rows)
    }

    /// Number of ledger lines dated within the period.
    pub async fn line_count_for_period(&self, period: Period) -> Result<u64, PostingError> {
        let count = ledger_entry_lines::Entity::find()
            .filter(ledger_entry_lines::Column::JeDate.gte(period.start()))
            .filter(ledger_entry_lines::Column::JeDate.lt(period.end_exclusive()))
            .count(&self.db)
            .await?;
        Ok(count)
    }
}

async fn run_already_posted<C: ConnectionTrait>(
    conn: &C,
    run_id: RunId,
) -> Result<bool, PostingError> {
    let row = je_header_staging::Entity::find()
        .filter(je_header_staging::Column::RunId.eq(run_id.into_inner()))
        .filter(je_header_staging::Column::Posted.eq(true))
        .one(conn)
        .await?;
    Ok(row.is_some())
}

async fn ensure_line_partition<C: ConnectionTrait>(
    conn: &C,
    period: Period,
) -> Result<(), PostingError> {
    let stmt = Statement::from_sql_and_values(
        DbBackend::Postgres,
        "SELECT ensure_ledger_line_partition($1)",
        [period.start().into()],
    );
    conn.execute(stmt)
        .await
        .map_err(|source| PostingError::PartitionProvision {
            period_start: period.start(),
            source,
        })?;
    Ok(())
}
