//! Staging repository for expanded journals awaiting posting.

use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, DatabaseConnection, DatabaseTransaction, DbErr, EntityTrait, QueryFilter, Set,
    TransactionTrait,
    prelude::DateTimeWithTimeZone,
};

use saldo_core::journal::ExpandedJournal;
use saldo_shared::RunId;

use crate::entities::{je_header_staging, je_line_staging};

/// Error types for staging operations.
#[derive(Debug, thiserror::Error)]
pub enum StagingError {
    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

/// Row counts written by one staging call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StagedCounts {
    /// Header rows written.
    pub headers: usize,
    /// Line rows written.
    pub lines: usize,
}

/// Repository over the journal staging tables.
pub struct StagingRepository {
    db: DatabaseConnection,
    chunk_size: usize,
}

impl StagingRepository {
    /// Creates a new staging repository. `chunk_size` caps rows per bulk
    /// insert statement.
    #[must_use]
    pub const fn new(db: DatabaseConnection, chunk_size: usize) -> Self {
        Self { db, chunk_size }
    }

    /// Stages one expansion run's headers and lines atomically.
    ///
    /// All rows land with `posted = false`; the poster flips them inside
    /// its own transaction.
    pub async fn stage(&self, journal: &ExpandedJournal) -> Result<StagedCounts, StagingError> {
        let counts = StagedCounts {
            headers: journal.headers.len(),
            lines: journal.lines.len(),
        };
        if journal.is_empty() {
            return Ok(counts);
        }

        let chunk_size = self.chunk_size.max(1);
        let now: DateTimeWithTimeZone = Utc::now().into();
        let run_id = journal.run_id.into_inner();

        let txn = self.db.begin().await?;

        let mut headers = journal
            .headers
            .iter()
            .map(|h| je_header_staging::ActiveModel {
                run_id: Set(run_id),
                je_number: Set(h.je_number.clone()),
                je_date: Set(h.je_date),
                je_type: Set(h.je_type.clone()),
                source_rowid: Set(h.source_rowid),
                template_code: Set(journal.template.code.clone()),
                template_version: Set(journal.template.version),
                created_by: Set(journal.created_by.clone()),
                posted: Set(false),
                posted_at: Set(None),
                created_at: Set(now),
            })
            .peekable();
        while headers.peek().is_some() {
            let chunk: Vec<_> = headers.by_ref().take(chunk_size).collect();
            je_header_staging::Entity::insert_many(chunk)
                .exec_without_returning(&txn)
                .await?;
        }

        let mut lines = journal
            .lines
            .iter()
            .map(|l| je_line_staging::ActiveModel {
                run_id: Set(run_id),
                je_number: Set(l.je_number.clone()),
                line_no: Set(l.line_no),
                side: Set(l.side.as_db_str().to_string()),
                account_code: Set(l.account_code.clone()),
                fund: Set(l.fund_code.clone()),
                amount: Set(l.amount),
                product_code: Set(l.product_code.clone()),
                channel: Set(l.channel.clone()),
                je_date: Set(l.je_date),
                template_code: Set(journal.template.code.clone()),
                template_version: Set(journal.template.version),
                posted: Set(false),
                posted_at: Set(None),
                created_at: Set(now),
            })
            .peekable();
        while lines.peek().is_some() {
            let chunk: Vec<_> = lines.by_ref().take(chunk_size).collect();
            je_line_staging::Entity::insert_many(chunk)
                .exec_without_returning(&txn)
                .await?;
        }

        txn.commit().await?;
        Ok(counts)
    }

    /// Whether any staging row of the run is already marked posted.
    pub async fn run_posted(&self, run_id: RunId) -> Result<bool, StagingError> {
        let row = je_header_staging::Entity::find()
            .filter(je_header_staging::Column::RunId.eq(run_id.into_inner()))
            .filter(je_header_staging::Column::Posted.eq(true))
            .one(&self.db)
            .await?;
        Ok(row.is_some())
    }

    /// Unposted header rows of a run, for inspection and tests.
    pub async fn unposted_headers(
        &self,
        run_id: RunId,
    ) -> Result<Vec<je_header_staging::Model>, StagingError> {
        let rows = je_header_staging::Entity::find()
            .filter(je_header_staging::Column::RunId.eq(run_id.into_inner()))
            .filter(je_header_staging::Column::Posted.eq(false))
            .all(&self.db)
            .await?;
        Ok(rows)
    }
}

/// Marks every staging row of the run posted, inside the caller's
/// transaction so the flip commits together with the ledger writes.
pub(crate) async fn mark_posted(
    txn: &DatabaseTransaction,
    run_id: RunId,
    at: DateTimeWithTimeZone,
) -> Result<(), DbErr> {
    let run_id = run_id.into_inner();
    je_header_staging::Entity::update_many()
        .col_expr(je_header_staging::Column::Posted, Expr::value(true))
        .col_expr(je_header_staging::Column::PostedAt, Expr::value(at))
        .filter(je_header_staging::Column::RunId.eq(run_id))
        .exec(txn)
        .await?;
    je_line_staging::Entity::update_many()
        .col_expr(je_line_staging::Column::Posted, Expr::value(true))
        .col_expr(je_line_staging::Column::PostedAt, Expr::value(at))
        .filter(je_line_staging::Column::RunId.eq(run_id))
        .exec(txn)
        .await?;
    Ok(())
}
