//! Transaction source repository for period feed loading.

use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, DbBackend, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Statement,
};

use saldo_core::batch::{TransactionBatch, TransactionRecord};
use saldo_shared::Period;

use crate::entities::txn_source;

/// Error types for transaction source operations.
#[derive(Debug, thiserror::Error)]
pub enum TxnSourceError {
    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

/// Repository over the partitioned transaction feed.
pub struct TxnSourceRepository {
    db: DatabaseConnection,
}

impl TxnSourceRepository {
    /// Creates a new transaction source repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Loads one period's transactions into a columnar batch, ordered by
    /// source_rowid so downstream journal numbering is reproducible.
    pub async fn load_period(&self, period: Period) -> Result<TransactionBatch, TxnSourceError> {
        let rows = txn_source::Entity::find()
            .filter(txn_source::Column::TxnMonth.eq(period.start()))
            .order_by_asc(txn_source::Column::SourceRowid)
            .all(&self.db)
            .await?;

        let mut batch = TransactionBatch::default();
        for row in rows {
            batch.push(TransactionRecord {
                source_rowid: row.source_rowid,
                txn_type: row.txn_type,
                policy_no: row.policy_no,
                product_code: row.product_code,
                channel: row.channel,
                currency: row.currency,
                value_date: row.value_date,
                gross_amount: row.gross_amount,
                tabarru_amount: row.tabarru_amount,
                tanahud_amount: row.tanahud_amount,
                invest_amount: row.invest_amount,
                ujroh_amount: row.ujroh_amount,
                admin_amount: row.admin_amount,
            });
        }
        Ok(batch)
    }

    /// Number of feed rows present for the period.
    pub async fn count_period(&self, period: Period) -> Result<u64, TxnSourceError> {
        let count = txn_source::Entity::find()
            .filter(txn_source::Column::TxnMonth.eq(period.start()))
            .count(&self.db)
            .await?;
        Ok(count)
    }

    /// Ensures the feed partition for the period exists. Safe to call
    /// repeatedly and under concurrent writers.
    pub async fn ensure_partition(&self, period: Period) -> Result<(), TxnSourceError> {
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            "SELECT ensure_txn_source_partition($1)",
            [period.start().into()],
        );
        self.db.execute(stmt).await?;
        Ok(())
    }

    /// Bulk-inserts feed rows in chunks. Callers must ensure the target
    /// partition exists first.
    pub async fn insert_rows(
        &self,
        rows: Vec<txn_source::ActiveModel>,
        chunk_size: usize,
    ) -> Result<(), TxnSourceError> {
        let chunk_size = chunk_size.max(1);
        let mut rows = rows.into_iter().peekable();
        while rows.peek().is_some() {
            let chunk: Vec<_> = rows.by_ref().take(chunk_size).collect();
            txn_source::Entity::insert_many(chunk)
                .exec_without_returning(&self.db)
                .await?;
        }
        Ok(())
    }
}
