//! Balance snapshot repository for period aggregates over posted lines.

use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, DbBackend, DbErr, EntityTrait, QueryFilter,
    QueryOrder, Statement,
};

use saldo_shared::Period;

use crate::entities::account_balance_snapshots;

/// Error types for balance snapshot operations.
#[derive(Debug, thiserror::Error)]
pub enum BalanceError {
    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

/// Recomputed per-account flow aggregates within a single statement:
/// Postgres groups the posted lines and the upsert replaces any earlier
/// snapshot for the same period.
const SNAPSHOT_UPSERT_SQL: &str = r"
INSERT INTO account_balance_snapshots
    (period_start, account_code, fund, opening_balance, debit, credit,
     closing_balance, calculated_at)
SELECT
    $1::date,
    l.account_code,
    l.fund,
    0,
    SUM(CASE WHEN l.side = 'DR' THEN l.amount ELSE 0 END),
    SUM(CASE WHEN l.side = 'CR' THEN l.amount ELSE 0 END),
    SUM(CASE WHEN l.side = 'DR' THEN l.amount ELSE -l.amount END),
    now()
FROM ledger_entry_lines l
WHERE l.je_date >= $1 AND l.je_date < $2
GROUP BY l.account_code, l.fund
ON CONFLICT (period_start, account_code, fund) DO UPDATE SET
    opening_balance = EXCLUDED.opening_balance,
    debit = EXCLUDED.debit,
    credit = EXCLUDED.credit,
    closing_balance = EXCLUDED.closing_balance,
    calculated_at = EXCLUDED.calculated_at
";

/// Repository over the account balance snapshot table.
pub struct BalanceRepository {
    db: DatabaseConnection,
}

impl BalanceRepository {
    /// Creates a new balance repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Recomputes the period's snapshot from posted ledger lines, one row
    /// per (account_code, fund), upserting over any previous computation.
    /// Returns the number of snapshot rows written.
    pub async fn snapshot_period(&self, period: Period) -> Result<u64, BalanceError> {
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            SNAPSHOT_UPSERT_SQL,
            [period.start().into(), period.end_exclusive().into()],
        );
        let result = self.db.execute(stmt).await?;
        Ok(result.rows_affected())
    }

    /// Snapshot rows for a period, ordered by account and fund.
    pub async fn snapshots_for(
        &self,
        period: Period,
    ) -> Result<Vec<account_balance_snapshots::Model>, BalanceError> {
        let rows = account_balance_snapshots::Entity::find()
            .filter(account_balance_snapshots::Column::PeriodStart.eq(period.start()))
            .order_by_asc(account_balance_snapshots::Column::AccountCode)
            .order_by_asc(account_balance_snapshots::Column::Fund)
            .all(&self.db)
            .await?;
        Ok(rows)
    }
}
