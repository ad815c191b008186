//! Database layer with `SeaORM` entities, repositories, and the pipeline.
//!
//! This crate provides:
//! - `SeaORM` entity definitions
//! - Repository abstractions for data access
//! - Database migrations
//! - The period posting pipeline orchestrator
//!
//! Large tables (`txn_source`, `ledger_entry_lines`) are range-partitioned
//! by month on the Postgres side; repositories provision partitions through
//! idempotent database functions before bulk writes.

pub mod entities;
pub mod migration;
pub mod pipeline;
pub mod repositories;

pub use pipeline::{PipelineError, PipelineReport, PipelineRunner};
pub use repositories::{
    BalanceRepository, LedgerRepository, StagingRepository, TemplateRepository,
    TxnSourceRepository,
};

use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};

use saldo_shared::DatabaseConfig;

/// Establishes a connection to the database.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn connect(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    Database::connect(database_url).await
}

/// Establishes a connection pool sized from configuration.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn connect_with(config: &DatabaseConfig) -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new(config.url.clone());
    options
        .max_connections(config.max_connections)
        .min_connections(config.min_connections);
    Database::connect(options).await
}
