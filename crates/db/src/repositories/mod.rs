//! Repository abstractions for data access.
//!
//! Repositories provide a clean interface for database operations,
//! hiding the `SeaORM` implementation details from the rest of the pipeline.

pub mod balance;
pub mod ledger;
pub mod staging;
pub mod template;
pub mod txn_source;

pub use balance::{BalanceError, BalanceRepository};
pub use ledger::{LedgerRepository, PostOutcome, PostingError};
pub use staging::{StagedCounts, StagingError, StagingRepository};
pub use template::{TemplateError, TemplateRepository};
pub use txn_source::{TxnSourceError, TxnSourceRepository};
