//! `SeaORM` entity definitions.
//!
//! One module per table. Partitioned tables (`txn_source`,
//! `ledger_entry_lines`) carry their partition key inside the primary key.

pub mod account_balance_snapshots;
pub mod je_header_staging;
pub mod je_line_staging;
pub mod journal_template_controls;
pub mod journal_template_line_conds;
pub mod journal_template_lines;
pub mod journal_template_matches;
pub mod journal_templates;
pub mod ledger_entry_headers;
pub mod ledger_entry_lines;
pub mod txn_source;
