//! `SeaORM` entity for the `ledger_entry_headers` table.
//!
//! The store assigns `je_id`. A unique constraint over (`je_number`,
//! `template_code`, `template_version`) makes posting idempotent under
//! concurrent retries.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "ledger_entry_headers")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub je_id: i64,
    pub je_number: String,
    pub je_date: Date,
    pub je_type: String,
    pub source_rowid: i64,
    pub template_code: String,
    pub template_version: i32,
    pub run_id: Uuid,
    pub created_by: String,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
