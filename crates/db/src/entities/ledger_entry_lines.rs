//! `SeaORM` entity for the `ledger_entry_lines` table.
//!
//! Range-partitioned by `je_date`, one partition per calendar month, so
//! the date is part of the primary key.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "ledger_entry_lines")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub je_id: i64,
    #[sea_orm(primary_key, auto_increment = false)]
    pub line_no: i32,
    #[sea_orm(primary_key, auto_increment = false)]
    pub je_date: Date,
    /// `DR` or `CR`.
    pub side: String,
    pub account_code: String,
    pub fund: String,
    pub amount: Decimal,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
