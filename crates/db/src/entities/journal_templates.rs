//! `SeaORM` entity for the `journal_templates` table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "journal_templates")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub template_code: String,
    #[sea_orm(primary_key, auto_increment = false)]
    pub template_version: i32,
    pub txn_type: String,
    pub je_type: String,
    pub description: Option<String>,
    /// `ACTIVE`, `DRAFT`, or `RETIRED`. Only `ACTIVE` rows resolve.
    pub status: String,
    pub effective_date: Date,
    /// Exclusive. `NULL` means no expiry.
    pub expiry_date: Option<Date>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
