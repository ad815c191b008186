//! `SeaORM` entity for the `je_header_staging` table.
//!
//! Expansion output lands here before posting. Re-runs of the same period
//! stage under new run ids, so the run id is part of the key.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "je_header_staging")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub run_id: Uuid,
    #[sea_orm(primary_key, auto_increment = false)]
    pub je_number: String,
    pub je_date: Date,
    pub je_type: String,
    pub source_rowid: i64,
    pub template_code: String,
    pub template_version: i32,
    pub created_by: String,
    pub posted: bool,
    pub posted_at: Option<DateTimeWithTimeZone>,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
