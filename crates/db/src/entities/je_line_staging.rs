//! `SeaORM` entity for the `je_line_staging` table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "je_line_staging")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub run_id: Uuid,
    #[sea_orm(primary_key, auto_increment = false)]
    pub je_number: String,
    #[sea_orm(primary_key, auto_increment = false)]
    pub line_no: i32,
    /// `DR` or `CR`.
    pub side: String,
    pub account_code: String,
    pub fund: String,
    pub amount: Decimal,
    pub product_code: String,
    pub channel: String,
    pub je_date: Date,
    pub template_code: String,
    pub template_version: i32,
    pub posted: bool,
    pub posted_at: Option<DateTimeWithTimeZone>,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
