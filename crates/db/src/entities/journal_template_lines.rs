//! `SeaORM` entity for the `journal_template_lines` table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "journal_template_lines")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub template_code: String,
    #[sea_orm(primary_key, auto_increment = false)]
    pub template_version: i32,
    #[sea_orm(primary_key, auto_increment = false)]
    pub line_no: i32,
    /// `DR` or `CR`.
    pub side: String,
    pub account_code: String,
    pub fund_code: String,
    pub amount_expr: String,
    pub amount_round: i32,
    pub is_active: bool,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
