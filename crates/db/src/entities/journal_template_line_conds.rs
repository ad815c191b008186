//! `SeaORM` entity for the `journal_template_line_conds` table.
//!
//! Conditions of the same template line AND-combine at expansion time.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "journal_template_line_conds")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub template_code: String,
    #[sea_orm(primary_key, auto_increment = false)]
    pub template_version: i32,
    #[sea_orm(primary_key, auto_increment = false)]
    pub line_no: i32,
    #[sea_orm(primary_key, auto_increment = false)]
    pub cond_name: String,
    pub cond_expr: String,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
