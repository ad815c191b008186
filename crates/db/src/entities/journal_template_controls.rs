//! `SeaORM` entity for the `journal_template_controls` table.
//!
//! At most one row per template version. Templates without a row fall
//! back to the default controls.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "journal_template_controls")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub template_code: String,
    #[sea_orm(primary_key, auto_increment = false)]
    pub template_version: i32,
    pub require_balanced: bool,
    pub tolerance_amount: Decimal,
    /// `ERROR` or `AUTO_BALANCE`.
    pub balancing_mode: String,
    pub balancing_account: Option<String>,
    pub balancing_fund: Option<String>,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
