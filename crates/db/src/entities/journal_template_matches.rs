//! `SeaORM` entity for the `journal_template_matches` table.
//!
//! One row per routing rule. `NULL` in `product_code` or `channel` is a
//! wildcard matching any value.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "journal_template_matches")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub match_id: i64,
    pub template_code: String,
    pub template_version: i32,
    pub product_code: Option<String>,
    pub channel: Option<String>,
    /// Lower values win ties.
    pub priority: i32,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
