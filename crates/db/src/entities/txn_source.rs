//! `SeaORM` entity for the `txn_source` table.
//!
//! The table is range-partitioned by `txn_month`, so the partition key is
//! part of the primary key. `source_rowid` values come from one global
//! sequence and are unique across partitions.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "txn_source")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub source_rowid: i64,
    #[sea_orm(primary_key, auto_increment = false)]
    pub txn_month: Date,
    pub txn_type: String,
    pub policy_no: String,
    pub product_code: String,
    pub channel: String,
    pub currency: String,
    pub value_date: Date,
    pub gross_amount: Decimal,
    pub tabarru_amount: Decimal,
    pub tanahud_amount: Decimal,
    pub invest_amount: Decimal,
    pub ujroh_amount: Decimal,
    pub admin_amount: Decimal,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
