//! `SeaORM` entity for the `account_balance_snapshots` table.
//!
//! One row per (period, account, fund), upserted by the snapshotter.
//! Snapshots hold period flows; opening balances are out of scope and
//! stay zero.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "account_balance_snapshots")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub period_start: Date,
    #[sea_orm(primary_key, auto_increment = false)]
    pub account_code: String,
    #[sea_orm(primary_key, auto_increment = false)]
    pub fund: String,
    pub opening_balance: Decimal,
    pub debit: Decimal,
    pub credit: Decimal,
    pub closing_balance: Decimal,
    pub calculated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
