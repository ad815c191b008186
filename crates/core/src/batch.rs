//! Columnar transaction batches.
//!
//! The expansion engine evaluates template expressions column-wise, so a
//! period's transactions are held as one vector per field rather than a
//! vector of row structs.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::expr::{FieldSchema, ValueType};

/// One raw transaction row, used at the load boundary and in tests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// Stable row id from the transaction source. Feeds the journal number.
    pub source_rowid: i64,
    /// Business transaction type, e.g. `PREMIUM_RECEIPT`.
    pub txn_type: String,
    /// Policy the transaction belongs to.
    pub policy_no: String,
    /// Product code.
    pub product_code: String,
    /// Distribution channel.
    pub channel: String,
    /// ISO 4217 currency code.
    pub currency: String,
    /// Economic date of the transaction.
    pub value_date: NaiveDate,
    /// Gross transaction amount.
    pub gross_amount: Decimal,
    /// Risk-pool contribution component.
    pub tabarru_amount: Decimal,
    /// Mortality-reserve component.
    pub tanahud_amount: Decimal,
    /// Investment component.
    pub invest_amount: Decimal,
    /// Operator-fee component.
    pub ujroh_amount: Decimal,
    /// Administration-fee component.
    pub admin_amount: Decimal,
}

/// Template routing key: transactions with the same key post the same way.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RoutingKey {
    /// Business transaction type.
    pub txn_type: String,
    /// Product code.
    pub product_code: String,
    /// Distribution channel.
    pub channel: String,
}

impl std::fmt::Display for RoutingKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.txn_type, self.product_code, self.channel)
    }
}

/// Columnar transaction batch (struct of arrays).
///
/// All column vectors always have the same length.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionBatch {
    source_rowids: Vec<i64>,
    txn_types: Vec<String>,
    policy_nos: Vec<String>,
    product_codes: Vec<String>,
    channels: Vec<String>,
    currencies: Vec<String>,
    value_dates: Vec<NaiveDate>,
    gross_amounts: Vec<Decimal>,
    tabarru_amounts: Vec<Decimal>,
    tanahud_amounts: Vec<Decimal>,
    invest_amounts: Vec<Decimal>,
    ujroh_amounts: Vec<Decimal>,
    admin_amounts: Vec<Decimal>,
}

impl TransactionBatch {
    /// The schema template expressions compile against.
    ///
    /// `source_rowid` is identity, not data, and is deliberately absent.
    #[must_use]
    pub fn schema() -> FieldSchema {
        FieldSchema::new()
            .with_field("txn_type", ValueType::Text)
            .with_field("policy_no", ValueType::Text)
            .with_field("product_code", ValueType::Text)
            .with_field("channel", ValueType::Text)
            .with_field("currency", ValueType::Text)
            .with_field("value_date", ValueType::Date)
            .with_field("gross_amount", ValueType::Number)
            .with_field("tabarru_amount", ValueType::Number)
            .with_field("tanahud_amount", ValueType::Number)
            .with_field("invest_amount", ValueType::Number)
            .with_field("ujroh_amount", ValueType::Number)
            .with_field("admin_amount", ValueType::Number)
    }

    /// Builds a batch from row records.
    #[must_use]
    pub fn from_records(records: Vec<TransactionRecord>) -> Self {
        let mut batch = Self::default();
        for record in records {
            batch.push(record);
        }
        batch
    }

    /// Appends one row.
    pub fn push(&mut self, record: TransactionRecord) {
        self.source_rowids.push(record.source_rowid);
        self.txn_types.push(record.txn_type);
        self.policy_nos.push(record.policy_no);
        self.product_codes.push(record.product_code);
        self.channels.push(record.channel);
        self.currencies.push(record.currency);
        self.value_dates.push(record.value_date);
        self.gross_amounts.push(record.gross_amount);
        self.tabarru_amounts.push(record.tabarru_amount);
        self.tanahud_amounts.push(record.tanahud_amount);
        self.invest_amounts.push(record.invest_amount);
        self.ujroh_amounts.push(record.ujroh_amount);
        self.admin_amounts.push(record.admin_amount);
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.source_rowids.len()
    }

    /// Whether the batch has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.source_rowids.is_empty()
    }

    /// Moves every row of `other` into this batch.
    pub fn merge(&mut self, mut other: Self) {
        self.source_rowids.append(&mut other.source_rowids);
        self.txn_types.append(&mut other.txn_types);
        self.policy_nos.append(&mut other.policy_nos);
        self.product_codes.append(&mut other.product_codes);
        self.channels.append(&mut other.channels);
        self.currencies.append(&mut other.currencies);
        self.value_dates.append(&mut other.value_dates);
        self.gross_amounts.append(&mut other.gross_amounts);
        self.tabarru_amounts.append(&mut other.tabarru_amounts);
        self.tanahud_amounts.append(&mut other.tanahud_amounts);
        self.invest_amounts.append(&mut other.invest_amounts);
        self.ujroh_amounts.append(&mut other.ujroh_amounts);
        self.admin_amounts.append(&mut other.admin_amounts);
    }

    /// Source row ids, aligned with every other column.
    #[must_use]
    pub fn source_rowids(&self) -> &[i64] {
        &self.source_rowids
    }

    /// Transaction types per row.
    #[must_use]
    pub fn txn_types(&self) -> &[String] {
        &self.txn_types
    }

    /// Product codes per row.
    #[must_use]
    pub fn product_codes(&self) -> &[String] {
        &self.product_codes
    }

    /// Channels per row.
    #[must_use]
    pub fn channels(&self) -> &[String] {
        &self.channels
    }

    /// Value dates per row.
    #[must_use]
    pub fn value_dates(&self) -> &[NaiveDate] {
        &self.value_dates
    }

    pub(crate) fn number_column(&self, field: &str) -> Option<&[Decimal]> {
        match field {
            "gross_amount" => Some(&self.gross_amounts),
            "tabarru_amount" => Some(&self.tabarru_amounts),
            "tanahud_amount" => Some(&self.tanahud_amounts),
            "invest_amount" => Some(&self.invest_amounts),
            "ujroh_amount" => Some(&self.ujroh_amounts),
            "admin_amount" => Some(&self.admin_amounts),
            _ => None,
        }
    }

    pub(crate) fn text_column(&self, field: &str) -> Option<&[String]> {
        match field {
            "txn_type" => Some(&self.txn_types),
            "policy_no" => Some(&self.policy_nos),
            "product_code" => Some(&self.product_codes),
            "channel" => Some(&self.channels),
            "currency" => Some(&self.currencies),
            _ => None,
        }
    }

    pub(crate) fn date_column(&self, field: &str) -> Option<&[NaiveDate]> {
        (field == "value_date").then_some(self.value_dates.as_slice())
    }

    fn record(&self, row: usize) -> TransactionRecord {
        TransactionRecord {
            source_rowid: self.source_rowids[row],
            txn_type: self.txn_types[row].clone(),
            policy_no: self.policy_nos[row].clone(),
            product_code: self.product_codes[row].clone(),
            channel: self.channels[row].clone(),
            currency: self.currencies[row].clone(),
            value_date: self.value_dates[row],
            gross_amount: self.gross_amounts[row],
            tabarru_amount: self.tabarru_amounts[row],
            tanahud_amount: self.tanahud_amounts[row],
            invest_amount: self.invest_amounts[row],
            ujroh_amount: self.ujroh_amounts[row],
            admin_amount: self.admin_amounts[row],
        }
    }

    /// Rebuilds the row view of the batch.
    #[must_use]
    pub fn records(&self) -> Vec<TransactionRecord> {
        (0..self.len()).map(|row| self.record(row)).collect()
    }

    /// Splits the batch into per-routing-key groups for template resolution.
    ///
    /// Keys come back sorted, so group order is deterministic run to run.
    /// Every row lands in exactly one group.
    #[must_use]
    pub fn partition_by_routing(&self) -> Vec<(RoutingKey, Self)> {
        let mut groups: BTreeMap<RoutingKey, Self> = BTreeMap::new();
        for row in 0..self.len() {
            let key = RoutingKey {
                txn_type: self.txn_types[row].clone(),
                product_code: self.product_codes[row].clone(),
                channel: self.channels[row].clone(),
            };
            groups.entry(key).or_default().push(self.record(row));
        }
        groups.into_iter().collect()
    }
}
