//! Expanded journal value types.
//!
//! These are the pure outputs of the expansion engine, before anything
//! touches the database. The db crate maps them onto staging rows.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use saldo_shared::{Period, RunId};

use crate::template::{Side, TemplateId};

/// Builds the deterministic journal number for one source transaction.
///
/// The number embeds the accounting period and the source row id, so
/// re-expanding the same period regenerates identical numbers. That
/// determinism is what makes staging and posting safely re-runnable.
#[must_use]
pub fn je_number(period: Period, source_rowid: i64) -> String {
    format!("JE-{}-{}", period.label(), source_rowid)
}

/// One journal header produced by expansion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalHeader {
    /// Deterministic journal number.
    pub je_number: String,
    /// Journal date, the source transaction's value date.
    pub je_date: NaiveDate,
    /// Journal type stamped from the template.
    pub je_type: String,
    /// Source transaction row id.
    pub source_rowid: i64,
}

/// One journal line produced by expansion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalLine {
    /// Journal number of the owning header.
    pub je_number: String,
    /// Template line ordinal.
    pub line_no: i32,
    /// Debit or credit.
    pub side: Side,
    /// Account the amount posts to.
    pub account_code: String,
    /// Fund the amount posts to.
    pub fund_code: String,
    /// Line amount, already rounded to the template line's precision.
    pub amount: Decimal,
    /// Product code carried from the source row.
    pub product_code: String,
    /// Channel carried from the source row.
    pub channel: String,
    /// Journal date, duplicated from the header for partition routing.
    pub je_date: NaiveDate,
}

/// The complete output of one expansion run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpandedJournal {
    /// Run id minted for this expansion.
    pub run_id: RunId,
    /// Template that produced the journals.
    pub template: TemplateId,
    /// Accounting period the journals belong to.
    pub period: Period,
    /// Audit identity stamped on persisted rows.
    pub created_by: String,
    /// One header per source transaction, batch order.
    pub headers: Vec<JournalHeader>,
    /// Emitted lines, grouped by header in line order.
    pub lines: Vec<JournalLine>,
}

impl ExpandedJournal {
    /// Whether the run produced no headers at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    /// Sum of debit line amounts across the run.
    #[must_use]
    pub fn debit_total(&self) -> Decimal {
        self.side_total(Side::Debit)
    }

    /// Sum of credit line amounts across the run.
    #[must_use]
    pub fn credit_total(&self) -> Decimal {
        self.side_total(Side::Credit)
    }

    fn side_total(&self, side: Side) -> Decimal {
        self.lines
            .iter()
            .filter(|line| line.side == side)
            .map(|line| line.amount)
            .sum()
    }
}
