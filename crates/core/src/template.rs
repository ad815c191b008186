//! Journal template domain model.
//!
//! A template describes how one business transaction type expands into
//! balanced journal lines: which accounts and funds to hit, which side,
//! and an amount expression per line. Templates are stored versioned and
//! resolved by routing key at run time.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while interpreting stored template fields.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    /// A line side column held something other than `DR` or `CR`.
    #[error("Invalid journal side '{value}', expected DR or CR")]
    InvalidSide {
        /// The rejected value.
        value: String,
    },

    /// A balancing mode column held an unknown value.
    #[error("Invalid balancing mode '{value}', expected ERROR or AUTO_BALANCE")]
    InvalidBalancingMode {
        /// The rejected value.
        value: String,
    },
}

/// Journal side: debit or credit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    /// Debit line.
    #[serde(rename = "DR")]
    Debit,
    /// Credit line.
    #[serde(rename = "CR")]
    Credit,
}

impl Side {
    /// The storage spelling of the side.
    #[must_use]
    pub const fn as_db_str(&self) -> &'static str {
        match self {
            Self::Debit => "DR",
            Self::Credit => "CR",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_db_str())
    }
}

impl FromStr for Side {
    type Err = TemplateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DR" => Ok(Self::Debit),
            "CR" => Ok(Self::Credit),
            other => Err(TemplateError::InvalidSide {
                value: other.to_string(),
            }),
        }
    }
}

/// What to do when an expanded journal fails the balance check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BalancingMode {
    /// Reject the whole batch. The only mode the engine executes.
    Error,
    /// Plug the difference into a balancing account. Stored but not
    /// executed; templates configured with it are rejected up front.
    AutoBalance,
}

impl BalancingMode {
    /// The storage spelling of the mode.
    #[must_use]
    pub const fn as_db_str(&self) -> &'static str {
        match self {
            Self::Error => "ERROR",
            Self::AutoBalance => "AUTO_BALANCE",
        }
    }
}

impl fmt::Display for BalancingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_db_str())
    }
}

impl FromStr for BalancingMode {
    type Err = TemplateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ERROR" => Ok(Self::Error),
            "AUTO_BALANCE" => Ok(Self::AutoBalance),
            other => Err(TemplateError::InvalidBalancingMode {
                value: other.to_string(),
            }),
        }
    }
}

/// Balance-check controls for one template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateControl {
    /// Whether expanded journals must balance within tolerance.
    pub require_balanced: bool,
    /// Largest tolerated |debit - credit| per journal.
    pub tolerance_amount: Decimal,
    /// Behavior when the check fails.
    pub balancing_mode: BalancingMode,
    /// Account to plug differences into under `AUTO_BALANCE`.
    pub balancing_account: Option<String>,
    /// Fund for the plug line under `AUTO_BALANCE`.
    pub balancing_fund: Option<String>,
}

impl Default for TemplateControl {
    /// The controls applied when a template has no control row.
    fn default() -> Self {
        Self {
            require_balanced: true,
            tolerance_amount: Decimal::new(1, 2),
            balancing_mode: BalancingMode::Error,
            balancing_account: None,
            balancing_fund: None,
        }
    }
}

/// One named condition attached to a template line.
///
/// A line with conditions is emitted only for rows where every condition
/// evaluates true.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateCondition {
    /// Human label for the condition, used in diagnostics.
    pub cond_name: String,
    /// Boolean expression over the transaction fields.
    pub cond_expr: String,
}

/// One journal line rule inside a template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateLine {
    /// Line ordinal within the template. Carried into the journal.
    pub line_no: i32,
    /// Debit or credit.
    pub side: Side,
    /// Target general-ledger account.
    pub account_code: String,
    /// Target fund.
    pub fund_code: String,
    /// Amount expression over the transaction fields.
    pub amount_expr: String,
    /// Decimal places the computed amount is rounded to.
    pub amount_round: u32,
    /// Inactive lines are skipped without being compiled.
    pub is_active: bool,
    /// Conditions AND-combined to gate the line per row.
    pub conditions: Vec<TemplateCondition>,
}

/// Identity of one template version.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TemplateId {
    /// Template code.
    pub code: String,
    /// Template version.
    pub version: i32,
}

impl fmt::Display for TemplateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} v{}", self.code, self.version)
    }
}

/// A fully assembled journal template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    /// Template code, unique together with `version`.
    pub code: String,
    /// Version number. Resolution picks at most one version per code.
    pub version: i32,
    /// Transaction type this template expands.
    pub txn_type: String,
    /// Journal type stamped on every header the template produces.
    pub je_type: String,
    /// Free-form description.
    pub description: Option<String>,
    /// Line rules in `line_no` order.
    pub lines: Vec<TemplateLine>,
    /// Balance-check controls.
    pub control: TemplateControl,
}

impl Template {
    /// The template's identity.
    #[must_use]
    pub fn id(&self) -> TemplateId {
        TemplateId {
            code: self.code.clone(),
            version: self.version,
        }
    }

    /// Iterates the active lines only.
    pub fn active_lines(&self) -> impl Iterator<Item = &TemplateLine> {
        self.lines.iter().filter(|line| line.is_active)
    }
}
