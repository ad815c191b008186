//! Expansion error types.
//!
//! Every failure mode of the expansion engine is represented here. The
//! engine is all-or-nothing: any of these aborts the whole batch and
//! nothing is emitted.

use rust_decimal::Decimal;
use thiserror::Error;

use crate::expr::ExprError;
use crate::template::{BalancingMode, TemplateId};

/// Errors raised while expanding a transaction batch through a template.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExpansionError {
    // ========== Template Configuration Errors ==========
    /// The batch holds a row of a transaction type the template does not
    /// route.
    #[error("Template {template} expands {expected} but the batch holds a {found} row")]
    TxnTypeMismatch {
        /// The template being applied.
        template: TemplateId,
        /// The transaction type the template routes.
        expected: String,
        /// The offending row's transaction type.
        found: String,
    },

    /// The template is configured with a balancing mode the engine does
    /// not execute.
    #[error("Template {template} uses balancing mode {mode} which is not executable")]
    UnsupportedBalancingMode {
        /// The template being applied.
        template: TemplateId,
        /// The configured mode.
        mode: BalancingMode,
    },

    // ========== Expression Errors ==========
    /// A line amount expression failed to compile or evaluate.
    #[error("Template {template} line {line_no} amount: {source}")]
    LineExpression {
        /// The template being applied.
        template: TemplateId,
        /// The offending line.
        line_no: i32,
        /// The underlying expression error.
        source: ExprError,
    },

    /// A line condition expression failed to compile or evaluate.
    #[error("Template {template} line {line_no} condition '{cond_name}': {source}")]
    ConditionExpression {
        /// The template being applied.
        template: TemplateId,
        /// The offending line.
        line_no: i32,
        /// The condition's label.
        cond_name: String,
        /// The underlying expression error.
        source: ExprError,
    },

    // ========== Balance Errors ==========
    /// An expanded journal exceeded the balance tolerance after rounding.
    #[error(
        "Journal {je_number} is out of balance. Debit: {debit}, Credit: {credit}, tolerance: {tolerance}"
    )]
    Unbalanced {
        /// The worst-offending journal number.
        je_number: String,
        /// Its total debit amount.
        debit: Decimal,
        /// Its total credit amount.
        credit: Decimal,
        /// The tolerance it exceeded.
        tolerance: Decimal,
    },
}
