//! Journal expansion engine.
//!
//! Expands a columnar transaction batch through one journal template into
//! headers and lines. The engine is pure: no I/O, no clock, and a run is
//! reproducible except for the freshly minted run id.

use rayon::prelude::*;
use rust_decimal::{Decimal, RoundingStrategy};

use saldo_shared::{Period, RunId};

use super::error::ExpansionError;
use super::types::{je_number, ExpandedJournal, JournalHeader, JournalLine};
use crate::batch::TransactionBatch;
use crate::expr::{compile_amount, compile_condition, CompiledAmount, CompiledCondition};
use crate::template::{BalancingMode, Side, Template, TemplateCondition, TemplateLine};

/// One active template line, compiled and ready to evaluate.
struct CompiledLine<'t> {
    line: &'t TemplateLine,
    amount: CompiledAmount,
    conditions: Vec<(&'t TemplateCondition, CompiledCondition)>,
}

/// One active template line, evaluated across the whole batch.
struct EvaluatedLine<'t> {
    line: &'t TemplateLine,
    /// Per-row amounts, rounded to the line's precision.
    amounts: Vec<Decimal>,
    /// Per-row AND of all condition masks.
    mask: Vec<bool>,
}

/// Expands transaction batches through journal templates.
///
/// Carries only the audit identity stamped on its output; everything else
/// arrives per call, so one engine serves any number of runs.
#[derive(Debug, Clone)]
pub struct ExpansionEngine {
    created_by: String,
}

impl ExpansionEngine {
    /// Creates an engine stamping `created_by` on everything it expands.
    #[must_use]
    pub fn new(created_by: impl Into<String>) -> Self {
        Self {
            created_by: created_by.into(),
        }
    }

    /// The audit identity this engine stamps on its output.
    #[must_use]
    pub fn created_by(&self) -> &str {
        &self.created_by
    }

    /// Expands one batch through one template.
    ///
    /// The batch succeeds or fails as a whole. A fresh run id is minted
    /// per call, empty batches included. Headers are emitted for every
    /// row; lines are emitted per active template line for rows passing
    /// all of the line's conditions, rounded half-even to the line's
    /// precision, with exact zeros suppressed.
    ///
    /// # Errors
    ///
    /// Returns `ExpansionError` if the template carries a balancing mode
    /// the engine cannot execute, a batch row's transaction type does not
    /// match the template, any active line expression fails to compile or
    /// evaluate, or a produced journal breaks the balance tolerance.
    pub fn expand(
        &self,
        template: &Template,
        batch: &TransactionBatch,
        period: Period,
    ) -> Result<ExpandedJournal, ExpansionError> {
        let run_id = RunId::new();

        // 1. Reject template configurations the engine cannot execute.
        if template.control.balancing_mode != BalancingMode::Error {
            return Err(ExpansionError::UnsupportedBalancingMode {
                template: template.id(),
                mode: template.control.balancing_mode,
            });
        }

        // 2. Every row must carry the transaction type the template routes.
        if let Some(found) = batch
            .txn_types()
            .iter()
            .find(|txn_type| **txn_type != template.txn_type)
        {
            return Err(ExpansionError::TxnTypeMismatch {
                template: template.id(),
                expected: template.txn_type.clone(),
                found: found.clone(),
            });
        }

        let mut journal = ExpandedJournal {
            run_id,
            template: template.id(),
            period,
            created_by: self.created_by.clone(),
            headers: Vec::with_capacity(batch.len()),
            lines: Vec::new(),
        };
        if batch.is_empty() {
            return Ok(journal);
        }

        // 3. Compile every active line up front. Nothing evaluates if any
        //    expression is rejected.
        let compiled = compile_lines(template)?;

        // 4. Evaluate amounts and condition masks column-wise.
        let evaluated = evaluate_lines(template, compiled, batch)?;

        // 5. Assemble one header per row, then the row's surviving lines.
        let numbers: Vec<String> = batch
            .source_rowids()
            .iter()
            .map(|rowid| je_number(period, *rowid))
            .collect();
        let dates = batch.value_dates();
        let products = batch.product_codes();
        let channels = batch.channels();

        for row in 0..batch.len() {
            journal.headers.push(JournalHeader {
                je_number: numbers[row].clone(),
                je_date: dates[row],
                je_type: template.je_type.clone(),
                source_rowid: batch.source_rowids()[row],
            });
            for eval in &evaluated {
                if !eval.mask[row] || eval.amounts[row].is_zero() {
                    continue;
                }
                journal.lines.push(JournalLine {
                    je_number: numbers[row].clone(),
                    line_no: eval.line.line_no,
                    side: eval.line.side,
                    account_code: eval.line.account_code.clone(),
                    fund_code: eval.line.fund_code.clone(),
                    amount: eval.amounts[row],
                    product_code: products[row].clone(),
                    channel: channels[row].clone(),
                    je_date: dates[row],
                });
            }
        }

        // 6. Balance check after rounding. The worst journal decides, and
        //    one failure aborts the whole batch.
        if template.control.require_balanced {
            check_balanced(&journal, template.control.tolerance_amount)?;
        }

        Ok(journal)
    }

    /// Expands independent (template, batch) jobs in parallel.
    ///
    /// Output order matches input order and each job mints its own run id.
    /// The engine is pure, so jobs never observe each other.
    ///
    /// # Errors
    ///
    /// Returns the first failing job's `ExpansionError`; no partial output
    /// is returned.
    pub fn expand_all(
        &self,
        jobs: &[(&Template, &TransactionBatch)],
        period: Period,
    ) -> Result<Vec<ExpandedJournal>, ExpansionError> {
        jobs.par_iter()
            .map(|(template, batch)| self.expand(template, batch, period))
            .collect()
    }
}

fn compile_lines(template: &Template) -> Result<Vec<CompiledLine<'_>>, ExpansionError> {
    let schema = TransactionBatch::schema();
    let mut compiled = Vec::new();
    for line in template.active_lines() {
        let amount = compile_amount(&line.amount_expr, &schema).map_err(|source| {
            ExpansionError::LineExpression {
                template: template.id(),
                line_no: line.line_no,
                source,
            }
        })?;
        let mut conditions = Vec::with_capacity(line.conditions.len());
        for cond in &line.conditions {
            let compiled_cond = compile_condition(&cond.cond_expr, &schema).map_err(|source| {
                ExpansionError::ConditionExpression {
                    template: template.id(),
                    line_no: line.line_no,
                    cond_name: cond.cond_name.clone(),
                    source,
                }
            })?;
            conditions.push((cond, compiled_cond));
        }
        compiled.push(CompiledLine {
            line,
            amount,
            conditions,
        });
    }
    Ok(compiled)
}

fn evaluate_lines<'t>(
    template: &Template,
    compiled: Vec<CompiledLine<'t>>,
    batch: &TransactionBatch,
) -> Result<Vec<EvaluatedLine<'t>>, ExpansionError> {
    let mut evaluated = Vec::with_capacity(compiled.len());
    for entry in compiled {
        let raw = entry.amount.eval(batch).map_err(|source| {
            ExpansionError::LineExpression {
                template: template.id(),
                line_no: entry.line.line_no,
                source,
            }
        })?;
        let amounts: Vec<Decimal> = raw
            .into_iter()
            .map(|amount| {
                amount.round_dp_with_strategy(
                    entry.line.amount_round,
                    RoundingStrategy::MidpointNearestEven,
                )
            })
            .collect();

        let mut mask = vec![true; batch.len()];
        for (cond, compiled_cond) in entry.conditions {
            let values = compiled_cond.eval(batch).map_err(|source| {
                ExpansionError::ConditionExpression {
                    template: template.id(),
                    line_no: entry.line.line_no,
                    cond_name: cond.cond_name.clone(),
                    source,
                }
            })?;
            for (slot, value) in mask.iter_mut().zip(values) {
                *slot = *slot && value;
            }
        }

        evaluated.push(EvaluatedLine {
            line: entry.line,
            amounts,
            mask,
        });
    }
    Ok(evaluated)
}

/// Finds the journal with the largest |debit - credit| and rejects the
/// batch when it exceeds the tolerance. Equality passes.
fn check_balanced(journal: &ExpandedJournal, tolerance: Decimal) -> Result<(), ExpansionError> {
    let mut totals: std::collections::BTreeMap<&str, (Decimal, Decimal)> =
        std::collections::BTreeMap::new();
    for line in &journal.lines {
        let entry = totals.entry(line.je_number.as_str()).or_default();
        match line.side {
            Side::Debit => entry.0 += line.amount,
            Side::Credit => entry.1 += line.amount,
        }
    }

    let worst = totals
        .into_iter()
        .max_by_key(|(_, (debit, credit))| (*debit - *credit).abs());
    if let Some((je_number, (debit, credit))) = worst {
        if (debit - credit).abs() > tolerance {
            return Err(ExpansionError::Unbalanced {
                je_number: je_number.to_string(),
                debit,
                credit,
                tolerance,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::TransactionRecord;
    use crate::expr::ExprError;
    use crate::template::{TemplateControl, TemplateId};
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn period() -> Period {
        Period::new(2026, 1).unwrap()
    }

    fn premium_record(rowid: i64, channel: &str) -> TransactionRecord {
        TransactionRecord {
            source_rowid: rowid,
            txn_type: "PREMIUM_RECEIPT".to_string(),
            policy_no: format!("POL-{rowid:08}"),
            product_code: "LIFE01".to_string(),
            channel: channel.to_string(),
            currency: "IDR".to_string(),
            value_date: NaiveDate::from_ymd_opt(2026, 1, 5).unwrap(),
            gross_amount: dec!(100),
            tabarru_amount: dec!(40),
            tanahud_amount: dec!(25),
            invest_amount: dec!(20),
            ujroh_amount: dec!(10),
            admin_amount: dec!(5),
        }
    }

    fn line(
        line_no: i32,
        side: Side,
        account: &str,
        fund: &str,
        expr: &str,
    ) -> TemplateLine {
        TemplateLine {
            line_no,
            side,
            account_code: account.to_string(),
            fund_code: fund.to_string(),
            amount_expr: expr.to_string(),
            amount_round: 2,
            is_active: true,
            conditions: Vec::new(),
        }
    }

    /// Premium split: cash against the five components, plus an agency
    /// commission pair gated on channel.
    fn premium_template() -> Template {
        let mut commission_dr = line(7, Side::Debit, "5201", "OPERATOR", ":ujroh_amount * 0.5");
        commission_dr.conditions.push(TemplateCondition {
            cond_name: "agency_only".to_string(),
            cond_expr: "eq(:channel, AGENCY)".to_string(),
        });
        let mut commission_cr = line(8, Side::Credit, "2301", "OPERATOR", ":ujroh_amount * 0.5");
        commission_cr.conditions.push(TemplateCondition {
            cond_name: "agency_only".to_string(),
            cond_expr: "eq(:channel, AGENCY)".to_string(),
        });

        Template {
            code: "TPL-PREMIUM".to_string(),
            version: 1,
            txn_type: "PREMIUM_RECEIPT".to_string(),
            je_type: "PREMIUM".to_string(),
            description: Some("Premium receipt split".to_string()),
            lines: vec![
                line(1, Side::Debit, "1101", "GENERAL", ":gross_amount"),
                line(2, Side::Credit, "3101", "TABARRU", ":tabarru_amount"),
                line(3, Side::Credit, "3201", "TANAHUD", ":tanahud_amount"),
                line(4, Side::Credit, "3301", "INVEST", ":invest_amount"),
                line(5, Side::Credit, "4101", "OPERATOR", ":ujroh_amount"),
                line(6, Side::Credit, "4102", "OPERATOR", ":admin_amount"),
                commission_dr,
                commission_cr,
            ],
            control: TemplateControl::default(),
        }
    }

    fn engine() -> ExpansionEngine {
        ExpansionEngine::new("test-pipeline")
    }

    #[test]
    fn test_one_header_per_row_with_deterministic_numbers() {
        let batch = TransactionBatch::from_records(vec![
            premium_record(1, "AGENCY"),
            premium_record(2, "INBRANCH"),
        ]);
        let journal = engine().expand(&premium_template(), &batch, period()).unwrap();

        assert_eq!(journal.headers.len(), 2);
        assert_eq!(journal.headers[0].je_number, "JE-202601-1");
        assert_eq!(journal.headers[1].je_number, "JE-202601-2");
        assert_eq!(journal.headers[0].je_type, "PREMIUM");
        assert_eq!(
            journal.headers[0].je_date,
            NaiveDate::from_ymd_opt(2026, 1, 5).unwrap()
        );
    }

    #[test]
    fn test_expansion_balances_and_stamps_template() {
        let batch = TransactionBatch::from_records(vec![premium_record(1, "AGENCY")]);
        let journal = engine().expand(&premium_template(), &batch, period()).unwrap();

        assert_eq!(journal.debit_total(), journal.credit_total());
        assert_eq!(
            journal.template,
            TemplateId {
                code: "TPL-PREMIUM".to_string(),
                version: 1
            }
        );
        assert_eq!(journal.created_by, "test-pipeline");
    }

    #[test]
    fn test_conditional_lines_gate_by_channel() {
        let batch = TransactionBatch::from_records(vec![
            premium_record(1, "AGENCY"),
            premium_record(2, "INBRANCH"),
        ]);
        let journal = engine().expand(&premium_template(), &batch, period()).unwrap();

        let lines_for = |je: &str| -> Vec<i32> {
            journal
                .lines
                .iter()
                .filter(|l| l.je_number == je)
                .map(|l| l.line_no)
                .collect()
        };
        // Agency row gets the commission pair, branch row does not.
        assert_eq!(lines_for("JE-202601-1"), vec![1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(lines_for("JE-202601-2"), vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_zero_amount_lines_suppressed_header_survives() {
        let mut record = premium_record(1, "INBRANCH");
        record.gross_amount = dec!(95);
        record.admin_amount = dec!(0);
        let batch = TransactionBatch::from_records(vec![record]);
        let journal = engine().expand(&premium_template(), &batch, period()).unwrap();

        assert_eq!(journal.headers.len(), 1);
        assert!(journal.lines.iter().all(|l| !l.amount.is_zero()));
        assert!(journal.lines.iter().all(|l| l.line_no != 6));
    }

    #[test]
    fn test_all_zero_row_keeps_header_with_no_lines() {
        let mut record = premium_record(9, "INBRANCH");
        record.gross_amount = dec!(0);
        record.tabarru_amount = dec!(0);
        record.tanahud_amount = dec!(0);
        record.invest_amount = dec!(0);
        record.ujroh_amount = dec!(0);
        record.admin_amount = dec!(0);
        let batch = TransactionBatch::from_records(vec![record]);
        let journal = engine().expand(&premium_template(), &batch, period()).unwrap();

        assert_eq!(journal.headers.len(), 1);
        assert!(journal.lines.is_empty());
    }

    #[test]
    fn test_unbalanced_row_rejects_the_whole_batch() {
        let mut bad = premium_record(2, "INBRANCH");
        bad.gross_amount = dec!(150);
        let batch =
            TransactionBatch::from_records(vec![premium_record(1, "INBRANCH"), bad]);

        let err = engine()
            .expand(&premium_template(), &batch, period())
            .unwrap_err();
        match err {
            ExpansionError::Unbalanced {
                je_number,
                debit,
                credit,
                tolerance,
            } => {
                assert_eq!(je_number, "JE-202601-2");
                assert_eq!(debit, dec!(150));
                assert_eq!(credit, dec!(100));
                assert_eq!(tolerance, dec!(0.01));
            }
            other => panic!("expected Unbalanced, got {other:?}"),
        }
    }

    #[test]
    fn test_tolerance_is_inclusive() {
        let template = Template {
            code: "TPL-PAIR".to_string(),
            version: 1,
            txn_type: "PREMIUM_RECEIPT".to_string(),
            je_type: "PREMIUM".to_string(),
            description: None,
            lines: vec![
                line(1, Side::Debit, "1101", "GENERAL", ":gross_amount"),
                line(2, Side::Credit, "3101", "TABARRU", ":tabarru_amount"),
            ],
            control: TemplateControl::default(),
        };

        let mut on_edge = premium_record(1, "INBRANCH");
        on_edge.gross_amount = dec!(100.01);
        on_edge.tabarru_amount = dec!(100.00);
        let batch = TransactionBatch::from_records(vec![on_edge]);
        assert!(engine().expand(&template, &batch, period()).is_ok());

        let mut over = premium_record(2, "INBRANCH");
        over.gross_amount = dec!(100.02);
        over.tabarru_amount = dec!(100.00);
        let batch = TransactionBatch::from_records(vec![over]);
        assert!(matches!(
            engine().expand(&template, &batch, period()),
            Err(ExpansionError::Unbalanced { .. })
        ));
    }

    #[test]
    fn test_line_rounding_is_half_even() {
        let template = Template {
            code: "TPL-HALF".to_string(),
            version: 1,
            txn_type: "PREMIUM_RECEIPT".to_string(),
            je_type: "PREMIUM".to_string(),
            description: None,
            lines: vec![
                TemplateLine {
                    amount_round: 0,
                    ..line(1, Side::Debit, "1101", "GENERAL", ":gross_amount * 0.5")
                },
                TemplateLine {
                    amount_round: 0,
                    ..line(2, Side::Credit, "3101", "TABARRU", ":gross_amount * 0.5")
                },
            ],
            control: TemplateControl::default(),
        };

        let mut record = premium_record(1, "INBRANCH");
        record.gross_amount = dec!(5);
        let batch = TransactionBatch::from_records(vec![record]);
        let journal = engine().expand(&template, &batch, period()).unwrap();

        // 2.5 rounds to 2 under half-even.
        assert_eq!(journal.lines[0].amount, dec!(2));
        assert_eq!(journal.lines[1].amount, dec!(2));
    }

    #[test]
    fn test_empty_batch_returns_empty_journal_with_fresh_run_id() {
        let batch = TransactionBatch::default();
        let first = engine().expand(&premium_template(), &batch, period()).unwrap();
        let second = engine().expand(&premium_template(), &batch, period()).unwrap();

        assert!(first.is_empty());
        assert!(first.lines.is_empty());
        assert_ne!(first.run_id, second.run_id);
    }

    #[test]
    fn test_txn_type_mismatch_rejected() {
        let mut claim = premium_record(1, "AGENCY");
        claim.txn_type = "CLAIM_PAID".to_string();
        let batch = TransactionBatch::from_records(vec![claim]);

        let err = engine()
            .expand(&premium_template(), &batch, period())
            .unwrap_err();
        assert!(matches!(
            err,
            ExpansionError::TxnTypeMismatch { ref found, .. } if found == "CLAIM_PAID"
        ));
    }

    #[test]
    fn test_auto_balance_mode_rejected_up_front() {
        let mut template = premium_template();
        template.control.balancing_mode = BalancingMode::AutoBalance;
        let batch = TransactionBatch::from_records(vec![premium_record(1, "AGENCY")]);

        let err = engine().expand(&template, &batch, period()).unwrap_err();
        assert!(matches!(
            err,
            ExpansionError::UnsupportedBalancingMode {
                mode: BalancingMode::AutoBalance,
                ..
            }
        ));
    }

    #[test]
    fn test_compile_failure_names_the_line() {
        let mut template = premium_template();
        template.lines[2].amount_expr = ":no_such_field".to_string();
        let batch = TransactionBatch::from_records(vec![premium_record(1, "AGENCY")]);

        let err = engine().expand(&template, &batch, period()).unwrap_err();
        match err {
            ExpansionError::LineExpression {
                line_no,
                source: ExprError::UnknownField { name },
                ..
            } => {
                assert_eq!(line_no, 3);
                assert_eq!(name, "no_such_field");
            }
            other => panic!("expected LineExpression, got {other:?}"),
        }
    }

    #[test]
    fn test_sql_shaped_expression_rejected_before_evaluation() {
        let mut template = premium_template();
        template.lines[0].amount_expr = ":gross_amount; DROP TABLE x".to_string();
        let batch = TransactionBatch::from_records(vec![premium_record(1, "AGENCY")]);

        let err = engine().expand(&template, &batch, period()).unwrap_err();
        assert!(matches!(
            err,
            ExpansionError::LineExpression {
                source: ExprError::IllegalCharacter { ch: ';', .. },
                ..
            }
        ));
    }

    #[test]
    fn test_condition_failure_names_the_condition() {
        let mut template = premium_template();
        template.lines[6].conditions[0].cond_expr = ":channel > 1".to_string();
        let batch = TransactionBatch::from_records(vec![premium_record(1, "AGENCY")]);

        let err = engine().expand(&template, &batch, period()).unwrap_err();
        assert!(matches!(
            err,
            ExpansionError::ConditionExpression { ref cond_name, .. } if cond_name == "agency_only"
        ));
    }

    #[test]
    fn test_division_by_zero_fails_the_batch() {
        let mut template = premium_template();
        template.lines[0].amount_expr = ":gross_amount / (1 - 1)".to_string();
        let batch = TransactionBatch::from_records(vec![premium_record(1, "AGENCY")]);

        let err = engine().expand(&template, &batch, period()).unwrap_err();
        assert!(matches!(
            err,
            ExpansionError::LineExpression {
                source: ExprError::DivisionByZero { .. },
                ..
            }
        ));
    }

    #[test]
    fn test_inactive_lines_are_never_compiled() {
        let mut template = premium_template();
        template.lines.push(TemplateLine {
            is_active: false,
            ..line(9, Side::Debit, "9999", "GENERAL", ":broken(")
        });
        let batch = TransactionBatch::from_records(vec![premium_record(1, "AGENCY")]);

        let journal = engine().expand(&template, &batch, period()).unwrap();
        assert!(journal.lines.iter().all(|l| l.line_no != 9));
    }

    #[test]
    fn test_lines_grouped_by_header_in_line_order() {
        let batch = TransactionBatch::from_records(vec![
            premium_record(1, "AGENCY"),
            premium_record(2, "AGENCY"),
        ]);
        let journal = engine().expand(&premium_template(), &batch, period()).unwrap();

        let first: Vec<_> = journal.lines[..8].iter().map(|l| l.je_number.as_str()).collect();
        let second: Vec<_> = journal.lines[8..].iter().map(|l| l.je_number.as_str()).collect();
        assert!(first.iter().all(|je| *je == "JE-202601-1"));
        assert!(second.iter().all(|je| *je == "JE-202601-2"));

        let ordinals: Vec<i32> = journal.lines[..8].iter().map(|l| l.line_no).collect();
        assert_eq!(ordinals, vec![1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn test_expand_all_preserves_job_order_with_distinct_run_ids() {
        let premium = premium_template();
        let premium_batch = TransactionBatch::from_records(vec![premium_record(1, "AGENCY")]);
        let other_batch = TransactionBatch::from_records(vec![premium_record(2, "INBRANCH")]);

        let jobs: Vec<(&Template, &TransactionBatch)> =
            vec![(&premium, &premium_batch), (&premium, &other_batch)];
        let journals = engine().expand_all(&jobs, period()).unwrap();

        assert_eq!(journals.len(), 2);
        assert_eq!(journals[0].headers[0].je_number, "JE-202601-1");
        assert_eq!(journals[1].headers[0].je_number, "JE-202601-2");
        assert_ne!(journals[0].run_id, journals[1].run_id);
    }

    #[test]
    fn test_expand_all_surfaces_a_failing_job() {
        let premium = premium_template();
        let mut broken = premium_template();
        broken.lines[0].amount_expr = ":nope".to_string();

        let good_batch = TransactionBatch::from_records(vec![premium_record(1, "AGENCY")]);
        let bad_batch = TransactionBatch::from_records(vec![premium_record(2, "AGENCY")]);

        let jobs: Vec<(&Template, &TransactionBatch)> =
            vec![(&premium, &good_batch), (&broken, &bad_batch)];
        assert!(matches!(
            engine().expand_all(&jobs, period()),
            Err(ExpansionError::LineExpression { .. })
        ));
    }

    #[test]
    fn test_require_balanced_false_skips_the_check() {
        let mut template = premium_template();
        template.control.require_balanced = false;
        let mut lopsided = premium_record(1, "INBRANCH");
        lopsided.gross_amount = dec!(999);
        let batch = TransactionBatch::from_records(vec![lopsided]);

        let journal = engine().expand(&template, &batch, period()).unwrap();
        assert_ne!(journal.debit_total(), journal.credit_total());
    }
}
