//! Property-based tests for the journal expansion engine.
//!
//! The engine promises all-or-nothing batches, deterministic journal
//! numbers, zero-line suppression, and balance enforcement after rounding.
//! These properties pin each of those promises across generated batches.

use chrono::NaiveDate;
use proptest::collection::vec;
use proptest::prelude::*;
use rust_decimal::Decimal;

use saldo_shared::Period;

use super::error::ExpansionError;
use super::expand::ExpansionEngine;
use crate::batch::{TransactionBatch, TransactionRecord};
use crate::template::{Side, Template, TemplateControl, TemplateLine};

/// Strategy for one amount component in cents, zero included.
fn component_cents() -> impl Strategy<Value = i64> {
    0i64..10_000_000i64
}

/// Strategy for a distribution channel.
fn channel_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("AGENCY".to_string()),
        Just("INBRANCH".to_string()),
        Just("DIGITAL".to_string()),
    ]
}

/// Strategy for the five split components of one transaction.
fn components_strategy() -> impl Strategy<Value = (i64, i64, i64, i64, i64)> {
    (
        component_cents(),
        component_cents(),
        component_cents(),
        component_cents(),
        component_cents(),
    )
}

/// Builds a premium receipt whose gross equals the sum of its components.
fn make_record(
    rowid: i64,
    channel: String,
    (tabarru, tanahud, invest, ujroh, admin): (i64, i64, i64, i64, i64),
) -> TransactionRecord {
    let gross = tabarru + tanahud + invest + ujroh + admin;
    TransactionRecord {
        source_rowid: rowid,
        txn_type: "PREMIUM_RECEIPT".to_string(),
        policy_no: format!("POL-{rowid:08}"),
        product_code: "LIFE01".to_string(),
        channel,
        currency: "IDR".to_string(),
        value_date: NaiveDate::from_ymd_opt(2026, 1, 15).unwrap(),
        gross_amount: Decimal::new(gross, 2),
        tabarru_amount: Decimal::new(tabarru, 2),
        tanahud_amount: Decimal::new(tanahud, 2),
        invest_amount: Decimal::new(invest, 2),
        ujroh_amount: Decimal::new(ujroh, 2),
        admin_amount: Decimal::new(admin, 2),
    }
}

fn make_line(line_no: i32, side: Side, account: &str, fund: &str, expr: &str) -> TemplateLine {
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

/// Premium split template: cash debit against the five component credits.
fn split_template() -> Template {
    Template {
        code: "TPL-PREMIUM".to_string(),
        version: 1,
        txn_type: "PREMIUM_RECEIPT".to_string(),
        je_type: "PREMIUM".to_string(),
        description: None,
        lines: vec![
            make_line(1, Side::Debit, "1101", "GENERAL", ":gross_amount"),
            make_line(2, Side::Credit, "3101", "TABARRU", ":tabarru_amount"),
            make_line(3, Side::Credit, "3201", "TANAHUD", ":tanahud_amount"),
            make_line(4, Side::Credit, "3301", "INVEST", ":invest_amount"),
            make_line(5, Side::Credit, "4101", "OPERATOR", ":ujroh_amount"),
            make_line(6, Side::Credit, "4102", "OPERATOR", ":admin_amount"),
        ],
        control: TemplateControl::default(),
    }
}

fn make_batch(rows: Vec<(String, (i64, i64, i64, i64, i64))>) -> TransactionBatch {
    let records = rows
        .into_iter()
        .enumerate()
        .map(|(index, (channel, components))| {
            make_record(i64::try_from(index).unwrap() + 1, channel, components)
        })
        .collect();
    TransactionBatch::from_records(records)
}

fn period() -> Period {
    Period::new(2026, 1).unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// *For any* batch whose gross equals the component sum, expansion
    /// succeeds and every journal balances exactly.
    #[test]
    fn prop_component_split_always_balances(
        rows in vec((channel_strategy(), components_strategy()), 1..20),
    ) {
        let batch = make_batch(rows);
        let engine = ExpansionEngine::new("props");

        let journal = engine.expand(&split_template(), &batch, period());
        prop_assert!(journal.is_ok(), "balanced batch rejected: {:?}", journal);

        let journal = journal.unwrap();
        prop_assert_eq!(journal.debit_total(), journal.credit_total());
    }

    /// *For any* batch, expansion emits exactly one header per row with
    /// the deterministic journal number for that row.
    #[test]
    fn prop_headers_cover_every_row(
        rows in vec((channel_strategy(), components_strategy()), 1..20),
    ) {
        let count = rows.len();
        let batch = make_batch(rows);
        let engine = ExpansionEngine::new("props");

        let journal = engine.expand(&split_template(), &batch, period()).unwrap();
        prop_assert_eq!(journal.headers.len(), count);
        for (index, header) in journal.headers.iter().enumerate() {
            let expected = format!("JE-202601-{}", index + 1);
            prop_assert_eq!(&header.je_number, &expected);
        }
    }

    /// *For any* batch, no emitted line carries a zero amount.
    #[test]
    fn prop_zero_lines_never_emitted(
        rows in vec((channel_strategy(), components_strategy()), 1..20),
    ) {
        let batch = make_batch(rows);
        let engine = ExpansionEngine::new("props");

        let journal = engine.expand(&split_template(), &batch, period()).unwrap();
        prop_assert!(journal.lines.iter().all(|line| !line.amount.is_zero()));
    }

    /// *For any* batch, two expansions produce identical headers and
    /// lines; only the run id differs.
    #[test]
    fn prop_expansion_is_deterministic_modulo_run_id(
        rows in vec((channel_strategy(), components_strategy()), 1..10),
    ) {
        let batch = make_batch(rows);
        let engine = ExpansionEngine::new("props");
        let template = split_template();

        let first = engine.expand(&template, &batch, period()).unwrap();
        let second = engine.expand(&template, &batch, period()).unwrap();

        prop_assert_ne!(first.run_id, second.run_id);
        prop_assert_eq!(first.headers, second.headers);
        prop_assert_eq!(first.lines, second.lines);
    }

    /// *For any* batch with one row pushed beyond the tolerance, the whole
    /// batch is rejected and the offending journal is named.
    #[test]
    fn prop_imbalance_beyond_tolerance_rejects_batch(
        rows in vec((channel_strategy(), components_strategy()), 1..10),
        excess_cents in 2i64..100_000i64,
        victim_seed in any::<usize>(),
    ) {
        let victim = victim_seed % rows.len();
        let mut records: Vec<TransactionRecord> = rows
            .into_iter()
            .enumerate()
            .map(|(index, (channel, components))| {
                make_record(i64::try_from(index).unwrap() + 1, channel, components)
            })
            .collect();
        records[victim].gross_amount += Decimal::new(excess_cents, 2);
        let expected_je = format!("JE-202601-{}", victim + 1);

        let batch = TransactionBatch::from_records(records);
        let engine = ExpansionEngine::new("props");

        let result = engine.expand(&split_template(), &batch, period());
        match result {
            Err(ExpansionError::Unbalanced { je_number, .. }) => {
                prop_assert_eq!(je_number, expected_je);
            }
            other => prop_assert!(false, "expected Unbalanced, got {:?}", other),
        }
    }
}
