//! Property-based tests for the expression language.

use proptest::prelude::*;
use rust_decimal::{Decimal, RoundingStrategy};

use super::compile::{compile_amount, compile_condition, FieldSchema};
use super::error::ExprError;
use crate::batch::{TransactionBatch, TransactionRecord};
use chrono::NaiveDate;

fn schema() -> FieldSchema {
    TransactionBatch::schema()
}

fn record_with_gross(rowid: i64, gross: Decimal) -> TransactionRecord {
    TransactionRecord {
        source_rowid: rowid,
        txn_type: "PREMIUM_RECEIPT".to_string(),
        policy_no: format!("POL-{rowid:08}"),
        product_code: "LIFE01".to_string(),
        channel: "AGENCY".to_string(),
        currency: "IDR".to_string(),
        value_date: NaiveDate::from_ymd_opt(2026, 1, 15).unwrap(),
        gross_amount: gross,
        tabarru_amount: Decimal::ZERO,
        tanahud_amount: Decimal::ZERO,
        invest_amount: Decimal::ZERO,
        ujroh_amount: Decimal::ZERO,
        admin_amount: Decimal::ZERO,
    }
}

fn batch_of(grosses: &[Decimal]) -> TransactionBatch {
    TransactionBatch::from_records(
        grosses
            .iter()
            .enumerate()
            .map(|(i, gross)| record_with_gross(i64::try_from(i).unwrap() + 1, *gross))
            .collect(),
    )
}

/// Strategy for a character outside the expression alphabet.
fn disallowed_char() -> impl Strategy<Value = char> {
    any::<char>().prop_filter("character is inside the allowed alphabet", |ch| {
        !(ch.is_ascii_digit()
            || ch.is_ascii_alphabetic()
            || ch.is_ascii_whitespace()
            || matches!(ch, '.' | '+' | '-' | '*' | '/' | '(' | ')' | ',' | ':' | '_'))
    })
}

/// Strategy for a small two-decimal amount.
fn small_amount() -> impl Strategy<Value = Decimal> {
    (-1_000_000i64..1_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Any expression containing a character outside the allowlist is
    /// rejected before parsing, wherever the character sits.
    #[test]
    fn prop_disallowed_character_never_compiles(
        ch in disallowed_char(),
        position in 0usize..=20,
    ) {
        let base = ":gross_amount + 12.5";
        let at = position.min(base.chars().count());
        let expr: String = base
            .chars()
            .take(at)
            .chain(std::iter::once(ch))
            .chain(base.chars().skip(at))
            .collect();

        let result = compile_amount(&expr, &schema());
        prop_assert!(
            matches!(result, Err(ExprError::IllegalCharacter { .. })),
            "expected an alphabet rejection for {expr:?}, got {result:?}"
        );
    }

    /// Formatted arithmetic evaluates exactly like direct decimal
    /// arithmetic, with multiplication binding tighter than addition.
    #[test]
    fn prop_arithmetic_matches_decimal_arithmetic(
        a in small_amount(),
        b in small_amount(),
        c in small_amount(),
    ) {
        let source = format!("{a} + {b} * {c}");
        let compiled = compile_amount(&source, &schema()).unwrap();
        let amounts = compiled.eval(&batch_of(&[Decimal::ONE])).unwrap();
        prop_assert_eq!(amounts, vec![a + b * c]);
    }

    /// A constant expression broadcasts the same value to every row.
    #[test]
    fn prop_constants_broadcast(value in small_amount(), rows in 1usize..50) {
        let source = format!("{value}");
        let compiled = compile_amount(&source, &schema()).unwrap();
        let grosses = vec![Decimal::ONE; rows];
        let amounts = compiled.eval(&batch_of(&grosses)).unwrap();
        prop_assert_eq!(amounts, vec![value; rows]);
    }

    /// `round` agrees with banker's rounding for every value and precision.
    #[test]
    fn prop_round_is_half_even(
        thousandths in -10_000_000i64..10_000_000i64,
        places in 0u32..4,
    ) {
        let value = Decimal::new(thousandths, 3);
        let source = format!("round({value}, {places})");
        let compiled = compile_amount(&source, &schema()).unwrap();
        let amounts = compiled.eval(&batch_of(&[Decimal::ONE])).unwrap();
        let expected = value.round_dp_with_strategy(places, RoundingStrategy::MidpointNearestEven);
        prop_assert_eq!(amounts, vec![expected]);
    }

    /// Condition masks agree with comparing the column directly.
    #[test]
    fn prop_ge_mask_matches_direct_comparison(
        threshold in small_amount(),
        grosses in proptest::collection::vec(small_amount(), 0..30),
    ) {
        let source = format!("ge(:gross_amount, {threshold})");
        let compiled = compile_condition(&source, &schema()).unwrap();
        let mask = compiled.eval(&batch_of(&grosses)).unwrap();
        let expected: Vec<bool> = grosses.iter().map(|g| *g >= threshold).collect();
        prop_assert_eq!(mask, expected);
    }
}
