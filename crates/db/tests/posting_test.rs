//! Integration tests for staging, posting, and balance snapshots.
//!
//! These tests need a migrated Postgres database. They are skipped when no
//! DATABASE_URL (or SALDO__DATABASE__URL) is set, so the unit suite stays
//! runnable without infrastructure.

use std::env;

use chrono::{Days, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{ActiveModelTrait, Database, DatabaseConnection, EntityTrait, NotSet, Set};
use uuid::Uuid;

use saldo_core::journal::{ExpandedJournal, ExpansionEngine};
use saldo_db::entities::{
    journal_template_controls, journal_template_lines, journal_template_matches,
    journal_templates, txn_source,
};
use saldo_db::repositories::{
    BalanceRepository, LedgerRepository, PostOutcome, PostingError, StagingRepository,
    TemplateRepository, TxnSourceRepository,
};
use saldo_shared::Period;

async fn connect() -> Option<DatabaseConnection> {
    let url = env::var("DATABASE_URL")
        .or_else(|_| env::var("SALDO__DATABASE__URL"))
        .ok()?;
    Some(
        Database::connect(&url)
            .await
            .expect("Failed to connect to database"),
    )
}

fn unique(prefix: &str) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{prefix}-{}", &suffix[..8].to_uppercase())
}

/// A far-future month unlikely to collide with other test runs, so period
/// scoped assertions (line counts, snapshots) see only this test's rows.
fn scratch_period() -> Period {
    let entropy = Uuid::new_v4().as_u128();
    let year = 2200 + i32::try_from(entropy % 1500).expect("year fits");
    let month = u32::try_from(entropy / 1500 % 12).expect("month fits") + 1;
    Period::new(year, month).expect("valid scratch period")
}

/// Seeds a three-line contribution split template under a unique code and
/// transaction type: DR gross against CR tabarru and CR admin.
async fn seed_split_template(db: &DatabaseConnection, code: &str, txn_type: &str) {
    journal_templates::ActiveModel {
        template_code: Set(code.to_string()),
        template_version: Set(1),
        txn_type: Set(txn_type.to_string()),
        je_type: Set("PREMIUM".to_string()),
        description: Set(None),
        status: Set("ACTIVE".to_string()),
        effective_date: Set(chrono::NaiveDate::from_ymd_opt(2025, 1, 1).expect("valid date")),
        expiry_date: Set(None),
        created_at: Set(Utc::now().into()),
        updated_at: Set(Utc::now().into()),
    }
    .insert(db)
    .await
    .expect("Failed to insert template header");

    journal_template_matches::ActiveModel {
        match_id: NotSet,
        template_code: Set(code.to_string()),
        template_version: Set(1),
        product_code: Set(None),
        channel: Set(None),
        priority: Set(100),
        created_at: Set(Utc::now().into()),
    }
    .insert(db)
    .await
    .expect("Failed to insert template match");

    let line = |line_no: i32, side: &str, account: &str, fund: &str, expr: &str| {
        journal_template_lines::ActiveModel {
            template_code: Set(code.to_string()),
            template_version: Set(1),
            line_no: Set(line_no),
            side: Set(side.to_string()),
            account_code: Set(account.to_string()),
            fund_code: Set(fund.to_string()),
            amount_expr: Set(expr.to_string()),
            amount_round: Set(2),
            is_active: Set(true),
            created_at: Set(Utc::now().into()),
        }
    };
    journal_template_lines::Entity::insert_many(vec![
        line(1, "DR", "1101", "GENERAL", ":gross_amount"),
        line(2, "CR", "3101", "TABARRU", ":tabarru_amount"),
        line(3, "CR", "4101", "OPERATOR", ":admin_amount"),
    ])
    .exec_without_returning(db)
    .await
    .expect("Failed to insert template lines");

    journal_template_controls::ActiveModel {
        template_code: Set(code.to_string()),
        template_version: Set(1),
        require_balanced: Set(true),
        tolerance_amount: Set(dec!(0.01)),
        balancing_mode: Set("ERROR".to_string()),
        balancing_account: Set(None),
        balancing_fund: Set(None),
        created_at: Set(Utc::now().into()),
    }
    .insert(db)
    .await
    .expect("Failed to insert template control");
}

async fn insert_txn(
    db: &DatabaseConnection,
    period: Period,
    txn_type: &str,
    gross: Decimal,
    tabarru: Decimal,
    admin: Decimal,
) {
    let value_date = period
        .start()
        .checked_add_days(Days::new(5))
        .expect("value date inside month");
    txn_source::ActiveModel {
        source_rowid: NotSet,
        txn_month: Set(period.start()),
        txn_type: Set(txn_type.to_string()),
        policy_no: Set("POL-000001".to_string()),
        product_code: Set("LIFE01".to_string()),
        channel: Set("INBRANCH".to_string()),
        currency: Set("IDR".to_string()),
        value_date: Set(value_date),
        gross_amount: Set(gross),
        tabarru_amount: Set(tabarru),
        tanahud_amount: Set(Decimal::ZERO),
        invest_amount: Set(Decimal::ZERO),
        ujroh_amount: Set(Decimal::ZERO),
        admin_amount: Set(admin),
        created_at: Set(Utc::now().into()),
    }
    .insert(db)
    .await
    .expect("Failed to insert transaction");
}

/// Seeds a template plus two transactions and expands them into a journal
/// ready for staging and posting.
async fn expanded_fixture(db: &DatabaseConnection, period: Period) -> ExpandedJournal {
    let code = unique("TPL");
    let txn_type = unique("TT");
    seed_split_template(db, &code, &txn_type).await;

    let sources = TxnSourceRepository::new(db.clone());
    sources
        .ensure_partition(period)
        .await
        .expect("Failed to provision partition");
    insert_txn(db, period, &txn_type, dec!(100), dec!(60), dec!(40)).await;
    insert_txn(db, period, &txn_type, dec!(250), dec!(150), dec!(100)).await;

    let batch = sources
        .load_period(period)
        .await
        .expect("Failed to load batch");
    let template = TemplateRepository::new(db.clone())
        .resolve(&txn_type, "LIFE01", "INBRANCH", period.start())
        .await
        .expect("Failed to resolve template");

    ExpansionEngine::new("integration-test")
        .expand(&template, &batch, period)
        .expect("Failed to expand journal")
}

// ============================================================================
// Test: posting writes headers and lines and flips staging markers
// ============================================================================
#[tokio::test]
async fn test_post_writes_headers_and_lines() {
    let Some(db) = connect().await else { return };

    let period = scratch_period();
    let journal = expanded_fixture(&db, period).await;

    let staging = StagingRepository::new(db.clone(), 100);
    let counts = staging.stage(&journal).await.expect("Failed to stage");
    assert_eq!(counts.headers, 2);
    assert_eq!(counts.lines, 6);
    assert_eq!(
        staging
            .unposted_headers(journal.run_id)
            .await
            .expect("staging query failed")
            .len(),
        2
    );

    let ledger = LedgerRepository::new(db.clone(), 100);
    let outcome = ledger.post(&journal).await.expect("Failed to post");
    assert_eq!(
        outcome,
        PostOutcome::Posted {
            headers: 2,
            lines: 6
        }
    );

    assert_eq!(
        ledger
            .headers_for_run(journal.run_id)
            .await
            .expect("ledger query failed")
            .len(),
        2
    );
    assert_eq!(
        ledger
            .line_count_for_period(period)
            .await
            .expect("ledger query failed"),
        6
    );
    assert!(
        staging
            .run_posted(journal.run_id)
            .await
            .expect("staging query failed"),
        "staging markers flip with the post"
    );
    assert!(
        staging
            .unposted_headers(journal.run_id)
            .await
            .expect("staging query failed")
            .is_empty()
    );
}

// ============================================================================
// Test: re-posting the same run id is a no-op
// ============================================================================
#[tokio::test]
async fn test_reposting_same_run_is_noop() {
    let Some(db) = connect().await else { return };

    let period = scratch_period();
    let journal = expanded_fixture(&db, period).await;

    let staging = StagingRepository::new(db.clone(), 100);
    staging.stage(&journal).await.expect("Failed to stage");

    let ledger = LedgerRepository::new(db.clone(), 100);
    ledger.post(&journal).await.expect("Failed to post");
    let second = ledger.post(&journal).await.expect("Repost should not fail");
    assert_eq!(second, PostOutcome::AlreadyPosted);

    assert_eq!(
        ledger
            .line_count_for_period(period)
            .await
            .expect("ledger query failed"),
        6,
        "no additional lines were written"
    );
}

// ============================================================================
// Test: a second expansion of the same journals cannot double-post
// ============================================================================
#[tokio::test]
async fn test_duplicate_journal_identity_rejected() {
    let Some(db) = connect().await else { return };

    let period = scratch_period();
    let journal = expanded_fixture(&db, period).await;

    let staging = StagingRepository::new(db.clone(), 100);
    let ledger = LedgerRepository::new(db.clone(), 100);
    staging.stage(&journal).await.expect("Failed to stage");
    ledger.post(&journal).await.expect("Failed to post");

    // A rerun of the same period mints a new run id but the same journal
    // numbers; the identity constraint must reject the duplicate insert.
    let sources = TxnSourceRepository::new(db.clone());
    let batch = sources
        .load_period(period)
        .await
        .expect("Failed to load batch");
    let txn_type = batch.txn_types()[0].clone();
    let template = TemplateRepository::new(db.clone())
        .resolve(&txn_type, "LIFE01", "INBRANCH", period.start())
        .await
        .expect("Failed to resolve template");
    let rerun = ExpansionEngine::new("integration-test")
        .expand(&template, &batch, period)
        .expect("Failed to expand journal");
    assert_ne!(rerun.run_id, journal.run_id);

    staging.stage(&rerun).await.expect("Failed to stage rerun");
    let err = ledger
        .post(&rerun)
        .await
        .expect_err("duplicate identity must be rejected");
    assert!(matches!(err, PostingError::Database(_)));

    assert_eq!(
        ledger
            .line_count_for_period(period)
            .await
            .expect("ledger query failed"),
        6,
        "the failed post rolled back in full"
    );
    assert!(
        !staging
            .run_posted(rerun.run_id)
            .await
            .expect("staging query failed"),
        "the rerun staging rows stay unposted"
    );
}

// ============================================================================
// Test: snapshots aggregate by account and fund, and re-running upserts
// ============================================================================
#[tokio::test]
async fn test_snapshot_aggregates_by_account_and_fund() {
    let Some(db) = connect().await else { return };

    let period = scratch_period();
    let journal = expanded_fixture(&db, period).await;

    let staging = StagingRepository::new(db.clone(), 100);
    let ledger = LedgerRepository::new(db.clone(), 100);
    staging.stage(&journal).await.expect("Failed to stage");
    ledger.post(&journal).await.expect("Failed to post");

    let balances = BalanceRepository::new(db.clone());
    let written = balances
        .snapshot_period(period)
        .await
        .expect("Failed to snapshot");
    assert_eq!(written, 3, "one row per (account, fund) pair");

    let rows = balances
        .snapshots_for(period)
        .await
        .expect("Failed to read snapshots");
    assert_eq!(rows.len(), 3);

    let general = rows
        .iter()
        .find(|r| r.account_code == "1101" && r.fund == "GENERAL")
        .expect("general account snapshot");
    assert_eq!(general.debit, dec!(350));
    assert_eq!(general.credit, dec!(0));
    assert_eq!(general.closing_balance, dec!(350));

    let total_closing: Decimal = rows.iter().map(|r| r.closing_balance).sum();
    assert_eq!(total_closing, Decimal::ZERO, "debits equal credits");

    // Idempotent rerun: same aggregates, refreshed timestamp.
    let rewritten = balances
        .snapshot_period(period)
        .await
        .expect("Failed to re-snapshot");
    assert_eq!(rewritten, 3);
    let rows_after = balances
        .snapshots_for(period)
        .await
        .expect("Failed to re-read snapshots");
    assert_eq!(rows_after.len(), 3);
    let general_after = rows_after
        .iter()
        .find(|r| r.account_code == "1101" && r.fund == "GENERAL")
        .expect("general account snapshot");
    assert_eq!(general_after.debit, dec!(350));
}

// ============================================================================
// Test: partition provisioning is idempotent
// ============================================================================
#[tokio::test]
async fn test_partition_provisioning_is_idempotent() {
    let Some(db) = connect().await else { return };

    let period = scratch_period();
    let sources = TxnSourceRepository::new(db.clone());
    sources
        .ensure_partition(period)
        .await
        .expect("first provisioning failed");
    sources
        .ensure_partition(period)
        .await
        .expect("repeat provisioning failed");

    let txn_type = unique("TT");
    insert_txn(&db, period, &txn_type, dec!(10), dec!(6), dec!(4)).await;
    assert_eq!(
        sources
            .count_period(period)
            .await
            .expect("count query failed"),
        1
    );
}
