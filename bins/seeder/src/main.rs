//! Database seeder for Saldo development and testing.
//!
//! Seeds the premium and claim journal templates plus one month of
//! synthetic transactions, enough to drive a full pipeline run locally.
//!
//! Usage: cargo run --bin seeder [period]

use chrono::{Days, NaiveDate, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, NotSet, Set};

use saldo_db::entities::{
    journal_template_controls, journal_template_line_conds, journal_template_lines,
    journal_template_matches, journal_templates, txn_source,
};
use saldo_db::repositories::TxnSourceRepository;
use saldo_shared::Period;

/// Fixed seed so reruns regenerate identical synthetic data.
const RNG_SEED: u64 = 42;
/// Synthetic transactions per month.
const ROWS_PER_MONTH: usize = 500;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let database_url =
        std::env::var("DATABASE_URL").expect("DATABASE_URL must be set in environment");

    let period = std::env::args()
        .nth(1)
        .map_or_else(default_period, |raw| {
            raw.parse().expect("period must look like 2026-01")
        });

    println!("Connecting to database...");
    let db = saldo_db::connect(&database_url)
        .await
        .expect("Failed to connect to database");

    println!("Seeding premium template...");
    seed_premium_template(&db).await;

    println!("Seeding claim template...");
    seed_claim_template(&db).await;

    println!("Seeding {period} transactions...");
    seed_transactions(&db, period).await;

    println!("Seeding complete!");
}

fn default_period() -> Period {
    Period::new(2026, 1).expect("valid default period")
}

fn effective_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, 1).expect("valid effective date")
}

async fn template_exists(db: &DatabaseConnection, code: &str, version: i32) -> bool {
    journal_templates::Entity::find_by_id((code.to_string(), version))
        .one(db)
        .await
        .ok()
        .flatten()
        .is_some()
}

fn template_header(
    code: &str,
    version: i32,
    txn_type: &str,
    je_type: &str,
    description: &str,
) -> journal_templates::ActiveModel {
    journal_templates::ActiveModel {
        template_code: Set(code.to_string()),
        template_version: Set(version),
        txn_type: Set(txn_type.to_string()),
        je_type: Set(je_type.to_string()),
        description: Set(Some(description.to_string())),
        status: Set("ACTIVE".to_string()),
        effective_date: Set(effective_date()),
        expiry_date: Set(None),
        created_at: Set(Utc::now().into()),
        updated_at: Set(Utc::now().into()),
    }
}

fn wildcard_match(code: &str, version: i32) -> journal_template_matches::ActiveModel {
    journal_template_matches::ActiveModel {
        match_id: NotSet,
        template_code: Set(code.to_string()),
        template_version: Set(version),
        product_code: Set(None),
        channel: Set(None),
        priority: Set(100),
        created_at: Set(Utc::now().into()),
    }
}

fn template_line(
    code: &str,
    version: i32,
    line_no: i32,
    side: &str,
    account: &str,
    fund: &str,
    expr: &str,
) -> journal_template_lines::ActiveModel {
    journal_template_lines::ActiveModel {
        template_code: Set(code.to_string()),
        template_version: Set(version),
        line_no: Set(line_no),
        side: Set(side.to_string()),
        account_code: Set(account.to_string()),
        fund_code: Set(fund.to_string()),
        amount_expr: Set(expr.to_string()),
        amount_round: Set(2),
        is_active: Set(true),
        created_at: Set(Utc::now().into()),
    }
}

fn line_condition(
    code: &str,
    version: i32,
    line_no: i32,
    name: &str,
    expr: &str,
) -> journal_template_line_conds::ActiveModel {
    journal_template_line_conds::ActiveModel {
        template_code: Set(code.to_string()),
        template_version: Set(version),
        line_no: Set(line_no),
        cond_name: Set(name.to_string()),
        cond_expr: Set(expr.to_string()),
        created_at: Set(Utc::now().into()),
    }
}

fn default_control(code: &str, version: i32) -> journal_template_controls::ActiveModel {
    journal_template_controls::ActiveModel {
        template_code: Set(code.to_string()),
        template_version: Set(version),
        require_balanced: Set(true),
        tolerance_amount: Set(Decimal::new(1, 2)),
        balancing_mode: Set("ERROR".to_string()),
        balancing_account: Set(None),
        balancing_fund: Set(None),
        created_at: Set(Utc::now().into()),
    }
}

/// Seeds the premium receipt template: gross paid in, split into fund
/// allocations and operator fees, with an extra agency commission accrual
/// pair gated on the AGENCY channel.
async fn seed_premium_template(db: &DatabaseConnection) {
    const CODE: &str = "TPL-PREMIUM";
    const VERSION: i32 = 1;

    if template_exists(db, CODE, VERSION).await {
        println!("  Premium template already exists, skipping...");
        return;
    }

    template_header(
        CODE,
        VERSION,
        "PREMIUM_RECEIPT",
        "PREMIUM",
        "Contribution receipt split across funds and operator fees",
    )
    .insert(db)
    .await
    .expect("Failed to insert premium template header");

    wildcard_match(CODE, VERSION)
        .insert(db)
        .await
        .expect("Failed to insert premium template match");

    let lines = vec![
        template_line(CODE, VERSION, 1, "DR", "1101", "GENERAL", ":gross_amount"),
        template_line(CODE, VERSION, 2, "CR", "3101", "TABARRU", ":tabarru_amount"),
        template_line(CODE, VERSION, 3, "CR", "3201", "TANAHUD", ":tanahud_amount"),
        template_line(CODE, VERSION, 4, "CR", "3301", "INVEST", ":invest_amount"),
        template_line(CODE, VERSION, 5, "CR", "4101", "OPERATOR", ":ujroh_amount"),
        template_line(CODE, VERSION, 6, "CR", "4102", "OPERATOR", ":admin_amount"),
        template_line(
            CODE,
            VERSION,
            7,
            "DR",
            "5201",
            "OPERATOR",
            ":ujroh_amount * 0.5",
        ),
        template_line(
            CODE,
            VERSION,
            8,
            "CR",
            "2301",
            "OPERATOR",
            ":ujroh_amount * 0.5",
        ),
    ];
    journal_template_lines::Entity::insert_many(lines)
        .exec_without_returning(db)
        .await
        .expect("Failed to insert premium template lines");

    let conds = vec![
        line_condition(CODE, VERSION, 7, "agency_only", "eq(:channel, AGENCY)"),
        line_condition(CODE, VERSION, 8, "agency_only", "eq(:channel, AGENCY)"),
    ];
    journal_template_line_conds::Entity::insert_many(conds)
        .exec_without_returning(db)
        .await
        .expect("Failed to insert premium template conditions");

    default_control(CODE, VERSION)
        .insert(db)
        .await
        .expect("Failed to insert premium template control");

    println!("  Created {CODE} v{VERSION}");
}

/// Seeds the claim payment template: benefit drawn from the tabarru and
/// investment funds, paid out gross with an admin fee retained.
async fn seed_claim_template(db: &DatabaseConnection) {
    const CODE: &str = "TPL-CLAIM";
    const VERSION: i32 = 1;

    if template_exists(db, CODE, VERSION).await {
        println!("  Claim template already exists, skipping...");
        return;
    }

    template_header(
        CODE,
        VERSION,
        "CLAIM_PAID",
        "CLAIM",
        "Claim benefit paid from the tabarru and investment funds",
    )
    .insert(db)
    .await
    .expect("Failed to insert claim template header");

    wildcard_match(CODE, VERSION)
        .insert(db)
        .await
        .expect("Failed to insert claim template match");

    let lines = vec![
        template_line(CODE, VERSION, 1, "DR", "6101", "TABARRU", ":tabarru_amount"),
        template_line(CODE, VERSION, 2, "DR", "6201", "INVEST", ":invest_amount"),
        template_line(CODE, VERSION, 3, "CR", "1101", "GENERAL", ":gross_amount"),
        template_line(CODE, VERSION, 4, "CR", "4102", "OPERATOR", ":admin_amount"),
    ];
    journal_template_lines::Entity::insert_many(lines)
        .exec_without_returning(db)
        .await
        .expect("Failed to insert claim template lines");

    default_control(CODE, VERSION)
        .insert(db)
        .await
        .expect("Failed to insert claim template control");

    println!("  Created {CODE} v{VERSION}");
}

/// Seeds one month of synthetic transactions, roughly four premium
/// receipts per claim payment.
async fn seed_transactions(db: &DatabaseConnection, period: Period) {
    let sources = TxnSourceRepository::new(db.clone());

    sources
        .ensure_partition(period)
        .await
        .expect("Failed to provision transaction partition");

    let existing = sources
        .count_period(period)
        .await
        .expect("Failed to count transactions");
    if existing > 0 {
        println!("  {existing} transactions already present, skipping...");
        return;
    }

    let mut rng = StdRng::seed_from_u64(RNG_SEED);
    let products = ["LIFE01", "FAM01", "INV01"];
    let channels = ["AGENCY", "INBRANCH"];
    let days = period.days();

    let mut rows = Vec::with_capacity(ROWS_PER_MONTH);
    for _ in 0..ROWS_PER_MONTH {
        let day = rng.random_range(0..days);
        let value_date = period
            .start()
            .checked_add_days(Days::new(u64::from(day)))
            .expect("value date inside month");
        let policy_no = format!("POL-{:06}", rng.random_range(1..=400u32));
        let product = products[rng.random_range(0..products.len())];
        let channel = channels[rng.random_range(0..channels.len())];

        let row = if rng.random_ratio(1, 5) {
            claim_row(period, value_date, policy_no, product, channel, &mut rng)
        } else {
            premium_row(period, value_date, policy_no, product, channel, &mut rng)
        };
        rows.push(row);
    }

    sources
        .insert_rows(rows, 500)
        .await
        .expect("Failed to insert transactions");
    println!("  Inserted {ROWS_PER_MONTH} transactions");
}

/// A premium receipt whose component amounts sum exactly to gross. Shares
/// are drawn per row from fixed percentage bands and the admin component
/// absorbs the remainder, so the split can never go negative.
fn premium_row(
    period: Period,
    value_date: NaiveDate,
    policy_no: String,
    product: &str,
    channel: &str,
    rng: &mut StdRng,
) -> txn_source::ActiveModel {
    let gross_cents = rng.random_range(10_000..250_000i64);
    let tabarru = gross_cents * rng.random_range(30..=40) / 100;
    let tanahud = gross_cents * rng.random_range(10..=20) / 100;
    let invest = gross_cents * rng.random_range(15..=25) / 100;
    let ujroh = gross_cents * rng.random_range(5..=10) / 100;
    let admin = gross_cents - tabarru - tanahud - invest - ujroh;

    txn_source::ActiveModel {
        source_rowid: NotSet,
        txn_month: Set(period.start()),
        txn_type: Set("PREMIUM_RECEIPT".to_string()),
        policy_no: Set(policy_no),
        product_code: Set(product.to_string()),
        channel: Set(channel.to_string()),
        currency: Set("IDR".to_string()),
        value_date: Set(value_date),
        gross_amount: Set(Decimal::new(gross_cents, 2)),
        tabarru_amount: Set(Decimal::new(tabarru, 2)),
        tanahud_amount: Set(Decimal::new(tanahud, 2)),
        invest_amount: Set(Decimal::new(invest, 2)),
        ujroh_amount: Set(Decimal::new(ujroh, 2)),
        admin_amount: Set(Decimal::new(admin, 2)),
        created_at: Set(Utc::now().into()),
    }
}

/// A claim payment funded from tabarru plus an investment top-up, with a
/// small admin fee withheld: gross = tabarru + invest - admin.
fn claim_row(
    period: Period,
    value_date: NaiveDate,
    policy_no: String,
    product: &str,
    channel: &str,
    rng: &mut StdRng,
) -> txn_source::ActiveModel {
    let tabarru = rng.random_range(50_000..2_000_000i64);
    let invest = rng.random_range(10_000..500_000i64);
    let admin = rng.random_range(1_000..10_000i64);
    let gross_cents = tabarru + invest - admin;

    txn_source::ActiveModel {
        source_rowid: NotSet,
        txn_month: Set(period.start()),
        txn_type: Set("CLAIM_PAID".to_string()),
        policy_no: Set(policy_no),
        product_code: Set(product.to_string()),
        channel: Set(channel.to_string()),
        currency: Set("IDR".to_string()),
        value_date: Set(value_date),
        gross_amount: Set(Decimal::new(gross_cents, 2)),
        tabarru_amount: Set(Decimal::new(tabarru, 2)),
        tanahud_amount: Set(Decimal::ZERO),
        invest_amount: Set(Decimal::new(invest, 2)),
        ujroh_amount: Set(Decimal::ZERO),
        admin_amount: Set(Decimal::new(admin, 2)),
        created_at: Set(Utc::now().into()),
    }
}
