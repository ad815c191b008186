//! Saldo pipeline runner.
//!
//! Entry point for posting one accounting period end to end: load the
//! period's transactions, expand them through journal templates, post the
//! journals, and refresh balance snapshots.
//!
//! Usage:
//!   saldo <period>   - e.g. saldo 2026-01
//!
//! The period may also be supplied via the SALDO_PERIOD environment
//! variable.

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use saldo_db::{PipelineRunner, connect_with};
use saldo_shared::{AppConfig, Period};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "saldo=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = AppConfig::load().expect("Failed to load configuration");

    let period = resolve_period()?;

    // Connect to database
    let db = connect_with(&config.database).await?;
    info!("Connected to database");

    let runner = PipelineRunner::new(db, &config);
    let report = runner.run(period).await?;

    print!("{report}");

    Ok(())
}

/// Period from the first CLI argument, falling back to SALDO_PERIOD.
fn resolve_period() -> anyhow::Result<Period> {
    let raw = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("SALDO_PERIOD").ok());
    let Some(raw) = raw else {
        anyhow::bail!("Usage: saldo <period> (e.g. 2026-01), or set SALDO_PERIOD");
    };
    Ok(raw.parse::<Period>()?)
}
