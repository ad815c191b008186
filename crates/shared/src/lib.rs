//! Shared types and configuration for Saldo.
//!
//! This crate provides common types used across all other crates:
//! - Accounting periods for the monthly posting cycle
//! - Run identifiers tying staged and posted rows to one expansion
//! - Configuration management

pub mod config;
pub mod types;

pub use config::{AppConfig, DatabaseConfig, PipelineConfig};
pub use types::period::{Period, PeriodError};
pub use types::run::RunId;
