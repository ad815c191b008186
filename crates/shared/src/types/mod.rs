//! Common types used across the application.

pub mod period;
pub mod run;

pub use period::{Period, PeriodError};
pub use run::RunId;
