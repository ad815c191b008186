//! Journal expansion.
//!
//! This module turns transaction batches into journal headers and lines:
//! - Deterministic journal numbering per source transaction
//! - Conditional, expression-driven template lines
//! - Per-line half-even rounding and zero suppression
//! - All-or-nothing balance enforcement per batch

pub mod error;
pub mod expand;
pub mod types;

#[cfg(test)]
mod expand_props;

pub use error::ExpansionError;
pub use expand::ExpansionEngine;
pub use types::{je_number, ExpandedJournal, JournalHeader, JournalLine};
