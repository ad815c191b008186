//! Core business logic for Saldo.
//!
//! This crate contains pure business logic with ZERO web or database dependencies.
//! All domain types, the expression language, and the expansion engine live here.
//!
//! # Modules
//!
//! - `expr` - Safe arithmetic expression language for template amounts and conditions
//! - `batch` - Columnar transaction batches the evaluator runs against
//! - `template` - Posting template domain model
//! - `journal` - Journal expansion engine and balance validation

pub mod batch;
pub mod expr;
pub mod journal;
pub mod template;
