//! Safe arithmetic expression language for posting templates.
//!
//! Template lines carry amount and condition expressions as text. This module
//! compiles that text into a typed AST and evaluates it column-wise against a
//! whole transaction batch:
//!
//! - A character allowlist rejects anything outside digits, `. + - * / ( ) , :`,
//!   underscores, ASCII letters and whitespace before tokenization starts.
//! - Field references are written with a `:` sigil (`:gross_amount`) and are
//!   checked against the batch schema at compile time.
//! - Bare identifiers are string literals, so conditions can compare a field
//!   against a code (`eq(:channel, AGENCY)`) without quote characters.
//! - Functions: `abs`, `min`, `max`, `round` (banker's rounding), and the
//!   comparison operators `eq`, `ne`, `lt`, `le`, `gt`, `ge`.
//!
//! Compilation catches unknown fields, unknown functions, arity and type
//! errors; evaluation can only fail on division by zero.

mod ast;
mod compile;
mod error;
mod eval;
mod lexer;
mod parser;

#[cfg(test)]
mod props;

pub use ast::ValueType;
pub use compile::{compile_amount, compile_condition, CompiledAmount, CompiledCondition, FieldSchema};
pub use error::ExprError;
