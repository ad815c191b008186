//! Expression compilation and evaluation errors.

use thiserror::Error;

use super::ast::ValueType;

/// Errors from compiling or evaluating a template expression.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExprError {
    // ========== Safety Errors ==========
    /// Expression contains a character outside the allowed alphabet.
    #[error("illegal character {ch:?} at position {position} in expression {expr:?}")]
    IllegalCharacter {
        /// The full rejected expression.
        expr: String,
        /// The offending character.
        ch: char,
        /// Zero-based character position of the offending character.
        position: usize,
    },

    // ========== Compile Errors ==========
    /// Expression references a field missing from the transaction schema.
    #[error("unknown field :{name}")]
    UnknownField {
        /// The referenced field name, without the sigil.
        name: String,
    },

    /// Call to a function that does not exist.
    #[error("unknown function {name:?}")]
    UnknownFunction {
        /// The unrecognized function name.
        name: String,
    },

    /// Function called with the wrong number of arguments.
    #[error("{function} expects {expected} argument(s), found {found}")]
    WrongArity {
        /// The function name.
        function: String,
        /// Number of arguments the function takes.
        expected: usize,
        /// Number of arguments supplied.
        found: usize,
    },

    /// Expression text does not parse.
    #[error("parse error: {message}")]
    Parse {
        /// What the parser was unable to accept.
        message: String,
    },

    /// Subexpression has the wrong type for its position.
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        /// The type required by the surrounding context.
        expected: ValueType,
        /// The type the subexpression actually has.
        found: ValueType,
    },

    /// Ordering comparison applied to values without a defined order.
    #[error("ordering comparison is not defined for {ty} values")]
    Unordered {
        /// The offending operand type.
        ty: ValueType,
    },

    /// `round` called with a non-literal or out-of-range precision.
    #[error("round precision must be an integer literal between 0 and 28")]
    InvalidPrecision,

    // ========== Evaluation Errors ==========
    /// Division by zero during evaluation. Fails the whole batch.
    #[error("division by zero at row {row}")]
    DivisionByZero {
        /// First batch row on which the divisor was zero.
        row: usize,
    },

    /// Evaluated against a batch whose columns do not match the compile-time schema.
    #[error("batch has no {ty} column named {name:?}")]
    MissingColumn {
        /// The missing column's name.
        name: String,
        /// The column type the compiled expression expects.
        ty: ValueType,
    },
}
