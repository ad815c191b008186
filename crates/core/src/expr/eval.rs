//! Typed expression form and columnar evaluation.
//!
//! Type checking lowers the parser's untyped tree into these typed nodes, so
//! evaluation never has to re-check operand types. The only runtime failure
//! left is division by zero.

use rust_decimal::{Decimal, RoundingStrategy};

use super::ast::{CmpOp, NumOp, ValueType};
use super::error::ExprError;
use crate::batch::TransactionBatch;

/// Scalar-or-column value produced while evaluating.
///
/// Scalars stay scalar until an operation pairs them with a column, so a
/// constant subexpression costs one value no matter how large the batch is.
#[derive(Debug)]
pub(super) enum Vals<T> {
    Scalar(T),
    Col(Vec<T>),
}

impl<T: Clone> Vals<T> {
    /// Expands to one value per batch row.
    pub(super) fn materialize(self, rows: usize) -> Vec<T> {
        match self {
            Self::Scalar(value) => vec![value; rows],
            Self::Col(values) => values,
        }
    }
}

/// Applies `f` to every value, preserving the scalar/column shape.
fn map_values<T, R>(vals: Vals<T>, f: impl Fn(T) -> R) -> Vals<R> {
    match vals {
        Vals::Scalar(value) => Vals::Scalar(f(value)),
        Vals::Col(values) => Vals::Col(values.into_iter().map(f).collect()),
    }
}

/// Applies `f` pairwise with scalar broadcast.
///
/// The row index passed to `f` is 0 for the scalar/scalar case and the batch
/// row otherwise.
fn zip<T, U, R>(
    left: Vals<T>,
    right: Vals<U>,
    f: impl Fn(usize, &T, &U) -> Result<R, ExprError>,
) -> Result<Vals<R>, ExprError> {
    match (left, right) {
        (Vals::Scalar(a), Vals::Scalar(b)) => Ok(Vals::Scalar(f(0, &a, &b)?)),
        (Vals::Scalar(a), Vals::Col(bs)) => bs
            .iter()
            .enumerate()
            .map(|(row, b)| f(row, &a, b))
            .collect::<Result<Vec<_>, _>>()
            .map(Vals::Col),
        (Vals::Col(xs), Vals::Scalar(b)) => xs
            .iter()
            .enumerate()
            .map(|(row, a)| f(row, a, &b))
            .collect::<Result<Vec<_>, _>>()
            .map(Vals::Col),
        (Vals::Col(xs), Vals::Col(ys)) => xs
            .iter()
            .zip(&ys)
            .enumerate()
            .map(|(row, (a, b))| f(row, a, b))
            .collect::<Result<Vec<_>, _>>()
            .map(Vals::Col),
    }
}

fn text_column<'a>(batch: &'a TransactionBatch, name: &str) -> Result<&'a [String], ExprError> {
    batch.text_column(name).ok_or_else(|| ExprError::MissingColumn {
        name: name.to_string(),
        ty: ValueType::Text,
    })
}

fn date_column<'a>(
    batch: &'a TransactionBatch,
    name: &str,
) -> Result<&'a [chrono::NaiveDate], ExprError> {
    batch.date_column(name).ok_or_else(|| ExprError::MissingColumn {
        name: name.to_string(),
        ty: ValueType::Date,
    })
}

/// Numeric expression, fully type-checked.
#[derive(Debug, Clone, PartialEq)]
pub(super) enum NumExpr {
    Const(Decimal),
    Field(String),
    Neg(Box<NumExpr>),
    Bin(NumOp, Box<NumExpr>, Box<NumExpr>),
    Abs(Box<NumExpr>),
    Min(Box<NumExpr>, Box<NumExpr>),
    Max(Box<NumExpr>, Box<NumExpr>),
    Round(Box<NumExpr>, u32),
}

impl NumExpr {
    pub(super) fn eval(&self, batch: &TransactionBatch) -> Result<Vals<Decimal>, ExprError> {
        match self {
            Self::Const(value) => Ok(Vals::Scalar(*value)),
            Self::Field(name) => batch
                .number_column(name)
                .map(|col| Vals::Col(col.to_vec()))
                .ok_or_else(|| ExprError::MissingColumn {
                    name: name.clone(),
                    ty: ValueType::Number,
                }),
            Self::Neg(inner) => Ok(map_values(inner.eval(batch)?, |v| -v)),
            Self::Bin(op, left, right) => {
                let left = left.eval(batch)?;
                let right = right.eval(batch)?;
                match op {
                    NumOp::Add => zip(left, right, |_, a, b| Ok(*a + *b)),
                    NumOp::Sub => zip(left, right, |_, a, b| Ok(*a - *b)),
                    NumOp::Mul => zip(left, right, |_, a, b| Ok(*a * *b)),
                    NumOp::Div => zip(left, right, |row, a, b| {
                        if b.is_zero() {
                            Err(ExprError::DivisionByZero { row })
                        } else {
                            Ok(*a / *b)
                        }
                    }),
                }
            }
            Self::Abs(inner) => Ok(map_values(inner.eval(batch)?, |v| v.abs())),
            Self::Min(left, right) => zip(left.eval(batch)?, right.eval(batch)?, |_, a, b| {
                Ok((*a).min(*b))
            }),
            Self::Max(left, right) => zip(left.eval(batch)?, right.eval(batch)?, |_, a, b| {
                Ok((*a).max(*b))
            }),
            Self::Round(inner, places) => Ok(map_values(inner.eval(batch)?, |v| {
                v.round_dp_with_strategy(*places, RoundingStrategy::MidpointNearestEven)
            })),
        }
    }
}

/// Text expression: a bare literal or a text field.
#[derive(Debug, Clone, PartialEq)]
pub(super) enum TextExpr {
    Const(String),
    Field(String),
}

/// Date expression. The grammar has no date literals, so only fields occur.
#[derive(Debug, Clone, PartialEq)]
pub(super) enum DateExpr {
    Field(String),
}

/// Boolean expression: one comparison over same-typed operands.
///
/// Conditions with multiple clauses are separate rows in the template's
/// condition table and get AND-combined by the expansion engine.
#[derive(Debug, Clone, PartialEq)]
pub(super) enum BoolExpr {
    CmpNum(CmpOp, NumExpr, NumExpr),
    CmpText(CmpOp, TextExpr, TextExpr),
    CmpDate(CmpOp, DateExpr, DateExpr),
}

impl BoolExpr {
    pub(super) fn eval(&self, batch: &TransactionBatch) -> Result<Vals<bool>, ExprError> {
        match self {
            Self::CmpNum(op, left, right) => {
                zip(left.eval(batch)?, right.eval(batch)?, |_, a, b| {
                    Ok(op.apply(a.cmp(b)))
                })
            }
            Self::CmpText(op, left, right) => eval_text_cmp(*op, left, right, batch),
            Self::CmpDate(op, DateExpr::Field(left), DateExpr::Field(right)) => {
                let lhs = date_column(batch, left)?;
                let rhs = date_column(batch, right)?;
                Ok(Vals::Col(
                    lhs.iter()
                        .zip(rhs)
                        .map(|(a, b)| op.apply(a.cmp(b)))
                        .collect(),
                ))
            }
        }
    }
}

fn eval_text_cmp(
    op: CmpOp,
    left: &TextExpr,
    right: &TextExpr,
    batch: &TransactionBatch,
) -> Result<Vals<bool>, ExprError> {
    // Text only admits eq/ne, so swapping operands never changes the result.
    match (left, right) {
        (TextExpr::Const(a), TextExpr::Const(b)) => Ok(Vals::Scalar(op.apply(a.cmp(b)))),
        (TextExpr::Field(field), TextExpr::Const(literal))
        | (TextExpr::Const(literal), TextExpr::Field(field)) => {
            let col = text_column(batch, field)?;
            Ok(Vals::Col(
                col.iter()
                    .map(|value| op.apply(value.as_str().cmp(literal.as_str())))
                    .collect(),
            ))
        }
        (TextExpr::Field(a), TextExpr::Field(b)) => {
            let lhs = text_column(batch, a)?;
            let rhs = text_column(batch, b)?;
            Ok(Vals::Col(
                lhs.iter()
                    .zip(rhs)
                    .map(|(x, y)| op.apply(x.cmp(y)))
                    .collect(),
            ))
        }
    }
}
