//! Expression compilation: parsing, schema checks, and lowering.

use std::collections::BTreeMap;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use super::ast::{CmpOp, Expr, ValueType};
use super::error::ExprError;
use super::eval::{BoolExpr, DateExpr, NumExpr, TextExpr};
use super::parser;
use crate::batch::TransactionBatch;

/// Field name to type mapping for one transaction shape.
#[derive(Debug, Clone, Default)]
pub struct FieldSchema {
    fields: BTreeMap<String, ValueType>,
}

impl FieldSchema {
    /// Creates an empty schema.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a field, replacing any previous type for the same name.
    #[must_use]
    pub fn with_field(mut self, name: &str, ty: ValueType) -> Self {
        self.fields.insert(name.to_string(), ty);
        self
    }

    /// Looks up the type of a field.
    #[must_use]
    pub fn field_type(&self, name: &str) -> Option<ValueType> {
        self.fields.get(name).copied()
    }
}

/// A compiled amount expression ready for columnar evaluation.
#[derive(Debug, Clone)]
pub struct CompiledAmount {
    source: String,
    root: NumExpr,
}

impl CompiledAmount {
    /// The original expression text.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Evaluates to one amount per batch row.
    ///
    /// # Errors
    ///
    /// Returns an error on division by zero, or if the batch does not carry
    /// the columns the expression was compiled against.
    pub fn eval(&self, batch: &TransactionBatch) -> Result<Vec<Decimal>, ExprError> {
        Ok(self.root.eval(batch)?.materialize(batch.len()))
    }
}

/// A compiled condition expression ready for columnar evaluation.
#[derive(Debug, Clone)]
pub struct CompiledCondition {
    source: String,
    root: BoolExpr,
}

impl CompiledCondition {
    /// The original expression text.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Evaluates to one mask entry per batch row.
    ///
    /// # Errors
    ///
    /// Returns an error on division by zero, or if the batch does not carry
    /// the columns the expression was compiled against.
    pub fn eval(&self, batch: &TransactionBatch) -> Result<Vec<bool>, ExprError> {
        Ok(self.root.eval(batch)?.materialize(batch.len()))
    }
}

/// Compiles an amount expression against the transaction schema.
///
/// # Errors
///
/// Returns an error when the text violates the character allowlist, does not
/// parse, references an unknown field or function, or is not numeric.
pub fn compile_amount(source: &str, schema: &FieldSchema) -> Result<CompiledAmount, ExprError> {
    let expr = parser::parse(source)?;
    let root = lower_number(&expr, schema)?;
    Ok(CompiledAmount {
        source: source.to_string(),
        root,
    })
}

/// Compiles a condition expression against the transaction schema.
///
/// A condition is one comparison call (`eq`, `ne`, `lt`, `le`, `gt`, `ge`)
/// over same-typed operands. Lines with several conditions store them as
/// separate rows; the expansion engine ANDs the masks.
///
/// # Errors
///
/// Returns an error when the text violates the character allowlist, does not
/// parse, references an unknown field or function, or is not boolean.
pub fn compile_condition(
    source: &str,
    schema: &FieldSchema,
) -> Result<CompiledCondition, ExprError> {
    let expr = parser::parse(source)?;

    if let Expr::Call { name, args } = &expr {
        if let Some(op) = comparison_op(name) {
            let root = lower_comparison(op, name, args, schema)?;
            return Ok(CompiledCondition {
                source: source.to_string(),
                root,
            });
        }
    }

    Err(ExprError::TypeMismatch {
        expected: ValueType::Bool,
        found: infer(&expr, schema)?,
    })
}

fn comparison_op(name: &str) -> Option<CmpOp> {
    match name {
        "eq" => Some(CmpOp::Eq),
        "ne" => Some(CmpOp::Ne),
        "lt" => Some(CmpOp::Lt),
        "le" => Some(CmpOp::Le),
        "gt" => Some(CmpOp::Gt),
        "ge" => Some(CmpOp::Ge),
        _ => None,
    }
}

/// Shallow type of an expression. Operand checking happens during lowering.
fn infer(expr: &Expr, schema: &FieldSchema) -> Result<ValueType, ExprError> {
    match expr {
        Expr::Number(_) => Ok(ValueType::Number),
        Expr::Literal(_) => Ok(ValueType::Text),
        Expr::Field(name) => schema
            .field_type(name)
            .ok_or_else(|| ExprError::UnknownField { name: name.clone() }),
        Expr::Neg(_) | Expr::Binary { .. } => Ok(ValueType::Number),
        Expr::Call { name, .. } => match name.as_str() {
            "abs" | "min" | "max" | "round" => Ok(ValueType::Number),
            _ if comparison_op(name).is_some() => Ok(ValueType::Bool),
            _ => Err(ExprError::UnknownFunction { name: name.clone() }),
        },
    }
}

fn check_arity(function: &str, args: &[Expr], expected: usize) -> Result<(), ExprError> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(ExprError::WrongArity {
            function: function.to_string(),
            expected,
            found: args.len(),
        })
    }
}

fn lower_number(expr: &Expr, schema: &FieldSchema) -> Result<NumExpr, ExprError> {
    match expr {
        Expr::Number(value) => Ok(NumExpr::Const(*value)),
        Expr::Field(name) => {
            let ty = schema
                .field_type(name)
                .ok_or_else(|| ExprError::UnknownField { name: name.clone() })?;
            if ty == ValueType::Number {
                Ok(NumExpr::Field(name.clone()))
            } else {
                Err(ExprError::TypeMismatch {
                    expected: ValueType::Number,
                    found: ty,
                })
            }
        }
        Expr::Literal(_) => Err(ExprError::TypeMismatch {
            expected: ValueType::Number,
            found: ValueType::Text,
        }),
        Expr::Neg(inner) => Ok(NumExpr::Neg(Box::new(lower_number(inner, schema)?))),
        Expr::Binary { op, left, right } => Ok(NumExpr::Bin(
            *op,
            Box::new(lower_number(left, schema)?),
            Box::new(lower_number(right, schema)?),
        )),
        Expr::Call { name, args } => lower_numeric_call(name, args, schema),
    }
}

fn lower_numeric_call(
    name: &str,
    args: &[Expr],
    schema: &FieldSchema,
) -> Result<NumExpr, ExprError> {
    match name {
        "abs" => {
            check_arity(name, args, 1)?;
            Ok(NumExpr::Abs(Box::new(lower_number(&args[0], schema)?)))
        }
        "min" => {
            check_arity(name, args, 2)?;
            Ok(NumExpr::Min(
                Box::new(lower_number(&args[0], schema)?),
                Box::new(lower_number(&args[1], schema)?),
            ))
        }
        "max" => {
            check_arity(name, args, 2)?;
            Ok(NumExpr::Max(
                Box::new(lower_number(&args[0], schema)?),
                Box::new(lower_number(&args[1], schema)?),
            ))
        }
        "round" => {
            check_arity(name, args, 2)?;
            let places = round_places(&args[1])?;
            Ok(NumExpr::Round(
                Box::new(lower_number(&args[0], schema)?),
                places,
            ))
        }
        _ if comparison_op(name).is_some() => Err(ExprError::TypeMismatch {
            expected: ValueType::Number,
            found: ValueType::Bool,
        }),
        _ => Err(ExprError::UnknownFunction {
            name: name.to_string(),
        }),
    }
}

fn round_places(expr: &Expr) -> Result<u32, ExprError> {
    let Expr::Number(value) = expr else {
        return Err(ExprError::InvalidPrecision);
    };
    if !value.fract().is_zero() {
        return Err(ExprError::InvalidPrecision);
    }
    match value.to_u32() {
        Some(places) if places <= 28 => Ok(places),
        _ => Err(ExprError::InvalidPrecision),
    }
}

fn lower_comparison(
    op: CmpOp,
    name: &str,
    args: &[Expr],
    schema: &FieldSchema,
) -> Result<BoolExpr, ExprError> {
    check_arity(name, args, 2)?;
    let left_ty = infer(&args[0], schema)?;
    let right_ty = infer(&args[1], schema)?;
    if left_ty != right_ty {
        return Err(ExprError::TypeMismatch {
            expected: left_ty,
            found: right_ty,
        });
    }

    match left_ty {
        ValueType::Number => Ok(BoolExpr::CmpNum(
            op,
            lower_number(&args[0], schema)?,
            lower_number(&args[1], schema)?,
        )),
        ValueType::Text => {
            if op.is_ordering() {
                return Err(ExprError::Unordered {
                    ty: ValueType::Text,
                });
            }
            Ok(BoolExpr::CmpText(
                op,
                lower_text(&args[0], schema)?,
                lower_text(&args[1], schema)?,
            ))
        }
        ValueType::Date => Ok(BoolExpr::CmpDate(
            op,
            lower_date(&args[0], schema)?,
            lower_date(&args[1], schema)?,
        )),
        ValueType::Bool => Err(ExprError::TypeMismatch {
            expected: ValueType::Number,
            found: ValueType::Bool,
        }),
    }
}

fn lower_text(expr: &Expr, schema: &FieldSchema) -> Result<TextExpr, ExprError> {
    match expr {
        Expr::Literal(value) => Ok(TextExpr::Const(value.clone())),
        Expr::Field(name) => match schema.field_type(name) {
            Some(ValueType::Text) => Ok(TextExpr::Field(name.clone())),
            Some(ty) => Err(ExprError::TypeMismatch {
                expected: ValueType::Text,
                found: ty,
            }),
            None => Err(ExprError::UnknownField { name: name.clone() }),
        },
        other => Err(ExprError::TypeMismatch {
            expected: ValueType::Text,
            found: infer(other, schema)?,
        }),
    }
}

fn lower_date(expr: &Expr, schema: &FieldSchema) -> Result<DateExpr, ExprError> {
    match expr {
        Expr::Field(name) => match schema.field_type(name) {
            Some(ValueType::Date) => Ok(DateExpr::Field(name.clone())),
            Some(ty) => Err(ExprError::TypeMismatch {
                expected: ValueType::Date,
                found: ty,
            }),
            None => Err(ExprError::UnknownField { name: name.clone() }),
        },
        other => Err(ExprError::TypeMismatch {
            expected: ValueType::Date,
            found: infer(other, schema)?,
        }),
    }
}
