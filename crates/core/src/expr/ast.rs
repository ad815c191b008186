//! Untyped syntax tree produced by the parser.

use rust_decimal::Decimal;

/// Value types the expression language knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    /// Decimal number.
    Number,
    /// String value (field or bare literal).
    Text,
    /// Calendar date field.
    Date,
    /// Boolean, produced only by comparison operators.
    Bool,
}

impl std::fmt::Display for ValueType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number => write!(f, "number"),
            Self::Text => write!(f, "text"),
            Self::Date => write!(f, "date"),
            Self::Bool => write!(f, "bool"),
        }
    }
}

/// Binary arithmetic operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumOp {
    /// Addition.
    Add,
    /// Subtraction.
    Sub,
    /// Multiplication.
    Mul,
    /// Division. The only operator that can fail at evaluation time.
    Div,
}

/// Comparison operators, spelled as two-argument functions in source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    /// `eq(a, b)`
    Eq,
    /// `ne(a, b)`
    Ne,
    /// `lt(a, b)`
    Lt,
    /// `le(a, b)`
    Le,
    /// `gt(a, b)`
    Gt,
    /// `ge(a, b)`
    Ge,
}

impl CmpOp {
    /// The source-text spelling of the operator.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Eq => "eq",
            Self::Ne => "ne",
            Self::Lt => "lt",
            Self::Le => "le",
            Self::Gt => "gt",
            Self::Ge => "ge",
        }
    }

    /// Whether the operator needs an ordering, not just equality.
    #[must_use]
    pub const fn is_ordering(self) -> bool {
        matches!(self, Self::Lt | Self::Le | Self::Gt | Self::Ge)
    }

    /// Applies the operator to a total ordering.
    #[must_use]
    pub fn apply(self, ordering: std::cmp::Ordering) -> bool {
        match self {
            Self::Eq => ordering.is_eq(),
            Self::Ne => ordering.is_ne(),
            Self::Lt => ordering.is_lt(),
            Self::Le => ordering.is_le(),
            Self::Gt => ordering.is_gt(),
            Self::Ge => ordering.is_ge(),
        }
    }
}

/// Untyped expression node, straight out of the parser.
///
/// Type checking lowers this into the typed form in [`super::eval`].
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Numeric literal.
    Number(Decimal),
    /// Sigil-prefixed field reference, stored without the sigil.
    Field(String),
    /// Bare identifier, treated as a string literal.
    Literal(String),
    /// Unary negation.
    Neg(Box<Expr>),
    /// Binary arithmetic.
    Binary {
        /// The operator.
        op: NumOp,
        /// Left operand.
        left: Box<Expr>,
        /// Right operand.
        right: Box<Expr>,
    },
    /// Function call; the name is resolved during type checking.
    Call {
        /// Function name as written.
        name: String,
        /// Argument expressions in order.
        args: Vec<Expr>,
    },
}
