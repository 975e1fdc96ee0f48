//! Query expressions and aggregates.
//!
//! An [`Expression`] is a computed value inside a query: the source of an
//! annotation, an aggregate input, or an update payload. Arithmetic composes
//! through `std::ops`:
//!
//! ```
//! use model_values::{Expression, AggregateFunc};
//!
//! // price * 1.1
//! let expr = Expression::f("price") * Expression::value(1.1);
//!
//! // COUNT("id")
//! let count = Expression::aggregate(AggregateFunc::Count, Expression::col("id"));
//! ```

use crate::value::Value;
use std::ops;

/// A value computed in the context of a SQL query.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// A column reference.
    Col(String),
    /// A literal, passed as a bind parameter.
    Value(Value),
    /// An F-expression naming another field of the same row.
    F(String),
    /// A database function call.
    Func {
        /// Function name (e.g., "COALESCE", "UPPER").
        name: String,
        /// Arguments, in call order.
        args: Vec<Expression>,
    },
    /// An aggregate over an inner expression.
    Aggregate {
        /// Which aggregate to apply.
        func: AggregateFunc,
        /// What to aggregate.
        field: Box<Expression>,
        /// Whether to fold duplicates first.
        distinct: bool,
    },
    /// Addition.
    Add(Box<Expression>, Box<Expression>),
    /// Subtraction.
    Sub(Box<Expression>, Box<Expression>),
    /// Multiplication.
    Mul(Box<Expression>, Box<Expression>),
    /// Division.
    Div(Box<Expression>, Box<Expression>),
    /// Modulo.
    Mod(Box<Expression>, Box<Expression>),
    /// Exponentiation (`POWER(lhs, rhs)`).
    Pow(Box<Expression>, Box<Expression>),
}

/// The aggregate functions the compiler knows how to emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFunc {
    /// COUNT.
    Count,
    /// SUM.
    Sum,
    /// AVG.
    Avg,
    /// MIN.
    Min,
    /// MAX.
    Max,
    /// Standard deviation.
    StdDev,
    /// Variance.
    Variance,
}

impl AggregateFunc {
    /// The SQL name of this aggregate.
    pub const fn sql_name(&self) -> &'static str {
        match self {
            Self::Count => "COUNT",
            Self::Sum => "SUM",
            Self::Avg => "AVG",
            Self::Min => "MIN",
            Self::Max => "MAX",
            Self::StdDev => "STDDEV",
            Self::Variance => "VARIANCE",
        }
    }

    /// The conventional alias for aggregating `field`, e.g. `amount__sum`.
    ///
    /// Reduction and value-counting name their result columns this way so
    /// callers can address them without passing aliases around.
    pub fn default_alias(&self, field: &str) -> String {
        format!("{field}__{}", self.sql_name().to_ascii_lowercase())
    }
}

impl Expression {
    /// A column reference.
    pub fn col(name: impl Into<String>) -> Self {
        Self::Col(name.into())
    }

    /// An F-expression naming a field.
    pub fn f(name: impl Into<String>) -> Self {
        Self::F(name.into())
    }

    /// A literal bind-parameter value.
    pub fn value(v: impl Into<Value>) -> Self {
        Self::Value(v.into())
    }

    /// A function call.
    pub fn func(name: impl Into<String>, args: Vec<Expression>) -> Self {
        Self::Func {
            name: name.into(),
            args,
        }
    }

    /// An aggregate over `field`.
    pub fn aggregate(func: AggregateFunc, field: Expression) -> Self {
        Self::Aggregate {
            func,
            field: Box::new(field),
            distinct: false,
        }
    }

    /// An aggregate over `field` with DISTINCT.
    pub fn aggregate_distinct(func: AggregateFunc, field: Expression) -> Self {
        Self::Aggregate {
            func,
            field: Box::new(field),
            distinct: true,
        }
    }

    /// This expression raised to the given power.
    ///
    /// Rust has no `**` operator, so exponentiation is a named method.
    pub fn pow(self, rhs: Expression) -> Self {
        Self::Pow(Box::new(self), Box::new(rhs))
    }
}

macro_rules! expression_op {
    ($($op_trait:ident :: $op_fn:ident => $variant:ident),* $(,)?) => {
        $(
            impl ops::$op_trait for Expression {
                type Output = Self;
                fn $op_fn(self, rhs: Self) -> Self::Output {
                    Self::$variant(Box::new(self), Box::new(rhs))
                }
            }
        )*
    };
}

expression_op! {
    Add::add => Add,
    Sub::sub => Sub,
    Mul::mul => Mul,
    Div::div => Div,
    Rem::rem => Mod,
}
