//! Field-reference proxy for building filters and expressions.
//!
//! [`F`] names a column (or a related-column chain) and turns comparisons
//! into [`Q`] filters and arithmetic into [`Expression`]s:
//!
//! ```
//! use model_values::F;
//!
//! // user__created >= <date>  as a filter
//! let q = F::new("user").f("created").gte("2024-01-01");
//!
//! // amount + 1  as a computable expression
//! let expr = F::new("amount") + 1;
//! ```
//!
//! Paths chain through [`F::f`]; each segment joins with `__`, the same
//! separator the related-field syntax uses everywhere else in the crate.

use super::expressions::Expression;
use super::lookups::{Lookup, Q};
use super::registry;
use crate::error::{OrmError, OrmResult};
use crate::value::Value;
use std::ops;

/// A reference to a field path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct F {
    name: String,
}

impl F {
    /// Creates a reference to a top-level field.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Extends the path with a related field segment.
    pub fn f(&self, name: &str) -> Self {
        if self.name.is_empty() {
            Self::new(name)
        } else {
            Self::new(format!("{}__{name}", self.name))
        }
    }

    /// Returns the full `__`-joined path.
    pub fn name(&self) -> &str {
        &self.name
    }

    // ── Comparison lookups ───────────────────────────────────────────

    /// Equality filter (`field = value`; `IS NULL` for null values).
    pub fn eq(&self, value: impl Into<Value>) -> Q {
        Q::filter(&self.name, Lookup::Exact(value.into()))
    }

    /// Not-equal filter.
    ///
    /// `ne(Value::Null)` rewrites to `IS NOT NULL`: a literal `<> NULL`
    /// never matches under three-valued SQL logic.
    pub fn ne(&self, value: impl Into<Value>) -> Q {
        let value = value.into();
        if value.is_null() {
            return Q::filter(&self.name, Lookup::IsNull(false));
        }
        let template = registry::resolve("ne")
            .map_or_else(|| registry::NE_SQL.to_string(), |lookup| lookup.sql_template);
        Q::filter(&self.name, Lookup::Custom { template, value })
    }

    /// Less-than filter.
    pub fn lt(&self, value: impl Into<Value>) -> Q {
        Q::filter(&self.name, Lookup::Lt(value.into()))
    }

    /// Less-than-or-equal filter.
    pub fn lte(&self, value: impl Into<Value>) -> Q {
        Q::filter(&self.name, Lookup::Lte(value.into()))
    }

    /// Greater-than filter.
    pub fn gt(&self, value: impl Into<Value>) -> Q {
        Q::filter(&self.name, Lookup::Gt(value.into()))
    }

    /// Greater-than-or-equal filter.
    pub fn gte(&self, value: impl Into<Value>) -> Q {
        Q::filter(&self.name, Lookup::Gte(value.into()))
    }

    /// Membership filter (`field IN (...)`).
    pub fn is_in<I, V>(&self, values: I) -> Q
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Q::filter(
            &self.name,
            Lookup::In(values.into_iter().map(Into::into).collect()),
        )
    }

    /// Case-insensitive exact filter.
    pub fn iexact(&self, value: impl Into<Value>) -> Q {
        Q::filter(&self.name, Lookup::IExact(value.into()))
    }

    /// Substring filter.
    pub fn contains(&self, value: impl Into<String>) -> Q {
        Q::filter(&self.name, Lookup::Contains(value.into()))
    }

    /// Case-insensitive substring filter.
    pub fn icontains(&self, value: impl Into<String>) -> Q {
        Q::filter(&self.name, Lookup::IContains(value.into()))
    }

    /// Prefix filter.
    pub fn startswith(&self, value: impl Into<String>) -> Q {
        Q::filter(&self.name, Lookup::StartsWith(value.into()))
    }

    /// Case-insensitive prefix filter.
    pub fn istartswith(&self, value: impl Into<String>) -> Q {
        Q::filter(&self.name, Lookup::IStartsWith(value.into()))
    }

    /// Suffix filter.
    pub fn endswith(&self, value: impl Into<String>) -> Q {
        Q::filter(&self.name, Lookup::EndsWith(value.into()))
    }

    /// Case-insensitive suffix filter.
    pub fn iendswith(&self, value: impl Into<String>) -> Q {
        Q::filter(&self.name, Lookup::IEndsWith(value.into()))
    }

    /// Range filter (`BETWEEN low AND high`).
    pub fn range(&self, low: impl Into<Value>, high: impl Into<Value>) -> Q {
        Q::filter(&self.name, Lookup::Range(low.into(), high.into()))
    }

    /// NULL test.
    pub fn is_null(&self, null: bool) -> Q {
        Q::filter(&self.name, Lookup::IsNull(null))
    }

    /// Full-text search filter.
    pub fn search(&self, value: impl Into<String>) -> Q {
        Q::filter(&self.name, Lookup::Search(value.into()))
    }

    /// Regular expression filter.
    pub fn regex(&self, value: impl Into<String>) -> Q {
        Q::filter(&self.name, Lookup::Regex(value.into()))
    }

    /// Case-insensitive regular expression filter.
    pub fn iregex(&self, value: impl Into<String>) -> Q {
        Q::filter(&self.name, Lookup::IRegex(value.into()))
    }

    /// Builds a filter from a registered custom lookup.
    ///
    /// The `ne`-to-null rewrite applies here as well, so
    /// `lookup("ne", Value::Null)` behaves like [`F::ne`].
    pub fn lookup(&self, name: &str, value: impl Into<Value>) -> OrmResult<Q> {
        let value = value.into();
        if name == "ne" && value.is_null() {
            return Ok(Q::filter(&self.name, Lookup::IsNull(false)));
        }
        let custom = registry::resolve(name)
            .ok_or_else(|| OrmError::FieldError(format!("Unsupported lookup '{name}'")))?;
        Ok(Q::filter(
            &self.name,
            Lookup::Custom {
                template: custom.sql_template,
                value,
            },
        ))
    }

    /// Raises the field to the given power as a computable expression.
    pub fn pow(self, value: impl Into<Value>) -> Expression {
        Expression::from(self).pow(Expression::value(value))
    }
}

impl From<F> for Expression {
    fn from(f: F) -> Self {
        Self::F(f.name)
    }
}

impl<V: Into<Value>> ops::Add<V> for F {
    type Output = Expression;
    fn add(self, rhs: V) -> Expression {
        Expression::from(self) + Expression::value(rhs)
    }
}

impl<V: Into<Value>> ops::Sub<V> for F {
    type Output = Expression;
    fn sub(self, rhs: V) -> Expression {
        Expression::from(self) - Expression::value(rhs)
    }
}

impl<V: Into<Value>> ops::Mul<V> for F {
    type Output = Expression;
    fn mul(self, rhs: V) -> Expression {
        Expression::from(self) * Expression::value(rhs)
    }
}

impl<V: Into<Value>> ops::Div<V> for F {
    type Output = Expression;
    fn div(self, rhs: V) -> Expression {
        Expression::from(self) / Expression::value(rhs)
    }
}

impl<V: Into<Value>> ops::Rem<V> for F {
    type Output = Expression;
    fn rem(self, rhs: V) -> Expression {
        Expression::from(self) % Expression::value(rhs)
    }
}
