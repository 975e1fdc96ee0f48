//! Field lookups and composable `Q` filters.
//!
//! A [`Lookup`] is one field-level comparison; a [`Q`] combines lookups into
//! filter trees with `&` (AND), `|` (OR), and `!` (NOT). The
//! [`F`](crate::query::fields::F) proxy is the usual way to build these, but
//! direct construction works too:
//!
//! ```
//! use model_values::{Lookup, Q, Value};
//!
//! let q = Q::filter("name", Lookup::Exact(Value::from("Alice")))
//!     & Q::filter("age", Lookup::Gte(Value::from(21)));
//! ```

use crate::value::Value;
use std::ops;

/// A field-level comparison.
///
/// One variant per lookup suffix; the compiler turns each into the matching
/// WHERE fragment for the active backend.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    /// `field = value`, or `field IS NULL` when the value is null.
    Exact(Value),
    /// Case-folded equality.
    IExact(Value),
    /// `field LIKE '%value%'`.
    Contains(String),
    /// Case-insensitive substring match.
    IContains(String),
    /// `field IN (values...)`.
    In(Vec<Value>),
    /// `field > value`.
    Gt(Value),
    /// `field >= value`.
    Gte(Value),
    /// `field < value`.
    Lt(Value),
    /// `field <= value`.
    Lte(Value),
    /// `field LIKE 'value%'`.
    StartsWith(String),
    /// Case-insensitive prefix match.
    IStartsWith(String),
    /// `field LIKE '%value'`.
    EndsWith(String),
    /// Case-insensitive suffix match.
    IEndsWith(String),
    /// `field BETWEEN low AND high`.
    Range(Value, Value),
    /// `field IS NULL` when true, `field IS NOT NULL` when false.
    IsNull(bool),
    /// Full-text search; `to_tsvector @@ plainto_tsquery` on PostgreSQL,
    /// degraded forms elsewhere.
    Search(String),
    /// Regular expression match.
    Regex(String),
    /// Case-insensitive regular expression match.
    IRegex(String),
    /// A registry-resolved lookup carrying its own SQL template with
    /// `{column}` and `{value}` placeholders.
    Custom {
        /// The SQL template to render.
        template: String,
        /// The comparison value.
        value: Value,
    },
}

/// A composable filter tree.
///
/// `&`, `|`, and `!` nest arbitrarily; adjacent ANDs and ORs collapse into
/// one node, and double negation cancels.
#[derive(Debug, Clone, PartialEq)]
pub enum Q {
    /// A single field lookup.
    Filter {
        /// The field path (`__`-joined for related columns).
        field: String,
        /// The lookup operation.
        lookup: Lookup,
    },
    /// All children must hold.
    And(Vec<Q>),
    /// At least one child must hold.
    Or(Vec<Q>),
    /// The child must not hold.
    Not(Box<Q>),
}

impl Q {
    /// Builds a single-lookup filter.
    pub fn filter(field: impl Into<String>, lookup: Lookup) -> Self {
        Self::Filter {
            field: field.into(),
            lookup,
        }
    }

    /// Whether this is a childless AND/OR (matches everything / nothing).
    pub fn is_empty(&self) -> bool {
        match self {
            Self::And(children) | Self::Or(children) => children.is_empty(),
            _ => false,
        }
    }

    fn into_and_children(self) -> Vec<Self> {
        match self {
            Self::And(children) => children,
            other => vec![other],
        }
    }

    fn into_or_children(self) -> Vec<Self> {
        match self {
            Self::Or(children) => children,
            other => vec![other],
        }
    }
}

impl ops::BitAnd for Q {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self::Output {
        let mut children = self.into_and_children();
        children.extend(rhs.into_and_children());
        Self::And(children)
    }
}

impl ops::BitOr for Q {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        let mut children = self.into_or_children();
        children.extend(rhs.into_or_children());
        Self::Or(children)
    }
}

impl ops::Not for Q {
    type Output = Self;

    fn not(self) -> Self::Output {
        match self {
            Self::Not(inner) => *inner,
            other => Self::Not(Box::new(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_filter() {
        let q = Q::filter("name", Lookup::Exact(Value::from("Alice")));
        match &q {
            Q::Filter { field, lookup } => {
                assert_eq!(field, "name");
                assert_eq!(*lookup, Lookup::Exact(Value::String("Alice".to_string())));
            }
            _ => panic!("Expected Filter"),
        }
    }

    #[test]
    fn test_and_operator() {
        let q1 = Q::filter("name", Lookup::Exact(Value::from("Alice")));
        let q2 = Q::filter("age", Lookup::Gt(Value::from(25)));
        match q1 & q2 {
            Q::And(children) => assert_eq!(children.len(), 2),
            _ => panic!("Expected And"),
        }
    }

    #[test]
    fn test_or_operator() {
        let q1 = Q::filter("name", Lookup::Exact(Value::from("Alice")));
        let q2 = Q::filter("name", Lookup::Exact(Value::from("Bob")));
        match q1 | q2 {
            Q::Or(children) => assert_eq!(children.len(), 2),
            _ => panic!("Expected Or"),
        }
    }

    #[test]
    fn test_not_and_double_negation() {
        let q = Q::filter("active", Lookup::Exact(Value::from(false)));
        assert!(matches!(!q.clone(), Q::Not(_)));
        assert_eq!(!!q.clone(), q);
    }

    #[test]
    fn test_and_flattening() {
        let q1 = Q::filter("a", Lookup::Exact(Value::from(1)));
        let q2 = Q::filter("b", Lookup::Exact(Value::from(2)));
        let q3 = Q::filter("c", Lookup::Exact(Value::from(3)));
        match (q1 & q2) & q3 {
            Q::And(children) => assert_eq!(children.len(), 3),
            _ => panic!("Expected And with 3 children"),
        }
    }

    #[test]
    fn test_or_flattening() {
        let q1 = Q::filter("a", Lookup::Exact(Value::from(1)));
        let q2 = Q::filter("b", Lookup::Exact(Value::from(2)));
        let q3 = Q::filter("c", Lookup::Exact(Value::from(3)));
        match q1 | (q2 | q3) {
            Q::Or(children) => assert_eq!(children.len(), 3),
            _ => panic!("Expected Or with 3 children"),
        }
    }

    #[test]
    fn test_complex_combination() {
        // (name = "Alice" AND age > 25) OR (name = "Bob")
        let q1 = Q::filter("name", Lookup::Exact(Value::from("Alice")));
        let q2 = Q::filter("age", Lookup::Gt(Value::from(25)));
        let q3 = Q::filter("name", Lookup::Exact(Value::from("Bob")));
        match (q1 & q2) | q3 {
            Q::Or(children) => {
                assert_eq!(children.len(), 2);
                assert!(matches!(&children[0], Q::And(_)));
                assert!(matches!(&children[1], Q::Filter { .. }));
            }
            _ => panic!("Expected Or"),
        }
    }

    #[test]
    fn test_q_is_empty() {
        assert!(Q::And(vec![]).is_empty());
        assert!(Q::Or(vec![]).is_empty());
        assert!(!Q::filter("x", Lookup::Exact(Value::from(1))).is_empty());
    }
}
