//! Query building and compilation.
//!
//! - [`lookups`] - Q objects and lookup types for filtering
//! - [`fields`] - the `F` field-reference proxy
//! - [`expressions`] - aggregates and computed expressions
//! - [`compiler`] - query AST and SQL compilation
//! - [`queryset`] - QuerySet and Manager for lazy query building
//! - [`registry`] - custom lookup registration

pub mod compiler;
pub mod expressions;
pub mod fields;
pub mod lookups;
pub mod queryset;
pub mod registry;

pub use compiler::{
    DatabaseBackendType, FromValue, OrderBy, Query, Row, SelectColumn, SqlCompiler, WhereNode,
};
pub use expressions::{AggregateFunc, Expression};
pub use fields::F;
pub use lookups::{Lookup, Q};
pub use queryset::{GroupValues, Groups, Manager, QuerySet, Reduced, RowShape};
pub use registry::{register_lookup, CustomLookup, LookupRegistry};
