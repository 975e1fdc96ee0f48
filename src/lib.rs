//! # model-values
//!
//! Query sugar over a lazy, Django-flavored ORM core: field-path filter
//! construction, column projection with scalar/tuple row shapes, grouped
//! iteration and aggregate reduction, plus bulk-update helpers that diff
//! current against desired state to minimize round-trips.
//!
//! ## Architecture
//!
//! A [`QuerySet`](query::queryset::QuerySet) builds a
//! [`Query`](query::compiler::Query) AST through method chaining without
//! touching the database. SQL is only generated when an execution method is
//! called, at which point the [`SqlCompiler`](query::compiler::SqlCompiler)
//! emits parameterized SQL for the target backend and hands it to a
//! [`DbExecutor`](executor::DbExecutor). Connection handling, transactions,
//! and drivers all live behind that trait.
//!
//! ## Example
//!
//! ```no_run
//! use model_values::{F, Manager, Model, OrmError, Row};
//!
//! struct Article {
//!     id: i64,
//!     title: String,
//! }
//!
//! impl Model for Article {
//!     fn table_name() -> &'static str {
//!         "blog_article"
//!     }
//!     fn from_row(row: &Row) -> Result<Self, OrmError> {
//!         Ok(Article {
//!             id: row.get("id")?,
//!             title: row.get("title")?,
//!         })
//!     }
//! }
//!
//! # async fn demo(db: &dyn model_values::DbExecutor) -> Result<(), OrmError> {
//! let objects = Manager::<Article>::new();
//! // Titles of recent articles, one query, scalars out.
//! let titles = objects
//!     .filter(F::new("created").gte("2024-01-01"))
//!     .col("title");
//! for row in titles.rows(db).await? {
//!     let _title: &model_values::Value = &row.values()[0];
//! }
//! # Ok(())
//! # }
//! ```

// These clippy lints are intentionally allowed for this crate:
// - too_many_lines: the SQL compiler methods are inherently large due to many match arms
// - format_push_string: format! with push_str is clearer than write! for SQL generation
// - doc_markdown: backtick requirements for documentation items are too strict
// - cast_possible_truncation / cast_possible_wrap: usize-to-int casts on row counts
// - cast_precision_loss: i64-to-f64 casts are acceptable for value conversion
// - return_self_not_must_use: builder pattern methods are self-documenting
// - use_self: explicit type names are clearer in some contexts
#![allow(clippy::too_many_lines)]
#![allow(clippy::format_push_string)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::use_self)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::option_if_let_else)]

pub mod error;
pub mod executor;
pub mod model;
pub mod query;
pub mod testing;
pub mod value;

// Re-export the most commonly used types at the crate root.
pub use error::{OrmError, OrmResult};
pub use executor::DbExecutor;
pub use model::Model;
pub use query::{
    register_lookup, AggregateFunc, CustomLookup, DatabaseBackendType, Expression, FromValue,
    GroupValues, Groups, Lookup, LookupRegistry, Manager, OrderBy, Query, QuerySet, Reduced, Row,
    RowShape, SelectColumn, SqlCompiler, WhereNode, F, Q,
};
pub use value::Value;
