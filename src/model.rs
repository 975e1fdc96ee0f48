//! Model trait for mapping tables to Rust types.
//!
//! The sugar layer works at the row/value level, so [`Model`] is deliberately
//! thin: a table name, a primary-key column name, and row hydration. Schema
//! metadata, field definitions, and instance persistence belong to whatever
//! host layer sits behind the [`DbExecutor`](crate::executor::DbExecutor).

use crate::error::OrmError;
use crate::query::compiler::Row;

/// A type bound to a database table.
///
/// # Examples
///
/// ```
/// use model_values::{Model, OrmError, Row};
///
/// struct Profile {
///     id: i64,
///     name: String,
/// }
///
/// impl Model for Profile {
///     fn table_name() -> &'static str {
///         "app_profile"
///     }
///
///     fn from_row(row: &Row) -> Result<Self, OrmError> {
///         Ok(Profile {
///             id: row.get("id")?,
///             name: row.get("name")?,
///         })
///     }
/// }
/// ```
pub trait Model: Send + Sync + 'static {
    /// Returns the database table name.
    fn table_name() -> &'static str;

    /// Returns the name of the primary key column.
    fn pk_field_name() -> &'static str {
        "id"
    }

    /// Constructs an instance from a database row.
    fn from_row(row: &Row) -> Result<Self, OrmError>
    where
        Self: Sized;
}
