//! Database executor boundary.
//!
//! [`DbExecutor`] is the minimal async interface the query layer needs from a
//! database backend: run a statement, run a query, report the backend's
//! placeholder dialect. Connection handling, pooling, and transactions all
//! live on the other side of this trait.

use crate::error::{OrmError, OrmResult};
use crate::query::compiler::{DatabaseBackendType, Row};
use crate::value::Value;

/// Minimal async database executor trait.
///
/// `QuerySet` and `Manager` execution methods accept `&dyn DbExecutor`.
/// Implementations wrap a concrete driver (rusqlite, tokio-postgres, ...);
/// the [`RecordingExecutor`](crate::testing::RecordingExecutor) in this crate
/// is an in-memory implementation for tests.
#[async_trait::async_trait]
pub trait DbExecutor: Send + Sync {
    /// Returns the backend type for SQL compilation.
    fn backend_type(&self) -> DatabaseBackendType;

    /// Runs a SQL statement that does not return rows.
    /// Returns the number of rows affected.
    async fn execute_sql(&self, sql: &str, params: &[Value]) -> OrmResult<u64>;

    /// Runs a SQL query and returns all result rows.
    async fn query(&self, sql: &str, params: &[Value]) -> OrmResult<Vec<Row>>;

    /// Runs a SQL query and returns exactly one row.
    ///
    /// Returns `DoesNotExist` if no rows come back and
    /// `MultipleObjectsReturned` if more than one does.
    async fn query_one(&self, sql: &str, params: &[Value]) -> OrmResult<Row> {
        let mut rows = self.query(sql, params).await?;
        match rows.len() {
            0 => Err(OrmError::DoesNotExist(
                "query returned no rows".to_string(),
            )),
            1 => Ok(rows.remove(0)),
            n => Err(OrmError::MultipleObjectsReturned(format!(
                "query returned {n} rows when one was expected"
            ))),
        }
    }
}
