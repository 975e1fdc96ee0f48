//! Test support: an in-memory recording executor.
//!
//! [`RecordingExecutor`] implements [`DbExecutor`] without a database. Result
//! rows and affected-row counts are scripted ahead of time, and every
//! statement that reaches the executor is recorded, so tests can assert both
//! behavior and the exact number of round-trips an operation costs.

use crate::error::OrmResult;
use crate::executor::DbExecutor;
use crate::query::compiler::{DatabaseBackendType, Row};
use crate::value::Value;
use std::collections::VecDeque;
use std::sync::Mutex;

/// A scripted, statement-recording [`DbExecutor`].
///
/// Queries pop from a queue of scripted row sets (empty when the queue runs
/// dry); statements pop from a queue of scripted affected counts (zero when
/// dry). Every call is appended to the statement log.
///
/// # Examples
///
/// ```
/// use model_values::testing::RecordingExecutor;
/// use model_values::{Row, Value};
///
/// let db = RecordingExecutor::new();
/// db.push_rows(vec![Row::new(
///     vec!["id".to_string()],
///     vec![Value::Int(1)],
/// )]);
/// ```
#[derive(Debug, Default)]
pub struct RecordingExecutor {
    backend: Option<DatabaseBackendType>,
    results: Mutex<VecDeque<Vec<Row>>>,
    affected: Mutex<VecDeque<u64>>,
    statements: Mutex<Vec<(String, Vec<Value>)>>,
}

impl RecordingExecutor {
    /// Creates an executor reporting the PostgreSQL dialect.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an executor reporting the given dialect.
    pub fn with_backend(backend: DatabaseBackendType) -> Self {
        Self {
            backend: Some(backend),
            ..Self::default()
        }
    }

    /// Scripts the result rows for the next query.
    pub fn push_rows(&self, rows: Vec<Row>) {
        if let Ok(mut results) = self.results.lock() {
            results.push_back(rows);
        }
    }

    /// Scripts the affected-row count for the next statement.
    pub fn push_affected(&self, count: u64) {
        if let Ok(mut affected) = self.affected.lock() {
            affected.push_back(count);
        }
    }

    /// Returns the SQL of every call made so far, in order.
    pub fn statements(&self) -> Vec<String> {
        self.statements
            .lock()
            .map(|log| log.iter().map(|(sql, _)| sql.clone()).collect())
            .unwrap_or_default()
    }

    /// Returns the parameters of every call made so far, in order.
    pub fn parameters(&self) -> Vec<Vec<Value>> {
        self.statements
            .lock()
            .map(|log| log.iter().map(|(_, params)| params.clone()).collect())
            .unwrap_or_default()
    }

    /// Returns how many statements have been executed.
    pub fn statement_count(&self) -> usize {
        self.statements.lock().map(|log| log.len()).unwrap_or(0)
    }

    /// Clears the statement log.
    pub fn reset(&self) {
        if let Ok(mut log) = self.statements.lock() {
            log.clear();
        }
    }

    fn record(&self, sql: &str, params: &[Value]) {
        if let Ok(mut log) = self.statements.lock() {
            log.push((sql.to_string(), params.to_vec()));
        }
    }
}

#[async_trait::async_trait]
impl DbExecutor for RecordingExecutor {
    fn backend_type(&self) -> DatabaseBackendType {
        self.backend.unwrap_or(DatabaseBackendType::PostgreSQL)
    }

    async fn execute_sql(&self, sql: &str, params: &[Value]) -> OrmResult<u64> {
        self.record(sql, params);
        Ok(self
            .affected
            .lock()
            .ok()
            .and_then(|mut queue| queue.pop_front())
            .unwrap_or(0))
    }

    async fn query(&self, sql: &str, params: &[Value]) -> OrmResult<Vec<Row>> {
        self.record(sql, params);
        Ok(self
            .results
            .lock()
            .ok()
            .and_then(|mut queue| queue.pop_front())
            .unwrap_or_default())
    }
}
