//! The `QueryExecutor` capability: a thin adapter around a database session.
//!
//! Everything else in this crate (catalog introspection, QA, upsert
//! synthesis, the orchestrator) is written against this trait and never
//! touches a driver crate or a raw socket directly. Socket handling lives
//! entirely in the concrete driver crate that implements this trait.
//!
//! The executor does not auto-commit. Callers decide when to `commit()` or
//! `rollback()`, and whether to roll back after an error.

use crate::error::Result;
use crate::value::Value;

/// A single result row, column-ordered.
pub type Row = Vec<Value>;

/// The result of a `SELECT`-shaped statement.
#[derive(Debug, Clone, Default)]
pub struct QueryOutcome {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl QueryOutcome {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Reads the first column of the first row as an `i64`, for `COUNT(*)`
    /// and similar scalar queries. Returns `None` if there is no row.
    pub fn scalar_i64(&self) -> Option<i64> {
        match self.rows.first()?.first()? {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }
}

/// Runs statements against a single database session and owns the
/// transaction boundary.
///
/// Identifiers are never passed through `params`. They are validated (see
/// [`crate::identifier`]) and concatenated directly into `sql`. `params` only
/// carries data values (e.g. a schema or table name used as a filter in a
/// catalog query), bound positionally as `$1`, `$2`, ….
pub trait QueryExecutor {
    /// Executes a statement that does not return rows (DDL, or DML whose row
    /// count is all the caller needs). Returns the number of rows affected,
    /// when the backend reports one.
    fn exec(&mut self, sql: &str) -> Result<u64>;

    /// Like [`exec`](Self::exec) but with positional `$N` data parameters.
    fn exec_params(&mut self, sql: &str, params: &[&str]) -> Result<u64>;

    /// Executes a statement and returns its result set.
    fn query(&mut self, sql: &str) -> Result<QueryOutcome>;

    /// Like [`query`](Self::query) but with positional `$N` data parameters.
    fn query_params(&mut self, sql: &str, params: &[&str]) -> Result<QueryOutcome>;

    /// Commits the current transaction.
    fn commit(&mut self) -> Result<()>;

    /// Rolls back the current transaction.
    fn rollback(&mut self) -> Result<()>;

    /// Closes the session. Safe to call after `commit`/`rollback`.
    fn close(&mut self) -> Result<()>;
}
