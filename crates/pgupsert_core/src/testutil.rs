//! A scripted in-memory [`QueryExecutor`] used by this crate's own unit
//! tests. Rather than modeling a real SQL engine, it matches each incoming
//! statement against a list of exact strings and answers with a canned
//! result.

use crate::error::{PgUpsertError, Result};
use crate::executor::{QueryExecutor, QueryOutcome};
use crate::value::Value;
use std::collections::VecDeque;

pub struct ScriptedExecutor {
    responses: VecDeque<(String, QueryOutcome)>,
    pub committed: bool,
    pub rolled_back: bool,
}

impl ScriptedExecutor {
    pub fn new() -> Self {
        Self {
            responses: VecDeque::new(),
            committed: false,
            rolled_back: false,
        }
    }

    /// Registers the outcome for the next query whose SQL exactly matches
    /// `sql`. Responses are consumed strictly in registration order.
    pub fn expect(mut self, sql: &str, outcome: QueryOutcome) -> Self {
        self.responses.push_back((sql.to_string(), outcome));
        self
    }

    pub fn expect_scalar(self, sql: &str, value: i64) -> Self {
        self.expect(
            sql,
            QueryOutcome {
                columns: vec!["count".to_string()],
                rows: vec![vec![Value::Int(value)]],
            },
        )
    }

    pub fn expect_bool(self, sql: &str, value: bool) -> Self {
        self.expect(
            sql,
            QueryOutcome {
                columns: vec!["exists".to_string()],
                rows: vec![vec![Value::Bool(value)]],
            },
        )
    }
}

impl Default for ScriptedExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryExecutor for ScriptedExecutor {
    fn exec(&mut self, _sql: &str) -> Result<u64> {
        Ok(0)
    }

    fn exec_params(&mut self, _sql: &str, _params: &[&str]) -> Result<u64> {
        Ok(0)
    }

    fn query(&mut self, sql: &str) -> Result<QueryOutcome> {
        self.query_params(sql, &[])
    }

    fn query_params(&mut self, sql: &str, params: &[&str]) -> Result<QueryOutcome> {
        let Some((expected, outcome)) = self.responses.pop_front() else {
            return Err(PgUpsertError::invariant(format!(
                "no scripted response left for query: {sql}"
            )));
        };

        if sql != expected {
            return Err(PgUpsertError::invariant(format!(
                "unexpected query.\n  got:      {sql}\n  params:   {params:?}\n  expected: {expected}"
            )));
        }

        Ok(outcome)
    }

    fn commit(&mut self) -> Result<()> {
        self.committed = true;
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        self.rolled_back = true;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}
