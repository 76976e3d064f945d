//! [`QueryExecutor`] implementation backed by [`postgres::Client`].
//!
//! The whole run, QA reads and upsert DML alike, lives inside one
//! transaction, committed or rolled back as a unit. Rather than holding a
//! `postgres::Transaction` (which borrows its `Client` and would make this
//! struct self-referential), the transaction is driven with plain
//! `BEGIN`/`COMMIT`/`ROLLBACK` statements issued over the owned `Client`.

use log::{debug, info};
use pgupsert_core::{PgUpsertError, QueryExecutor, QueryOutcome, Result, Row, Value};
use postgres::Client;
use std::time::Instant;

pub struct PostgresExecutor {
    client: Client,
    in_transaction: bool,
}

impl PostgresExecutor {
    /// Wraps an already-open client and starts the run's transaction.
    pub fn begin(mut client: Client) -> Result<Self> {
        client
            .batch_execute("BEGIN")
            .map_err(|e| PgUpsertError::database(format!("failed to start transaction: {e}")))?;
        Ok(Self {
            client,
            in_transaction: true,
        })
    }
}

impl QueryExecutor for PostgresExecutor {
    fn exec(&mut self, sql: &str) -> Result<u64> {
        let sql_preview = preview(sql);
        debug!("[EXEC] {sql_preview}");
        let start = Instant::now();

        let affected = self
            .client
            .execute(sql, &[])
            .map_err(|e| PgUpsertError::database(format!("statement failed: {e}")))?;

        debug!(
            "[EXEC] {} row(s) affected in {:.2}ms",
            affected,
            start.elapsed().as_secs_f64() * 1000.0
        );
        Ok(affected)
    }

    fn exec_params(&mut self, sql: &str, params: &[&str]) -> Result<u64> {
        let sql_preview = preview(sql);
        debug!("[EXEC] {sql_preview} params={params:?}");

        let params: Vec<&(dyn postgres::types::ToSql + Sync)> = params
            .iter()
            .map(|p| p as &(dyn postgres::types::ToSql + Sync))
            .collect();

        self.client
            .execute(sql, &params)
            .map_err(|e| PgUpsertError::database(format!("statement failed: {e}")))
    }

    fn query(&mut self, sql: &str) -> Result<QueryOutcome> {
        self.query_params(sql, &[])
    }

    fn query_params(&mut self, sql: &str, params: &[&str]) -> Result<QueryOutcome> {
        let sql_preview = preview(sql);
        debug!("[QUERY] {sql_preview} params={params:?}");
        let start = Instant::now();

        let params: Vec<&(dyn postgres::types::ToSql + Sync)> = params
            .iter()
            .map(|p| p as &(dyn postgres::types::ToSql + Sync))
            .collect();

        let rows = self
            .client
            .query(sql, &params)
            .map_err(|e| PgUpsertError::database(format!("query failed: {e}")))?;

        let columns: Vec<String> = rows
            .first()
            .map(|r| r.columns().iter().map(|c| c.name().to_string()).collect())
            .unwrap_or_default();

        let out_rows: Vec<Row> = rows
            .iter()
            .map(|row| (0..row.len()).map(|i| postgres_value_to_value(row, i)).collect())
            .collect();

        debug!(
            "[QUERY] {} row(s) in {:.2}ms",
            out_rows.len(),
            start.elapsed().as_secs_f64() * 1000.0
        );

        Ok(QueryOutcome {
            columns,
            rows: out_rows,
        })
    }

    fn commit(&mut self) -> Result<()> {
        if !self.in_transaction {
            return Ok(());
        }
        self.client
            .batch_execute("COMMIT")
            .map_err(|e| PgUpsertError::database(format!("commit failed: {e}")))?;
        self.in_transaction = false;
        info!("transaction committed");
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        if !self.in_transaction {
            return Ok(());
        }
        self.client
            .batch_execute("ROLLBACK")
            .map_err(|e| PgUpsertError::database(format!("rollback failed: {e}")))?;
        self.in_transaction = false;
        info!("transaction rolled back");
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if self.in_transaction {
            self.rollback()?;
        }
        Ok(())
    }
}

fn preview(sql: &str) -> String {
    let collapsed = sql.replace('\n', " ");
    if collapsed.len() > 200 {
        format!("{}...", &collapsed[..200])
    } else {
        collapsed
    }
}

/// Converts one cell of a `postgres::Row` into the driver-independent
/// [`Value`], switching on the column's reported type name. Falls back to a
/// textual read for any type this engine has no native representation for.
fn postgres_value_to_value(row: &postgres::Row, idx: usize) -> Value {
    use chrono::{DateTime, NaiveDate, NaiveTime, Utc};

    let col_type = row.columns()[idx].type_();

    match col_type.name() {
        "bool" => row.try_get::<_, bool>(idx).map(Value::Bool).unwrap_or(Value::Null),
        "int2" => row
            .try_get::<_, i16>(idx)
            .map(|v| Value::Int(v as i64))
            .unwrap_or(Value::Null),
        "int4" => row
            .try_get::<_, i32>(idx)
            .map(|v| Value::Int(v as i64))
            .unwrap_or(Value::Null),
        "int8" => row.try_get::<_, i64>(idx).map(Value::Int).unwrap_or(Value::Null),
        "float4" => row
            .try_get::<_, f32>(idx)
            .map(|v| Value::Float(v as f64))
            .unwrap_or(Value::Null),
        "float8" => row.try_get::<_, f64>(idx).map(Value::Float).unwrap_or(Value::Null),
        "numeric" => row
            .try_get::<_, String>(idx)
            .map(Value::Decimal)
            .unwrap_or(Value::Null),
        "bytea" => row.try_get::<_, Vec<u8>>(idx).map(Value::Bytes).unwrap_or(Value::Null),
        "json" | "jsonb" => row
            .try_get::<_, serde_json::Value>(idx)
            .map(|v| Value::Json(v.to_string()))
            .unwrap_or(Value::Null),
        "timestamp" | "timestamptz" => row
            .try_get::<_, DateTime<Utc>>(idx)
            .map(Value::DateTime)
            .unwrap_or(Value::Null),
        "date" => row.try_get::<_, NaiveDate>(idx).map(Value::Date).unwrap_or(Value::Null),
        "time" => row.try_get::<_, NaiveTime>(idx).map(Value::Time).unwrap_or(Value::Null),
        _ => row.try_get::<_, String>(idx).map(Value::Text).unwrap_or(Value::Null),
    }
}
