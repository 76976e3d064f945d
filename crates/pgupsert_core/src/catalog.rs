//! Catalog introspection.
//!
//! Reads `information_schema` for plain column/table shape questions and
//! `pg_catalog` directly for constraint structure: `information_schema.tables`
//! for table listings, `pg_constraint`/`pg_attribute` joins for constraint
//! detail.

use crate::descriptor::{CheckConstraintDescriptor, ForeignKeyDescriptor, TableDescriptor};
use crate::error::{PgUpsertError, Result};
use crate::executor::QueryExecutor;
use crate::value::Value;
use std::collections::BTreeSet;

pub struct CatalogInspector<'a> {
    executor: &'a mut dyn QueryExecutor,
}

impl<'a> CatalogInspector<'a> {
    pub fn new(executor: &'a mut dyn QueryExecutor) -> Self {
        Self { executor }
    }

    pub fn table_exists(&mut self, schema: &str, table: &str) -> Result<bool> {
        let outcome = self.executor.query_params(
            "SELECT EXISTS (\
               SELECT 1 FROM information_schema.tables \
               WHERE table_schema = $1 AND table_name = $2 \
             )",
            &[schema, table],
        )?;

        match outcome.rows.first().and_then(|r| r.first()) {
            Some(Value::Bool(b)) => Ok(*b),
            _ => Err(PgUpsertError::invariant(
                "table_exists query did not return a boolean",
            )),
        }
    }

    /// Columns of `schema.table`, in ordinal (declaration) order.
    pub fn columns(&mut self, schema: &str, table: &str) -> Result<Vec<String>> {
        let outcome = self.executor.query_params(
            "SELECT column_name FROM information_schema.columns \
             WHERE table_schema = $1 AND table_name = $2 \
             ORDER BY ordinal_position",
            &[schema, table],
        )?;

        rows_to_strings(&outcome)
    }

    /// Primary key columns of `schema.table`, in ordinal position order.
    /// Empty if the table has no primary key.
    pub fn primary_key(&mut self, schema: &str, table: &str) -> Result<Vec<String>> {
        let outcome = self.executor.query_params(
            "SELECT a.attname \
             FROM pg_constraint c \
             JOIN pg_class t ON t.oid = c.conrelid \
             JOIN pg_namespace n ON n.oid = t.relnamespace \
             JOIN unnest(c.conkey) WITH ORDINALITY AS k(attnum, ord) ON true \
             JOIN pg_attribute a ON a.attrelid = t.oid AND a.attnum = k.attnum \
             WHERE n.nspname = $1 AND t.relname = $2 AND c.contype = 'p' \
             ORDER BY k.ord",
            &[schema, table],
        )?;

        rows_to_strings(&outcome)
    }

    /// NOT NULL columns of `schema.table` (base schema only).
    pub fn not_null_columns(&mut self, schema: &str, table: &str) -> Result<BTreeSet<String>> {
        let outcome = self.executor.query_params(
            "SELECT column_name FROM information_schema.columns \
             WHERE table_schema = $1 AND table_name = $2 AND is_nullable = 'NO'",
            &[schema, table],
        )?;

        Ok(rows_to_strings(&outcome)?.into_iter().collect())
    }

    /// Foreign keys declared on `schema.table`, preserving ordinal column
    /// position within each key.
    pub fn foreign_keys(&mut self, schema: &str, table: &str) -> Result<Vec<ForeignKeyDescriptor>> {
        let outcome = self.executor.query_params(
            "SELECT \
               c.conname, \
               array_agg(la.attname ORDER BY k.ord) AS local_cols, \
               rn.nspname AS ref_schema, \
               rt.relname AS ref_table, \
               array_agg(ra.attname ORDER BY k.ord) AS ref_cols \
             FROM pg_constraint c \
             JOIN pg_class t ON t.oid = c.conrelid \
             JOIN pg_namespace n ON n.oid = t.relnamespace \
             JOIN pg_class rt ON rt.oid = c.confrelid \
             JOIN pg_namespace rn ON rn.oid = rt.relnamespace \
             JOIN unnest(c.conkey, c.confkey) WITH ORDINALITY AS k(lattnum, rattnum, ord) ON true \
             JOIN pg_attribute la ON la.attrelid = t.oid AND la.attnum = k.lattnum \
             JOIN pg_attribute ra ON ra.attrelid = rt.oid AND ra.attnum = k.rattnum \
             WHERE n.nspname = $1 AND t.relname = $2 AND c.contype = 'f' \
             GROUP BY c.conname, rn.nspname, rt.relname \
             ORDER BY c.conname",
            &[schema, table],
        )?;

        let mut result = Vec::with_capacity(outcome.rows.len());
        for row in &outcome.rows {
            let name = expect_text(row, 0, "conname")?;
            let local_columns = expect_text_array(row, 1, "local_cols")?;
            let ref_schema = expect_text(row, 2, "ref_schema")?;
            let ref_table = expect_text(row, 3, "ref_table")?;
            let ref_columns = expect_text_array(row, 4, "ref_cols")?;

            result.push(ForeignKeyDescriptor {
                name,
                local_columns,
                ref_schema,
                ref_table,
                ref_columns,
            });
        }

        Ok(result)
    }

    /// Check constraints on `schema.table`, filtered to exclude constraints
    /// auto-generated to enforce a domain's NOT NULL rule. A
    /// user-authored `CHECK (col IS NOT NULL)` is filtered out the same way,
    /// since its effect duplicates the NOT-NULL QA family.
    pub fn check_constraints(
        &mut self,
        schema: &str,
        table: &str,
    ) -> Result<Vec<CheckConstraintDescriptor>> {
        let outcome = self.executor.query_params(
            "SELECT c.conname, pg_get_constraintdef(c.oid, true) AS definition \
             FROM pg_constraint c \
             JOIN pg_class t ON t.oid = c.conrelid \
             JOIN pg_namespace n ON n.oid = t.relnamespace \
             WHERE n.nspname = $1 AND t.relname = $2 AND c.contype = 'c' \
             ORDER BY c.conname",
            &[schema, table],
        )?;

        let mut result = Vec::new();
        for row in &outcome.rows {
            let name = expect_text(row, 0, "conname")?;
            let definition = expect_text(row, 1, "definition")?;

            let Some(expression) = extract_check_expression(&definition) else {
                continue;
            };

            if is_not_null_shaped(&expression) {
                continue;
            }

            result.push(CheckConstraintDescriptor { name, expression });
        }

        Ok(result)
    }

    /// Builds the full descriptor for one configured table, validating the
    /// staging/base shape invariant along the way.
    pub fn build_descriptor(
        &mut self,
        base_schema: &str,
        staging_schema: &str,
        table: &str,
        exclude_cols: &BTreeSet<String>,
        exclude_null_check_cols: &BTreeSet<String>,
    ) -> Result<TableDescriptor> {
        if !self.table_exists(staging_schema, table)? {
            return Err(PgUpsertError::schema(format!(
                "staging table \"{staging_schema}\".\"{table}\" does not exist"
            )));
        }

        if !self.table_exists(base_schema, table)? {
            return Err(PgUpsertError::schema(format!(
                "base table \"{base_schema}\".\"{table}\" does not exist"
            )));
        }

        let base_columns = self.columns(base_schema, table)?;
        let staging_columns: BTreeSet<String> =
            self.columns(staging_schema, table)?.into_iter().collect();

        let dml_columns: Vec<String> = base_columns
            .iter()
            .filter(|c| !exclude_cols.contains(*c))
            .cloned()
            .collect();

        let missing: Vec<&String> = dml_columns
            .iter()
            .filter(|c| !staging_columns.contains(*c))
            .collect();

        if !missing.is_empty() {
            let names = missing
                .iter()
                .map(|s| s.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            return Err(PgUpsertError::schema(format!(
                "staging table \"{staging_schema}\".\"{table}\" is missing column(s) \
                 required by the base table's DML column list: {names}"
            )));
        }

        let common_columns: Vec<String> = base_columns
            .into_iter()
            .filter(|c| staging_columns.contains(c))
            .collect();

        let primary_key = self.primary_key(base_schema, table)?;

        let not_null_columns: BTreeSet<String> = self
            .not_null_columns(base_schema, table)?
            .into_iter()
            .filter(|c| !exclude_null_check_cols.contains(c))
            .filter(|c| common_columns.contains(c))
            .collect();

        let foreign_keys = self.foreign_keys(base_schema, table)?;
        let check_constraints = self.check_constraints(base_schema, table)?;

        Ok(TableDescriptor {
            name: table.to_string(),
            base_schema: base_schema.to_string(),
            staging_schema: staging_schema.to_string(),
            common_columns,
            dml_columns,
            primary_key,
            not_null_columns,
            foreign_keys,
            check_constraints,
        })
    }
}

fn rows_to_strings(outcome: &crate::executor::QueryOutcome) -> Result<Vec<String>> {
    outcome
        .rows
        .iter()
        .map(|row| match row.first() {
            Some(Value::Text(s)) => Ok(s.clone()),
            other => Err(PgUpsertError::invariant(format!(
                "expected text column, got {other:?}"
            ))),
        })
        .collect()
}

fn expect_text(row: &[Value], idx: usize, field: &str) -> Result<String> {
    match row.get(idx) {
        Some(Value::Text(s)) => Ok(s.clone()),
        other => Err(PgUpsertError::invariant(format!(
            "expected text for '{field}', got {other:?}"
        ))),
    }
}

fn expect_text_array(row: &[Value], idx: usize, field: &str) -> Result<Vec<String>> {
    // array_agg(text) is delivered by the driver as a comma-separated Text
    // value wrapped in braces (PostgreSQL's default array text format),
    // since `Value` has no array-of-text variant for driver-independence.
    let raw = expect_text(row, idx, field)?;
    Ok(parse_pg_text_array(&raw))
}

/// Parses PostgreSQL's default array text representation, e.g. `{a,b,c}`.
/// Does not handle quoted elements containing commas or braces. Catalog
/// identifiers never need that.
fn parse_pg_text_array(raw: &str) -> Vec<String> {
    let trimmed = raw.trim().trim_start_matches('{').trim_end_matches('}');
    if trimmed.is_empty() {
        return Vec::new();
    }
    trimmed
        .split(',')
        .map(|s| s.trim().trim_matches('"').to_string())
        .collect()
}

/// Strips the `CHECK (...)` wrapper `pg_get_constraintdef` returns, leaving
/// the bare predicate expression.
fn extract_check_expression(definition: &str) -> Option<String> {
    let trimmed = definition.trim();
    let inner = trimmed
        .strip_prefix("CHECK (")
        .or_else(|| trimmed.strip_prefix("CHECK ("))?;
    inner.strip_suffix(')').map(|s| s.trim().to_string())
}

fn is_not_null_shaped(expression: &str) -> bool {
    let normalized = expression.to_ascii_uppercase();
    normalized.ends_with("IS NOT NULL") && !normalized.contains(" AND ") && !normalized.contains(" OR ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_pg_text_array() {
        assert_eq!(
            parse_pg_text_array("{book_id,author_id}"),
            vec!["book_id".to_string(), "author_id".to_string()]
        );
        assert_eq!(parse_pg_text_array("{}"), Vec::<String>::new());
    }

    #[test]
    fn extracts_check_expression_from_definition() {
        assert_eq!(
            extract_check_expression("CHECK ((first_name <> last_name))").unwrap(),
            "(first_name <> last_name)"
        );
    }

    #[test]
    fn recognizes_not_null_shaped_expressions() {
        assert!(is_not_null_shaped("book_title IS NOT NULL"));
        assert!(!is_not_null_shaped(
            "book_title IS NOT NULL AND genre IS NOT NULL"
        ));
        assert!(!is_not_null_shaped("first_name <> last_name"));
    }
}
