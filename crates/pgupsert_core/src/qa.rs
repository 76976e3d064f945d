//! The QA engine: four independent check families run against staging data,
//! per table, in a fixed order.
//!
//! No family short-circuits another. A NOT-NULL failure on a table does not
//! skip its PK/FK/CK checks. Findings accumulate into the control table's
//! append-only error fields.

use crate::control::{ControlField, ControlTable};
use crate::descriptor::TableDescriptor;
use crate::error::Result;
use crate::executor::QueryExecutor;
use crate::identifier::quote;
use crate::prompter::{ConfirmationPrompter, PromptDecision, SampleRows};

/// Upper bound on sample rows shown to an interactive prompter.
const SAMPLE_LIMIT: i64 = 1000;

pub struct QAEngine<'a> {
    executor: &'a mut dyn QueryExecutor,
}

impl<'a> QAEngine<'a> {
    pub fn new(executor: &'a mut dyn QueryExecutor) -> Self {
        Self { executor }
    }

    /// Runs all four check families for every table in `descriptors`, in
    /// configuration order, writing findings into `control`.
    ///
    /// Returns `Cancel` if the operator cancels out of an interactive
    /// sample prompt; the orchestrator is responsible for rolling back when
    /// that happens. Otherwise QA always completes for every table. The
    /// pass/fail verdict lives in `control`, not in this return value.
    pub fn qa_all(
        &mut self,
        descriptors: &[TableDescriptor],
        control: &mut ControlTable,
        prompter: &mut dyn ConfirmationPrompter,
    ) -> Result<QaOutcome> {
        for descriptor in descriptors {
            let interactive = control
                .get(&descriptor.name)
                .map(|r| r.interactive)
                .unwrap_or(false);

            if self.qa_not_null(descriptor, control)? == QaOutcome::Cancelled {
                return Ok(QaOutcome::Cancelled);
            }
            if self.qa_primary_key(descriptor, control, prompter, interactive)?
                == QaOutcome::Cancelled
            {
                return Ok(QaOutcome::Cancelled);
            }
            if self.qa_foreign_keys(descriptor, control, prompter, interactive)?
                == QaOutcome::Cancelled
            {
                return Ok(QaOutcome::Cancelled);
            }
            self.qa_check_constraints(descriptor, control)?;
        }

        Ok(QaOutcome::Completed)
    }

    /// Counts staging NULLs in each base NOT NULL column not excluded by
    /// configuration; appends one `"<column> (<count>)"` fragment per
    /// offending column.
    pub fn qa_not_null(
        &mut self,
        descriptor: &TableDescriptor,
        control: &mut ControlTable,
    ) -> Result<QaOutcome> {
        for column in &descriptor.not_null_columns {
            let quoted_column = quote(column);
            let sql = format!(
                "SELECT COUNT(*) FROM {} WHERE {} IS NULL",
                descriptor.staging_ident(),
                quoted_column
            );
            let count = self.executor.query(&sql)?.scalar_i64().unwrap_or(0);

            if count > 0 {
                control.append_error(
                    &descriptor.name,
                    ControlField::NullErrors,
                    &format!("{column} ({count})"),
                );
            }
        }

        Ok(QaOutcome::Completed)
    }

    /// Finds duplicate primary key groups in staging. A NULL in a PK
    /// column forms its own distinct "missing" group, matching `GROUP BY`'s
    /// ordinary NULL-equals-NULL grouping semantics.
    pub fn qa_primary_key(
        &mut self,
        descriptor: &TableDescriptor,
        control: &mut ControlTable,
        prompter: &mut dyn ConfirmationPrompter,
        interactive: bool,
    ) -> Result<QaOutcome> {
        if descriptor.primary_key.is_empty() {
            return Ok(QaOutcome::Completed);
        }

        let pk_cols = descriptor
            .primary_key
            .iter()
            .map(|c| quote(c))
            .collect::<Vec<_>>()
            .join(", ");

        let sql = format!(
            "SELECT {pk_cols}, COUNT(*) AS dup_count FROM {} \
             GROUP BY {pk_cols} HAVING COUNT(*) > 1",
            descriptor.staging_ident()
        );
        let outcome = self.executor.query(&sql)?;

        if outcome.rows.is_empty() {
            return Ok(QaOutcome::Completed);
        }

        let group_count = outcome.rows.len() as i64;
        let last_col = outcome.columns.len().saturating_sub(1);
        let total_rows: i64 = outcome
            .rows
            .iter()
            .filter_map(|r| r.get(last_col))
            .filter_map(|v| match v {
                crate::value::Value::Int(i) => Some(*i),
                _ => None,
            })
            .sum();

        control.append_error(
            &descriptor.name,
            ControlField::PkErrors,
            &format!(
                "{group_count} duplicate keys ({total_rows} rows) in table {}.{}",
                descriptor.staging_schema, descriptor.name
            ),
        );

        if interactive {
            let sample = self.sample_duplicate_pk_rows(descriptor, &pk_cols)?;
            let message = format!(
                "{group_count} duplicate primary key group(s) ({total_rows} row(s)) found in {}.",
                descriptor.staging_ident()
            );
            let decision = prompter.confirm("Duplicate primary keys", &message, Some(&sample));
            if decision == PromptDecision::Cancel {
                return Ok(QaOutcome::Cancelled);
            }
        }

        Ok(QaOutcome::Completed)
    }

    fn sample_duplicate_pk_rows(
        &mut self,
        descriptor: &TableDescriptor,
        pk_cols: &str,
    ) -> Result<SampleRows> {
        let sql = format!(
            "SELECT s.* FROM {} s WHERE ({pk_cols}) IN (\
               SELECT {pk_cols} FROM {} GROUP BY {pk_cols} HAVING COUNT(*) > 1\
             ) LIMIT {}",
            descriptor.staging_ident(),
            descriptor.staging_ident(),
            SAMPLE_LIMIT + 1,
        );
        let outcome = self.executor.query(&sql)?;
        let truncated = outcome.rows.len() as i64 > SAMPLE_LIMIT;
        let rows = outcome.rows.into_iter().take(SAMPLE_LIMIT as usize).collect();

        Ok(SampleRows {
            columns: outcome.columns,
            rows,
            truncated,
        })
    }

    /// Staging rows whose FK column values have no match in the
    /// referenced table. Rows with any local column NULL are excluded.
    /// That is the NOT-NULL check's job, not this one's.
    pub fn qa_foreign_keys(
        &mut self,
        descriptor: &TableDescriptor,
        control: &mut ControlTable,
        prompter: &mut dyn ConfirmationPrompter,
        interactive: bool,
    ) -> Result<QaOutcome> {
        for fk in &descriptor.foreign_keys {
            let local_cols = fk
                .local_columns
                .iter()
                .map(|c| quote(c))
                .collect::<Vec<_>>()
                .join(", ");
            let ref_cols = fk
                .ref_columns
                .iter()
                .map(|c| quote(c))
                .collect::<Vec<_>>()
                .join(", ");
            // fk.ref_table/ref_schema come from pg_catalog, not configuration.
            // Already known-safe identifiers; no re-validation.
            let ref_table = crate::identifier::qualified_table(&fk.ref_schema, &fk.ref_table);
            let not_null_guard = fk
                .local_columns
                .iter()
                .map(|c| format!("{} IS NOT NULL", quote(c)))
                .collect::<Vec<_>>()
                .join(" AND ");

            let sql = format!(
                "SELECT COUNT(*) FROM (\
                   SELECT {local_cols} FROM {} \
                   WHERE ({not_null_guard}) \
                     AND ({local_cols}) NOT IN (SELECT {ref_cols} FROM {ref_table}) \
                 ) AS violations",
                descriptor.staging_ident(),
            );
            let count = self.executor.query(&sql)?.scalar_i64().unwrap_or(0);

            if count > 0 {
                control.append_error(
                    &descriptor.name,
                    ControlField::FkErrors,
                    &format!("{} ({count})", fk.name),
                );

                if interactive {
                    let sample = self.sample_fk_violation_rows(
                        descriptor,
                        &local_cols,
                        &ref_cols,
                        &ref_table,
                        &not_null_guard,
                    )?;
                    let message = format!(
                        "{count} row(s) in {} violate foreign key \"{}\".",
                        descriptor.staging_ident(),
                        fk.name
                    );
                    let decision =
                        prompter.confirm("Foreign key violation", &message, Some(&sample));
                    if decision == PromptDecision::Cancel {
                        return Ok(QaOutcome::Cancelled);
                    }
                }
            }
        }

        Ok(QaOutcome::Completed)
    }

    fn sample_fk_violation_rows(
        &mut self,
        descriptor: &TableDescriptor,
        local_cols: &str,
        ref_cols: &str,
        ref_table: &str,
        not_null_guard: &str,
    ) -> Result<SampleRows> {
        let sql = format!(
            "SELECT s.* FROM {} s \
             WHERE ({not_null_guard}) \
               AND ({local_cols}) NOT IN (SELECT {ref_cols} FROM {ref_table}) \
             LIMIT {}",
            descriptor.staging_ident(),
            SAMPLE_LIMIT + 1,
        );
        let outcome = self.executor.query(&sql)?;
        let truncated = outcome.rows.len() as i64 > SAMPLE_LIMIT;
        let rows = outcome.rows.into_iter().take(SAMPLE_LIMIT as usize).collect();

        Ok(SampleRows {
            columns: outcome.columns,
            rows,
            truncated,
        })
    }

    /// Counts staging rows for which the check expression evaluates to
    /// false. A NULL result does not count as a violation, mirroring the
    /// database's own three-valued `CHECK` semantics: a `CHECK` constraint
    /// only rejects a row when its expression is definitely false. No
    /// interactive prompt; there is no concise sample to show for an
    /// arbitrary boolean expression.
    pub fn qa_check_constraints(
        &mut self,
        descriptor: &TableDescriptor,
        control: &mut ControlTable,
    ) -> Result<()> {
        for ck in &descriptor.check_constraints {
            let sql = format!(
                "SELECT COUNT(*) FROM {} WHERE NOT ({})",
                descriptor.staging_ident(),
                ck.expression
            );
            let count = self.executor.query(&sql)?.scalar_i64().unwrap_or(0);

            if count > 0 {
                control.append_error(
                    &descriptor.name,
                    ControlField::CkErrors,
                    &format!("{} ({count})", ck.name),
                );
            }
        }

        Ok(())
    }

    /// Programmatic entry point for a single table's NOT-NULL check, for
    /// callers that want to run one family at a time rather than `qa_all`.
    pub fn qa_one_null(
        &mut self,
        descriptor: &TableDescriptor,
        control: &mut ControlTable,
    ) -> Result<QaOutcome> {
        self.qa_not_null(descriptor, control)
    }

    /// Programmatic entry point for a single table's primary key check.
    pub fn qa_one_pk(
        &mut self,
        descriptor: &TableDescriptor,
        control: &mut ControlTable,
        prompter: &mut dyn ConfirmationPrompter,
        interactive: bool,
    ) -> Result<QaOutcome> {
        self.qa_primary_key(descriptor, control, prompter, interactive)
    }

    /// Programmatic entry point for a single table's foreign key checks.
    pub fn qa_one_fk(
        &mut self,
        descriptor: &TableDescriptor,
        control: &mut ControlTable,
        prompter: &mut dyn ConfirmationPrompter,
        interactive: bool,
    ) -> Result<QaOutcome> {
        self.qa_foreign_keys(descriptor, control, prompter, interactive)
    }

    /// Programmatic entry point for a single table's check constraint checks.
    pub fn qa_one_ck(&mut self, descriptor: &TableDescriptor, control: &mut ControlTable) -> Result<()> {
        self.qa_check_constraints(descriptor, control)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QaOutcome {
    Completed,
    Cancelled,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{CheckConstraintDescriptor, TableDescriptor};
    use crate::testutil::ScriptedExecutor;
    use std::collections::BTreeSet;

    fn descriptor() -> TableDescriptor {
        TableDescriptor {
            name: "books".to_string(),
            base_schema: "public".to_string(),
            staging_schema: "staging".to_string(),
            common_columns: vec!["book_id".to_string(), "book_title".to_string()],
            dml_columns: vec!["book_id".to_string(), "book_title".to_string()],
            primary_key: vec![],
            not_null_columns: BTreeSet::from(["book_title".to_string()]),
            foreign_keys: vec![],
            check_constraints: vec![],
        }
    }

    #[test]
    fn not_null_qa_appends_fragment_when_violations_found() {
        let mut exec = ScriptedExecutor::new().expect_scalar(
            "SELECT COUNT(*) FROM \"staging\".\"books\" WHERE \"book_title\" IS NULL",
            1,
        );
        let mut control = ControlTable::create();
        control.seed("books", false, false, false);

        QAEngine::new(&mut exec)
            .qa_not_null(&descriptor(), &mut control)
            .unwrap();

        assert_eq!(control.get("books").unwrap().null_errors, "book_title (1)");
    }

    #[test]
    fn not_null_qa_leaves_field_empty_when_no_violations() {
        let mut exec = ScriptedExecutor::new().expect_scalar(
            "SELECT COUNT(*) FROM \"staging\".\"books\" WHERE \"book_title\" IS NULL",
            0,
        );
        let mut control = ControlTable::create();
        control.seed("books", false, false, false);

        QAEngine::new(&mut exec)
            .qa_not_null(&descriptor(), &mut control)
            .unwrap();

        assert!(control.get("books").unwrap().null_errors.is_empty());
    }

    #[test]
    fn check_constraint_qa_appends_fragment_per_failing_constraint() {
        let mut d = descriptor();
        d.check_constraints.push(CheckConstraintDescriptor {
            name: "books_title_not_blank".to_string(),
            expression: "book_title <> ''".to_string(),
        });

        let mut exec = ScriptedExecutor::new().expect_scalar(
            "SELECT COUNT(*) FROM \"staging\".\"books\" WHERE NOT (book_title <> '')",
            2,
        );
        let mut control = ControlTable::create();
        control.seed("books", false, false, false);

        QAEngine::new(&mut exec)
            .qa_check_constraints(&d, &mut control)
            .unwrap();

        assert_eq!(
            control.get("books").unwrap().ck_errors,
            "books_title_not_blank (2)"
        );
    }

    #[test]
    fn primary_key_qa_skips_when_table_has_no_primary_key() {
        let mut exec = ScriptedExecutor::new();
        let mut control = ControlTable::create();
        control.seed("books", false, false, false);
        let mut prompter = crate::prompter::SilentPrompter;

        let outcome = QAEngine::new(&mut exec)
            .qa_primary_key(&descriptor(), &mut control, &mut prompter, false)
            .unwrap();

        assert_eq!(outcome, QaOutcome::Completed);
        assert!(control.get("books").unwrap().pk_errors.is_empty());
    }
}
