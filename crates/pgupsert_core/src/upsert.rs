//! The upsert engine: synthesizes and runs the `UPDATE`/`INSERT` statements
//! that merge staging data into the base table.

use crate::control::ControlTable;
use crate::descriptor::TableDescriptor;
use crate::error::Result;
use crate::executor::QueryExecutor;
use crate::identifier::quote;
use crate::prompter::{ConfirmationPrompter, PromptDecision, SampleRows};

const SAMPLE_LIMIT: i64 = 1000;

pub struct UpsertEngine<'a> {
    executor: &'a mut dyn QueryExecutor,
}

/// How `upsert_one` resolved for one table. The orchestrator uses this to
/// decide whether to continue or roll back the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Applied,
    /// QA had not passed for this table; it was left untouched. Not itself
    /// an error. The run-wide QA gate is what turns a failed table into a
    /// failed run.
    SkippedQaNotPassed,
    Cancelled,
}

impl<'a> UpsertEngine<'a> {
    pub fn new(executor: &'a mut dyn QueryExecutor) -> Self {
        Self { executor }
    }

    /// Runs `upsert_one` for every table in `descriptors`, in configuration
    /// order, stopping at the first cancellation.
    pub fn upsert_all(
        &mut self,
        descriptors: &[TableDescriptor],
        method: crate::config::UpsertMethod,
        control: &mut ControlTable,
        prompter: &mut dyn ConfirmationPrompter,
    ) -> Result<UpsertOutcome> {
        for descriptor in descriptors {
            let interactive = control
                .get(&descriptor.name)
                .map(|r| r.interactive)
                .unwrap_or(false);

            match self.upsert_one(descriptor, method, control, prompter, interactive)? {
                UpsertOutcome::Cancelled => return Ok(UpsertOutcome::Cancelled),
                UpsertOutcome::Applied | UpsertOutcome::SkippedQaNotPassed => {}
            }
        }

        Ok(UpsertOutcome::Applied)
    }

    /// Merges staging into base for one table, per `method`.
    pub fn upsert_one(
        &mut self,
        descriptor: &TableDescriptor,
        method: crate::config::UpsertMethod,
        control: &mut ControlTable,
        prompter: &mut dyn ConfirmationPrompter,
        interactive: bool,
    ) -> Result<UpsertOutcome> {
        use crate::config::UpsertMethod as M;

        let qa_passed = control
            .get(&descriptor.name)
            .map(|r| r.qa_passed())
            .unwrap_or(false);
        if !qa_passed {
            log::warn!(
                "skipping upsert for {}: QA had not passed for this table",
                descriptor.name
            );
            return Ok(UpsertOutcome::SkippedQaNotPassed);
        }

        if !descriptor.has_primary_key() && method != M::Insert {
            return Err(crate::error::PgUpsertError::schema(format!(
                "table \"{}\" has no primary key; upsert method '{method}' requires one \
                 (use --upsert-method insert)",
                descriptor.name
            )));
        }

        if matches!(method, M::Update | M::Upsert) {
            match self.run_update(descriptor, control, prompter, interactive)? {
                PromptDecision::Cancel => return Ok(UpsertOutcome::Cancelled),
                _ => {}
            }
        }

        if matches!(method, M::Insert | M::Upsert) {
            match self.run_insert(descriptor, control, prompter, interactive)? {
                PromptDecision::Cancel => return Ok(UpsertOutcome::Cancelled),
                _ => {}
            }
        }

        Ok(UpsertOutcome::Applied)
    }

    fn run_update(
        &mut self,
        descriptor: &TableDescriptor,
        control: &mut ControlTable,
        prompter: &mut dyn ConfirmationPrompter,
        interactive: bool,
    ) -> Result<PromptDecision> {
        let update_cols = descriptor.update_set_columns();
        if update_cols.is_empty() {
            // Every DML column is part of the primary key; nothing to set.
            return Ok(PromptDecision::Skip);
        }

        let pk_equality = pk_equality_clause(&descriptor.primary_key);
        let distinct_predicate = distinct_from_predicate(&update_cols);
        let set_clause = update_cols
            .iter()
            .map(|c| format!("{} = s.{}", quote(c), quote(c)))
            .collect::<Vec<_>>()
            .join(", ");

        if interactive {
            let preview_sql = format!(
                "SELECT s.* FROM {} s JOIN {} b ON {pk_equality} \
                 WHERE {distinct_predicate} LIMIT {}",
                descriptor.staging_ident(),
                descriptor.base_ident(),
                SAMPLE_LIMIT + 1,
            );
            let outcome = self.executor.query(&preview_sql)?;
            let truncated = outcome.rows.len() as i64 > SAMPLE_LIMIT;
            let sample = SampleRows {
                columns: outcome.columns,
                rows: outcome.rows.into_iter().take(SAMPLE_LIMIT as usize).collect(),
                truncated,
            };

            let decision = prompter.confirm(
                "Update preview",
                &format!("About to update rows of {} from staging.", descriptor.base_ident()),
                Some(&sample),
            );
            match decision {
                PromptDecision::Cancel => return Ok(PromptDecision::Cancel),
                PromptDecision::Skip => return Ok(PromptDecision::Skip),
                PromptDecision::Proceed => {}
            }
        }

        let sql = format!(
            "UPDATE {} b SET {set_clause} FROM {} s WHERE {pk_equality} AND {distinct_predicate}",
            descriptor.base_ident(),
            descriptor.staging_ident(),
        );
        let affected = self.executor.exec(&sql)?;
        control.record_updated(&descriptor.name, affected);

        Ok(PromptDecision::Proceed)
    }

    fn run_insert(
        &mut self,
        descriptor: &TableDescriptor,
        control: &mut ControlTable,
        prompter: &mut dyn ConfirmationPrompter,
        interactive: bool,
    ) -> Result<PromptDecision> {
        let insert_cols = &descriptor.dml_columns;
        let insert_col_list = insert_cols
            .iter()
            .map(|c| quote(c))
            .collect::<Vec<_>>()
            .join(", ");

        let not_exists_clause = if descriptor.has_primary_key() {
            let pk_equality = pk_equality_clause(&descriptor.primary_key);
            format!(
                "WHERE NOT EXISTS (SELECT 1 FROM {} b WHERE {pk_equality})",
                descriptor.base_ident()
            )
        } else {
            // No primary key: insert all staging rows.
            String::new()
        };

        if interactive {
            let preview_sql = format!(
                "SELECT s.* FROM {} s {not_exists_clause} LIMIT {}",
                descriptor.staging_ident(),
                SAMPLE_LIMIT + 1,
            );
            let outcome = self.executor.query(&preview_sql)?;
            let truncated = outcome.rows.len() as i64 > SAMPLE_LIMIT;
            let sample = SampleRows {
                columns: outcome.columns,
                rows: outcome.rows.into_iter().take(SAMPLE_LIMIT as usize).collect(),
                truncated,
            };

            let decision = prompter.confirm(
                "Insert preview",
                &format!("About to insert rows of {} from staging.", descriptor.base_ident()),
                Some(&sample),
            );
            match decision {
                PromptDecision::Cancel => return Ok(PromptDecision::Cancel),
                PromptDecision::Skip => return Ok(PromptDecision::Skip),
                PromptDecision::Proceed => {}
            }
        }

        let sql = format!(
            "INSERT INTO {} ({insert_col_list}) SELECT {insert_col_list} FROM {} s {not_exists_clause}",
            descriptor.base_ident(),
            descriptor.staging_ident(),
        );
        let affected = self.executor.exec(&sql)?;
        control.record_inserted(&descriptor.name, affected);

        Ok(PromptDecision::Proceed)
    }
}

/// `b."col1" = s."col1" AND b."col2" = s."col2" …` over the primary key
/// columns.
fn pk_equality_clause(pk: &[String]) -> String {
    pk.iter()
        .map(|c| format!("b.{} = s.{}", quote(c), quote(c)))
        .collect::<Vec<_>>()
        .join(" AND ")
}

/// Builds `(b.c1 IS DISTINCT FROM s.c1 OR b.c2 IS DISTINCT FROM s.c2 …)`.
/// True when at least one non-PK column differs. An UPDATE never rewrites
/// a row whose values already match.
fn distinct_from_predicate(cols: &[String]) -> String {
    let clauses = cols
        .iter()
        .map(|c| format!("b.{} IS DISTINCT FROM s.{}", quote(c), quote(c)))
        .collect::<Vec<_>>()
        .join(" OR ");
    format!("({clauses})")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pk_equality_clause_joins_columns_with_and() {
        assert_eq!(
            pk_equality_clause(&["book_id".to_string()]),
            "b.\"book_id\" = s.\"book_id\""
        );
        assert_eq!(
            pk_equality_clause(&["author_id".to_string(), "book_id".to_string()]),
            "b.\"author_id\" = s.\"author_id\" AND b.\"book_id\" = s.\"book_id\""
        );
    }

    #[test]
    fn distinct_from_predicate_ors_columns() {
        assert_eq!(
            distinct_from_predicate(&["title".to_string(), "genre".to_string()]),
            "(b.\"title\" IS DISTINCT FROM s.\"title\" OR b.\"genre\" IS DISTINCT FROM s.\"genre\")"
        );
    }

}
