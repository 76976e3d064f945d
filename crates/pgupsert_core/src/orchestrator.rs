//! Top-level run sequencing.
//!
//! The orchestrator owns the single database session and the control table
//! for the duration of a run and drives them through one transaction:
//! catalog discovery, QA, and (if QA passes) the upsert pass, followed by a
//! single commit-all or rollback-none. Modeled as a tagged outcome rather
//! than an exception. The CLI boundary maps the outcome onto an exit code.

use crate::catalog::CatalogInspector;
use crate::config::Configuration;
use crate::control::ControlTable;
use crate::descriptor::TableDescriptor;
use crate::error::{PgUpsertError, Result};
use crate::executor::QueryExecutor;
use crate::prompter::ConfirmationPrompter;
use crate::qa::{QAEngine, QaOutcome};
use crate::summary::{render_table, snapshot, ControlSnapshotRow};
use crate::upsert::{UpsertEngine, UpsertOutcome};

/// The terminal state of a run. Every variant corresponds to one of the
/// process exit codes the CLI returns.
#[derive(Debug)]
pub enum RunOutcome {
    /// QA passed, the upsert pass completed, and the transaction committed
    /// (or was rolled back intentionally because `do_commit` was false).
    Committed { snapshot: Vec<ControlSnapshotRow> },
    /// One or more tables had non-empty QA error fields; nothing was
    /// written, the transaction rolled back.
    RolledBackQaFailed { snapshot: Vec<ControlSnapshotRow> },
    /// The operator cancelled via the prompter; the transaction rolled
    /// back.
    RolledBackCancelled { snapshot: Vec<ControlSnapshotRow> },
    /// A database or schema error aborted the run; the transaction rolled
    /// back (when a session was open to roll back).
    RolledBackError { source: PgUpsertError },
}

impl RunOutcome {
    pub fn exit_code(&self) -> i32 {
        match self {
            RunOutcome::Committed { .. } => 0,
            RunOutcome::RolledBackQaFailed { .. } => 2,
            RunOutcome::RolledBackCancelled { .. } => 3,
            RunOutcome::RolledBackError { source } => source.exit_code(),
        }
    }
}

pub struct Orchestrator<'a> {
    executor: &'a mut dyn QueryExecutor,
    config: Configuration,
}

impl<'a> Orchestrator<'a> {
    pub fn new(executor: &'a mut dyn QueryExecutor, config: Configuration) -> Self {
        Self { executor, config }
    }

    /// Runs the full validate-then-upsert sequence for every configured table.
    pub fn run(&mut self, prompter: &mut dyn ConfirmationPrompter) -> RunOutcome {
        match self.run_inner(prompter) {
            Ok(outcome) => outcome,
            Err(source) => {
                let _ = self.executor.rollback();
                log::error!("run aborted: {source}");
                RunOutcome::RolledBackError { source }
            }
        }
    }

    fn run_inner(&mut self, prompter: &mut dyn ConfirmationPrompter) -> Result<RunOutcome> {
        let descriptors = self.build_descriptors()?;

        let mut control = ControlTable::create();
        for table in &self.config.tables {
            control.seed(
                table,
                self.config.exclude_cols.contains(table),
                self.config.exclude_null_check_cols.contains(table),
                self.config.interactive,
            );
        }

        log::info!("running QA checks for {} table(s)", descriptors.len());
        let qa_outcome =
            QAEngine::new(self.executor).qa_all(&descriptors, &mut control, prompter)?;

        if qa_outcome == QaOutcome::Cancelled {
            let snapshot = snapshot(&control.records_in_order());
            self.executor.rollback()?;
            log::info!("Changes rolled back");
            control.drop_table();
            return Ok(RunOutcome::RolledBackCancelled { snapshot });
        }

        if !control.all_passed() {
            log::warn!("QA failed:\n{}", render_table(&control.records_in_order()));
            let snapshot = snapshot(&control.records_in_order());
            self.executor.rollback()?;
            log::info!("Changes rolled back");
            control.drop_table();
            return Ok(RunOutcome::RolledBackQaFailed { snapshot });
        }

        log::info!("QA passed for all tables; running upsert");
        let upsert_outcome = UpsertEngine::new(self.executor).upsert_all(
            &descriptors,
            self.config.upsert_method,
            &mut control,
            prompter,
        )?;

        if upsert_outcome == UpsertOutcome::Cancelled {
            let snapshot = snapshot(&control.records_in_order());
            self.executor.rollback()?;
            log::info!("Changes rolled back");
            control.drop_table();
            return Ok(RunOutcome::RolledBackCancelled { snapshot });
        }

        log::info!("run summary:\n{}", render_table(&control.records_in_order()));
        let snapshot = snapshot(&control.records_in_order());

        if self.config.do_commit {
            self.executor.commit()?;
            log::info!("Changes committed");
        } else {
            self.executor.rollback()?;
            log::info!("Changes rolled back");
        }

        control.drop_table();
        Ok(RunOutcome::Committed { snapshot })
    }

    fn build_descriptors(&mut self) -> Result<Vec<TableDescriptor>> {
        let mut inspector = CatalogInspector::new(self.executor);
        let mut descriptors = Vec::with_capacity(self.config.tables.len());

        for table in &self.config.tables {
            let descriptor = inspector.build_descriptor(
                &self.config.base_schema,
                &self.config.staging_schema,
                table,
                &self.config.exclude_cols,
                &self.config.exclude_null_check_cols,
            )?;

            if descriptor.primary_key.is_empty() && self.config.upsert_method != crate::config::UpsertMethod::Insert {
                return Err(PgUpsertError::schema(format!(
                    "table \"{table}\" has no primary key; upsert method '{}' requires one",
                    self.config.upsert_method
                )));
            }

            descriptors.push(descriptor);
        }

        Ok(descriptors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{RawConfiguration, UpsertMethod};
    use crate::prompter::SilentPrompter;
    use crate::testutil::ScriptedExecutor;
    use crate::value::Value;
    use crate::executor::QueryOutcome;

    fn raw_config(tables: Vec<&str>) -> RawConfiguration {
        RawConfiguration {
            host: "localhost".to_string(),
            port: 5432,
            database: "library".to_string(),
            user: "etl".to_string(),
            staging_schema: "staging".to_string(),
            base_schema: "public".to_string(),
            encoding: "utf-8".to_string(),
            tables: tables.into_iter().map(String::from).collect(),
            exclude_columns: vec![],
            null_columns: vec![],
            upsert_method: UpsertMethod::Upsert,
            commit: true,
            interactive: false,
            quiet: false,
            debug: false,
            logfile: None,
        }
    }

    fn rows(cols: Vec<&str>, data: Vec<Vec<Value>>) -> QueryOutcome {
        QueryOutcome {
            columns: cols.into_iter().map(String::from).collect(),
            rows: data,
        }
    }

    /// A single table with no constraints at all: QA trivially passes, and
    /// the insert phase runs against an empty staging table.
    #[test]
    fn happy_path_with_no_constraints_commits() {
        let config = Configuration::build(raw_config(vec!["genres"])).unwrap();

        let exec = ScriptedExecutor::new()
            .expect_bool(
                "SELECT EXISTS (SELECT 1 FROM information_schema.tables WHERE table_schema = $1 AND table_name = $2 )",
                true,
            )
            .expect_bool(
                "SELECT EXISTS (SELECT 1 FROM information_schema.tables WHERE table_schema = $1 AND table_name = $2 )",
                true,
            )
            .expect(
                "SELECT column_name FROM information_schema.columns WHERE table_schema = $1 AND table_name = $2 ORDER BY ordinal_position",
                rows(vec!["column_name"], vec![vec![Value::Text("genre".to_string())]]),
            )
            .expect(
                "SELECT column_name FROM information_schema.columns WHERE table_schema = $1 AND table_name = $2 ORDER BY ordinal_position",
                rows(vec!["column_name"], vec![vec![Value::Text("genre".to_string())]]),
            )
            .expect(
                "SELECT a.attname FROM pg_constraint c JOIN pg_class t ON t.oid = c.conrelid JOIN pg_namespace n ON n.oid = t.relnamespace JOIN unnest(c.conkey) WITH ORDINALITY AS k(attnum, ord) ON true JOIN pg_attribute a ON a.attrelid = t.oid AND a.attnum = k.attnum WHERE n.nspname = $1 AND t.relname = $2 AND c.contype = 'p' ORDER BY k.ord",
                rows(vec!["attname"], vec![vec![Value::Text("genre".to_string())]]),
            )
            .expect(
                "SELECT column_name FROM information_schema.columns WHERE table_schema = $1 AND table_name = $2 AND is_nullable = 'NO'",
                rows(vec!["column_name"], vec![]),
            )
            .expect(
                "SELECT c.conname, array_agg(la.attname ORDER BY k.ord) AS local_cols, rn.nspname AS ref_schema, rt.relname AS ref_table, array_agg(ra.attname ORDER BY k.ord) AS ref_cols FROM pg_constraint c JOIN pg_class t ON t.oid = c.conrelid JOIN pg_namespace n ON n.oid = t.relnamespace JOIN pg_class rt ON rt.oid = c.confrelid JOIN pg_namespace rn ON rn.oid = rt.relnamespace JOIN unnest(c.conkey, c.confkey) WITH ORDINALITY AS k(lattnum, rattnum, ord) ON true JOIN pg_attribute la ON la.attrelid = t.oid AND la.attnum = k.lattnum JOIN pg_attribute ra ON ra.attrelid = rt.oid AND ra.attnum = k.rattnum WHERE n.nspname = $1 AND t.relname = $2 AND c.contype = 'f' GROUP BY c.conname, rn.nspname, rt.relname ORDER BY c.conname",
                rows(vec![], vec![]),
            )
            .expect(
                "SELECT c.conname, pg_get_constraintdef(c.oid, true) AS definition FROM pg_constraint c JOIN pg_class t ON t.oid = c.conrelid JOIN pg_namespace n ON n.oid = t.relnamespace WHERE n.nspname = $1 AND t.relname = $2 AND c.contype = 'c' ORDER BY c.conname",
                rows(vec![], vec![]),
            )
            // QA: primary key duplicate check
            .expect(
                "SELECT \"genre\", COUNT(*) AS dup_count FROM \"staging\".\"genres\" GROUP BY \"genre\" HAVING COUNT(*) > 1",
                rows(vec![], vec![]),
            );

        let mut exec = exec;
        let mut orchestrator = Orchestrator::new(&mut exec, config);
        let outcome = orchestrator.run(&mut SilentPrompter);

        match outcome {
            RunOutcome::Committed { snapshot } => {
                assert_eq!(snapshot.len(), 1);
                assert!(snapshot[0].null_errors.is_empty());
            }
            other => panic!("expected Committed, got {other:?}"),
        }
        assert!(exec.committed);
        assert!(!exec.rolled_back);
    }

    #[test]
    fn missing_staging_table_rolls_back_with_schema_error() {
        let config = Configuration::build(raw_config(vec!["genres"])).unwrap();

        let mut exec = ScriptedExecutor::new().expect_bool(
            "SELECT EXISTS (SELECT 1 FROM information_schema.tables WHERE table_schema = $1 AND table_name = $2 )",
            false,
        );

        let mut orchestrator = Orchestrator::new(&mut exec, config);
        let outcome = orchestrator.run(&mut SilentPrompter);

        let exit_code = match outcome {
            RunOutcome::RolledBackError { ref source } => {
                assert!(matches!(source, PgUpsertError::Schema(_)));
                outcome.exit_code()
            }
            ref other => panic!("expected RolledBackError, got {other:?}"),
        };
        assert_eq!(exit_code, 1);
    }
}
