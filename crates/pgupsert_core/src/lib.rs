mod catalog;
mod config;
mod control;
mod descriptor;
mod error;
mod executor;
mod identifier;
mod orchestrator;
mod prompter;
mod qa;
mod summary;
mod upsert;
mod value;

#[cfg(test)]
mod testutil;

pub use catalog::CatalogInspector;
pub use config::{Configuration, RawConfiguration, UpsertMethod};
pub use control::{ControlField, ControlRecord, ControlTable};
pub use descriptor::{CheckConstraintDescriptor, ForeignKeyDescriptor, TableDescriptor};
pub use error::{PgUpsertError, Result};
pub use executor::{QueryExecutor, QueryOutcome, Row};
pub use identifier::{qualified_table, quote, validate};
pub use orchestrator::{Orchestrator, RunOutcome};
pub use prompter::{
    ConfirmationPrompter, GuiPrompter, PromptDecision, SampleRows, SilentPrompter, TerminalPrompter,
};
pub use qa::{QAEngine, QaOutcome};
pub use summary::{render_snapshot, render_table, snapshot, ControlSnapshotRow};
pub use upsert::{UpsertEngine, UpsertOutcome};
pub use value::Value;
