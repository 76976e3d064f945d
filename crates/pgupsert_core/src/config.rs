//! The configuration record: built once, then treated as read-only for the
//! remainder of the run.

use crate::error::PgUpsertError;
use crate::identifier;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

fn default_staging_schema() -> String {
    "staging".to_string()
}

fn default_base_schema() -> String {
    "public".to_string()
}

fn default_encoding() -> String {
    "utf-8".to_string()
}

fn default_port() -> u16 {
    5432
}

/// The merge strategy applied per table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UpsertMethod {
    /// Update matching rows, then insert unmatched ones.
    #[default]
    Upsert,
    /// Update matching rows only.
    Update,
    /// Insert unmatched rows only.
    Insert,
}

impl std::str::FromStr for UpsertMethod {
    type Err = PgUpsertError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "upsert" => Ok(Self::Upsert),
            "update" => Ok(Self::Update),
            "insert" => Ok(Self::Insert),
            other => Err(PgUpsertError::config(format!(
                "unknown upsert method '{other}', expected one of: upsert, update, insert"
            ))),
        }
    }
}

impl std::fmt::Display for UpsertMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Upsert => "upsert",
            Self::Update => "update",
            Self::Insert => "insert",
        };
        write!(f, "{s}")
    }
}

/// Raw fields as they arrive from CLI flags or a YAML config file, before
/// identifier validation. Mirrors the CLI long-flag names so the
/// YAML config file and `--generate-config` template line up field-for-field.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfiguration {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub database: String,
    pub user: String,
    #[serde(default = "default_staging_schema")]
    pub staging_schema: String,
    #[serde(default = "default_base_schema")]
    pub base_schema: String,
    #[serde(default = "default_encoding")]
    pub encoding: String,
    pub tables: Vec<String>,
    #[serde(default)]
    pub exclude_columns: Vec<String>,
    #[serde(default)]
    pub null_columns: Vec<String>,
    #[serde(default)]
    pub upsert_method: UpsertMethod,
    #[serde(default)]
    pub commit: bool,
    #[serde(default)]
    pub interactive: bool,
    #[serde(default)]
    pub quiet: bool,
    #[serde(default)]
    pub debug: bool,
    #[serde(default)]
    pub logfile: Option<String>,
}

impl RawConfiguration {
    pub fn from_yaml_str(s: &str) -> Result<Self, PgUpsertError> {
        serde_yaml::from_str(s)
            .map_err(|e| PgUpsertError::config(format!("invalid configuration file: {e}")))
    }

    pub fn from_yaml_file(path: &Path) -> Result<Self, PgUpsertError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }
}

/// The immutable, validated configuration record that the rest of the engine
/// is built from.
#[derive(Debug, Clone)]
pub struct Configuration {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub staging_schema: String,
    pub base_schema: String,
    pub encoding: String,
    pub tables: Vec<String>,
    pub upsert_method: UpsertMethod,
    pub do_commit: bool,
    pub interactive: bool,
    pub exclude_cols: BTreeSet<String>,
    pub exclude_null_check_cols: BTreeSet<String>,
}

impl Configuration {
    /// Validates every identifier in `raw` and builds the immutable record.
    ///
    /// This is the sole point at which table/column/schema names arriving
    /// from configuration are checked against the identifier grammar in
    /// [`crate::identifier`]. No query is run before this succeeds.
    pub fn build(raw: RawConfiguration) -> Result<Self, PgUpsertError> {
        if raw.tables.is_empty() {
            return Err(PgUpsertError::config(
                "at least one table must be configured",
            ));
        }

        identifier::validate(&raw.staging_schema)?;
        identifier::validate(&raw.base_schema)?;

        let mut tables = Vec::with_capacity(raw.tables.len());
        for table in &raw.tables {
            identifier::validate(table)?;
            tables.push(table.clone());
        }

        let mut exclude_cols = BTreeSet::new();
        for col in &raw.exclude_columns {
            identifier::validate(col)?;
            exclude_cols.insert(col.clone());
        }

        let mut exclude_null_check_cols = BTreeSet::new();
        for col in &raw.null_columns {
            identifier::validate(col)?;
            exclude_null_check_cols.insert(col.clone());
        }

        Ok(Self {
            host: raw.host,
            port: raw.port,
            database: raw.database,
            user: raw.user,
            staging_schema: raw.staging_schema,
            base_schema: raw.base_schema,
            encoding: raw.encoding,
            tables,
            upsert_method: raw.upsert_method,
            do_commit: raw.commit,
            interactive: raw.interactive,
            exclude_cols,
            exclude_null_check_cols,
        })
    }
}
