//! Command-line flags. Long flag names are authoritative and
//! mirror [`pgupsert_core::RawConfiguration`] field-for-field so a YAML
//! config file and `--generate-config`'s template line up with the flags
//! that produced them.

use clap::Parser;
use pgupsert_core::UpsertMethod;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "pgupsert",
    about = "Validate staging tables against catalog constraints, then merge them into base tables",
    version
)]
pub struct Cli {
    #[arg(long)]
    pub host: Option<String>,

    #[arg(long)]
    pub port: Option<u16>,

    #[arg(long)]
    pub database: Option<String>,

    #[arg(long)]
    pub user: Option<String>,

    #[arg(long = "staging-schema")]
    pub staging_schema: Option<String>,

    #[arg(long = "base-schema")]
    pub base_schema: Option<String>,

    #[arg(long)]
    pub encoding: Option<String>,

    #[arg(long = "tables")]
    pub tables: Vec<String>,

    #[arg(long = "exclude-columns")]
    pub exclude_columns: Vec<String>,

    #[arg(long = "null-columns")]
    pub null_columns: Vec<String>,

    #[arg(long = "upsert-method")]
    pub upsert_method: Option<UpsertMethod>,

    #[arg(long)]
    pub commit: bool,

    #[arg(long)]
    pub interactive: bool,

    #[arg(long)]
    pub quiet: bool,

    #[arg(long)]
    pub debug: bool,

    #[arg(long)]
    pub logfile: Option<PathBuf>,

    #[arg(long = "config-file")]
    pub config_file: Option<PathBuf>,

    /// Emit a YAML configuration template incorporating any flags already
    /// given, and exit without connecting to a database.
    #[arg(long = "generate-config")]
    pub generate_config: bool,
}
