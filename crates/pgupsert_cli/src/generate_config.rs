//! `--generate-config`: emits a YAML configuration template to stdout and
//! exits without opening a database connection.

use crate::cli::Cli;
use pgupsert_core::{RawConfiguration, UpsertMethod};

pub fn run(cli: &Cli) {
    let raw = RawConfiguration {
        host: cli.host.clone().unwrap_or_else(|| "localhost".to_string()),
        port: cli.port.unwrap_or(5432),
        database: cli.database.clone().unwrap_or_else(|| "mydatabase".to_string()),
        user: cli.user.clone().unwrap_or_else(|| "myuser".to_string()),
        staging_schema: cli.staging_schema.clone().unwrap_or_else(|| "staging".to_string()),
        base_schema: cli.base_schema.clone().unwrap_or_else(|| "public".to_string()),
        encoding: cli.encoding.clone().unwrap_or_else(|| "utf-8".to_string()),
        tables: if cli.tables.is_empty() {
            vec!["my_table".to_string()]
        } else {
            cli.tables.clone()
        },
        exclude_columns: cli.exclude_columns.clone(),
        null_columns: cli.null_columns.clone(),
        upsert_method: cli.upsert_method.unwrap_or(UpsertMethod::Upsert),
        commit: cli.commit,
        interactive: cli.interactive,
        quiet: cli.quiet,
        debug: cli.debug,
        logfile: cli.logfile.as_ref().map(|p| p.display().to_string()),
    };

    match serde_yaml::to_string(&raw) {
        Ok(yaml) => println!("{yaml}"),
        Err(e) => eprintln!("failed to render configuration template: {e}"),
    }
}
