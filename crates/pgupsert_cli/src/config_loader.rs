//! Resolves CLI flags and an optional `--config-file` into the
//! [`pgupsert_core::RawConfiguration`] the core crate validates.
//!
//! A config file wins over CLI flags when both are given. Rather than
//! merging field by field, a supplied config file is treated as the
//! complete configuration and CLI connection/table flags are ignored: the
//! file already mirrors every flag the CLI exposes.

use crate::cli::Cli;
use pgupsert_core::{PgUpsertError, RawConfiguration, UpsertMethod};

pub fn build_raw_configuration(cli: &Cli) -> Result<RawConfiguration, PgUpsertError> {
    if let Some(path) = &cli.config_file {
        return RawConfiguration::from_yaml_file(path);
    }

    let host = cli
        .host
        .clone()
        .ok_or_else(|| PgUpsertError::config("--host is required without --config-file"))?;
    let database = cli
        .database
        .clone()
        .ok_or_else(|| PgUpsertError::config("--database is required without --config-file"))?;
    let user = cli
        .user
        .clone()
        .ok_or_else(|| PgUpsertError::config("--user is required without --config-file"))?;

    if cli.tables.is_empty() {
        return Err(PgUpsertError::config(
            "at least one --tables value is required without --config-file",
        ));
    }

    Ok(RawConfiguration {
        host,
        port: cli.port.unwrap_or(5432),
        database,
        user,
        staging_schema: cli.staging_schema.clone().unwrap_or_else(|| "staging".to_string()),
        base_schema: cli.base_schema.clone().unwrap_or_else(|| "public".to_string()),
        encoding: cli.encoding.clone().unwrap_or_else(|| "utf-8".to_string()),
        tables: cli.tables.clone(),
        exclude_columns: cli.exclude_columns.clone(),
        null_columns: cli.null_columns.clone(),
        upsert_method: cli.upsert_method.unwrap_or(UpsertMethod::Upsert),
        commit: cli.commit,
        interactive: cli.interactive,
        quiet: cli.quiet,
        debug: cli.debug,
        logfile: cli.logfile.as_ref().map(|p| p.display().to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bare_cli() -> Cli {
        Cli {
            host: None,
            port: None,
            database: None,
            user: None,
            staging_schema: None,
            base_schema: None,
            encoding: None,
            tables: vec![],
            exclude_columns: vec![],
            null_columns: vec![],
            upsert_method: None,
            commit: false,
            interactive: false,
            quiet: false,
            debug: false,
            logfile: None,
            config_file: None,
            generate_config: false,
        }
    }

    #[test]
    fn missing_host_is_a_config_error_without_a_config_file() {
        let mut cli = bare_cli();
        cli.database = Some("db".to_string());
        cli.user = Some("u".to_string());
        cli.tables = vec!["t".to_string()];

        let err = build_raw_configuration(&cli).unwrap_err();
        assert!(matches!(err, PgUpsertError::Config(_)));
    }

    #[test]
    fn missing_tables_is_a_config_error() {
        let mut cli = bare_cli();
        cli.host = Some("localhost".to_string());
        cli.database = Some("db".to_string());
        cli.user = Some("u".to_string());

        let err = build_raw_configuration(&cli).unwrap_err();
        assert!(matches!(err, PgUpsertError::Config(_)));
    }

    #[test]
    fn fills_in_defaults_for_omitted_optional_flags() {
        let mut cli = bare_cli();
        cli.host = Some("localhost".to_string());
        cli.database = Some("db".to_string());
        cli.user = Some("u".to_string());
        cli.tables = vec!["books".to_string()];

        let raw = build_raw_configuration(&cli).unwrap();
        assert_eq!(raw.port, 5432);
        assert_eq!(raw.staging_schema, "staging");
        assert_eq!(raw.base_schema, "public");
        assert_eq!(raw.encoding, "utf-8");
        assert_eq!(raw.upsert_method, UpsertMethod::Upsert);
    }

    #[test]
    fn config_file_flag_bypasses_flag_requirements() {
        let mut cli = bare_cli();
        cli.config_file = Some("/nonexistent/pgupsert.yaml".into());

        // None of the --host/--database/--user/--tables checks apply once a
        // config file is given; the only possible failure is reading the
        // file itself.
        let err = build_raw_configuration(&cli).unwrap_err();
        assert!(matches!(err, PgUpsertError::Io(_)));
    }
}
