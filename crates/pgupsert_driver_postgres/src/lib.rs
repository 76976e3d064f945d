mod executor;

pub use executor::PostgresExecutor;

use pgupsert_core::{PgUpsertError, Result};
use postgres::{Client, NoTls};

/// Connection parameters as they arrive from [`pgupsert_core::Configuration`]
/// plus the password resolved separately (`PGPASSWORD` or an interactive
/// prompt, both outside this crate's scope).
pub struct ConnectParams<'a> {
    pub host: &'a str,
    pub port: u16,
    pub user: &'a str,
    pub password: &'a str,
    pub database: &'a str,
}

/// Opens a direct (non-TLS) connection and starts the run's transaction.
///
/// TLS is left out deliberately: this crate's scope is the validate-then-
/// upsert engine, not connection security policy. A `native-tls` /
/// `postgres-native-tls` layer is the natural extension point if a
/// deployment needs it.
pub fn connect(params: &ConnectParams<'_>) -> Result<PostgresExecutor> {
    let conn_string = format!(
        "host={} port={} user={} password={} dbname={} connect_timeout=30",
        params.host, params.port, params.user, params.password, params.database
    );

    let client = Client::connect(&conn_string, NoTls)
        .map_err(|e| format_pg_error(&e, params.host, params.port))?;

    PostgresExecutor::begin(client)
}

fn format_pg_error(e: &postgres::Error, host: &str, port: u16) -> PgUpsertError {
    let source = e.to_string();

    let message = if source.contains("timed out") {
        format!(
            "connection to {host}:{port} timed out; check that the host is reachable and the port is open"
        )
    } else if source.contains("Connection refused") {
        format!("connection refused at {host}:{port}; verify PostgreSQL is running and accepting connections")
    } else if source.contains("password authentication failed") {
        "authentication failed; check your username and password".to_string()
    } else if source.contains("does not exist") {
        format!("database or user does not exist: {source}")
    } else {
        format!("connection to {host}:{port} failed: {source}")
    };

    PgUpsertError::database(message)
}
