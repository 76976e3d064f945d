//! Integration tests against a real PostgreSQL server. Ignored by default.
//! Run with `cargo test -- --ignored` against a database reachable via the
//! `PGUPSERT_TEST_*` environment variables, mirroring the live-database test
//! convention this workspace otherwise exercises through Docker-backed
//! fixtures.

use pgupsert_driver_postgres::{connect, ConnectParams};

fn test_params() -> Option<(String, u16, String, String, String)> {
    let host = std::env::var("PGUPSERT_TEST_HOST").ok()?;
    let port = std::env::var("PGUPSERT_TEST_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(5432);
    let user = std::env::var("PGUPSERT_TEST_USER").ok()?;
    let password = std::env::var("PGUPSERT_TEST_PASSWORD").unwrap_or_default();
    let database = std::env::var("PGUPSERT_TEST_DATABASE").ok()?;
    Some((host, port, user, password, database))
}

#[test]
#[ignore = "requires a reachable PostgreSQL server"]
fn connects_and_runs_a_transaction() {
    let (host, port, user, password, database) =
        test_params().expect("PGUPSERT_TEST_* environment variables must be set");

    let params = ConnectParams {
        host: &host,
        port,
        user: &user,
        password: &password,
        database: &database,
    };

    let mut executor = connect(&params).expect("connect should succeed");
    let outcome = pgupsert_core::QueryExecutor::query(&mut executor, "SELECT 1 AS one")
        .expect("query should succeed");
    assert_eq!(outcome.rows.len(), 1);

    pgupsert_core::QueryExecutor::rollback(&mut executor).expect("rollback should succeed");
}
