//! Password resolution: `PGPASSWORD` if set, otherwise an interactive TTY
//! prompt.

use pgupsert_core::PgUpsertError;

pub fn resolve() -> Result<String, PgUpsertError> {
    if let Ok(password) = std::env::var("PGPASSWORD") {
        return Ok(password);
    }

    rpassword::prompt_password("Password: ")
        .map_err(|e| PgUpsertError::config(format!("failed to read password: {e}")))
}
