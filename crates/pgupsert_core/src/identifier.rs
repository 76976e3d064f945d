//! Identifier validation and SQL literal quoting.
//!
//! SQL in this crate is synthesized by string concatenation rather than bind
//! parameters, because PostgreSQL has no way to parameterize identifiers
//! (table/column/constraint names) or to bind a `GROUP BY` column list.
//! Validating every identifier that originates from configuration, before it
//! is concatenated into anything, is the sole defence against injection
//! through table/column names. Centralize it here; nothing downstream should
//! concatenate a raw string into SQL without going through `validate` first.

use crate::error::PgUpsertError;
use regex::Regex;
use std::sync::LazyLock;

static IDENTIFIER_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_$]*$").expect("static regex is valid"));

/// Validates a raw identifier string against PostgreSQL's unquoted
/// identifier grammar, restricted further to `[A-Za-z0-9_$]` after the first
/// character and capped at 63 bytes (PostgreSQL's `NAMEDATALEN` limit).
pub fn validate(name: &str) -> Result<&str, PgUpsertError> {
    if name.len() > 63 {
        return Err(PgUpsertError::config(format!(
            "identifier '{name}' exceeds 63 characters"
        )));
    }

    if !IDENTIFIER_PATTERN.is_match(name) {
        return Err(PgUpsertError::config(format!(
            "identifier '{name}' contains characters outside [A-Za-z0-9_$] \
             or does not start with a letter/underscore"
        )));
    }

    Ok(name)
}

/// Double-quotes a previously validated identifier for use in SQL.
///
/// Callers must pass identifiers that already went through [`validate`];
/// this function only escapes embedded double quotes defensively and does
/// not itself perform the injection check.
pub fn quote(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Builds a schema-qualified, quoted table reference: `"schema"."table"`.
pub fn qualified_table(schema: &str, table: &str) -> String {
    format!("{}.{}", quote(schema), quote(table))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_identifiers() {
        assert!(validate("books").is_ok());
        assert!(validate("_hidden").is_ok());
        assert!(validate("book_id$1").is_ok());
    }

    #[test]
    fn rejects_identifiers_starting_with_digit() {
        assert!(validate("1table").is_err());
    }

    #[test]
    fn rejects_injection_attempts() {
        assert!(validate("books; DROP TABLE genres").is_err());
        assert!(validate("books--").is_err());
        assert!(validate("books\"").is_err());
        assert!(validate("books table").is_err());
    }

    #[test]
    fn rejects_identifiers_over_63_bytes() {
        let long = "a".repeat(64);
        assert!(validate(&long).is_err());
    }

    #[test]
    fn quote_escapes_embedded_double_quotes() {
        assert_eq!(quote("weird\"name"), "\"weird\"\"name\"");
    }

    #[test]
    fn qualified_table_quotes_both_parts() {
        assert_eq!(qualified_table("staging", "books"), "\"staging\".\"books\"");
    }
}
