use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

/// A single cell value as read back from a staging or base table.
///
/// Custom enum instead of `serde_json::Value` so that `IS DISTINCT FROM`
/// comparisons and SQL-literal rendering stay type-aware.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
    /// JSON/JSONB stored as string for exact round-trip preservation.
    Json(String),
    /// Decimal stored as string to preserve exact precision.
    Decimal(String),
    DateTime(DateTime<Utc>),
    Date(NaiveDate),
    Time(NaiveTime),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_display_string(&self) -> String {
        self.as_display_string_truncated(200)
    }

    pub fn as_display_string_truncated(&self, max_len: usize) -> String {
        match self {
            Value::Null => "NULL".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => f.to_string(),
            Value::Text(s) | Value::Json(s) | Value::Decimal(s) => {
                if s.chars().count() <= max_len {
                    s.clone()
                } else {
                    let truncated: String = s.chars().take(max_len).collect();
                    format!("{}...", truncated)
                }
            }
            Value::Bytes(b) => format!("<{} bytes>", b.len()),
            Value::DateTime(dt) => dt.format("%Y-%m-%d %H:%M:%S%.f").to_string(),
            Value::Date(d) => d.format("%Y-%m-%d").to_string(),
            Value::Time(t) => t.format("%H:%M:%S%.f").to_string(),
        }
    }

    /// Three-valued `IS DISTINCT FROM`: NULLs are equal to each other and
    /// unequal to any non-NULL value, unlike ordinary `=`.
    pub fn is_distinct_from(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => false,
            (Value::Null, _) | (_, Value::Null) => true,
            _ => self != other,
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_display_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distinct_from_treats_null_as_equal_to_null() {
        assert!(!Value::Null.is_distinct_from(&Value::Null));
    }

    #[test]
    fn distinct_from_treats_null_as_unequal_to_non_null() {
        assert!(Value::Null.is_distinct_from(&Value::Int(0)));
        assert!(Value::Int(0).is_distinct_from(&Value::Null));
    }

    #[test]
    fn distinct_from_compares_same_type_values() {
        assert!(!Value::Int(1).is_distinct_from(&Value::Int(1)));
        assert!(Value::Int(1).is_distinct_from(&Value::Int(2)));
    }

    #[test]
    fn truncates_long_text_with_ellipsis() {
        let v = Value::Text("a".repeat(300));
        let s = v.as_display_string_truncated(10);
        assert_eq!(s, format!("{}...", "a".repeat(10)));
    }
}
