//! Tabular rendering of a run's control-table state, used both for the
//! final human-readable summary and for the structured `control_snapshot`.

use crate::control::ControlRecord;
use comfy_table::{presets::UTF8_FULL, Cell, Table};

/// One row of the structured snapshot `control_snapshot` returns. Carries
/// the same fields as a [`ControlRecord`], detached from the control
/// table's internal lifetime so callers can hold it after the run closes.
#[derive(Debug, Clone)]
pub struct ControlSnapshotRow {
    pub table: String,
    pub null_errors: String,
    pub pk_errors: String,
    pub fk_errors: String,
    pub ck_errors: String,
    pub rows_updated: u64,
    pub rows_inserted: u64,
}

impl From<&ControlRecord> for ControlSnapshotRow {
    fn from(r: &ControlRecord) -> Self {
        Self {
            table: r.table.clone(),
            null_errors: r.null_errors.clone(),
            pk_errors: r.pk_errors.clone(),
            fk_errors: r.fk_errors.clone(),
            ck_errors: r.ck_errors.clone(),
            rows_updated: r.rows_updated,
            rows_inserted: r.rows_inserted,
        }
    }
}

pub fn snapshot(records: &[&ControlRecord]) -> Vec<ControlSnapshotRow> {
    records.iter().map(|r| ControlSnapshotRow::from(*r)).collect()
}

fn dash_if_empty(s: &str) -> &str {
    if s.is_empty() {
        "-"
    } else {
        s
    }
}

/// Renders the control table as a human-readable grid, written to the
/// logfile or stderr at the end of a run.
pub fn render_table(records: &[&ControlRecord]) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec![
        "table",
        "null_errors",
        "pk_errors",
        "fk_errors",
        "ck_errors",
        "rows_updated",
        "rows_inserted",
    ]);

    for r in records {
        table.add_row(vec![
            Cell::new(&r.table),
            Cell::new(dash_if_empty(&r.null_errors)),
            Cell::new(dash_if_empty(&r.pk_errors)),
            Cell::new(dash_if_empty(&r.fk_errors)),
            Cell::new(dash_if_empty(&r.ck_errors)),
            Cell::new(r.rows_updated),
            Cell::new(r.rows_inserted),
        ]);
    }

    table.to_string()
}

/// Same rendering as [`render_table`], for a snapshot already detached from
/// the control table.
pub fn render_snapshot(rows: &[ControlSnapshotRow]) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec![
        "table",
        "null_errors",
        "pk_errors",
        "fk_errors",
        "ck_errors",
        "rows_updated",
        "rows_inserted",
    ]);

    for r in rows {
        table.add_row(vec![
            Cell::new(&r.table),
            Cell::new(dash_if_empty(&r.null_errors)),
            Cell::new(dash_if_empty(&r.pk_errors)),
            Cell::new(dash_if_empty(&r.fk_errors)),
            Cell::new(dash_if_empty(&r.ck_errors)),
            Cell::new(r.rows_updated),
            Cell::new(r.rows_inserted),
        ]);
    }

    table.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(table: &str) -> ControlRecord {
        ControlRecord {
            table: table.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn render_table_includes_table_names() {
        let r = record("books");
        let rendered = render_table(&[&r]);
        assert!(rendered.contains("books"));
        assert!(rendered.contains('-'));
    }

    #[test]
    fn snapshot_preserves_order_and_fields() {
        let a = record("genres");
        let mut b = record("books");
        b.fk_errors = "books_genre_fkey (1)".to_string();

        let rows = snapshot(&[&a, &b]);
        assert_eq!(rows[0].table, "genres");
        assert_eq!(rows[1].fk_errors, "books_genre_fkey (1)");
    }
}
