//! The control table: one record per configured table, tracking QA findings
//! and upsert counts for the duration of a run.
//!
//! Modeled as an in-process map rather than a real session-scoped SQL temp
//! table. The two are behaviorally equivalent, and keeping it in-process
//! avoids a second catalog round-trip per table just to read back values
//! this process already computed. Ownership is single-writer: only the
//! orchestrator thread ever calls `set_field`/`seed`.

use std::collections::BTreeMap;

/// One table's QA and upsert bookkeeping. Error fields are append-only
/// during a run and must never be cleared mid-run.
#[derive(Debug, Clone, Default)]
pub struct ControlRecord {
    pub table: String,
    pub exclude_cols: bool,
    pub exclude_null_checks: bool,
    pub interactive: bool,

    pub null_errors: String,
    pub pk_errors: String,
    pub fk_errors: String,
    pub ck_errors: String,

    pub rows_updated: u64,
    pub rows_inserted: u64,
}

impl ControlRecord {
    fn new(table: &str, exclude_cols: bool, exclude_null_checks: bool, interactive: bool) -> Self {
        Self {
            table: table.to_string(),
            exclude_cols,
            exclude_null_checks,
            interactive,
            ..Default::default()
        }
    }

    /// QA passed for this table iff every error field is empty.
    pub fn qa_passed(&self) -> bool {
        self.null_errors.is_empty()
            && self.pk_errors.is_empty()
            && self.fk_errors.is_empty()
            && self.ck_errors.is_empty()
    }

    /// Appends to an error field, comma-joining with any existing content,
    /// the same convention every error family uses.
    fn append_error(field: &mut String, fragment: &str) {
        if field.is_empty() {
            field.push_str(fragment);
        } else {
            field.push_str(", ");
            field.push_str(fragment);
        }
    }
}

/// The field a QA check or upsert step writes to. Kept as a closed set
/// rather than a raw string key so a typo can't silently create a new field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlField {
    NullErrors,
    PkErrors,
    FkErrors,
    CkErrors,
}

pub struct ControlTable {
    records: BTreeMap<String, ControlRecord>,
    order: Vec<String>,
}

impl ControlTable {
    pub fn create() -> Self {
        Self {
            records: BTreeMap::new(),
            order: Vec::new(),
        }
    }

    /// Seeds one record per configured table, in configuration order.
    /// Panics if called twice for the same table; the orchestrator seeds
    /// each table exactly once during descriptor construction.
    pub fn seed(
        &mut self,
        table: &str,
        exclude_cols: bool,
        exclude_null_checks: bool,
        interactive: bool,
    ) {
        assert!(
            !self.records.contains_key(table),
            "control record for '{table}' seeded twice"
        );
        self.records.insert(
            table.to_string(),
            ControlRecord::new(table, exclude_cols, exclude_null_checks, interactive),
        );
        self.order.push(table.to_string());
    }

    pub fn get(&self, table: &str) -> Option<&ControlRecord> {
        self.records.get(table)
    }

    fn get_mut(&mut self, table: &str) -> &mut ControlRecord {
        self.records
            .get_mut(table)
            .unwrap_or_else(|| panic!("no control record seeded for table '{table}'"))
    }

    /// Appends an error fragment (e.g. `"book_title (1)"`) to the named
    /// field for `table`.
    pub fn append_error(&mut self, table: &str, field: ControlField, fragment: &str) {
        let record = self.get_mut(table);
        let target = match field {
            ControlField::NullErrors => &mut record.null_errors,
            ControlField::PkErrors => &mut record.pk_errors,
            ControlField::FkErrors => &mut record.fk_errors,
            ControlField::CkErrors => &mut record.ck_errors,
        };
        ControlRecord::append_error(target, fragment);
    }

    pub fn record_updated(&mut self, table: &str, count: u64) {
        self.get_mut(table).rows_updated = count;
    }

    pub fn record_inserted(&mut self, table: &str, count: u64) {
        self.get_mut(table).rows_inserted = count;
    }

    /// True iff every seeded table's error fields are empty. Gates whether
    /// the upsert pass runs at all.
    pub fn all_passed(&self) -> bool {
        self.order
            .iter()
            .filter_map(|t| self.records.get(t))
            .all(ControlRecord::qa_passed)
    }

    /// Records in configuration (seed) order, for summary rendering and the
    /// upsert pass.
    pub fn records_in_order(&self) -> Vec<&ControlRecord> {
        self.order
            .iter()
            .filter_map(|t| self.records.get(t))
            .collect()
    }

    pub fn drop_table(self) {
        // Nothing to release: records live entirely in process memory and
        // are dropped with this value, matching the session-scoped lifetime
        // of a real temp table.
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_record_starts_with_no_errors_and_zero_counts() {
        let mut ct = ControlTable::create();
        ct.seed("books", false, false, false);
        let rec = ct.get("books").unwrap();
        assert!(rec.qa_passed());
        assert_eq!(rec.rows_updated, 0);
        assert_eq!(rec.rows_inserted, 0);
    }

    #[test]
    fn append_error_comma_joins_multiple_fragments() {
        let mut ct = ControlTable::create();
        ct.seed("books", false, false, false);
        ct.append_error("books", ControlField::NullErrors, "book_title (1)");
        ct.append_error("books", ControlField::NullErrors, "genre (2)");
        assert_eq!(ct.get("books").unwrap().null_errors, "book_title (1), genre (2)");
    }

    #[test]
    fn all_passed_is_false_if_any_table_has_an_error() {
        let mut ct = ControlTable::create();
        ct.seed("genres", false, false, false);
        ct.seed("books", false, false, false);
        ct.append_error("books", ControlField::FkErrors, "books_genre_fkey (1)");
        assert!(!ct.all_passed());
    }

    #[test]
    fn records_in_order_preserves_seed_order() {
        let mut ct = ControlTable::create();
        ct.seed("genres", false, false, false);
        ct.seed("authors", false, false, false);
        ct.seed("books", false, false, false);
        let names: Vec<&str> = ct.records_in_order().iter().map(|r| r.table.as_str()).collect();
        assert_eq!(names, vec!["genres", "authors", "books"]);
    }

    #[test]
    #[should_panic(expected = "seeded twice")]
    fn seeding_same_table_twice_panics() {
        let mut ct = ControlTable::create();
        ct.seed("books", false, false, false);
        ct.seed("books", false, false, false);
    }
}
