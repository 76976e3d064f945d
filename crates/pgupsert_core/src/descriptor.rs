//! The table descriptor: everything the QA and
//! upsert engines need about one configured table, discovered once up front
//! by [`crate::catalog::CatalogInspector`] and treated as read-only
//! thereafter.

use crate::identifier::qualified_table;
use std::collections::BTreeSet;

/// A foreign key on the base table: local columns and the base table/columns
/// they reference, in ordinal position order.
#[derive(Debug, Clone)]
pub struct ForeignKeyDescriptor {
    pub name: String,
    pub local_columns: Vec<String>,
    pub ref_schema: String,
    pub ref_table: String,
    pub ref_columns: Vec<String>,
}

/// A `CHECK` constraint on the base table.
#[derive(Debug, Clone)]
pub struct CheckConstraintDescriptor {
    pub name: String,
    pub expression: String,
}

/// Everything known about one configured table, derived once at the start
/// of a run and never mutated.
#[derive(Debug, Clone)]
pub struct TableDescriptor {
    pub name: String,
    pub base_schema: String,
    pub staging_schema: String,

    /// Columns common to base and staging, in base ordinal order, retained
    /// in full for QA (not reduced by `exclude_cols`).
    pub common_columns: Vec<String>,

    /// `common_columns` minus `exclude_cols`. The column list used for
    /// UPDATE/INSERT DML.
    pub dml_columns: Vec<String>,

    /// Base table primary key columns, in ordinal position order. Empty
    /// means the base table has no primary key.
    pub primary_key: Vec<String>,

    /// Base NOT NULL columns, minus `exclude_null_check_cols`, restricted to
    /// columns also present in staging.
    pub not_null_columns: BTreeSet<String>,

    pub foreign_keys: Vec<ForeignKeyDescriptor>,
    pub check_constraints: Vec<CheckConstraintDescriptor>,
}

impl TableDescriptor {
    pub fn base_ident(&self) -> String {
        qualified_table(&self.base_schema, &self.name)
    }

    pub fn staging_ident(&self) -> String {
        qualified_table(&self.staging_schema, &self.name)
    }

    /// `dml_columns` minus the primary key. The columns an UPDATE sets.
    pub fn update_set_columns(&self) -> Vec<String> {
        self.dml_columns
            .iter()
            .filter(|c| !self.primary_key.contains(c))
            .cloned()
            .collect()
    }

    pub fn has_primary_key(&self) -> bool {
        !self.primary_key.is_empty()
    }
}
