//!
//! The external collaborator contract: the spreadsheet host resolves a
//! textual reference to a tabular value. This crate ships only the trait and
//! the data it carries — wiring a real spreadsheet host up to it is out of
//! scope (see §1 of the design).
//!
use crate::errors::{Result, SqliteFnError};
use crate::reference::TableReference;
use crate::value::CellValue;

/// A tabular value as the host hands it back: an ordered header row plus
/// row-major data. A null host value, a non-tabular value, a zero-row table,
/// or a zero-column table is modeled by the caller returning an `Err`.
#[derive(Debug, Clone, PartialEq)]
pub struct HostTable {
    pub headers: Vec<CellValue>,
    pub rows: Vec<Vec<CellValue>>,
}

impl HostTable {
    pub fn new(headers: Vec<CellValue>, rows: Vec<Vec<CellValue>>) -> Self {
        HostTable { headers, rows }
    }

    pub fn column_count(&self) -> usize {
        self.headers.len()
    }
}

/// Stands in for the host's `resolve(ref, headers) -> Table` function.
pub trait TableResolver {
    fn resolve(&self, reference: &TableReference) -> Result<HostTable>;
}

/// Fail a resolution with the canonical `RangeResolution` error used when the
/// host cannot locate the referenced table or range at all.
pub fn resolution_failure(reference: &TableReference, reason: &str) -> SqliteFnError {
    SqliteFnError::RangeResolution { reference: reference.original.clone(), reason: reason.to_string() }
}

/// An in-memory fixture resolver for tests: a fixed map from a reference's
/// `engine_name` to a `HostTable`, looked up by the reference's table/range
/// text (case-insensitively on the table name).
pub mod fixture {
    use super::*;
    use std::collections::HashMap;

    #[derive(Default)]
    pub struct FixtureResolver {
        tables: HashMap<String, HostTable>,
    }

    impl FixtureResolver {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_table(mut self, name: &str, table: HostTable) -> Self {
            self.tables.insert(name.to_lowercase(), table);
            self
        }
    }

    impl TableResolver for FixtureResolver {
        fn resolve(&self, reference: &TableReference) -> Result<HostTable> {
            let key = reference
                .table
                .as_deref()
                .or(reference.range.as_deref())
                .unwrap_or(&reference.original)
                .to_lowercase();
            self.tables
                .get(&key)
                .cloned()
                .ok_or_else(|| resolution_failure(reference, "no matching fixture table"))
        }
    }
}
