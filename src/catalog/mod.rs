/// Catalog module
///
/// This module handles the gallery's JSON catalog:
/// - The record model with typed accessors (record.rs)
/// - Loading and transactional saving (store.rs)
/// - Read-only duplicate and URL health diagnostics (diagnostics.rs)

pub mod diagnostics;
pub mod record;
pub mod store;

pub use record::Record;

/// The full, ordered list of records, held in memory for one run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    records: Vec<Record>,
}

impl Catalog {
    pub fn new(records: Vec<Record>) -> Self {
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn records_mut(&mut self) -> &mut [Record] {
        &mut self.records
    }
}
