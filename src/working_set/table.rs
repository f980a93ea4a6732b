//! Working set implementation
//!
//! BTreeMap-based record table with RwLock for concurrency.

use std::collections::BTreeMap;

use parking_lot::RwLock;

use crate::record::{Record, RecordId, Snapshot};

/// In-memory table of every live record
pub struct WorkingSet {
    records: RwLock<BTreeMap<RecordId, Record>>,
}

impl WorkingSet {
    /// Create an empty working set
    pub fn new() -> Self {
        Self {
            records: RwLock::new(BTreeMap::new()),
        }
    }

    /// Populate from loaded records
    pub fn from_records(records: impl IntoIterator<Item = Record>) -> Self {
        let map = records.into_iter().map(|r| (r.id(), r)).collect();
        Self {
            records: RwLock::new(map),
        }
    }

    /// Get a record by id (read lock)
    pub fn get(&self, id: RecordId) -> Option<Record> {
        self.records.read().get(&id).cloned()
    }

    /// Check whether an id is live (read lock)
    pub fn contains(&self, id: RecordId) -> bool {
        self.records.read().contains_key(&id)
    }

    /// All records in id order (read lock)
    pub fn list(&self) -> Vec<Record> {
        self.records.read().values().cloned().collect()
    }

    /// Number of live records
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Copy the current contents for a mutation to edit
    ///
    /// Callers must hold the store's mutation turn between `stage` and
    /// `publish`, otherwise a concurrent publish would be overwritten.
    pub fn stage(&self) -> Staged {
        Staged {
            records: self.records.read().clone(),
        }
    }

    /// Replace the contents with a staged copy (write lock)
    pub fn publish(&self, staged: Staged) {
        *self.records.write() = staged.records;
    }
}

impl Default for WorkingSet {
    fn default() -> Self {
        Self::new()
    }
}

/// A private copy of the working set, edited by one mutation
#[derive(Debug, Clone)]
pub struct Staged {
    records: BTreeMap<RecordId, Record>,
}

impl Staged {
    pub fn get(&self, id: RecordId) -> Option<&Record> {
        self.records.get(&id)
    }

    /// Insert or replace a record, returning the previous version
    pub fn put(&mut self, record: Record) -> Option<Record> {
        self.records.insert(record.id(), record)
    }

    pub fn remove(&mut self, id: RecordId) -> Option<Record> {
        self.records.remove(&id)
    }

    /// Snapshot of the staged contents with the given high-water mark
    pub fn to_snapshot(&self, last_id: RecordId) -> Snapshot {
        Snapshot::new(self.records.values().cloned().collect(), last_id)
    }
}
