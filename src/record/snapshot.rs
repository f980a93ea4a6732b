//! Snapshot
//!
//! The full collection at one point in time.

use std::collections::HashSet;

use crate::error::{Result, RosterError};

use super::{Record, RecordId};

/// Ordered sequence of all records plus the identifier high-water mark
///
/// `last_id` is the highest identifier ever handed out, which can be larger
/// than any id still present once the newest records were deleted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    records: Vec<Record>,
    last_id: RecordId,
}

impl Snapshot {
    /// Create a snapshot; `last_id` is raised to at least the largest record id
    pub fn new(records: Vec<Record>, last_id: RecordId) -> Self {
        let max = records
            .iter()
            .map(Record::id)
            .max()
            .unwrap_or(RecordId::ZERO);
        Self {
            records,
            last_id: last_id.max(max),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn into_records(self) -> Vec<Record> {
        self.records
    }

    pub fn last_id(&self) -> RecordId {
        self.last_id
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Reject loaded data that breaks identifier uniqueness
    ///
    /// A zero id is also rejected; the allocator never issues it.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::with_capacity(self.records.len());
        for record in &self.records {
            if record.id() == RecordId::ZERO {
                return Err(RosterError::BackendUnavailable(
                    "stored record has id 0".to_string(),
                ));
            }
            if !seen.insert(record.id()) {
                return Err(RosterError::BackendUnavailable(format!(
                    "duplicate record id {} in stored data",
                    record.id()
                )));
            }
        }
        Ok(())
    }
}
