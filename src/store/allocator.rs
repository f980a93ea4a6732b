//! Identifier allocation
//!
//! Hands out record ids strictly above every id issued before, including
//! ids whose records were later deleted.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{Result, RosterError};
use crate::record::RecordId;

/// Monotonic identifier source (atomic, lock-free)
#[derive(Debug, Default)]
pub struct IdAllocator {
    /// Highest id issued so far, 0 before the first one
    last: AtomicU64,
}

impl IdAllocator {
    /// Allocator whose first id will be 1
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocator that continues after `last`
    ///
    /// Seed with the high-water mark of the loaded snapshot.
    pub fn seeded(last: RecordId) -> Self {
        Self {
            last: AtomicU64::new(last.get()),
        }
    }

    /// Issue a fresh identifier
    pub fn next(&self) -> Result<RecordId> {
        self.last
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| last.checked_add(1))
            .map(|prev| RecordId::new(prev + 1))
            .map_err(|_| RosterError::IdsExhausted)
    }

    /// Highest identifier issued so far
    pub fn last_issued(&self) -> RecordId {
        RecordId::new(self.last.load(Ordering::SeqCst))
    }
}
