//! Store Module
//!
//! The record store: the single authority over the collection.
//!
//! ## Responsibilities
//! - Own the working set; nothing else touches it
//! - Allocate identifiers
//! - Persist every mutation before acknowledging it
//! - Leave the working set untouched when persistence fails

mod allocator;
mod queue;

use std::sync::Arc;

use crate::backend::{self, Backend, Change, Durability};
use crate::config::Config;
use crate::error::{Result, RosterError};
use crate::record::{Fields, Record, RecordId, RecordPatch};
use crate::working_set::{Staged, WorkingSet};

pub use allocator::IdAllocator;
pub use queue::{MutationQueue, MutationTurn};

/// The record store
///
/// ## Concurrency Model: FIFO writer / many readers
///
/// - **Mutations** (create/update/delete): serialized by `queue`
///   - One at a time, in arrival order
///   - The turn is held across the backend call, so no other mutation runs
///     while a save is in flight
///   - Each mutation edits a staged copy, persists it, then publishes it
///
/// - **Reads** (get/list): never wait for the queue
///   - Share the working set's read lock
///   - Only see published, already persisted states
///
/// A mutation that has started always finishes: either persisted and
/// published, or failed with the working set unchanged.
pub struct RecordStore {
    /// Durable medium
    backend: Arc<dyn Backend>,

    /// In-memory view, authoritative for reads
    records: WorkingSet,

    /// Identifier source, seeded from the loaded high-water mark
    ids: IdAllocator,

    /// Serializes mutations
    queue: MutationQueue,
}

impl RecordStore {
    /// Open the backend named by `config` and load the collection
    pub fn open(config: &Config) -> Result<Self> {
        let backend = backend::open(config)?;
        Self::with_backend(backend)
    }

    /// Load the collection from an already opened backend
    ///
    /// Fails with `BackendUnavailable` rather than starting empty when the
    /// stored data cannot be read.
    pub fn with_backend(backend: Arc<dyn Backend>) -> Result<Self> {
        let snapshot = backend.load()?;
        snapshot.validate()?;

        tracing::info!(
            backend = backend.name(),
            records = snapshot.len(),
            last_id = %snapshot.last_id(),
            "Record store loaded"
        );

        let ids = IdAllocator::seeded(snapshot.last_id());
        let records = WorkingSet::from_records(snapshot.into_records());

        Ok(Self {
            backend,
            records,
            ids,
            queue: MutationQueue::new(),
        })
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Every record, in id order
    pub fn list(&self) -> Vec<Record> {
        self.records.list()
    }

    /// The record with `id`
    pub fn get(&self, id: RecordId) -> Result<Record> {
        self.records.get(id).ok_or(RosterError::NotFound { id })
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Store a new record and return it with its assigned id
    ///
    /// Field validation is the caller's job. An id allocated by a create
    /// that fails to persist is not handed out again.
    pub fn create(&self, fields: Fields) -> Result<Record> {
        let _turn = self.queue.enter();

        let id = self.ids.next()?;
        let record = Record::new(id, fields);

        let mut staged = self.records.stage();
        staged.put(record.clone());
        self.persist(&Change::Create(&record), &staged)?;
        self.records.publish(staged);

        tracing::debug!(id = %id, "Record created");
        Ok(record)
    }

    /// Merge `patch` into the record with `id`
    pub fn update(&self, id: RecordId, patch: &RecordPatch) -> Result<Record> {
        let _turn = self.queue.enter();

        let mut staged = self.records.stage();
        let before = staged.get(id).cloned().ok_or(RosterError::NotFound { id })?;
        let after = before.merged(patch);

        staged.put(after.clone());
        self.persist(
            &Change::Update {
                before: &before,
                after: &after,
            },
            &staged,
        )?;
        self.records.publish(staged);

        tracing::debug!(id = %id, fields = patch.fields().len(), "Record updated");
        Ok(after)
    }

    /// Remove the record with `id` and return it
    pub fn delete(&self, id: RecordId) -> Result<Record> {
        let _turn = self.queue.enter();

        let mut staged = self.records.stage();
        let removed = staged.remove(id).ok_or(RosterError::NotFound { id })?;

        self.persist(&Change::Delete(&removed), &staged)?;
        self.records.publish(staged);

        tracing::debug!(id = %id, "Record deleted");
        Ok(removed)
    }

    /// Hand a staged mutation to the backend (called with the turn held)
    fn persist(&self, change: &Change<'_>, staged: &Staged) -> Result<()> {
        let last_id = self.ids.last_issued();
        let build = || staged.to_snapshot(last_id);
        self.backend.commit(change, last_id, &build).map_err(|e| {
            tracing::warn!(
                backend = self.backend.name(),
                "Rolled back {}: {}",
                change.operation(),
                e
            );
            RosterError::Persistence {
                operation: change.operation(),
                reason: e.to_string(),
            }
        })
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Number of live records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Highest identifier issued so far
    pub fn last_id(&self) -> RecordId {
        self.ids.last_issued()
    }

    /// Mutations running or waiting for their turn
    pub fn pending_mutations(&self) -> u64 {
        self.queue.pending()
    }

    /// Name of the backend in use
    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Atomicity guarantee of the backend in use
    pub fn durability(&self) -> Durability {
        self.backend.durability()
    }
}
