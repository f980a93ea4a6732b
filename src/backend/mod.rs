//! Backend Module
//!
//! Durable storage behind the record store.
//!
//! ## Responsibilities
//! - Return the full collection on startup (`load`)
//! - Make each mutation durable before the store acknowledges it (`commit`)
//! - Never leave a half-written state behind on failure
//!
//! ## Implementations
//!
//! | Backend | Atomicity | Medium |
//! |---------|-----------|--------|
//! | [`FileBackend`] | whole collection | JSON array, write-temp-then-rename |
//! | [`DocumentBackend`] | per record | one document per record, embedded SQLite |
//! | [`MemoryBackend`] | whole collection | nothing touches disk |
//!
//! Backends never call into the store. They only see what the store hands
//! them, under the store's mutation turn.

mod document;
mod file;
mod memory;

use std::fs;
use std::sync::Arc;

use crate::config::{BackendKind, Config};
use crate::error::{Result, RosterError};
use crate::record::{Record, RecordId, Snapshot};

pub use document::DocumentBackend;
pub use file::FileBackend;
pub use memory::MemoryBackend;

/// A single mutation, as handed to [`Backend::commit`]
#[derive(Debug, Clone, Copy)]
pub enum Change<'a> {
    Create(&'a Record),
    Update { before: &'a Record, after: &'a Record },
    Delete(&'a Record),
}

impl Change<'_> {
    /// Operation name for logs and errors
    pub fn operation(&self) -> &'static str {
        match self {
            Change::Create(_) => "create",
            Change::Update { .. } => "update",
            Change::Delete(_) => "delete",
        }
    }
}

/// Unit of atomicity a backend guarantees for one commit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Durability {
    /// The whole collection is replaced in one step
    WholeSnapshot,

    /// Each record is written independently
    PerRecord,

    /// Survives only as long as the process
    Volatile,
}

/// Durable storage of the record collection
pub trait Backend: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &'static str;

    fn durability(&self) -> Durability;

    /// Read the full collection
    ///
    /// Returns an empty snapshot when nothing was ever stored and
    /// `BackendUnavailable` when stored data exists but cannot be read.
    fn load(&self) -> Result<Snapshot>;

    /// Replace the stored collection with `snapshot`
    ///
    /// On error the previously stored collection is left as it was.
    fn save(&self, snapshot: &Snapshot) -> Result<()>;

    /// Make one mutation durable
    ///
    /// `last_id` is the high-water mark after the change. `staged` builds
    /// the whole collection with the change applied; it copies every record,
    /// so per-record backends push only `change` and never call it. The
    /// default replaces the whole collection.
    fn commit(
        &self,
        change: &Change<'_>,
        last_id: RecordId,
        staged: &dyn Fn() -> Snapshot,
    ) -> Result<()> {
        let _ = (change, last_id);
        self.save(&staged())
    }
}

/// Open the backend selected by `config`
///
/// Fails with `BackendUnavailable` if the storage location cannot be opened.
pub fn open(config: &Config) -> Result<Arc<dyn Backend>> {
    if config.backend != BackendKind::Memory {
        fs::create_dir_all(&config.data_dir).map_err(|e| {
            RosterError::BackendUnavailable(format!(
                "cannot create data directory {}: {}",
                config.data_dir.display(),
                e
            ))
        })?;
    }

    let backend: Arc<dyn Backend> = match config.backend {
        BackendKind::File => Arc::new(FileBackend::from_config(config)?),
        BackendKind::Document => Arc::new(DocumentBackend::from_config(config)?),
        BackendKind::Memory => Arc::new(MemoryBackend::new()),
    };

    tracing::info!(
        backend = backend.name(),
        durability = ?backend.durability(),
        "Backend opened"
    );

    Ok(backend)
}
