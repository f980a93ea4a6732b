//! File snapshot backend
//!
//! The whole collection lives in one JSON array, replaced wholesale on
//! every save.
//!
//! ## Files
//! ```text
//! {data_dir}/
//!   ├── users.json       [ {"id": 1, ...}, {"id": 2, ...} ]
//!   └── users.json.ids   {"last_id": 7}
//! ```
//!
//! ## Write discipline
//! 1. Write the id sidecar to a temp file, fsync, rename over the old one
//! 2. Write the array to a temp file, fsync, rename over the old one
//! 3. fsync the directory
//!
//! A crash between steps 1 and 2 leaves a sidecar ahead of the array,
//! which only makes the allocator skip ids. It never reuses one.
//!
//! Every fallible step of a write happens before its rename. Once the
//! rename has replaced the file the save is reported as done: a failed
//! directory fsync is logged, not returned, because the new contents are
//! already what a reader (or a restart) sees.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::config::{Config, SyncStrategy};
use crate::error::{Result, RosterError};
use crate::record::{Record, RecordId, Snapshot};

use super::{Backend, Durability};

/// Suffix of the identifier high-water mark file
const IDS_SUFFIX: &str = "ids";

#[derive(Debug, Serialize, Deserialize)]
struct IdsFile {
    last_id: RecordId,
}

/// JSON snapshot on local storage
pub struct FileBackend {
    /// Snapshot file (JSON array)
    path: PathBuf,

    /// Identifier sidecar next to the snapshot
    ids_path: PathBuf,

    sync_strategy: SyncStrategy,

    pretty: bool,
}

impl FileBackend {
    /// Open a snapshot file, creating its directory if needed
    ///
    /// The file itself is not created until the first save.
    pub fn open(path: impl Into<PathBuf>, sync_strategy: SyncStrategy, pretty: bool) -> Result<Self> {
        let path = path.into();
        if let Some(dir) = parent_dir(&path) {
            fs::create_dir_all(dir).map_err(|e| {
                RosterError::BackendUnavailable(format!(
                    "cannot create directory {}: {}",
                    dir.display(),
                    e
                ))
            })?;
        }

        let mut ids_name = path.as_os_str().to_owned();
        ids_name.push(".");
        ids_name.push(IDS_SUFFIX);

        Ok(Self {
            ids_path: PathBuf::from(ids_name),
            path,
            sync_strategy,
            pretty,
        })
    }

    /// Open the snapshot named by `config`
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::open(
            config.snapshot_path(),
            config.sync_strategy,
            config.pretty_snapshot,
        )
    }

    /// Snapshot file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Identifier sidecar path
    pub fn ids_path(&self) -> &Path {
        &self.ids_path
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    /// Read a file, mapping "missing" to `None`
    fn read_optional(path: &Path) -> Result<Option<Vec<u8>>> {
        match fs::read(path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(RosterError::BackendUnavailable(format!(
                "cannot read {}: {}",
                path.display(),
                e
            ))),
        }
    }

    fn read_last_id(&self) -> Result<Option<RecordId>> {
        let Some(bytes) = Self::read_optional(&self.ids_path)? else {
            return Ok(None);
        };
        let ids: IdsFile = serde_json::from_slice(&bytes).map_err(|e| {
            RosterError::BackendUnavailable(format!(
                "corrupt id file {}: {}",
                self.ids_path.display(),
                e
            ))
        })?;
        Ok(Some(ids.last_id))
    }

    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>> {
        let encoded = if self.pretty {
            serde_json::to_vec_pretty(value)
        } else {
            serde_json::to_vec(value)
        };
        encoded.map_err(|e| RosterError::BackendWriteFailed(format!("cannot encode snapshot: {}", e)))
    }

    /// Replace `target` with `bytes` via a temp file in the same directory
    fn write_atomic(&self, target: &Path, bytes: &[u8]) -> Result<()> {
        let dir = parent_dir(target).unwrap_or_else(|| Path::new("."));
        let failed = |e: io::Error| {
            RosterError::BackendWriteFailed(format!("cannot write {}: {}", target.display(), e))
        };

        let mut tmp = NamedTempFile::new_in(dir).map_err(failed)?;
        tmp.write_all(bytes).map_err(failed)?;
        if self.sync_strategy == SyncStrategy::Always {
            tmp.as_file().sync_all().map_err(failed)?;
        }

        // On failure the temp file is removed when the error drops
        tmp.persist(target).map_err(|e| failed(e.error))?;

        if self.sync_strategy == SyncStrategy::Always {
            settle_rename(dir, target);
        }
        Ok(())
    }
}

impl Backend for FileBackend {
    fn name(&self) -> &'static str {
        "file"
    }

    fn durability(&self) -> Durability {
        Durability::WholeSnapshot
    }

    fn load(&self) -> Result<Snapshot> {
        let last_id = self.read_last_id()?.unwrap_or(RecordId::ZERO);

        let records = match Self::read_optional(&self.path)? {
            None => Vec::new(),
            Some(bytes) => serde_json::from_slice::<Vec<Record>>(&bytes).map_err(|e| {
                RosterError::BackendUnavailable(format!(
                    "corrupt snapshot {}: {}",
                    self.path.display(),
                    e
                ))
            })?,
        };

        let snapshot = Snapshot::new(records, last_id);
        snapshot.validate()?;

        tracing::debug!(
            "Loaded {} records from {} (last_id={})",
            snapshot.len(),
            self.path.display(),
            snapshot.last_id()
        );
        Ok(snapshot)
    }

    fn save(&self, snapshot: &Snapshot) -> Result<()> {
        let ids = self.encode(&IdsFile {
            last_id: snapshot.last_id(),
        })?;
        let records = self.encode(snapshot.records())?;

        // Sidecar first: it may run ahead of the array, never behind
        self.write_atomic(&self.ids_path, &ids)?;
        self.write_atomic(&self.path, &records)?;
        Ok(())
    }
}

fn parent_dir(path: &Path) -> Option<&Path> {
    path.parent().filter(|p| !p.as_os_str().is_empty())
}

/// Best-effort fsync of `dir` after `target` was renamed into it
///
/// The rename already happened, so a failure here cannot be undone.
fn settle_rename(dir: &Path, target: &Path) {
    if let Err(e) = sync_dir(dir) {
        tracing::warn!(
            "Replaced {} but could not fsync {}: {}",
            target.display(),
            dir.display(),
            e
        );
    }
}

/// Persist the rename itself
#[cfg(unix)]
fn sync_dir(dir: &Path) -> io::Result<()> {
    fs::File::open(dir)?.sync_all()
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> io::Result<()> {
    Ok(())
}
