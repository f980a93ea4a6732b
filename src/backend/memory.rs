//! In-memory backend.
//!
//! Keeps the last saved snapshot in memory. Writes and loads can be made
//! to fail on demand, which is how the store's rollback path is tested.

use parking_lot::Mutex;

use crate::error::{Result, RosterError};
use crate::record::Snapshot;

use super::{Backend, Durability};

#[derive(Debug, Default)]
struct MemoryState {
    snapshot: Snapshot,
    fail_writes: bool,
    fail_loads: bool,
    saves: u64,
}

/// Volatile backend for tests and throwaway servers
#[derive(Debug, Default)]
pub struct MemoryBackend {
    state: Mutex<MemoryState>,
}

impl MemoryBackend {
    /// Create an empty backend
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a backend that already holds `snapshot`
    pub fn with_snapshot(snapshot: Snapshot) -> Self {
        Self {
            state: Mutex::new(MemoryState {
                snapshot,
                ..MemoryState::default()
            }),
        }
    }

    /// Make every following save fail until switched off
    pub fn set_fail_writes(&self, fail: bool) {
        self.state.lock().fail_writes = fail;
    }

    /// Make every following load fail until switched off
    pub fn set_fail_loads(&self, fail: bool) {
        self.state.lock().fail_loads = fail;
    }

    /// The last successfully saved snapshot
    pub fn stored(&self) -> Snapshot {
        self.state.lock().snapshot.clone()
    }

    /// Number of successful saves
    pub fn save_count(&self) -> u64 {
        self.state.lock().saves
    }
}

impl Backend for MemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn durability(&self) -> Durability {
        Durability::Volatile
    }

    fn load(&self) -> Result<Snapshot> {
        let state = self.state.lock();
        if state.fail_loads {
            return Err(RosterError::BackendUnavailable(
                "memory backend set to fail loads".to_string(),
            ));
        }
        Ok(state.snapshot.clone())
    }

    fn save(&self, snapshot: &Snapshot) -> Result<()> {
        let mut state = self.state.lock();
        if state.fail_writes {
            return Err(RosterError::BackendWriteFailed(
                "memory backend set to fail writes".to_string(),
            ));
        }
        state.snapshot = snapshot.clone();
        state.saves += 1;
        Ok(())
    }
}
