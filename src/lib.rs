//! # RosterDB
//!
//! A persistent record store with:
//! - One collection of flat records keyed by a synthetic id
//! - Identifiers that are never reused, across deletions and restarts
//! - Every mutation persisted before it is acknowledged, rolled back if not
//! - FIFO-serialized writers, concurrent readers
//! - Swappable backends: atomic JSON snapshot, embedded document store
//! - TCP-based client protocol
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      TCP Server                              │
//! │                  (Multiple Clients)                          │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                      Handler                                 │
//! │                (Validation, Routing)                         │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                    Record Store                              │
//! │            (FIFO Writer / Multi Reader)                      │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┼─────────────────┐
//!          │            │                 │
//!          ▼            ▼                 ▼
//!   ┌─────────────┐ ┌─────────────┐ ┌─────────────┐
//!   │ Id Allocator│ │ Working Set │ │   Backend   │
//!   │  (Atomic)   │ │  (RwLock)   │ │ File / Doc  │
//!   └─────────────┘ └─────────────┘ └─────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod record;
pub mod working_set;
pub mod backend;
pub mod store;
pub mod protocol;
pub mod handler;
pub mod network;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use backend::{Backend, DocumentBackend, FileBackend, MemoryBackend};
pub use config::Config;
pub use error::{Result, RosterError};
pub use handler::Handler;
pub use record::{Fields, Record, RecordId, RecordPatch, Snapshot};
pub use store::RecordStore;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of RosterDB
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
