//! Working Set Module
//!
//! The store's in-memory view of the collection.
//!
//! ## Responsibilities
//! - Serve `get`/`list` without touching the backend
//! - Many concurrent readers, one publisher at a time
//! - Hand out staged copies that mutations edit before persisting
//!
//! ## Data Structure Choice
//! `BTreeMap<RecordId, Record>` behind a `parking_lot::RwLock`:
//! - Ids are allocated in increasing order, so key order is creation order
//! - A staged copy is swapped in whole, so readers never see half a mutation

mod table;

pub use table::{Staged, WorkingSet};
