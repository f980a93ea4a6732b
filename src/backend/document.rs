//! Document backend using rusqlite.
//!
//! Each record is one JSON document in an embedded SQLite database. Unlike
//! the file backend, mutations are pushed one record at a time and rely on
//! the database's own transactions, so atomicity is per record rather than
//! per collection.
//!
//! # Schema
//!
//! ```text
//! documents (id INTEGER PRIMARY KEY, body TEXT, updated_at INTEGER)
//! counters  (name TEXT PRIMARY KEY, value INTEGER)
//! ```
//!
//! `counters` holds the identifier high-water mark under [`ID_COUNTER`].

use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension, Transaction};

use crate::config::{Config, SyncStrategy};
use crate::error::{Result, RosterError};
use crate::record::{Fields, Record, RecordId, Snapshot};

use super::{Backend, Change, Durability};

/// Counter row tracking the highest issued record id
pub const ID_COUNTER: &str = "records";

/// Busy timeout for the shared database file
const BUSY_TIMEOUT_MS: u32 = 5000;

/// One document per record in an embedded database
///
/// Wraps a `rusqlite::Connection` behind a `Mutex` for shared access.
/// Creates the schema automatically on first open.
pub struct DocumentBackend {
    conn: Mutex<Connection>,

    /// `None` for in-memory databases
    path: Option<PathBuf>,
}

impl DocumentBackend {
    /// Open (or create) a document database at the given path
    pub fn open(path: impl AsRef<Path>, sync_strategy: SyncStrategy) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path).map_err(|e| {
            RosterError::BackendUnavailable(format!("cannot open {}: {}", path.display(), e))
        })?;
        Self::init(conn, sync_strategy, Some(path.to_path_buf()))
    }

    /// Open the database named by `config`
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::open(config.database_path(), config.sync_strategy)
    }

    /// Open an in-memory database (useful for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(unavailable)?;
        Self::init(conn, SyncStrategy::Never, None)
    }

    fn init(conn: Connection, sync_strategy: SyncStrategy, path: Option<PathBuf>) -> Result<Self> {
        let synchronous = match sync_strategy {
            SyncStrategy::Always => "FULL",
            SyncStrategy::Never => "OFF",
        };
        conn.execute_batch(&format!(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = {};
             PRAGMA synchronous = {};

             CREATE TABLE IF NOT EXISTS documents (
                 id          INTEGER PRIMARY KEY,
                 body        TEXT NOT NULL,
                 updated_at  INTEGER NOT NULL
             );

             CREATE TABLE IF NOT EXISTS counters (
                 name   TEXT PRIMARY KEY,
                 value  INTEGER NOT NULL
             );",
            BUSY_TIMEOUT_MS, synchronous,
        ))
        .map_err(unavailable)?;

        Ok(Self {
            conn: Mutex::new(conn),
            path,
        })
    }

    /// Database file path, if not in memory
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Number of stored documents
    pub fn document_count(&self) -> Result<u64> {
        let conn = self.conn.lock();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM documents", [], |row| row.get(0))
            .map_err(unavailable)?;
        Ok(count as u64)
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn now_ms() -> i64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as i64
    }

    fn encode_body(record: &Record) -> Result<String> {
        serde_json::to_string(record.fields())
            .map_err(|e| RosterError::BackendWriteFailed(format!("cannot encode record {}: {}", record.id(), e)))
    }

    fn insert_document(tx: &Transaction<'_>, record: &Record) -> Result<()> {
        tx.execute(
            "INSERT INTO documents (id, body, updated_at) VALUES (?1, ?2, ?3)",
            params![to_sql_id(record.id())?, Self::encode_body(record)?, Self::now_ms()],
        )
        .map_err(write_failed)?;
        Ok(())
    }

    /// Raise the stored high-water mark, never lower it
    fn bump_counter(tx: &Transaction<'_>, last_id: RecordId) -> Result<()> {
        tx.execute(
            "INSERT INTO counters (name, value) VALUES (?1, ?2)
             ON CONFLICT(name) DO UPDATE SET value = MAX(value, excluded.value)",
            params![ID_COUNTER, to_sql_id(last_id)?],
        )
        .map_err(write_failed)?;
        Ok(())
    }
}

impl Backend for DocumentBackend {
    fn name(&self) -> &'static str {
        "document"
    }

    fn durability(&self) -> Durability {
        Durability::PerRecord
    }

    fn load(&self) -> Result<Snapshot> {
        let conn = self.conn.lock();

        let mut stmt = conn
            .prepare("SELECT id, body FROM documents ORDER BY id")
            .map_err(unavailable)?;
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)))
            .map_err(unavailable)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(unavailable)?;

        let mut records = Vec::with_capacity(rows.len());
        for (id, body) in rows {
            let id = u64::try_from(id).map_err(|_| {
                RosterError::BackendUnavailable(format!("document has negative id {}", id))
            })?;
            let fields: Fields = serde_json::from_str(&body).map_err(|e| {
                RosterError::BackendUnavailable(format!("corrupt document {}: {}", id, e))
            })?;
            records.push(Record::new(RecordId::new(id), fields));
        }

        let last_id: Option<i64> = conn
            .query_row(
                "SELECT value FROM counters WHERE name = ?1",
                params![ID_COUNTER],
                |row| row.get(0),
            )
            .optional()
            .map_err(unavailable)?;
        let last_id = RecordId::new(last_id.unwrap_or(0).max(0) as u64);

        let snapshot = Snapshot::new(records, last_id);
        snapshot.validate()?;
        Ok(snapshot)
    }

    fn save(&self, snapshot: &Snapshot) -> Result<()> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction().map_err(write_failed)?;

        tx.execute("DELETE FROM documents", []).map_err(write_failed)?;
        for record in snapshot.records() {
            Self::insert_document(&tx, record)?;
        }
        Self::bump_counter(&tx, snapshot.last_id())?;

        tx.commit().map_err(write_failed)
    }

    fn commit(
        &self,
        change: &Change<'_>,
        last_id: RecordId,
        _staged: &dyn Fn() -> Snapshot,
    ) -> Result<()> {
        let mut conn = self.conn.lock();
        // Dropped without commit on any early return, which rolls back
        let tx = conn.transaction().map_err(write_failed)?;

        match change {
            Change::Create(record) => Self::insert_document(&tx, record)?,
            Change::Update { after, .. } => {
                let changed = tx
                    .execute(
                        "UPDATE documents SET body = ?2, updated_at = ?3 WHERE id = ?1",
                        params![to_sql_id(after.id())?, Self::encode_body(after)?, Self::now_ms()],
                    )
                    .map_err(write_failed)?;
                if changed == 0 {
                    return Err(RosterError::BackendWriteFailed(format!(
                        "document {} is missing",
                        after.id()
                    )));
                }
            }
            Change::Delete(record) => {
                let changed = tx
                    .execute(
                        "DELETE FROM documents WHERE id = ?1",
                        params![to_sql_id(record.id())?],
                    )
                    .map_err(write_failed)?;
                if changed == 0 {
                    return Err(RosterError::BackendWriteFailed(format!(
                        "document {} is missing",
                        record.id()
                    )));
                }
            }
        }
        Self::bump_counter(&tx, last_id)?;

        tx.commit().map_err(write_failed)
    }
}

/// SQLite integers are signed
fn to_sql_id(id: RecordId) -> Result<i64> {
    i64::try_from(id.get())
        .map_err(|_| RosterError::BackendWriteFailed(format!("id {} does not fit the database", id)))
}

fn unavailable(e: rusqlite::Error) -> RosterError {
    RosterError::BackendUnavailable(format!("sqlite: {}", e))
}

fn write_failed(e: rusqlite::Error) -> RosterError {
    RosterError::BackendWriteFailed(format!("sqlite: {}", e))
}
