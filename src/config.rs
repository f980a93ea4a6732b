//! Configuration for RosterDB
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

/// Main configuration for a RosterDB instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Root directory for all data files
    /// Internal structure:
    ///   {data_dir}/
    ///     ├── users.json       (snapshot, file backend)
    ///     ├── users.json.ids   (identifier high-water mark)
    ///     └── users.db         (document backend)
    pub data_dir: PathBuf,

    /// Which backend persists the collection
    pub backend: BackendKind,

    /// Snapshot file name (file backend)
    pub snapshot_file: String,

    /// Database file name (document backend)
    pub database_file: String,

    /// Whether saves fsync before returning
    pub sync_strategy: SyncStrategy,

    /// Write the snapshot as indented JSON
    pub pretty_snapshot: bool,

    // -------------------------------------------------------------------------
    // Handler Configuration
    // -------------------------------------------------------------------------
    /// Fields a create request must carry as non-empty strings
    pub required_fields: Vec<String>,

    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// TCP listen address
    pub listen_addr: String,

    /// Number of worker threads serving connections
    pub max_connections: usize,

    /// Connection read timeout (milliseconds)
    pub read_timeout_ms: u64,

    /// Connection write timeout (milliseconds)
    pub write_timeout_ms: u64,
}

/// Durable medium behind the record store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// Whole-collection JSON snapshot, replaced atomically on each save
    File,

    /// One document per record in an embedded database
    Document,

    /// Nothing touches disk
    Memory,
}

/// Snapshot sync strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStrategy {
    /// fsync the file and its directory on every save (safest)
    Always,

    /// Leave flushing to the OS (tests, throwaway data)
    Never,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./rosterdb_data"),
            backend: BackendKind::File,
            snapshot_file: "users.json".to_string(),
            database_file: "users.db".to_string(),
            sync_strategy: SyncStrategy::Always,
            pretty_snapshot: true,
            required_fields: ["first_name", "last_name", "email", "gender"]
                .iter()
                .map(|f| f.to_string())
                .collect(),
            listen_addr: "127.0.0.1:8000".to_string(),
            max_connections: 64,
            read_timeout_ms: 5000,
            write_timeout_ms: 5000,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Full path of the JSON snapshot
    pub fn snapshot_path(&self) -> PathBuf {
        self.data_dir.join(&self.snapshot_file)
    }

    /// Full path of the document database
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(&self.database_file)
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the data directory (root for all storage)
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Select the backend
    pub fn backend(mut self, kind: BackendKind) -> Self {
        self.config.backend = kind;
        self
    }

    /// Set the snapshot file name
    pub fn snapshot_file(mut self, name: impl Into<String>) -> Self {
        self.config.snapshot_file = name.into();
        self
    }

    /// Set the document database file name
    pub fn database_file(mut self, name: impl Into<String>) -> Self {
        self.config.database_file = name.into();
        self
    }

    /// Set the sync strategy
    pub fn sync_strategy(mut self, strategy: SyncStrategy) -> Self {
        self.config.sync_strategy = strategy;
        self
    }

    /// Toggle indented snapshot output
    pub fn pretty_snapshot(mut self, pretty: bool) -> Self {
        self.config.pretty_snapshot = pretty;
        self
    }

    /// Replace the set of fields required on create
    pub fn required_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.required_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Set the TCP listen address
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    /// Set the number of connection worker threads
    pub fn max_connections(mut self, count: usize) -> Self {
        self.config.max_connections = count;
        self
    }

    /// Set the read timeout (in milliseconds)
    pub fn read_timeout_ms(mut self, ms: u64) -> Self {
        self.config.read_timeout_ms = ms;
        self
    }

    /// Set the write timeout (in milliseconds)
    pub fn write_timeout_ms(mut self, ms: u64) -> Self {
        self.config.write_timeout_ms = ms;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
