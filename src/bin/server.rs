//! RosterDB Server Binary
//!
//! Starts the TCP server for RosterDB.

use std::sync::Arc;

use clap::{Parser, ValueEnum};
use rosterdb::config::{BackendKind, SyncStrategy};
use rosterdb::network::Server;
use rosterdb::{Config, Handler, RecordStore};
use tracing_subscriber::{fmt, EnvFilter};

/// RosterDB Server
#[derive(Parser, Debug)]
#[command(name = "rosterdb-server")]
#[command(about = "Persistent record store with atomic snapshots")]
#[command(version)]
struct Args {
    /// Data directory
    #[arg(short, long, default_value = "./rosterdb_data")]
    data_dir: String,

    /// Listen address (host:port)
    #[arg(short, long, default_value = "127.0.0.1:8000")]
    listen: String,

    /// Storage backend
    #[arg(short, long, value_enum, default_value_t = BackendArg::File)]
    backend: BackendArg,

    /// Snapshot file name inside the data directory (file backend)
    #[arg(long, default_value = "users.json")]
    snapshot_file: String,

    /// Database file name inside the data directory (document backend)
    #[arg(long, default_value = "users.db")]
    database_file: String,

    /// Skip fsync on saves
    #[arg(long)]
    no_sync: bool,

    /// Number of connection worker threads
    #[arg(short, long, default_value = "64")]
    max_connections: usize,

    /// Fields required on create (comma separated)
    #[arg(
        long,
        value_delimiter = ',',
        default_values = ["first_name", "last_name", "email", "gender"]
    )]
    required: Vec<String>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum BackendArg {
    File,
    Document,
    Memory,
}

impl From<BackendArg> for BackendKind {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::File => BackendKind::File,
            BackendArg::Document => BackendKind::Document,
            BackendArg::Memory => BackendKind::Memory,
        }
    }
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,rosterdb=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("RosterDB Server v{}", rosterdb::VERSION);
    tracing::info!("Data directory: {}", args.data_dir);
    tracing::info!("Listen address: {}", args.listen);

    // Build config from args
    let config = Config::builder()
        .data_dir(&args.data_dir)
        .listen_addr(&args.listen)
        .backend(args.backend.into())
        .snapshot_file(&args.snapshot_file)
        .database_file(&args.database_file)
        .sync_strategy(if args.no_sync {
            SyncStrategy::Never
        } else {
            SyncStrategy::Always
        })
        .max_connections(args.max_connections)
        .required_fields(args.required)
        .build();

    // Open store; unreadable stored data is fatal rather than silently empty
    let store = match RecordStore::open(&config) {
        Ok(s) => Arc::new(s),
        Err(e) => {
            tracing::error!("Failed to open record store: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!(
        "Record store ready: {} records via {} backend",
        store.len(),
        store.backend_name()
    );

    let handler = Arc::new(Handler::from_config(store, &config));

    let server = match Server::bind(config, handler) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("Failed to start server: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = server.run() {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }

    tracing::info!("Server stopped");
}
