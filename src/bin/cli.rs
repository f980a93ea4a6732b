//! RosterDB CLI Client
//!
//! Command-line interface for interacting with RosterDB.

use clap::{Parser, Subcommand};
use rosterdb::network::Client;
use rosterdb::{Fields, RecordId};
use serde_json::Value;

/// RosterDB CLI
#[derive(Parser, Debug)]
#[command(name = "rosterdb-cli")]
#[command(about = "CLI for the RosterDB record store")]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:8000")]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List all records
    List,

    /// Get a record by id
    Get {
        /// The record id
        id: u64,
    },

    /// Create a record
    Create {
        /// Field as name=value (repeatable)
        #[arg(short, long = "field", value_parser = parse_field)]
        fields: Vec<(String, String)>,
    },

    /// Update some fields of a record
    Update {
        /// The record id
        id: u64,

        /// Field as name=value (repeatable)
        #[arg(short, long = "field", value_parser = parse_field)]
        fields: Vec<(String, String)>,
    },

    /// Delete a record
    Del {
        /// The record id
        id: u64,
    },

    /// Ping the server
    Ping,
}

fn parse_field(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((name, value)) if !name.is_empty() => Ok((name.to_string(), value.to_string())),
        _ => Err(format!("expected name=value, got '{}'", raw)),
    }
}

fn to_fields(pairs: Vec<(String, String)>) -> Fields {
    pairs
        .into_iter()
        .map(|(name, value)| (name, Value::String(value)))
        .collect()
}

fn run(args: Args) -> rosterdb::Result<Value> {
    let mut client = Client::connect(&args.server)?;

    let output = match args.command {
        Commands::List => serde_json::to_value(client.list()?)?,
        Commands::Get { id } => serde_json::to_value(client.get(RecordId::new(id))?)?,
        Commands::Create { fields } => serde_json::to_value(client.create(to_fields(fields))?)?,
        Commands::Update { id, fields } => {
            serde_json::to_value(client.update(RecordId::new(id), to_fields(fields))?)?
        }
        Commands::Del { id } => serde_json::to_value(client.delete(RecordId::new(id))?)?,
        Commands::Ping => {
            client.ping()?;
            Value::String("PONG".to_string())
        }
    };
    Ok(output)
}

fn main() {
    let args = Args::parse();

    match run(args) {
        Ok(output) => match serde_json::to_string_pretty(&output) {
            Ok(text) => println!("{}", text),
            Err(e) => {
                eprintln!("error: {}", e);
                std::process::exit(1);
            }
        },
        Err(e) => {
            eprintln!("error: {}", e);
            std::process::exit(1);
        }
    }
}
