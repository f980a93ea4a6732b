//! Blocking client
//!
//! Speaks the wire protocol to a running server. Used by `rosterdb-cli`.

use std::io::{BufReader, BufWriter};
use std::net::{TcpStream, ToSocketAddrs};

use crate::error::{Result, RosterError};
use crate::protocol::{read_response, write_command, Command, Response, Status};
use crate::record::{Fields, Record, RecordId};

/// Client connection to a RosterDB server
pub struct Client {
    reader: BufReader<TcpStream>,
    writer: BufWriter<TcpStream>,
}

impl Client {
    /// Connect to a server
    pub fn connect(addr: impl ToSocketAddrs) -> Result<Self> {
        let stream = TcpStream::connect(addr)
            .map_err(|e| RosterError::Network(format!("cannot connect: {}", e)))?;
        stream.set_nodelay(true)?;
        let read_stream = stream.try_clone()?;

        Ok(Self {
            reader: BufReader::new(read_stream),
            writer: BufWriter::new(stream),
        })
    }

    /// Send a command and wait for the raw response
    pub fn send(&mut self, command: &Command) -> Result<Response> {
        write_command(&mut self.writer, command)?;
        read_response(&mut self.reader)
    }

    pub fn list(&mut self) -> Result<Vec<Record>> {
        self.call(&Command::List, None)
    }

    pub fn get(&mut self, id: RecordId) -> Result<Record> {
        self.call(&Command::Get { id }, Some(id))
    }

    pub fn create(&mut self, fields: Fields) -> Result<Record> {
        self.call(&Command::Create { fields }, None)
    }

    pub fn update(&mut self, id: RecordId, fields: Fields) -> Result<Record> {
        self.call(&Command::Update { id, fields }, Some(id))
    }

    pub fn delete(&mut self, id: RecordId) -> Result<Record> {
        self.call(&Command::Delete { id }, Some(id))
    }

    pub fn ping(&mut self) -> Result<()> {
        let reply: String = self.call(&Command::Ping, None)?;
        if reply != "PONG" {
            return Err(RosterError::Protocol(format!("unexpected ping reply: {}", reply)));
        }
        Ok(())
    }

    /// Send a command and decode a successful body, or rebuild the error
    fn call<T: serde::de::DeserializeOwned>(&mut self, command: &Command, id: Option<RecordId>) -> Result<T> {
        let response = self.send(command)?;
        if response.status.is_success() {
            return response.body();
        }

        let message = response
            .error_message()
            .unwrap_or_else(|| format!("{:?}", response.status));
        Err(match (response.status, id) {
            (Status::NotFound, Some(id)) => RosterError::NotFound { id },
            (Status::BadRequest, _) => RosterError::Validation(message),
            (Status::Unavailable, _) => RosterError::BackendUnavailable(message),
            _ => RosterError::Network(format!("server error: {}", message)),
        })
    }
}
