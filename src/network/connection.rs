//! Connection Handler
//!
//! Serves one client: read a command, run it through the [`Handler`],
//! write the response, repeat until the client goes away.

use std::io::{self, BufReader, BufWriter, ErrorKind};
use std::net::TcpStream;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{Result, RosterError};
use crate::handler::Handler;
use crate::protocol::{read_command, write_response, Command, Response};

/// A single client connection
pub struct Connection {
    reader: BufReader<TcpStream>,
    writer: BufWriter<TcpStream>,

    /// Shared by every connection of the server
    handler: Arc<Handler>,

    /// Peer address for logging
    peer_addr: String,

    /// Commands answered so far
    served: u64,
}

/// Why reading the next command stopped
enum Closed {
    /// Client hung up or went idle past the read timeout
    Quietly,

    /// Malformed frame or I/O failure worth reporting
    WithError(RosterError),
}

impl Connection {
    /// Wrap an accepted stream with buffered reader and writer halves
    pub fn new(stream: TcpStream, handler: Arc<Handler>) -> Result<Self> {
        let peer_addr = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        stream.set_nodelay(true)?;
        let read_half = stream.try_clone()?;

        Ok(Self {
            reader: BufReader::new(read_half),
            writer: BufWriter::new(stream),
            handler,
            peer_addr,
            served: 0,
        })
    }

    /// Configure connection timeouts (0 disables a timeout)
    pub fn set_timeouts(&mut self, read_ms: u64, write_ms: u64) -> Result<()> {
        let as_timeout = |ms: u64| (ms > 0).then(|| Duration::from_millis(ms));

        self.reader.get_ref().set_read_timeout(as_timeout(read_ms))?;
        self.writer.get_ref().set_write_timeout(as_timeout(write_ms))?;
        Ok(())
    }

    /// Serve commands until the client disconnects (blocking)
    ///
    /// A command that was read always runs to completion, even if the
    /// client is gone by the time the response is written.
    pub fn handle(&mut self) -> Result<()> {
        tracing::debug!("Connection established from {}", self.peer_addr);

        let result = loop {
            let command = match self.next_command() {
                Ok(command) => command,
                Err(Closed::Quietly) => break Ok(()),
                Err(Closed::WithError(e)) => {
                    tracing::warn!("Bad request from {}: {}", self.peer_addr, e);
                    // Best effort; the stream may already be unusable
                    let _ = write_response(&mut self.writer, &Response::from_error(&e));
                    break Err(e);
                }
            };

            tracing::trace!("Received command from {}: {:?}", self.peer_addr, command);
            let response = self.handler.handle(command);
            self.served += 1;

            match write_response(&mut self.writer, &response) {
                Ok(()) => {}
                Err(RosterError::Io(ref e)) if is_disconnect(e) => {
                    tracing::debug!("Client {} left before its response was sent", self.peer_addr);
                    break Ok(());
                }
                Err(e) => break Err(e),
            }
        };

        tracing::debug!(
            "Connection from {} closed after {} commands",
            self.peer_addr,
            self.served
        );
        result
    }

    fn next_command(&mut self) -> std::result::Result<Command, Closed> {
        read_command(&mut self.reader).map_err(|e| match e {
            RosterError::Io(ref io_err) if is_disconnect(io_err) || is_timeout(io_err) => {
                Closed::Quietly
            }
            other => Closed::WithError(other),
        })
    }

    /// Get the peer address string
    pub fn peer_addr(&self) -> &str {
        &self.peer_addr
    }
}

fn is_disconnect(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        ErrorKind::UnexpectedEof
            | ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::BrokenPipe
    )
}

/// Windows reports TimedOut where unix reports WouldBlock
fn is_timeout(e: &io::Error) -> bool {
    matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut)
}
