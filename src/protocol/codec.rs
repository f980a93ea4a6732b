//! Protocol codec
//!
//! Encoding and decoding functions for the wire protocol.
//!
//! ## Wire Format
//!
//! ### Request (Command) Format
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │ Cmd (1)  │ Len (4)  │         Payload             │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```
//!
//! ### Payload by Command Type
//! - LIST:   empty
//! - GET:    id (8 bytes, big endian)
//! - CREATE: JSON object
//! - UPDATE: id (8 bytes) + JSON object
//! - DELETE: id (8 bytes)
//! - PING:   empty
//!
//! ### Response Format
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │Status(1) │ Len (4)  │         Payload             │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```

use std::io::{Read, Write};

use bytes::{Buf, BufMut, BytesMut};

use super::{Command, CommandType, Response, Status};
use crate::error::{Result, RosterError};
use crate::record::{Fields, RecordId};

/// Header size: 1 byte command/status + 4 bytes length
pub const HEADER_SIZE: usize = 5;

/// Maximum payload size (16 MB)
pub const MAX_PAYLOAD_SIZE: u32 = 16 * 1024 * 1024;

/// Size of an encoded record id
const ID_SIZE: usize = 8;

// =============================================================================
// Command Encoding/Decoding
// =============================================================================

/// Encode a command to bytes
///
/// Format: cmd_type (1) + payload_len (4) + payload
pub fn encode_command(command: &Command) -> Result<Vec<u8>> {
    let mut payload = BytesMut::new();
    match command {
        Command::List | Command::Ping => {}
        Command::Get { id } | Command::Delete { id } => payload.put_u64(id.get()),
        Command::Create { fields } => payload.put_slice(&serde_json::to_vec(fields)?),
        Command::Update { id, fields } => {
            payload.put_u64(id.get());
            payload.put_slice(&serde_json::to_vec(fields)?);
        }
    }

    Ok(frame(command.command_type() as u8, &payload))
}

/// Decode a command from bytes
pub fn decode_command(bytes: &[u8]) -> Result<Command> {
    let (cmd_type, mut payload) = split_frame(bytes, "command")?;

    let Some(cmd_type) = CommandType::from_byte(cmd_type) else {
        return Err(RosterError::Protocol(format!(
            "Unknown command type: 0x{:02x}",
            cmd_type
        )));
    };

    match cmd_type {
        CommandType::List => expect_empty(payload, "LIST").map(|_| Command::List),
        CommandType::Ping => expect_empty(payload, "PING").map(|_| Command::Ping),
        CommandType::Get => {
            let id = take_id(&mut payload, "GET")?;
            expect_empty(payload, "GET")?;
            Ok(Command::Get { id })
        }
        CommandType::Delete => {
            let id = take_id(&mut payload, "DELETE")?;
            expect_empty(payload, "DELETE")?;
            Ok(Command::Delete { id })
        }
        CommandType::Create => Ok(Command::Create {
            fields: decode_fields(payload, "CREATE")?,
        }),
        CommandType::Update => {
            let id = take_id(&mut payload, "UPDATE")?;
            Ok(Command::Update {
                id,
                fields: decode_fields(payload, "UPDATE")?,
            })
        }
    }
}

/// Read the 8-byte id at the front of a payload
fn take_id(payload: &mut &[u8], name: &str) -> Result<RecordId> {
    if payload.remaining() < ID_SIZE {
        return Err(RosterError::Protocol(format!(
            "{} command: missing record id",
            name
        )));
    }
    Ok(RecordId::new(payload.get_u64()))
}

fn expect_empty(payload: &[u8], name: &str) -> Result<()> {
    if !payload.is_empty() {
        return Err(RosterError::Protocol(format!(
            "{} command: unexpected payload of {} bytes",
            name,
            payload.len()
        )));
    }
    Ok(())
}

fn decode_fields(payload: &[u8], name: &str) -> Result<Fields> {
    serde_json::from_slice(payload).map_err(|e| {
        RosterError::Protocol(format!("{} command: body is not a JSON object: {}", name, e))
    })
}

// =============================================================================
// Response Encoding/Decoding
// =============================================================================

/// Encode a response to bytes
///
/// Format: status (1) + payload_len (4) + payload
pub fn encode_response(response: &Response) -> Vec<u8> {
    let payload = response.payload.as_deref().unwrap_or(&[]);
    frame(response.status as u8, payload)
}

/// Decode a response from bytes
pub fn decode_response(bytes: &[u8]) -> Result<Response> {
    let (status_byte, payload) = split_frame(bytes, "response")?;

    let Some(status) = Status::from_byte(status_byte) else {
        return Err(RosterError::Protocol(format!(
            "Unknown response status: 0x{:02x}",
            status_byte
        )));
    };

    let payload = if payload.is_empty() {
        None
    } else {
        Some(payload.to_vec())
    };

    Ok(Response { status, payload })
}

// =============================================================================
// Framing
// =============================================================================

/// Build header + payload
fn frame(kind: u8, payload: &[u8]) -> Vec<u8> {
    let mut message = BytesMut::with_capacity(HEADER_SIZE + payload.len());
    message.put_u8(kind);
    message.put_u32(payload.len() as u32);
    message.put_slice(payload);
    message.to_vec()
}

/// Validate a complete frame and split it into kind byte and payload
fn split_frame<'a>(bytes: &'a [u8], what: &str) -> Result<(u8, &'a [u8])> {
    if bytes.len() < HEADER_SIZE {
        return Err(RosterError::Protocol(format!(
            "Incomplete {} header: expected {} bytes, got {}",
            what,
            HEADER_SIZE,
            bytes.len()
        )));
    }

    let mut header = &bytes[..HEADER_SIZE];
    let kind = header.get_u8();
    let payload_len = check_payload_len(header.get_u32(), what)?;

    let total_len = HEADER_SIZE + payload_len;
    if bytes.len() < total_len {
        return Err(RosterError::Protocol(format!(
            "Incomplete {} payload: expected {} bytes, got {}",
            what,
            total_len,
            bytes.len()
        )));
    }

    Ok((kind, &bytes[HEADER_SIZE..total_len]))
}

fn check_payload_len(len: u32, what: &str) -> Result<usize> {
    if len > MAX_PAYLOAD_SIZE {
        return Err(RosterError::Protocol(format!(
            "{} payload too large: {} bytes (max {})",
            what, len, MAX_PAYLOAD_SIZE
        )));
    }
    Ok(len as usize)
}

// =============================================================================
// Stream-based I/O helpers
// =============================================================================

/// Read one complete frame from a stream
fn read_frame<R: Read>(reader: &mut R, what: &str) -> Result<Vec<u8>> {
    // Read header first
    let mut header = [0u8; HEADER_SIZE];
    reader.read_exact(&mut header)?;

    let payload_len = check_payload_len((&header[1..]).get_u32(), what)?;

    let mut message = vec![0u8; HEADER_SIZE + payload_len];
    message[..HEADER_SIZE].copy_from_slice(&header);
    if payload_len > 0 {
        reader.read_exact(&mut message[HEADER_SIZE..])?;
    }
    Ok(message)
}

/// Read a complete command from a stream
///
/// Blocks until a complete command is received or an error occurs
pub fn read_command<R: Read>(reader: &mut R) -> Result<Command> {
    decode_command(&read_frame(reader, "command")?)
}

/// Write a command to a stream
pub fn write_command<W: Write>(writer: &mut W, command: &Command) -> Result<()> {
    let bytes = encode_command(command)?;
    writer.write_all(&bytes)?;
    writer.flush()?;
    Ok(())
}

/// Read a complete response from a stream
pub fn read_response<R: Read>(reader: &mut R) -> Result<Response> {
    decode_response(&read_frame(reader, "response")?)
}

/// Write a response to a stream
pub fn write_response<W: Write>(writer: &mut W, response: &Response) -> Result<()> {
    let bytes = encode_response(response);
    writer.write_all(&bytes)?;
    writer.flush()?;
    Ok(())
}
