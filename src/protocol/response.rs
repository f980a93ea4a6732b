//! Response definitions
//!
//! Represents responses to clients.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;

use crate::error::{Result, RosterError};

/// Response status codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Status {
    Ok = 0x00,
    NotFound = 0x01,
    Error = 0x02,
    Created = 0x03,
    BadRequest = 0x04,
    Unavailable = 0x05,
}

impl Status {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x00 => Some(Status::Ok),
            0x01 => Some(Status::NotFound),
            0x02 => Some(Status::Error),
            0x03 => Some(Status::Created),
            0x04 => Some(Status::BadRequest),
            0x05 => Some(Status::Unavailable),
            _ => None,
        }
    }

    pub fn is_success(self) -> bool {
        matches!(self, Status::Ok | Status::Created)
    }
}

/// A response to send to client
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    /// Status code
    pub status: Status,

    /// Optional JSON payload (record, record list, or `{"error": ...}`)
    pub payload: Option<Vec<u8>>,
}

impl Response {
    /// Create a response carrying `body` as JSON
    pub fn json<T: Serialize + ?Sized>(status: Status, body: &T) -> Self {
        match serde_json::to_vec(body) {
            Ok(payload) => Self {
                status,
                payload: Some(payload),
            },
            Err(e) => Self::error(&format!("cannot encode response: {}", e)),
        }
    }

    /// Create an OK response with a JSON body
    pub fn ok<T: Serialize + ?Sized>(body: &T) -> Self {
        Self::json(Status::Ok, body)
    }

    /// Create a CREATED response with a JSON body
    pub fn created<T: Serialize + ?Sized>(body: &T) -> Self {
        Self::json(Status::Created, body)
    }

    /// Create a PONG response
    pub fn pong() -> Self {
        Self::json(Status::Ok, "PONG")
    }

    /// Create a NOT_FOUND response
    pub fn not_found(message: &str) -> Self {
        Self::with_message(Status::NotFound, message)
    }

    /// Create a BAD_REQUEST response
    pub fn bad_request(message: &str) -> Self {
        Self::with_message(Status::BadRequest, message)
    }

    /// Create an UNAVAILABLE response
    pub fn unavailable(message: &str) -> Self {
        Self::with_message(Status::Unavailable, message)
    }

    /// Create an ERROR response
    pub fn error(message: &str) -> Self {
        Self {
            status: Status::Error,
            payload: Some(json!({ "error": message }).to_string().into_bytes()),
        }
    }

    fn with_message(status: Status, message: &str) -> Self {
        Self::json(status, &json!({ "error": message }))
    }

    /// Map a failed operation onto a client-facing response
    pub fn from_error(err: &RosterError) -> Self {
        let message = err.to_string();
        match err {
            RosterError::NotFound { .. } => Self::not_found(&message),
            RosterError::Validation(_) | RosterError::Protocol(_) => Self::bad_request(&message),
            RosterError::BackendUnavailable(_) => Self::unavailable(&message),
            _ => Self::error(&message),
        }
    }

    /// Decode the JSON payload
    pub fn body<T: DeserializeOwned>(&self) -> Result<T> {
        let payload = self.payload.as_deref().unwrap_or(b"null");
        Ok(serde_json::from_slice(payload)?)
    }

    /// Error text carried by a failed response
    pub fn error_message(&self) -> Option<String> {
        let payload = self.payload.as_deref()?;
        let value: serde_json::Value = serde_json::from_slice(payload).ok()?;
        value.get("error")?.as_str().map(str::to_string)
    }
}
