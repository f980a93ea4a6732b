//! Error types for RosterDB
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

use crate::record::RecordId;

/// Result type alias using RosterError
pub type Result<T> = std::result::Result<T, RosterError>;

/// Unified error type for RosterDB operations
#[derive(Debug, Error)]
pub enum RosterError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Record Errors
    // -------------------------------------------------------------------------
    #[error("Record {id} not found")]
    NotFound { id: RecordId },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Record identifier space exhausted")]
    IdsExhausted,

    // -------------------------------------------------------------------------
    // Backend Errors
    // -------------------------------------------------------------------------
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Backend write failed: {0}")]
    BackendWriteFailed(String),

    /// A mutation could not be committed; the working set was left unchanged.
    #[error("Persistence error during {operation}: {reason}")]
    Persistence {
        operation: &'static str,
        reason: String,
    },

    // -------------------------------------------------------------------------
    // Serialization Errors
    // -------------------------------------------------------------------------
    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Network Errors
    // -------------------------------------------------------------------------
    #[error("Network error: {0}")]
    Network(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl RosterError {
    /// True for errors caused by the caller rather than the server
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            RosterError::NotFound { .. } | RosterError::Validation(_)
        )
    }
}

impl From<serde_json::Error> for RosterError {
    fn from(e: serde_json::Error) -> Self {
        RosterError::Serialization(e.to_string())
    }
}
