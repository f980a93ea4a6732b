//! Request Handler
//!
//! Turns protocol commands into record store calls and store results into
//! responses. Input checks the store does not do live here.
//!
//! ## Validation
//! - Create: every required field present as a non-empty string
//! - Create and update: every value is a scalar (string, number, bool, null)
//! - Update: at least one field other than `id`

use std::sync::Arc;

use serde_json::Value;

use crate::config::Config;
use crate::error::{Result, RosterError};
use crate::protocol::{Command, Response};
use crate::record::{Fields, RecordPatch};
use crate::store::RecordStore;

/// Transport-agnostic request handler
pub struct Handler {
    store: Arc<RecordStore>,

    /// Fields a create must carry
    required_fields: Vec<String>,
}

impl Handler {
    /// Create a handler requiring the given fields on create
    pub fn new(store: Arc<RecordStore>, required_fields: Vec<String>) -> Self {
        Self {
            store,
            required_fields,
        }
    }

    /// Create a handler with the required fields from `config`
    pub fn from_config(store: Arc<RecordStore>, config: &Config) -> Self {
        Self::new(store, config.required_fields.clone())
    }

    /// The store behind this handler
    pub fn store(&self) -> &Arc<RecordStore> {
        &self.store
    }

    /// Execute a command and return a response
    ///
    /// Never fails; errors become error responses.
    pub fn handle(&self, command: Command) -> Response {
        let kind = command.command_type();
        match self.dispatch(command) {
            Ok(response) => response,
            Err(e) => {
                if e.is_client_error() {
                    tracing::debug!("{:?} rejected: {}", kind, e);
                } else {
                    tracing::warn!("{:?} failed: {}", kind, e);
                }
                Response::from_error(&e)
            }
        }
    }

    fn dispatch(&self, command: Command) -> Result<Response> {
        match command {
            Command::List => Ok(Response::ok(&self.store.list())),
            Command::Get { id } => Ok(Response::ok(&self.store.get(id)?)),
            Command::Create { fields } => {
                self.validate_new(&fields)?;
                let record = self.store.create(fields)?;
                Ok(Response::created(&record))
            }
            Command::Update { id, fields } => {
                let patch = self.validate_patch(fields)?;
                Ok(Response::ok(&self.store.update(id, &patch)?))
            }
            Command::Delete { id } => Ok(Response::ok(&self.store.delete(id)?)),
            Command::Ping => Ok(Response::pong()),
        }
    }

    /// Check the fields of a record about to be created
    pub fn validate_new(&self, fields: &Fields) -> Result<()> {
        let missing: Vec<&str> = self
            .required_fields
            .iter()
            .filter(|name| !is_present(fields.get(name.as_str())))
            .map(String::as_str)
            .collect();

        if !missing.is_empty() {
            return Err(RosterError::Validation(format!(
                "missing required fields: {}",
                missing.join(", ")
            )));
        }
        check_scalars(fields)
    }

    /// Check an update body and turn it into a patch
    pub fn validate_patch(&self, fields: Fields) -> Result<RecordPatch> {
        check_scalars(&fields)?;
        let patch = RecordPatch::new(fields);
        if patch.is_empty() {
            return Err(RosterError::Validation(
                "update carries no fields".to_string(),
            ));
        }
        Ok(patch)
    }
}

/// A required field counts only as a non-empty string
fn is_present(value: Option<&Value>) -> bool {
    matches!(value, Some(Value::String(s)) if !s.trim().is_empty())
}

fn check_scalars(fields: &Fields) -> Result<()> {
    for (name, value) in fields {
        if matches!(value, Value::Array(_) | Value::Object(_)) {
            return Err(RosterError::Validation(format!(
                "field '{}' must be a scalar value",
                name
            )));
        }
    }
    Ok(())
}
