//! Record Module
//!
//! The flat records held by the store.
//!
//! ## Shape
//! A record is a system-assigned [`RecordId`] plus an open mapping of field
//! names to JSON values. On disk and on the wire it is one flat object:
//!
//! ```text
//! { "id": 2, "email": "ben@example.com", "first_name": "Ben", ... }
//! ```
//!
//! The store never interprets fields beyond the identifier. Schema checks
//! (required fields, scalar values) belong to the request handler.

mod snapshot;

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use snapshot::Snapshot;

/// Reserved key holding the identifier in serialized records
pub const ID_FIELD: &str = "id";

/// Field name → value mapping of a record
pub type Fields = BTreeMap<String, Value>;

/// Unique, never reused record identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(u64);

impl RecordId {
    /// Identifier value before any record was issued
    pub const ZERO: RecordId = RecordId(0);

    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

impl From<u64> for RecordId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A stored record
///
/// The identifier is fixed at construction and there is no way to change it
/// afterwards; [`Record::merged`] always carries the original id over.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    id: RecordId,

    #[serde(flatten)]
    fields: Fields,
}

impl Record {
    /// Build a record, dropping any `id` key smuggled into `fields`
    pub fn new(id: RecordId, mut fields: Fields) -> Self {
        fields.remove(ID_FIELD);
        Self { id, fields }
    }

    pub fn id(&self) -> RecordId {
        self.id
    }

    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    /// Look up a single field
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Copy of this record with `patch` applied on top
    ///
    /// Fields missing from the patch are untouched.
    pub fn merged(&self, patch: &RecordPatch) -> Record {
        let mut fields = self.fields.clone();
        for (name, value) in patch.fields() {
            fields.insert(name.clone(), value.clone());
        }
        Record {
            id: self.id,
            fields,
        }
    }
}

/// Partial update of a record's fields
///
/// Distinct from [`Record`] so an identifier can never travel through an
/// update: the `id` key is discarded on every entry point.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordPatch {
    fields: Fields,
}

impl RecordPatch {
    pub fn new(mut fields: Fields) -> Self {
        fields.remove(ID_FIELD);
        Self { fields }
    }

    /// Add one field to the patch (builder style)
    pub fn set(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        let name = name.into();
        if name != ID_FIELD {
            self.fields.insert(name, value.into());
        }
        self
    }

    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl From<Fields> for RecordPatch {
    fn from(fields: Fields) -> Self {
        Self::new(fields)
    }
}

/// Convenience for building a field map from string pairs
pub fn fields<K, V, I>(pairs: I) -> Fields
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<Value>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}
