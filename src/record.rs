//! The unit of data moving through the pipeline.
//!
//! A [`Record`] is one row of the source dataset: a flat mapping from field
//! name to scalar value, frozen at the moment it was sampled. On the wire and
//! in object storage it is the same UTF-8 JSON object, so a payload read back
//! from either side deserializes to a record equal to the one sampled.

use std::collections::BTreeMap;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::TicksinkResult;

/// A single scalar cell of a dataset row.
///
/// Variant order matters for deserialization: integers are tried before
/// floats so that `42` survives a round trip as `Int(42)` rather than
/// collapsing to `Float(42.0)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    /// Boolean cell.
    Bool(bool),
    /// Integer cell.
    Int(i64),
    /// Floating point cell.
    Float(f64),
    /// Text cell.
    Text(String),
    /// Missing value.
    Null,
}

/// One immutable row snapshot, keyed by field name.
///
/// Fields are kept in a `BTreeMap` so the serialized form is deterministic.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    fields: BTreeMap<String, Scalar>,
}

impl Record {
    /// Builds a record from field/value pairs.
    pub fn from_fields<I, K>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, Scalar)>,
        K: Into<String>,
    {
        Self {
            fields: fields
                .into_iter()
                .map(|(name, value)| (name.into(), value))
                .collect(),
        }
    }

    /// Looks up a field by name.
    pub fn get(&self, name: &str) -> Option<&Scalar> {
        self.fields.get(name)
    }

    /// Field names of this record, in serialized order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the record has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Serializes the record to its transport payload.
    pub fn to_payload(&self) -> TicksinkResult<Bytes> {
        Ok(Bytes::from(serde_json::to_vec(self)?))
    }

    /// Parses a transport payload back into a record.
    pub fn from_payload(payload: &[u8]) -> TicksinkResult<Self> {
        Ok(serde_json::from_slice(payload)?)
    }
}
