//! Sensor readings and request payloads.

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::{Map, Value};

use crate::error::PayloadError;

/// Name of the collection holding every reading.
pub const COLLECTION: &str = "sensor-data";

/// Field carrying the server-assigned creation time.
pub const TIMESTAMP_FIELD: &str = "timestamp";

const ID_KEY: &str = "id";

/// Schema-less reading body, kept in insertion order.
pub type Payload = Map<String, Value>;

/// One stored reading: the store-assigned id plus whatever fields were sent.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub id: String,
    pub fields: Payload,
}

impl Reading {
    pub fn new(id: impl Into<String>, fields: Payload) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }

    /// The server-assigned creation time, if the store returned one.
    pub fn timestamp(&self) -> Option<&Value> {
        self.fields.get(TIMESTAMP_FIELD)
    }
}

/// Renders as `{"id": .., ...fields}`. A stored field named `id` takes the
/// place of the document id.
impl Serialize for Reading {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let shadowed = self.fields.get(ID_KEY);
        let extra = usize::from(shadowed.is_none());
        let mut map = serializer.serialize_map(Some(self.fields.len() + extra))?;
        match shadowed {
            Some(value) => map.serialize_entry(ID_KEY, value)?,
            None => map.serialize_entry(ID_KEY, &self.id)?,
        }
        for (key, value) in &self.fields {
            if key != ID_KEY {
                map.serialize_entry(key, value)?;
            }
        }
        map.end()
    }
}

/// Parse a request body into a payload.
///
/// An empty (or all-whitespace) body is an empty payload.
pub fn parse_payload(body: &[u8]) -> Result<Payload, PayloadError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Payload::new());
    }
    match serde_json::from_slice::<Value>(body)? {
        Value::Object(map) => Ok(map),
        other => Err(PayloadError::NotAnObject(kind(&other))),
    }
}

/// Drop any client-supplied timestamp; the store assigns its own.
pub fn without_timestamp(mut payload: Payload) -> Payload {
    payload.shift_remove(TIMESTAMP_FIELD);
    payload
}

const fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
