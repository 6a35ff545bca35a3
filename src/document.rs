//! Flat key/value documents as exchanged with a document backend.
//!
//! Field readers return [`DecodeError`] naming the offending field, so a codec
//! can be written as a straight sequence of `?` reads.

use crate::error::DecodeError;
use crate::types::Timestamp;
use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;

/// A single field value.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Integer(i64),
    Double(f64),
    String(String),
    Timestamp(Timestamp),
    Array(Vec<FieldValue>),
    Map(Document),
    /// Write-only sentinel: the backend replaces it with its own commit time.
    ServerTimestamp,
    /// Like `ServerTimestamp`, but never earlier than the given floor.
    ServerTimestampAtLeast(Timestamp),
}

impl FieldValue {
    fn type_name(&self) -> &'static str {
        match self {
            FieldValue::Null => "null",
            FieldValue::Bool(_) => "bool",
            FieldValue::Integer(_) => "integer",
            FieldValue::Double(_) => "double",
            FieldValue::String(_) => "string",
            FieldValue::Timestamp(_) => "timestamp",
            FieldValue::Array(_) => "array",
            FieldValue::Map(_) => "map",
            FieldValue::ServerTimestamp | FieldValue::ServerTimestampAtLeast(_) => {
                "server timestamp"
            }
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::String(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::String(s)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Bool(b)
    }
}

impl From<u32> for FieldValue {
    fn from(n: u32) -> Self {
        FieldValue::Integer(n as i64)
    }
}

impl From<i64> for FieldValue {
    fn from(n: i64) -> Self {
        FieldValue::Integer(n)
    }
}

impl From<Timestamp> for FieldValue {
    fn from(ts: Timestamp) -> Self {
        FieldValue::Timestamp(ts)
    }
}

impl From<Document> for FieldValue {
    fn from(doc: Document) -> Self {
        FieldValue::Map(doc)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(FieldValue::Null)
    }
}

/// Ordered field map.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Document {
    fields: BTreeMap<String, FieldValue>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: &str, value: impl Into<FieldValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: &str, value: impl Into<FieldValue>) {
        self.fields.insert(key.to_string(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<FieldValue> {
        self.fields.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldValue)> {
        self.fields.iter()
    }

    /// Overlay `other` onto this document, field by field.
    pub fn merge(&mut self, other: Document) {
        self.fields.extend(other.fields);
    }

    /// Replace every server-timestamp sentinel (at any depth) with `now`, or
    /// with its floor when that is later.
    pub fn resolve_server_timestamps(&mut self, now: Timestamp) {
        for value in self.fields.values_mut() {
            resolve_value(value, now);
        }
    }

    // --- Field readers ---

    fn present(&self, field: &'static str) -> Option<&FieldValue> {
        match self.fields.get(field) {
            None | Some(FieldValue::Null) => None,
            Some(v) => Some(v),
        }
    }

    pub fn string(&self, field: &'static str) -> Result<String, DecodeError> {
        self.opt_string(field)?
            .ok_or(DecodeError::MissingField(field))
    }

    pub fn opt_string(&self, field: &'static str) -> Result<Option<String>, DecodeError> {
        match self.present(field) {
            None => Ok(None),
            Some(FieldValue::String(s)) => Ok(Some(s.clone())),
            Some(other) => Err(DecodeError::WrongType {
                field,
                expected: "string",
                found: other.type_name(),
            }),
        }
    }

    pub fn timestamp(&self, field: &'static str) -> Result<Timestamp, DecodeError> {
        self.opt_timestamp(field)?
            .ok_or(DecodeError::MissingField(field))
    }

    pub fn opt_timestamp(&self, field: &'static str) -> Result<Option<Timestamp>, DecodeError> {
        match self.present(field) {
            None => Ok(None),
            Some(FieldValue::Timestamp(ts)) => Ok(Some(*ts)),
            Some(other) => Err(DecodeError::WrongType {
                field,
                expected: "timestamp",
                found: other.type_name(),
            }),
        }
    }

    pub fn u32(&self, field: &'static str) -> Result<u32, DecodeError> {
        match self.present(field) {
            None => Err(DecodeError::MissingField(field)),
            Some(FieldValue::Integer(n)) => {
                u32::try_from(*n).map_err(|_| DecodeError::InvalidValue {
                    field,
                    value: n.to_string(),
                })
            }
            Some(other) => Err(DecodeError::WrongType {
                field,
                expected: "integer",
                found: other.type_name(),
            }),
        }
    }

    /// Like [`Document::u32`] but a missing field reads as zero.
    pub fn u32_or_zero(&self, field: &'static str) -> Result<u32, DecodeError> {
        match self.present(field) {
            None => Ok(0),
            Some(_) => self.u32(field),
        }
    }

    pub fn map(&self, field: &'static str) -> Result<&Document, DecodeError> {
        match self.present(field) {
            None => Err(DecodeError::MissingField(field)),
            Some(FieldValue::Map(doc)) => Ok(doc),
            Some(other) => Err(DecodeError::WrongType {
                field,
                expected: "map",
                found: other.type_name(),
            }),
        }
    }

    // --- JSON ---

    /// Render as JSON. Timestamps become `{"$timestamp": micros}` and the
    /// server-timestamp sentinel `{"$serverTimestamp": true}`.
    pub fn to_json(&self) -> Value {
        Value::Object(
            self.fields
                .iter()
                .map(|(k, v)| (k.clone(), value_to_json(v)))
                .collect(),
        )
    }

    /// Parse the JSON form produced by [`Document::to_json`]. Returns `None`
    /// if `json` is not an object.
    pub fn from_json(json: &Value) -> Option<Self> {
        match json_to_value(json) {
            FieldValue::Map(doc) => Some(doc),
            _ => None,
        }
    }
}

impl FromIterator<(String, FieldValue)> for Document {
    fn from_iter<I: IntoIterator<Item = (String, FieldValue)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

fn resolve_value(value: &mut FieldValue, now: Timestamp) {
    match value {
        FieldValue::ServerTimestamp => *value = FieldValue::Timestamp(now),
        FieldValue::ServerTimestampAtLeast(floor) => {
            let floor = *floor;
            *value = FieldValue::Timestamp(now.max(floor));
        }
        FieldValue::Map(doc) => doc.resolve_server_timestamps(now),
        FieldValue::Array(items) => items.iter_mut().for_each(|v| resolve_value(v, now)),
        _ => {}
    }
}

fn value_to_json(value: &FieldValue) -> Value {
    match value {
        FieldValue::Null => Value::Null,
        FieldValue::Bool(b) => Value::Bool(*b),
        FieldValue::Integer(n) => Value::Number((*n).into()),
        FieldValue::Double(d) => Number::from_f64(*d).map(Value::Number).unwrap_or(Value::Null),
        FieldValue::String(s) => Value::String(s.clone()),
        FieldValue::Timestamp(ts) => {
            let mut m = Map::new();
            m.insert("$timestamp".into(), Value::Number(ts.0.into()));
            Value::Object(m)
        }
        FieldValue::Array(items) => Value::Array(items.iter().map(value_to_json).collect()),
        FieldValue::Map(doc) => doc.to_json(),
        FieldValue::ServerTimestamp => {
            let mut m = Map::new();
            m.insert("$serverTimestamp".into(), Value::Bool(true));
            Value::Object(m)
        }
        FieldValue::ServerTimestampAtLeast(floor) => {
            let mut m = Map::new();
            m.insert("$serverTimestamp".into(), Value::Number(floor.0.into()));
            Value::Object(m)
        }
    }
}

fn json_to_value(json: &Value) -> FieldValue {
    match json {
        Value::Null => FieldValue::Null,
        Value::Bool(b) => FieldValue::Bool(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => FieldValue::Integer(i),
            None => FieldValue::Double(n.as_f64().unwrap_or(f64::NAN)),
        },
        Value::String(s) => FieldValue::String(s.clone()),
        Value::Array(items) => FieldValue::Array(items.iter().map(json_to_value).collect()),
        Value::Object(m) => {
            if m.len() == 1 {
                if let Some(micros) = m.get("$timestamp").and_then(Value::as_i64) {
                    return FieldValue::Timestamp(Timestamp(micros));
                }
                match m.get("$serverTimestamp") {
                    Some(Value::Bool(true)) => return FieldValue::ServerTimestamp,
                    Some(floor) if floor.is_i64() => {
                        let micros = floor.as_i64().unwrap_or_default();
                        return FieldValue::ServerTimestampAtLeast(Timestamp(micros));
                    }
                    _ => {}
                }
            }
            FieldValue::Map(
                m.iter()
                    .map(|(k, v)| (k.clone(), json_to_value(v)))
                    .collect(),
            )
        }
    }
}
