//! Normalized records returned by every backend

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Key under which every backend exposes the document identifier
pub const ID_FIELD: &str = "_id";

/// Write outcome attached to a freshly inserted record (`"created"`)
pub const RESULT_FIELD: &str = "result";

/// Document version attached to a freshly inserted record, when the backend versions documents
pub const VERSION_FIELD: &str = "_version";

/// Failure of a typed field accessor
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    #[error("field '{0}' is missing")]
    Missing(String),

    #[error("field '{field}' is not a {expected}")]
    TypeMismatch {
        field: String,
        expected: &'static str,
    },
}

/// A flat mapping of field name to value
///
/// Backend metadata is stripped before a record reaches the caller; only the
/// identifier survives, always as a string under [`ID_FIELD`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

impl Record {
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Build a record from a JSON value, which must be an object
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    /// Builder-style insert
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(field.into(), value.into());
        self
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(field.into(), value.into())
    }

    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.0.remove(field)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The document identifier, when the backend supplied one
    pub fn id(&self) -> Option<&str> {
        self.0.get(ID_FIELD).and_then(Value::as_str)
    }

    pub fn set_id(&mut self, id: impl Into<String>) {
        self.0.insert(ID_FIELD.to_string(), Value::String(id.into()));
    }

    /// Copy of this record without the identifier, ready to be written
    pub fn without_id(&self) -> Self {
        let mut map = self.0.clone();
        map.remove(ID_FIELD);
        Self(map)
    }

    pub fn get_str(&self, field: &str) -> Result<&str, FieldError> {
        self.typed(field, "string", Value::as_str)
    }

    pub fn get_i64(&self, field: &str) -> Result<i64, FieldError> {
        self.typed(field, "integer", Value::as_i64)
    }

    pub fn get_f64(&self, field: &str) -> Result<f64, FieldError> {
        self.typed(field, "number", Value::as_f64)
    }

    pub fn get_bool(&self, field: &str) -> Result<bool, FieldError> {
        self.typed(field, "boolean", Value::as_bool)
    }

    pub fn get_array(&self, field: &str) -> Result<&Vec<Value>, FieldError> {
        self.typed(field, "array", Value::as_array)
    }

    /// Array of strings; any non-string element is a type mismatch
    pub fn get_string_array(&self, field: &str) -> Result<Vec<&str>, FieldError> {
        self.get_array(field)?
            .iter()
            .map(|v| {
                v.as_str().ok_or_else(|| FieldError::TypeMismatch {
                    field: field.to_string(),
                    expected: "string array",
                })
            })
            .collect()
    }

    fn typed<'a, T>(
        &'a self,
        field: &str,
        expected: &'static str,
        extract: impl FnOnce(&'a Value) -> Option<T>,
    ) -> Result<T, FieldError> {
        let value = self
            .0
            .get(field)
            .ok_or_else(|| FieldError::Missing(field.to_string()))?;
        extract(value).ok_or_else(|| FieldError::TypeMismatch {
            field: field.to_string(),
            expected,
        })
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl From<Map<String, Value>> for Record {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl From<Record> for Value {
    fn from(record: Record) -> Self {
        record.into_value()
    }
}

/// Summary returned by remove-all
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemovalSummary {
    /// Number of documents the backend reported as deleted
    pub deleted: u64,
}
