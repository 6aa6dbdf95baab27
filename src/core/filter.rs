//! Backend-agnostic filter payload
//!
//! A [`Filter`] describes what to match, how to paginate and how to order
//! results. It deserializes from the loose JSON payloads callers send:
//!
//! ```json
//! {
//!   "query": {"age": {"$gt": 60}},
//!   "search": "John",
//!   "searchFields": ["name", "midlename"],
//!   "limit": 3,
//!   "offset": 2,
//!   "sort": "name -age"
//! }
//! ```

use crate::core::sort::SortInput;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Filter {
    /// Structured filter in the target backend's native shape
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<Value>,

    /// Free-text search string
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,

    /// Fields the free-text search runs against; ignored without `search`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_fields: Option<Vec<String>>,

    /// Maximum number of records
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,

    /// Number of records to skip
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<SortInput>,
}

impl Filter {
    /// A filter matching every record
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_query(mut self, query: Value) -> Self {
        self.query = Some(query);
        self
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    pub fn with_search_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.search_fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn with_sort(mut self, sort: impl Into<SortInput>) -> Self {
        self.sort = Some(sort.into());
        self
    }

    /// Parse a filter from a JSON payload
    pub fn from_value(value: Value) -> serde_json::Result<Self> {
        serde_json::from_value(value)
    }

    /// Search text, if present and non-blank
    pub fn search_text(&self) -> Option<&str> {
        self.search
            .as_deref()
            .filter(|s| !s.trim().is_empty())
    }

    /// Structured query, if present and not an empty object or null
    pub fn structured_query(&self) -> Option<&Value> {
        match &self.query {
            None | Some(Value::Null) => None,
            Some(Value::Object(map)) if map.is_empty() => None,
            Some(q) => Some(q),
        }
    }
}
