//! In-memory implementation of DataAdapter for testing and development
//!
//! Structured queries use the document-database dialect (`{"age": {"$gt": 60}}`,
//! `$and`/`$or`/`$nor`, `$in`, `$exists`, `$regex`, ...) and are evaluated
//! directly against the stored records, so the in-memory adapter can stand in
//! for [`MongoAdapter`](crate::storage) in tests.
//!
//! Free-text search with explicit fields is a case-insensitive substring
//! match on those fields. Without fields, the search matches whole words in
//! any top-level string value.

use crate::config::AdapterConfig;
use crate::core::error::{AdapterError, AdapterResult};
use crate::core::filter::Filter;
use crate::core::record::{ID_FIELD, RESULT_FIELD, Record, RemovalSummary, VERSION_FIELD};
use crate::core::service::DataAdapter;
use crate::core::sort::SortSpec;
use crate::core::translate::{MatchClause, TextMatch, translate, translate_count};
use crate::storage::{generate_id, traced};
use async_trait::async_trait;
use regex::{Regex, RegexBuilder};
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::sync::{Arc, RwLock};

const BACKEND: &str = "in_memory";

/// In-memory adapter implementation
///
/// Records live in insertion order behind an `Arc<RwLock<..>>`; clones of an
/// adapter share the same collection.
#[derive(Clone)]
pub struct InMemoryAdapter {
    config: AdapterConfig,
    records: Arc<RwLock<Vec<Record>>>,
    connected: bool,
    span: tracing::Span,
}

impl InMemoryAdapter {
    pub fn new(config: AdapterConfig) -> Self {
        let span = tracing::info_span!("adapter", backend = BACKEND, collection = %config.collection);
        Self::with_span(config, span)
    }

    /// Create an adapter that logs under the given span
    pub fn with_span(config: AdapterConfig, span: tracing::Span) -> Self {
        Self {
            config,
            records: Arc::new(RwLock::new(Vec::new())),
            connected: false,
            span,
        }
    }

    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    fn ensure_connected(&self) -> AdapterResult<()> {
        if self.connected {
            Ok(())
        } else {
            Err(AdapterError::not_connected(BACKEND))
        }
    }

    fn read(&self) -> AdapterResult<std::sync::RwLockReadGuard<'_, Vec<Record>>> {
        self.records
            .read()
            .map_err(|e| AdapterError::transport(BACKEND, format!("Failed to acquire read lock: {}", e)))
    }

    fn write(&self) -> AdapterResult<std::sync::RwLockWriteGuard<'_, Vec<Record>>> {
        self.records
            .write()
            .map_err(|e| AdapterError::transport(BACKEND, format!("Failed to acquire write lock: {}", e)))
    }
}

#[async_trait]
impl DataAdapter for InMemoryAdapter {
    fn backend_name(&self) -> &'static str {
        BACKEND
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    async fn connect(&mut self) -> AdapterResult<()> {
        self.connected = true;
        tracing::info!(parent: &self.span, "in-memory collection ready");
        Ok(())
    }

    async fn disconnect(&mut self) -> AdapterResult<()> {
        self.connected = false;
        Ok(())
    }

    async fn find(&self, filter: &Filter) -> AdapterResult<Vec<Record>> {
        traced(&self.span, "find", async {
            self.ensure_connected()?;
            let query = translate(filter);
            let matcher = Matcher::new(&query.clause)?;

            let mut found = Vec::new();
            for record in self.read()?.iter() {
                if matcher.matches(record)? {
                    found.push(record.clone());
                }
            }

            if let Some(sort) = &query.sort {
                found.sort_by(|a, b| compare_records(a, b, sort));
            }

            let skip = query.page.from.unwrap_or(0) as usize;
            let take = query.page.size.map_or(usize::MAX, |n| n as usize);
            let result: Vec<Record> = found.into_iter().skip(skip).take(take).collect();

            tracing::trace!(count = result.len(), "find result");
            Ok(result)
        })
        .await
    }

    async fn find_by_id(&self, id: &str) -> AdapterResult<Option<Record>> {
        traced(&self.span, "find_by_id", async {
            self.ensure_connected()?;
            Ok(self.read()?.iter().find(|r| r.id() == Some(id)).cloned())
        })
        .await
    }

    async fn insert(&self, record: Record) -> AdapterResult<Record> {
        traced(&self.span, "insert", async {
            self.ensure_connected()?;
            let mut stored = record.without_id();
            let id = generate_id();
            stored.set_id(id.clone());
            self.write()?.push(stored.clone());

            tracing::debug!(id = %id, "record inserted");
            Ok(stored.with(RESULT_FIELD, "created").with(VERSION_FIELD, 1))
        })
        .await
    }

    async fn count(&self, filter: &Filter) -> AdapterResult<u64> {
        traced(&self.span, "count", async {
            self.ensure_connected()?;
            let clause = translate_count(filter);
            let matcher = Matcher::new(&clause)?;
            let mut count = 0;
            for record in self.read()?.iter() {
                if matcher.matches(record)? {
                    count += 1;
                }
            }
            Ok(count)
        })
        .await
    }

    async fn remove_all(&self) -> AdapterResult<RemovalSummary> {
        traced(&self.span, "remove_all", async {
            self.ensure_connected()?;
            let mut records = self.write()?;
            let deleted = records.len() as u64;
            records.clear();
            tracing::debug!(deleted, "collection cleared");
            Ok(RemovalSummary { deleted })
        })
        .await
    }

    async fn remove_by_id(&self, id: &str) -> AdapterResult<()> {
        traced(&self.span, "remove_by_id", async {
            self.ensure_connected()?;
            let mut records = self.write()?;
            let before = records.len();
            records.retain(|r| r.id() != Some(id));
            if records.len() == before {
                return Err(AdapterError::not_found(BACKEND, id));
            }
            Ok(())
        })
        .await
    }
}

// ---------------------------------------------------------------------------
// Query evaluation
// ---------------------------------------------------------------------------

/// A match clause prepared for repeated evaluation
struct Matcher<'a> {
    structured: Option<&'a Map<String, Value>>,
    text: Option<TextMatcher>,
}

struct TextMatcher {
    pattern: Regex,
    fields: Option<Vec<String>>,
}

impl<'a> Matcher<'a> {
    fn new(clause: &'a MatchClause) -> AdapterResult<Self> {
        let (structured, text) = match clause {
            MatchClause::All => (None, None),
            MatchClause::Structured(q) => (Some(q), None),
            MatchClause::Text(t) => (None, Some(t)),
            MatchClause::Combined { structured, text } => (Some(structured), Some(text)),
        };

        let structured = structured
            .map(|q| {
                q.as_object().ok_or_else(|| {
                    AdapterError::invalid_query(format!("structured query must be an object, got {}", q))
                })
            })
            .transpose()?;

        Ok(Self {
            structured,
            text: text.map(TextMatcher::new).transpose()?,
        })
    }

    fn matches(&self, record: &Record) -> AdapterResult<bool> {
        if let Some(query) = self.structured
            && !matches_query(record.as_map(), query)?
        {
            return Ok(false);
        }
        Ok(self.text.as_ref().is_none_or(|t| t.matches(record)))
    }
}

impl TextMatcher {
    fn new(text: &TextMatch) -> AdapterResult<Self> {
        let escaped = regex::escape(&text.query);
        let pattern = match &text.fields {
            Some(_) => escaped,
            None => {
                // `\b` only holds next to a word character
                let is_word = |c: char| c.is_alphanumeric() || c == '_';
                let start = if text.query.chars().next().is_some_and(is_word) { r"\b" } else { "" };
                let end = if text.query.chars().last().is_some_and(is_word) { r"\b" } else { "" };
                format!("{}{}{}", start, escaped, end)
            }
        };
        let pattern = RegexBuilder::new(&pattern)
            .case_insensitive(true)
            .build()
            .map_err(|e| AdapterError::invalid_query(e.to_string()))?;
        Ok(Self {
            pattern,
            fields: text.fields.clone(),
        })
    }

    fn matches(&self, record: &Record) -> bool {
        match &self.fields {
            Some(fields) => fields
                .iter()
                .filter_map(|f| get_path(record.as_map(), f))
                .any(|v| self.matches_value(v)),
            None => record
                .as_map()
                .iter()
                .filter(|(key, _)| key.as_str() != ID_FIELD)
                .any(|(_, v)| self.matches_value(v)),
        }
    }

    fn matches_value(&self, value: &Value) -> bool {
        match value {
            Value::String(s) => self.pattern.is_match(s),
            Value::Array(items) => items.iter().any(|v| self.matches_value(v)),
            _ => false,
        }
    }
}

fn matches_query(doc: &Map<String, Value>, query: &Map<String, Value>) -> AdapterResult<bool> {
    for (key, condition) in query {
        let matched = match key.as_str() {
            "$and" => {
                let mut all = true;
                for sub in sub_queries(key, condition)? {
                    all &= matches_query(doc, sub)?;
                }
                all
            }
            "$or" => {
                let mut any = false;
                for sub in sub_queries(key, condition)? {
                    any |= matches_query(doc, sub)?;
                }
                any
            }
            "$nor" => {
                let mut any = false;
                for sub in sub_queries(key, condition)? {
                    any |= matches_query(doc, sub)?;
                }
                !any
            }
            op if op.starts_with('$') => {
                return Err(AdapterError::invalid_query(format!(
                    "unsupported top-level operator: {}",
                    op
                )));
            }
            path => matches_condition(get_path(doc, path), condition)?,
        };
        if !matched {
            return Ok(false);
        }
    }
    Ok(true)
}

fn sub_queries<'a>(op: &str, value: &'a Value) -> AdapterResult<Vec<&'a Map<String, Value>>> {
    value
        .as_array()
        .ok_or_else(|| AdapterError::invalid_query(format!("{} expects an array", op)))?
        .iter()
        .map(|v| {
            v.as_object()
                .ok_or_else(|| AdapterError::invalid_query(format!("{} expects objects", op)))
        })
        .collect()
}

fn is_operator_object(value: &Value) -> Option<&Map<String, Value>> {
    value
        .as_object()
        .filter(|m| !m.is_empty() && m.keys().all(|k| k.starts_with('$')))
}

/// Truthiness of an `$exists` operand: numbers are true unless zero
fn exists_operand(operand: &Value) -> AdapterResult<bool> {
    match operand {
        Value::Bool(b) => Ok(*b),
        Value::Number(n) => Ok(n.as_f64() != Some(0.0)),
        Value::Null => Ok(false),
        other => Err(AdapterError::invalid_query(format!(
            "$exists expects a boolean or number, got {}",
            other
        ))),
    }
}

fn matches_condition(field: Option<&Value>, condition: &Value) -> AdapterResult<bool> {
    let Some(ops) = is_operator_object(condition) else {
        return Ok(field.is_some_and(|v| values_equal(v, condition)));
    };

    for (op, operand) in ops {
        let ok = match op.as_str() {
            "$eq" => field.is_some_and(|v| values_equal(v, operand)),
            "$ne" => !field.is_some_and(|v| values_equal(v, operand)),
            "$gt" => compare_field(field, operand, |o| o == Ordering::Greater),
            "$gte" => compare_field(field, operand, |o| o != Ordering::Less),
            "$lt" => compare_field(field, operand, |o| o == Ordering::Less),
            "$lte" => compare_field(field, operand, |o| o != Ordering::Greater),
            "$in" => {
                let set = operand
                    .as_array()
                    .ok_or_else(|| AdapterError::invalid_query("$in expects an array"))?;
                field.is_some_and(|v| set.iter().any(|x| values_equal(v, x)))
            }
            "$nin" => {
                let set = operand
                    .as_array()
                    .ok_or_else(|| AdapterError::invalid_query("$nin expects an array"))?;
                !field.is_some_and(|v| set.iter().any(|x| values_equal(v, x)))
            }
            "$exists" => field.is_some() == exists_operand(operand)?,
            "$regex" => {
                let pattern = operand
                    .as_str()
                    .ok_or_else(|| AdapterError::invalid_query("$regex expects a string"))?;
                let case_insensitive = ops
                    .get("$options")
                    .and_then(Value::as_str)
                    .is_some_and(|o| o.contains('i'));
                let re = RegexBuilder::new(pattern)
                    .case_insensitive(case_insensitive)
                    .build()
                    .map_err(|e| AdapterError::invalid_query(e.to_string()))?;
                field.and_then(Value::as_str).is_some_and(|s| re.is_match(s))
            }
            "$options" => true,
            "$not" => !matches_condition(field, operand)?,
            other => {
                return Err(AdapterError::invalid_query(format!(
                    "unsupported operator: {}",
                    other
                )));
            }
        };
        if !ok {
            return Ok(false);
        }
    }
    Ok(true)
}

fn compare_field(field: Option<&Value>, operand: &Value, pred: impl Fn(Ordering) -> bool) -> bool {
    field
        .and_then(|v| compare_values(v, operand))
        .is_some_and(pred)
}

/// Equality with array containment: `{"tags": "a"}` matches `["a", "b"]`
fn values_equal(field: &Value, expected: &Value) -> bool {
    if compare_values(field, expected) == Some(Ordering::Equal) || field == expected {
        return true;
    }
    match field {
        Value::Array(items) if !expected.is_array() => items.iter().any(|v| values_equal(v, expected)),
        _ => false,
    }
}

/// Ordering between two scalars of the same kind; `None` across kinds
fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        _ => None,
    }
}

fn type_rank(v: &Value) -> u8 {
    match v {
        Value::Null => 0,
        Value::Number(_) => 1,
        Value::String(_) => 2,
        Value::Object(_) => 3,
        Value::Array(_) => 4,
        Value::Bool(_) => 5,
    }
}

fn compare_records(a: &Record, b: &Record, sort: &SortSpec) -> Ordering {
    for (field, direction) in sort.iter() {
        let ord = match (get_path(a.as_map(), field), get_path(b.as_map(), field)) {
            (Some(x), Some(y)) => {
                compare_values(x, y).unwrap_or_else(|| type_rank(x).cmp(&type_rank(y)))
            }
            (Some(_), None) => Ordering::Greater,
            (None, Some(_)) => Ordering::Less,
            (None, None) => Ordering::Equal,
        };
        if ord != Ordering::Equal {
            return if direction.as_i32() > 0 { ord } else { ord.reverse() };
        }
    }
    Ordering::Equal
}

/// Dotted-path lookup (`address.city`)
fn get_path<'a>(doc: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
    let mut parts = path.split('.');
    let mut current = doc.get(parts.next()?)?;
    for part in parts {
        current = current.as_object()?.get(part)?;
    }
    Some(current)
}
