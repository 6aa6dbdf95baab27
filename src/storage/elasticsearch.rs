//! Elasticsearch storage backend
//!
//! `ElasticsearchAdapter` works on a single index. The structured `query` of
//! a filter is an Elasticsearch query DSL object and is used as-is; free-text
//! search becomes a `multi_match`. When both are present the structured
//! query goes into the `filter` of a `bool` query and the text match into its
//! `must`, so hits satisfy both.
//!
//! Writes are issued with refresh enabled so that a following search or
//! count observes them.
//!
//! Gated behind the `elasticsearch` feature flag.

use crate::config::AdapterConfig;
use crate::core::error::{AdapterError, AdapterResult};
use crate::core::filter::Filter;
use crate::core::record::{ID_FIELD, RESULT_FIELD, Record, RemovalSummary, VERSION_FIELD};
use crate::core::service::DataAdapter;
use crate::core::sort::SortSpec;
use crate::core::translate::{MatchClause, TextMatch, TranslatedQuery, translate, translate_count};
use crate::storage::{generate_id, traced};
use async_trait::async_trait;
use elasticsearch::http::StatusCode;
use elasticsearch::http::response::Response;
use elasticsearch::http::Url;
use elasticsearch::http::transport::{
    ConnectionPool, MultiNodeConnectionPool, SingleNodeConnectionPool, Transport, TransportBuilder,
};
use elasticsearch::params::Refresh;
use elasticsearch::{
    CountParts, DeleteByQueryParts, DeleteParts, Elasticsearch, GetParts, IndexParts, SearchParts,
};
use serde_json::{Value, json};
use std::fmt::Debug;
use tracing::Instrument;

const BACKEND: &str = "elasticsearch";

// ---------------------------------------------------------------------------
// Query rendering
// ---------------------------------------------------------------------------

/// Render a match clause as query DSL
pub fn render_clause(clause: &MatchClause) -> Value {
    match clause {
        MatchClause::All => json!({ "match_all": {} }),
        MatchClause::Structured(q) => q.clone(),
        MatchClause::Text(text) => render_text(text),
        MatchClause::Combined { structured, text } => json!({
            "bool": {
                "must": [render_text(text)],
                "filter": [structured]
            }
        }),
    }
}

/// `multi_match` over the given fields, or the index default fields
pub fn render_text(text: &TextMatch) -> Value {
    let mut multi_match = json!({ "query": text.query });
    if let Some(fields) = &text.fields {
        multi_match["fields"] = json!(fields);
    }
    json!({ "multi_match": multi_match })
}

/// Ordered list of `{field: {"order": dir}}` entries
pub fn render_sort(sort: &SortSpec) -> Value {
    Value::Array(
        sort.iter()
            .map(|(field, direction)| json!({ (field): { "order": direction.as_str() } }))
            .collect(),
    )
}

/// Full search request body
pub fn render_search(query: &TranslatedQuery) -> Value {
    let mut body = json!({
        "query": render_clause(&query.clause),
        "track_total_hits": true
    });
    if let Some(size) = query.page.size {
        body["size"] = json!(size);
    }
    if let Some(from) = query.page.from {
        body["from"] = json!(from);
    }
    if let Some(sort) = &query.sort {
        body["sort"] = render_sort(sort);
    }
    body
}

// ---------------------------------------------------------------------------
// Response handling
// ---------------------------------------------------------------------------

/// Turn one hit (`_id` + `_source`) into a record
fn hit_to_record(hit: &Value) -> Record {
    let mut record = hit
        .get("_source")
        .cloned()
        .and_then(Record::from_value)
        .unwrap_or_default();
    if let Some(id) = hit.get(ID_FIELD).and_then(Value::as_str) {
        record.set_id(id);
    }
    record
}

/// Records from a search response body, in hit order
pub fn hits_to_records(body: &Value) -> AdapterResult<Vec<Record>> {
    let hits = body
        .pointer("/hits/hits")
        .and_then(Value::as_array)
        .ok_or_else(|| AdapterError::serialization("search response has no hits"))?;
    Ok(hits.iter().map(hit_to_record).collect())
}

/// The most specific error reason an error body carries
pub fn root_cause(body: &Value) -> Option<String> {
    body.pointer("/error/root_cause/0/reason")
        .or_else(|| body.pointer("/error/reason"))
        .and_then(Value::as_str)
        .or_else(|| body.get("error").and_then(Value::as_str))
        .map(str::to_string)
}

fn reason_or_status(status: StatusCode, body: &Value) -> String {
    root_cause(body).unwrap_or_else(|| status.to_string())
}

/// Read a response as (status, JSON body); non-JSON bodies become a string
async fn read_response(response: Response) -> AdapterResult<(StatusCode, Value)> {
    let status = response.status_code();
    let text = response
        .text()
        .await
        .map_err(|e| AdapterError::transport(BACKEND, format!("Failed to read response: {}", e)))?;

    let body = if text.trim().is_empty() {
        Value::Null
    } else {
        serde_json::from_str(&text).unwrap_or(Value::String(text))
    };
    Ok((status, body))
}

fn send_error(e: elasticsearch::Error) -> AdapterError {
    AdapterError::transport(BACKEND, e.to_string())
}

fn count_field(body: &Value, field: &str) -> AdapterResult<u64> {
    body.get(field)
        .and_then(Value::as_u64)
        .ok_or_else(|| AdapterError::serialization(format!("response has no '{}' count", field)))
}

// ---------------------------------------------------------------------------
// ElasticsearchAdapter
// ---------------------------------------------------------------------------

/// Data adapter backed by one Elasticsearch index
pub struct ElasticsearchAdapter {
    config: AdapterConfig,
    client: Option<Elasticsearch>,
    span: tracing::Span,
}

impl ElasticsearchAdapter {
    pub fn new(config: AdapterConfig) -> Self {
        let span = tracing::info_span!("adapter", backend = BACKEND, index = %config.collection);
        Self::with_span(config, span)
    }

    /// Create an adapter that logs under the given span
    pub fn with_span(config: AdapterConfig, span: tracing::Span) -> Self {
        Self {
            config,
            client: None,
            span,
        }
    }

    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    fn index(&self) -> &str {
        &self.config.collection
    }

    fn client(&self) -> AdapterResult<&Elasticsearch> {
        self.client
            .as_ref()
            .ok_or_else(|| AdapterError::not_connected(BACKEND))
    }

    /// Builds the client; several endpoints are used round-robin.
    fn build_client(config: &AdapterConfig) -> AdapterResult<Elasticsearch> {
        let urls = config
            .endpoints
            .iter()
            .map(|url| {
                url.parse::<Url>().map_err(|e| {
                    AdapterError::connection(BACKEND, format!("Invalid URL {}: {}", url, e))
                })
            })
            .collect::<AdapterResult<Vec<Url>>>()?;

        let transport = match urls.len() {
            0 => return Err(AdapterError::connection(BACKEND, "no endpoint configured")),
            1 => build_transport(SingleNodeConnectionPool::new(urls[0].clone()), config)?,
            _ => build_transport(MultiNodeConnectionPool::round_robin(urls, None), config)?,
        };
        Ok(Elasticsearch::new(transport))
    }
}

fn build_transport<P>(pool: P, config: &AdapterConfig) -> AdapterResult<Transport>
where
    P: ConnectionPool + Debug + Clone + Send + 'static,
{
    TransportBuilder::new(pool)
        .timeout(config.timeout())
        .build()
        .map_err(|e| AdapterError::connection(BACKEND, format!("Failed to build transport: {}", e)))
}

#[async_trait]
impl DataAdapter for ElasticsearchAdapter {
    fn backend_name(&self) -> &'static str {
        BACKEND
    }

    fn is_connected(&self) -> bool {
        self.client.is_some()
    }

    async fn connect(&mut self) -> AdapterResult<()> {
        let client = Self::build_client(&self.config)?;

        async {
            let response = client
                .info()
                .send()
                .await
                .map_err(|e| AdapterError::connection(BACKEND, format!("Could not get cluster info: {}", e)))?;
            let (status, body) = read_response(response).await?;
            if !status.is_success() {
                return Err(AdapterError::connection(
                    BACKEND,
                    format!("Cluster info failed: {}", reason_or_status(status, &body)),
                ));
            }

            let version = body
                .pointer("/version/number")
                .and_then(Value::as_str)
                .unwrap_or("unknown");
            tracing::info!(server_version = version, nodes = self.config.endpoints.len(), "Elasticsearch connected");
            Ok::<_, AdapterError>(())
        }
        .instrument(self.span.clone())
        .await?;

        self.client = Some(client);
        Ok(())
    }

    async fn disconnect(&mut self) -> AdapterResult<()> {
        self.client = None;
        Ok(())
    }

    async fn find(&self, filter: &Filter) -> AdapterResult<Vec<Record>> {
        traced(&self.span, "find", async {
            let client = self.client()?;
            let body = render_search(&translate(filter));
            tracing::trace!(query = %body, "find");

            let response = client
                .search(SearchParts::Index(&[self.index()]))
                .body(body)
                .send()
                .await
                .map_err(send_error)?;
            let (status, body) = read_response(response).await?;

            if !status.is_success() {
                let msg = format!(
                    "error executing search. root cause: {}",
                    reason_or_status(status, &body)
                );
                return Err(AdapterError::backend(BACKEND, Some(status.as_u16()), msg));
            }

            let records = hits_to_records(&body)?;
            tracing::trace!(hits = records.len(), "search result");
            Ok(records)
        })
        .await
    }

    async fn find_by_id(&self, id: &str) -> AdapterResult<Option<Record>> {
        traced(&self.span, "find_by_id", async {
            let response = self
                .client()?
                .get(GetParts::IndexId(self.index(), id))
                .send()
                .await
                .map_err(send_error)?;
            let (status, body) = read_response(response).await?;

            if status.is_success() {
                return Ok(Some(hit_to_record(&body)));
            }
            // A missing document answers 404 with `found: false`; a missing index has an `error`
            if status == StatusCode::NOT_FOUND && body.get("found") == Some(&Value::Bool(false)) {
                return Ok(None);
            }
            Err(AdapterError::backend(
                BACKEND,
                Some(status.as_u16()),
                format!("Error fetching document ID={}: {}", id, reason_or_status(status, &body)),
            ))
        })
        .await
    }

    /// Index the record under a fresh 12-character id.
    async fn insert(&self, record: Record) -> AdapterResult<Record> {
        traced(&self.span, "insert", async {
            let client = self.client()?;
            let doc_id = generate_id();
            let source = record.without_id();

            let response = client
                .index(IndexParts::IndexId(self.index(), &doc_id))
                .body(source.clone().into_value())
                .refresh(Refresh::True)
                .send()
                .await
                .map_err(send_error)?;
            let (status, body) = read_response(response).await?;

            if !status.is_success() {
                return Err(AdapterError::backend(
                    BACKEND,
                    Some(status.as_u16()),
                    format!("[{}] Error indexing document ID={}", status, doc_id),
                ));
            }

            let result = body.get(RESULT_FIELD).cloned().unwrap_or(json!("created"));
            let version = body.get(VERSION_FIELD).cloned().unwrap_or(json!(1));
            tracing::debug!(id = %doc_id, result = %result, version = %version, "document indexed");

            let mut created = source;
            created.set_id(doc_id);
            Ok(created.with(RESULT_FIELD, result).with(VERSION_FIELD, version))
        })
        .await
    }

    async fn count(&self, filter: &Filter) -> AdapterResult<u64> {
        traced(&self.span, "count", async {
            let response = self
                .client()?
                .count(CountParts::Index(&[self.index()]))
                .body(json!({ "query": render_clause(&translate_count(filter)) }))
                .send()
                .await
                .map_err(send_error)?;
            let (status, body) = read_response(response).await?;

            if !status.is_success() {
                return Err(AdapterError::backend(
                    BACKEND,
                    Some(status.as_u16()),
                    format!("error counting documents. root cause: {}", reason_or_status(status, &body)),
                ));
            }
            count_field(&body, "count")
        })
        .await
    }

    async fn remove_all(&self) -> AdapterResult<RemovalSummary> {
        traced(&self.span, "remove_all", async {
            let response = self
                .client()?
                .delete_by_query(DeleteByQueryParts::Index(&[self.index()]))
                .body(json!({ "query": { "match_all": {} } }))
                .refresh(true)
                .send()
                .await
                .map_err(send_error)?;
            let (status, body) = read_response(response).await?;

            if !status.is_success() {
                return Err(AdapterError::backend(
                    BACKEND,
                    Some(status.as_u16()),
                    format!("[{}] Error deleting docs by query", status),
                ));
            }

            let deleted = count_field(&body, "deleted")?;
            tracing::debug!(deleted, "index cleared");
            Ok(RemovalSummary { deleted })
        })
        .await
    }

    async fn remove_by_id(&self, id: &str) -> AdapterResult<()> {
        traced(&self.span, "remove_by_id", async {
            let response = self
                .client()?
                .delete(DeleteParts::IndexId(self.index(), id))
                .refresh(Refresh::True)
                .send()
                .await
                .map_err(send_error)?;
            let (status, body) = read_response(response).await?;

            if status.is_success() {
                return Ok(());
            }
            if status == StatusCode::NOT_FOUND && body.get(RESULT_FIELD) == Some(&json!("not_found")) {
                return Err(AdapterError::not_found(BACKEND, id));
            }
            Err(AdapterError::backend(
                BACKEND,
                Some(status.as_u16()),
                format!("[{}] Error deleting document ID={}", status, id),
            ))
        })
        .await
    }
}
