//! MongoDB storage backend using the official MongoDB async driver.
//!
//! Provides `MongoAdapter`, a [`DataAdapter`] over one collection of a
//! MongoDB database.
//!
//! # Feature flag
//!
//! This module is gated behind the `mongodb_backend` feature flag:
//! ```toml
//! [dependencies]
//! docquery = { version = "0.1", features = ["mongodb_backend"] }
//! ```
//!
//! # Query rendering
//!
//! The structured `query` of a filter is a MongoDB filter document and is
//! passed through unchanged. Free-text search becomes a case-insensitive
//! `$regex` per search field, OR-ed together; without search fields it
//! becomes a `$text` query, which needs a text index on the collection.
//! A structured query and a text search are combined with `$and`.
//!
//! # Serialization strategy
//!
//! Records are converted through `serde_json::Value` into BSON documents.
//! On the way back, the `_id` (usually an `ObjectId`) is exposed as its hex
//! string and the remaining fields are rendered as relaxed extended JSON.

use crate::config::AdapterConfig;
use crate::core::error::{AdapterError, AdapterResult};
use crate::core::filter::Filter;
use crate::core::record::{ID_FIELD, RESULT_FIELD, Record, RemovalSummary};
use crate::core::service::DataAdapter;
use crate::core::sort::SortSpec;
use crate::core::translate::{MatchClause, TextMatch, translate, translate_count};
use crate::storage::traced;
use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::oid::ObjectId;
use mongodb::bson::{Bson, Document, doc};
use mongodb::error::ErrorKind;
use mongodb::options::ClientOptions;
use mongodb::{Client, Collection};
use serde_json::Value;
use tracing::Instrument;

const BACKEND: &str = "mongodb";

// ---------------------------------------------------------------------------
// Conversion helpers
// ---------------------------------------------------------------------------

/// Convert a serde_json::Value (expected to be an Object) into a BSON Document.
fn json_to_document(json: &Value) -> AdapterResult<Document> {
    match mongodb::bson::to_bson(json)? {
        Bson::Document(d) => Ok(d),
        _ => Err(AdapterError::invalid_query(format!(
            "expected a document, got non-object: {}",
            json
        ))),
    }
}

/// Convert a BSON Document into a Record, exposing `_id` as a string.
fn document_to_record(mut doc: Document) -> Record {
    let id = doc.remove(ID_FIELD);
    let mut record = Record::from_value(Bson::Document(doc).into_relaxed_extjson()).unwrap_or_default();
    if let Some(id) = id {
        record.set_id(id_to_string(&id));
    }
    record
}

fn id_to_string(id: &Bson) -> String {
    match id {
        Bson::ObjectId(oid) => oid.to_hex(),
        Bson::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Filter on `_id` accepting both ObjectId and plain string identifiers.
fn id_filter(id: &str) -> Document {
    match ObjectId::parse_str(id) {
        Ok(oid) => doc! { ID_FIELD: { "$in": [oid, id] } },
        Err(_) => doc! { ID_FIELD: id },
    }
}

// ---------------------------------------------------------------------------
// Query rendering
// ---------------------------------------------------------------------------

/// Render a match clause as a MongoDB filter document.
pub fn render_filter(clause: &MatchClause) -> AdapterResult<Document> {
    Ok(match clause {
        MatchClause::All => Document::new(),
        MatchClause::Structured(q) => json_to_document(q)?,
        MatchClause::Text(text) => render_text(text),
        MatchClause::Combined { structured, text } => {
            doc! { "$and": [json_to_document(structured)?, render_text(text)] }
        }
    })
}

/// Render a free-text match.
pub fn render_text(text: &TextMatch) -> Document {
    match &text.fields {
        Some(fields) => {
            let pattern = mongodb::bson::Regex {
                pattern: regex::escape(&text.query),
                options: "i".to_string(),
            };
            let clauses: Vec<Document> = fields
                .iter()
                .map(|field| doc! { field.as_str(): { "$regex": pattern.clone() } })
                .collect();
            doc! { "$or": clauses }
        }
        None => doc! { "$text": { "$search": text.query.as_str() } },
    }
}

/// Render a sort as `{field: 1 | -1}` in parse order.
pub fn render_sort(sort: &SortSpec) -> Document {
    let mut doc = Document::new();
    for (field, direction) in sort.iter() {
        doc.insert(field, direction.as_i32());
    }
    doc
}

// ---------------------------------------------------------------------------
// Error mapping
// ---------------------------------------------------------------------------

/// Fold a driver error into the adapter taxonomy.
fn map_error(err: mongodb::error::Error, context: &str) -> AdapterError {
    match err.kind.as_ref() {
        ErrorKind::Command(cmd) => AdapterError::backend(
            BACKEND,
            None,
            format!("{}: [{}] {}", context, cmd.code_name, cmd.message),
        ),
        ErrorKind::Write(_) | ErrorKind::InvalidArgument { .. } => {
            AdapterError::backend(BACKEND, None, format!("{}: {}", context, err))
        }
        ErrorKind::BsonSerialization(_) | ErrorKind::BsonDeserialization(_) => {
            AdapterError::serialization(format!("{}: {}", context, err))
        }
        _ => AdapterError::transport(BACKEND, format!("{}: {}", context, err)),
    }
}

// ---------------------------------------------------------------------------
// MongoAdapter
// ---------------------------------------------------------------------------

#[derive(Clone, Debug)]
struct MongoConnection {
    client: Client,
    collection: Collection<Document>,
}

/// Data adapter backed by one MongoDB collection.
///
/// # Example
///
/// ```rust,ignore
/// use docquery::prelude::*;
///
/// let config = AdapterConfig::new(BackendKind::Mongodb, "users")
///     .with_endpoints(["mongodb://localhost:27017"])
///     .with_database("app");
/// let mut adapter = MongoAdapter::new(config);
/// adapter.connect().await?;
/// let johns = adapter.find(&Filter::new().with_query(json!({"name": "John"}))).await?;
/// ```
#[derive(Debug)]
pub struct MongoAdapter {
    config: AdapterConfig,
    connection: Option<MongoConnection>,
    span: tracing::Span,
}

impl MongoAdapter {
    pub fn new(config: AdapterConfig) -> Self {
        let span = tracing::info_span!(
            "adapter",
            backend = BACKEND,
            database = %config.database,
            collection = %config.collection
        );
        Self::with_span(config, span)
    }

    /// Create an adapter that logs under the given span
    pub fn with_span(config: AdapterConfig, span: tracing::Span) -> Self {
        Self {
            config,
            connection: None,
            span,
        }
    }

    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    /// The underlying collection handle, once connected
    pub fn collection(&self) -> AdapterResult<&Collection<Document>> {
        self.connection
            .as_ref()
            .map(|c| &c.collection)
            .ok_or_else(|| AdapterError::not_connected(BACKEND))
    }

    async fn build_client(config: &AdapterConfig) -> AdapterResult<Client> {
        let uri = config
            .primary_endpoint()
            .ok_or_else(|| AdapterError::connection(BACKEND, "no endpoint configured"))?;

        let mut options = ClientOptions::parse(uri)
            .await
            .map_err(|e| AdapterError::connection(BACKEND, format!("Invalid URI {}: {}", uri, e)))?;
        options.connect_timeout = Some(config.timeout());
        options.server_selection_timeout = Some(config.timeout());

        Client::with_options(options)
            .map_err(|e| AdapterError::connection(BACKEND, format!("Failed to build client: {}", e)))
    }
}

#[async_trait]
impl DataAdapter for MongoAdapter {
    fn backend_name(&self) -> &'static str {
        BACKEND
    }

    fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    async fn connect(&mut self) -> AdapterResult<()> {
        let span = self.span.clone();
        let config = self.config.clone();
        let connection = async move {
            let client = Self::build_client(&config).await?;
            let database = client.database(&config.database);

            database
                .run_command(doc! { "ping": 1 })
                .await
                .map_err(|e| AdapterError::connection(BACKEND, format!("Ping failed: {}", e)))?;

            tracing::info!("MongoDB connected");
            Ok::<_, AdapterError>(MongoConnection {
                collection: database.collection(&config.collection),
                client,
            })
        }
        .instrument(span)
        .await?;

        self.connection = Some(connection);
        Ok(())
    }

    async fn disconnect(&mut self) -> AdapterResult<()> {
        if let Some(connection) = self.connection.take() {
            connection.client.shutdown().await;
            tracing::debug!(parent: &self.span, "MongoDB disconnected");
        }
        Ok(())
    }

    async fn find(&self, filter: &Filter) -> AdapterResult<Vec<Record>> {
        traced(&self.span, "find", async {
            let collection = self.collection()?;
            let query = translate(filter);
            if query.page.size == Some(0) {
                return Ok(Vec::new());
            }

            let native = render_filter(&query.clause)?;
            tracing::trace!(filter = %native, "find");

            let mut action = collection.find(native);
            if let Some(limit) = query.page.size {
                action = action.limit(i64::try_from(limit).unwrap_or(i64::MAX));
            }
            if let Some(skip) = query.page.from {
                action = action.skip(skip);
            }
            if let Some(sort) = &query.sort {
                action = action.sort(render_sort(sort));
            }

            let cursor = action
                .await
                .map_err(|e| map_error(e, "error executing find"))?;
            let docs: Vec<Document> = cursor
                .try_collect()
                .await
                .map_err(|e| map_error(e, "error reading find results"))?;

            Ok(docs.into_iter().map(document_to_record).collect())
        })
        .await
    }

    async fn find_by_id(&self, id: &str) -> AdapterResult<Option<Record>> {
        traced(&self.span, "find_by_id", async {
            let doc = self
                .collection()?
                .find_one(id_filter(id))
                .await
                .map_err(|e| map_error(e, "error fetching document"))?;

            Ok(doc.map(document_to_record))
        })
        .await
    }

    /// Insert a new document; the server assigns its `_id`.
    async fn insert(&self, record: Record) -> AdapterResult<Record> {
        traced(&self.span, "insert", async {
            let collection = self.collection()?;
            let body = record.without_id();
            let doc = json_to_document(&body.clone().into_value())?;

            let result = collection
                .insert_one(doc)
                .await
                .map_err(|e| map_error(e, "Error inserting document"))?;

            let id = id_to_string(&result.inserted_id);
            tracing::debug!(id = %id, "document inserted");

            let mut created = body;
            created.set_id(id);
            Ok(created.with(RESULT_FIELD, "created"))
        })
        .await
    }

    async fn count(&self, filter: &Filter) -> AdapterResult<u64> {
        traced(&self.span, "count", async {
            let native = render_filter(&translate_count(filter))?;
            self.collection()?
                .count_documents(native)
                .await
                .map_err(|e| map_error(e, "error counting documents"))
        })
        .await
    }

    async fn remove_all(&self) -> AdapterResult<RemovalSummary> {
        traced(&self.span, "remove_all", async {
            let result = self
                .collection()?
                .delete_many(doc! {})
                .await
                .map_err(|e| map_error(e, "Error deleting docs"))?;

            tracing::debug!(deleted = result.deleted_count, "collection cleared");
            Ok(RemovalSummary {
                deleted: result.deleted_count,
            })
        })
        .await
    }

    async fn remove_by_id(&self, id: &str) -> AdapterResult<()> {
        traced(&self.span, "remove_by_id", async {
            let result = self
                .collection()?
                .delete_one(id_filter(id))
                .await
                .map_err(|e| map_error(e, "Error deleting document"))?;

            if result.deleted_count == 0 {
                return Err(AdapterError::not_found(BACKEND, id));
            }
            Ok(())
        })
        .await
    }
}
