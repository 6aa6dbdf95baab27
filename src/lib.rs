//! # docquery
//!
//! One query vocabulary for document stores and search engines.
//!
//! A caller describes what it wants with a [`Filter`](core::filter::Filter)
//! (structured query, free-text search, paging and sort) and hands it to a
//! [`DataAdapter`](core::service::DataAdapter). Each adapter translates the
//! filter into its backend's native request, runs it and returns plain
//! [`Record`](core::record::Record)s.
//!
//! ## Features
//!
//! - **Uniform filters**: `search`/`searchFields`, `query`, `limit`, `offset`, `sort`
//! - **Sort strings**: `"name -age"` or `["name", "-age"]`, order preserved
//! - **Mutations**: insert with generated ids, count, remove-all, remove-by-id
//! - **Backends**: Elasticsearch (`elasticsearch` feature), MongoDB
//!   (`mongodb_backend` feature) and an in-memory store (default)
//! - **Configuration**: YAML files or loose settings maps
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use docquery::prelude::*;
//!
//! let config = AdapterConfig::from_yaml_file("adapter.yaml")?;
//! let mut adapter = build_adapter(config)?;
//! adapter.connect().await?;
//!
//! adapter.insert(Record::new().with("name", "John").with("age", 25)).await?;
//!
//! let filter = Filter::new()
//!     .with_search("John")
//!     .with_search_fields(["name"])
//!     .with_sort("-age")
//!     .with_limit(10);
//! for record in adapter.find(&filter).await? {
//!     println!("{:?}", record.get_str("name"));
//! }
//!
//! adapter.disconnect().await?;
//! ```

pub mod config;
pub mod core;
pub mod storage;

/// Re-exports of commonly used types and traits
pub mod prelude {
    // === Core ===
    pub use crate::core::{
        error::{AdapterError, AdapterResult},
        filter::Filter,
        record::{FieldError, Record, RemovalSummary},
        service::DataAdapter,
        sort::{SortDirection, SortInput, SortSpec, parse_sort},
    };

    // === Storage ===
    pub use crate::storage::{InMemoryAdapter, build_adapter};
    #[cfg(feature = "elasticsearch")]
    pub use crate::storage::ElasticsearchAdapter;
    #[cfg(feature = "mongodb_backend")]
    pub use crate::storage::MongoAdapter;

    // === Config ===
    pub use crate::config::{AdapterConfig, BackendKind};

    // === External dependencies ===
    pub use async_trait::async_trait;
    pub use serde_json::{Value, json};
}
