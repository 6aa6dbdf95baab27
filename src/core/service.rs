//! The adapter trait every storage backend implements

use crate::core::error::AdapterResult;
use crate::core::filter::Filter;
use crate::core::record::{Record, RemovalSummary};
use async_trait::async_trait;

/// Executes filters and mutations against one collection of one backend
///
/// Implementations translate filters with [`crate::core::translate`], render
/// the result into their native query shape and normalize responses into
/// [`Record`]s. Adding a backend means implementing this trait; the
/// translator does not change.
///
/// `connect`/`disconnect` take `&mut self`. Once connected, an adapter holds
/// no mutable state and may be shared across tasks (e.g. in an `Arc`).
#[async_trait]
pub trait DataAdapter: Send + Sync {
    /// Short backend identifier used in logs and errors
    fn backend_name(&self) -> &'static str;

    fn is_connected(&self) -> bool;

    /// Build the client and verify the backend is reachable
    async fn connect(&mut self) -> AdapterResult<()>;

    /// Release the client. Safe to call when not connected.
    async fn disconnect(&mut self) -> AdapterResult<()>;

    /// Records matching the filter, in backend order
    async fn find(&self, filter: &Filter) -> AdapterResult<Vec<Record>>;

    /// First record matching the filter, `None` when nothing matches
    async fn find_one(&self, filter: &Filter) -> AdapterResult<Option<Record>> {
        let filter = filter.clone().with_limit(1);
        Ok(self.find(&filter).await?.into_iter().next())
    }

    /// Record with the given identifier, `None` when absent
    async fn find_by_id(&self, id: &str) -> AdapterResult<Option<Record>>;

    /// Store a new record and return it with its identifier and write metadata
    async fn insert(&self, record: Record) -> AdapterResult<Record>;

    /// Number of records matching the structured part of the filter
    async fn count(&self, filter: &Filter) -> AdapterResult<u64>;

    /// Delete every record in the collection
    async fn remove_all(&self) -> AdapterResult<RemovalSummary>;

    /// Delete one record; `NotFound` when the identifier matches nothing
    async fn remove_by_id(&self, id: &str) -> AdapterResult<()>;
}
