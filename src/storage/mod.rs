//! Storage implementations for different backends

#[cfg(feature = "elasticsearch")]
pub mod elasticsearch;
pub mod in_memory;
#[cfg(feature = "mongodb_backend")]
pub mod mongodb;

#[cfg(feature = "elasticsearch")]
pub use elasticsearch::ElasticsearchAdapter;
pub use in_memory::InMemoryAdapter;
#[cfg(feature = "mongodb_backend")]
pub use mongodb::MongoAdapter;

use crate::config::{AdapterConfig, BackendKind};
use crate::core::error::{AdapterError, AdapterResult};
use crate::core::service::DataAdapter;
use rand::Rng;
use rand::distr::Alphanumeric;
use tracing::Instrument;

/// Length of client-assigned document identifiers
pub const ID_LENGTH: usize = 12;

/// Fresh random alphanumeric identifier of [`ID_LENGTH`] characters
pub fn generate_id() -> String {
    rand::rng()
        .sample_iter(Alphanumeric)
        .take(ID_LENGTH)
        .map(char::from)
        .collect()
}

/// Run one adapter operation inside the adapter span, logging its failure
pub(crate) async fn traced<T, F>(span: &tracing::Span, operation: &'static str, fut: F) -> AdapterResult<T>
where
    F: Future<Output = AdapterResult<T>>,
{
    let result = fut.instrument(span.clone()).await;
    if let Err(err) = &result {
        if err.is_not_found() {
            tracing::debug!(parent: span, operation, error = %err, "operation found nothing");
        } else {
            tracing::warn!(parent: span, operation, error = %err, "operation failed");
        }
    }
    result
}

/// Build an unconnected adapter for the backend named in the configuration
///
/// Fails when the backend's feature flag is not enabled.
pub fn build_adapter(config: AdapterConfig) -> AdapterResult<Box<dyn DataAdapter>> {
    match config.backend {
        BackendKind::InMemory => Ok(Box::new(InMemoryAdapter::new(config))),
        #[cfg(feature = "elasticsearch")]
        BackendKind::Elasticsearch => Ok(Box::new(ElasticsearchAdapter::new(config))),
        #[cfg(feature = "mongodb_backend")]
        BackendKind::Mongodb => Ok(Box::new(MongoAdapter::new(config))),
        #[allow(unreachable_patterns)]
        other => Err(AdapterError::connection(
            &format!("{:?}", other).to_lowercase(),
            "backend support not compiled in (enable its feature flag)",
        )),
    }
}
