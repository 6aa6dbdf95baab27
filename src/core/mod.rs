//! Core module containing the backend-agnostic types and the adapter trait

pub mod error;
pub mod filter;
pub mod record;
pub mod service;
pub mod sort;
pub mod translate;

pub use error::{AdapterError, AdapterResult};
pub use filter::Filter;
pub use record::{FieldError, Record, RemovalSummary};
pub use service::DataAdapter;
pub use sort::{SortDirection, SortInput, SortSpec, parse_sort};
pub use translate::{MatchClause, TextMatch, TranslatedQuery, translate, translate_count};
