//! Typed error handling for adapter operations
//!
//! Every backend call is inspected as soon as it returns and its outcome is
//! folded into one [`AdapterError`] value, so callers only ever match on a
//! single type regardless of which backend served the request.
//!
//! # Error Categories
//!
//! - [`AdapterError::Connection`]: the client could not be built or the
//!   backend did not answer the reachability check
//! - [`AdapterError::Transport`]: a request could not be sent or its body read
//! - [`AdapterError::Backend`]: the backend answered with an error status;
//!   carries the root cause it reported
//! - [`AdapterError::NotFound`]: a targeted document does not exist
//! - [`AdapterError::Serialization`]: a request or response body was malformed
//!
//! # Example
//!
//! ```rust,ignore
//! match adapter.find(&filter).await {
//!     Ok(records) => println!("{} records", records.len()),
//!     Err(AdapterError::Backend { status, message, .. }) => {
//!         eprintln!("backend refused the query ({:?}): {}", status, message);
//!     }
//!     Err(e) => eprintln!("{}", e),
//! }
//! ```

use thiserror::Error;

/// Result alias used by every adapter operation
pub type AdapterResult<T> = Result<T, AdapterError>;

/// The error type shared by all backends
#[derive(Debug, Error)]
pub enum AdapterError {
    /// Client construction or reachability failure
    #[error("Failed to connect to {backend}: {message}")]
    Connection { backend: String, message: String },

    /// An operation was attempted before `connect()` succeeded
    #[error("{backend} adapter is not connected")]
    NotConnected { backend: String },

    /// The request never produced a usable response
    #[error("{backend} transport error: {message}")]
    Transport { backend: String, message: String },

    /// The backend rejected the request
    #[error("{}", format_backend(.backend, .status, .message))]
    Backend {
        backend: String,
        status: Option<u16>,
        message: String,
    },

    /// No document matched the given identifier
    #[error("{backend}: document '{id}' not found")]
    NotFound { backend: String, id: String },

    /// Malformed request or response body
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// The structured query cannot be expressed for this backend
    #[error("Invalid query: {message}")]
    InvalidQuery { message: String },
}

fn format_backend(backend: &str, status: &Option<u16>, message: &str) -> String {
    match status {
        Some(code) => format!("{} error [{}]: {}", backend, code, message),
        None => format!("{} error: {}", backend, message),
    }
}

impl AdapterError {
    pub fn connection(backend: &str, message: impl Into<String>) -> Self {
        AdapterError::Connection {
            backend: backend.to_string(),
            message: message.into(),
        }
    }

    pub fn transport(backend: &str, message: impl Into<String>) -> Self {
        AdapterError::Transport {
            backend: backend.to_string(),
            message: message.into(),
        }
    }

    pub fn backend(backend: &str, status: Option<u16>, message: impl Into<String>) -> Self {
        AdapterError::Backend {
            backend: backend.to_string(),
            status,
            message: message.into(),
        }
    }

    pub fn not_connected(backend: &str) -> Self {
        AdapterError::NotConnected {
            backend: backend.to_string(),
        }
    }

    pub fn not_found(backend: &str, id: impl Into<String>) -> Self {
        AdapterError::NotFound {
            backend: backend.to_string(),
            id: id.into(),
        }
    }

    pub fn serialization(message: impl Into<String>) -> Self {
        AdapterError::Serialization {
            message: message.into(),
        }
    }

    pub fn invalid_query(message: impl Into<String>) -> Self {
        AdapterError::InvalidQuery {
            message: message.into(),
        }
    }

    /// HTTP-like status code reported by the backend, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            AdapterError::Backend { status, .. } => *status,
            AdapterError::NotFound { .. } => Some(404),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, AdapterError::NotFound { .. })
    }

    /// Connection-tier failures leave the adapter unusable until reconnected
    pub fn is_connection(&self) -> bool {
        matches!(
            self,
            AdapterError::Connection { .. } | AdapterError::NotConnected { .. }
        )
    }
}

impl From<serde_json::Error> for AdapterError {
    fn from(err: serde_json::Error) -> Self {
        AdapterError::serialization(err.to_string())
    }
}

#[cfg(feature = "mongodb_backend")]
impl From<mongodb::bson::ser::Error> for AdapterError {
    fn from(err: mongodb::bson::ser::Error) -> Self {
        AdapterError::serialization(err.to_string())
    }
}

#[cfg(feature = "mongodb_backend")]
impl From<mongodb::bson::de::Error> for AdapterError {
    fn from(err: mongodb::bson::de::Error) -> Self {
        AdapterError::serialization(err.to_string())
    }
}
