//! Adapter configuration loading

use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// Which storage backend an adapter talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    #[default]
    Elasticsearch,
    #[serde(alias = "mongo")]
    Mongodb,
    InMemory,
}

/// Connection settings for one adapter
///
/// # Example
///
/// ```yaml
/// backend: mongodb
/// endpoints:
///   - mongodb://localhost:27017
/// collection: users
/// database: app
/// timeout_ms: 2000
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdapterConfig {
    #[serde(default)]
    pub backend: BackendKind,

    /// Connection URIs; left empty, the backend's local default is used
    #[serde(default)]
    pub endpoints: Vec<String>,

    /// Collection (document database) or index (search engine) name
    #[serde(alias = "indexName", alias = "index_name")]
    pub collection: String,

    /// Database name, only used by the document database backend
    #[serde(default = "default_database")]
    pub database: String,

    /// Connection / request timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_endpoints(backend: BackendKind) -> Vec<String> {
    match backend {
        BackendKind::Elasticsearch => vec!["http://localhost:9200".to_string()],
        BackendKind::Mongodb => vec!["mongodb://localhost:27017".to_string()],
        BackendKind::InMemory => Vec::new(),
    }
}

fn default_database() -> String {
    "docquery".to_string()
}

fn default_timeout_ms() -> u64 {
    30000
}

impl AdapterConfig {
    pub fn new(backend: BackendKind, collection: impl Into<String>) -> Self {
        Self {
            backend,
            endpoints: default_endpoints(backend),
            collection: collection.into(),
            database: default_database(),
            timeout_ms: default_timeout_ms(),
        }
    }

    pub fn with_endpoints<I, S>(mut self, endpoints: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.endpoints = endpoints.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// First configured endpoint
    pub fn primary_endpoint(&self) -> Option<&str> {
        self.endpoints.first().map(String::as_str)
    }

    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Load configuration from a YAML string
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let mut config: Self = serde_yaml::from_str(yaml)?;
        config.fill_defaults();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a loose settings map
    ///
    /// Besides the regular keys, `uris` is accepted as a comma-separated
    /// string of endpoints.
    pub fn from_settings(settings: &Value) -> Result<Self> {
        let mut settings = settings
            .as_object()
            .cloned()
            .ok_or_else(|| anyhow!("Adapter settings must be an object"))?;

        if let Some(Value::String(uris)) = settings.remove("uris") {
            let endpoints: Vec<Value> = uris
                .split(',')
                .map(str::trim)
                .filter(|uri| !uri.is_empty())
                .map(|uri| Value::String(uri.to_string()))
                .collect();
            settings.insert("endpoints".to_string(), Value::Array(endpoints));
        }

        let mut config: Self = serde_json::from_value(Value::Object(settings))?;
        config.fill_defaults();
        config.validate()?;
        Ok(config)
    }

    fn fill_defaults(&mut self) {
        if self.endpoints.is_empty() {
            self.endpoints = default_endpoints(self.backend);
        }
    }

    fn validate(&self) -> Result<()> {
        if self.collection.trim().is_empty() {
            return Err(anyhow!("Adapter configuration needs a collection name"));
        }
        if self.endpoints.is_empty() && self.backend != BackendKind::InMemory {
            return Err(anyhow!("Adapter configuration needs at least one endpoint"));
        }
        Ok(())
    }
}
