use crate::executor::RetryPolicy;
use crate::schema_registry::{SchemaError, SchemaRegistry};
use envconfig::Envconfig;
use log::debug;
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;

pub const FORGE_SUBGRAPH: &str = "Forge";
pub const CUSTOM_SUBGRAPH: &str = "Custom";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read environment: {0}")]
    Env(#[from] envconfig::Error),

    #[error("Unknown subgraph: {0}")]
    UnknownSubgraph(String),

    #[error("No URL configured for subgraph {0}")]
    EndpointNotConfigured(String),

    #[error("Invalid subgraph URL: {0}")]
    InvalidSubgraphUrl(String),
}

#[derive(Envconfig, Clone, Debug)]
pub struct Config {
    /// Name of the subgraph to query, a key of [`SubgraphEndpoints`].
    #[envconfig(from = "SUBGRAPH", default = "Forge")]
    pub subgraph: String,

    #[envconfig(
        from = "FORGE_SUBGRAPH_URL",
        default = "https://subgraph.evmos.org/subgraphs/name/forge-subgraph"
    )]
    pub forge_subgraph_url: String,

    #[envconfig(from = "CUSTOM_SUBGRAPH_URL")]
    pub custom_subgraph_url: Option<String>,

    #[envconfig(from = "API_TIMEOUT_SECS", default = "30")]
    pub api_timeout_secs: u64,

    /// Bound on a whole query including retries. Defaults to the worst case
    /// of the retry policy.
    #[envconfig(from = "QUERY_DEADLINE_SECS")]
    pub query_deadline_secs: Option<u64>,

    /// Page size of wallet overview requests that do not name one.
    #[envconfig(from = "DEFAULT_QUERY_LIMIT", default = "100")]
    pub default_query_limit: u32,

    #[envconfig(from = "MAX_QUERY_LIMIT", default = "1000")]
    pub max_query_limit: u32,

    /// Total attempts per query, the first one included.
    #[envconfig(from = "MAX_RETRIES", default = "3")]
    pub max_retries: u32,

    #[envconfig(from = "RETRY_BASE_DELAY_MS", default = "1000")]
    pub retry_base_delay_ms: u64,

    /// JSON schema to use instead of the built-in Forge schema.
    #[envconfig(from = "SCHEMA_JSON_PATH")]
    pub schema_json_path: Option<String>,
}

impl Config {
    pub fn new() -> Result<Self, ConfigError> {
        let config = Self::init_from_env()?;
        debug!(
            "Config loaded: subgraph={}, api_timeout_secs={}, query_deadline_secs={:?}, default_query_limit={}, max_query_limit={}, max_retries={}, retry_base_delay_ms={}, schema_json_path={:?}",
            config.subgraph,
            config.api_timeout_secs,
            config.query_deadline_secs,
            config.default_query_limit,
            config.max_query_limit,
            config.max_retries,
            config.retry_base_delay_ms,
            config.schema_json_path
        );
        Ok(config)
    }

    pub fn endpoints(&self) -> SubgraphEndpoints {
        let mut endpoints = SubgraphEndpoints::forge(&self.forge_subgraph_url);
        if let Some(url) = &self.custom_subgraph_url {
            endpoints.set_custom(url);
        }
        endpoints
    }

    /// URL of the selected subgraph.
    pub fn endpoint_url(&self) -> Result<String, ConfigError> {
        self.endpoints().resolve(&self.subgraph)
    }

    pub fn api_timeout(&self) -> Duration {
        Duration::from_secs(self.api_timeout_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_retries,
            Duration::from_millis(self.retry_base_delay_ms),
        )
    }

    pub fn query_deadline(&self) -> Duration {
        match self.query_deadline_secs {
            Some(secs) => Duration::from_secs(secs),
            None => self.retry_policy().worst_case(self.api_timeout()),
        }
    }

    pub fn schema_registry(&self) -> Result<SchemaRegistry, SchemaError> {
        match &self.schema_json_path {
            Some(path) => SchemaRegistry::from_json_file(path),
            None => Ok(SchemaRegistry::forge()),
        }
    }
}

/// Named subgraph URLs, e.g. `Forge` and a user supplied `Custom`.
#[derive(Debug, Clone, PartialEq)]
pub struct SubgraphEndpoints {
    urls: BTreeMap<String, String>,
}

impl SubgraphEndpoints {
    pub fn forge(forge_url: &str) -> Self {
        let mut urls = BTreeMap::new();
        urls.insert(FORGE_SUBGRAPH.to_string(), forge_url.to_string());
        urls.insert(CUSTOM_SUBGRAPH.to_string(), String::new());
        Self { urls }
    }

    pub fn names(&self) -> Vec<&str> {
        self.urls.keys().map(String::as_str).collect()
    }

    pub fn set_custom(&mut self, url: &str) {
        self.urls
            .insert(CUSTOM_SUBGRAPH.to_string(), url.trim().to_string());
    }

    pub fn resolve(&self, name: &str) -> Result<String, ConfigError> {
        let url = self
            .urls
            .get(name)
            .ok_or_else(|| ConfigError::UnknownSubgraph(name.to_string()))?;
        if url.is_empty() {
            return Err(ConfigError::EndpointNotConfigured(name.to_string()));
        }
        match reqwest::Url::parse(url) {
            Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => Ok(url.clone()),
            _ => Err(ConfigError::InvalidSubgraphUrl(url.clone())),
        }
    }
}
