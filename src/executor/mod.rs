mod envelope;
mod http;
mod retry;

pub use http::HttpTransport;
pub use retry::{RetryError, RetryPolicy};

use async_trait::async_trait;
use log::{debug, error, info};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Status and body of one HTTP exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransportError {
    #[error("Connection failed: {0}")]
    Connect(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Request failed: {0}")]
    Request(String),
}

impl TransportError {
    /// Connection failures (refused, DNS) and timeouts are transient.
    pub fn is_retryable(&self) -> bool {
        matches!(self, TransportError::Connect(_) | TransportError::Timeout(_))
    }
}

/// Sends a JSON body to a URL and returns the raw response.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn post(&self, url: &str, body: &Value) -> Result<TransportResponse, TransportError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn post(&self, url: &str, body: &Value) -> Result<TransportResponse, TransportError> {
        (**self).post(url, body).await
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExecutorError {
    #[error("Network error after {attempts} attempts: {last_error}")]
    NetworkExhausted {
        attempts: u32,
        last_error: TransportError,
    },

    #[error("Transport error: {0}")]
    Transport(TransportError),

    #[error("HTTP status {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("An error occurred while querying the subgraph: {0}")]
    RemoteQueryError(String),

    #[error("No data returned for query")]
    EmptyResponse,

    #[error("Query deadline of {0:?} exceeded")]
    DeadlineExceeded(Duration),
}

/// The `data` object of a successful response: collection name to records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawQueryResult(Map<String, Value>);

impl RawQueryResult {
    pub fn records(&self, collection: &str) -> Option<&Vec<Value>> {
        self.0.get(collection).and_then(Value::as_array)
    }

}

impl TryFrom<Value> for RawQueryResult {
    type Error = ExecutorError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(ExecutorError::MalformedResponse(format!(
                "expected an object as data, got {}",
                other
            ))),
        }
    }
}

/// Runs query text against one subgraph endpoint.
///
/// Transient transport failures are retried according to the
/// [`RetryPolicy`]; everything else fails on the first attempt. The deadline
/// covers the whole retry sequence.
pub struct QueryExecutor<T> {
    transport: T,
    endpoint: String,
    retry_policy: RetryPolicy,
    deadline: Duration,
}

impl<T: Transport> QueryExecutor<T> {
    pub fn new(
        transport: T,
        endpoint: impl Into<String>,
        retry_policy: RetryPolicy,
        deadline: Duration,
    ) -> Self {
        Self {
            transport,
            endpoint: endpoint.into(),
            retry_policy,
            deadline,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry_policy
    }

    pub async fn execute(&self, query: &str) -> Result<RawQueryResult, ExecutorError> {
        self.execute_with_deadline(query, self.deadline).await
    }

    pub async fn execute_with_deadline(
        &self,
        query: &str,
        deadline: Duration,
    ) -> Result<RawQueryResult, ExecutorError> {
        info!("Querying subgraph URL: {}", self.endpoint);
        debug!("Query: {}", query);

        let body = json!({ "query": query });
        let transport = &self.transport;
        let endpoint = self.endpoint.as_str();
        let body = &body;

        let attempts = self
            .retry_policy
            .run(move |_| transport.post(endpoint, body), TransportError::is_retryable);

        let response = match tokio::time::timeout(deadline, attempts).await {
            Ok(Ok(response)) => response,
            Ok(Err(RetryError::Exhausted { attempts, last })) => {
                error!("Network error after {} attempts: {}", attempts, last);
                return Err(ExecutorError::NetworkExhausted {
                    attempts,
                    last_error: last,
                });
            }
            Ok(Err(RetryError::Fatal(e))) => {
                error!("Transport error: {}", e);
                return Err(ExecutorError::Transport(e));
            }
            Err(_) => {
                error!("Query deadline of {:?} exceeded", deadline);
                return Err(ExecutorError::DeadlineExceeded(deadline));
            }
        };

        if !(200..300).contains(&response.status) {
            error!("Subgraph responded with HTTP {}", response.status);
            return Err(ExecutorError::HttpStatus {
                status: response.status,
                body: response.body,
            });
        }

        envelope::classify(&response.body).map_err(|e| {
            error!("Subgraph query failed: {}", e);
            e
        })
    }
}
