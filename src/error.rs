use crate::aggregator::AggregationError;
use crate::config::ConfigError;
use crate::executor::{ExecutorError, TransportError};
use crate::query_builder::QueryBuilderError;
use crate::schema_registry::SchemaError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum InsightError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    QueryBuilder(#[from] QueryBuilderError),

    #[error(transparent)]
    Executor(#[from] ExecutorError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Aggregation(#[from] AggregationError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, InsightError>;
