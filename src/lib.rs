pub mod aggregator;
pub mod clock;
pub mod config;
pub mod error;
pub mod executor;
pub mod query_builder;
pub mod query_handler;
pub mod schema_registry;

pub use error::InsightError;
pub use query_handler::{QueryHandler, QueryOutcome, QueryRequest};
