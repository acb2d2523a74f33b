use crate::aggregator::{aggregate_at, swap_records, TraderAggregationResult};
use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::error::InsightError;
use crate::executor::{QueryExecutor, RawQueryResult, Transport};
use crate::query_builder::{validate_address, QueryBuilder, QuerySpec};
use log::info;
use serde::{Deserialize, Serialize};

/// One request from the dashboard or export layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QueryRequest {
    Standard(QuerySpec),
    UniqueTraders {
        pool: String,
        window_days: u32,
        bucket_days: u32,
    },
    WalletOverview {
        wallet: String,
        #[serde(default)]
        limit: Option<u32>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "result", rename_all = "snake_case")]
pub enum QueryOutcome {
    Records(RawQueryResult),
    UniqueTraders(TraderAggregationResult),
}

/// Builds, runs and post-processes [`QueryRequest`]s against one subgraph.
pub struct QueryHandler<T, C = SystemClock> {
    builder: QueryBuilder<C>,
    executor: QueryExecutor<T>,
    default_limit: u32,
}

impl<T: Transport> QueryHandler<T, SystemClock> {
    pub fn from_config(config: &Config, transport: T) -> Result<Self, InsightError> {
        let schema = config.schema_registry()?;
        let executor = QueryExecutor::new(
            transport,
            config.endpoint_url()?,
            config.retry_policy(),
            config.query_deadline(),
        );
        Ok(Self::new(
            QueryBuilder::new(schema, config.max_query_limit),
            executor,
            config.default_query_limit,
        ))
    }
}

impl<T: Transport, C: Clock> QueryHandler<T, C> {
    pub fn new(builder: QueryBuilder<C>, executor: QueryExecutor<T>, default_limit: u32) -> Self {
        Self {
            builder,
            executor,
            default_limit,
        }
    }

    pub async fn handle(&self, request: QueryRequest) -> Result<QueryOutcome, InsightError> {
        match request {
            QueryRequest::Standard(spec) => {
                if let Some(address) = &spec.address {
                    validate_address(address)?;
                }
                info!("Running {} query", spec.entity);
                let query = self.builder.build(&spec)?;
                Ok(QueryOutcome::Records(self.executor.execute(&query).await?))
            }
            QueryRequest::UniqueTraders {
                pool,
                window_days,
                bucket_days,
            } => {
                validate_address(&pool)?;
                info!(
                    "Counting unique traders of {} over {} days in {} day buckets",
                    pool, window_days, bucket_days
                );
                // Query window and aggregation window end at the same instant.
                let now = self.builder.clock().now();
                let query = self
                    .builder
                    .build_unique_traders_query_at(&pool, window_days, bucket_days, now)?;
                let raw = self.executor.execute(&query).await?;
                let swaps = swap_records(&raw)?;
                let result = aggregate_at(swaps, window_days, bucket_days, now)?;
                Ok(QueryOutcome::UniqueTraders(result))
            }
            QueryRequest::WalletOverview { wallet, limit } => {
                validate_address(&wallet)?;
                info!("Running wallet overview for {}", wallet);
                let query = self
                    .builder
                    .build_wallet_overview_query(&wallet, limit.unwrap_or(self.default_limit))?;
                Ok(QueryOutcome::Records(self.executor.execute(&query).await?))
            }
        }
    }
}
