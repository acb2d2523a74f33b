mod render;
mod types;

pub use types::{FilterValue, OrderDirection, QuerySpec, TimeWindow, DEFAULT_QUERY_LIMIT};

use crate::clock::{Clock, SystemClock};
use crate::schema_registry::{EntitySchema, SchemaRegistry};
use log::debug;
use render::{collection_name, render_query, sanitize, sanitize_value, Collection};
use std::collections::BTreeMap;
use thiserror::Error;

/// Page size of the unique-traders query. The subgraph never returns more
/// than this many swaps for one request.
pub const UNIQUE_TRADERS_PAGE_SIZE: u32 = 1000;

pub const SECONDS_PER_DAY: i64 = 86_400;

/// Operator suffixes a subgraph accepts after a field name in `where`.
const FILTER_SUFFIXES: &[&str] = &[
    "_not_contains",
    "_starts_with",
    "_ends_with",
    "_contains",
    "_not_in",
    "_not",
    "_gte",
    "_lte",
    "_gt",
    "_lt",
    "_in",
    "_",
];

const WALLET_SWAP_FIELDS: &[&str] = &[
    "id",
    "timestamp",
    "origin",
    "pool",
    "token0",
    "token1",
    "amount0",
    "amount1",
    "amountUSD",
];

const WALLET_POSITION_FIELDS: &[&str] = &[
    "id",
    "owner",
    "pool",
    "token0",
    "token1",
    "liquidity",
    "depositedToken0",
    "depositedToken1",
    "withdrawnToken0",
    "withdrawnToken1",
    "collectedFeesToken0",
    "collectedFeesToken1",
];

#[derive(Error, Debug, Clone, PartialEq)]
pub enum QueryBuilderError {
    #[error("Invalid entity: {0}")]
    InvalidEntity(String),

    #[error("Invalid field for {entity}: {field}")]
    InvalidField { entity: String, field: String },

    #[error("Invalid filter key for {entity}: {key}")]
    InvalidFilterKey { entity: String, key: String },

    #[error("No fields requested for {0}")]
    NoFields(String),

    #[error("Invalid window: {window_days} days in buckets of {bucket_days} days")]
    InvalidWindow { window_days: u32, bucket_days: u32 },

    #[error("Invalid address: {0}")]
    InvalidAddress(String),
}

/// Checks that `address` looks like an EVM address: `0x` and 40 hex digits.
pub fn validate_address(address: &str) -> Result<(), QueryBuilderError> {
    let valid = address
        .strip_prefix("0x")
        .is_some_and(|hex| hex.len() == 40 && hex.chars().all(|c| c.is_ascii_hexdigit()));
    if valid {
        Ok(())
    } else {
        Err(QueryBuilderError::InvalidAddress(address.to_string()))
    }
}

/// Filter key an address is matched against for each entity.
fn address_filter_key(entity: &str) -> Option<&'static str> {
    match entity {
        "Pool" | "Token" => Some("id"),
        "Swap" | "PoolDayData" => Some("pool"),
        "Position" => Some("owner"),
        _ => None,
    }
}

fn is_identifier(key: &str) -> bool {
    let mut chars = key.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// First key inside a nested filter map that is not a plain identifier.
fn invalid_nested_key(value: &FilterValue) -> Option<&str> {
    match value {
        FilterValue::Map(map) => map.iter().find_map(|(key, value)| {
            if is_identifier(key) {
                invalid_nested_key(value)
            } else {
                Some(key.as_str())
            }
        }),
        FilterValue::List(items) => items.iter().find_map(invalid_nested_key),
        _ => None,
    }
}

fn is_valid_filter_key(entity: &EntitySchema, key: &str) -> bool {
    entity.has_field(key)
        || FILTER_SUFFIXES
            .iter()
            .any(|suffix| key.strip_suffix(suffix).is_some_and(|f| entity.has_field(f)))
}

/// Turns [`QuerySpec`]s into GraphQL text for a subgraph.
///
/// Building is pure: the only input besides the [`QuerySpec`] is the injected clock,
/// which time-window filters are computed from.
#[derive(Debug, Clone)]
pub struct QueryBuilder<C = SystemClock> {
    schema: SchemaRegistry,
    max_query_limit: u32,
    clock: C,
}

impl QueryBuilder<SystemClock> {
    pub fn new(schema: SchemaRegistry, max_query_limit: u32) -> Self {
        Self::with_clock(schema, max_query_limit, SystemClock)
    }
}

impl<C: Clock> QueryBuilder<C> {
    pub fn with_clock(schema: SchemaRegistry, max_query_limit: u32, clock: C) -> Self {
        Self {
            schema,
            max_query_limit: max_query_limit.max(1),
            clock,
        }
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn build(&self, spec: &QuerySpec) -> Result<String, QueryBuilderError> {
        let collection = self.prepare(spec, self.clock.now())?;
        let query = render_query(&[collection]);
        debug!("Built query: {}", query);
        Ok(query)
    }

    /// Query for the swaps of one pool over the last `window_days`, oldest
    /// first, as consumed by the trader aggregator.
    pub fn build_unique_traders_query(
        &self,
        pool: &str,
        window_days: u32,
        bucket_days: u32,
    ) -> Result<String, QueryBuilderError> {
        self.build_unique_traders_query_at(pool, window_days, bucket_days, self.clock.now())
    }

    pub fn build_unique_traders_query_at(
        &self,
        pool: &str,
        window_days: u32,
        bucket_days: u32,
        now: i64,
    ) -> Result<String, QueryBuilderError> {
        if window_days == 0 || bucket_days == 0 {
            return Err(QueryBuilderError::InvalidWindow {
                window_days,
                bucket_days,
            });
        }
        let start = now - i64::from(window_days) * SECONDS_PER_DAY;

        let mut filters = BTreeMap::new();
        filters.insert("pool".to_string(), FilterValue::String(sanitize(pool)));
        filters.insert("timestamp_gte".to_string(), FilterValue::from(start));
        filters.insert("timestamp_lte".to_string(), FilterValue::from(now));

        let query = render_query(&[Collection {
            name: "swaps".to_string(),
            first: UNIQUE_TRADERS_PAGE_SIZE,
            filters,
            order: Some(("timestamp".to_string(), OrderDirection::Asc)),
            fields: vec!["origin".to_string(), "timestamp".to_string()],
        }]);
        debug!("Built unique traders query: {}", query);
        Ok(query)
    }

    /// Swaps originated by and positions owned by `wallet`, in one request.
    pub fn build_wallet_overview_query(
        &self,
        wallet: &str,
        limit: u32,
    ) -> Result<String, QueryBuilderError> {
        let now = self.clock.now();
        let swaps = QuerySpec::new("Swap", WALLET_SWAP_FIELDS.iter().copied())
            .filter("origin", wallet)
            .limit(limit);
        let positions = QuerySpec::new("Position", WALLET_POSITION_FIELDS.iter().copied())
            .filter("owner", wallet)
            .limit(limit);

        let query = render_query(&[self.prepare(&swaps, now)?, self.prepare(&positions, now)?]);
        debug!("Built wallet overview query: {}", query);
        Ok(query)
    }

    fn prepare(&self, spec: &QuerySpec, now: i64) -> Result<Collection, QueryBuilderError> {
        let entity = self
            .schema
            .entity(&spec.entity)
            .map_err(|_| QueryBuilderError::InvalidEntity(spec.entity.clone()))?;

        if spec.fields.is_empty() {
            return Err(QueryBuilderError::NoFields(entity.name.clone()));
        }
        let mut fields: Vec<String> = Vec::with_capacity(spec.fields.len());
        for field in &spec.fields {
            if !entity.has_field(field) {
                return Err(QueryBuilderError::InvalidField {
                    entity: entity.name.clone(),
                    field: field.clone(),
                });
            }
            if !fields.contains(field) {
                fields.push(field.clone());
            }
        }

        let order = match &spec.order_by {
            Some(field) if !entity.has_field(field) => {
                return Err(QueryBuilderError::InvalidField {
                    entity: entity.name.clone(),
                    field: field.clone(),
                })
            }
            Some(field) => Some((field.clone(), spec.order_direction)),
            None => None,
        };

        let mut filters = BTreeMap::new();
        for (key, value) in &spec.filters {
            if !is_valid_filter_key(entity, key) {
                return Err(QueryBuilderError::InvalidFilterKey {
                    entity: entity.name.clone(),
                    key: key.clone(),
                });
            }
            if let Some(nested) = invalid_nested_key(value) {
                return Err(QueryBuilderError::InvalidFilterKey {
                    entity: entity.name.clone(),
                    key: format!("{}.{}", key, nested),
                });
            }
            filters.insert(key.clone(), sanitize_value(value.clone()));
        }

        if let Some(address) = &spec.address {
            match address_filter_key(&entity.name) {
                Some(key) => {
                    filters.insert(key.to_string(), FilterValue::String(sanitize(address)));
                }
                None => debug!("Address filter ignored for {}", entity.name),
            }
        }

        // Factory has no timestamp; never send it a time filter.
        if entity.name != "Factory" {
            if let Some(seconds) = spec.time_window.seconds() {
                filters.insert("timestamp_gte".to_string(), FilterValue::from(now - seconds));
            }
        }

        let first = spec.limit.clamp(1, self.max_query_limit);
        if first != spec.limit {
            debug!("Limit {} clamped to {}", spec.limit, first);
        }

        Ok(Collection {
            name: collection_name(&entity.name),
            first,
            filters,
            order,
            fields,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use rstest::*;

    const NOW: i64 = 1_700_000_000;
    const POOL: &str = "0x1f98431c8ad98523631ae4a59f267346ea31f984";

    #[fixture]
    fn builder() -> QueryBuilder<FixedClock> {
        QueryBuilder::with_clock(SchemaRegistry::forge(), 1000, FixedClock(NOW))
    }

    fn projection(query: &str) -> Vec<&str> {
        query
            .lines()
            .filter(|line| line.starts_with("    "))
            .map(str::trim)
            .collect()
    }

    #[rstest]
    fn test_full_query_shape(builder: QueryBuilder<FixedClock>) {
        let spec = QuerySpec::new("Pool", ["id", "volumeUSD"])
            .address("0xabc")
            .limit(5)
            .order_by("volumeUSD", OrderDirection::Desc)
            .time_window(TimeWindow::Last24Hours);

        assert_eq!(
            builder.build(&spec).unwrap(),
            "query {\n  pools(first: 5, where: {id: \"0xabc\", timestamp_gte: 1699913600}, orderBy: volumeUSD, orderDirection: desc) {\n    id\n    volumeUSD\n  }\n}"
        );
    }

    #[rstest]
    fn test_minimal_query_has_no_where(builder: QueryBuilder<FixedClock>) {
        let spec = QuerySpec::new("Token", ["id", "symbol"]);
        assert_eq!(
            builder.build(&spec).unwrap(),
            "query {\n  tokens(first: 100) {\n    id\n    symbol\n  }\n}"
        );
    }

    #[rstest]
    #[case::factory("Factory", "factories")]
    #[case::pool("Pool", "pools")]
    #[case::token("Token", "tokens")]
    #[case::pool_day_data("PoolDayData", "pooldaydatas")]
    fn test_collection_names(
        builder: QueryBuilder<FixedClock>,
        #[case] entity: &str,
        #[case] collection: &str,
    ) {
        let query = builder.build(&QuerySpec::new(entity, ["id"])).unwrap();
        assert!(query.contains(&format!("  {}(first: 100)", collection)));
    }

    #[rstest]
    #[case::pool(&["id", "feeTier", "liquidity"])]
    #[case::single(&["sqrtPrice"])]
    #[case::all_pool_fields(&[
        "id", "token0", "token1", "feeTier", "liquidity", "sqrtPrice",
        "token0Price", "token1Price", "volumeUSD", "txCount"
    ])]
    fn test_projection_is_exactly_requested_fields(
        builder: QueryBuilder<FixedClock>,
        #[case] fields: &[&str],
    ) {
        let spec = QuerySpec::new("Pool", fields.iter().copied()).filter("feeTier", 500i64);
        let query = builder.build(&spec).unwrap();
        assert_eq!(projection(&query), fields.to_vec());
    }

    #[rstest]
    fn test_duplicate_fields_are_projected_once(builder: QueryBuilder<FixedClock>) {
        let spec = QuerySpec::new("Pool", ["id", "id", "txCount"]);
        let query = builder.build(&spec).unwrap();
        assert_eq!(projection(&query), vec!["id", "txCount"]);
    }

    #[rstest]
    #[case::over_max(5000, 1000)]
    #[case::at_max(1000, 1000)]
    #[case::under_max(10, 10)]
    #[case::zero(0, 1)]
    fn test_limit_is_clamped(
        builder: QueryBuilder<FixedClock>,
        #[case] limit: u32,
        #[case] first: u32,
    ) {
        let query = builder
            .build(&QuerySpec::new("Swap", ["id"]).limit(limit))
            .unwrap();
        assert!(query.contains(&format!("swaps(first: {})", first)));
    }

    #[rstest]
    #[case::day(TimeWindow::Last24Hours)]
    #[case::week(TimeWindow::Last7Days)]
    #[case::month(TimeWindow::Last30Days)]
    fn test_factory_never_gets_time_filter(
        builder: QueryBuilder<FixedClock>,
        #[case] window: TimeWindow,
    ) {
        let spec = QuerySpec::new("Factory", ["id", "poolCount"]).time_window(window);
        let query = builder.build(&spec).unwrap();
        assert!(!query.contains("timestamp_gte"));
        assert!(!query.contains("where"));
    }

    #[rstest]
    #[case::day(TimeWindow::Last24Hours, NOW - 86_400)]
    #[case::week(TimeWindow::Last7Days, NOW - 604_800)]
    #[case::month(TimeWindow::Last30Days, NOW - 2_592_000)]
    fn test_time_window_filter(
        builder: QueryBuilder<FixedClock>,
        #[case] window: TimeWindow,
        #[case] start: i64,
    ) {
        let spec = QuerySpec::new("Swap", ["id"]).time_window(window);
        let query = builder.build(&spec).unwrap();
        assert!(query.contains(&format!("where: {{timestamp_gte: {}}}", start)));
    }

    #[rstest]
    #[case::pool("Pool", Some("id"))]
    #[case::token("Token", Some("id"))]
    #[case::swap("Swap", Some("pool"))]
    #[case::pool_day_data("PoolDayData", Some("pool"))]
    #[case::position("Position", Some("owner"))]
    #[case::factory("Factory", None)]
    fn test_address_filter_key(
        builder: QueryBuilder<FixedClock>,
        #[case] entity: &str,
        #[case] key: Option<&str>,
    ) {
        let spec = QuerySpec::new(entity, ["id"]).address(POOL);
        let query = builder.build(&spec).unwrap();
        match key {
            Some(key) => assert!(query.contains(&format!("where: {{{}: \"{}\"}}", key, POOL))),
            None => assert!(!query.contains("where")),
        }
    }

    #[rstest]
    fn test_build_is_deterministic(builder: QueryBuilder<FixedClock>) {
        let spec = QuerySpec::new("Swap", ["id", "amountUSD", "timestamp"])
            .filter("amountUSD_gt", 100i64)
            .filter("token0", "0xdef")
            .address(POOL)
            .order_by("timestamp", OrderDirection::Desc)
            .time_window(TimeWindow::Last7Days);
        assert_eq!(builder.build(&spec).unwrap(), builder.build(&spec).unwrap());
    }

    #[rstest]
    fn test_filters_are_sanitized(builder: QueryBuilder<FixedClock>) {
        let spec = QuerySpec::new("Token", ["id"]).filter("symbol", "WETH\"}) { evil");
        let query = builder.build(&spec).unwrap();
        assert!(query.contains("where: {symbol: \"WETH  evil\"}"));
    }

    #[rstest]
    fn test_bool_and_list_filters(builder: QueryBuilder<FixedClock>) {
        let spec = QuerySpec::new("Pool", ["id"])
            .filter("feeTier_in", vec![FilterValue::from(500i64), FilterValue::from(3000i64)])
            .filter("token0", "0xaaa");
        let query = builder.build(&spec).unwrap();
        assert!(query.contains("where: {feeTier_in: [500, 3000], token0: \"0xaaa\"}"));
    }

    #[rstest]
    fn test_invalid_entity(builder: QueryBuilder<FixedClock>) {
        assert_eq!(
            builder.build(&QuerySpec::new("Vault", ["id"])).unwrap_err(),
            QueryBuilderError::InvalidEntity("Vault".to_string())
        );
    }

    #[rstest]
    fn test_invalid_field(builder: QueryBuilder<FixedClock>) {
        assert_eq!(
            builder
                .build(&QuerySpec::new("Pool", ["id", "owner"]))
                .unwrap_err(),
            QueryBuilderError::InvalidField {
                entity: "Pool".to_string(),
                field: "owner".to_string()
            }
        );
    }

    #[rstest]
    fn test_invalid_order_by(builder: QueryBuilder<FixedClock>) {
        let spec = QuerySpec::new("Pool", ["id"]).order_by("timestamp", OrderDirection::Asc);
        assert!(matches!(
            builder.build(&spec).unwrap_err(),
            QueryBuilderError::InvalidField { .. }
        ));
    }

    #[rstest]
    #[case::undeclared("owner")]
    #[case::undeclared_with_suffix("owner_gt")]
    #[case::unknown_suffix("feeTier_between")]
    fn test_invalid_filter_key(builder: QueryBuilder<FixedClock>, #[case] key: &str) {
        let spec = QuerySpec::new("Pool", ["id"]).filter(key, 1i64);
        assert_eq!(
            builder.build(&spec).unwrap_err(),
            QueryBuilderError::InvalidFilterKey {
                entity: "Pool".to_string(),
                key: key.to_string()
            }
        );
    }

    #[rstest]
    fn test_nested_filter_key_cannot_inject_collections(builder: QueryBuilder<FixedClock>) {
        let hostile = "id: \"x\"}) { id } tokens(first: 1000) { name } q: factories(where: {id";
        let nested = BTreeMap::from([(hostile.to_string(), FilterValue::from("y"))]);
        let spec = QuerySpec::new("Pool", ["id"]).filter("token0_", FilterValue::Map(nested));

        assert_eq!(
            builder.build(&spec).unwrap_err(),
            QueryBuilderError::InvalidFilterKey {
                entity: "Pool".to_string(),
                key: format!("token0_.{}", hostile)
            }
        );
    }

    #[rstest]
    fn test_nested_key_inside_list_is_checked(builder: QueryBuilder<FixedClock>) {
        let nested = BTreeMap::from([("a b".to_string(), FilterValue::from(1i64))]);
        let spec = QuerySpec::new("Pool", ["id"])
            .filter("token0_in", vec![FilterValue::Map(nested)]);

        assert!(matches!(
            builder.build(&spec).unwrap_err(),
            QueryBuilderError::InvalidFilterKey { ref key, .. } if key == "token0_in.a b"
        ));
    }

    #[rstest]
    fn test_identifier_nested_keys_are_rendered(builder: QueryBuilder<FixedClock>) {
        let nested = BTreeMap::from([
            ("symbol".to_string(), FilterValue::from("WETH")),
            ("decimals_gte".to_string(), FilterValue::from(6i64)),
        ]);
        let spec = QuerySpec::new("Pool", ["id"]).filter("token0_", FilterValue::Map(nested));

        let query = builder.build(&spec).unwrap();
        assert!(query.contains("where: {token0_: {decimals_gte: 6, symbol: \"WETH\"}}"));
    }

    #[rstest]
    fn test_no_fields(builder: QueryBuilder<FixedClock>) {
        let spec = QuerySpec::new("Pool", Vec::<String>::new());
        assert_eq!(
            builder.build(&spec).unwrap_err(),
            QueryBuilderError::NoFields("Pool".to_string())
        );
    }

    #[rstest]
    fn test_unique_traders_query(builder: QueryBuilder<FixedClock>) {
        let query = builder.build_unique_traders_query(POOL, 180, 30).unwrap();
        let start = NOW - 180 * 86_400;
        assert_eq!(
            query,
            format!(
                "query {{\n  swaps(first: 1000, where: {{pool: \"{}\", timestamp_gte: {}, timestamp_lte: {}}}, orderBy: timestamp, orderDirection: asc) {{\n    origin\n    timestamp\n  }}\n}}",
                POOL, start, NOW
            )
        );
    }

    #[rstest]
    #[case::zero_window(0, 30)]
    #[case::zero_bucket(180, 0)]
    fn test_unique_traders_rejects_empty_window(
        builder: QueryBuilder<FixedClock>,
        #[case] window_days: u32,
        #[case] bucket_days: u32,
    ) {
        assert_eq!(
            builder
                .build_unique_traders_query(POOL, window_days, bucket_days)
                .unwrap_err(),
            QueryBuilderError::InvalidWindow {
                window_days,
                bucket_days
            }
        );
    }

    #[rstest]
    fn test_wallet_overview_query(builder: QueryBuilder<FixedClock>) {
        let query = builder.build_wallet_overview_query(POOL, 50).unwrap();
        assert!(query.starts_with("query {\n  swaps(first: 50, where: {origin: "));
        assert!(query.contains(&format!("  positions(first: 50, where: {{owner: \"{}\"}})", POOL)));
        assert!(query.contains("    collectedFeesToken1\n"));
        assert_eq!(query.matches("query {").count(), 1);
    }

    #[rstest]
    #[case::valid("0x1f98431c8ad98523631ae4a59f267346ea31f984", true)]
    #[case::upper_hex("0x1F98431C8AD98523631AE4A59F267346EA31F984", true)]
    #[case::short("0x1f98", false)]
    #[case::no_prefix("1f98431c8ad98523631ae4a59f267346ea31f98411", false)]
    #[case::non_hex("0xzz98431c8ad98523631ae4a59f267346ea31f984", false)]
    fn test_validate_address(#[case] address: &str, #[case] valid: bool) {
        assert_eq!(validate_address(address).is_ok(), valid);
    }
}
