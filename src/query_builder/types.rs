use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub const DEFAULT_QUERY_LIMIT: u32 = 100;

/// A literal in a `where` clause.
///
/// Deserializes from plain JSON, so `{"feeTier": 500, "token0_in": ["a", "b"]}`
/// maps directly onto filter values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    Bool(bool),
    Number(serde_json::Number),
    String(String),
    List(Vec<FilterValue>),
    Map(BTreeMap<String, FilterValue>),
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        FilterValue::String(value.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        FilterValue::String(value)
    }
}

impl From<bool> for FilterValue {
    fn from(value: bool) -> Self {
        FilterValue::Bool(value)
    }
}

impl From<i64> for FilterValue {
    fn from(value: i64) -> Self {
        FilterValue::Number(value.into())
    }
}

impl From<u64> for FilterValue {
    fn from(value: u64) -> Self {
        FilterValue::Number(value.into())
    }
}

impl From<Vec<FilterValue>> for FilterValue {
    fn from(value: Vec<FilterValue>) -> Self {
        FilterValue::List(value)
    }
}

impl From<BTreeMap<String, FilterValue>> for FilterValue {
    fn from(value: BTreeMap<String, FilterValue>) -> Self {
        FilterValue::Map(value)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderDirection {
    #[default]
    Asc,
    Desc,
}

impl fmt::Display for OrderDirection {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            OrderDirection::Asc => write!(f, "asc"),
            OrderDirection::Desc => write!(f, "desc"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeWindow {
    #[default]
    #[serde(rename = "none", alias = "All time")]
    None,
    #[serde(rename = "24h", alias = "Last 24 hours")]
    Last24Hours,
    #[serde(rename = "7d", alias = "Last 7 days")]
    Last7Days,
    #[serde(rename = "30d", alias = "Last 30 days")]
    Last30Days,
}

impl TimeWindow {
    /// Length of the window, or `None` for an unbounded query.
    pub fn seconds(&self) -> Option<i64> {
        match self {
            TimeWindow::None => None,
            TimeWindow::Last24Hours => Some(86_400),
            TimeWindow::Last7Days => Some(604_800),
            TimeWindow::Last30Days => Some(2_592_000),
        }
    }
}

fn default_limit() -> u32 {
    DEFAULT_QUERY_LIMIT
}

/// Everything needed to build one collection query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuerySpec {
    pub entity: String,
    pub fields: Vec<String>,
    #[serde(default)]
    pub filters: BTreeMap<String, FilterValue>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default)]
    pub order_by: Option<String>,
    #[serde(default)]
    pub order_direction: OrderDirection,
    #[serde(default)]
    pub time_window: TimeWindow,
}

impl QuerySpec {
    pub fn new<I, F>(entity: &str, fields: I) -> Self
    where
        I: IntoIterator<Item = F>,
        F: Into<String>,
    {
        Self {
            entity: entity.to_string(),
            fields: fields.into_iter().map(Into::into).collect(),
            filters: BTreeMap::new(),
            address: None,
            limit: DEFAULT_QUERY_LIMIT,
            order_by: None,
            order_direction: OrderDirection::Asc,
            time_window: TimeWindow::None,
        }
    }

    pub fn filter(mut self, key: &str, value: impl Into<FilterValue>) -> Self {
        self.filters.insert(key.to_string(), value.into());
        self
    }

    pub fn address(mut self, address: &str) -> Self {
        self.address = Some(address.to_string());
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    pub fn order_by(mut self, field: &str, direction: OrderDirection) -> Self {
        self.order_by = Some(field.to_string());
        self.order_direction = direction;
        self
    }

    pub fn time_window(mut self, window: TimeWindow) -> Self {
        self.time_window = window;
        self
    }
}
