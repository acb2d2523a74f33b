use super::types::{FilterValue, OrderDirection};
use std::collections::BTreeMap;

const IRREGULAR_PLURALS: &[(&str, &str)] = &[("factory", "factories")];

/// Strips every character outside alphanumerics, whitespace and `-`.
///
/// Query text is sent unparameterized, so this is the only thing standing
/// between a filter value and the surrounding GraphQL.
pub fn sanitize(value: &str) -> String {
    value
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace() || *c == '-')
        .collect()
}

pub fn sanitize_value(value: FilterValue) -> FilterValue {
    match value {
        FilterValue::String(s) => FilterValue::String(sanitize(&s)),
        FilterValue::List(items) => {
            FilterValue::List(items.into_iter().map(sanitize_value).collect())
        }
        FilterValue::Map(map) => FilterValue::Map(
            map.into_iter()
                .map(|(key, value)| (key, sanitize_value(value)))
                .collect(),
        ),
        other => other,
    }
}

/// Collection field name for an entity, e.g. `Pool` -> `pools`.
pub fn collection_name(entity: &str) -> String {
    let lower = entity.to_lowercase();
    if let Some((_, plural)) = IRREGULAR_PLURALS.iter().find(|(s, _)| *s == lower) {
        return plural.to_string();
    }
    match lower.strip_suffix('y') {
        Some(stem) => format!("{}ies", stem),
        None => format!("{}s", lower),
    }
}

pub fn render_value(value: &FilterValue) -> String {
    match value {
        FilterValue::String(s) => format!("\"{}\"", s),
        FilterValue::Number(n) => n.to_string(),
        FilterValue::Bool(b) => b.to_string(),
        FilterValue::List(items) => {
            let items: Vec<String> = items.iter().map(render_value).collect();
            format!("[{}]", items.join(", "))
        }
        FilterValue::Map(map) => format!("{{{}}}", render_filters(map)),
    }
}

pub fn render_filters(filters: &BTreeMap<String, FilterValue>) -> String {
    filters
        .iter()
        .map(|(key, value)| format!("{}: {}", key, render_value(value)))
        .collect::<Vec<_>>()
        .join(", ")
}

/// One collection call inside a query block, already validated.
#[derive(Debug, Clone)]
pub struct Collection {
    pub name: String,
    pub first: u32,
    pub filters: BTreeMap<String, FilterValue>,
    pub order: Option<(String, OrderDirection)>,
    pub fields: Vec<String>,
}

impl Collection {
    fn render_into(&self, out: &mut String) {
        let mut args = vec![format!("first: {}", self.first)];
        if !self.filters.is_empty() {
            args.push(format!("where: {{{}}}", render_filters(&self.filters)));
        }
        if let Some((field, direction)) = &self.order {
            args.push(format!("orderBy: {}", field));
            args.push(format!("orderDirection: {}", direction));
        }

        out.push_str(&format!("  {}({}) {{\n", self.name, args.join(", ")));
        for field in &self.fields {
            out.push_str(&format!("    {}\n", field));
        }
        out.push_str("  }\n");
    }
}

pub fn render_query(collections: &[Collection]) -> String {
    let mut query = String::from("query {\n");
    for collection in collections {
        collection.render_into(&mut query);
    }
    query.push('}');
    query
}
