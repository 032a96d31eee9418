use api_client::model::{ListQuery, SortOrder};
use std::fmt;

// Query-string parameters in their original order. Parameters this crate
// does not know about are carried along untouched.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QueryParams(Vec<(String, String)>);

impl QueryParams {
    pub fn parse(location: &str) -> Self {
        let location = location.strip_prefix('?').unwrap_or(location);
        Self(
            form_urlencoded::parse(location.as_bytes())
                .into_owned()
                .collect(),
        )
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        let Self(params) = self;
        params
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.as_str())
    }

    pub fn set(&mut self, key: &str, value: &str) {
        let Self(params) = self;
        if let Some(index) = params.iter().position(|(name, _)| name == key) {
            params[index].1 = value.to_owned();
            let mut position = 0;
            params.retain(|(name, _)| {
                position += 1;
                position - 1 <= index || name != key
            });
        } else {
            params.push((key.to_owned(), value.to_owned()));
        }
    }

    pub fn remove(&mut self, key: &str) {
        let Self(params) = self;
        params.retain(|(name, _)| name != key);
    }

    pub fn apply(&mut self, key: &str, value: Option<&str>) {
        match value {
            Some(value) if !value.is_empty() => self.set(key, value),
            _ => self.remove(key),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for QueryParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self(params) = self;
        let encoded = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(params)
            .finish();
        f.write_str(&encoded)
    }
}

// `page`, `limit`, `orderBy` and `order` are always written so that
// returning to a location restores it exactly; `search` only when present.
pub fn encode(query: &ListQuery) -> String {
    let mut params = QueryParams::default();
    for (key, value) in query.request_params() {
        params.set(key, &value);
    }
    params.to_string()
}

pub fn decode(location: &str) -> ListQuery {
    let params = QueryParams::parse(location);
    let positive = |key| {
        params
            .get(key)
            .and_then(|value| value.trim().parse::<i64>().ok())
            .filter(|n| *n > 0)
            .and_then(|n| u32::try_from(n).ok())
    };

    ListQuery {
        page: positive("page").unwrap_or(ListQuery::DEFAULT_PAGE),
        limit: positive("limit").unwrap_or(ListQuery::DEFAULT_LIMIT),
        search: params
            .get("search")
            .map(str::trim)
            .filter(|search| !search.is_empty())
            .map(str::to_owned),
        order_by: params
            .get("orderBy")
            .filter(|order_by| !order_by.is_empty())
            .unwrap_or(ListQuery::DEFAULT_ORDER_BY)
            .to_owned(),
        order: params
            .get("order")
            .map(SortOrder::parse_lenient)
            .unwrap_or_default(),
    }
}
