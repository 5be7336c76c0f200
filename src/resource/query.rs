//! Query parameter name mapping

use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Client-side query names and the server-side names they are sent as
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryParameters {
    mapping: BTreeMap<String, String>,
}

impl Default for QueryParameters {
    fn default() -> Self {
        Self::new("limit", "marker")
    }
}

impl QueryParameters {
    /// Pagination aliases are always present: `limit` and `marker` map to the
    /// resource's limit and marker keys.
    pub fn new(limit_key: &str, marker_key: &str) -> Self {
        let mut mapping = BTreeMap::new();
        mapping.insert("limit".to_string(), limit_key.to_string());
        mapping.insert("marker".to_string(), marker_key.to_string());
        Self { mapping }
    }

    /// Accept `name` and send it unchanged
    pub fn with(mut self, name: &str) -> Self {
        self.insert(name, name);
        self
    }

    /// Accept `client` and send it as `wire`
    pub fn map(mut self, client: &str, wire: &str) -> Self {
        self.insert(client, wire);
        self
    }

    pub fn insert(&mut self, client: &str, wire: &str) {
        self.mapping.insert(client.to_string(), wire.to_string());
    }

    /// Point the pagination aliases at other server names
    pub fn set_pagination_keys(&mut self, limit_key: &str, marker_key: &str) {
        self.insert("limit", limit_key);
        self.insert("marker", marker_key);
    }

    pub fn wire_name(&self, client: &str) -> Option<&str> {
        self.mapping.get(client).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.mapping.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Rename the known keys of `query` to their server names.
    ///
    /// Keys the mapping does not know are dropped. When a query carries both
    /// the client and the server spelling, the server spelling wins.
    pub fn transpose(&self, query: &Map<String, Value>) -> Map<String, Value> {
        let mut result = Map::new();
        for (client, wire) in &self.mapping {
            if let Some(value) = query.get(client) {
                result.insert(wire.clone(), value.clone());
            }
            if let Some(value) = query.get(wire) {
                result.insert(wire.clone(), value.clone());
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_mapping() {
        let query = QueryParameters::default();
        assert_eq!(query.wire_name("limit"), Some("limit"));
        assert_eq!(query.wire_name("marker"), Some("marker"));
    }

    #[test]
    fn test_transpose_renames_and_drops_unknown() {
        let query = QueryParameters::default()
            .with("name")
            .map("changes_since", "changes-since");
        let input = json!({"name": "web", "changes_since": "2017", "bogus": 1});
        let out = query.transpose(input.as_object().unwrap());
        assert_eq!(
            Value::Object(out),
            json!({"name": "web", "changes-since": "2017"})
        );
    }

    #[test]
    fn test_transpose_server_spelling_wins() {
        let query = QueryParameters::default().map("changes_since", "changes-since");
        let input = json!({"changes_since": "a", "changes-since": "b"});
        let out = query.transpose(input.as_object().unwrap());
        assert_eq!(out.get("changes-since"), Some(&json!("b")));
    }

    #[test]
    fn test_custom_marker_key() {
        let query = QueryParameters::new("limit", "start_number");
        let input = json!({"marker": 20, "limit": 10});
        let out = query.transpose(input.as_object().unwrap());
        assert_eq!(Value::Object(out), json!({"start_number": 20, "limit": 10}));
    }
}
