//! Query result rows and parameters.

use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;

use crate::error::{GraphGateError, GraphResult};

/// Parameters for Cypher queries.
pub type Params = HashMap<String, JsonValue>;

/// A single row from a query result.
///
/// Columns hold JSON values regardless of which backend produced them, with
/// typed extraction via [`Row::get`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    data: HashMap<String, JsonValue>,
}

impl Row {
    /// Creates a new row from a map of column names to values.
    pub fn new(data: HashMap<String, JsonValue>) -> Self {
        Self { data }
    }

    /// Gets a value by column name, deserializing to the requested type.
    ///
    /// # Errors
    ///
    /// Returns an error if the column is missing or deserialization fails.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> GraphResult<T> {
        let value = self
            .data
            .get(key)
            .ok_or_else(|| GraphGateError::graph_store(format!("column not found: {}", key)))?;
        serde_json::from_value(value.clone()).map_err(|e| {
            GraphGateError::graph_store(format!("failed to deserialize '{}': {}", key, e))
        })
    }

    /// Gets a value, returning `None` if the column is missing or null.
    pub fn get_opt<T: DeserializeOwned>(&self, key: &str) -> GraphResult<Option<T>> {
        match self.data.get(key) {
            Some(v) if v.is_null() => Ok(None),
            Some(_) => self.get(key).map(Some),
            None => Ok(None),
        }
    }

    /// Returns the raw JSON value for a column, if it exists.
    pub fn get_raw(&self, key: &str) -> Option<&JsonValue> {
        self.data.get(key)
    }

    /// Returns all column names in this row.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.data.keys().map(|s| s.as_str())
    }

    /// Returns the number of columns in this row.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the row has no columns.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Consumes the row and returns the underlying data map.
    pub fn into_inner(self) -> HashMap<String, JsonValue> {
        self.data
    }
}

impl From<HashMap<String, JsonValue>> for Row {
    fn from(data: HashMap<String, JsonValue>) -> Self {
        Self::new(data)
    }
}

impl FromIterator<(String, JsonValue)> for Row {
    fn from_iter<I: IntoIterator<Item = (String, JsonValue)>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row() -> Row {
        [
            ("name".to_string(), json!("Alice")),
            ("count".to_string(), json!(3)),
            ("path".to_string(), json!(["KNOWS", "Bob"])),
            ("missing_value".to_string(), JsonValue::Null),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_get_typed() {
        let row = row();
        let name: String = row.get("name").unwrap();
        let count: i64 = row.get("count").unwrap();
        let path: Vec<String> = row.get("path").unwrap();
        assert_eq!(name, "Alice");
        assert_eq!(count, 3);
        assert_eq!(path, vec!["KNOWS", "Bob"]);
    }

    #[test]
    fn test_get_missing_column() {
        let result: GraphResult<String> = row().get("nope");
        assert!(result.unwrap_err().to_string().contains("column not found"));
    }

    #[test]
    fn test_get_opt_null_and_missing() {
        let row = row();
        let null: Option<String> = row.get_opt("missing_value").unwrap();
        let absent: Option<String> = row.get_opt("nope").unwrap();
        assert!(null.is_none());
        assert!(absent.is_none());
    }

    #[test]
    fn test_get_wrong_type() {
        let result: GraphResult<i64> = row().get("name");
        assert!(result.is_err());
    }
}
