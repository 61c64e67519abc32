//! FalkorDB graph store implementation.
//!
//! FalkorDB speaks the Redis protocol; Cypher is sent through
//! `GRAPH.QUERY <graph> <query>` and answered as `[header, rows, stats]`.
//! Parameters travel inline as a `CYPHER name=value ...` prefix.

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{Client, IntoConnectionInfo, Value};
use secrecy::ExposeSecret;
use serde_json::Value as JsonValue;
use tokio::sync::RwLock;
use tracing::{debug, info};

use graphgate_core::config::FalkorDbSettings;
use graphgate_core::error::{GraphGateError, GraphResult};
use graphgate_core::traits::{
    quote_identifier, GraphStore, GraphStoreDatabase, RelMap, Triplet, DEFAULT_NODE_LABEL,
};
use graphgate_core::types::{Params, Row};

use crate::cypher;

const DEFAULT_GRAPH: &str = "falkor";

/// FalkorDB graph store backed by a multiplexed Redis connection.
pub struct FalkorDbGraphStore {
    connection: RwLock<Option<MultiplexedConnection>>,
    graph_name: String,
    node_label: String,
    decode_responses: bool,
    schema: RwLock<Option<String>>,
}

impl FalkorDbGraphStore {
    /// Connect to FalkorDB using the given settings.
    pub async fn new(settings: &FalkorDbSettings) -> GraphResult<Self> {
        let mut info = settings
            .url
            .as_str()
            .into_connection_info()
            .map_err(|e| GraphGateError::graph_connection("Invalid FalkorDB URL", e))?;
        if let Some(username) = &settings.username {
            info.redis.username = Some(username.clone());
        }
        if let Some(password) = &settings.password {
            info.redis.password = Some(password.expose_secret().clone());
        }

        let client = Client::open(info)
            .map_err(|e| GraphGateError::graph_connection("Failed to create FalkorDB client", e))?;
        let connection = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| GraphGateError::graph_connection("Failed to connect to FalkorDB", e))?;

        let graph_name = settings
            .database
            .clone()
            .unwrap_or_else(|| DEFAULT_GRAPH.to_string());
        info!(url = %settings.url, graph = %graph_name, "Connected to FalkorDB");

        let store = Self {
            connection: RwLock::new(Some(connection)),
            graph_name,
            node_label: settings
                .node_label
                .clone()
                .unwrap_or_else(|| DEFAULT_NODE_LABEL.to_string()),
            decode_responses: settings.decode_responses,
            schema: RwLock::new(None),
        };
        store.create_index().await;
        Ok(store)
    }

    /// Graph key queries run against.
    pub fn graph_name(&self) -> &str {
        &self.graph_name
    }

    /// Label used for entity nodes.
    pub fn node_label(&self) -> &str {
        &self.node_label
    }

    /// Whether bulk string replies are decoded as UTF-8 text.
    pub fn decode_responses(&self) -> bool {
        self.decode_responses
    }

    async fn connection(&self) -> GraphResult<MultiplexedConnection> {
        self.connection
            .read()
            .await
            .clone()
            .ok_or_else(|| GraphGateError::graph_closed(GraphStoreDatabase::FalkorDb))
    }

    /// Fails harmlessly when the index already exists.
    async fn create_index(&self) {
        let text = format!(
            "CREATE INDEX FOR (n:{}) ON (n.id)",
            quote_identifier(&self.node_label)
        );
        if let Err(e) = self.query(&text, &Params::new()).await {
            debug!("FalkorDB id index not created: {}", e);
        }
    }
}

#[async_trait]
impl GraphStore for FalkorDbGraphStore {
    fn backend(&self) -> GraphStoreDatabase {
        GraphStoreDatabase::FalkorDb
    }

    /// Run `text` through `GRAPH.QUERY`.
    ///
    /// Replies use the verbose (non-compact) format, where only integers and
    /// nulls are typed. Floats, booleans and strings all come back as text, so
    /// `0.5` reads as `"0.5"`. Cast in Cypher (`toString`, `toInteger`) when
    /// the type matters.
    async fn query(&self, text: &str, params: &Params) -> GraphResult<Vec<Row>> {
        let mut connection = self.connection().await?;
        let text = with_params(text, params);
        debug!(graph = %self.graph_name, query = %text, "Running FalkorDB query");

        let reply: Value = redis::cmd("GRAPH.QUERY")
            .arg(&self.graph_name)
            .arg(&text)
            .query_async(&mut connection)
            .await
            .map_err(|e| GraphGateError::graph_store(format!("Failed to run query: {}", e)))?;

        parse_reply(&reply, self.decode_responses)
    }

    async fn get(&self, subject: &str) -> GraphResult<Vec<Vec<String>>> {
        cypher::get(self, &self.node_label, subject).await
    }

    async fn get_rel_map(
        &self,
        subjects: &[String],
        depth: usize,
        limit: usize,
    ) -> GraphResult<RelMap> {
        cypher::get_rel_map(self, &self.node_label, subjects, depth, limit).await
    }

    async fn upsert_triplet(&self, triplet: &Triplet) -> GraphResult<()> {
        cypher::upsert_triplet(self, &self.node_label, triplet).await
    }

    async fn delete(&self, triplet: &Triplet) -> GraphResult<()> {
        cypher::delete(self, &self.node_label, triplet).await
    }

    async fn get_schema(&self, refresh: bool) -> GraphResult<String> {
        if !refresh {
            if let Some(schema) = self.schema.read().await.clone() {
                return Ok(schema);
            }
        }
        let schema = cypher::schema(self).await?;
        *self.schema.write().await = Some(schema.clone());
        Ok(schema)
    }

    async fn close(&self) -> GraphResult<()> {
        if self.connection.write().await.take().is_some() {
            info!(graph = %self.graph_name, "Closed FalkorDB connection");
        }
        Ok(())
    }
}

/// Prefix `text` with a `CYPHER` parameter header, sorted by name.
pub(crate) fn with_params(text: &str, params: &Params) -> String {
    if params.is_empty() {
        return text.to_string();
    }
    let mut names: Vec<&String> = params.keys().collect();
    names.sort();

    let header: Vec<String> = names
        .into_iter()
        .map(|name| format!("{}={}", name, cypher_literal(&params[name])))
        .collect();
    format!("CYPHER {} {}", header.join(" "), text)
}

/// Render a JSON value as a Cypher literal.
pub(crate) fn cypher_literal(value: &JsonValue) -> String {
    match value {
        JsonValue::Null => "null".to_string(),
        JsonValue::Bool(b) => b.to_string(),
        JsonValue::Number(n) => n.to_string(),
        // JSON string escaping is valid Cypher string escaping.
        JsonValue::String(_) => value.to_string(),
        JsonValue::Array(items) => format!(
            "[{}]",
            items.iter().map(cypher_literal).collect::<Vec<_>>().join(", ")
        ),
        JsonValue::Object(map) => format!(
            "{{{}}}",
            map.iter()
                .map(|(k, v)| format!("{}: {}", quote_identifier(k), cypher_literal(v)))
                .collect::<Vec<_>>()
                .join(", ")
        ),
    }
}

/// Turn a `GRAPH.QUERY` reply into rows.
///
/// Write-only queries answer with just the statistics block and yield no rows.
pub(crate) fn parse_reply(reply: &Value, decode_responses: bool) -> GraphResult<Vec<Row>> {
    let sections = match reply {
        Value::Bulk(sections) => sections,
        other => {
            return Err(GraphGateError::graph_store(format!(
                "Unexpected FalkorDB reply: {:?}",
                other
            )))
        }
    };

    let (header, rows) = match sections.as_slice() {
        [_stats] => return Ok(Vec::new()),
        [Value::Bulk(header), Value::Bulk(rows), ..] => (header, rows),
        _ => {
            return Err(GraphGateError::graph_store(
                "Malformed FalkorDB reply: expected header, rows and statistics",
            ))
        }
    };

    let columns = header
        .iter()
        .map(column_name)
        .collect::<GraphResult<Vec<_>>>()?;

    rows.iter()
        .map(|row| match row {
            Value::Bulk(values) => Ok(columns
                .iter()
                .cloned()
                .zip(values.iter().map(|v| value_to_json(v, decode_responses)))
                .collect()),
            other => Err(GraphGateError::graph_store(format!(
                "Malformed FalkorDB row: {:?}",
                other
            ))),
        })
        .collect()
}

/// Header entries are plain names, or `[type, name]` pairs in compact mode.
fn column_name(entry: &Value) -> GraphResult<String> {
    match entry {
        Value::Data(bytes) => Ok(String::from_utf8_lossy(bytes).into_owned()),
        Value::Status(name) => Ok(name.clone()),
        Value::Bulk(pair) => match pair.as_slice() {
            [_, name] => column_name(name),
            _ => Err(GraphGateError::graph_store("Malformed FalkorDB header")),
        },
        other => Err(GraphGateError::graph_store(format!(
            "Malformed FalkorDB header entry: {:?}",
            other
        ))),
    }
}

/// Convert a Redis value to JSON; undecoded bulk strings become byte arrays.
///
/// Bulk strings are never reinterpreted as numbers or booleans.
pub(crate) fn value_to_json(value: &Value, decode_responses: bool) -> JsonValue {
    match value {
        Value::Nil => JsonValue::Null,
        Value::Int(i) => JsonValue::from(*i),
        Value::Data(bytes) if decode_responses => {
            JsonValue::String(String::from_utf8_lossy(bytes).into_owned())
        }
        Value::Data(bytes) => JsonValue::Array(bytes.iter().map(|b| JsonValue::from(*b)).collect()),
        Value::Bulk(items) => JsonValue::Array(
            items
                .iter()
                .map(|v| value_to_json(v, decode_responses))
                .collect(),
        ),
        Value::Status(status) => JsonValue::String(status.clone()),
        Value::Okay => JsonValue::String("OK".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn data(s: &str) -> Value {
        Value::Data(s.as_bytes().to_vec())
    }

    fn reply(header: Vec<Value>, rows: Vec<Vec<Value>>) -> Value {
        Value::Bulk(vec![
            Value::Bulk(header),
            Value::Bulk(rows.into_iter().map(Value::Bulk).collect()),
            Value::Bulk(vec![data("Query internal execution time: 0.1 milliseconds")]),
        ])
    }

    fn closed_store() -> FalkorDbGraphStore {
        FalkorDbGraphStore {
            connection: RwLock::new(None),
            graph_name: DEFAULT_GRAPH.to_string(),
            node_label: DEFAULT_NODE_LABEL.to_string(),
            decode_responses: true,
            schema: RwLock::new(None),
        }
    }

    #[tokio::test]
    async fn test_operations_after_close_fail() {
        let store = closed_store();

        let err = store.query("RETURN 1", &Params::new()).await.unwrap_err();
        assert_eq!(err.code(), graphgate_core::error::ErrorCode::GrpClosed);

        let err = store.get_schema(true).await.unwrap_err();
        assert_eq!(err.code(), graphgate_core::error::ErrorCode::GrpClosed);

        assert!(store.close().await.is_ok());
    }

    #[test]
    fn test_with_params_sorted_header() {
        let params = Params::from([
            ("subj".to_string(), json!("Alice \"A\"")),
            ("limit".to_string(), json!(30)),
        ]);
        assert_eq!(
            with_params("MATCH (n) RETURN n", &params),
            r#"CYPHER limit=30 subj="Alice \"A\"" MATCH (n) RETURN n"#
        );
        assert_eq!(with_params("RETURN 1", &Params::new()), "RETURN 1");
    }

    #[test]
    fn test_cypher_literal_collections() {
        assert_eq!(cypher_literal(&json!(["a", 1, null])), r#"["a", 1, null]"#);
        assert_eq!(cypher_literal(&json!({"id": "x"})), r#"{`id`: "x"}"#);
        assert_eq!(cypher_literal(&json!(true)), "true");
    }

    #[test]
    fn test_parse_reply_decoded() {
        let reply = reply(
            vec![data("subj"), data("path")],
            vec![vec![
                data("Alice"),
                Value::Bulk(vec![Value::Bulk(vec![data("KNOWS"), data("Bob")])]),
            ]],
        );

        let rows = parse_reply(&reply, true).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get::<String>("subj").unwrap(), "Alice");
        assert_eq!(
            rows[0].get::<Vec<Vec<String>>>("path").unwrap(),
            vec![vec!["KNOWS".to_string(), "Bob".to_string()]]
        );
    }

    #[test]
    fn test_parse_reply_raw_bytes() {
        let reply = reply(vec![data("name")], vec![vec![data("Al")]]);
        let rows = parse_reply(&reply, false).unwrap();
        assert_eq!(rows[0].get_raw("name"), Some(&json!([65, 108])));
    }

    #[test]
    fn test_parse_reply_compact_header_and_ints() {
        let reply = reply(
            vec![Value::Bulk(vec![Value::Int(1), data("count")])],
            vec![vec![Value::Int(7)]],
        );
        let rows = parse_reply(&reply, true).unwrap();
        assert_eq!(rows[0].get::<i64>("count").unwrap(), 7);
    }

    #[test]
    fn test_parse_reply_scalars_stay_text() {
        let reply = reply(
            vec![data("weight"), data("active")],
            vec![vec![data("0.5"), data("true")]],
        );
        let rows = parse_reply(&reply, true).unwrap();
        assert_eq!(rows[0].get_raw("weight"), Some(&json!("0.5")));
        assert_eq!(rows[0].get_raw("active"), Some(&json!("true")));
    }

    #[test]
    fn test_parse_reply_statistics_only() {
        let reply = Value::Bulk(vec![Value::Bulk(vec![data("Nodes created: 2")])]);
        assert!(parse_reply(&reply, true).unwrap().is_empty());
    }

    #[test]
    fn test_parse_reply_rejects_scalars() {
        assert!(parse_reply(&Value::Okay, true).is_err());
    }
}
