//! Neo4j graph store implementation.

use std::collections::HashMap;

use async_trait::async_trait;
use neo4rs::{query, BoltList, BoltMap, BoltNull, BoltString, BoltType, ConfigBuilder, Graph};
use secrecy::ExposeSecret;
use serde_json::Value as JsonValue;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use graphgate_core::config::Neo4jSettings;
use graphgate_core::error::{GraphGateError, GraphResult};
use graphgate_core::traits::{
    quote_identifier, GraphStore, GraphStoreDatabase, RelMap, Triplet, DEFAULT_NODE_LABEL,
};
use graphgate_core::types::{Params, Row};

use crate::cypher;

const DEFAULT_USERNAME: &str = "neo4j";
const DEFAULT_DATABASE: &str = "neo4j";

/// Neo4j graph store backed by a `neo4rs` connection pool.
pub struct Neo4jGraphStore {
    graph: RwLock<Option<Graph>>,
    database: String,
    node_label: String,
    schema: RwLock<Option<String>>,
}

impl Neo4jGraphStore {
    /// Connect to Neo4j using the given settings.
    ///
    /// Unset optional fields fall back to the `neo4j` user, the `neo4j`
    /// database, and the `Entity` node label.
    pub async fn new(settings: &Neo4jSettings) -> GraphResult<Self> {
        let username = settings
            .username
            .clone()
            .unwrap_or_else(|| DEFAULT_USERNAME.to_string());
        let password = settings
            .password
            .as_ref()
            .map(|p| p.expose_secret().clone())
            .unwrap_or_default();
        let database = settings
            .database
            .clone()
            .unwrap_or_else(|| DEFAULT_DATABASE.to_string());
        let node_label = settings
            .node_label
            .clone()
            .unwrap_or_else(|| DEFAULT_NODE_LABEL.to_string());

        let config = ConfigBuilder::default()
            .uri(settings.url.as_str())
            .user(username.as_str())
            .password(password.as_str())
            .db(database.as_str())
            .build()
            .map_err(|e| GraphGateError::graph_connection("Invalid Neo4j configuration", e))?;

        let graph = Graph::connect(config)
            .await
            .map_err(|e| GraphGateError::graph_connection("Failed to connect to Neo4j", e))?;

        info!(url = %settings.url, database = %database, "Connected to Neo4j");

        let store = Self {
            graph: RwLock::new(Some(graph)),
            database,
            node_label,
            schema: RwLock::new(None),
        };
        store.create_constraint().await;
        Ok(store)
    }

    /// Database this store queries.
    pub fn database(&self) -> &str {
        &self.database
    }

    /// Label used for entity nodes.
    pub fn node_label(&self) -> &str {
        &self.node_label
    }

    async fn graph(&self) -> GraphResult<Graph> {
        self.graph
            .read()
            .await
            .clone()
            .ok_or_else(|| GraphGateError::graph_closed(GraphStoreDatabase::Neo4j))
    }

    /// Older servers reject the syntax; ids stay usable without the constraint.
    async fn create_constraint(&self) {
        let text = format!(
            "CREATE CONSTRAINT IF NOT EXISTS FOR (n:{}) REQUIRE n.id IS UNIQUE",
            quote_identifier(&self.node_label)
        );
        if let Err(e) = self.query(&text, &Params::new()).await {
            warn!("Failed to create Neo4j id constraint: {}", e);
        }
    }
}

#[async_trait]
impl GraphStore for Neo4jGraphStore {
    fn backend(&self) -> GraphStoreDatabase {
        GraphStoreDatabase::Neo4j
    }

    async fn query(&self, text: &str, params: &Params) -> GraphResult<Vec<Row>> {
        let graph = self.graph().await?;

        let mut q = query(text);
        for (key, value) in params {
            q = q.param(key.as_str(), json_to_bolt(value));
        }
        debug!(query = text, "Running Neo4j query");

        let mut result = graph
            .execute(q)
            .await
            .map_err(|e| GraphGateError::graph_store(format!("Failed to run query: {}", e)))?;

        let mut rows = Vec::new();
        while let Some(row) = result
            .next()
            .await
            .map_err(|e| GraphGateError::graph_store(format!("Failed to fetch row: {}", e)))?
        {
            let columns: HashMap<String, JsonValue> = row.to().map_err(|e| {
                GraphGateError::graph_store(format!("Failed to decode row: {}", e))
            })?;
            rows.push(Row::new(columns));
        }

        Ok(rows)
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
        // Dropping the last handle shuts the pool down.
        if self.graph.write().await.take().is_some() {
            info!(database = %self.database, "Closed Neo4j connection");
        }
        Ok(())
    }
}

/// Convert a JSON parameter into a Bolt value.
///
/// Integers that fit `i64` stay integers; every other number becomes a float.
pub(crate) fn json_to_bolt(value: &JsonValue) -> BoltType {
    match value {
        JsonValue::Null => BoltType::Null(BoltNull),
        JsonValue::Bool(b) => BoltType::from(*b),
        JsonValue::Number(n) => match n.as_i64() {
            Some(i) => BoltType::from(i),
            None => BoltType::from(n.as_f64().unwrap_or_default()),
        },
        JsonValue::String(s) => BoltType::from(s.as_str()),
        JsonValue::Array(items) => {
            BoltType::List(BoltList::from(items.iter().map(json_to_bolt).collect::<Vec<_>>()))
        }
        JsonValue::Object(map) => {
            let mut bolt = BoltMap::new();
            for (key, value) in map {
                bolt.put(BoltString::from(key.as_str()), json_to_bolt(value));
            }
            BoltType::Map(bolt)
        }
    }
}
