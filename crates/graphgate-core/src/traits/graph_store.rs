//! Graph store trait and related types.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::GraphResult;
use crate::types::{Params, Row};

/// Relation paths keyed by subject.
///
/// Each path is flat: `[rel, obj, rel, obj, ...]` starting from the subject.
pub type RelMap = HashMap<String, Vec<Vec<String>>>;

/// Default label for entity nodes.
pub const DEFAULT_NODE_LABEL: &str = "Entity";

/// Subject, relation, object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Triplet {
    pub subject: String,
    pub relation: String,
    pub object: String,
}

impl Triplet {
    /// Create a new triplet.
    pub fn new(
        subject: impl Into<String>,
        relation: impl Into<String>,
        object: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            relation: relation.into(),
            object: object.into(),
        }
    }
}

/// Graph database product behind a store.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::VariantNames,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum GraphStoreDatabase {
    Neo4j,
    FalkorDb,
}

impl GraphStoreDatabase {
    /// Human-readable product name.
    pub fn product_name(&self) -> &'static str {
        match self {
            Self::Neo4j => "Neo4j",
            Self::FalkorDb => "FalkorDB",
        }
    }

    /// Cargo feature that compiles this backend in.
    pub fn feature(&self) -> &'static str {
        match self {
            Self::Neo4j => "neo4j",
            Self::FalkorDb => "falkordb",
        }
    }
}

/// Core GraphStore trait - all graph store backends implement this.
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Which backend this store talks to.
    fn backend(&self) -> GraphStoreDatabase;

    /// Run a Cypher query and collect its rows.
    async fn query(&self, query: &str, params: &Params) -> GraphResult<Vec<Row>>;

    /// Direct `[rel, obj]` pairs leaving `subject`.
    async fn get(&self, subject: &str) -> GraphResult<Vec<Vec<String>>>;

    /// Relation paths up to `depth` hops from each subject, at most `limit` in total.
    async fn get_rel_map(
        &self,
        subjects: &[String],
        depth: usize,
        limit: usize,
    ) -> GraphResult<RelMap>;

    /// Create both endpoints and the relation between them if missing.
    async fn upsert_triplet(&self, triplet: &Triplet) -> GraphResult<()>;

    /// Remove the relation, and either endpoint left without relations.
    async fn delete(&self, triplet: &Triplet) -> GraphResult<()>;

    /// Human-readable schema of the graph.
    async fn get_schema(&self, refresh: bool) -> GraphResult<String>;

    /// Release the underlying connection.
    async fn close(&self) -> GraphResult<()> {
        Ok(())
    }
}

/// Normalise a relation name into a Cypher relationship type.
pub fn relation_type(relation: &str) -> String {
    relation.trim().replace(' ', "_").to_uppercase()
}

/// Quote a label or relationship type for inclusion in Cypher text.
pub fn quote_identifier(identifier: &str) -> String {
    format!("`{}`", identifier.replace('`', "``"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_database_parsing() {
        assert_eq!(
            GraphStoreDatabase::from_str("neo4j").unwrap(),
            GraphStoreDatabase::Neo4j
        );
        assert_eq!(
            GraphStoreDatabase::from_str("falkordb").unwrap(),
            GraphStoreDatabase::FalkorDb
        );
        assert!(GraphStoreDatabase::from_str("FalkorDB").is_err());
        assert!(GraphStoreDatabase::from_str("memgraph").is_err());
        assert_eq!(GraphStoreDatabase::FalkorDb.to_string(), "falkordb");
    }

    #[test]
    fn test_relation_type() {
        assert_eq!(relation_type("works at"), "WORKS_AT");
        assert_eq!(relation_type(" founded "), "FOUNDED");
    }

    #[test]
    fn test_quote_identifier() {
        assert_eq!(quote_identifier("Entity"), "`Entity`");
        assert_eq!(quote_identifier("we`ird"), "`we``ird`");
    }
}
