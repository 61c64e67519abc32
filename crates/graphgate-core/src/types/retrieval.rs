//! Types shared between retrievers and the pipelines that consume them.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::traits::GraphStore;

/// A retrieved text node with an optional relevance score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeWithScore {
    /// Node text.
    pub text: String,
    /// Relevance score, if the retriever produces one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
    /// Retriever-specific metadata.
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl NodeWithScore {
    /// Create a node with no score and no metadata.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            score: None,
            metadata: HashMap::new(),
        }
    }

    /// Set the score.
    pub fn with_score(mut self, score: f32) -> Self {
        self.score = Some(score);
        self
    }

    /// Add a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

/// Caller-owned description of where indexed data lives.
#[derive(Clone, Default)]
pub struct StorageContext {
    /// Directory index data is persisted to.
    pub persist_dir: Option<PathBuf>,
    /// Namespace separating indexes that share storage.
    pub namespace: Option<String>,
    /// Graph store attached to this context.
    pub graph_store: Option<Arc<dyn GraphStore>>,
}

impl StorageContext {
    /// Create an empty storage context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the persist directory.
    pub fn with_persist_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.persist_dir = Some(dir.into());
        self
    }

    /// Set the namespace.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Attach a graph store.
    pub fn with_graph_store(mut self, store: Arc<dyn GraphStore>) -> Self {
        self.graph_store = Some(store);
        self
    }
}

impl fmt::Debug for StorageContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageContext")
            .field("persist_dir", &self.persist_dir)
            .field("namespace", &self.namespace)
            .field(
                "graph_store",
                &self.graph_store.as_ref().map(|store| store.backend()),
            )
            .finish()
    }
}
