//! Process-wide graph store component.
//!
//! Built once at startup from [`Settings`]: it either holds no graph store
//! (none selected) or exactly one client built from the selected backend's
//! settings block. The selection never changes afterwards.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{info, warn};

use graphgate_core::config::{GraphBackend, Settings};
use graphgate_core::error::{GraphGateError, GraphResult};
use graphgate_core::traits::{GraphStore, GraphStoreDatabase, Llm};
use graphgate_core::types::StorageContext;

use crate::factory::{GraphStoreConnector, GraphStoreFactory};
use crate::retriever::KnowledgeGraphRetriever;

/// Holds the optional graph store selected by settings.
pub struct GraphStoreComponent {
    graph_store: Option<Arc<dyn GraphStore>>,
    closed: AtomicBool,
}

impl GraphStoreComponent {
    /// Build the component with the clients compiled into this build.
    pub async fn new(settings: &Settings) -> GraphResult<Self> {
        Self::with_connector(settings, &GraphStoreFactory).await
    }

    /// Build the component, creating clients through `connector`.
    ///
    /// # Errors
    ///
    /// - `Configuration` when the selected backend has no settings block.
    /// - `DependencyMissing` when the selected backend is compiled out.
    /// - `GraphStore` when the client cannot connect.
    pub async fn with_connector(
        settings: &Settings,
        connector: &dyn GraphStoreConnector,
    ) -> GraphResult<Self> {
        let graph_store = match settings.graph_backend()? {
            GraphBackend::Unset => {
                info!("No graph store configured");
                None
            }
            GraphBackend::Neo4j(neo4j) => {
                info!(url = %neo4j.url, "Initializing Neo4j graph store");
                Some(connector.connect_neo4j(&neo4j).await?)
            }
            GraphBackend::FalkorDb(mut falkordb) => {
                info!(url = %falkordb.url, "Initializing FalkorDB graph store");
                falkordb.decode_responses = true;
                Some(connector.connect_falkordb(&falkordb).await?)
            }
        };

        Ok(Self {
            graph_store,
            closed: AtomicBool::new(false),
        })
    }

    /// The graph store handle, if one is configured.
    pub fn graph_store(&self) -> Option<Arc<dyn GraphStore>> {
        self.graph_store.clone()
    }

    /// The configured backend, if any.
    pub fn backend(&self) -> Option<GraphStoreDatabase> {
        self.graph_store.as_ref().map(|store| store.backend())
    }

    /// Whether [`close`](Self::close) has run.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Build a verbose knowledge graph retriever over the configured store.
    ///
    /// # Errors
    ///
    /// Returns a `State` error when no graph store is configured.
    pub fn get_knowledge_graph(
        &self,
        storage_context: StorageContext,
        llm: Arc<dyn Llm>,
    ) -> GraphResult<KnowledgeGraphRetriever> {
        let graph_store = self
            .graph_store
            .clone()
            .ok_or_else(|| GraphGateError::state("GraphStore not defined in settings"))?;

        Ok(KnowledgeGraphRetriever::new(graph_store, storage_context, llm).with_verbose(true))
    }

    /// Close the graph store connection.
    ///
    /// A no-op without a graph store or after the first call. Close failures
    /// are logged, never returned.
    pub async fn close(&self) {
        let Some(graph_store) = &self.graph_store else {
            return;
        };
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        match graph_store.close().await {
            Ok(()) => info!(backend = %graph_store.backend(), "Graph store closed"),
            Err(e) => warn!("Failed to close graph store: {}", e),
        }
    }
}

impl fmt::Debug for GraphStoreComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphStoreComponent")
            .field("backend", &self.backend())
            .field("closed", &self.is_closed())
            .finish()
    }
}
