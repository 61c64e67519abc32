//! Factory for creating graph store clients.

use std::sync::Arc;

use async_trait::async_trait;

use graphgate_core::config::{FalkorDbSettings, Neo4jSettings};
use graphgate_core::error::GraphResult;
use graphgate_core::traits::GraphStore;

/// Builds a live graph store from one backend's validated settings.
#[async_trait]
pub trait GraphStoreConnector: Send + Sync {
    /// Build a Neo4j client.
    async fn connect_neo4j(&self, settings: &Neo4jSettings) -> GraphResult<Arc<dyn GraphStore>>;

    /// Build a FalkorDB client.
    async fn connect_falkordb(
        &self,
        settings: &FalkorDbSettings,
    ) -> GraphResult<Arc<dyn GraphStore>>;
}

/// Factory for creating graph store clients from the backends compiled into this build.
///
/// A backend whose cargo feature is disabled fails with `DependencyMissing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct GraphStoreFactory;

#[async_trait]
impl GraphStoreConnector for GraphStoreFactory {
    #[cfg(feature = "neo4j")]
    async fn connect_neo4j(&self, settings: &Neo4jSettings) -> GraphResult<Arc<dyn GraphStore>> {
        let store = crate::neo4j::Neo4jGraphStore::new(settings).await?;
        Ok(Arc::new(store))
    }

    #[cfg(not(feature = "neo4j"))]
    async fn connect_neo4j(&self, _settings: &Neo4jSettings) -> GraphResult<Arc<dyn GraphStore>> {
        Err(missing(graphgate_core::traits::GraphStoreDatabase::Neo4j))
    }

    #[cfg(feature = "falkordb")]
    async fn connect_falkordb(
        &self,
        settings: &FalkorDbSettings,
    ) -> GraphResult<Arc<dyn GraphStore>> {
        let store = crate::falkordb::FalkorDbGraphStore::new(settings).await?;
        Ok(Arc::new(store))
    }

    #[cfg(not(feature = "falkordb"))]
    async fn connect_falkordb(
        &self,
        _settings: &FalkorDbSettings,
    ) -> GraphResult<Arc<dyn GraphStore>> {
        Err(missing(graphgate_core::traits::GraphStoreDatabase::FalkorDb))
    }
}

#[cfg(not(all(feature = "neo4j", feature = "falkordb")))]
fn missing(
    database: graphgate_core::traits::GraphStoreDatabase,
) -> graphgate_core::error::GraphGateError {
    graphgate_core::error::GraphGateError::dependency_missing(
        database.product_name(),
        database.feature(),
    )
}

#[cfg(all(test, not(feature = "neo4j")))]
mod neo4j_disabled_tests {
    use super::*;

    #[tokio::test]
    async fn test_neo4j_reports_missing_dependency() {
        let err = GraphStoreFactory
            .connect_neo4j(&Neo4jSettings::default())
            .await
            .err()
            .unwrap();
        assert!(err.is_dependency_missing());
        assert!(err.to_string().contains("--features neo4j"));
    }
}
