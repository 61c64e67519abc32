//! graphgate-graph-stores - Graph store clients for graphgate.
//!
//! This crate selects a graph database client from settings and hands out
//! knowledge graph retrievers bound to it.
//!
//! # Supported Backends
//!
//! - **Neo4j** (feature: `neo4j`) - Neo4j over Bolt
//! - **FalkorDB** (feature: `falkordb`) - FalkorDB over the Redis protocol
//!
//! # Example
//!
//! ```ignore
//! use graphgate_graph_stores::GraphStoreComponent;
//!
//! let component = GraphStoreComponent::new(&settings).await?;
//! let retriever = component.get_knowledge_graph(StorageContext::new(), llm)?;
//! let nodes = retriever.retrieve("Where does Alice work?").await?;
//! component.close().await;
//! ```

mod component;
mod factory;
mod retriever;

#[cfg(any(feature = "neo4j", feature = "falkordb"))]
mod cypher;

#[cfg(feature = "neo4j")]
mod neo4j;

#[cfg(feature = "falkordb")]
mod falkordb;

pub use component::GraphStoreComponent;
pub use factory::{GraphStoreConnector, GraphStoreFactory};
pub use retriever::KnowledgeGraphRetriever;

#[cfg(feature = "neo4j")]
pub use neo4j::Neo4jGraphStore;

#[cfg(feature = "falkordb")]
pub use falkordb::FalkorDbGraphStore;

// Re-export core types
pub use graphgate_core::traits::{GraphStore, GraphStoreDatabase};
