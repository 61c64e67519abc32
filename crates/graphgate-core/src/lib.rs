//! graphgate-core - Core library for graphgate.
//!
//! This crate provides the settings, traits, and error types shared by the
//! graph store adapters and the component that selects between them.
//!
//! # Example
//!
//! ```ignore
//! use graphgate_core::Settings;
//!
//! let settings = Settings::load(Some("settings.toml".as_ref()))?;
//! match settings.graph_backend()? {
//!     GraphBackend::Unset => println!("graph store disabled"),
//!     backend => println!("using {:?}", backend.database()),
//! }
//! ```

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use config::{FalkorDbSettings, GraphBackend, GraphStoreSettings, Neo4jSettings, Settings};
pub use error::{ErrorCode, GraphGateError, GraphResult};
pub use traits::{GraphStore, GraphStoreDatabase, Llm, LlmResponse, RelMap, Triplet};
pub use types::{Message, MessageRole, NodeWithScore, Params, Row, StorageContext};
