//! Core traits for graphgate providers.

mod graph_store;
mod llm;

pub use graph_store::*;
pub use llm::*;
