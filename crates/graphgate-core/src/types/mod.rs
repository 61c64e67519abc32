//! Core types for graphgate.

mod message;
mod retrieval;
mod row;

pub use message::*;
pub use retrieval::*;
pub use row::*;
