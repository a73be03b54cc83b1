//! provgraph-core: Value types, hashing, and payload formats for the provenance graph.
//!
//! This crate provides the foundational types used by every provgraph component:
//! - Node and edge types with dynamic property maps
//! - `SourceRef` provenance pointers and content-hash verification
//! - `GraphContext`, the unit of bulk transfer, with tree and file encodings
//! - Store configuration
//! - The shared error kind taxonomy

pub mod config;
pub mod context;
pub mod error;
pub mod hash;
pub mod types;

pub use config::StoreConfig;
pub use context::GraphContext;
pub use error::{ContextError, ErrorKind};
pub use types::{GraphEdge, GraphNode, Properties, PropertyValue, SourceRef};
