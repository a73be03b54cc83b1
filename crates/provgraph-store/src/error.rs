//! Error types for graph store operations.

use std::fmt;

use provgraph_core::{ContextError, ErrorKind};

/// Which entity table an id belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Node,
    Edge,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Node => f.write_str("node"),
            Self::Edge => f.write_str("edge"),
        }
    }
}

/// Errors from graph store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Storage unavailable at {location}: {reason}")]
    StorageUnavailable { location: String, reason: String },

    #[error("Duplicate {entity} id: {id}")]
    DuplicateId { entity: EntityKind, id: String },

    #[error("Edge {edge_id} references missing node {node_id}")]
    DanglingReference { edge_id: String, node_id: String },

    #[error("Node {node_id} is still referenced by {edge_count} edge(s)")]
    ReferentialIntegrityViolation { node_id: String, edge_count: usize },

    #[error("Node not found: {id}")]
    NotFound { id: String },

    #[error("Invalid entity: {0}")]
    InvalidEntity(String),

    #[error("Payload error: {0}")]
    Payload(#[from] ContextError),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::StorageUnavailable { .. } => ErrorKind::StorageUnavailable,
            Self::DuplicateId { .. } => ErrorKind::DuplicateId,
            Self::DanglingReference { .. } => ErrorKind::DanglingReference,
            Self::ReferentialIntegrityViolation { .. } => ErrorKind::ReferentialIntegrityViolation,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::InvalidEntity(_) => ErrorKind::InvalidEntity,
            Self::Payload(e) => e.kind(),
            Self::Sqlite(_) | Self::Serialization(_) => ErrorKind::Storage,
        }
    }

    pub(crate) fn unavailable(location: impl Into<String>, reason: impl ToString) -> Self {
        Self::StorageUnavailable {
            location: location.into(),
            reason: reason.to_string(),
        }
    }
}
