//! `GraphContext`: the unit of bulk transfer between stores and callers.
//!
//! Every traversal result, export, and import payload has this shape. The
//! structural form is a JSON tree with a `nodes` list and an `edges` list;
//! the file form is that tree written as UTF-8 JSON.

use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ContextError;
use crate::types::{validate_edge, validate_node, GraphEdge, GraphNode};

/// An immutable bundle of nodes and edges.
///
/// Holds no reference to the store it came from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GraphContext {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

impl GraphContext {
    pub fn new(nodes: Vec<GraphNode>, edges: Vec<GraphEdge>) -> Self {
        Self { nodes, edges }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }

    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn edge(&self, id: &str) -> Option<&GraphEdge> {
        self.edges.iter().find(|e| e.id == id)
    }

    /// Check that ids are unique within each list and every entity is well-formed.
    ///
    /// Edges may reference nodes outside this context; dangling edges are
    /// the importer's concern, not a format error.
    pub fn validate(&self) -> Result<(), ContextError> {
        let mut seen = HashSet::with_capacity(self.nodes.len());
        for node in &self.nodes {
            validate_node(node).map_err(ContextError::MalformedPayload)?;
            if !seen.insert(node.id.as_str()) {
                return Err(ContextError::MalformedPayload(format!(
                    "duplicate node id {}",
                    node.id
                )));
            }
        }

        let mut seen = HashSet::with_capacity(self.edges.len());
        for edge in &self.edges {
            validate_edge(edge).map_err(ContextError::MalformedPayload)?;
            if !seen.insert(edge.id.as_str()) {
                return Err(ContextError::MalformedPayload(format!(
                    "duplicate edge id {}",
                    edge.id
                )));
            }
        }

        Ok(())
    }

    // ── Structural form ──────────────────────────────────────────

    /// Serialize to the structural tree form.
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::to_value(self).expect("GraphContext serialization should not fail")
    }

    /// Rebuild a context from its structural tree form.
    ///
    /// Rejects unknown keys, missing required fields, duplicate ids, and
    /// malformed digests without returning a partial context.
    pub fn from_value(value: serde_json::Value) -> Result<Self, ContextError> {
        let context: GraphContext = serde_json::from_value(value)?;
        context.validate()?;
        Ok(context)
    }

    // ── File form ────────────────────────────────────────────────

    /// Write the structural form to `path`, replacing any existing file.
    pub fn to_file(&self, path: &Path) -> Result<(), ContextError> {
        let json = serde_json::to_vec_pretty(self)?;
        fs::write(path, json)?;
        tracing::debug!(path = %path.display(), nodes = self.nodes.len(), "Context written");
        Ok(())
    }

    /// Write the structural form to a fresh file in the OS temp directory.
    ///
    /// The file is created exclusively, so an existing path is never
    /// overwritten. The caller owns the returned file.
    pub fn to_temp_file(&self) -> Result<PathBuf, ContextError> {
        let path = std::env::temp_dir().join(format!("provgraph-context-{}.json", Uuid::new_v4()));
        let json = serde_json::to_vec_pretty(self)?;

        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)?;
        file.write_all(&json)?;
        file.sync_all()?;

        tracing::debug!(
            path = %path.display(),
            nodes = self.nodes.len(),
            edges = self.edges.len(),
            "Context written to temp file"
        );
        Ok(path)
    }

    /// Read a context previously written by [`to_file`](Self::to_file) or
    /// [`to_temp_file`](Self::to_temp_file).
    pub fn from_file(path: &Path) -> Result<Self, ContextError> {
        let bytes = fs::read(path)?;
        let value: serde_json::Value = serde_json::from_slice(&bytes)?;
        Self::from_value(value)
    }
}
