//! Write operations for the graph store.
//!
//! Creation is strict (an existing id is an error) while import is
//! idempotent (an existing id is counted and left untouched). Each public
//! operation is one transaction: on any error nothing from the call is kept.

use std::collections::HashSet;

use rusqlite::{params, Transaction};
use serde::{Deserialize, Serialize};

use provgraph_core::types::{validate_edge, validate_node};
use provgraph_core::{GraphContext, GraphEdge, GraphNode};

use crate::error::{EntityKind, StoreError};
use crate::queries::{edge_exists, node_exists};
use crate::store::GraphStore;

/// Outcome counts of an `import_graph` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportStats {
    pub nodes_created: usize,
    pub nodes_existing: usize,
    pub edges_created: usize,
    pub edges_existing: usize,
    /// Edges dropped because an endpoint exists neither here nor in the payload.
    pub edges_skipped: usize,
}

impl GraphStore {
    // ── Creation ─────────────────────────────────────────────────

    /// Persist new nodes together with their ordered source references.
    ///
    /// Fails with `DuplicateId` if any id already exists or repeats within
    /// `nodes`; in that case none of the nodes are written.
    pub fn add_nodes(&self, nodes: &[GraphNode]) -> Result<Vec<GraphNode>, StoreError> {
        for node in nodes {
            validate_node(node).map_err(StoreError::InvalidEntity)?;
        }

        self.write(|tx| {
            let mut batch = HashSet::with_capacity(nodes.len());
            for node in nodes {
                if !batch.insert(node.id.as_str()) || node_exists(tx, &node.id)? {
                    return Err(StoreError::DuplicateId {
                        entity: EntityKind::Node,
                        id: node.id.clone(),
                    });
                }
                insert_node(tx, node)?;
            }
            Ok(())
        })?;

        tracing::debug!(node_count = nodes.len(), "Nodes added");
        Ok(nodes.to_vec())
    }

    /// Persist new edges between existing nodes.
    ///
    /// Fails with `DuplicateId` for an existing or repeated edge id and with
    /// `DanglingReference` if either endpoint is missing. All or nothing.
    pub fn add_edges(&self, edges: &[GraphEdge]) -> Result<Vec<GraphEdge>, StoreError> {
        for edge in edges {
            validate_edge(edge).map_err(StoreError::InvalidEntity)?;
        }

        self.write(|tx| {
            let mut batch = HashSet::with_capacity(edges.len());
            for edge in edges {
                if !batch.insert(edge.id.as_str()) || edge_exists(tx, &edge.id)? {
                    return Err(StoreError::DuplicateId {
                        entity: EntityKind::Edge,
                        id: edge.id.clone(),
                    });
                }
                for endpoint in [&edge.source_id, &edge.target_id] {
                    if !node_exists(tx, endpoint)? {
                        return Err(StoreError::DanglingReference {
                            edge_id: edge.id.clone(),
                            node_id: endpoint.clone(),
                        });
                    }
                }
                insert_edge(tx, edge)?;
            }
            Ok(())
        })?;

        tracing::debug!(edge_count = edges.len(), "Edges added");
        Ok(edges.to_vec())
    }

    // ── Deletion ─────────────────────────────────────────────────

    /// Remove nodes (and their source references). Returns how many existed.
    ///
    /// With `cascade`, every edge touching a removed node goes in the same
    /// transaction. Without it, any such edge aborts the whole call with
    /// `ReferentialIntegrityViolation`.
    pub fn delete_nodes(&self, ids: &[String], cascade: bool) -> Result<usize, StoreError> {
        let (deleted, edges_removed) = self.write(|tx| {
            let mut edges_removed = 0;
            if cascade {
                for id in ids {
                    edges_removed += tx.execute(
                        "DELETE FROM edges WHERE source_id = ?1 OR target_id = ?1",
                        params![id],
                    )?;
                }
            } else {
                for id in ids {
                    let edge_count: i64 = tx.query_row(
                        "SELECT COUNT(*) FROM edges WHERE source_id = ?1 OR target_id = ?1",
                        params![id],
                        |row| row.get(0),
                    )?;
                    if edge_count > 0 {
                        return Err(StoreError::ReferentialIntegrityViolation {
                            node_id: id.clone(),
                            edge_count: edge_count as usize,
                        });
                    }
                }
            }

            let mut deleted = 0;
            for id in ids {
                tx.execute("DELETE FROM source_refs WHERE node_id = ?1", params![id])?;
                deleted += tx.execute("DELETE FROM nodes WHERE id = ?1", params![id])?;
            }
            Ok((deleted, edges_removed))
        })?;

        tracing::info!(
            requested = ids.len(),
            deleted,
            edges_removed,
            cascade,
            "Nodes deleted"
        );
        Ok(deleted)
    }

    // ── Import ───────────────────────────────────────────────────

    /// Merge a context into this store.
    ///
    /// Ids that already exist are counted, not overwritten, so applying the
    /// same context twice is a no-op the second time. An edge whose endpoint
    /// is absent after the node pass is skipped rather than failing the call.
    pub fn import_graph(&self, context: &GraphContext) -> Result<ImportStats, StoreError> {
        context.validate()?;

        let stats = self.write(|tx| {
            let mut stats = ImportStats::default();

            for node in &context.nodes {
                if node_exists(tx, &node.id)? {
                    stats.nodes_existing += 1;
                } else {
                    insert_node(tx, node)?;
                    stats.nodes_created += 1;
                }
            }

            for edge in &context.edges {
                if edge_exists(tx, &edge.id)? {
                    stats.edges_existing += 1;
                    continue;
                }
                if !node_exists(tx, &edge.source_id)? || !node_exists(tx, &edge.target_id)? {
                    tracing::warn!(
                        edge_id = %edge.id,
                        source_id = %edge.source_id,
                        target_id = %edge.target_id,
                        "Skipping dangling edge during import"
                    );
                    stats.edges_skipped += 1;
                    continue;
                }
                insert_edge(tx, edge)?;
                stats.edges_created += 1;
            }

            Ok(stats)
        })?;

        tracing::info!(
            nodes_created = stats.nodes_created,
            nodes_existing = stats.nodes_existing,
            edges_created = stats.edges_created,
            edges_existing = stats.edges_existing,
            edges_skipped = stats.edges_skipped,
            "Graph imported"
        );
        Ok(stats)
    }
}

// ── Row writers ──────────────────────────────────────────────────

fn insert_node(tx: &Transaction<'_>, node: &GraphNode) -> Result<(), StoreError> {
    let properties = serde_json::to_string(&node.properties)?;
    tx.execute(
        "INSERT INTO nodes (id, label, properties) VALUES (?1, ?2, ?3)",
        params![node.id, node.label, properties],
    )?;

    for (position, source) in node.sources.iter().enumerate() {
        tx.execute(
            "INSERT INTO source_refs
               (node_id, position, plugin_name, table_name, row_id, content_hash, segment_slice)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                node.id,
                position as i64,
                source.plugin_name,
                source.table_name,
                source.row_id,
                source.content_hash,
                source.segment_slice,
            ],
        )?;
    }
    Ok(())
}

fn insert_edge(tx: &Transaction<'_>, edge: &GraphEdge) -> Result<(), StoreError> {
    let properties = serde_json::to_string(&edge.properties)?;
    tx.execute(
        "INSERT INTO edges (id, source_id, target_id, relation_type, properties)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            edge.id,
            edge.source_id,
            edge.target_id,
            edge.relation_type,
            properties
        ],
    )?;
    Ok(())
}
