//! Read operations: exact-id lookups, federation search, schema, export.

use rusqlite::{params, OptionalExtension, Row, Transaction};
use serde::{Deserialize, Serialize};

use provgraph_core::{GraphContext, GraphEdge, GraphNode, Properties, SourceRef};

use crate::error::StoreError;
use crate::store::GraphStore;

/// Labels and relation types currently present in the store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphSchema {
    pub node_labels: Vec<String>,
    pub edge_types: Vec<String>,
}

impl GraphStore {
    // ── Single entity lookups ────────────────────────────────────

    /// Get a node with its sources. Absence is not an error.
    pub fn get_node(&self, id: &str) -> Result<Option<GraphNode>, StoreError> {
        self.read(|tx| load_node(tx, id))
    }

    /// Get an edge by id. Absence is not an error.
    pub fn get_edge(&self, id: &str) -> Result<Option<GraphEdge>, StoreError> {
        self.read(|tx| load_edge(tx, id))
    }

    // ── Federation ───────────────────────────────────────────────

    /// Find every node holding a source that matches `source` on
    /// `(plugin_name, table_name, row_id)`, and on `content_hash` when the
    /// query carries one. Matching is exact and case-sensitive.
    pub fn find_nodes_by_source(&self, source: &SourceRef) -> Result<Vec<GraphNode>, StoreError> {
        let nodes = self.read(|tx| {
            let mut stmt = tx.prepare(
                "SELECT node_id FROM source_refs
                 WHERE plugin_name = ?1 AND table_name = ?2 AND row_id = ?3
                   AND (?4 IS NULL OR content_hash = ?4)
                 GROUP BY node_id
                 ORDER BY node_id",
            )?;
            let ids = stmt
                .query_map(
                    params![
                        source.plugin_name,
                        source.table_name,
                        source.row_id,
                        source.content_hash
                    ],
                    |row| row.get::<_, String>(0),
                )?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            let mut nodes = Vec::with_capacity(ids.len());
            for id in ids {
                if let Some(node) = load_node(tx, &id)? {
                    nodes.push(node);
                }
            }
            Ok(nodes)
        })?;

        tracing::debug!(
            plugin_name = %source.plugin_name,
            table_name = %source.table_name,
            row_id = %source.row_id,
            matches = nodes.len(),
            "Federation lookup"
        );
        Ok(nodes)
    }

    // ── Whole-graph reads ────────────────────────────────────────

    /// Distinct labels and relation types, computed from current rows.
    ///
    /// This is a full scan on each call; nothing is cached.
    pub fn get_schema(&self) -> Result<GraphSchema, StoreError> {
        self.read(|tx| {
            let node_labels = string_column(tx, "SELECT DISTINCT label FROM nodes ORDER BY label")?;
            let edge_types = string_column(
                tx,
                "SELECT DISTINCT relation_type FROM edges ORDER BY relation_type",
            )?;
            Ok(GraphSchema {
                node_labels,
                edge_types,
            })
        })
    }

    /// A consistent snapshot of every node and edge.
    pub fn export_graph(&self) -> Result<GraphContext, StoreError> {
        let context = self.read(|tx| {
            let node_ids = string_column(tx, "SELECT id FROM nodes ORDER BY id")?;
            let mut nodes = Vec::with_capacity(node_ids.len());
            for id in node_ids {
                if let Some(node) = load_node(tx, &id)? {
                    nodes.push(node);
                }
            }

            let mut stmt = tx.prepare(
                "SELECT id, source_id, target_id, relation_type, properties
                 FROM edges ORDER BY id",
            )?;
            let rows = stmt
                .query_map([], edge_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            let edges = rows
                .into_iter()
                .map(EdgeRow::into_edge)
                .collect::<Result<Vec<_>, _>>()?;

            Ok(GraphContext::new(nodes, edges))
        })?;

        tracing::info!(
            nodes = context.nodes.len(),
            edges = context.edges.len(),
            "Graph exported"
        );
        Ok(context)
    }
}

// ── Row helpers shared with mutations and traversal ──────────────

pub(crate) fn node_exists(tx: &Transaction<'_>, id: &str) -> Result<bool, StoreError> {
    Ok(tx
        .query_row("SELECT 1 FROM nodes WHERE id = ?1", params![id], |_| Ok(()))
        .optional()?
        .is_some())
}

pub(crate) fn edge_exists(tx: &Transaction<'_>, id: &str) -> Result<bool, StoreError> {
    Ok(tx
        .query_row("SELECT 1 FROM edges WHERE id = ?1", params![id], |_| Ok(()))
        .optional()?
        .is_some())
}

pub(crate) fn load_node(tx: &Transaction<'_>, id: &str) -> Result<Option<GraphNode>, StoreError> {
    let row = tx
        .query_row(
            "SELECT label, properties FROM nodes WHERE id = ?1",
            params![id],
            |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
        )
        .optional()?;

    let Some((label, properties)) = row else {
        return Ok(None);
    };

    let mut stmt = tx.prepare_cached(
        "SELECT plugin_name, table_name, row_id, content_hash, segment_slice
         FROM source_refs WHERE node_id = ?1 ORDER BY position",
    )?;
    let sources = stmt
        .query_map(params![id], |row| {
            Ok(SourceRef {
                plugin_name: row.get(0)?,
                table_name: row.get(1)?,
                row_id: row.get(2)?,
                content_hash: row.get(3)?,
                segment_slice: row.get(4)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(Some(GraphNode {
        id: id.to_string(),
        label,
        properties: parse_properties(&properties)?,
        sources,
    }))
}

pub(crate) fn load_edge(tx: &Transaction<'_>, id: &str) -> Result<Option<GraphEdge>, StoreError> {
    let row = tx
        .query_row(
            "SELECT id, source_id, target_id, relation_type, properties
             FROM edges WHERE id = ?1",
            params![id],
            edge_row,
        )
        .optional()?;
    row.map(EdgeRow::into_edge).transpose()
}

/// Every edge with `node_id` as either endpoint, in id order.
pub(crate) fn incident_edges(
    tx: &Transaction<'_>,
    node_id: &str,
) -> Result<Vec<GraphEdge>, StoreError> {
    let mut stmt = tx.prepare_cached(
        "SELECT id, source_id, target_id, relation_type, properties
         FROM edges WHERE source_id = ?1 OR target_id = ?1
         ORDER BY id",
    )?;
    let rows = stmt
        .query_map(params![node_id], edge_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    rows.into_iter().map(EdgeRow::into_edge).collect()
}

/// An edge as stored, before its property blob is decoded.
struct EdgeRow {
    id: String,
    source_id: String,
    target_id: String,
    relation_type: String,
    properties: String,
}

impl EdgeRow {
    fn into_edge(self) -> Result<GraphEdge, StoreError> {
        Ok(GraphEdge {
            properties: parse_properties(&self.properties)?,
            id: self.id,
            source_id: self.source_id,
            target_id: self.target_id,
            relation_type: self.relation_type,
        })
    }
}

fn edge_row(row: &Row<'_>) -> rusqlite::Result<EdgeRow> {
    Ok(EdgeRow {
        id: row.get(0)?,
        source_id: row.get(1)?,
        target_id: row.get(2)?,
        relation_type: row.get(3)?,
        properties: row.get(4)?,
    })
}

fn parse_properties(json: &str) -> Result<Properties, StoreError> {
    Ok(serde_json::from_str(json)?)
}

fn string_column(tx: &Transaction<'_>, sql: &str) -> Result<Vec<String>, StoreError> {
    let mut stmt = tx.prepare(sql)?;
    let values = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use provgraph_core::{PropertyValue, StoreConfig};

    fn store() -> GraphStore {
        GraphStore::initialize(&StoreConfig::in_memory()).unwrap()
    }

    #[test]
    fn get_node_preserves_sources_and_properties() {
        let store = store();
        let node = GraphNode::new("a", "Person")
            .with_property("name", "Sun Tzu")
            .with_property("born", -544_i64)
            .with_property("aliases", vec![PropertyValue::from("Sunzi")])
            .with_source(
                SourceRef::new("voxtral", "transcriptions", "job_123")
                    .with_content(b"first")
                    .with_segment("timestamp:00:00-00:10"),
            )
            .with_source(SourceRef::new("manual", "notes", "9"));
        store.add_nodes(&[node.clone()]).unwrap();

        let loaded = store.get_node("a").unwrap().unwrap();
        assert_eq!(loaded, node);
        assert_eq!(loaded.sources[1].plugin_name, "manual");
    }

    #[test]
    fn missing_entities_are_none() {
        let store = store();
        assert!(store.get_node("nope").unwrap().is_none());
        assert!(store.get_edge("nope").unwrap().is_none());
    }

    #[test]
    fn federation_matches_tuple_and_optional_hash() {
        let store = store();
        let hash_a = SourceRef::compute_hash(b"alpha");
        let hash_b = SourceRef::compute_hash(b"beta");
        store
            .add_nodes(&[
                GraphNode::new("n1", "Document")
                    .with_source(SourceRef::new("p", "t", "row").with_content_hash(hash_a.clone())),
                GraphNode::new("n2", "Quote")
                    .with_source(SourceRef::new("p", "t", "row").with_content_hash(hash_b.clone())),
                GraphNode::new("n3", "Quote").with_source(SourceRef::new("p", "t", "other")),
                GraphNode::new("n4", "Quote").with_source(SourceRef::new("q", "t", "row")),
            ])
            .unwrap();

        let ids = |nodes: Vec<GraphNode>| nodes.into_iter().map(|n| n.id).collect::<Vec<_>>();

        let by_tuple = store.find_nodes_by_source(&SourceRef::new("p", "t", "row")).unwrap();
        assert_eq!(ids(by_tuple), vec!["n1", "n2"]);

        let by_hash = store
            .find_nodes_by_source(&SourceRef::new("p", "t", "row").with_content_hash(hash_b))
            .unwrap();
        assert_eq!(ids(by_hash), vec!["n2"]);

        let upper = store
            .find_nodes_by_source(
                &SourceRef::new("p", "t", "row").with_content_hash(hash_a.to_uppercase()),
            )
            .unwrap();
        assert!(upper.is_empty());

        let none = store.find_nodes_by_source(&SourceRef::new("P", "t", "row")).unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn node_with_two_matching_sources_is_returned_once() {
        let store = store();
        store
            .add_nodes(&[GraphNode::new("n1", "Document")
                .with_source(SourceRef::new("p", "t", "row").with_segment("char:0-5"))
                .with_source(SourceRef::new("p", "t", "row").with_segment("char:6-9"))])
            .unwrap();
        let found = store.find_nodes_by_source(&SourceRef::new("p", "t", "row")).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].sources.len(), 2);
    }

    #[test]
    fn schema_tracks_current_state() {
        let store = store();
        assert_eq!(store.get_schema().unwrap(), GraphSchema::default());

        store
            .add_nodes(&[
                GraphNode::new("a", "Person"),
                GraphNode::new("b", "Concept"),
                GraphNode::new("c", "Person"),
            ])
            .unwrap();
        store
            .add_edges(&[GraphEdge::new("ab", "a", "b", "AUTHORED")])
            .unwrap();

        let schema = store.get_schema().unwrap();
        assert_eq!(schema.node_labels, vec!["Concept", "Person"]);
        assert_eq!(schema.edge_types, vec!["AUTHORED"]);

        store.delete_nodes(&["b".to_string()], true).unwrap();
        let schema = store.get_schema().unwrap();
        assert_eq!(schema.node_labels, vec!["Person"]);
        assert!(schema.edge_types.is_empty());
    }

    #[test]
    fn export_contains_everything() {
        let store = store();
        store
            .add_nodes(&[GraphNode::new("a", "Person"), GraphNode::new("b", "Concept")])
            .unwrap();
        store
            .add_edges(&[GraphEdge::new("ab", "a", "b", "AUTHORED").with_property("year", -500_i64)])
            .unwrap();

        let exported = store.export_graph().unwrap();
        assert_eq!(exported.nodes.len(), 2);
        assert_eq!(exported.edges.len(), 1);
        assert_eq!(
            exported.edge("ab").unwrap().properties["year"],
            PropertyValue::Int(-500)
        );
    }
}
