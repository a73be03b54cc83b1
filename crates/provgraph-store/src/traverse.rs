//! Bounded neighborhood traversal.
//!
//! BFS outward from a root node, following edges in either direction, for
//! at most `depth` hops. Each node is visited once, so cycles terminate.
//! The result holds every edge whose two endpoints were both visited,
//! including edges between nodes on the outermost hop.

use std::collections::{HashSet, VecDeque};

use provgraph_core::GraphContext;

use crate::error::StoreError;
use crate::queries::{incident_edges, load_node};
use crate::store::GraphStore;

impl GraphStore {
    /// Collect the `depth`-hop neighborhood of `node_id`.
    ///
    /// Depth 0 yields just the root with no edges. Fails with `NotFound`
    /// when the root does not exist. Runs against one read snapshot.
    pub fn get_context(&self, node_id: &str, depth: usize) -> Result<GraphContext, StoreError> {
        let context = self.read(|tx| {
            let root = load_node(tx, node_id)?.ok_or_else(|| StoreError::NotFound {
                id: node_id.to_string(),
            })?;

            let mut visited = HashSet::new();
            visited.insert(root.id.clone());
            let mut nodes = vec![root];

            if depth == 0 {
                return Ok(GraphContext::new(nodes, Vec::new()));
            }

            // BFS queue: (node_id, hops)
            let mut queue: VecDeque<(String, usize)> = VecDeque::new();
            queue.push_back((node_id.to_string(), 0));

            while let Some((current, hops)) = queue.pop_front() {
                if hops >= depth {
                    continue;
                }

                for edge in incident_edges(tx, &current)? {
                    let neighbor = if edge.source_id == current {
                        edge.target_id
                    } else {
                        edge.source_id
                    };
                    if visited.contains(&neighbor) {
                        continue;
                    }
                    // An edge left dangling by an external writer is not followed.
                    let Some(node) = load_node(tx, &neighbor)? else {
                        continue;
                    };

                    visited.insert(neighbor.clone());
                    nodes.push(node);
                    queue.push_back((neighbor, hops + 1));
                }
            }

            // Induced edges, in the order their first endpoint was visited.
            let mut seen_edges = HashSet::new();
            let mut edges = Vec::new();
            for node in &nodes {
                for edge in incident_edges(tx, &node.id)? {
                    if visited.contains(&edge.source_id)
                        && visited.contains(&edge.target_id)
                        && seen_edges.insert(edge.id.clone())
                    {
                        edges.push(edge);
                    }
                }
            }

            Ok(GraphContext::new(nodes, edges))
        })?;

        tracing::debug!(
            root = %node_id,
            depth,
            nodes = context.nodes.len(),
            edges = context.edges.len(),
            "Context traversed"
        );
        Ok(context)
    }
}
