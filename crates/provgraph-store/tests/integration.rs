//! End-to-end behaviour of the store against file-backed databases.

use serde_json::{json, Value};

use provgraph_core::{
    ErrorKind, GraphContext, GraphEdge, GraphNode, PropertyValue, SourceRef, StoreConfig,
};
use provgraph_store::{CommandDispatcher, GraphStore, ImportStats};

const TRANSCRIPT: &[u8] = b"All warfare is based on deception.";

fn file_store(dir: &tempfile::TempDir, name: &str) -> GraphStore {
    GraphStore::initialize(&StoreConfig::new(dir.path().join(name))).unwrap()
}

fn transcript_source() -> SourceRef {
    SourceRef::new("voxtral", "transcriptions", "job_123")
        .with_content(TRANSCRIPT)
        .with_segment("char:0-34")
}

fn seed(store: &GraphStore) {
    store
        .add_nodes(&[
            GraphNode::new("sun-tzu", "Person").with_property("name", "Sun Tzu"),
            GraphNode::new("art-of-war", "Concept")
                .with_property("title", "The Art of War")
                .with_source(transcript_source()),
        ])
        .unwrap();
    store
        .add_edges(&[GraphEdge::new("authored", "sun-tzu", "art-of-war", "AUTHORED")
            .with_property("year", -500i64)])
        .unwrap();
}

#[test]
fn provenance_lifecycle() {
    let dir = tempfile::tempdir().unwrap();
    let store = file_store(&dir, "graph.db");
    seed(&store);

    let ctx = store.get_context("sun-tzu", 1).unwrap();
    assert_eq!(ctx.nodes.len(), 2);
    assert_eq!(ctx.edges.len(), 1);
    assert_eq!(ctx.edges[0].properties["year"].as_i64(), Some(-500));

    let found = store
        .find_nodes_by_source(&SourceRef::new("voxtral", "transcriptions", "job_123"))
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, "art-of-war");

    let schema = store.get_schema().unwrap();
    assert_eq!(schema.node_labels, vec!["Concept", "Person"]);
    assert_eq!(schema.edge_types, vec!["AUTHORED"]);

    let exported = store.export_graph().unwrap();
    let replica = file_store(&dir, "replica.db");
    let stats = replica.import_graph(&exported).unwrap();
    assert_eq!(
        stats,
        ImportStats {
            nodes_created: 2,
            edges_created: 1,
            ..Default::default()
        }
    );
    assert_eq!(replica.export_graph().unwrap(), exported);

    assert_eq!(store.delete_nodes(&["sun-tzu".to_string()], true).unwrap(), 1);
    assert!(store.get_edge("authored").unwrap().is_none());
    assert!(store.get_node("art-of-war").unwrap().is_some());

    store.cleanup().unwrap();
    replica.cleanup().unwrap();
}

#[test]
fn content_hash_survives_every_path() {
    let dir = tempfile::tempdir().unwrap();
    let store = file_store(&dir, "graph.db");
    seed(&store);
    let expected = transcript_source().content_hash.unwrap();

    // Direct read.
    let node = store.get_node("art-of-war").unwrap().unwrap();
    let source = &node.sources[0];
    assert_eq!(source.content_hash.as_deref(), Some(expected.as_str()));
    assert_eq!(source.segment_slice.as_deref(), Some("char:0-34"));
    assert!(source.verify(TRANSCRIPT));
    assert!(!source.verify(&TRANSCRIPT[..TRANSCRIPT.len() - 1]));

    // Traversal.
    let ctx = store.get_context("sun-tzu", 1).unwrap();
    let via_context = ctx.node("art-of-war").unwrap();
    assert!(via_context.sources[0].verify(TRANSCRIPT));

    // Tree form.
    let tree = ctx.to_value();
    assert_eq!(tree["nodes"][1]["sources"][0]["content_hash"], expected);
    let back = GraphContext::from_value(tree).unwrap();
    assert_eq!(back, ctx);

    // File form.
    let path = store.export_graph().unwrap().to_temp_file().unwrap();
    let from_disk = GraphContext::from_file(&path).unwrap();
    std::fs::remove_file(&path).unwrap();
    assert!(from_disk.node("art-of-war").unwrap().sources[0].verify(TRANSCRIPT));

    // Import into a fresh store.
    let replica = file_store(&dir, "replica.db");
    replica.import_graph(&from_disk).unwrap();
    let imported = replica.get_node("art-of-war").unwrap().unwrap();
    assert_eq!(imported.sources, node.sources);

    // Command surface.
    let dispatcher = CommandDispatcher::new(&replica);
    let result = dispatcher
        .execute("get_node", json!({"node_id": "art-of-war"}))
        .unwrap();
    assert_eq!(result["node"]["sources"][0]["content_hash"], expected);
}

#[test]
fn integer_extremes_survive_storage() {
    let dir = tempfile::tempdir().unwrap();
    let store = file_store(&dir, "graph.db");
    store
        .add_nodes(&[GraphNode::new("counter", "Counter")
            .with_property("big", u64::MAX)
            .with_property("small", i64::MIN)])
        .unwrap();
    store.cleanup().unwrap();

    let reopened = file_store(&dir, "graph.db");
    let node = reopened.get_node("counter").unwrap().unwrap();
    assert_eq!(node.properties["big"], PropertyValue::UInt(u64::MAX));
    assert_eq!(node.properties["small"], PropertyValue::Int(i64::MIN));

    let dispatcher = CommandDispatcher::new(&reopened);
    let result = dispatcher
        .execute("get_node", json!({"node_id": "counter"}))
        .unwrap();
    assert_eq!(result["node"]["properties"]["big"], json!(u64::MAX));
}

/// Stage a node plus an edge to it inside an open write transaction on a
/// separate connection to the same database file.
fn stage_uncommitted_write(dir: &tempfile::TempDir) -> rusqlite::Connection {
    let conn = rusqlite::Connection::open(dir.path().join("graph.db")).unwrap();
    conn.execute_batch(
        "BEGIN IMMEDIATE;
         INSERT INTO nodes (id, label, properties) VALUES ('sun-bin', 'Person', '{}');
         INSERT INTO edges (id, source_id, target_id, relation_type, properties)
             VALUES ('descendant', 'sun-bin', 'sun-tzu', 'DESCENDS_FROM', '{}');",
    )
    .unwrap();
    conn
}

#[test]
fn readers_never_see_an_uncommitted_write() {
    let dir = tempfile::tempdir().unwrap();
    let store = file_store(&dir, "graph.db");
    seed(&store);
    let before = store.export_graph().unwrap();

    let writer = stage_uncommitted_write(&dir);

    let ctx = store.get_context("sun-tzu", 1).unwrap();
    assert!(ctx.node("sun-bin").is_none());
    assert!(ctx.edge("descendant").is_none());
    assert_eq!(store.export_graph().unwrap(), before);
    assert!(store.get_node("sun-bin").unwrap().is_none());
    assert!(store.get_edge("descendant").unwrap().is_none());

    writer.execute_batch("COMMIT").unwrap();

    let ctx = store.get_context("sun-tzu", 1).unwrap();
    assert!(ctx.node("sun-bin").is_some());
    assert!(ctx.edge("descendant").is_some());
    let after = store.export_graph().unwrap();
    assert_eq!(after.nodes.len(), before.nodes.len() + 1);
    assert_eq!(after.edges.len(), before.edges.len() + 1);
}

#[test]
fn rolled_back_write_is_never_visible() {
    let dir = tempfile::tempdir().unwrap();
    let store = file_store(&dir, "graph.db");
    seed(&store);
    let before = store.export_graph().unwrap();

    let writer = stage_uncommitted_write(&dir);
    assert_eq!(store.export_graph().unwrap(), before);
    writer.execute_batch("ROLLBACK").unwrap();

    assert_eq!(store.export_graph().unwrap(), before);
    assert_eq!(store.get_context("sun-tzu", 5).unwrap().nodes.len(), 2);
}

#[test]
fn data_persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let store = file_store(&dir, "graph.db");
    seed(&store);
    store.cleanup().unwrap();

    let reopened = file_store(&dir, "graph.db");
    let node = reopened.get_node("art-of-war").unwrap().unwrap();
    assert_eq!(node.sources, vec![transcript_source()]);
    assert_eq!(reopened.export_graph().unwrap().edges.len(), 1);
}

#[test]
fn import_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let store = file_store(&dir, "graph.db");
    seed(&store);
    let exported = store.export_graph().unwrap();

    let replica = file_store(&dir, "replica.db");
    replica.import_graph(&exported).unwrap();
    let before = replica.export_graph().unwrap();

    let stats = replica.import_graph(&exported).unwrap();
    assert_eq!(stats.nodes_created, 0);
    assert_eq!(stats.nodes_existing, 2);
    assert_eq!(stats.edges_existing, 1);
    assert_eq!(replica.export_graph().unwrap(), before);
}

#[test]
fn failed_batches_leave_no_trace() {
    let dir = tempfile::tempdir().unwrap();
    let store = file_store(&dir, "graph.db");
    seed(&store);
    let before = store.export_graph().unwrap();

    let err = store
        .add_nodes(&[GraphNode::new("new", "Person"), GraphNode::new("sun-tzu", "Person")])
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DuplicateId);

    let err = store
        .add_edges(&[
            GraphEdge::new("ok", "art-of-war", "sun-tzu", "CITES"),
            GraphEdge::new("dangling", "sun-tzu", "nowhere", "CITES"),
        ])
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DanglingReference);

    let err = store
        .delete_nodes(&["sun-tzu".to_string()], false)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ReferentialIntegrityViolation);

    assert_eq!(store.export_graph().unwrap(), before);
}

#[test]
fn cascade_removes_every_incident_edge() {
    let dir = tempfile::tempdir().unwrap();
    let store = file_store(&dir, "graph.db");
    store
        .add_nodes(&[
            GraphNode::new("hub", "Concept"),
            GraphNode::new("x", "Concept"),
            GraphNode::new("y", "Concept"),
        ])
        .unwrap();
    store
        .add_edges(&[
            GraphEdge::new("out", "hub", "x", "CITES"),
            GraphEdge::new("in", "y", "hub", "CITES"),
            GraphEdge::new("loop", "hub", "hub", "CITES"),
            GraphEdge::new("side", "x", "y", "CITES"),
        ])
        .unwrap();

    store.delete_nodes(&["hub".to_string()], true).unwrap();

    let remaining = store.export_graph().unwrap();
    assert!(remaining
        .edges
        .iter()
        .all(|e| e.source_id != "hub" && e.target_id != "hub"));
    assert_eq!(remaining.edges.len(), 1);
    assert_eq!(remaining.nodes.len(), 2);
}

#[test]
fn dispatcher_drives_full_workflow() {
    let dir = tempfile::tempdir().unwrap();
    let store = file_store(&dir, "graph.db");
    let dispatcher = CommandDispatcher::new(&store);

    let nodes: Value = json!({"nodes": [
        {"id": "sun-tzu", "label": "Person", "properties": {"name": "Sun Tzu"}},
        {"id": "art-of-war", "label": "Concept", "sources": [transcript_source()]}
    ]});
    assert_eq!(dispatcher.execute("add_nodes", nodes).unwrap()["count"], 2);

    let edges = json!({"edges": [{
        "id": "authored", "source_id": "sun-tzu", "target_id": "art-of-war",
        "relation_type": "AUTHORED", "properties": {"year": -500}
    }]});
    assert_eq!(dispatcher.execute("add_edges", edges).unwrap()["count"], 1);

    let tree = dispatcher
        .execute("get_context", json!({"node_id": "art-of-war", "depth": 1}))
        .unwrap();
    let ctx = GraphContext::from_value(tree).unwrap();
    assert_eq!(ctx.nodes[0].id, "art-of-war");
    assert_eq!(ctx.edges[0].relation_type, "AUTHORED");

    let exported = dispatcher.execute("export_graph", Value::Null).unwrap();
    assert_eq!(exported["nodes"].as_array().unwrap().len(), 2);

    let deleted = dispatcher
        .execute("delete_nodes", json!({"node_ids": ["sun-tzu", "ghost"]}))
        .unwrap();
    assert_eq!(deleted["deleted"], 1);
    assert_eq!(
        dispatcher.execute("get_edge", json!({"edge_id": "authored"})).unwrap(),
        json!({"edge": null})
    );
}
