//! Uniform command surface over a `GraphStore`.
//!
//! `execute(action, args)` takes a named action and a JSON object of
//! arguments and answers with a JSON tree in the same structural form as
//! `GraphContext::to_value`, so it can sit behind any transport. Arguments
//! are fully decoded and validated before the store is touched.

use std::fmt;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use provgraph_core::types::{validate_edge, validate_node};
use provgraph_core::{ErrorKind, GraphContext, GraphEdge, GraphNode, SourceRef};

use crate::error::StoreError;
use crate::store::GraphStore;

/// Errors from [`CommandDispatcher::execute`].
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Unknown action: {0}")]
    UnknownAction(String),

    #[error("Invalid arguments for {action}: {reason}")]
    InvalidArguments { action: String, reason: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl DispatchError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnknownAction(_) => ErrorKind::UnknownAction,
            Self::InvalidArguments { .. } => ErrorKind::InvalidArguments,
            Self::Store(e) => e.kind(),
        }
    }
}

/// Every operation reachable through the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    AddNodes,
    AddEdges,
    GetNode,
    GetEdge,
    GetContext,
    FindNodesBySource,
    DeleteNodes,
    GetSchema,
    ExportGraph,
    ImportGraph,
}

impl Action {
    pub const ALL: [Action; 10] = [
        Action::AddNodes,
        Action::AddEdges,
        Action::GetNode,
        Action::GetEdge,
        Action::GetContext,
        Action::FindNodesBySource,
        Action::DeleteNodes,
        Action::GetSchema,
        Action::ExportGraph,
        Action::ImportGraph,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AddNodes => "add_nodes",
            Self::AddEdges => "add_edges",
            Self::GetNode => "get_node",
            Self::GetEdge => "get_edge",
            Self::GetContext => "get_context",
            Self::FindNodesBySource => "find_nodes_by_source",
            Self::DeleteNodes => "delete_nodes",
            Self::GetSchema => "get_schema",
            Self::ExportGraph => "export_graph",
            Self::ImportGraph => "import_graph",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = DispatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Action::ALL
            .into_iter()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| DispatchError::UnknownAction(s.to_string()))
    }
}

// ── Argument shapes ──────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct AddNodesArgs {
    nodes: Vec<GraphNode>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct AddEdgesArgs {
    edges: Vec<GraphEdge>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct NodeIdArgs {
    node_id: String,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct EdgeIdArgs {
    edge_id: String,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct GetContextArgs {
    node_id: String,
    #[serde(default = "default_depth")]
    depth: usize,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct FindBySourceArgs {
    source_ref: SourceRef,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct DeleteNodesArgs {
    node_ids: Vec<String>,
    #[serde(default = "default_cascade")]
    cascade: bool,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct ImportGraphArgs {
    graph: Value,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct NoArgs {}

fn default_depth() -> usize {
    1
}

fn default_cascade() -> bool {
    true
}

// ── Dispatcher ───────────────────────────────────────────────────

/// Drives a `GraphStore` through a single `execute` entry point.
pub struct CommandDispatcher<'a> {
    store: &'a GraphStore,
}

impl<'a> CommandDispatcher<'a> {
    pub fn new(store: &'a GraphStore) -> Self {
        Self { store }
    }

    /// Run `action` with the JSON object `args` (`null` means no arguments).
    pub fn execute(&self, action: &str, args: Value) -> Result<Value, DispatchError> {
        let action: Action = action.parse()?;
        let args = match args {
            Value::Null => Value::Object(Default::default()),
            obj @ Value::Object(_) => obj,
            other => {
                return Err(invalid(
                    action,
                    format!("expected a JSON object, got {}", json_type(&other)),
                ))
            }
        };

        tracing::debug!(action = %action, "Dispatching command");
        let result = self.run(action, args);
        if let Err(e) = &result {
            tracing::debug!(action = %action, kind = %e.kind(), error = %e, "Command failed");
        }
        result
    }

    fn run(&self, action: Action, args: Value) -> Result<Value, DispatchError> {
        match action {
            Action::AddNodes => {
                let AddNodesArgs { nodes } = decode(action, args)?;
                for node in &nodes {
                    validate_node(node).map_err(|reason| invalid(action, reason))?;
                }
                let created = self.store.add_nodes(&nodes)?;
                Ok(json!({ "nodes": created, "count": created.len() }))
            }
            Action::AddEdges => {
                let AddEdgesArgs { edges } = decode(action, args)?;
                for edge in &edges {
                    validate_edge(edge).map_err(|reason| invalid(action, reason))?;
                }
                let created = self.store.add_edges(&edges)?;
                Ok(json!({ "edges": created, "count": created.len() }))
            }
            Action::GetNode => {
                let NodeIdArgs { node_id } = decode(action, args)?;
                let node = self.store.get_node(&node_id)?;
                Ok(json!({ "node": node }))
            }
            Action::GetEdge => {
                let EdgeIdArgs { edge_id } = decode(action, args)?;
                let edge = self.store.get_edge(&edge_id)?;
                Ok(json!({ "edge": edge }))
            }
            Action::GetContext => {
                let GetContextArgs { node_id, depth } = decode(action, args)?;
                Ok(self.store.get_context(&node_id, depth)?.to_value())
            }
            Action::FindNodesBySource => {
                let FindBySourceArgs { source_ref } = decode(action, args)?;
                let nodes = self.store.find_nodes_by_source(&source_ref)?;
                Ok(json!({ "nodes": nodes, "count": nodes.len() }))
            }
            Action::DeleteNodes => {
                let DeleteNodesArgs { node_ids, cascade } = decode(action, args)?;
                let deleted = self.store.delete_nodes(&node_ids, cascade)?;
                Ok(json!({ "deleted": deleted }))
            }
            Action::GetSchema => {
                let NoArgs {} = decode(action, args)?;
                let schema = self.store.get_schema()?;
                Ok(json!({
                    "node_labels": schema.node_labels,
                    "edge_types": schema.edge_types,
                }))
            }
            Action::ExportGraph => {
                let NoArgs {} = decode(action, args)?;
                Ok(self.store.export_graph()?.to_value())
            }
            Action::ImportGraph => {
                let ImportGraphArgs { graph } = decode(action, args)?;
                let context =
                    GraphContext::from_value(graph).map_err(|e| invalid(action, e.to_string()))?;
                let stats = self.store.import_graph(&context)?;
                Ok(json!(stats))
            }
        }
    }
}

fn decode<T: DeserializeOwned>(action: Action, args: Value) -> Result<T, DispatchError> {
    serde_json::from_value(args).map_err(|e| invalid(action, e.to_string()))
}

fn invalid(action: Action, reason: impl Into<String>) -> DispatchError {
    DispatchError::InvalidArguments {
        action: action.as_str().to_string(),
        reason: reason.into(),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
