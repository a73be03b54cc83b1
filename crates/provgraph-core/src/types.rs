//! Core domain types for the provenance graph.
//!
//! Nodes and edges carry caller-supplied ids and dynamic property maps.
//! Nodes additionally own an ordered list of `SourceRef` provenance pointers.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::hash;

// ── Properties ────────────────────────────────────────────────────

/// A JSON-compatible property value attached to a node or edge.
///
/// Integers are kept apart from floats so that `-500` survives a storage
/// round trip as an integer rather than `-500.0`. Integers above `i64::MAX`
/// land in `UInt`; variant order matters for untagged decoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    String(String),
    List(Vec<PropertyValue>),
    Map(BTreeMap<String, PropertyValue>),
}

/// String-keyed property map. Key order is irrelevant to equality.
pub type Properties = BTreeMap<String, PropertyValue>;

impl PropertyValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            _ => None,
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<i64> for PropertyValue {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<u64> for PropertyValue {
    fn from(n: u64) -> Self {
        Self::UInt(n)
    }
}

impl From<f64> for PropertyValue {
    fn from(n: f64) -> Self {
        Self::Float(n)
    }
}

impl From<bool> for PropertyValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<Vec<PropertyValue>> for PropertyValue {
    fn from(items: Vec<PropertyValue>) -> Self {
        Self::List(items)
    }
}

impl From<Properties> for PropertyValue {
    fn from(map: Properties) -> Self {
        Self::Map(map)
    }
}

// ── Provenance ────────────────────────────────────────────────────

/// A pointer to the external record a graph entity was derived from.
///
/// Identity for federation lookups is the `(plugin_name, table_name, row_id)`
/// tuple; `content_hash` is an optional extra filter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceRef {
    /// Producer identity, e.g. a transcription plugin.
    pub plugin_name: String,
    /// Logical table inside the producer.
    pub table_name: String,
    /// Row identifier inside that table.
    pub row_id: String,
    /// Hex BLAKE3 digest of the content at capture time.
    #[serde(default)]
    pub content_hash: Option<String>,
    /// Opaque locator within the row (byte range, timestamp range, ...).
    #[serde(default)]
    pub segment_slice: Option<String>,
}

impl SourceRef {
    pub fn new(
        plugin_name: impl Into<String>,
        table_name: impl Into<String>,
        row_id: impl Into<String>,
    ) -> Self {
        Self {
            plugin_name: plugin_name.into(),
            table_name: table_name.into(),
            row_id: row_id.into(),
            content_hash: None,
            segment_slice: None,
        }
    }

    /// Record the digest of `content`.
    pub fn with_content(mut self, content: &[u8]) -> Self {
        self.content_hash = Some(Self::compute_hash(content));
        self
    }

    /// Record a digest computed elsewhere.
    pub fn with_content_hash(mut self, content_hash: impl Into<String>) -> Self {
        self.content_hash = Some(content_hash.into());
        self
    }

    pub fn with_segment(mut self, segment_slice: impl Into<String>) -> Self {
        self.segment_slice = Some(segment_slice.into());
        self
    }

    /// Compute the content digest for raw bytes.
    pub fn compute_hash(content: &[u8]) -> String {
        hash::compute_content_hash(content)
    }

    /// Check `content` against the recorded digest.
    ///
    /// Returns false when no digest was recorded.
    pub fn verify(&self, content: &[u8]) -> bool {
        match &self.content_hash {
            Some(stored) => stored == &Self::compute_hash(content),
            None => false,
        }
    }
}

// ── Nodes and Edges ───────────────────────────────────────────────

/// A labelled graph vertex.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GraphNode {
    /// Caller-supplied globally unique id, typically a UUID.
    pub id: String,
    /// Type tag such as "Person" or "Concept".
    pub label: String,
    #[serde(default)]
    pub properties: Properties,
    /// Provenance pointers, in insertion order.
    #[serde(default)]
    pub sources: Vec<SourceRef>,
}

impl GraphNode {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            properties: Properties::new(),
            sources: Vec::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn with_source(mut self, source: SourceRef) -> Self {
        self.sources.push(source);
        self
    }
}

/// A directed, typed relationship between two nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GraphEdge {
    pub id: String,
    pub source_id: String,
    pub target_id: String,
    /// Relationship type such as "AUTHORED".
    pub relation_type: String,
    #[serde(default)]
    pub properties: Properties,
}

impl GraphEdge {
    pub fn new(
        id: impl Into<String>,
        source_id: impl Into<String>,
        target_id: impl Into<String>,
        relation_type: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            source_id: source_id.into(),
            target_id: target_id.into(),
            relation_type: relation_type.into(),
            properties: Properties::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }
}

// ── Validation ────────────────────────────────────────────────────

/// Check the non-empty field invariants of a node and its sources.
pub fn validate_node(node: &GraphNode) -> Result<(), String> {
    if node.id.is_empty() {
        return Err("node id must not be empty".to_string());
    }
    if node.label.is_empty() {
        return Err(format!("node {} has an empty label", node.id));
    }
    for (i, source) in node.sources.iter().enumerate() {
        if source.plugin_name.is_empty() || source.table_name.is_empty() {
            return Err(format!(
                "node {} source #{i} needs both plugin_name and table_name",
                node.id
            ));
        }
        if let Some(digest) = &source.content_hash {
            if !hash::is_content_hash(digest) {
                return Err(format!(
                    "node {} source #{i} content_hash is not a {}-character hex digest",
                    node.id,
                    hash::CONTENT_HASH_HEX_LEN
                ));
            }
        }
    }
    Ok(())
}

/// Check the non-empty field invariants of an edge.
pub fn validate_edge(edge: &GraphEdge) -> Result<(), String> {
    if edge.id.is_empty() {
        return Err("edge id must not be empty".to_string());
    }
    if edge.source_id.is_empty() || edge.target_id.is_empty() {
        return Err(format!("edge {} has an empty endpoint", edge.id));
    }
    if edge.relation_type.is_empty() {
        return Err(format!("edge {} has an empty relation_type", edge.id));
    }
    Ok(())
}
