//! The declarative graph: the single source of truth.
//!
//! A [`GraphDocument`] is plain serializable data. Live units are a projection
//! of it and are never consulted to answer questions about the graph.

use std::collections::BTreeMap;
use std::fmt;

use patchwire_catalog::{PropertyValue, UnitSpec};
use serde::{Deserialize, Serialize};

/// Identifier of a visual node. Stable for the life of the document.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// Wraps a raw identifier.
    pub fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the raw numeric identifier.
    #[inline]
    pub fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

/// Identifier of a visual edge.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EdgeId(pub(crate) u32);

impl EdgeId {
    /// Wraps a raw identifier.
    pub fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the raw numeric identifier.
    #[inline]
    pub fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EdgeId({})", self.0)
    }
}

/// Canvas position of a node.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    /// Horizontal coordinate.
    pub x: f64,
    /// Vertical coordinate.
    pub y: f64,
}

impl Position {
    /// Creates a position.
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Declarative record of one unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisualNode {
    /// Node identifier.
    pub id: NodeId,
    /// Catalog type name.
    #[serde(rename = "type")]
    pub type_name: String,
    /// Canvas position.
    #[serde(default)]
    pub position: Position,
    /// Property values by name.
    #[serde(default)]
    pub properties: BTreeMap<String, PropertyValue>,
    /// Copy of the catalog metadata at creation time. Empty when a
    /// hand-written document omits it; the synchronizer resolves it from the
    /// catalog on load.
    #[serde(default)]
    pub metadata: UnitSpec,
}

impl VisualNode {
    /// Property value, falling back to the declared default.
    pub fn property_or_default(&self, name: &str) -> Option<&PropertyValue> {
        self.properties
            .get(name)
            .or_else(|| self.metadata.find_property(name).map(|p| &p.default))
    }
}

/// Declarative record of one connection between two named ports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisualEdge {
    /// Edge identifier.
    pub id: EdgeId,
    /// Source node.
    pub source: NodeId,
    /// Target node.
    pub target: NodeId,
    /// Output port on the source.
    pub source_port: String,
    /// Input port (or modulation target) on the target.
    pub target_port: String,
}

impl VisualEdge {
    /// Returns `true` if either endpoint is `node`.
    pub fn touches(&self, node: NodeId) -> bool {
        self.source == node || self.target == node
    }
}

/// Ordered nodes and edges.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GraphDocument {
    /// Nodes in insertion order.
    #[serde(default)]
    pub nodes: Vec<VisualNode>,
    /// Edges in insertion order.
    #[serde(default)]
    pub edges: Vec<VisualEdge>,
}

impl GraphDocument {
    /// Creates an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a document from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serialize the document as pretty JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Looks up a node.
    pub fn node(&self, id: NodeId) -> Option<&VisualNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Position of a node in [`nodes`](Self::nodes).
    pub fn node_index(&self, id: NodeId) -> Option<usize> {
        self.nodes.iter().position(|n| n.id == id)
    }

    /// Looks up an edge.
    pub fn edge(&self, id: EdgeId) -> Option<&VisualEdge> {
        self.edges.iter().find(|e| e.id == id)
    }

    /// Position of an edge in [`edges`](Self::edges).
    pub fn edge_index(&self, id: EdgeId) -> Option<usize> {
        self.edges.iter().position(|e| e.id == id)
    }

    /// Edges with `node` as either endpoint, in document order.
    pub fn edges_touching(&self, node: NodeId) -> impl Iterator<Item = &VisualEdge> {
        self.edges.iter().filter(move |e| e.touches(node))
    }

    /// Finds an edge connecting exactly these ports.
    pub fn find_edge(
        &self,
        source: NodeId,
        source_port: &str,
        target: NodeId,
        target_port: &str,
    ) -> Option<&VisualEdge> {
        self.edges.iter().find(|e| {
            e.source == source
                && e.target == target
                && e.source_port == source_port
                && e.target_port == target_port
        })
    }

    /// Smallest node ID greater than every node in the document, or `None`
    /// if some node already holds `u32::MAX`.
    pub fn next_node_id(&self) -> Option<u32> {
        next_after(self.nodes.iter().map(|n| n.id.0))
    }

    /// Smallest edge ID greater than every edge in the document, or `None`
    /// if some edge already holds `u32::MAX`.
    pub fn next_edge_id(&self) -> Option<u32> {
        next_after(self.edges.iter().map(|e| e.id.0))
    }

    /// Number of nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of edges.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Returns `true` if the document has no nodes and no edges.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }
}

fn next_after(ids: impl Iterator<Item = u32>) -> Option<u32> {
    ids.map(|id| id.checked_add(1))
        .try_fold(0, |next, id| id.map(|id| next.max(id)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use patchwire_catalog::Catalog;

    fn node(id: u32, type_name: &str) -> VisualNode {
        let metadata = Catalog::new().get(type_name).unwrap().clone();
        VisualNode {
            id: NodeId(id),
            type_name: type_name.to_string(),
            position: Position::new(10.0, 20.0),
            properties: BTreeMap::new(),
            metadata,
        }
    }

    #[test]
    fn lookup_by_id() {
        let mut doc = GraphDocument::new();
        doc.nodes.push(node(3, "Gain"));
        doc.nodes.push(node(7, "Oscillator"));
        assert_eq!(doc.node_index(NodeId(7)), Some(1));
        assert!(doc.node(NodeId(4)).is_none());
        assert_eq!(doc.next_node_id(), Some(8));
        assert_eq!(doc.next_edge_id(), Some(0));
    }

    #[test]
    fn next_id_after_the_largest_is_none() {
        let mut doc = GraphDocument::new();
        doc.nodes.push(node(u32::MAX, "Gain"));
        doc.nodes.push(node(2, "Gain"));
        assert_eq!(doc.next_node_id(), None);
    }

    #[test]
    fn property_falls_back_to_default() {
        let mut n = node(0, "Gain");
        assert_eq!(n.property_or_default("gain"), Some(&PropertyValue::Number(1.0)));
        n.properties
            .insert("gain".to_string(), PropertyValue::Number(0.5));
        assert_eq!(n.property_or_default("gain"), Some(&PropertyValue::Number(0.5)));
        assert!(n.property_or_default("cutoff").is_none());
    }

    #[test]
    fn json_uses_type_key() {
        let mut doc = GraphDocument::new();
        doc.nodes.push(node(0, "Gain"));
        let json = doc.to_json().unwrap();
        assert!(json.contains(r#""type": "Gain""#));
        assert_eq!(GraphDocument::from_json(&json).unwrap(), doc);
    }

    #[test]
    fn edges_touching_filters_both_ends() {
        let mut doc = GraphDocument::new();
        for (id, (s, t)) in [(0, 1), (1, 2), (2, 3)].into_iter().enumerate() {
            doc.edges.push(VisualEdge {
                id: EdgeId(id as u32),
                source: NodeId(s),
                target: NodeId(t),
                source_port: "output".to_string(),
                target_port: "input".to_string(),
            });
        }
        let ids: Vec<EdgeId> = doc.edges_touching(NodeId(1)).map(|e| e.id).collect();
        assert_eq!(ids, vec![EdgeId(0), EdgeId(1)]);
        assert!(doc.find_edge(NodeId(1), "output", NodeId(2), "input").is_some());
        assert!(doc.find_edge(NodeId(2), "output", NodeId(1), "input").is_none());
    }
}
