//! Reconstructed heap reference graph.
//!
//! A `HeapGraph` is produced once by `GraphBuilder` and never mutated
//! afterwards. Consumers (summary listings, the render model) only read it.

pub mod builder;
pub mod identity;

pub use builder::{RelationSet, build_graph};
pub use identity::{IdentityResolver, NodeId};

use crate::diagnostics::Anomalies;
use crate::dump::HeapRecord;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Node table keyed by identity. Holds canonical and synthetic nodes alike.
pub type NodeTable = BTreeMap<NodeId, GraphNode>;

#[derive(Debug, Clone, PartialEq)]
pub struct GraphNode {
    pub id: NodeId,
    pub record: HeapRecord,
    /// Outgoing references, deduplicated. Iteration order is not meaningful.
    pub children: BTreeSet<NodeId>,
    /// Label hint copied from a dict key onto a value without its own short value.
    pub synthetic_value: Option<String>,
}

impl GraphNode {
    pub fn new(id: NodeId, record: HeapRecord) -> Self {
        Self {
            id,
            record,
            children: BTreeSet::new(),
            synthetic_value: None,
        }
    }

    /// Short text to show for this node, preferring the dumped value.
    pub fn display_value(&self) -> Option<&str> {
        self.record
            .short_value
            .as_deref()
            .or(self.synthetic_value.as_deref())
    }
}

impl fmt::Display for GraphNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Node({} {}, {} children)",
            self.record.address,
            self.record.kind,
            self.children.len()
        )
    }
}

#[derive(Debug, Clone)]
pub struct HeapGraph {
    nodes: NodeTable,
    anomalies: Anomalies,
}

impl HeapGraph {
    pub(crate) fn new(nodes: NodeTable, anomalies: Anomalies) -> Self {
        Self { nodes, anomalies }
    }

    pub fn nodes(&self) -> &NodeTable {
        &self.nodes
    }

    pub fn node(&self, id: &NodeId) -> Option<&GraphNode> {
        self.nodes.get(id)
    }

    /// Look up the canonical node for a real address.
    pub fn by_address(&self, address: &str) -> Option<&GraphNode> {
        self.nodes.get(&NodeId::canonical(address))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn edge_count(&self) -> usize {
        self.nodes.values().map(|n| n.children.len()).sum()
    }

    /// All edges as (referrer, referent) pairs.
    pub fn edges(&self) -> impl Iterator<Item = (&NodeId, &NodeId)> {
        self.nodes
            .values()
            .flat_map(|n| n.children.iter().map(move |c| (&n.id, c)))
    }

    pub fn anomalies(&self) -> &Anomalies {
        &self.anomalies
    }
}
