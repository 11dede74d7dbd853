//! Three-pass graph construction.
//!
//! 1. allocate: one node per address-bearing record
//! 2. resolve: each record's reference block becomes child edges
//! 3. owners: `owner` fields become owner -> owned edges
//!
//! Every pass completes even over a broken dump; anything that cannot be
//! resolved is recorded as an anomaly and the edge is dropped.

use crate::diagnostics::{Anomalies, Anomaly};
use crate::dump::{Dump, HeapRecord, RefSlot, References, RelationKind};
use crate::graph::{GraphNode, HeapGraph, IdentityResolver, NodeId, NodeTable};

use std::collections::BTreeSet;

/// Relation kinds the builder follows.
///
/// Locals and function slots are off by default; following them floods the
/// graph with frame edges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationSet(BTreeSet<RelationKind>);

impl Default for RelationSet {
    fn default() -> Self {
        Self(BTreeSet::from([
            RelationKind::Children,
            RelationKind::Items,
            RelationKind::Globals,
            RelationKind::Owner,
        ]))
    }
}

impl RelationSet {
    #[cfg(test)]
    pub fn all() -> Self {
        Self(RelationKind::ALL.into_iter().collect())
    }

    pub fn with(mut self, kind: RelationKind) -> Self {
        self.0.insert(kind);
        self
    }

    pub fn without(mut self, kind: RelationKind) -> Self {
        self.0.remove(&kind);
        self
    }

    pub fn contains(&self, kind: RelationKind) -> bool {
        self.0.contains(&kind)
    }

    pub fn iter(&self) -> impl Iterator<Item = RelationKind> + '_ {
        self.0.iter().copied()
    }
}

pub struct GraphBuilder {
    relations: RelationSet,
    resolver: IdentityResolver,
    nodes: NodeTable,
    anomalies: Anomalies,
}

impl GraphBuilder {
    pub fn new(relations: RelationSet) -> Self {
        Self {
            relations,
            resolver: IdentityResolver::new(),
            nodes: NodeTable::new(),
            anomalies: Anomalies::new(),
        }
    }

    /// Start from anomalies found earlier (e.g. while parsing).
    pub fn with_anomalies(mut self, anomalies: &Anomalies) -> Self {
        self.anomalies.extend(anomalies);
        self
    }

    pub fn build(mut self, records: &[HeapRecord]) -> HeapGraph {
        self.allocate(records);
        log::info!("allocated {} nodes", self.nodes.len());

        self.resolve_references(records);
        if self.relations.contains(RelationKind::Owner) {
            self.link_owners(records);
        }
        log::info!(
            "resolved {} nodes ({} anomalies)",
            self.nodes.len(),
            self.anomalies.len()
        );

        HeapGraph::new(self.nodes, self.anomalies)
    }

    fn allocate(&mut self, records: &[HeapRecord]) {
        for record in records {
            let Some(addr) = record.address.known() else {
                continue;
            };
            let id = NodeId::canonical(addr);
            // A repeated address keeps one node; the later record is the one shown.
            match self.nodes.get_mut(&id) {
                Some(node) => {
                    log::debug!("duplicate record for address {}", addr);
                    node.record = record.clone();
                }
                None => {
                    self.nodes.insert(id.clone(), GraphNode::new(id, record.clone()));
                }
            }
        }
    }

    fn resolve(&mut self, slot: Option<&RefSlot>) -> Option<NodeId> {
        self.resolver
            .resolve(slot, &mut self.nodes, &mut self.anomalies)
    }

    fn resolve_references(&mut self, records: &[HeapRecord]) {
        for record in records {
            let Some(addr) = record.address.known() else {
                continue;
            };
            let Some(kind) = record.references.relation() else {
                continue;
            };
            if !self.relations.contains(kind) {
                continue;
            }

            let mut resolved = Vec::new();
            match &record.references {
                References::Entries(entries) => {
                    for entry in entries {
                        let key = self.resolve(entry.key.as_ref());
                        let value = self.resolve(entry.value.as_ref());
                        if let (Some(k), Some(v)) = (&key, &value) {
                            let inline_hint = match &entry.key {
                                Some(RefSlot::Inline(r)) => r.short_value.clone(),
                                _ => None,
                            };
                            self.propagate_key_value(inline_hint, k, v);
                        }
                        resolved.extend(key);
                        resolved.extend(value);
                    }
                }
                References::Items(items) => {
                    for item in items {
                        let child = self.resolve(item.as_ref());
                        resolved.extend(child);
                    }
                }
                References::Globals(slot)
                | References::Locals(slot)
                | References::Function(slot) => {
                    let child = self.resolve(Some(slot));
                    resolved.extend(child);
                }
                References::Empty => {}
            }

            if let Some(node) = self.nodes.get_mut(&NodeId::canonical(addr)) {
                node.children.extend(resolved);
            }
        }
    }

    /// Copy a dict key's short value onto its value when the value has none.
    ///
    /// The inline key record wins over the key's tabled record.
    fn propagate_key_value(&mut self, inline_hint: Option<String>, key: &NodeId, value: &NodeId) {
        let Some(label) = inline_hint.or_else(|| {
            self.nodes
                .get(key)
                .and_then(|k| k.record.short_value.clone())
        }) else {
            return;
        };
        if let Some(node) = self.nodes.get_mut(value) {
            if node.record.short_value.is_none() && node.synthetic_value.is_none() {
                node.synthetic_value = Some(label);
            }
        }
    }

    fn link_owners(&mut self, records: &[HeapRecord]) {
        for record in records {
            let Some(owner) = &record.owner else {
                continue;
            };
            let Some(addr) = record.address.known() else {
                self.anomalies.record(Anomaly::NilOwned {
                    owner: owner.clone(),
                    kind: record.kind.clone(),
                });
                continue;
            };
            match self.nodes.get_mut(&NodeId::canonical(owner.as_str())) {
                Some(owner_node) => {
                    owner_node.children.insert(NodeId::canonical(addr));
                }
                None => self.anomalies.record(Anomaly::MissingOwner {
                    owner: owner.clone(),
                    address: addr.to_string(),
                }),
            }
        }
    }
}

/// Reconstruct the graph for a parsed dump, carrying its parse anomalies along.
pub fn build_graph(dump: &Dump, relations: &RelationSet) -> HeapGraph {
    GraphBuilder::new(relations.clone())
        .with_anomalies(&dump.anomalies)
        .build(&dump.records)
}
