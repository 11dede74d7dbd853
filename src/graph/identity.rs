//! Node identities and reference resolution.
//!
//! A reference can name a real address or an anonymous object. Real
//! addresses map to exactly one `Canonical` id. Anonymous objects get a fresh
//! `Synthetic` id every time they are seen, so two identical-looking nil
//! records never collapse into one node.

use crate::diagnostics::{Anomalies, Anomaly};
use crate::dump::{Address, HeapRecord, RefSlot, References};
use crate::graph::{GraphNode, NodeTable};

use std::collections::HashMap;
use std::fmt;

/// Type tag given to placeholders for bare addresses missing from the dump.
pub const UNMAPPED: &str = "unmapped";

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NodeId {
    Canonical(String),
    /// `seq` is unique within one reconstruction run.
    Synthetic { seq: u64, kind: String },
}

impl NodeId {
    pub fn canonical(address: impl Into<String>) -> Self {
        NodeId::Canonical(address.into())
    }

    pub fn is_synthetic(&self) -> bool {
        matches!(self, NodeId::Synthetic { .. })
    }

    /// Name for rendered output, tagged with the variant.
    ///
    /// `Display` is for people and a dumped address may spell `int#0`; keys
    /// of different ids never collide.
    pub fn key(&self) -> String {
        match self {
            NodeId::Canonical(addr) => format!("c:{}", addr),
            NodeId::Synthetic { seq, kind } => format!("s:{}#{}", kind, seq),
        }
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeId::Canonical(addr) => f.write_str(addr),
            NodeId::Synthetic { seq, kind } => write!(f, "{}#{}", kind, seq),
        }
    }
}

/// Turns reference occurrences into node ids.
///
/// Owns the synthetic sequence counter, so separate runs never share ids.
#[derive(Debug, Default)]
pub struct IdentityResolver {
    next_seq: u64,
    unmapped: HashMap<String, NodeId>,
}

impl IdentityResolver {
    pub fn new() -> Self {
        Self::default()
    }

    fn synthesize(&mut self, kind: &str) -> NodeId {
        let id = NodeId::Synthetic {
            seq: self.next_seq,
            kind: kind.to_string(),
        };
        self.next_seq += 1;
        id
    }

    /// Allocate a fresh synthetic node wrapping `record`.
    fn fresh(&mut self, record: HeapRecord, table: &mut NodeTable) -> NodeId {
        let id = self.synthesize(&record.kind);
        table.insert(id.clone(), GraphNode::new(id.clone(), record));
        id
    }

    /// Resolve one reference occurrence against the table.
    ///
    /// Synthetic nodes are inserted into `table` as a side effect. Dropped
    /// references return `None`; all of them except romdata are recorded in
    /// `anomalies`.
    pub fn resolve(
        &mut self,
        slot: Option<&RefSlot>,
        table: &mut NodeTable,
        anomalies: &mut Anomalies,
    ) -> Option<NodeId> {
        match slot? {
            RefSlot::Inline(record) => match &record.address {
                Address::Nil => Some(self.fresh((**record).clone(), table)),
                Address::Known(addr) => {
                    let id = NodeId::canonical(addr.as_str());
                    if table.contains_key(&id) {
                        return Some(id);
                    }
                    if record.is_romdata() {
                        log::debug!("skipping romdata reference {}", addr);
                    } else {
                        anomalies.record(Anomaly::MissingAddress {
                            address: addr.clone(),
                            kind: record.kind.clone(),
                        });
                    }
                    None
                }
            },
            RefSlot::Address(token) => {
                let Address::Known(addr) = Address::from_token(Some(token.clone())) else {
                    let record = placeholder(Address::Nil, "unknown");
                    return Some(self.fresh(record, table));
                };
                let id = NodeId::canonical(addr.as_str());
                if table.contains_key(&id) {
                    return Some(id);
                }
                anomalies.record(Anomaly::UnmappedNode {
                    address: addr.clone(),
                });
                if let Some(id) = self.unmapped.get(&addr) {
                    return Some(id.clone());
                }
                let id = self.fresh(placeholder(Address::Known(addr.clone()), UNMAPPED), table);
                self.unmapped.insert(addr, id.clone());
                Some(id)
            }
        }
    }
}

fn placeholder(address: Address, kind: &str) -> HeapRecord {
    HeapRecord {
        address,
        kind: kind.to_string(),
        alloc: 0,
        short_value: None,
        owner: None,
        references: References::Empty,
    }
}
