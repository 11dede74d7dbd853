//! Anomaly ledger and logging helpers.
//!
//! Nothing that goes wrong inside a single dump element aborts a run. Each
//! problem becomes an `Anomaly`, is logged once when recorded, and is kept in
//! an `Anomalies` ledger so the final report can say how complete the dump was.

use std::collections::BTreeMap;
use std::fmt;

/// Prefix used for fatal error messages surfaced from `main`.
pub fn error_message(msg: impl Into<String>) -> String {
    format!("heapgraph: {}", msg.into())
}

pub fn warn(msg: impl AsRef<str>) {
    log::warn!("{}", msg.as_ref());
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AnomalyKind {
    MalformedElement,
    MalformedRecord,
    MissingAddress,
    UnmappedNode,
    NilOwned,
    MissingOwner,
}

impl AnomalyKind {
    pub fn as_str(self) -> &'static str {
        match self {
            AnomalyKind::MalformedElement => "malformed element",
            AnomalyKind::MalformedRecord => "malformed record",
            AnomalyKind::MissingAddress => "missing address",
            AnomalyKind::UnmappedNode => "unmapped node",
            AnomalyKind::NilOwned => "nil node with owner",
            AnomalyKind::MissingOwner => "missing owner",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Anomaly {
    /// Top-level dump element that is not a JSON object.
    MalformedElement { index: usize, preview: String },
    /// JSON object that does not fit the record shape.
    MalformedRecord { index: usize, reason: String },
    /// Inline reference to an address absent from the node table.
    MissingAddress { address: String, kind: String },
    /// Bare address token absent from the node table.
    UnmappedNode { address: String },
    NilOwned { owner: String, kind: String },
    MissingOwner { owner: String, address: String },
}

impl Anomaly {
    pub fn kind(&self) -> AnomalyKind {
        match self {
            Anomaly::MalformedElement { .. } => AnomalyKind::MalformedElement,
            Anomaly::MalformedRecord { .. } => AnomalyKind::MalformedRecord,
            Anomaly::MissingAddress { .. } => AnomalyKind::MissingAddress,
            Anomaly::UnmappedNode { .. } => AnomalyKind::UnmappedNode,
            Anomaly::NilOwned { .. } => AnomalyKind::NilOwned,
            Anomaly::MissingOwner { .. } => AnomalyKind::MissingOwner,
        }
    }
}

impl fmt::Display for Anomaly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Anomaly::MalformedElement { index, preview } => {
                write!(f, "skipping element {}: {}", index, preview)
            }
            Anomaly::MalformedRecord { index, reason } => {
                write!(f, "skipping malformed record {}: {}", index, reason)
            }
            Anomaly::MissingAddress { address, kind } => {
                write!(f, "missing address {} ({})", address, kind)
            }
            Anomaly::UnmappedNode { address } => write!(f, "unmapped node {}", address),
            Anomaly::NilOwned { owner, kind } => {
                write!(f, "nil node with owner {} ({})", owner, kind)
            }
            Anomaly::MissingOwner { owner, address } => {
                write!(f, "missing owner {} for {}", owner, address)
            }
        }
    }
}

/// Ordered record of every anomaly seen during one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Anomalies {
    entries: Vec<Anomaly>,
}

impl Anomalies {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, anomaly: Anomaly) {
        warn(anomaly.to_string());
        self.entries.push(anomaly);
    }

    pub fn extend(&mut self, other: &Anomalies) {
        self.entries.extend(other.entries.iter().cloned());
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[cfg(test)]
    pub fn iter(&self) -> impl Iterator<Item = &Anomaly> {
        self.entries.iter()
    }

    pub fn count(&self, kind: AnomalyKind) -> usize {
        self.entries.iter().filter(|a| a.kind() == kind).count()
    }

    pub fn by_kind(&self) -> BTreeMap<AnomalyKind, usize> {
        let mut out = BTreeMap::new();
        for a in &self.entries {
            *out.entry(a.kind()).or_insert(0) += 1;
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn counts_by_kind() {
        let mut anomalies = Anomalies::new();
        anomalies.record(Anomaly::UnmappedNode {
            address: "0x5".into(),
        });
        anomalies.record(Anomaly::MissingAddress {
            address: "0x9".into(),
            kind: "tuple".into(),
        });
        anomalies.record(Anomaly::UnmappedNode {
            address: "0x6".into(),
        });

        assert_eq!(anomalies.len(), 3);
        assert_eq!(anomalies.count(AnomalyKind::UnmappedNode), 2);
        assert_eq!(anomalies.count(AnomalyKind::NilOwned), 0);
        let by_kind: Vec<_> = anomalies.by_kind().into_iter().collect();
        assert_eq!(
            by_kind,
            vec![(AnomalyKind::MissingAddress, 1), (AnomalyKind::UnmappedNode, 2)]
        );
    }

    #[test]
    fn display_names_the_address() {
        let a = Anomaly::MissingAddress {
            address: "0x9".into(),
            kind: "tuple".into(),
        };
        assert_eq!(a.to_string(), "missing address 0x9 (tuple)");
        assert_eq!(a.kind().as_str(), "missing address");
    }
}
