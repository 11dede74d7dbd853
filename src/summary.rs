//! Plain-text triage listings over a finished graph.
//!
//! Read-only; running it any number of times gives the same output.

use crate::graph::{HeapGraph, NodeId};

use regex::Regex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocLine {
    pub alloc: u64,
    pub id: NodeId,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferrerLine {
    pub count: usize,
    pub id: NodeId,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    pub node_count: usize,
    pub edge_count: usize,
    pub total_alloc: u64,
    /// All listed nodes, allocation ascending.
    pub by_allocation: Vec<AllocLine>,
    /// Listed nodes with at least one child.
    pub referrers: Vec<ReferrerLine>,
}

impl Summary {
    pub fn of(graph: &HeapGraph) -> Self {
        Self::filtered(graph, None)
    }

    /// Counts always cover the whole graph; `type_filter` only narrows the listings.
    pub fn filtered(graph: &HeapGraph, type_filter: Option<&Regex>) -> Self {
        let mut by_allocation = Vec::new();
        let mut referrers = Vec::new();

        for node in graph.nodes().values() {
            if let Some(re) = type_filter {
                if !re.is_match(&node.record.kind) {
                    continue;
                }
            }
            let description = node.to_string();
            if !node.children.is_empty() {
                referrers.push(ReferrerLine {
                    count: node.children.len(),
                    id: node.id.clone(),
                    description: description.clone(),
                });
            }
            by_allocation.push(AllocLine {
                alloc: node.record.alloc,
                id: node.id.clone(),
                description,
            });
        }

        // Stable: ties keep node table order.
        by_allocation.sort_by_key(|l| l.alloc);

        Summary {
            node_count: graph.len(),
            edge_count: graph.edge_count(),
            total_alloc: graph
                .nodes()
                .values()
                .fold(0u64, |acc, n| acc.saturating_add(n.record.alloc)),
            by_allocation,
            referrers,
        }
    }

    /// `<count> <address> <node>` for every referrer.
    pub fn referrer_lines(&self) -> Vec<String> {
        self.referrers
            .iter()
            .map(|r| format!("{} {} {}", r.count, r.id, r.description))
            .collect()
    }

    /// `<alloc> <node>` lines, ascending. `top` keeps only the largest N.
    pub fn allocation_lines(&self, top: Option<usize>) -> Vec<String> {
        let skip = top
            .map(|n| self.by_allocation.len().saturating_sub(n))
            .unwrap_or(0);
        self.by_allocation
            .iter()
            .skip(skip)
            .map(|l| format!("{} {}", l.alloc, l.description))
            .collect()
    }

    pub fn totals_line(&self) -> String {
        format!(
            "{} nodes, {} edges, {} allocated, {} referrers",
            self.node_count,
            self.edge_count,
            self.total_alloc,
            self.referrers.len()
        )
    }
}
