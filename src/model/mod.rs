//! Render model: flatten a `HeapGraph` into drawable nodes and edges.

use crate::dump::HeapRecord;
use crate::graph::{GraphNode, HeapGraph};

use serde::Serialize;
use std::collections::BTreeMap;

const MAX_VALUE_CHARS: usize = 40;
const SATURATION: f64 = 0.5;

/// Fill color in HSV space, each channel in 0..=1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Shade {
    pub hue: f64,
    pub saturation: f64,
    pub value: f64,
}

impl Shade {
    /// Larger allocations drift from blue towards red; more children darken.
    pub fn for_node(alloc: u64, child_count: usize) -> Self {
        let hue = (0.529 - ((alloc as f64) + 1.0).log2() / 20.0).max(0.0);
        let value = 1.0 - (child_count as f64 / 50.0).min(0.5);
        Shade {
            hue,
            saturation: SATURATION,
            value,
        }
    }

    /// Graphviz "H S V" color string.
    pub fn graphviz(&self) -> String {
        format!("{:.3} {:.3} {:.3}", self.hue, self.saturation, self.value)
    }

    /// CSS `hsl(...)` equivalent.
    pub fn css(&self) -> String {
        let l = self.value * (1.0 - self.saturation / 2.0);
        let s = if l <= 0.0 || l >= 1.0 {
            0.0
        } else {
            (self.value - l) / l.min(1.0 - l)
        };
        format!(
            "hsl({:.1}, {:.1}%, {:.1}%)",
            self.hue * 360.0,
            s * 100.0,
            l * 100.0
        )
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NodeView {
    /// Unique node name; see `NodeId::key`.
    pub id: String,
    /// Human-readable id.
    pub name: String,
    pub kind: String,
    pub address: String,
    pub alloc: u64,
    pub child_count: usize,
    pub value: Option<String>,
    pub synthetic: bool,
    pub label: String,
    pub shade: Shade,
    pub color: String,
    pub css_color: String,
    pub children: Vec<String>,
    /// Record the node was built from, for lookup in the viewer.
    pub record: HeapRecord,
}

#[derive(Debug, Clone, Serialize)]
pub struct TotalsView {
    pub nodes: usize,
    pub edges: usize,
    pub total_alloc: u64,
    pub anomalies: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct GraphView {
    pub nodes: BTreeMap<String, NodeView>,
    pub edges: Vec<[String; 2]>,
    pub totals: TotalsView,
}

pub fn build_graph_view(graph: &HeapGraph) -> GraphView {
    let mut nodes = BTreeMap::new();
    let mut edges = Vec::new();
    let mut total_alloc = 0u64;

    for node in graph.nodes().values() {
        let view = node_view(node);
        total_alloc = total_alloc.saturating_add(view.alloc);
        for child in &view.children {
            edges.push([view.id.clone(), child.clone()]);
        }
        nodes.insert(view.id.clone(), view);
    }

    GraphView {
        totals: TotalsView {
            nodes: nodes.len(),
            edges: edges.len(),
            total_alloc,
            anomalies: graph.anomalies().len(),
        },
        nodes,
        edges,
    }
}

fn node_view(node: &GraphNode) -> NodeView {
    let child_count = node.children.len();
    let alloc = node.record.alloc;
    let value = node.display_value().map(truncate);
    let shade = Shade::for_node(alloc, child_count);

    let mut label = format!(
        "{}\n{}\n{} children, alloc {}",
        node.record.kind, node.record.address, child_count, alloc
    );
    if let Some(v) = &value {
        label.push('\n');
        label.push_str(v);
    }

    NodeView {
        id: node.id.key(),
        name: node.id.to_string(),
        kind: node.record.kind.clone(),
        address: node.record.address.to_string(),
        alloc,
        child_count,
        value,
        synthetic: node.id.is_synthetic(),
        label,
        color: shade.graphviz(),
        css_color: shade.css(),
        shade,
        children: node.children.iter().map(|c| c.key()).collect(),
        record: node.record.clone(),
    }
}

fn truncate(s: &str) -> String {
    if s.chars().count() <= MAX_VALUE_CHARS {
        return s.to_string();
    }
    let mut out: String = s.chars().take(MAX_VALUE_CHARS).collect();
    out.push_str("...");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dump::parse_dump;
    use crate::graph::{RelationSet, build_graph};
    use pretty_assertions::assert_eq;

    #[test]
    fn small_leaf_is_light_blue() {
        let shade = Shade::for_node(0, 0);
        assert_eq!(shade.hue, 0.529);
        assert_eq!(shade.value, 1.0);
        assert_eq!(shade.graphviz(), "0.529 0.500 1.000");
    }

    #[test]
    fn shade_saturates() {
        let big = Shade::for_node(u64::MAX, 10_000);
        assert_eq!(big.hue, 0.0);
        assert_eq!(big.value, 0.5);

        let mid = Shade::for_node(1023, 25);
        assert!((mid.hue - 0.029).abs() < 1e-9);
        assert!((mid.value - 0.5).abs() < 1e-9);
    }

    #[test]
    fn css_color_of_white_hsv() {
        let shade = Shade {
            hue: 0.0,
            saturation: 0.0,
            value: 1.0,
        };
        assert_eq!(shade.css(), "hsl(0.0, 0.0%, 100.0%)");
    }

    #[test]
    fn view_lists_nodes_edges_and_labels() {
        let dump = parse_dump(
            r#"[{"ptr":"0x1","type":"dict","alloc":40,"children":[{"key":"0x2","value":{"ptr":"(nil)","type":"int"}}]},
                {"ptr":"0x2","type":"str","alloc":8,"shortval":"'k'"}]"#,
        )
        .unwrap();
        let graph = build_graph(&dump, &RelationSet::default());
        let view = build_graph_view(&graph);

        assert_eq!(view.totals.nodes, 3);
        assert_eq!(view.totals.edges, 2);
        assert_eq!(view.totals.total_alloc, 48);
        assert_eq!(
            view.edges,
            vec![
                ["c:0x1".to_string(), "c:0x2".to_string()],
                ["c:0x1".to_string(), "s:int#0".to_string()],
            ]
        );
        assert_eq!(view.nodes["c:0x1"].label, "dict\n0x1\n2 children, alloc 40");
        assert_eq!(view.nodes["c:0x1"].name, "0x1");
        assert_eq!(view.nodes["s:int#0"].value.as_deref(), Some("'k'"));
        assert!(view.nodes["s:int#0"].synthetic);
        assert_eq!(view.nodes["s:int#0"].name, "int#0");
        assert_eq!(view.nodes["s:int#0"].address, "(nil)");
    }

    #[test]
    fn address_spelled_like_synthetic_id_keeps_own_node() {
        let dump = parse_dump(
            r#"[{"ptr":"0x1","type":"list","items":[{"ptr":"(nil)","type":"int"}]},
                {"ptr":"int#0","type":"str","alloc":3}]"#,
        )
        .unwrap();
        let graph = build_graph(&dump, &RelationSet::default());
        let view = build_graph_view(&graph);

        assert_eq!(graph.len(), 3);
        assert_eq!(view.nodes.len(), 3);
        assert_eq!(view.totals.nodes, 3);
        assert_eq!(view.nodes["c:int#0"].kind, "str");
        assert_eq!(view.nodes["s:int#0"].kind, "int");
        assert_eq!(
            view.edges,
            vec![["c:0x1".to_string(), "s:int#0".to_string()]]
        );
    }

    #[test]
    fn total_allocation_saturates() {
        let dump = parse_dump(
            r#"[{"ptr":"0x1","type":"bytes","alloc":18446744073709551615},
                {"ptr":"0x2","type":"bytes","alloc":1}]"#,
        )
        .unwrap();
        let view = build_graph_view(&build_graph(&dump, &RelationSet::default()));
        assert_eq!(view.totals.total_alloc, u64::MAX);
    }

    #[test]
    fn long_values_are_truncated() {
        let long = "v".repeat(100);
        assert_eq!(truncate(&long).chars().count(), MAX_VALUE_CHARS + 3);
        assert_eq!(truncate("short"), "short");
    }
}
