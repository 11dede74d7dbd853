use crate::model::GraphView;

use std::fmt::Write;

/// Render a Graphviz digraph. Node names are the variant-tagged view ids, always quoted.
pub fn render_dot(view: &GraphView) -> anyhow::Result<String> {
    let mut out = String::new();
    writeln!(out, "digraph heap {{")?;
    writeln!(out, "  node [shape=box, style=filled, fontname=\"monospace\"];")?;

    for node in view.nodes.values() {
        writeln!(
            out,
            "  \"{}\" [label=\"{}\", fillcolor=\"{}\"];",
            escape(&node.id),
            escape(&node.label),
            node.color
        )?;
    }
    for [src, dst] in &view.edges {
        writeln!(out, "  \"{}\" -> \"{}\";", escape(src), escape(dst))?;
    }

    writeln!(out, "}}")?;
    Ok(out)
}

/// Escape for a double-quoted DOT string; newlines become `\n` line breaks.
fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => {}
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dump::parse_dump;
    use crate::graph::{RelationSet, build_graph};
    use crate::model::build_graph_view;
    use pretty_assertions::assert_eq;

    #[test]
    fn renders_nodes_and_edges() {
        let dump = parse_dump(
            r#"[{"ptr":"0x1","type":"list","items":["0x2"]},
                {"ptr":"0x2","type":"str","shortval":"\"hi\""}]"#,
        )
        .unwrap();
        let view = build_graph_view(&build_graph(&dump, &RelationSet::default()));
        let dot = render_dot(&view).unwrap();

        let expected = [
            "digraph heap {",
            "  node [shape=box, style=filled, fontname=\"monospace\"];",
            "  \"c:0x1\" [label=\"list\\n0x1\\n1 children, alloc 0\", fillcolor=\"0.529 0.500 0.980\"];",
            "  \"c:0x2\" [label=\"str\\n0x2\\n0 children, alloc 0\\n\\\"hi\\\"\", fillcolor=\"0.529 0.500 1.000\"];",
            "  \"c:0x1\" -> \"c:0x2\";",
            "}",
            "",
        ]
        .join("\n");
        assert_eq!(dot, expected);
    }

    #[test]
    fn lookalike_address_is_a_separate_dot_node() {
        let dump = parse_dump(
            r#"[{"ptr":"0x1","type":"list","items":[{"ptr":"(nil)","type":"int"}]},
                {"ptr":"int#0","type":"str","items":["0x1"]}]"#,
        )
        .unwrap();
        let view = build_graph_view(&build_graph(&dump, &RelationSet::default()));
        let dot = render_dot(&view).unwrap();

        assert!(dot.contains("  \"c:int#0\" [label="));
        assert!(dot.contains("  \"s:int#0\" [label="));
        assert!(dot.contains("  \"c:0x1\" -> \"s:int#0\";"));
        assert!(dot.contains("  \"c:int#0\" -> \"c:0x1\";"));
        assert_eq!(dot.matches(" -> ").count(), 2);
    }

    #[test]
    fn escapes_quotes_and_backslashes() {
        assert_eq!(escape(r#"a"b\c"#), r#"a\"b\\c"#);
        assert_eq!(escape("x\ny"), "x\\ny");
    }
}
