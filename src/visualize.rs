//! Graphviz DOT export of a dialogue graph.
//!
//! Bot lines are blue boxes, input slots yellow parallelograms and choices green ovals.

use std::collections::HashSet;

use crate::node::{DialogueNode, Graph, NodeId, NodeKind};

fn style(kind: NodeKind) -> (&'static str, &'static str) {
    match kind {
        NodeKind::Output | NodeKind::Root => ("box", "lightblue"),
        NodeKind::Input => ("parallelogram", "lightyellow"),
        NodeKind::Choice => ("oval", "lightgreen"),
    }
}

fn escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n")
}

fn add_node(graph: &Graph, node: &DialogueNode, visited: &mut HashSet<NodeId>, dot: &mut String) {
    if !visited.insert(node.id) {
        return;
    }

    let (shape, fillcolor) = style(node.kind);
    dot.push_str(&format!(
        "  \"{}\" [label=\"{}\", shape={}, style=filled, fillcolor={}];\n",
        escape(&node.name),
        escape(&node.content),
        shape,
        fillcolor
    ));

    for child in graph.children(node) {
        dot.push_str(&format!("  \"{}\" -> \"{}\";\n", escape(&node.name), escape(&child.name)));
        add_node(graph, child, visited, dot);
    }
}

/// Renders the graph reachable from the start node in DOT format.
///
/// Every node is declared once, even in cyclic graphs. Without a start node, every node
/// is walked in insertion order.
pub fn to_dot(graph: &Graph) -> String {
    let mut dot = String::from("digraph \"Chat Flow\" {\n");
    let mut visited = HashSet::new();

    match graph.start() {
        Some(start) => add_node(graph, start, &mut visited, &mut dot),
        None => {
            for node in graph.iter() {
                add_node(graph, node, &mut visited, &mut dot);
            }
        }
    }

    dot.push_str("}\n");
    dot
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(dot: &str) -> Vec<&str> {
        dot.lines().map(str::trim).collect()
    }

    #[test]
    fn test_shapes_per_kind() {
        let mut graph = Graph::new();
        let start = graph.add_node("start", NodeKind::Output, "Sag \"Hallo\"").unwrap();
        let choice = graph.add_node("cleanbug", NodeKind::Choice, "cleanbug;roboter").unwrap();
        let email = graph.add_node("email", NodeKind::Input, "").unwrap();
        graph.add_child(start, choice);
        graph.add_child(choice, email);
        graph.set_start(start);

        let dot = to_dot(&graph);
        let lines = lines(&dot);

        assert_eq!(lines.first(), Some(&"digraph \"Chat Flow\" {"));
        assert!(lines.contains(
            &"\"start\" [label=\"Sag \\\"Hallo\\\"\", shape=box, style=filled, fillcolor=lightblue];"
        ));
        assert!(lines.contains(
            &"\"cleanbug\" [label=\"cleanbug;roboter\", shape=oval, style=filled, fillcolor=lightgreen];"
        ));
        assert!(lines.contains(
            &"\"email\" [label=\"\", shape=parallelogram, style=filled, fillcolor=lightyellow];"
        ));
    }

    #[test]
    fn test_edges_in_child_order() {
        let mut graph = Graph::new();
        let start = graph.add_node("start", NodeKind::Output, "Hi").unwrap();
        let a = graph.add_node("a", NodeKind::Choice, "a").unwrap();
        let b = graph.add_node("b", NodeKind::Choice, "b").unwrap();
        graph.add_node("unreachable", NodeKind::Output, "-").unwrap();
        graph.add_child(start, a);
        graph.add_child(start, b);
        // Loops back; must not be declared twice.
        graph.add_child(b, start);
        graph.set_start(start);

        let dot = to_dot(&graph);
        let edges: Vec<_> = lines(&dot).into_iter().filter(|line| line.contains("->")).collect();
        assert_eq!(edges, vec!["\"start\" -> \"a\";", "\"start\" -> \"b\";", "\"b\" -> \"start\";"]);

        assert_eq!(dot.matches("\"start\" [").count(), 1);
        assert!(!dot.contains("unreachable"));
    }

    #[test]
    fn test_without_start_walks_everything() {
        let mut graph = Graph::new();
        graph.add_node("a", NodeKind::Output, "A").unwrap();
        graph.add_node("b", NodeKind::Input, "").unwrap();

        let dot = to_dot(&graph);
        assert!(dot.contains("\"a\" [") && dot.contains("\"b\" ["));
    }
}
