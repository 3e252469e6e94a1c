// src/graph/dot.rs

use std::fmt::Write;

use crate::graph::model::Graph;
use crate::graph::traverse::successor_map;

/// Render a graph in graphviz's DOT language, one edge per dependency.
pub fn to_dot(graph: &Graph) -> String {
    to_dot_with_color(graph, "lightblue")
}

pub fn to_dot_with_color(graph: &Graph, fill_color: &str) -> String {
    let successors = successor_map(graph);

    let mut nodes = String::new();
    for id in successors.keys() {
        let _ = writeln!(nodes, "        \"{id}\" [fillcolor={fill_color}]");
    }

    let mut edges = String::new();
    for (id, consumers) in &successors {
        if consumers.is_empty() {
            continue;
        }
        let targets = consumers
            .iter()
            .map(|consumer| format!("\"{consumer}\""))
            .collect::<Vec<_>>()
            .join(", ");
        let _ = writeln!(edges, "    \"{id}\" -> {targets};");
    }

    format!("digraph G {{\n    {{\n        node [style=filled]\n{nodes}    }}\n{edges}}}\n")
}
