//! Implements the recursive logic for generating a human-readable audit trace.

use crate::computation::Ledger;
use crate::graph::{Node, NodeId, NodeStore};
use std::collections::HashMap;
use std::fmt::Write;

/// Formats the subtree under `target` with the value every node evaluated
/// to. Nodes reached a second time render as references to the level where
/// they first appeared.
pub fn format_trace(store: &NodeStore, ledger: &Ledger, target: NodeId) -> String {
    let mut tracer = Tracer::new(store, ledger);

    match store.get(target) {
        Some(node) => {
            let _ = writeln!(tracer.output, "AUDIT TRACE for node '{}':", node.label());
            let _ = writeln!(tracer.output, "--------------------------------------------------");
            tracer.trace_node(target, 1, "");
        }
        None => {
            let _ = writeln!(tracer.output, "Error: Invalid Node ID {:?}", target);
        }
    }
    tracer.output
}

struct Tracer<'a> {
    store: &'a NodeStore,
    ledger: &'a Ledger,
    visited_at_level: HashMap<NodeId, usize>,
    output: String,
}

impl<'a> Tracer<'a> {
    fn new(store: &'a NodeStore, ledger: &'a Ledger) -> Self {
        Self { store, ledger, visited_at_level: HashMap::new(), output: String::new() }
    }

    fn trace_node(&mut self, id: NodeId, level: usize, prefix: &str) {
        if let Some(&first_seen) = self.visited_at_level.get(&id) {
            let _ = writeln!(self.output, "{}-> (Ref to L{})", prefix, first_seen);
            return;
        }
        self.visited_at_level.insert(id, level);

        let node = self.store.get(id).expect("node from this store");
        let line_header = format!("[L{}] {}", level, node.label());
        let value_str = self.format_node_value(id);

        match node {
            Node::Leaf { value, .. } => {
                let _ = writeln!(
                    self.output,
                    "{}{} {} -> Value({:.3})",
                    prefix, line_header, value_str, value
                );
            }
            Node::Op { op, left, right, .. } => {
                let formula_str = format!(
                    "{} {} {}",
                    self.format_operand_summary(*left),
                    op.symbol(),
                    self.format_operand_summary(*right)
                );
                let _ = writeln!(
                    self.output,
                    "{}{} {} = {}",
                    prefix, line_header, value_str, formula_str
                );
                self.trace_children(prefix, &[*left, *right], level);
            }
        }
    }

    fn trace_children(&mut self, current_prefix: &str, children: &[NodeId], level: usize) {
        let stem = build_child_prefix_stem(current_prefix);
        for (i, &child) in children.iter().enumerate() {
            let connector = if i == children.len() - 1 { "`--" } else { "|--" };
            let full_prefix = format!("{}{}", stem, connector);
            self.trace_node(child, level + 1, &full_prefix);
        }
    }

    fn format_operand_summary(&self, id: NodeId) -> String {
        let label = self.store.get(id).map(Node::label).unwrap_or("?");
        format!("{}{}", label, self.format_node_value(id))
    }

    fn format_node_value(&self, id: NodeId) -> String {
        match self.ledger.get(id) {
            Some(value) => format!("[{:.3}]", value),
            None => "[?]".to_string(),
        }
    }
}

fn build_child_prefix_stem(s: &str) -> String {
    s.replace("`--", "   ").replace("|--", "|  ")
}
