//! Implements the `NodeStore`, the per-compute arena of computation nodes.

use super::edge::Edge;
use super::node::Node;
use crate::model::Operation;
use petgraph::graph::DiGraph;
use petgraph::Direction;

/// Dense ascending node identifier, private to one store generation.
pub type NodeId = petgraph::graph::NodeIndex;

/// Arena of computation nodes for a single compute cycle.
///
/// The store owns every node built for one `compute()` invocation and is
/// replaced, not reused, by the next one. Edges run from an operand to the
/// operation consuming it, which is what the evaluator walks when it relaxes
/// in-degrees. Equal subtrees are not deduplicated here; the builder's memo
/// on (period, account) already guarantees one node per cell.
#[derive(Debug, Clone, Default)]
pub struct NodeStore {
    graph: DiGraph<Node, Edge>,
}

impl NodeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_leaf(&mut self, value: f64, label: impl Into<String>) -> NodeId {
        self.graph.add_node(Node::Leaf { value, label: label.into() })
    }

    /// Adds a binary operation over two nodes already in the store and
    /// records the operand edges.
    pub fn add_op(
        &mut self,
        left: NodeId,
        right: NodeId,
        op: Operation,
        label: impl Into<String>,
    ) -> NodeId {
        let id = self.graph.add_node(Node::Op { op, left, right, label: label.into() });
        self.graph.add_edge(left, id, Edge::Left);
        self.graph.add_edge(right, id, Edge::Right);
        id
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.graph.node_weight(id)
    }

    /// Operations that consume `id` as an operand. A consumer using the same
    /// node on both sides appears once per side.
    pub fn consumers_of(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.graph.neighbors_directed(id, Direction::Outgoing)
    }

    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> {
        self.graph.node_indices()
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_dense_and_ascending() {
        let mut store = NodeStore::new();
        let a = store.add_leaf(1.0, "a");
        let b = store.add_leaf(2.0, "b");
        let sum = store.add_op(a, b, Operation::Add, "a+b");

        assert_eq!(a.index(), 0);
        assert_eq!(b.index(), 1);
        assert_eq!(sum.index(), 2);
        assert_eq!(store.node_count(), 3);
    }

    #[test]
    fn op_records_operands_and_edges() {
        let mut store = NodeStore::new();
        let a = store.add_leaf(1.0, "a");
        let b = store.add_leaf(2.0, "b");
        let diff = store.add_op(a, b, Operation::Subtract, "a-b");

        match store.get(diff) {
            Some(Node::Op { op, left, right, label }) => {
                assert_eq!(*op, Operation::Subtract);
                assert_eq!((*left, *right), (a, b));
                assert_eq!(label, "a-b");
            }
            other => panic!("unexpected node: {other:?}"),
        }
        assert_eq!(store.consumers_of(a).collect::<Vec<_>>(), vec![diff]);
        assert_eq!(store.consumers_of(b).collect::<Vec<_>>(), vec![diff]);
        assert!(store.consumers_of(diff).next().is_none());
    }

    #[test]
    fn same_operand_on_both_sides_yields_two_edges() {
        let mut store = NodeStore::new();
        let x = store.add_leaf(3.0, "x");
        let doubled = store.add_op(x, x, Operation::Add, "x+x");

        assert_eq!(store.consumers_of(x).collect::<Vec<_>>(), vec![doubled, doubled]);
    }
}
