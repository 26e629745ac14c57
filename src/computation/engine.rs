//! A synchronous, single-threaded evaluator over the node arena.

use super::ledger::Ledger;
use crate::error::EngineError;
use crate::graph::{Node, NodeId, NodeStore};
use crate::model::Operation;
use std::collections::{HashSet, VecDeque};

/// Evaluates the minimal subgraph reachable from a set of target nodes.
///
/// The reachable set is gathered depth-first (stopping at nodes the ledger
/// has already computed), ordered with Kahn's algorithm, and reduced in
/// order. Ties in the ready queue are broken by ascending node id, so two
/// runs over the same store produce the same order and the same results.
pub struct ComputationEngine<'a> {
    store: &'a NodeStore,
}

impl<'a> ComputationEngine<'a> {
    pub fn new(store: &'a NodeStore) -> Self {
        Self { store }
    }

    pub fn compute(&self, targets: &[NodeId], ledger: &mut Ledger) -> Result<(), EngineError> {
        ledger.ensure_capacity(self.store.node_count());

        let reachable = self.reachable_from(targets, ledger);
        if reachable.is_empty() {
            return Ok(());
        }

        let order = self.kahn_order(&reachable)?;
        self.evaluate(&order, ledger)
    }

    /// Every uncomputed node some target depends on, targets included.
    fn reachable_from(&self, targets: &[NodeId], ledger: &Ledger) -> HashSet<NodeId> {
        let mut reachable = HashSet::new();
        let mut stack: Vec<NodeId> = targets.to_vec();

        while let Some(id) = stack.pop() {
            if ledger.is_computed(id) || !reachable.insert(id) {
                continue;
            }
            if let Some(Node::Op { left, right, .. }) = self.store.get(id) {
                stack.push(*left);
                stack.push(*right);
            }
        }
        reachable
    }

    fn kahn_order(&self, reachable: &HashSet<NodeId>) -> Result<Vec<NodeId>, EngineError> {
        let mut indegree = vec![0usize; self.store.node_count()];
        for &id in reachable {
            if let Some(Node::Op { left, right, .. }) = self.store.get(id) {
                indegree[id.index()] += reachable.contains(left) as usize;
                indegree[id.index()] += reachable.contains(right) as usize;
            }
        }

        let mut ready: Vec<NodeId> = reachable
            .iter()
            .copied()
            .filter(|id| indegree[id.index()] == 0)
            .collect();
        ready.sort_unstable();
        let mut queue: VecDeque<NodeId> = ready.into();

        let mut order = Vec::with_capacity(reachable.len());
        while let Some(id) = queue.pop_front() {
            order.push(id);
            // A consumer reading the same node on both sides shows up once
            // per operand edge, decrementing once per side.
            for consumer in self.store.consumers_of(id) {
                if !reachable.contains(&consumer) {
                    continue;
                }
                indegree[consumer.index()] -= 1;
                if indegree[consumer.index()] == 0 {
                    queue.push_back(consumer);
                }
            }
        }

        if order.len() != reachable.len() {
            // The builder already rejects cyclic models; this guards the
            // store against malformed construction.
            return Err(EngineError::Cycle(Vec::new()));
        }
        Ok(order)
    }

    fn evaluate(&self, order: &[NodeId], ledger: &mut Ledger) -> Result<(), EngineError> {
        for &id in order {
            let node = self.store.get(id).unwrap();
            match node {
                Node::Leaf { value, .. } => ledger.set(id, *value),
                Node::Op { op, left, right, label } => {
                    let l = ledger
                        .get(*left)
                        .expect("BUG: operand must be computed before its consumer");
                    let r = ledger
                        .get(*right)
                        .expect("BUG: operand must be computed before its consumer");
                    let value = match op {
                        Operation::Add => l + r,
                        Operation::Subtract => l - r,
                        Operation::Multiply => l * r,
                        Operation::Divide => {
                            if r == 0.0 {
                                return Err(EngineError::DivisionByZero {
                                    node: id.index(),
                                    label: label.clone(),
                                });
                            }
                            l / r
                        }
                    };
                    ledger.set(id, value);
                }
            }
        }
        Ok(())
    }
}
