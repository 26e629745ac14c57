//! Dense storage of computed node values.

use crate::graph::NodeId;

/// Values produced by evaluation, addressed by node index.
///
/// The ledger lives alongside one `NodeStore` generation. Reusing it across
/// evaluator passes within the same compute lets later targets skip subtrees
/// an earlier target already evaluated.
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    values: Vec<Option<f64>>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ensure_capacity(&mut self, size: usize) {
        if self.values.len() < size {
            self.values.resize(size, None);
        }
    }

    #[inline(always)]
    pub fn get(&self, id: NodeId) -> Option<f64> {
        self.values.get(id.index()).copied().flatten()
    }

    #[inline(always)]
    pub fn set(&mut self, id: NodeId, value: f64) {
        let idx = id.index();
        if idx >= self.values.len() {
            self.values.resize(idx + 1, None);
        }
        self.values[idx] = Some(value);
    }

    #[inline(always)]
    pub fn is_computed(&self, id: NodeId) -> bool {
        matches!(self.values.get(id.index()), Some(Some(_)))
    }
}
