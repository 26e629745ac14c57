//! The per-compute computation graph.
//!
//! Nodes are value leaves or binary operations, owned by an arena that lives
//! for exactly one `compute()` call. Graph identity is the dense `NodeId`;
//! formulas and rules never appear here, only what the builder lowered them
//! to.

pub mod dag;
pub mod edge;
pub mod node;

pub use dag::{NodeId, NodeStore};
pub use edge::Edge;
pub use node::Node;
