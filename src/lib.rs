//! fincast: a deterministic financial account model evaluation engine.
//!
//! A model is a set of accounts, an ordered table of periods, seed values
//! keyed by (period, account), and per-account rules. Each [`Engine::compute`]
//! call appends one forecast period, synthesizes the indirect-method
//! cash-flow accounts and rules from the base model, lowers every ruled
//! account into a per-compute node arena, evaluates the reachable subgraph
//! in topological order, and stores the rounded results.
//!
//! The crate is a library with no I/O on the evaluation path; identical
//! inputs produce identical outputs.

pub mod cashflow;
pub mod compile;
pub mod computation;
pub mod display;
pub mod engine;
pub mod error;
pub mod graph;
pub mod model;

pub use engine::{ComputeResults, Engine, PeriodResults};
pub use error::EngineError;
pub use model::{
    Account, AccountId, Flow, FlowSign, Formula, InputValue, Operation, Period, PeriodId,
    PeriodType, Rule, SheetType,
};
