//! The single error taxonomy for the engine.
//!
//! Every failure aborts the current `compute()` call; there are no partial
//! results and nothing is retried. Variants carry the diagnostic labels of
//! the cells and nodes involved so that callers can pinpoint the offending
//! part of the model.

use crate::model::{AccountId, CellKey, PeriodId};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// An account was demanded at a period where it has neither a seeded
    /// value nor a rule.
    #[error("no rule or seeded value for account '{0}'")]
    MissingRule(AccountId),

    #[error("unknown account '{0}'")]
    UnknownAccount(AccountId),

    #[error("unknown period '{0}'")]
    UnknownPeriod(PeriodId),

    /// A relative period reference resolved outside the period table.
    #[error("period offset {offset} from '{period}' leaves the period table")]
    PeriodOutOfRange { period: PeriodId, offset: i32 },

    /// The builder re-entered a (period, account) cell that is still being
    /// built. The path runs from the first visit of the cell back to itself.
    #[error("circular dependency: {}", format_cycle(.0))]
    Cycle(Vec<CellKey>),

    /// A `Divide` node encountered a right operand of exactly `0.0`.
    #[error("division by zero at node '{label}'")]
    DivisionByZero { node: usize, label: String },

    #[error("engine not configured: {0}")]
    NotConfigured(String),

    /// Cash-flow synthesis requires exactly one account flagged as the base
    /// profit; the model declared balance-sheet structure but flagged none,
    /// or flagged several.
    #[error("expected exactly one cash-flow base profit account, found {found}")]
    MissingBaseProfit { found: usize },
}

fn format_cycle(path: &[CellKey]) -> String {
    if path.is_empty() {
        return "(path unavailable)".to_string();
    }
    path.iter()
        .map(CellKey::to_string)
        .collect::<Vec<_>>()
        .join(" -> ")
}
