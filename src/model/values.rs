//! Storage of per-cell values, seeded and computed alike.

use crate::model::{AccountId, PeriodId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// A (period, account) cell. Renders as `"{account}@{period}"` in labels,
/// cycle paths, and error messages.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellKey {
    pub period: PeriodId,
    pub account: AccountId,
}

impl CellKey {
    pub fn new(period: impl Into<PeriodId>, account: impl Into<AccountId>) -> Self {
        Self { period: period.into(), account: account.into() }
    }
}

impl fmt::Display for CellKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.account, self.period)
    }
}

/// One seeded value row, as loaded from caller-provided data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputValue {
    pub account: AccountId,
    pub period: PeriodId,
    pub value: f64,
    #[serde(default = "default_true")]
    pub is_input: bool,
}

fn default_true() -> bool {
    true
}

/// Map (period, account) → f64. Seeded inputs and computed results are
/// indistinguishable at read time.
#[derive(Debug, Clone, Default)]
pub struct ValueStore {
    values: HashMap<CellKey, f64>,
}

impl ValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, period: PeriodId, account: AccountId, value: f64) {
        self.values.insert(CellKey { period, account }, value);
    }

    pub fn get(&self, period: &PeriodId, account: &AccountId) -> Option<f64> {
        self.values
            .get(&CellKey { period: period.clone(), account: account.clone() })
            .copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
