//! Formulas and the per-account rules that expand into them.

use crate::model::AccountId;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Binary arithmetic over `f64`, shared by formulas and computation nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operation {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl Operation {
    pub fn symbol(&self) -> &'static str {
        match self {
            Operation::Add => "+",
            Operation::Subtract => "-",
            Operation::Multiply => "*",
            Operation::Divide => "/",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// The expression tree inside a `Calculation` rule, and the intermediate
/// form every other rule variant desugars to.
///
/// `AccountRef` offsets are table positions: `0` is the current period,
/// `-1` the previous one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Formula {
    Number(f64),
    AccountRef {
        account: AccountId,
        #[serde(default)]
        offset: i32,
    },
    BinaryOp {
        op: Operation,
        left: Box<Formula>,
        right: Box<Formula>,
    },
}

impl Formula {
    pub fn num(value: f64) -> Self {
        Formula::Number(value)
    }

    /// Reference to `account` in the current period.
    pub fn account(account: impl Into<AccountId>) -> Self {
        Formula::AccountRef { account: account.into(), offset: 0 }
    }

    /// Reference to `account` shifted by `offset` periods.
    pub fn account_at(account: impl Into<AccountId>, offset: i32) -> Self {
        Formula::AccountRef { account: account.into(), offset }
    }

    pub fn binary(op: Operation, left: Formula, right: Formula) -> Self {
        Formula::BinaryOp { op, left: Box::new(left), right: Box::new(right) }
    }

    pub fn add(left: Formula, right: Formula) -> Self {
        Self::binary(Operation::Add, left, right)
    }

    pub fn sub(left: Formula, right: Formula) -> Self {
        Self::binary(Operation::Subtract, left, right)
    }

    pub fn mul(left: Formula, right: Formula) -> Self {
        Self::binary(Operation::Multiply, left, right)
    }

    pub fn div(left: Formula, right: Formula) -> Self {
        Self::binary(Operation::Divide, left, right)
    }
}

/// Direction of a balance-change flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FlowSign {
    Plus,
    Minus,
}

/// One flow feeding a `BalanceChange` account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flow {
    pub account: AccountId,
    pub sign: FlowSign,
}

impl Flow {
    pub fn plus(account: impl Into<AccountId>) -> Self {
        Self { account: account.into(), sign: FlowSign::Plus }
    }

    pub fn minus(account: impl Into<AccountId>) -> Self {
        Self { account: account.into(), sign: FlowSign::Minus }
    }
}

/// The recipe for computing an account at any period it has no seed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Rule {
    /// A fixed input, the same at every period.
    Input(f64),
    /// An explicit formula.
    Calculation(Formula),
    /// Previous value scaled by `1 + rate`.
    GrowthRate(f64),
    /// A share of another account in the same period.
    Percentage { rate: f64, of: AccountId },
    /// Mirrors another account in the same period.
    Reference(AccountId),
    /// Carries the previous period's value forward.
    FixedValue,
    /// Previous value scaled by another account's period-over-period ratio.
    Proportionate(AccountId),
    /// Previous value plus the signed flows of the period.
    BalanceChange(Vec<Flow>),
}

/// Rules keyed by account, iterated in insertion order.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: IndexMap<AccountId, Rule>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole rule set.
    pub fn set(&mut self, rules: IndexMap<AccountId, Rule>) {
        self.rules = rules;
    }

    /// Inserts or overwrites the rule for `account`.
    pub fn insert(&mut self, account: impl Into<AccountId>, rule: Rule) {
        self.rules.insert(account.into(), rule);
    }

    pub fn get(&self, account: &AccountId) -> Option<&Rule> {
        self.rules.get(account)
    }

    pub fn contains(&self, account: &AccountId) -> bool {
        self.rules.contains_key(account)
    }

    pub fn keys(&self) -> impl Iterator<Item = &AccountId> {
        self.rules.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&AccountId, &Rule)> {
        self.rules.iter()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rule_set_preserves_insertion_order() {
        let mut rules = RuleSet::new();
        rules.insert("revenue", Rule::GrowthRate(0.1));
        rules.insert("cogs", Rule::Percentage { rate: 0.6, of: "revenue".into() });
        rules.insert("cash", Rule::FixedValue);
        rules.insert("revenue", Rule::GrowthRate(0.2)); // overwrite keeps position

        let keys: Vec<_> = rules.keys().map(AccountId::as_str).collect();
        assert_eq!(keys, ["revenue", "cogs", "cash"]);
        assert_eq!(rules.get(&"revenue".into()), Some(&Rule::GrowthRate(0.2)));
    }

    #[test]
    fn flow_sign_serializes_uppercase() {
        let flow = Flow::minus("depreciation");
        let json = serde_json::to_string(&flow).unwrap();
        assert!(json.contains(r#""MINUS""#));
    }

    #[test]
    fn formula_helpers_nest_left_to_right() {
        let f = Formula::sub(Formula::account("revenue"), Formula::account("cogs"));
        match f {
            Formula::BinaryOp { op: Operation::Subtract, left, right } => {
                assert_eq!(*left, Formula::account("revenue"));
                assert_eq!(*right, Formula::account("cogs"));
            }
            other => panic!("unexpected shape: {other:?}"),
        }
    }
}
