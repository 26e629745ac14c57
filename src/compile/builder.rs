//! Demand-driven lowering of rules and formulas into the node arena.

use crate::error::EngineError;
use crate::graph::{NodeId, NodeStore};
use crate::model::{
    AccountId, CellKey, Flow, FlowSign, Formula, Operation, PeriodId, PeriodTable, Rule, RuleSet,
    ValueStore,
};
use std::collections::{HashMap, HashSet};

/// Compiles (period, account) demands into node subgraphs.
///
/// The builder recurses depth-first through rules and formulas, resolving
/// relative period references against the table. Each cell is lowered at
/// most once per compute: the memo table is authoritative, so any two
/// references to the same cell share one node. The visiting stack doubles
/// as the cycle report.
pub struct NodeBuilder<'a> {
    periods: &'a PeriodTable,
    rules: &'a RuleSet,
    values: &'a ValueStore,
    store: &'a mut NodeStore,
    memo: HashMap<CellKey, NodeId>,
    visiting: HashSet<CellKey>,
    visit_stack: Vec<CellKey>,
}

impl<'a> NodeBuilder<'a> {
    pub fn new(
        periods: &'a PeriodTable,
        rules: &'a RuleSet,
        values: &'a ValueStore,
        store: &'a mut NodeStore,
    ) -> Self {
        Self {
            periods,
            rules,
            values,
            store,
            memo: HashMap::new(),
            visiting: HashSet::new(),
            visit_stack: Vec::new(),
        }
    }

    /// Produces the node holding `account`'s value at `period`.
    ///
    /// A seeded value wins over any rule for the account; an account with
    /// neither fails with `MissingRule`.
    pub fn build_for_account(
        &mut self,
        period: &PeriodId,
        account: &AccountId,
    ) -> Result<NodeId, EngineError> {
        let key = CellKey { period: period.clone(), account: account.clone() };

        if let Some(&id) = self.memo.get(&key) {
            return Ok(id);
        }
        if self.visiting.contains(&key) {
            return Err(EngineError::Cycle(self.cycle_path(&key)));
        }

        self.visiting.insert(key.clone());
        self.visit_stack.push(key.clone());
        let built = self.build_cell(period, account, &key);
        self.visit_stack.pop();
        self.visiting.remove(&key);

        let id = built?;
        self.memo.insert(key, id);
        Ok(id)
    }

    fn build_cell(
        &mut self,
        period: &PeriodId,
        account: &AccountId,
        key: &CellKey,
    ) -> Result<NodeId, EngineError> {
        if let Some(value) = self.values.get(period, account) {
            return Ok(self.store.add_leaf(value, key.to_string()));
        }

        let rule = self
            .rules
            .get(account)
            .cloned()
            .ok_or_else(|| EngineError::MissingRule(account.clone()))?;

        match rule {
            Rule::Input(value) => Ok(self.store.add_leaf(value, key.to_string())),
            Rule::Calculation(formula) => self.build_formula(&formula, period, account),
            Rule::Reference(target) => self.build_for_account(period, &target),
            Rule::FixedValue => {
                let prev = self.periods.resolve(period, -1)?;
                self.build_for_account(&prev, account)
            }
            Rule::GrowthRate(rate) => {
                let formula = Formula::mul(
                    Formula::account_at(account.clone(), -1),
                    Formula::num(1.0 + rate),
                );
                self.build_formula(&formula, period, account)
            }
            Rule::Percentage { rate, of } => {
                let formula = Formula::mul(Formula::account(of), Formula::num(rate));
                self.build_formula(&formula, period, account)
            }
            Rule::Proportionate(target) => {
                let formula = Formula::mul(
                    Formula::account_at(account.clone(), -1),
                    Formula::div(
                        Formula::account(target.clone()),
                        Formula::account_at(target, -1),
                    ),
                );
                self.build_formula(&formula, period, account)
            }
            Rule::BalanceChange(flows) => {
                let formula = Formula::add(
                    Formula::account_at(account.clone(), -1),
                    signed_flow_sum(&flows),
                );
                self.build_formula(&formula, period, account)
            }
        }
    }

    /// Lowers a formula rooted at `(period, account)` into nodes.
    fn build_formula(
        &mut self,
        formula: &Formula,
        period: &PeriodId,
        account: &AccountId,
    ) -> Result<NodeId, EngineError> {
        match formula {
            Formula::Number(value) => {
                Ok(self.store.add_leaf(*value, format!("{account}@{period}")))
            }
            Formula::AccountRef { account: target, offset } => {
                let resolved = self.periods.resolve(period, *offset)?;
                self.build_for_account(&resolved, target)
            }
            Formula::BinaryOp { op, left, right } => {
                let left = self.build_formula(left, period, account)?;
                let right = self.build_formula(right, period, account)?;
                let label = format!("{account}@{period}:{}", op.symbol());
                Ok(self.store.add_op(left, right, *op, label))
            }
        }
    }

    /// Path from the first visit of `key` back to the re-entry.
    fn cycle_path(&self, key: &CellKey) -> Vec<CellKey> {
        let start = self
            .visit_stack
            .iter()
            .position(|k| k == key)
            .unwrap_or(0);
        let mut path: Vec<CellKey> = self.visit_stack[start..].to_vec();
        path.push(key.clone());
        path
    }
}

/// Left-associative sum of the flows, MINUS flows negated; `Number(0)` when
/// there are none.
fn signed_flow_sum(flows: &[Flow]) -> Formula {
    let mut terms = flows.iter().map(|flow| match flow.sign {
        FlowSign::Plus => Formula::account(flow.account.clone()),
        FlowSign::Minus => Formula::mul(Formula::account(flow.account.clone()), Formula::num(-1.0)),
    });

    match terms.next() {
        None => Formula::num(0.0),
        Some(first) => terms.fold(first, |acc, term| {
            Formula::binary(Operation::Add, acc, term)
        }),
    }
}
