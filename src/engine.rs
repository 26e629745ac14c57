//! The engine facade: model setup, forecasting, and result queries.

use crate::cashflow;
use crate::compile::NodeBuilder;
use crate::computation::{ComputationEngine, Ledger};
use crate::display;
use crate::error::EngineError;
use crate::graph::{NodeId, NodeStore};
use crate::model::{
    Account, AccountId, AccountTable, InputValue, Period, PeriodId, PeriodTable, Rule, RuleSet,
    ValueStore, ASSETS_TOTAL, EQUITY_AND_LIABILITIES_TOTAL,
};
use indexmap::IndexMap;

/// Values produced by one `compute()`: account → value for the new period.
pub type PeriodResults = IndexMap<AccountId, f64>;
/// The full result map, keyed by the newly created period.
pub type ComputeResults = IndexMap<PeriodId, PeriodResults>;

/// A financial account model and its evaluation state.
///
/// Load accounts, periods, rules, and seed values, then call [`compute`]
/// once per forecast period. Each call appends one period, synthesizes the
/// cash-flow rules, builds a fresh computation graph, evaluates it, and
/// stores the rounded results. Not safe for concurrent use.
///
/// [`compute`]: Engine::compute
#[derive(Debug, Default)]
pub struct Engine {
    accounts: AccountTable,
    periods: PeriodTable,
    rules: RuleSet,
    values: ValueStore,
    last_compute: Option<LastCompute>,
}

/// Build artifacts retained for audit tracing until the next compute.
#[derive(Debug)]
struct LastCompute {
    store: NodeStore,
    ledger: Ledger,
    roots: IndexMap<AccountId, NodeId>,
}

impl Engine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the account table.
    pub fn set_accounts(&mut self, accounts: Vec<Account>) {
        self.accounts.set(accounts);
    }

    /// Replaces the period table; order defines model time.
    pub fn set_periods(&mut self, periods: Vec<Period>) {
        self.periods.set(periods);
    }

    /// Replaces the rule set; iteration order is insertion order.
    pub fn set_rules(&mut self, rules: IndexMap<AccountId, Rule>) {
        self.rules.set(rules);
    }

    /// Seeds values. Every row is validated before any row is applied, so a
    /// bad row leaves the store untouched.
    pub fn load_input_data(&mut self, rows: Vec<InputValue>) -> Result<(), EngineError> {
        for row in &rows {
            if !self.accounts.contains(&row.account) {
                return Err(EngineError::UnknownAccount(row.account.clone()));
            }
            if !self.periods.contains(&row.period) {
                return Err(EngineError::UnknownPeriod(row.period.clone()));
            }
        }
        for row in rows {
            self.values.set(row.period, row.account, row.value);
        }
        Ok(())
    }

    /// Forecasts the next period for every ruled account.
    ///
    /// Appends the derived period, runs cash-flow synthesis, lowers one root
    /// per rule into a fresh node arena, evaluates the whole batch in one
    /// topological pass, and stores the rounded values. Returns a map with a
    /// single entry: the new period.
    pub fn compute(&mut self) -> Result<ComputeResults, EngineError> {
        if self.periods.is_empty() {
            return Err(EngineError::NotConfigured("no periods loaded".into()));
        }
        if self.rules.is_empty() {
            return Err(EngineError::NotConfigured("no rules loaded".into()));
        }

        let next = self.periods.derive_next()?;
        let new_period = next.id.clone();
        log::debug!("forecasting period '{new_period}'");
        self.periods.push(next);

        cashflow::synthesize(&mut self.accounts, &mut self.rules)?;

        let mut store = NodeStore::new();
        let mut roots: IndexMap<AccountId, NodeId> = IndexMap::new();
        {
            let mut builder =
                NodeBuilder::new(&self.periods, &self.rules, &self.values, &mut store);
            let targets: Vec<AccountId> = self.rules.keys().cloned().collect();
            for account in targets {
                let root = builder.build_for_account(&new_period, &account)?;
                roots.insert(account, root);
            }
        }

        let mut ledger = Ledger::new();
        let root_ids: Vec<NodeId> = roots.values().copied().collect();
        ComputationEngine::new(&store).compute(&root_ids, &mut ledger)?;

        let mut period_results = PeriodResults::new();
        for (account, root) in &roots {
            let raw = ledger
                .get(*root)
                .expect("every evaluation target has a value");
            let rounded = round_for_account(account, raw);
            self.values.set(new_period.clone(), account.clone(), rounded);
            period_results.insert(account.clone(), rounded);
        }
        log::debug!("computed {} accounts for '{new_period}'", period_results.len());

        self.last_compute = Some(LastCompute { store, ledger, roots });

        let mut results = ComputeResults::new();
        results.insert(new_period, period_results);
        Ok(results)
    }

    /// The stored value of a cell, seeded or computed.
    pub fn value(&self, period: &PeriodId, account: &AccountId) -> Option<f64> {
        self.values.get(period, account)
    }

    pub fn all_accounts(&self) -> &[Account] {
        self.accounts.as_slice()
    }

    pub fn all_periods(&self) -> &[Period] {
        self.periods.as_slice()
    }

    /// Audit trace of `account`'s subtree from the most recent compute.
    pub fn audit_trace(&self, account: &AccountId) -> Option<String> {
        let last = self.last_compute.as_ref()?;
        let root = last.roots.get(account)?;
        Some(display::format_trace(&last.store, &last.ledger, *root))
    }
}

/// Totals accounts round to whole units, everything else to cents; both
/// round halves away from zero.
fn round_for_account(account: &AccountId, value: f64) -> f64 {
    match account.as_str() {
        ASSETS_TOTAL | EQUITY_AND_LIABILITIES_TOTAL => value.round(),
        _ => round2(value),
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
