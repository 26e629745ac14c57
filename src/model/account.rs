//! Account line items and the table that holds them.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Totals accounts are rounded to whole units rather than cents.
pub const ASSETS_TOTAL: &str = "assets_total";
pub const EQUITY_AND_LIABILITIES_TOTAL: &str = "equity_and_liabilities_total";

/// Opaque account identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(String);

impl AccountId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Default for AccountId {
    fn default() -> Self {
        Self(String::new())
    }
}

impl From<&str> for AccountId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for AccountId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Which financial statement a line item belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SheetType {
    #[serde(rename = "PL")]
    ProfitAndLoss,
    #[serde(rename = "BS")]
    BalanceSheet,
    #[serde(rename = "CF")]
    CashFlow,
    #[serde(rename = "PP&E")]
    PropertyPlantEquipment,
    #[serde(rename = "OTHER")]
    Other,
}

/// A line item of the model (revenue, cash, ...).
///
/// The flags drive the cash-flow synthesis pass: `is_cf_base_profit` marks
/// the profit line that indirect-method cash flow starts from,
/// `is_cash_account` marks the account the cash linkage rule is written to,
/// and `ignored_for_cf` exempts an account from working-capital treatment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub display_name: String,
    #[serde(default)]
    pub sheet_type: Option<SheetType>,
    #[serde(default)]
    pub parent_id: Option<AccountId>,
    #[serde(default)]
    pub is_credit: bool,
    #[serde(default)]
    pub ignored_for_cf: bool,
    #[serde(default)]
    pub is_cf_base_profit: bool,
    #[serde(default)]
    pub is_cash_account: bool,
}

impl Account {
    pub fn new(id: impl Into<AccountId>, display_name: impl Into<String>) -> Self {
        Self { id: id.into(), display_name: display_name.into(), ..Default::default() }
    }
}

/// Insertion-ordered account table with an id index.
#[derive(Debug, Clone, Default)]
pub struct AccountTable {
    accounts: Vec<Account>,
    index: HashMap<AccountId, usize>,
}

impl AccountTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole table and rebuilds the index.
    pub fn set(&mut self, accounts: Vec<Account>) {
        self.accounts = accounts;
        self.reindex();
    }

    fn reindex(&mut self) {
        self.index = self
            .accounts
            .iter()
            .enumerate()
            .map(|(i, a)| (a.id.clone(), i))
            .collect();
    }

    /// Appends an account unless one with the same id already exists.
    pub fn ensure(&mut self, account: Account) {
        if !self.index.contains_key(&account.id) {
            self.index.insert(account.id.clone(), self.accounts.len());
            self.accounts.push(account);
        }
    }

    pub fn get(&self, id: &AccountId) -> Option<&Account> {
        self.index.get(id).map(|&i| &self.accounts[i])
    }

    pub fn contains(&self, id: &AccountId) -> bool {
        self.index.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Account> {
        self.accounts.iter()
    }

    pub fn as_slice(&self) -> &[Account] {
        &self.accounts
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}
