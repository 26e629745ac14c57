//! The model data layer: accounts, periods, rules, formulas, and values.
//!
//! Everything here is plain data. The computation layers (`compile`,
//! `computation`) consume these types; the cash-flow synthesizer rewrites
//! them in place before each compute.

pub mod account;
pub mod period;
pub mod rule;
pub mod values;

pub use account::{Account, AccountId, AccountTable, SheetType, ASSETS_TOTAL, EQUITY_AND_LIABILITIES_TOTAL};
pub use period::{Period, PeriodId, PeriodTable, PeriodType};
pub use rule::{Flow, FlowSign, Formula, Operation, Rule, RuleSet};
pub use values::{CellKey, InputValue, ValueStore};
