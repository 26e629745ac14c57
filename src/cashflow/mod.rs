//! Cash-flow rule synthesis.
//!
//! The derived account ids are a stable convention: downstream tools parse
//! them to group the cash-flow statement.

pub mod synthesizer;

pub use synthesizer::synthesize;

/// Cash-flow mirror of the account flagged `is_cf_base_profit`.
pub const BASE_PROFIT_CF: &str = "baseProfit_cf";
/// Aggregator summing base profit, add-backs, working capital, investment.
pub const CASH_CHANGE_CF: &str = "cash_change_cf";
/// Suffix of add-back/outflow accounts derived from balance-change flows.
pub const CF_ADJUSTMENT_SUFFIX: &str = "_cf_adj";
/// Suffix of working-capital delta accounts derived from BS accounts.
pub const WORKING_CAPITAL_SUFFIX: &str = "_cf_wc";
/// Fallback id for the cash account when none is flagged.
pub const DEFAULT_CASH_ACCOUNT: &str = "cash";
