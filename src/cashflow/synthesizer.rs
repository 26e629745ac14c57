//! Derives indirect-method cash-flow accounts and rules from the base model.

use crate::cashflow::{
    BASE_PROFIT_CF, CASH_CHANGE_CF, CF_ADJUSTMENT_SUFFIX, DEFAULT_CASH_ACCOUNT,
    WORKING_CAPITAL_SUFFIX,
};
use crate::error::EngineError;
use crate::model::{
    Account, AccountId, AccountTable, Flow, FlowSign, Formula, Rule, RuleSet, SheetType,
};
use std::collections::HashSet;

/// Rewrites `accounts` and `rules` so that the indirect-method cash flow is
/// an ordinary part of the model: a mirror of the base profit, add-backs for
/// non-cash flows, outflows for investments, working-capital deltas, an
/// aggregator, and a balance-change rule on the cash account.
///
/// The pass is idempotent: derived accounts are only inserted when absent
/// and derived rules are rewritten to the same content, so re-running it on
/// an already-synthesized model changes nothing.
///
/// Models without balance-sheet structure and without a flagged base profit
/// carry no cash-flow statement; the pass is a no-op for them.
pub fn synthesize(accounts: &mut AccountTable, rules: &mut RuleSet) -> Result<(), EngineError> {
    let base_profit = match find_base_profit(accounts)? {
        Some(id) => id,
        None => {
            log::debug!("no cash-flow structure declared, skipping synthesis");
            return Ok(());
        }
    };

    // Step A: mirror the base profit onto the cash-flow sheet.
    ensure_derived(accounts, BASE_PROFIT_CF.into(), "Base profit (cash flow)");
    rules.insert(BASE_PROFIT_CF, Rule::Reference(base_profit));

    // Steps B and C: classify the flows of every balance-change account.
    // MINUS flows from a non-balance-sheet source are non-cash charges to
    // add back; PLUS flows are investment outflows.
    let owners: Vec<(f64, Vec<Flow>)> = accounts
        .iter()
        .filter_map(|a| match rules.get(&a.id) {
            Some(Rule::BalanceChange(flows)) => Some((credit_sign(a), flows.clone())),
            _ => None,
        })
        .collect();

    let mut add_backs: Vec<AccountId> = Vec::new();
    let mut outflows: Vec<AccountId> = Vec::new();
    let mut planned: HashSet<AccountId> = HashSet::new();

    for (owner_sign, flows) in &owners {
        for flow in flows {
            if !mirrors_into_cash_flow(accounts, &flow.account) {
                continue;
            }
            let derived: AccountId =
                format!("{}{}", flow.account, CF_ADJUSTMENT_SUFFIX).into();
            if !planned.insert(derived.clone()) {
                continue;
            }
            let flow_sign = match flow.sign {
                FlowSign::Minus => -1.0,
                FlowSign::Plus => 1.0,
            };
            ensure_derived(
                accounts,
                derived.clone(),
                format!("{} (cash flow adjustment)", flow.account),
            );
            rules.insert(
                derived.clone(),
                Rule::Calculation(Formula::mul(
                    Formula::account(flow.account.clone()),
                    Formula::num(owner_sign * flow_sign),
                )),
            );
            match flow.sign {
                FlowSign::Minus => add_backs.push(derived),
                FlowSign::Plus => outflows.push(derived),
            }
        }
    }

    // Step D: period-over-period deltas for the remaining balance-sheet
    // accounts. Balance-change accounts are modeled through their flows and
    // stay out of the working-capital pass.
    let wc_sources: Vec<(AccountId, f64)> = accounts
        .iter()
        .filter(|a| {
            a.sheet_type == Some(SheetType::BalanceSheet)
                && !a.is_cash_account
                && !a.ignored_for_cf
                && !matches!(rules.get(&a.id), Some(Rule::BalanceChange(_)))
        })
        .map(|a| (a.id.clone(), credit_sign(a)))
        .collect();

    let mut working_capital: Vec<AccountId> = Vec::new();
    for (source, sign) in wc_sources {
        let derived: AccountId = format!("{source}{WORKING_CAPITAL_SUFFIX}").into();
        ensure_derived(accounts, derived.clone(), format!("{source} (working capital change)"));
        let diff = Formula::sub(
            Formula::account(source.clone()),
            Formula::account_at(source, -1),
        );
        rules.insert(
            derived.clone(),
            Rule::Calculation(Formula::mul(diff, Formula::num(sign))),
        );
        working_capital.push(derived);
    }

    // Step E: aggregate base profit, add-backs, working capital, and
    // investment, in that order, as a left-associative sum.
    let mut terms = vec![AccountId::from(BASE_PROFIT_CF)];
    terms.extend(add_backs.iter().cloned());
    terms.extend(working_capital.iter().cloned());
    terms.extend(outflows.iter().cloned());
    let aggregate = terms
        .into_iter()
        .map(Formula::account)
        .reduce(Formula::add)
        .expect("the base profit mirror is always present");
    ensure_derived(accounts, CASH_CHANGE_CF.into(), "Net change in cash");
    rules.insert(CASH_CHANGE_CF, Rule::Calculation(aggregate));

    // Step F: link the cash balance to the aggregator, overwriting whatever
    // rule the cash account had.
    let cash_id: AccountId = accounts
        .iter()
        .find(|a| a.is_cash_account)
        .map(|a| a.id.clone())
        .unwrap_or_else(|| DEFAULT_CASH_ACCOUNT.into());
    accounts.ensure(Account {
        sheet_type: Some(SheetType::BalanceSheet),
        is_cash_account: true,
        ..Account::new(cash_id.clone(), "Cash")
    });
    rules.insert(
        cash_id,
        Rule::BalanceChange(vec![Flow::plus(CASH_CHANGE_CF)]),
    );

    log::debug!(
        "cash flow synthesis: {} add-backs, {} working-capital deltas, {} outflows",
        add_backs.len(),
        working_capital.len(),
        outflows.len()
    );
    Ok(())
}

/// The unique flagged base profit, `None` when the model opts out of cash
/// flow entirely, an error when the flag is ambiguous or required but
/// absent.
fn find_base_profit(accounts: &AccountTable) -> Result<Option<AccountId>, EngineError> {
    let flagged: Vec<&Account> = accounts.iter().filter(|a| a.is_cf_base_profit).collect();
    match flagged.as_slice() {
        [single] => Ok(Some(single.id.clone())),
        [] => {
            let has_balance_sheet = accounts
                .iter()
                .any(|a| a.sheet_type == Some(SheetType::BalanceSheet));
            if has_balance_sheet {
                Err(EngineError::MissingBaseProfit { found: 0 })
            } else {
                Ok(None)
            }
        }
        many => Err(EngineError::MissingBaseProfit { found: many.len() }),
    }
}

/// A flow source shows up on the cash-flow statement when it lives on an
/// operating sheet (P&L, PP&E, other) and is not the base profit itself.
fn mirrors_into_cash_flow(accounts: &AccountTable, source: &AccountId) -> bool {
    match accounts.get(source) {
        Some(account) => {
            !account.is_cf_base_profit
                && matches!(
                    account.sheet_type,
                    Some(SheetType::ProfitAndLoss)
                        | Some(SheetType::PropertyPlantEquipment)
                        | Some(SheetType::Other)
                )
        }
        None => false,
    }
}

fn credit_sign(account: &Account) -> f64 {
    if account.is_credit {
        1.0
    } else {
        -1.0
    }
}

fn ensure_derived(accounts: &mut AccountTable, id: AccountId, display_name: impl Into<String>) {
    accounts.ensure(Account {
        sheet_type: Some(SheetType::CashFlow),
        ignored_for_cf: true,
        ..Account::new(id, display_name)
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn fixture() -> (AccountTable, RuleSet) {
        let mut accounts = AccountTable::new();
        accounts.set(vec![
            Account {
                sheet_type: Some(SheetType::ProfitAndLoss),
                is_cf_base_profit: true,
                is_credit: true,
                ..Account::new("net_income", "Net income")
            },
            Account {
                sheet_type: Some(SheetType::ProfitAndLoss),
                ..Account::new("depreciation", "Depreciation")
            },
            Account {
                sheet_type: Some(SheetType::PropertyPlantEquipment),
                ..Account::new("capex", "Capital expenditure")
            },
            Account {
                sheet_type: Some(SheetType::BalanceSheet),
                ..Account::new("tangible_assets", "Tangible assets")
            },
            Account {
                sheet_type: Some(SheetType::BalanceSheet),
                ..Account::new("account_receivable", "Accounts receivable")
            },
            Account {
                sheet_type: Some(SheetType::BalanceSheet),
                is_cash_account: true,
                ..Account::new("cash", "Cash")
            },
        ]);

        let mut rules = RuleSet::new();
        rules.insert("net_income", Rule::Input(200.0));
        rules.insert("depreciation", Rule::Input(50.0));
        rules.insert("capex", Rule::Input(100.0));
        rules.insert(
            "tangible_assets",
            Rule::BalanceChange(vec![Flow::plus("capex"), Flow::minus("depreciation")]),
        );
        rules.insert("account_receivable", Rule::GrowthRate(0.1));
        rules.insert("cash", Rule::FixedValue);
        (accounts, rules)
    }

    #[test]
    fn derives_the_expected_accounts_and_rules() {
        let (mut accounts, mut rules) = fixture();
        synthesize(&mut accounts, &mut rules).unwrap();

        for id in [
            "baseProfit_cf",
            "depreciation_cf_adj",
            "capex_cf_adj",
            "account_receivable_cf_wc",
            "cash_change_cf",
        ] {
            let account = accounts.get(&id.into()).unwrap_or_else(|| panic!("{id} missing"));
            assert_eq!(account.sheet_type, Some(SheetType::CashFlow), "{id}");
            assert!(account.ignored_for_cf, "{id}");
        }

        assert_eq!(
            rules.get(&"baseProfit_cf".into()),
            Some(&Rule::Reference("net_income".into()))
        );
        // tangible_assets is a debit account: depreciation adds back,
        // capex flows out.
        assert_eq!(
            rules.get(&"depreciation_cf_adj".into()),
            Some(&Rule::Calculation(Formula::mul(
                Formula::account("depreciation"),
                Formula::num(1.0)
            )))
        );
        assert_eq!(
            rules.get(&"capex_cf_adj".into()),
            Some(&Rule::Calculation(Formula::mul(
                Formula::account("capex"),
                Formula::num(-1.0)
            )))
        );
        assert_eq!(
            rules.get(&"account_receivable_cf_wc".into()),
            Some(&Rule::Calculation(Formula::mul(
                Formula::sub(
                    Formula::account("account_receivable"),
                    Formula::account_at("account_receivable", -1)
                ),
                Formula::num(-1.0)
            )))
        );
        assert_eq!(
            rules.get(&"cash_change_cf".into()),
            Some(&Rule::Calculation(Formula::add(
                Formula::add(
                    Formula::add(
                        Formula::account("baseProfit_cf"),
                        Formula::account("depreciation_cf_adj"),
                    ),
                    Formula::account("account_receivable_cf_wc"),
                ),
                Formula::account("capex_cf_adj"),
            )))
        );
        assert_eq!(
            rules.get(&"cash".into()),
            Some(&Rule::BalanceChange(vec![Flow::plus("cash_change_cf")]))
        );
    }

    #[test]
    fn running_twice_changes_nothing() {
        let (mut accounts, mut rules) = fixture();
        synthesize(&mut accounts, &mut rules).unwrap();

        let accounts_after_first = accounts.as_slice().to_vec();
        let rules_after_first: Vec<_> =
            rules.iter().map(|(k, v)| (k.clone(), v.clone())).collect();

        synthesize(&mut accounts, &mut rules).unwrap();

        assert_eq!(accounts.as_slice(), accounts_after_first.as_slice());
        let rules_after_second: Vec<_> =
            rules.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
        assert_eq!(rules_after_second, rules_after_first);
    }

    #[test]
    fn pure_profit_and_loss_models_skip_synthesis() {
        let mut accounts = AccountTable::new();
        accounts.set(vec![Account::new("revenue", "Revenue")]);
        let mut rules = RuleSet::new();
        rules.insert("revenue", Rule::GrowthRate(0.1));

        synthesize(&mut accounts, &mut rules).unwrap();

        assert_eq!(accounts.len(), 1);
        assert_eq!(rules.len(), 1);
    }

    #[test]
    fn balance_sheet_without_base_profit_is_an_error() {
        let mut accounts = AccountTable::new();
        accounts.set(vec![Account {
            sheet_type: Some(SheetType::BalanceSheet),
            ..Account::new("inventory", "Inventory")
        }]);
        let mut rules = RuleSet::new();
        rules.insert("inventory", Rule::FixedValue);

        let err = synthesize(&mut accounts, &mut rules).unwrap_err();
        assert_eq!(err, EngineError::MissingBaseProfit { found: 0 });
    }

    #[test]
    fn two_flagged_base_profits_are_ambiguous() {
        let mut accounts = AccountTable::new();
        accounts.set(vec![
            Account {
                is_cf_base_profit: true,
                ..Account::new("net_income", "Net income")
            },
            Account {
                is_cf_base_profit: true,
                ..Account::new("ebitda", "EBITDA")
            },
        ]);
        let mut rules = RuleSet::new();
        rules.insert("net_income", Rule::Input(1.0));

        let err = synthesize(&mut accounts, &mut rules).unwrap_err();
        assert_eq!(err, EngineError::MissingBaseProfit { found: 2 });
    }

    #[test]
    fn balance_sheet_flow_sources_are_not_mirrored() {
        // A loan drawdown flowing from a BS account must not become a
        // cash-flow adjustment.
        let (mut accounts, mut rules) = fixture();
        let mut list = accounts.as_slice().to_vec();
        list.push(Account {
            sheet_type: Some(SheetType::BalanceSheet),
            is_credit: true,
            ignored_for_cf: true,
            ..Account::new("loans", "Loans")
        });
        accounts.set(list);
        rules.insert(
            "tangible_assets",
            Rule::BalanceChange(vec![
                Flow::plus("capex"),
                Flow::minus("depreciation"),
                Flow::plus("loans"),
            ]),
        );

        synthesize(&mut accounts, &mut rules).unwrap();
        assert!(!accounts.contains(&"loans_cf_adj".into()));
        assert!(!rules.contains(&"loans_cf_adj".into()));
    }
}
