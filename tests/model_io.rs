//! Loading a model from serde-friendly JSON and forecasting it.

use fincast::{Account, AccountId, Engine, InputValue, Period, PeriodId, Rule};
use indexmap::IndexMap;
use pretty_assertions::assert_eq;

#[test]
fn json_fixture_round_trips_through_a_forecast() {
    let accounts: Vec<Account> = serde_json::from_str(
        r#"[
            {"id": "revenue", "display_name": "Revenue", "sheet_type": "PL"},
            {"id": "cogs", "display_name": "Cost of goods sold", "sheet_type": "PL"},
            {"id": "gross_profit", "display_name": "Gross profit", "sheet_type": "PL", "is_credit": true}
        ]"#,
    )
    .unwrap();

    let periods: Vec<Period> = serde_json::from_str(
        r#"[
            {"id": "2024-12-ANNUAL", "year": 2024, "month": 12, "fiscal_year": 2024,
             "is_fiscal_year_end": true, "period_type": "ANNUAL"}
        ]"#,
    )
    .unwrap();

    let rules: IndexMap<AccountId, Rule> = serde_json::from_str(
        r#"{
            "revenue": {"GrowthRate": 0.25},
            "cogs": {"Percentage": {"rate": 0.5, "of": "revenue"}},
            "gross_profit": {"Calculation": {"BinaryOp": {
                "op": "Subtract",
                "left": {"AccountRef": {"account": "revenue"}},
                "right": {"AccountRef": {"account": "cogs"}}
            }}}
        }"#,
    )
    .unwrap();

    let inputs: Vec<InputValue> = serde_json::from_str(
        r#"[
            {"account": "revenue", "period": "2024-12-ANNUAL", "value": 800.0}
        ]"#,
    )
    .unwrap();

    let mut engine = Engine::new();
    engine.set_accounts(accounts);
    engine.set_periods(periods);
    engine.set_rules(rules);
    engine.load_input_data(inputs).unwrap();

    engine.compute().unwrap();

    let p = PeriodId::from("2025-12-ANNUAL");
    assert_eq!(engine.value(&p, &"revenue".into()), Some(1_000.0));
    assert_eq!(engine.value(&p, &"cogs".into()), Some(500.0));
    assert_eq!(engine.value(&p, &"gross_profit".into()), Some(500.0));
}

#[test]
fn rules_serialize_for_round_tripping() {
    let rule = Rule::Percentage { rate: 0.6, of: "revenue".into() };
    let json = serde_json::to_string(&rule).unwrap();
    let back: Rule = serde_json::from_str(&json).unwrap();
    assert_eq!(back, rule);
}
