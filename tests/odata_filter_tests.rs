use chrono::{FixedOffset, Utc};
use crmsearch::filtering::{
    ConditionOperator, ConditionValue, SkipReason, build_crm_entities_filter, compile_odata_filter,
    to_odata_literal_in,
};

mod common;
use common::{account_option, condition, contact_option, no_values};

#[test]
fn test_simple_comparison() {
    let filter = build_crm_entities_filter(
        "account",
        &[condition(account_option("revenue", "Money"), ConditionOperator::Gt, [1000])],
    );
    assert_eq!(filter.as_deref(), Some("(revenue gt 1000)"));
}

#[test]
fn test_string_in_from_free_text() {
    let filter = build_crm_entities_filter(
        "account",
        &[condition(account_option("name", "String"), ConditionOperator::In, ["Acme, Contoso"])],
    );
    assert_eq!(filter.as_deref(), Some("(name in ('Acme','Contoso'))"));
}

#[test]
fn test_in_split_matches_explicit_values() {
    let split = build_crm_entities_filter(
        "account",
        &[condition(account_option("name", "String"), ConditionOperator::In, ["a, b ,c"])],
    );
    let explicit = build_crm_entities_filter(
        "account",
        &[condition(account_option("name", "String"), ConditionOperator::In, ["a", "b", "c"])],
    );
    assert_eq!(split, explicit);
    assert_eq!(split.as_deref(), Some("(name in ('a','b','c'))"));
}

#[test]
fn test_numeric_in_list() {
    let filter = build_crm_entities_filter(
        "account",
        &[condition(
            account_option("industrycode", "Picklist"),
            ConditionOperator::In,
            [ConditionValue::from(1), ConditionValue::from(2)],
        )],
    );
    // option set values are not in the number family and stay quoted
    assert_eq!(filter.as_deref(), Some("(industrycode in ('1','2'))"));

    let filter = build_crm_entities_filter(
        "account",
        &[condition(account_option("numberofemployees", "Integer"), ConditionOperator::In, ["10,20"])],
    );
    assert_eq!(filter.as_deref(), Some("(numberofemployees in (10,20))"));
}

#[test]
fn test_no_value_conditions_ignore_values() {
    for operator in [
        ConditionOperator::Null,
        ConditionOperator::NotNull,
        ConditionOperator::Today,
        ConditionOperator::Tomorrow,
        ConditionOperator::Yesterday,
    ] {
        let with_values = build_crm_entities_filter(
            "account",
            &[condition(account_option("createdon", "DateTime"), operator, ["2024-01-01", ""])],
        );
        let without_values = build_crm_entities_filter(
            "account",
            &[condition(account_option("createdon", "DateTime"), operator, no_values())],
        );
        assert!(with_values.is_some(), "{operator}");
        assert_eq!(with_values, without_values, "{operator}");
    }
}

#[test]
fn test_boolean_literals() {
    let filter = build_crm_entities_filter(
        "account",
        &[
            condition(account_option("donotemail", "Boolean"), ConditionOperator::Eq, ["True"]),
            condition(account_option("donotphone", "boolean"), ConditionOperator::Ne, ["yes"]),
        ],
    );
    assert_eq!(
        filter.as_deref(),
        Some("(donotemail eq true) and (donotphone ne false)")
    );
}

#[test]
fn test_first_value_only_for_comparisons() {
    let filter = build_crm_entities_filter(
        "account",
        &[condition(account_option("name", "String"), ConditionOperator::BeginsWith, ["Con", "Fab"])],
    );
    assert_eq!(filter.as_deref(), Some("(startswith(name,'Con'))"));
}

#[test]
fn test_disabled_and_blank_conditions_produce_no_filter() {
    let disabled =
        condition(account_option("name", "String"), ConditionOperator::Eq, ["Acme"]).disabled();
    let blank = condition(account_option("name", "String"), ConditionOperator::Eq, ["   "]);

    let compiled = compile_odata_filter("account", &[disabled, blank]);
    assert_eq!(compiled.filter, None);
    let reasons: Vec<SkipReason> = compiled.skipped.iter().map(|s| s.reason).collect();
    assert_eq!(reasons, vec![SkipReason::Disabled, SkipReason::EmptyValue]);
}

#[test]
fn test_related_entity_conditions_are_left_to_fetch_xml() {
    let compiled = compile_odata_filter(
        "account",
        &[
            condition(contact_option("emailaddress1", "String"), ConditionOperator::Eq, ["a@b.com"]),
            condition(account_option("name", "String"), ConditionOperator::Like, ["corp"]),
        ],
    );
    assert_eq!(compiled.filter.as_deref(), Some("(contains(name,'corp'))"));
    assert_eq!(compiled.skipped.len(), 1);
    assert_eq!(compiled.skipped[0].index, 0);
    assert_eq!(compiled.skipped[0].reason, SkipReason::RequiresJoin);
}

#[test]
fn test_compilation_is_deterministic() {
    let conditions = [
        condition(account_option("name", "String"), ConditionOperator::NotEndWith, ["Ltd"]),
        condition(account_option("revenue", "Money"), ConditionOperator::Le, ["1e6"]),
        condition(account_option("createdon", "DateTime"), ConditionOperator::Yesterday, no_values()),
    ];
    let first = build_crm_entities_filter("account", &conditions);
    let second = build_crm_entities_filter("account", &conditions);
    assert_eq!(first, second);
    assert_eq!(
        first.as_deref(),
        Some(
            "(not endswith(name,'Ltd')) and (revenue le 1000000) and (Microsoft.Dynamics.CRM.Yesterday(PropertyName='createdon'))"
        )
    );
}

#[test]
fn test_dates_are_converted_to_utc() {
    let value = ConditionValue::from("2024-03-10");
    assert_eq!(
        to_odata_literal_in(Some("DateTime"), &value, &Utc),
        "'2024-03-10T00:00:00.000Z'"
    );
    let new_york = FixedOffset::west_opt(5 * 3600).unwrap();
    assert_eq!(
        to_odata_literal_in(Some("DateTime"), &value, &new_york),
        "'2024-03-10T05:00:00.000Z'"
    );
}
