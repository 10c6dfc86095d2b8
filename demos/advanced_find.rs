//! # Advanced Find Example
//!
//! Compiles the same search scheme twice: once with conditions on the account itself (OData) and
//! once with a condition on the primary contact (FetchXML). When a fixture directory is passed,
//! metadata is back-filled from it and the search is executed.
//!
//! Run with: `cargo run --example advanced_find -- [fixture-dir]`

use crmsearch::config::AppConfig;
use crmsearch::filtering::{AppliedFilterCondition, ConditionOperator};
use crmsearch::metadata::{FileRepository, fill_options_with_metadata_info};
use crmsearch::results::{describe_applied_filters, group_result_columns};
use crmsearch::search::{PlannedQuery, SearchPlan, search};
use crmsearch::validation::validate_app_config;

const SCHEME: &str = r#"{
    "SearchScheme": {
        "Entities": [{
            "LogicalName": "account",
            "FilterOptions": [
                { "AttributeName": "name", "AttributeType": "String" },
                { "AttributeName": "revenue", "AttributeType": "Money" },
                { "FromAttribute": "primarycontactid",
                  "RelatedTo": { "EntityName": "contact", "ToAttribute": "contactid",
                                 "AttributeName": "emailaddress1", "AttributeType": "String" } }
            ],
            "ResultView": {
                "TableColumns": [{ "AttributeName": "name", "DisplayName": "Account" }]
            }
        }]
    }
}"#;

fn print_plan(plan: &SearchPlan) {
    match &plan.query {
        PlannedQuery::OData { select, filter } => {
            println!("  $select = {}", select.join(","));
            println!("  $filter = {}", filter.as_deref().unwrap_or("<none>"));
        }
        PlannedQuery::FetchXml { xml } => println!("  fetchXml = {xml}"),
    }
    for skipped in &plan.skipped {
        println!("  skipped condition {}: {}", skipped.index, skipped.reason);
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .compact()
        .init();

    let mut config = AppConfig::from_json_str(SCHEME)?;
    validate_app_config(&config)?;

    let Some(entity) = config.entity("account").cloned() else {
        return Err("account is not configured".into());
    };
    let options = &entity.filter_options;

    let on_account = vec![
        AppliedFilterCondition::new(options[0].clone(), ConditionOperator::In, ["Acme, Contoso"]),
        AppliedFilterCondition::new(options[1].clone(), ConditionOperator::Gt, [1000]),
    ];
    let mut on_contact = on_account.clone();
    on_contact.push(AppliedFilterCondition::new(
        options[2].clone(),
        ConditionOperator::EndsWith,
        ["@contoso.com"],
    ));

    for (title, conditions) in [("Account only", &on_account), ("With contact", &on_contact)] {
        println!("{title}:");
        for line in describe_applied_filters(conditions) {
            println!("  - {line}");
        }
        print_plan(&SearchPlan::build(&entity, conditions)?);
    }

    let Some(fixtures) = std::env::args().nth(1) else {
        return Ok(());
    };
    let repository = FileRepository::new(fixtures);
    let mut entity = entity;
    fill_options_with_metadata_info("account", &mut entity.filter_options, &repository).await?;
    if let Some(account) = config.entity_mut("account") {
        account.clone_from(&entity);
    }

    let (plan, rows) = search(&repository, &entity, &on_contact).await?;
    let grid = group_result_columns(&plan.columns);
    println!("{} row(s):", rows.len());
    for row in &rows {
        let cells: Vec<String> = grid.iter().map(|column| column.cell_value(row)).collect();
        println!("  {}", cells.join(" | "));
    }
    Ok(())
}
