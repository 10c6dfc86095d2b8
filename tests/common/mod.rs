#![allow(dead_code)]

use crmsearch::config::{AppConfig, EntityConfig, FilterOptionConfig};
use crmsearch::filtering::{AppliedFilterCondition, ConditionOperator, ConditionValue};
use quick_xml::Reader;
use quick_xml::events::Event;
use serde_json::{Value, json};
use std::path::Path;

/// Option on an `account` attribute
pub fn account_option(attribute: &str, attribute_type: &str) -> FilterOptionConfig {
    FilterOptionConfig::attribute(attribute, attribute_type)
}

/// `account` -> `contact` through `primarycontactid`, with the join attribute on the child
pub fn contact_option(attribute: &str, attribute_type: &str) -> FilterOptionConfig {
    FilterOptionConfig {
        entity_name: Some("account".to_string()),
        ..FilterOptionConfig::attribute("name", "String")
    }
    .related(FilterOptionConfig {
        from_attribute: Some("primarycontactid".to_string()),
        entity_name: Some("contact".to_string()),
        to_attribute: Some("contactid".to_string()),
        ..FilterOptionConfig::attribute(attribute, attribute_type)
    })
}

/// `account` -> `contact` -> `systemuser` (the contact's owner)
pub fn contact_owner_option(attribute: &str, attribute_type: &str) -> FilterOptionConfig {
    FilterOptionConfig {
        from_attribute: Some("primarycontactid".to_string()),
        ..FilterOptionConfig::default()
    }
    .related(
        FilterOptionConfig {
            entity_name: Some("contact".to_string()),
            from_attribute: Some("owninguser".to_string()),
            to_attribute: Some("contactid".to_string()),
            ..FilterOptionConfig::default()
        }
        .related(FilterOptionConfig {
            entity_name: Some("systemuser".to_string()),
            to_attribute: Some("systemuserid".to_string()),
            ..FilterOptionConfig::attribute(attribute, attribute_type)
        }),
    )
}

pub fn condition<V: Into<ConditionValue>>(
    option: FilterOptionConfig,
    operator: ConditionOperator,
    values: impl IntoIterator<Item = V>,
) -> AppliedFilterCondition {
    AppliedFilterCondition::new(option, operator, values)
}

pub fn no_values() -> Vec<String> {
    Vec::new()
}

/// Search scheme with an `account` entity showing a root and a related column
pub fn search_scheme() -> AppConfig {
    AppConfig::from_json_str(
        &json!({
            "SearchScheme": {
                "Entities": [{
                    "LogicalName": "account",
                    "FilterOptions": [
                        { "CategoryDisplayName": "Account" },
                        { "AttributeName": "name" },
                        { "AttributeName": "industrycode" },
                        { "AttributeName": "primarycontactid" },
                        { "FromAttribute": "primarycontactid",
                          "RelatedTo": { "EntityName": "contact", "ToAttribute": "contactid",
                                         "AttributeName": "emailaddress1", "DisplayName": "Contact Email" } }
                    ],
                    "ResultView": {
                        "TableColumns": [
                            { "AttributeName": "name", "DisplayName": "Name" },
                            { "FromAttribute": "primarycontactid",
                              "RelatedTo": { "EntityName": "contact", "ToAttribute": "contactid",
                                             "AttributeNames": ["firstname", "lastname"],
                                             "AttributesFormat": "{1}, {0}", "DisplayName": "Contact" } }
                        ],
                        "Pagination": { "List": [2, 10], "ListItemAll": "All", "DisplaySummary": "{0}-{1} of {2}" }
                    }
                }],
                "Localization": { "CrmFilterConditions": { "eq": "Equals", "begins-with": "Begins with" } }
            }
        })
        .to_string(),
    )
    .unwrap()
}

pub fn account_entity() -> EntityConfig {
    search_scheme().entity("account").cloned().unwrap()
}

fn write(dir: &Path, name: &str, value: &Value) {
    std::fs::write(dir.join(name), serde_json::to_string_pretty(value).unwrap()).unwrap();
}

/// Fixture files in the shape the Web API returns them
pub fn write_fixtures(dir: &Path) {
    write(dir, "entities-md.json", &json!({ "value": [
        { "LogicalName": "account", "EntitySetName": "accounts",
          "DisplayCollectionName": { "UserLocalizedLabel": { "Label": "Accounts" } } },
        { "LogicalName": "contact", "EntitySetName": "contacts",
          "DisplayCollectionName": { "UserLocalizedLabel": { "Label": "Contacts" } } }
    ]}));
    write(dir, "account-attributes-md.json", &json!({ "value": [
        { "LogicalName": "name", "AttributeType": "String",
          "DisplayName": { "UserLocalizedLabel": { "Label": "Account Name" } } },
        { "LogicalName": "industrycode", "AttributeType": "Picklist",
          "DisplayName": { "UserLocalizedLabel": { "Label": "Industry" } } },
        { "LogicalName": "primarycontactid", "AttributeType": "Lookup",
          "DisplayName": { "UserLocalizedLabel": { "Label": "Primary Contact" } } }
    ]}));
    write(dir, "contact-attributes-md.json", &json!({ "value": [
        { "LogicalName": "emailaddress1", "AttributeType": "String",
          "DisplayName": { "UserLocalizedLabel": { "Label": "Email" } } }
    ]}));
    write(dir, "account-industrycode-picklist-md.json", &json!({
        "LogicalName": "industrycode",
        "OptionSet": { "Options": [
            { "Value": 1, "Label": { "UserLocalizedLabel": { "Label": "Accounting" } } },
            { "Value": 2, "Label": { "UserLocalizedLabel": null } }
        ]}
    }));
    write(dir, "account-primarycontactid-lookup-md.json", &json!({
        "LogicalName": "primarycontactid", "Targets": ["contact", "systemuser"]
    }));
    write(dir, "contacts.json", &json!({ "value": [
        { "contactid": "c-1", "firstname": "Ann", "lastname": "Lee" },
        { "contactid": "c-2", "firstname": "Bob", "lastname": null },
        { "firstname": "No", "lastname": "Id" }
    ]}));
    write(dir, "accounts.json", &json!([
        { "name": "Acme", "col_1_firstname": "Ann", "col_1_lastname": "Lee" },
        { "name": "Contoso" },
        { "name": "Fabrikam", "col_1_firstname": "Bob" }
    ]));
}

/// `(name, from, to)` of every `<link-entity>` in document order
pub fn link_entities(xml: &str) -> Vec<(String, String, String)> {
    let mut reader = Reader::from_str(xml);
    let mut links = Vec::new();
    loop {
        match reader.read_event().unwrap() {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"link-entity" => {
                let mut name = String::new();
                let mut from = String::new();
                let mut to = String::new();
                for attribute in e.attributes() {
                    let attribute = attribute.unwrap();
                    let value = attribute.unescape_value().unwrap().into_owned();
                    match attribute.key.as_ref() {
                        b"name" => name = value,
                        b"from" => from = value,
                        b"to" => to = value,
                        _ => {}
                    }
                }
                links.push((name, from, to));
            }
            Event::Eof => break,
            _ => {}
        }
    }
    links
}
