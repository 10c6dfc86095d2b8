//! Result rows and their presentation.
//!
//! Rows come back from the repository as JSON objects. Resolved [`SearchTableColumn`]s know the
//! key under which each attribute value was returned; [`ResultColumn`] groups them back into the
//! configured grid columns to produce headers and cell text.

use serde_json::Value;
use std::collections::HashMap;

use crate::config::{ChainLink, non_empty};
use crate::filtering::literals::format_number;
use crate::filtering::{AppliedFilterCondition, SearchTableColumn};

/// One result row, attribute or alias to value
pub type EntityRow = serde_json::Map<String, Value>;

/// Cell text of a column without any value
pub const EMPTY_CELL: &str = "-";

/// Rows of a query response: either a bare array or an OData `{ "value": [...] }` envelope.
/// Anything that is not an object is ignored.
#[must_use]
pub fn normalize_entity_rows(response: Value) -> Vec<EntityRow> {
    let items = match response {
        Value::Array(items) => items,
        Value::Object(mut envelope) => match envelope.remove("value") {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    };
    items
        .into_iter()
        .filter_map(|item| match item {
            Value::Object(row) => Some(row),
            _ => None,
        })
        .collect()
}

/// Replace `{n}` placeholders with the n-th value; indices without a value become empty.
pub(crate) fn fill_placeholders(template: &str, values: &[String]) -> String {
    let mut filled = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        filled.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let digits = after
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(after.len());
        if digits > 0 && after[digits..].starts_with('}') {
            let value = after[..digits]
                .parse::<usize>()
                .ok()
                .and_then(|index| values.get(index));
            filled.push_str(value.map_or("", String::as_str));
            rest = &after[digits + 1..];
        } else {
            filled.push('{');
            rest = after;
        }
    }
    filled.push_str(rest);
    filled
}

/// Display text of a JSON value; null and missing values are empty.
///
/// Floats use the same plain decimal form as filter literals, so `1000.0` reads `1000`.
#[must_use]
pub fn value_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(text)) => text.clone(),
        Some(Value::Number(number)) if number.is_f64() => number
            .as_f64()
            .map_or_else(|| number.to_string(), format_number),
        Some(other) => other.to_string(),
    }
}

/// A configured grid column with its resolved attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultColumn<'a> {
    pub source_column: usize,
    pub attributes: Vec<&'a SearchTableColumn>,
}

/// Group resolved attributes by the grid column they belong to, in column order.
#[must_use]
pub fn group_result_columns(columns: &[SearchTableColumn]) -> Vec<ResultColumn<'_>> {
    let mut grouped: Vec<ResultColumn<'_>> = Vec::new();
    for column in columns {
        match grouped.last_mut() {
            Some(last) if last.source_column == column.source_column => last.attributes.push(column),
            _ => grouped.push(ResultColumn {
                source_column: column.source_column,
                attributes: vec![column],
            }),
        }
    }
    grouped
}

impl ResultColumn<'_> {
    /// Key of the column in a localized header table
    #[must_use]
    pub fn column_key(&self) -> String {
        format!("col_{}", self.source_column)
    }

    fn display_name(&self) -> Option<&str> {
        self.attributes.first().and_then(|a| a.display_name.as_deref())
    }

    fn attributes_format(&self) -> Option<&str> {
        self.attributes
            .first()
            .and_then(|a| non_empty(a.attributes_format.as_deref()))
    }

    /// Header text: configured display name, then the localized name, then the attribute names
    /// joined with ` | `.
    #[must_use]
    pub fn header(&self, localized: Option<&HashMap<String, String>>) -> String {
        if let Some(name) = self.display_name() {
            return name.to_string();
        }
        if let Some(name) = localized.and_then(|names| names.get(&self.column_key())) {
            return name.clone();
        }
        self.attributes
            .iter()
            .map(|a| a.attribute_name.as_str())
            .collect::<Vec<_>>()
            .join(" | ")
    }

    /// Cell text for a row.
    ///
    /// With an `AttributesFormat` the values fill its `{n}` placeholders, otherwise the non-empty
    /// values are joined with spaces. A cell without any text renders as [`EMPTY_CELL`].
    #[must_use]
    pub fn cell_value(&self, row: &EntityRow) -> String {
        let values: Vec<String> = self
            .attributes
            .iter()
            .map(|a| value_text(row.get(&a.value_key)))
            .collect();
        if values.iter().all(String::is_empty) {
            return EMPTY_CELL.to_string();
        }

        let text = match self.attributes_format() {
            Some(format) => fill_placeholders(format, &values),
            None => values
                .iter()
                .filter(|value| !value.is_empty())
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join(" "),
        };
        if text.trim().is_empty() {
            EMPTY_CELL.to_string()
        } else {
            text
        }
    }
}

/// Human readable `name condition values` lines for the applied filters.
///
/// Rows without attribute, condition or value are left out. The name is the target's display
/// name, else its attribute name. No-value conditions repeat the condition instead of values.
#[must_use]
pub fn describe_applied_filters(conditions: &[AppliedFilterCondition]) -> Vec<String> {
    conditions
        .iter()
        .filter(|condition| condition.has_condition_value())
        .filter_map(|condition| {
            let target = condition.filter_option.as_ref()?.target();
            let attribute_name = non_empty(target.attribute_name.as_deref())?;
            let operator = condition.condition?;
            let name = target.display_name.as_deref().unwrap_or(attribute_name);
            let values = if operator.takes_no_value() {
                operator.to_string()
            } else {
                condition
                    .values
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ")
            };
            Some(format!("{name} {operator} {values}"))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FilterOptionConfig, TableColumnConfig};
    use crate::filtering::{ConditionOperator, resolve_search_table_columns};
    use serde_json::json;

    fn row(value: Value) -> EntityRow {
        match value {
            Value::Object(row) => row,
            _ => EntityRow::new(),
        }
    }

    #[test]
    fn test_normalize_rows() {
        assert_eq!(normalize_entity_rows(json!([{ "a": 1 }, 5, { "b": 2 }])).len(), 2);
        assert_eq!(normalize_entity_rows(json!({ "value": [{ "a": 1 }] })).len(), 1);
        assert!(normalize_entity_rows(json!({ "value": 3 })).is_empty());
        assert!(normalize_entity_rows(json!("rows")).is_empty());
    }

    #[test]
    fn test_value_text_numbers() {
        assert_eq!(value_text(Some(&json!(1000.0))), "1000");
        assert_eq!(value_text(Some(&json!(12.5))), "12.5");
        assert_eq!(value_text(Some(&json!(-0.0))), "0");
        assert_eq!(value_text(Some(&json!(42))), "42");
        assert_eq!(value_text(Some(&json!(true))), "true");
        assert_eq!(value_text(Some(&Value::Null)), "");
        assert_eq!(value_text(None), "");
    }

    #[test]
    fn test_fill_placeholders() {
        let values = vec!["Ann".to_string(), "Lee".to_string()];
        assert_eq!(fill_placeholders("{1}, {0}", &values), "Lee, Ann");
        assert_eq!(fill_placeholders("{0} {7} {x} {", &values), "Ann  {x} {");
    }

    #[test]
    fn test_cells_and_headers() {
        let columns = resolve_search_table_columns(
            "contact",
            &[
                TableColumnConfig {
                    attribute_names: Some(vec!["firstname".to_string(), "lastname".to_string()]),
                    ..TableColumnConfig::default()
                },
                TableColumnConfig {
                    display_name: Some("Name".to_string()),
                    attribute_names: Some(vec!["firstname".to_string(), "lastname".to_string()]),
                    attributes_format: Some("{1}, {0}".to_string()),
                    ..TableColumnConfig::default()
                },
                TableColumnConfig::attribute("telephone1"),
            ],
        );
        let grouped = group_result_columns(&columns);
        assert_eq!(grouped.len(), 3);

        let localized = HashMap::from([("col_2".to_string(), "Phone".to_string())]);
        assert_eq!(grouped[0].header(Some(&localized)), "firstname | lastname");
        assert_eq!(grouped[1].header(None), "Name");
        assert_eq!(grouped[2].header(Some(&localized)), "Phone");

        let ann = row(json!({ "firstname": "Ann", "lastname": null, "telephone1": "" }));
        assert_eq!(grouped[0].cell_value(&ann), "Ann");
        assert_eq!(grouped[1].cell_value(&ann), ", Ann");
        assert_eq!(grouped[2].cell_value(&ann), EMPTY_CELL);
        assert_eq!(grouped[1].cell_value(&EntityRow::new()), EMPTY_CELL);
    }

    #[test]
    fn test_describe_applied_filters() {
        let mut named = FilterOptionConfig::attribute("name", "String");
        named.display_name = Some("Account Name".to_string());
        let conditions = vec![
            AppliedFilterCondition::new(named, ConditionOperator::In, ["Acme", "Contoso"]),
            AppliedFilterCondition::new(
                FilterOptionConfig::attribute("createdon", "DateTime"),
                ConditionOperator::Today,
                Vec::<String>::new(),
            ),
            AppliedFilterCondition::new(
                FilterOptionConfig::attribute("revenue", "Money"),
                ConditionOperator::Gt,
                [" "],
            ),
        ];
        assert_eq!(
            describe_applied_filters(&conditions),
            vec!["Account Name in Acme, Contoso", "createdon today today"]
        );
    }
}
