//! Filling configuration gaps from CRM metadata.
//!
//! Configuration files usually only name attributes. Their types (which decide the operators
//! offered and how values are written) and their labels are looked up once per entity, and the
//! value pickers of option set and lookup attributes are populated from the CRM.

use serde::Serialize;

use super::{CrmRepository, EntityQuery};
use crate::config::{ChainLink, FilterOptionConfig, non_empty};
use crate::errors::SearchError;
use crate::filtering::{AttributeKind, ConditionValue};
use crate::results::{EntityRow, fill_placeholders, normalize_entity_rows, value_text};

/// Back-fill attribute types and display names of filter options from metadata.
///
/// Targets without an `EntityName` are assigned `entity_logical_name`. Attribute metadata is
/// requested once per target entity. A found attribute overwrites `AttributeType` and fills an
/// empty `DisplayName`; options whose attribute is unknown are left as configured. Category
/// headers are not touched.
///
/// # Errors
///
/// Propagates repository failures; options already updated keep their new values.
pub async fn fill_options_with_metadata_info<R: CrmRepository + ?Sized>(
    entity_logical_name: &str,
    options: &mut [FilterOptionConfig],
    repository: &R,
) -> Result<(), SearchError> {
    // target entity -> attribute names, in first-seen order
    let mut requested: Vec<(String, Vec<String>)> = Vec::new();

    for option in options.iter_mut().filter(|option| !option.is_category()) {
        let target = option.target_mut();
        let Some(attribute_name) = non_empty(target.attribute_name.as_deref()) else {
            continue;
        };
        let attribute_name = attribute_name.to_string();
        if non_empty(target.entity_name.as_deref()).is_none() {
            target.entity_name = Some(entity_logical_name.to_string());
        }
        let entity_name = target.entity_name.clone().unwrap_or_default();

        let index = requested
            .iter()
            .position(|(entity, _)| *entity == entity_name)
            .unwrap_or_else(|| {
                requested.push((entity_name, Vec::new()));
                requested.len() - 1
            });
        let attributes = &mut requested[index].1;
        if !attributes.contains(&attribute_name) {
            attributes.push(attribute_name);
        }
    }

    for (entity_name, attribute_names) in &requested {
        let metadata = repository
            .get_attributes_metadata(entity_name, attribute_names)
            .await?;
        tracing::info!(
            entity = %entity_name,
            requested = attribute_names.len(),
            found = metadata.len(),
            "filling filter options with attribute metadata"
        );

        for option in options.iter_mut().filter(|option| !option.is_category()) {
            let target = option.target_mut();
            if target.entity_name.as_deref() != Some(entity_name.as_str()) {
                continue;
            }
            let Some(attribute) = metadata
                .iter()
                .find(|a| Some(a.logical_name.as_str()) == target.attribute_name.as_deref())
            else {
                continue;
            };
            target.attribute_type.clone_from(&attribute.attribute_type);
            if non_empty(target.display_name.as_deref()).is_none() {
                target.display_name = attribute.display_label().map(str::to_string);
            }
        }
    }

    Ok(())
}

/// A value offered by an option set or lookup picker.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionValueOption {
    pub value: ConditionValue,
    pub display_name: String,
}

/// Values selectable for a filter option.
///
/// Option sets offer their options, labelled in the user's language. Lookups offer the rows of
/// their first target entity, identified by `<entity>id` and labelled with the configured
/// `RelatedEntityAttributeNames`. Other attribute types, and targets without entity or attribute
/// name, have nothing to pick from.
///
/// # Errors
///
/// Propagates repository failures.
pub async fn load_selectable_options<R: CrmRepository + ?Sized>(
    option: &FilterOptionConfig,
    repository: &R,
) -> Result<Vec<ConditionValueOption>, SearchError> {
    let target = option.target();
    let (Some(entity_name), Some(attribute_name)) = (
        non_empty(target.entity_name.as_deref()),
        non_empty(target.attribute_name.as_deref()),
    ) else {
        return Ok(Vec::new());
    };

    match AttributeKind::from_tag(target.attribute_type.as_deref()) {
        AttributeKind::Picklist => {
            let metadata = repository
                .get_picklist_attribute_metadata(entity_name, attribute_name)
                .await?;
            Ok(metadata
                .option_set
                .map(|set| set.options)
                .unwrap_or_default()
                .into_iter()
                .map(|option| ConditionValueOption {
                    display_name: option
                        .label
                        .text()
                        .map_or_else(|| option.value.to_string(), str::to_string),
                    value: ConditionValue::from(option.value),
                })
                .collect())
        }
        AttributeKind::Lookup => load_lookup_options(target, entity_name, attribute_name, repository).await,
        _ => Ok(Vec::new()),
    }
}

async fn load_lookup_options<R: CrmRepository + ?Sized>(
    target: &FilterOptionConfig,
    entity_name: &str,
    attribute_name: &str,
    repository: &R,
) -> Result<Vec<ConditionValueOption>, SearchError> {
    let lookup = repository
        .get_lookup_attribute_metadata(entity_name, attribute_name)
        .await?;
    let Some(target_entity) = lookup.targets.first() else {
        return Ok(Vec::new());
    };

    let entities = repository
        .get_entities_metadata(std::slice::from_ref(target_entity))
        .await?;
    let Some(collection_name) = entities.first().and_then(|entity| entity.collection_name()) else {
        tracing::debug!(entity = %target_entity, "lookup target has no entity set name");
        return Ok(Vec::new());
    };

    let id_attribute = format!("{target_entity}id");
    let selection = target.selection.clone().unwrap_or_default();
    let related_names = selection.related_entity_attribute_names.unwrap_or_default();
    let mut select = vec![id_attribute.clone()];
    for name in &related_names {
        if !select.contains(name) {
            select.push(name.clone());
        }
    }

    let response = repository
        .get_entities(collection_name, &select, &EntityQuery::All)
        .await?;
    Ok(normalize_entity_rows(response)
        .iter()
        .filter_map(|row| {
            let id = row.get(&id_attribute).filter(|id| !id.is_null())?;
            let value = value_text(Some(id));
            let display_name = format_lookup_display_value(
                row,
                &related_names,
                selection.related_entity_attribute_format.as_deref(),
                &value,
            );
            Some(ConditionValueOption {
                value: ConditionValue::Text(value),
                display_name,
            })
        })
        .collect())
}

/// Keep the values that are offered by `options`, once each, at most `max_items` of them.
///
/// Values are matched by their text, so a stored `"1"` selects the option `1`; the option's own
/// value is returned.
#[must_use]
pub fn sanitize_selectable_values(
    values: &[ConditionValue],
    options: &[ConditionValueOption],
    max_items: Option<usize>,
) -> Vec<ConditionValue> {
    let mut sanitized: Vec<ConditionValue> = Vec::new();
    for value in values {
        let key = value.to_string();
        let Some(option) = options.iter().find(|option| option.value.to_string() == key) else {
            continue;
        };
        if !sanitized.contains(&option.value) {
            sanitized.push(option.value.clone());
        }
    }
    if let Some(max) = max_items.filter(|max| *max > 0) {
        sanitized.truncate(max);
    }
    sanitized
}

/// Label of a lookup row.
///
/// With a format, `{n}` is replaced by the n-th attribute value and whitespace is collapsed.
/// Without one, or when the formatted text is empty, the non-empty values are joined with
/// spaces. `fallback` is used when the row has none of the attributes.
#[must_use]
pub fn format_lookup_display_value(
    row: &EntityRow,
    attribute_names: &[String],
    format: Option<&str>,
    fallback: &str,
) -> String {
    let values: Vec<String> = attribute_names
        .iter()
        .map(|name| value_text(row.get(name)).trim().to_string())
        .collect();

    if let Some(format) = format.filter(|format| !format.is_empty()) {
        let formatted = fill_placeholders(format, &values)
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");
        if !formatted.is_empty() {
            return formatted;
        }
    }

    let joined = values
        .iter()
        .filter(|value| !value.is_empty())
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(" ");
    if joined.is_empty() {
        fallback.to_string()
    } else {
        joined
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: serde_json::Value) -> EntityRow {
        serde_json::from_value(value).unwrap()
    }

    fn options(values: &[i32]) -> Vec<ConditionValueOption> {
        values
            .iter()
            .map(|value| ConditionValueOption {
                value: ConditionValue::from(*value),
                display_name: value.to_string(),
            })
            .collect()
    }

    #[test]
    fn test_sanitize_matches_by_text() {
        let values = vec![
            ConditionValue::from("2"),
            ConditionValue::from(9),
            ConditionValue::from(2),
            ConditionValue::from(1),
        ];
        assert_eq!(
            sanitize_selectable_values(&values, &options(&[1, 2, 3]), None),
            vec![ConditionValue::from(2), ConditionValue::from(1)]
        );
    }

    #[test]
    fn test_sanitize_caps_at_max_items() {
        let values = vec![ConditionValue::from(1), ConditionValue::from(2), ConditionValue::from(3)];
        assert_eq!(sanitize_selectable_values(&values, &options(&[1, 2, 3]), Some(2)).len(), 2);
        assert_eq!(sanitize_selectable_values(&values, &options(&[1, 2, 3]), Some(0)).len(), 3);
    }

    #[test]
    fn test_lookup_display_with_format() {
        let contact = row(json!({ "firstname": " Ann ", "lastname": "Lee", "emailaddress1": null }));
        let names = vec!["firstname".to_string(), "lastname".to_string(), "emailaddress1".to_string()];
        assert_eq!(
            format_lookup_display_value(&contact, &names, Some("{1},   {0} {2}"), "id"),
            "Lee, Ann"
        );
        assert_eq!(format_lookup_display_value(&contact, &names, Some("{2}"), "id"), "Ann Lee");
        assert_eq!(format_lookup_display_value(&contact, &names, None, "id"), "Ann Lee");
    }

    #[test]
    fn test_lookup_display_fallback() {
        let empty = row(json!({ "contactid": "42" }));
        let names = vec!["fullname".to_string()];
        assert_eq!(format_lookup_display_value(&empty, &names, Some("{0}"), "42"), "42");
        assert_eq!(format_lookup_display_value(&empty, &[], None, "42"), "42");
    }
}
