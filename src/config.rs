//! Search scheme configuration.
//!
//! The configuration is the JSON document shipped with the CRM web resource. Property names are
//! PascalCase to stay compatible with existing configuration files:
//!
//! ```json
//! {
//!   "SearchScheme": {
//!     "Entities": [{
//!       "LogicalName": "account",
//!       "FilterOptions": [
//!         { "AttributeName": "name" },
//!         { "FromAttribute": "primarycontactid",
//!           "RelatedTo": { "EntityName": "contact", "ToAttribute": "contactid", "AttributeName": "emailaddress1" } }
//!       ],
//!       "ResultView": { "TableColumns": [{ "AttributeName": "name" }] }
//!     }],
//!     "Localization": { "CrmFilterConditions": { "eq": "Equals" } }
//!   }
//! }
//! ```
//!
//! Both filter options and table columns can be chained through `RelatedTo` to describe a join
//! path. [`ChainLink`] provides the traversal helpers shared by both.

use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use std::collections::HashMap;
use std::path::Path;

use crate::errors::SearchError;
use crate::filtering::conditions::deserialize_operator;
use crate::filtering::{ConditionOperator, ConditionValue};

/// Root of the configuration document.
#[skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AppConfig {
    pub search_scheme: Option<SearchSchemeConfig>,
}

impl AppConfig {
    /// Parse a configuration document.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Json`] when the document is not valid configuration JSON.
    pub fn from_json_str(json: &str) -> Result<Self, SearchError> {
        serde_json::from_str(json).map_err(|e| SearchError::json("invalid search configuration", e))
    }

    /// Read and parse a configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Io`] if the file cannot be read and [`SearchError::Json`] if it
    /// cannot be parsed.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, SearchError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| SearchError::io(path.display().to_string(), e))?;
        Self::from_json_str(&contents)
    }

    /// Entity configuration by logical name
    #[must_use]
    pub fn entity(&self, logical_name: &str) -> Option<&EntityConfig> {
        self.search_scheme
            .as_ref()?
            .entities
            .iter()
            .find(|entity| entity.logical_name == logical_name)
    }

    /// Mutable entity configuration, used by metadata backfill
    pub fn entity_mut(&mut self, logical_name: &str) -> Option<&mut EntityConfig> {
        self.search_scheme
            .as_mut()?
            .entities
            .iter_mut()
            .find(|entity| entity.logical_name == logical_name)
    }

    /// Labels for condition operators, empty when not configured
    #[must_use]
    pub fn condition_labels(&self) -> HashMap<String, String> {
        self.search_scheme
            .as_ref()
            .map(|scheme| scheme.localization.crm_filter_conditions.clone())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SearchSchemeConfig {
    #[serde(default)]
    pub entities: Vec<EntityConfig>,
    #[serde(default)]
    pub localization: LocalizationConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LocalizationConfig {
    /// Operator token (e.g. `begins-with`) to display label
    #[serde(default)]
    pub crm_filter_conditions: HashMap<String, String>,
}

/// Searchable entity: its filter options and result view.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EntityConfig {
    pub logical_name: String,
    #[serde(default)]
    pub filter_options: Vec<FilterOptionConfig>,
    #[serde(default)]
    pub result_view: ResultViewConfig,
}

#[skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ResultViewConfig {
    #[serde(default)]
    pub table_columns: Vec<TableColumnConfig>,
    pub pagination: Option<ResultViewPaginationConfig>,
}

/// Client-side paging of the result grid.
#[skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ResultViewPaginationConfig {
    /// Offered page sizes
    pub list: Option<Vec<f64>>,
    /// Label of the "show everything" page size; absent means no such option
    pub list_item_all: Option<String>,
    /// Summary template, `{0}` first row, `{1}` last row, `{2}` total
    pub display_summary: Option<String>,
}

/// Initial state of a filter row.
#[skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FilterOptionsDefaultConfig {
    pub cannot_be_removed: Option<bool>,
    #[serde(default, deserialize_with = "deserialize_operator")]
    pub condition: Option<ConditionOperator>,
    pub ordered_by: Option<i32>,
    pub is_disabled: Option<bool>,
    pub is_showed: Option<bool>,
    pub values: Option<Vec<ConditionValue>>,
}

/// Multi-select constraints and lookup display formatting.
#[skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SelectionConfig {
    pub max_items: Option<usize>,
    pub min_items: Option<usize>,
    pub multiple: Option<bool>,
    /// Attributes of the lookup target shown in the value picker
    pub related_entity_attribute_names: Option<Vec<String>>,
    /// `{0}`, `{1}`... template over `related_entity_attribute_names`
    pub related_entity_attribute_format: Option<String>,
}

impl SelectionConfig {
    /// `MaxItems` when it is a usable limit
    #[must_use]
    pub fn max_items(&self) -> Option<usize> {
        self.max_items.filter(|max| *max > 0)
    }

    #[must_use]
    pub fn is_multiple(&self) -> bool {
        self.multiple.unwrap_or(false)
    }
}

/// One filterable attribute slot, optionally chained to a related entity.
#[skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FilterOptionConfig {
    pub display_name: Option<String>,
    pub attribute_name: Option<String>,
    pub from_attribute: Option<String>,
    pub to_attribute: Option<String>,
    pub attribute_type: Option<String>,
    /// Marks a grouping header that cannot be selected
    pub category_display_name: Option<String>,
    pub control: Option<String>,
    pub entity_name: Option<String>,
    pub default: Option<FilterOptionsDefaultConfig>,
    pub selection: Option<SelectionConfig>,
    pub related_to: Option<Box<FilterOptionConfig>>,
}

impl FilterOptionConfig {
    /// Option on the current entity
    pub fn attribute(attribute_name: impl Into<String>, attribute_type: impl Into<String>) -> Self {
        Self {
            attribute_name: Some(attribute_name.into()),
            attribute_type: Some(attribute_type.into()),
            ..Self::default()
        }
    }

    /// Chain `related` behind this option
    #[must_use]
    pub fn related(mut self, related: FilterOptionConfig) -> Self {
        self.related_to = Some(Box::new(related));
        self
    }

    #[must_use]
    pub fn is_category(&self) -> bool {
        self.category_display_name.is_some()
    }
}

/// A result grid column, optionally chained to a related entity.
#[skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TableColumnConfig {
    pub display_name: Option<String>,
    pub attribute_name: Option<String>,
    /// Several attributes of the target shown in one cell
    pub attribute_names: Option<Vec<String>>,
    /// `{0}`, `{1}`... template over the column's attributes
    pub attributes_format: Option<String>,
    pub entity_name: Option<String>,
    pub from_attribute: Option<String>,
    pub to_attribute: Option<String>,
    pub related_to: Option<Box<TableColumnConfig>>,
}

impl TableColumnConfig {
    /// Column showing one attribute of the current entity
    pub fn attribute(attribute_name: impl Into<String>) -> Self {
        Self {
            attribute_name: Some(attribute_name.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn related(mut self, related: TableColumnConfig) -> Self {
        self.related_to = Some(Box::new(related));
        self
    }

    /// Attributes shown by this link: non-empty `AttributeNames`, else `AttributeName`.
    #[must_use]
    pub fn attribute_names(&self) -> Vec<&str> {
        let names: Vec<&str> = self
            .attribute_names
            .iter()
            .flatten()
            .map(|name| name.trim())
            .filter(|name| !name.is_empty())
            .collect();
        if !names.is_empty() {
            return names;
        }
        non_empty(self.attribute_name.as_deref()).into_iter().collect()
    }
}

pub(crate) fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// Traversal of a `RelatedTo` chain.
///
/// The chain is a finite, owned, singly linked list: `self` is the root link, the last link is
/// the *target* that supplies the attribute actually compared or displayed.
pub trait ChainLink: Sized {
    fn next_link(&self) -> Option<&Self>;
    fn target_mut(&mut self) -> &mut Self;
    fn link_entity_name(&self) -> Option<&str>;
    fn link_from_attribute(&self) -> Option<&str>;
    fn link_to_attribute(&self) -> Option<&str>;
    fn link_display_name(&self) -> Option<&str>;

    /// All links, root first
    fn chain(&self) -> Vec<&Self> {
        let mut links = vec![self];
        let mut current = self;
        while let Some(next) = current.next_link() {
            links.push(next);
            current = next;
        }
        links
    }

    /// Deepest link of the chain
    fn target(&self) -> &Self {
        let mut current = self;
        while let Some(next) = current.next_link() {
            current = next;
        }
        current
    }

    fn chain_len(&self) -> usize {
        let mut len = 1;
        let mut current = self;
        while let Some(next) = current.next_link() {
            len += 1;
            current = next;
        }
        len
    }
}

macro_rules! impl_chain_link {
    ($($config:ty),+ $(,)?) => {
        $(
            impl ChainLink for $config {
                fn next_link(&self) -> Option<&Self> {
                    self.related_to.as_deref()
                }

                fn target_mut(&mut self) -> &mut Self {
                    match self.related_to {
                        Some(ref mut next) => next.target_mut(),
                        None => self,
                    }
                }

                fn link_entity_name(&self) -> Option<&str> {
                    non_empty(self.entity_name.as_deref())
                }

                fn link_from_attribute(&self) -> Option<&str> {
                    non_empty(self.from_attribute.as_deref())
                }

                fn link_to_attribute(&self) -> Option<&str> {
                    non_empty(self.to_attribute.as_deref())
                }

                fn link_display_name(&self) -> Option<&str> {
                    non_empty(self.display_name.as_deref())
                }
            }
        )+
    };
}

impl_chain_link!(FilterOptionConfig, TableColumnConfig);

#[cfg(test)]
mod tests {
    use super::*;

    fn contact_email_option() -> FilterOptionConfig {
        FilterOptionConfig {
            from_attribute: Some("primarycontactid".to_string()),
            ..FilterOptionConfig::default()
        }
        .related(FilterOptionConfig {
            entity_name: Some("contact".to_string()),
            to_attribute: Some("contactid".to_string()),
            ..FilterOptionConfig::attribute("emailaddress1", "String")
        })
    }

    #[test]
    fn test_chain_and_target() {
        let option = contact_email_option();
        assert_eq!(option.chain_len(), 2);
        assert_eq!(option.chain().len(), 2);
        assert_eq!(option.target().attribute_name.as_deref(), Some("emailaddress1"));
    }

    #[test]
    fn test_target_mut_updates_leaf() {
        let mut option = contact_email_option();
        option.target_mut().display_name = Some("Email".to_string());
        assert_eq!(option.target().display_name.as_deref(), Some("Email"));
        assert!(option.display_name.is_none());
    }

    #[test]
    fn test_single_link_is_its_own_target() {
        let option = FilterOptionConfig::attribute("name", "String");
        assert_eq!(option.chain_len(), 1);
        assert!(std::ptr::eq(option.target(), &option));
    }

    #[test]
    fn test_column_attribute_names_prefers_list() {
        let column = TableColumnConfig {
            attribute_name: Some("fullname".to_string()),
            attribute_names: Some(vec!["firstname".to_string(), " ".to_string(), "lastname".to_string()]),
            ..TableColumnConfig::default()
        };
        assert_eq!(column.attribute_names(), vec!["firstname", "lastname"]);

        let column = TableColumnConfig {
            attribute_names: Some(Vec::new()),
            ..TableColumnConfig::attribute("fullname")
        };
        assert_eq!(column.attribute_names(), vec!["fullname"]);
    }

    #[test]
    fn test_parse_pascal_case_config() {
        let config = AppConfig::from_json_str(
            r#"{
                "SearchScheme": {
                    "Entities": [{
                        "LogicalName": "account",
                        "FilterOptions": [
                            { "CategoryDisplayName": "General" },
                            { "AttributeName": "name", "Default": { "Condition": "begins-with", "Values": ["Con", 5] } }
                        ],
                        "ResultView": {
                            "TableColumns": [{ "AttributeName": "name", "DisplayName": "Name" }],
                            "Pagination": { "List": [10, 25], "ListItemAll": "All" }
                        }
                    }],
                    "Localization": { "CrmFilterConditions": { "eq": "Equals" } }
                }
            }"#,
        )
        .unwrap();

        let account = config.entity("account").unwrap();
        assert!(account.filter_options[0].is_category());
        let default = account.filter_options[1].default.as_ref().unwrap();
        assert_eq!(default.condition, Some(ConditionOperator::BeginsWith));
        assert_eq!(
            default.values.as_deref(),
            Some(&[ConditionValue::from("Con"), ConditionValue::from(5)][..])
        );
        assert_eq!(account.result_view.table_columns.len(), 1);
        assert_eq!(config.condition_labels().get("eq").map(String::as_str), Some("Equals"));
        assert!(config.entity("contact").is_none());
    }

    #[test]
    fn test_unknown_default_operator_keeps_the_option() {
        let config = AppConfig::from_json_str(
            r#"{
                "SearchScheme": {
                    "Entities": [{
                        "LogicalName": "account",
                        "FilterOptions": [
                            { "AttributeName": "createdon", "Default": { "Condition": "on-or-after", "Values": ["2024-01-01"] } },
                            { "AttributeName": "name", "Default": { "Condition": "eq" } }
                        ]
                    }]
                }
            }"#,
        )
        .unwrap();

        let options = &config.entity("account").unwrap().filter_options;
        assert_eq!(options.len(), 2);
        let created = options[0].default.as_ref().unwrap();
        assert_eq!(created.condition, None);
        assert_eq!(created.values.as_ref().map(Vec::len), Some(1));
        assert_eq!(
            options[1].default.as_ref().unwrap().condition,
            Some(ConditionOperator::Eq)
        );
    }

    #[test]
    fn test_invalid_config_is_an_error() {
        let error = AppConfig::from_json_str("{\"SearchScheme\": 5}").unwrap_err();
        assert!(matches!(error, SearchError::Json { .. }));
    }

    #[test]
    fn test_serialization_skips_unset_fields() {
        let json = serde_json::to_value(FilterOptionConfig::attribute("name", "String")).unwrap();
        assert_eq!(json, serde_json::json!({ "AttributeName": "name", "AttributeType": "String" }));
    }
}
