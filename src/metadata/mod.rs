//! # CRM Metadata and Data Access
//!
//! The compiler only needs a handful of facts from the CRM: attribute types and labels, option
//! set values, lookup targets, entity set names, and finally the rows matching a query.
//! [`CrmRepository`] is the seam for all of them.
//!
//! ## Implementations
//!
//! - **`WebApiRepository`** (feature `web-api`): Dataverse Web API over HTTP
//! - **[`FileRepository`]**: JSON fixtures in a directory, for demos and tests
//!
//! Metadata payloads keep the Web API's PascalCase property names so fixture files can be
//! captured straight from a live organization.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::SearchError;

pub mod backfill;
pub mod file;
#[cfg(feature = "web-api")]
pub mod web_api;

pub use backfill::{
    ConditionValueOption, fill_options_with_metadata_info, format_lookup_display_value,
    load_selectable_options, sanitize_selectable_values,
};
pub use file::FileRepository;
#[cfg(feature = "web-api")]
pub use web_api::{WebApiConfig, WebApiRepository};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LocalizedLabel {
    pub label: String,
}

/// A metadata label; only the user's language is requested.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Label {
    #[serde(default)]
    pub user_localized_label: Option<LocalizedLabel>,
}

impl Label {
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        self.user_localized_label
            .as_ref()
            .map(|label| label.label.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AttributeMetadata {
    pub logical_name: String,
    #[serde(default)]
    pub attribute_type: Option<String>,
    #[serde(default)]
    pub display_name: Option<Label>,
}

impl AttributeMetadata {
    #[must_use]
    pub fn display_label(&self) -> Option<&str> {
        self.display_name.as_ref().and_then(Label::text)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EntityMetadata {
    pub logical_name: String,
    #[serde(default)]
    pub entity_set_name: Option<String>,
    #[serde(default)]
    pub logical_collection_name: Option<String>,
    #[serde(default)]
    pub display_name: Option<Label>,
    #[serde(default)]
    pub display_collection_name: Option<Label>,
}

impl EntityMetadata {
    /// Collection name used in Web API URLs: `EntitySetName`, else `LogicalCollectionName`
    #[must_use]
    pub fn collection_name(&self) -> Option<&str> {
        self.entity_set_name
            .as_deref()
            .or(self.logical_collection_name.as_deref())
            .filter(|name| !name.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LookupAttributeMetadata {
    #[serde(default)]
    pub targets: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PicklistOption {
    pub value: i64,
    #[serde(default)]
    pub label: Label,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct OptionSetMetadata {
    #[serde(default)]
    pub options: Vec<PicklistOption>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PicklistAttributeMetadata {
    #[serde(default)]
    pub option_set: Option<OptionSetMetadata>,
}

/// OData collection envelope, `{ "value": [...] }`
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Collection<T> {
    #[serde(default = "Vec::new")]
    pub value: Vec<T>,
}

/// How rows are selected by [`CrmRepository::get_entities`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityQuery {
    /// Every row, limited to the selected columns
    All,
    /// OData `$filter` expression
    Filter(String),
    /// Complete FetchXML document
    FetchXml(String),
}

impl EntityQuery {
    /// `Filter` for `Some`, `All` otherwise
    #[must_use]
    pub fn from_filter(filter: Option<String>) -> Self {
        filter.map_or(Self::All, Self::Filter)
    }
}

/// Source of CRM metadata and rows.
#[async_trait]
pub trait CrmRepository: Send + Sync {
    /// Metadata of the named entities. Unknown names are left out.
    async fn get_entities_metadata(
        &self,
        logical_names: &[String],
    ) -> Result<Vec<EntityMetadata>, SearchError>;

    /// Metadata of the named attributes of an entity, in request order. Unknown names are
    /// logged and left out.
    async fn get_attributes_metadata(
        &self,
        entity_logical_name: &str,
        attribute_names: &[String],
    ) -> Result<Vec<AttributeMetadata>, SearchError>;

    async fn get_lookup_attribute_metadata(
        &self,
        entity_logical_name: &str,
        attribute_name: &str,
    ) -> Result<LookupAttributeMetadata, SearchError>;

    async fn get_picklist_attribute_metadata(
        &self,
        entity_logical_name: &str,
        attribute_name: &str,
    ) -> Result<PicklistAttributeMetadata, SearchError>;

    /// Rows of an entity set, either as a bare array or an OData `{ "value": [...] }` envelope.
    async fn get_entities(
        &self,
        entity_set_name: &str,
        select: &[String],
        query: &EntityQuery,
    ) -> Result<Value, SearchError>;
}

/// Pick `attribute_names` out of an entity's attribute list, in request order.
///
/// Missing attributes are logged at `error` level and skipped.
#[must_use]
pub fn find_attributes(
    entity_logical_name: &str,
    source: &[AttributeMetadata],
    attribute_names: &[String],
) -> Vec<AttributeMetadata> {
    let mut attributes = Vec::with_capacity(attribute_names.len());
    for attribute_name in attribute_names {
        match source.iter().find(|a| &a.logical_name == attribute_name) {
            Some(attribute) => attributes.push(attribute.clone()),
            None => tracing::error!(
                entity = %entity_logical_name,
                attribute = %attribute_name,
                "couldn't find the attribute on the entity"
            ),
        }
    }
    attributes
}

/// Keep the entities whose logical name was requested.
pub(crate) fn filter_entities(
    entities: Vec<EntityMetadata>,
    logical_names: &[String],
) -> Vec<EntityMetadata> {
    entities
        .into_iter()
        .filter(|entity| logical_names.contains(&entity.logical_name))
        .collect()
}
