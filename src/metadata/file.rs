//! Repository over JSON fixture files.
//!
//! A directory holds one file per metadata request, in the same shape the Web API returns:
//!
//! | Request | File |
//! |---|---|
//! | entity metadata | `entities-md.json` |
//! | attribute metadata | `<entity>-attributes-md.json` |
//! | lookup targets | `<entity>-<attribute>-lookup-md.json` |
//! | option set | `<entity>-<attribute>-picklist-md.json` |
//! | rows | `<entitySet>.json` |
//!
//! Rows are returned as stored: filters and FetchXML are not evaluated.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;

use super::{
    AttributeMetadata, Collection, CrmRepository, EntityMetadata, EntityQuery,
    LookupAttributeMetadata, PicklistAttributeMetadata, filter_entities, find_attributes,
};
use crate::errors::SearchError;

#[derive(Debug, Clone)]
pub struct FileRepository {
    root: PathBuf,
}

impl FileRepository {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    async fn read_json<T: DeserializeOwned>(&self, file_name: &str) -> Result<T, SearchError> {
        let path = self.root.join(file_name);
        let contents = fs::read_to_string(&path).await.map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                SearchError::not_found("fixture", Some(file_name.to_string()))
            } else {
                SearchError::io(path.display().to_string(), e)
            }
        })?;
        serde_json::from_str(&contents)
            .map_err(|e| SearchError::json(format!("invalid fixture '{file_name}'"), e))
    }
}

#[async_trait]
impl CrmRepository for FileRepository {
    async fn get_entities_metadata(
        &self,
        logical_names: &[String],
    ) -> Result<Vec<EntityMetadata>, SearchError> {
        let entities: Collection<EntityMetadata> = self.read_json("entities-md.json").await?;
        Ok(filter_entities(entities.value, logical_names))
    }

    async fn get_attributes_metadata(
        &self,
        entity_logical_name: &str,
        attribute_names: &[String],
    ) -> Result<Vec<AttributeMetadata>, SearchError> {
        let attributes: Collection<AttributeMetadata> = self
            .read_json(&format!("{entity_logical_name}-attributes-md.json"))
            .await?;
        Ok(find_attributes(entity_logical_name, &attributes.value, attribute_names))
    }

    async fn get_lookup_attribute_metadata(
        &self,
        entity_logical_name: &str,
        attribute_name: &str,
    ) -> Result<LookupAttributeMetadata, SearchError> {
        self.read_json(&format!("{entity_logical_name}-{attribute_name}-lookup-md.json"))
            .await
    }

    async fn get_picklist_attribute_metadata(
        &self,
        entity_logical_name: &str,
        attribute_name: &str,
    ) -> Result<PicklistAttributeMetadata, SearchError> {
        self.read_json(&format!("{entity_logical_name}-{attribute_name}-picklist-md.json"))
            .await
    }

    async fn get_entities(
        &self,
        entity_set_name: &str,
        _select: &[String],
        query: &EntityQuery,
    ) -> Result<Value, SearchError> {
        if *query != EntityQuery::All {
            tracing::debug!(entity_set = %entity_set_name, "fixture rows are not filtered");
        }
        self.read_json(&format!("{entity_set_name}.json")).await
    }
}
