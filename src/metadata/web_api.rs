//! Dataverse Web API repository.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{
    AttributeMetadata, Collection, CrmRepository, EntityMetadata, EntityQuery,
    LookupAttributeMetadata, PicklistAttributeMetadata, filter_entities, find_attributes,
};
use crate::errors::SearchError;
use crate::filtering::literals::escape_odata_string;

pub const DEFAULT_API_VERSION: &str = "v9.2";

fn default_api_version() -> String {
    DEFAULT_API_VERSION.to_string()
}

/// Where the Web API lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WebApiConfig {
    /// Organization URL, e.g. `https://contoso.crm.dynamics.com`
    pub client_url: String,
    #[serde(default = "default_api_version")]
    pub api_version: String,
}

impl WebApiConfig {
    pub fn new(client_url: impl Into<String>) -> Self {
        Self {
            client_url: client_url.into(),
            api_version: default_api_version(),
        }
    }

    /// Read `CRM_CLIENT_URL` and optionally `CRM_API_VERSION`.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Config`] when `CRM_CLIENT_URL` is not set.
    pub fn from_env() -> Result<Self, SearchError> {
        let client_url = std::env::var("CRM_CLIENT_URL")
            .map_err(|_| SearchError::config("CRM_CLIENT_URL not set"))?;
        let api_version = std::env::var("CRM_API_VERSION").unwrap_or_else(|_| default_api_version());
        Ok(Self {
            client_url,
            api_version,
        })
    }

    /// `{client}/api/data/{version}`
    #[must_use]
    pub fn base_url(&self) -> String {
        format!(
            "{}/api/data/{}",
            self.client_url.trim_end_matches('/'),
            self.api_version
        )
    }
}

/// Percent-encode a query parameter value, spaces as `%20`
fn encode_query_value(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

#[derive(Debug, Clone)]
pub struct WebApiRepository {
    config: WebApiConfig,
    client: reqwest::Client,
}

impl WebApiRepository {
    #[must_use]
    pub fn new(config: WebApiConfig) -> Self {
        Self::with_client(config, reqwest::Client::new())
    }

    /// Use a preconfigured client, e.g. one that attaches an access token
    #[must_use]
    pub fn with_client(config: WebApiConfig, client: reqwest::Client) -> Self {
        Self { config, client }
    }

    #[must_use]
    pub fn config(&self) -> &WebApiConfig {
        &self.config
    }

    #[must_use]
    pub fn entities_metadata_url(&self) -> String {
        format!(
            "{}/EntityDefinitions?$select=LogicalName,EntitySetName,DisplayName,DisplayCollectionName",
            self.config.base_url()
        )
    }

    #[must_use]
    pub fn attributes_metadata_url(&self, entity_logical_name: &str) -> String {
        format!(
            "{}/EntityDefinitions(LogicalName='{}')/Attributes?$select=LogicalName,AttributeType,DisplayName",
            self.config.base_url(),
            escape_odata_string(entity_logical_name)
        )
    }

    fn attribute_url(&self, entity_logical_name: &str, attribute_name: &str) -> String {
        format!(
            "{}/EntityDefinitions(LogicalName='{}')/Attributes(LogicalName='{}')",
            self.config.base_url(),
            escape_odata_string(entity_logical_name),
            escape_odata_string(attribute_name)
        )
    }

    #[must_use]
    pub fn lookup_metadata_url(&self, entity_logical_name: &str, attribute_name: &str) -> String {
        format!(
            "{}/Microsoft.Dynamics.CRM.LookupAttributeMetadata?$select=LogicalName,Targets",
            self.attribute_url(entity_logical_name, attribute_name)
        )
    }

    #[must_use]
    pub fn picklist_metadata_url(&self, entity_logical_name: &str, attribute_name: &str) -> String {
        format!(
            "{}/Microsoft.Dynamics.CRM.PicklistAttributeMetadata?$select=LogicalName&$expand=OptionSet($select=Options)",
            self.attribute_url(entity_logical_name, attribute_name)
        )
    }

    /// Rows URL. A FetchXML query carries its own columns, so `select` only applies to OData
    /// queries.
    #[must_use]
    pub fn entities_url(&self, entity_set_name: &str, select: &[String], query: &EntityQuery) -> String {
        let mut url = format!("{}/{entity_set_name}", self.config.base_url());
        let mut params: Vec<String> = Vec::new();
        match query {
            EntityQuery::FetchXml(xml) => params.push(format!("fetchXml={}", encode_query_value(xml))),
            EntityQuery::All | EntityQuery::Filter(_) => {
                if !select.is_empty() {
                    params.push(format!("$select={}", encode_query_value(&select.join(","))));
                }
                if let EntityQuery::Filter(filter) = query {
                    params.push(format!("$filter={}", encode_query_value(filter)));
                }
            }
        }
        if !params.is_empty() {
            url.push('?');
            url.push_str(&params.join("&"));
        }
        url
    }

    async fn get_json<T: DeserializeOwned>(&self, operation: &str, url: &str) -> Result<T, SearchError> {
        tracing::debug!(operation, url, "CRM request");
        let response = self
            .client
            .get(url)
            .header("Accept", "application/json")
            .header("OData-MaxVersion", "4.0")
            .header("OData-Version", "4.0")
            .send()
            .await
            .map_err(|e| SearchError::http(operation, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SearchError::status(status.as_u16(), url, body));
        }

        let body = response
            .text()
            .await
            .map_err(|e| SearchError::http(operation, e))?;
        serde_json::from_str(&body)
            .map_err(|e| SearchError::json(format!("CrmRepository.{operation}: invalid response"), e))
    }
}

#[async_trait]
impl CrmRepository for WebApiRepository {
    async fn get_entities_metadata(
        &self,
        logical_names: &[String],
    ) -> Result<Vec<EntityMetadata>, SearchError> {
        let entities: Collection<EntityMetadata> = self
            .get_json("getEntitiesMetadata", &self.entities_metadata_url())
            .await?;
        Ok(filter_entities(entities.value, logical_names))
    }

    async fn get_attributes_metadata(
        &self,
        entity_logical_name: &str,
        attribute_names: &[String],
    ) -> Result<Vec<AttributeMetadata>, SearchError> {
        let attributes: Collection<AttributeMetadata> = self
            .get_json(
                "getAttributesMetadata",
                &self.attributes_metadata_url(entity_logical_name),
            )
            .await?;
        Ok(find_attributes(entity_logical_name, &attributes.value, attribute_names))
    }

    async fn get_lookup_attribute_metadata(
        &self,
        entity_logical_name: &str,
        attribute_name: &str,
    ) -> Result<LookupAttributeMetadata, SearchError> {
        self.get_json(
            "getLookupAttributeMetadata",
            &self.lookup_metadata_url(entity_logical_name, attribute_name),
        )
        .await
    }

    async fn get_picklist_attribute_metadata(
        &self,
        entity_logical_name: &str,
        attribute_name: &str,
    ) -> Result<PicklistAttributeMetadata, SearchError> {
        self.get_json(
            "getPicklistAttributeMetadata",
            &self.picklist_metadata_url(entity_logical_name, attribute_name),
        )
        .await
    }

    async fn get_entities(
        &self,
        entity_set_name: &str,
        select: &[String],
        query: &EntityQuery,
    ) -> Result<Value, SearchError> {
        self.get_json("getEntities", &self.entities_url(entity_set_name, select, query))
            .await
    }
}
