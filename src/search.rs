//! Search planning and execution.
//!
//! A plain OData request is enough while every column and condition stays on the searched
//! entity. As soon as one of them reaches into a related entity the whole search is compiled to
//! FetchXML instead.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::config::EntityConfig;
use crate::errors::SearchError;
use crate::filtering::conditions::prepare_condition;
use crate::filtering::{
    AppliedFilterCondition, SearchTableColumn, SkippedCondition, compile_fetch_xml,
    compile_odata_filter, get_search_select_columns, resolve_search_table_columns,
};
use crate::metadata::{CrmRepository, EntityQuery};
use crate::results::{EntityRow, normalize_entity_rows};

/// The compiled form of a search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlannedQuery {
    OData {
        select: Vec<String>,
        filter: Option<String>,
    },
    FetchXml {
        xml: String,
    },
}

/// Everything needed to run a search and render its rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchPlan {
    pub entity_logical_name: String,
    pub columns: Vec<SearchTableColumn>,
    pub query: PlannedQuery,
    pub skipped: Vec<SkippedCondition>,
}

impl SearchPlan {
    /// Compile a search over `entity` with the given filter rows.
    ///
    /// FetchXML is chosen when a resolved column is not a root column or when a condition that
    /// would otherwise apply targets a related entity.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Xml`] when the FetchXML document cannot be written.
    pub fn build(
        entity: &EntityConfig,
        conditions: &[AppliedFilterCondition],
    ) -> Result<Self, SearchError> {
        let entity_logical_name = entity.logical_name.as_str();
        let columns =
            resolve_search_table_columns(entity_logical_name, &entity.result_view.table_columns);

        let needs_join = columns.iter().any(|column| !column.is_root_column)
            || conditions.iter().any(|condition| {
                prepare_condition(condition)
                    .is_ok_and(|prepared| prepared.targets_related_entity(entity_logical_name))
            });

        let (query, skipped) = if needs_join {
            let compiled = compile_fetch_xml(entity_logical_name, conditions, &columns)?;
            (PlannedQuery::FetchXml { xml: compiled.xml }, compiled.skipped)
        } else {
            let compiled = compile_odata_filter(entity_logical_name, conditions);
            let select = get_search_select_columns(&columns);
            (
                PlannedQuery::OData {
                    select,
                    filter: compiled.filter,
                },
                compiled.skipped,
            )
        };

        tracing::debug!(
            entity = %entity_logical_name,
            fetch_xml = needs_join,
            skipped = skipped.len(),
            "planned search"
        );

        Ok(Self {
            entity_logical_name: entity_logical_name.to_string(),
            columns,
            query,
            skipped,
        })
    }

    #[must_use]
    pub fn uses_fetch_xml(&self) -> bool {
        matches!(self.query, PlannedQuery::FetchXml { .. })
    }

    /// Columns for the repository's `$select`; empty for FetchXML
    #[must_use]
    pub fn select(&self) -> &[String] {
        match &self.query {
            PlannedQuery::OData { select, .. } => select,
            PlannedQuery::FetchXml { .. } => &[],
        }
    }

    #[must_use]
    pub fn entity_query(&self) -> EntityQuery {
        match &self.query {
            PlannedQuery::OData { filter, .. } => EntityQuery::from_filter(filter.clone()),
            PlannedQuery::FetchXml { xml } => EntityQuery::FetchXml(xml.clone()),
        }
    }
}

/// Entity set name of an entity, as used in Web API URLs.
///
/// # Errors
///
/// Returns [`SearchError::NotFound`] when the entity is unknown or has no collection name, and
/// propagates repository failures.
pub async fn resolve_entity_set_name<R: CrmRepository + ?Sized>(
    repository: &R,
    entity_logical_name: &str,
) -> Result<String, SearchError> {
    let entities = repository
        .get_entities_metadata(&[entity_logical_name.to_string()])
        .await?;
    entities
        .iter()
        .find_map(|entity| entity.collection_name())
        .map(str::to_string)
        .ok_or_else(|| SearchError::not_found("entity set", Some(entity_logical_name.to_string())))
}

/// Run a planned search against `entity_set_name`.
///
/// # Errors
///
/// Propagates repository failures.
pub async fn execute_search<R: CrmRepository + ?Sized>(
    repository: &R,
    entity_set_name: &str,
    plan: &SearchPlan,
) -> Result<Vec<EntityRow>, SearchError> {
    let response = repository
        .get_entities(entity_set_name, plan.select(), &plan.entity_query())
        .await?;
    let rows = normalize_entity_rows(response);
    tracing::debug!(entity_set = %entity_set_name, rows = rows.len(), "search completed");
    Ok(rows)
}

/// Plan a search, resolve the entity set and run it.
///
/// # Errors
///
/// See [`SearchPlan::build`], [`resolve_entity_set_name`] and [`execute_search`].
pub async fn search<R: CrmRepository + ?Sized>(
    repository: &R,
    entity: &EntityConfig,
    conditions: &[AppliedFilterCondition],
) -> Result<(SearchPlan, Vec<EntityRow>), SearchError> {
    let plan = SearchPlan::build(entity, conditions)?;
    let entity_set_name = resolve_entity_set_name(repository, &entity.logical_name).await?;
    let rows = execute_search(repository, &entity_set_name, &plan).await?;
    Ok((plan, rows))
}

/// Identifies one in-flight request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestToken(u64);

/// Discards responses of superseded requests.
///
/// Issue a token before each request and check it when the response arrives: only the most
/// recently issued token is current.
#[derive(Debug, Default)]
pub struct RequestTokens {
    latest: AtomicU64,
}

impl RequestTokens {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&self) -> RequestToken {
        RequestToken(self.latest.fetch_add(1, Ordering::SeqCst) + 1)
    }

    #[must_use]
    pub fn is_current(&self, token: RequestToken) -> bool {
        self.latest.load(Ordering::SeqCst) == token.0
    }
}
