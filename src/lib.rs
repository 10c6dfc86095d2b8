//! # crmsearch
//!
//! The engine behind a CRM "advanced find": users pick an entity, compose filter conditions over
//! its attributes (possibly through related entities), and the search is translated into the
//! CRM's native query languages.
//!
//! - [`filtering`]: compiles filter rows into OData `$filter` expressions or FetchXML documents
//!   and resolves result columns
//! - [`config`]: the JSON search scheme describing filter options and result columns
//! - [`metadata`]: the [`CrmRepository`](metadata::CrmRepository) seam, with Web API and fixture
//!   implementations, and metadata backfill
//! - [`search`]: chooses a query language, runs the search, guards against stale responses
//! - [`results`]: headers, cells and filter summaries of the result grid
//! - [`validation`]: up-front configuration linting
//!
//! ```rust
//! use crmsearch::config::{EntityConfig, FilterOptionConfig, TableColumnConfig};
//! use crmsearch::filtering::{AppliedFilterCondition, ConditionOperator};
//! use crmsearch::search::{PlannedQuery, SearchPlan};
//!
//! let mut account = EntityConfig {
//!     logical_name: "account".to_string(),
//!     ..EntityConfig::default()
//! };
//! account.result_view.table_columns = vec![TableColumnConfig::attribute("name")];
//!
//! let conditions = [AppliedFilterCondition::new(
//!     FilterOptionConfig::attribute("revenue", "Money"),
//!     ConditionOperator::Gt,
//!     [1000],
//! )];
//! let plan = SearchPlan::build(&account, &conditions).unwrap();
//!
//! assert_eq!(
//!     plan.query,
//!     PlannedQuery::OData {
//!         select: vec!["name".to_string()],
//!         filter: Some("(revenue gt 1000)".to_string()),
//!     }
//! );
//! ```

pub mod config;
pub mod errors;
pub mod filtering;
pub mod metadata;
pub mod results;
pub mod search;
pub mod validation;

pub use config::AppConfig;
pub use errors::SearchError;
pub use filtering::{AppliedFilterCondition, ConditionOperator, ConditionValue, SearchTableColumn};
pub use metadata::{CrmRepository, EntityQuery, FileRepository};
#[cfg(feature = "web-api")]
pub use metadata::{WebApiConfig, WebApiRepository};
pub use search::{PlannedQuery, RequestToken, RequestTokens, SearchPlan, execute_search};
pub use serde_with;
