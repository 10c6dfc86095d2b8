//! # Filter Condition Compiler
//!
//! This module turns the filter rows composed in the advanced find into the CRM's native query
//! languages, and the configured result columns into the projections needed to read rows back.
//!
//! ## Key Features
//!
//! - **Two backends**: OData `$filter` expressions for simple searches, FetchXML documents when
//!   conditions or columns reach through related entities
//! - **Join deduplication**: conditions and columns walking the same relationship share one
//!   `<link-entity>`
//! - **Type-aware literals**: booleans, numbers, dates and strings are written in each backend's
//!   own literal syntax
//! - **Best effort**: incomplete conditions never fail compilation; they are skipped and reported
//!   as [`SkippedCondition`] diagnostics
//!
//! ## Main Components
//!
//! - [`compile_odata_filter`] / [`build_crm_entities_filter`]: OData backend
//! - [`compile_fetch_xml`] / [`build_crm_fetch_xml`]: FetchXML backend
//! - [`resolve_search_table_columns`]: result column resolution
//! - [`get_crm_filter_conditions_options`]: operators offered per attribute type
//! - [`pagination_options`], [`visible_page_items`], [`page_range`]: result grid paging
//!
//! ## Example
//!
//! ```rust
//! use crmsearch::config::FilterOptionConfig;
//! use crmsearch::filtering::{AppliedFilterCondition, ConditionOperator, build_crm_entities_filter};
//!
//! let revenue = AppliedFilterCondition::new(
//!     FilterOptionConfig::attribute("revenue", "Money"),
//!     ConditionOperator::Gt,
//!     [1000],
//! );
//! let name = AppliedFilterCondition::new(
//!     FilterOptionConfig::attribute("name", "String"),
//!     ConditionOperator::In,
//!     ["Acme, Contoso"],
//! );
//!
//! assert_eq!(
//!     build_crm_entities_filter("account", &[revenue, name]).as_deref(),
//!     Some("(revenue gt 1000) and (name in ('Acme','Contoso'))"),
//! );
//! ```

pub mod columns;
pub mod conditions;
pub mod fetch_xml;
pub mod joined;
pub mod literals;
pub mod odata;
pub mod pagination;

// Re-export commonly used items
pub use columns::{SearchTableColumn, get_search_select_columns, resolve_search_table_columns};
pub use conditions::{
    AppliedFilterCondition, ConditionOperator, ConditionValue, CrmFilterConditionOption,
    SkipReason, SkippedCondition, get_crm_filter_conditions_options, parse_values,
};
pub use fetch_xml::{
    FetchPage, FetchXmlQuery, build_crm_fetch_xml, compile_fetch_xml, compile_fetch_xml_page,
};
pub use joined::{LinkKey, resolve_join_path};
pub use literals::{AttributeKind, to_fetch_xml_literal, to_odata_literal, to_odata_literal_in};
pub use odata::{ODataFilter, build_crm_entities_filter, compile_odata_filter};
pub use pagination::{
    PAGE_SIZE_ALL_VALUE, PageItem, PageRange, PageSizeOption, format_pagination_summary,
    page_range, pagination_options, total_pages, visible_page_items,
};
