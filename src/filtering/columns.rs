//! Result column resolution.
//!
//! Table columns are configured as `RelatedTo` chains just like filter options. Resolution
//! flattens them into one [`SearchTableColumn`] per displayed attribute, each with the key under
//! which its value appears in a result row.

use serde::Serialize;

use super::joined::{LinkKey, resolve_join_path};
use crate::config::{ChainLink, TableColumnConfig, non_empty};

/// One attribute of a result column, ready to be queried and read back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchTableColumn {
    /// Position of the configured column this attribute belongs to
    pub source_column: usize,
    /// Position of the attribute within its column (`{n}` in `AttributesFormat`)
    pub attribute_index: usize,
    /// Join hops from the searched entity to the column's entity, empty for root columns
    pub join_path: Vec<LinkKey>,
    pub attribute_name: String,
    pub entity_name: String,
    pub display_name: Option<String>,
    pub attributes_format: Option<String>,
    /// Property name of the value in a result row
    pub value_key: String,
    /// Retrievable with a plain OData `$select`
    pub is_root_column: bool,
}

/// Alias for a related-entity attribute: `col_<index>_<attribute>` with anything outside
/// `[A-Za-z0-9_]` replaced by `_`.
#[must_use]
pub fn related_value_key(source_column: usize, attribute_name: &str) -> String {
    let sanitized: String = attribute_name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    format!("col_{source_column}_{sanitized}")
}

/// Flatten configured table columns for `entity_logical_name`.
///
/// The deepest link of each chain supplies the attribute names and entity. The display name and
/// format are the first non-empty ones found scanning from the deepest link outwards. Columns
/// without an attribute name, and related columns whose join path is incomplete, are dropped.
#[must_use]
pub fn resolve_search_table_columns(
    entity_logical_name: &str,
    columns: &[TableColumnConfig],
) -> Vec<SearchTableColumn> {
    let mut resolved = Vec::new();

    for (source_column, column) in columns.iter().enumerate() {
        let target = column.target();
        let attribute_names = target.attribute_names();
        if attribute_names.is_empty() {
            tracing::debug!(source_column, "skipping table column without attribute name");
            continue;
        }

        let target_entity = target.link_entity_name();
        let is_root_column = column.chain_len() <= 1
            && target_entity.is_none_or(|entity| entity == entity_logical_name);
        let join_path = if is_root_column {
            Vec::new()
        } else {
            match resolve_join_path(column) {
                Some(path) if !path.is_empty() => path,
                _ => {
                    tracing::debug!(source_column, "skipping table column with incomplete join path");
                    continue;
                }
            }
        };

        let chain = column.chain();
        let display_name = chain
            .iter()
            .rev()
            .find_map(|link| link.link_display_name())
            .map(str::to_string);
        let attributes_format = chain
            .iter()
            .rev()
            .find_map(|link| non_empty(link.attributes_format.as_deref()))
            .map(str::to_string);

        for (attribute_index, attribute_name) in attribute_names.into_iter().enumerate() {
            let value_key = if is_root_column {
                attribute_name.to_string()
            } else {
                related_value_key(source_column, attribute_name)
            };
            resolved.push(SearchTableColumn {
                source_column,
                attribute_index,
                join_path: join_path.clone(),
                attribute_name: attribute_name.to_string(),
                entity_name: target_entity.unwrap_or(entity_logical_name).to_string(),
                display_name: display_name.clone(),
                attributes_format: attributes_format.clone(),
                value_key,
                is_root_column,
            });
        }
    }

    resolved
}

/// Unique root attribute names, in column order, for an OData `$select`.
///
/// Related-entity columns cannot be selected this way and need the FetchXML path.
#[must_use]
pub fn get_search_select_columns(columns: &[SearchTableColumn]) -> Vec<String> {
    let mut select: Vec<String> = Vec::new();
    for column in columns.iter().filter(|column| column.is_root_column) {
        if !select.contains(&column.attribute_name) {
            select.push(column.attribute_name.clone());
        }
    }
    select
}
