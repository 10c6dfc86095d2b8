//! Configuration Linting
//!
//! The compiler silently skips filter options and columns it cannot use. These checks report
//! the same gaps up front, so a broken configuration can be rejected when it is loaded instead
//! of producing searches that quietly ignore part of the input.
//!
//! # Example
//!
//! ```rust
//! use crmsearch::config::AppConfig;
//! use crmsearch::validation::validate_app_config;
//!
//! let config = AppConfig::from_json_str(r#"{
//!     "SearchScheme": { "Entities": [{
//!         "LogicalName": "account",
//!         "FilterOptions": [{ "DisplayName": "Nothing to filter" }]
//!     }] }
//! }"#).unwrap();
//!
//! let errors = validate_app_config(&config).unwrap_err();
//! assert_eq!(errors.len(), 1);
//! assert_eq!(errors.errors()[0].field, "account.FilterOptions[0]");
//! ```

use serde::Serialize;
use std::fmt;

use crate::config::{AppConfig, ChainLink, EntityConfig, non_empty};
use crate::filtering::resolve_join_path;

/// Validation error with field path and message
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    /// Path of the offending setting, e.g. `account.TableColumns[2]`
    pub field: String,
    /// Human-readable error message
    pub message: String,
}

impl ValidationError {
    #[must_use]
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Collection of validation errors
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationErrors {
    errors: Vec<ValidationError>,
}

impl ValidationErrors {
    #[must_use]
    pub fn new() -> Self {
        Self { errors: Vec::new() }
    }

    pub fn add(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    #[must_use]
    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    /// `Ok` when nothing was collected
    ///
    /// # Errors
    ///
    /// Returns `self` when it holds at least one error.
    pub fn result(self) -> Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Validation failed with {} error(s):", self.errors.len())?;
        for error in &self.errors {
            write!(f, "\n  - {error}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

fn check_chain<T: ChainLink>(errors: &mut ValidationErrors, field: &str, root: &T) {
    if root.chain_len() > 1 && !resolve_join_path(root).is_some_and(|path| !path.is_empty()) {
        errors.add(ValidationError::new(
            field,
            "RelatedTo chain needs EntityName, FromAttribute and ToAttribute for every join",
        ));
    }
}

fn collect_entity_errors(errors: &mut ValidationErrors, entity: &EntityConfig) {
    let name = if entity.logical_name.trim().is_empty() {
        errors.add(ValidationError::new("LogicalName", "entity has no logical name"));
        "<unnamed>"
    } else {
        entity.logical_name.as_str()
    };

    for (index, option) in entity.filter_options.iter().enumerate() {
        if option.is_category() {
            continue;
        }
        let field = format!("{name}.FilterOptions[{index}]");
        if non_empty(option.target().attribute_name.as_deref()).is_none() {
            errors.add(ValidationError::new(&field, "filter option has no AttributeName"));
            continue;
        }
        check_chain(errors, &field, option);
    }

    for (index, column) in entity.result_view.table_columns.iter().enumerate() {
        let field = format!("{name}.TableColumns[{index}]");
        if column.target().attribute_names().is_empty() {
            errors.add(ValidationError::new(&field, "table column has no AttributeName"));
            continue;
        }
        check_chain(errors, &field, column);
    }

    if let Some(list) = entity
        .result_view
        .pagination
        .as_ref()
        .and_then(|pagination| pagination.list.as_ref())
    {
        for size in list.iter().filter(|size| !size.is_finite() || size.trunc() < 1.0) {
            errors.add(ValidationError::new(
                format!("{name}.Pagination.List"),
                format!("page size {size} is not a positive number"),
            ));
        }
    }
}

/// Check one entity's filter options, table columns and page sizes.
///
/// # Errors
///
/// Returns every problem found.
pub fn validate_entity_config(entity: &EntityConfig) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    collect_entity_errors(&mut errors, entity);
    errors.result()
}

/// Check every entity of the search scheme, and that logical names are unique.
///
/// # Errors
///
/// Returns every problem found.
pub fn validate_app_config(config: &AppConfig) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    let entities = config
        .search_scheme
        .as_ref()
        .map(|scheme| scheme.entities.as_slice())
        .unwrap_or_default();

    for (index, entity) in entities.iter().enumerate() {
        if entities[..index]
            .iter()
            .any(|earlier| earlier.logical_name == entity.logical_name)
        {
            errors.add(ValidationError::new(
                format!("{}.LogicalName", entity.logical_name),
                "entity is configured more than once",
            ));
        }
        collect_entity_errors(&mut errors, entity);
    }
    errors.result()
}
