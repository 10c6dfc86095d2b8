use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::fmt;

use super::literals::{AttributeKind, format_number};
use crate::config::{ChainLink, FilterOptionConfig, non_empty};

/// Comparison operators offered by the advanced find.
///
/// Serialized with the CRM's own tokens (`eq`, `begins-with`, `not-null`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConditionOperator {
    Eq,
    Ne,
    Ge,
    Gt,
    Le,
    Lt,
    In,
    BeginsWith,
    NotBeginWith,
    EndsWith,
    NotEndWith,
    Like,
    NotLike,
    Null,
    NotNull,
    Today,
    Tomorrow,
    Yesterday,
}

impl ConditionOperator {
    pub const ALL: [Self; 18] = [
        Self::Eq,
        Self::Ne,
        Self::Ge,
        Self::Gt,
        Self::Le,
        Self::Lt,
        Self::In,
        Self::BeginsWith,
        Self::NotBeginWith,
        Self::EndsWith,
        Self::NotEndWith,
        Self::Like,
        Self::NotLike,
        Self::Null,
        Self::NotNull,
        Self::Today,
        Self::Tomorrow,
        Self::Yesterday,
    ];

    /// The operator token, identical in both query languages
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Eq => "eq",
            Self::Ne => "ne",
            Self::Ge => "ge",
            Self::Gt => "gt",
            Self::Le => "le",
            Self::Lt => "lt",
            Self::In => "in",
            Self::BeginsWith => "begins-with",
            Self::NotBeginWith => "not-begin-with",
            Self::EndsWith => "ends-with",
            Self::NotEndWith => "not-end-with",
            Self::Like => "like",
            Self::NotLike => "not-like",
            Self::Null => "null",
            Self::NotNull => "not-null",
            Self::Today => "today",
            Self::Tomorrow => "tomorrow",
            Self::Yesterday => "yesterday",
        }
    }

    /// Parse an operator token (case-sensitive)
    #[must_use]
    pub fn from_token(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|operator| operator.as_str() == token)
    }

    /// `null`, `not-null` and the relative date operators ignore values
    #[must_use]
    pub fn takes_no_value(self) -> bool {
        matches!(
            self,
            Self::Null | Self::NotNull | Self::Today | Self::Tomorrow | Self::Yesterday
        )
    }
}

/// Deserialize an optional operator, mapping tokens outside the vocabulary to `None`.
///
/// A row with an unknown operator is then skipped like one with no operator selected, instead
/// of failing the whole document.
pub(crate) fn deserialize_operator<'de, D>(
    deserializer: D,
) -> Result<Option<ConditionOperator>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = serde_json::Value::deserialize(deserializer)?;
    match raw {
        serde_json::Value::Null => Ok(None),
        serde_json::Value::String(token) => {
            let operator = ConditionOperator::from_token(&token);
            if operator.is_none() {
                tracing::debug!(token = %token, "ignoring unknown condition operator");
            }
            Ok(operator)
        }
        other => {
            tracing::debug!(value = %other, "ignoring non-text condition operator");
            Ok(None)
        }
    }
}

impl fmt::Display for ConditionOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user-entered value: free text or a number picked from an option set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConditionValue {
    Number(f64),
    Text(String),
}

impl ConditionValue {
    /// Text that is empty after trimming; numbers are never blank
    #[must_use]
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Number(_) => false,
            Self::Text(text) => text.trim().is_empty(),
        }
    }
}

impl fmt::Display for ConditionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(number) => f.write_str(&format_number(*number)),
            Self::Text(text) => f.write_str(text),
        }
    }
}

impl From<&str> for ConditionValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for ConditionValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<f64> for ConditionValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i32> for ConditionValue {
    fn from(value: i32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<i64> for ConditionValue {
    #[allow(clippy::cast_precision_loss)]
    fn from(value: i64) -> Self {
        Self::Number(value as f64)
    }
}

/// One filter row as composed by the user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedFilterCondition {
    pub filter_option: Option<FilterOptionConfig>,
    #[serde(default, deserialize_with = "deserialize_operator")]
    pub condition: Option<ConditionOperator>,
    #[serde(default)]
    pub values: Vec<ConditionValue>,
    #[serde(default)]
    pub is_disabled: bool,
}

impl AppliedFilterCondition {
    pub fn new<V: Into<ConditionValue>>(
        filter_option: FilterOptionConfig,
        condition: ConditionOperator,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        Self {
            filter_option: Some(filter_option),
            condition: Some(condition),
            values: values.into_iter().map(Into::into).collect(),
            is_disabled: false,
        }
    }

    /// Filter row seeded from the option's `Default` block
    #[must_use]
    pub fn from_default(filter_option: &FilterOptionConfig) -> Self {
        let default = filter_option.default.clone().unwrap_or_default();
        Self {
            filter_option: Some(filter_option.clone()),
            condition: default.condition,
            values: default.values.unwrap_or_default(),
            is_disabled: default.is_disabled.unwrap_or(false),
        }
    }

    #[must_use]
    pub fn disabled(mut self) -> Self {
        self.is_disabled = true;
        self
    }

    /// Whether the row carries enough input to be shown as an applied filter
    #[must_use]
    pub fn has_condition_value(&self) -> bool {
        match self.condition {
            Some(condition) if condition.takes_no_value() => true,
            _ => self.values.iter().any(|value| !value.is_blank()),
        }
    }
}

/// Expand the values of a condition.
///
/// `in` with a single text value is the free-text "comma separated values" entry: it is split on
/// commas, trimmed and empty fragments are dropped. Everything else is returned unchanged.
#[must_use]
pub fn parse_values(condition: ConditionOperator, values: &[ConditionValue]) -> Vec<ConditionValue> {
    match (condition, values) {
        (ConditionOperator::In, [ConditionValue::Text(text)]) => text
            .split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(ConditionValue::from)
            .collect(),
        _ => values.to_vec(),
    }
}

/// Why a condition contributed nothing to a compiled query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    MissingFilterOption,
    MissingCondition,
    MissingAttributeName,
    Disabled,
    EmptyValue,
    /// The condition targets a related entity, which OData filters cannot reach
    RequiresJoin,
    /// A join step lacks its entity name or one of its join attributes
    IncompleteJoin,
}

impl SkipReason {
    #[must_use]
    pub fn description(self) -> &'static str {
        match self {
            Self::MissingFilterOption => "no filter option selected",
            Self::MissingCondition => "no condition selected",
            Self::MissingAttributeName => "filter option has no attribute name",
            Self::Disabled => "condition is disabled",
            Self::EmptyValue => "condition has no value",
            Self::RequiresJoin => "condition targets a related entity",
            Self::IncompleteJoin => "join path is incomplete",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// A condition dropped by a backend, by position in the input slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SkippedCondition {
    pub index: usize,
    pub reason: SkipReason,
}

impl SkippedCondition {
    pub(crate) fn record(index: usize, reason: SkipReason) -> Self {
        tracing::debug!(index, reason = %reason, "skipping filter condition");
        Self { index, reason }
    }
}

/// A condition that passed the shared skip rules.
#[derive(Debug)]
pub(crate) struct PreparedCondition<'a> {
    pub option: &'a FilterOptionConfig,
    pub attribute_name: &'a str,
    pub attribute_type: Option<&'a str>,
    pub operator: ConditionOperator,
    /// Empty for no-value operators, never empty otherwise
    pub values: Vec<ConditionValue>,
}

impl PreparedCondition<'_> {
    /// Whether the condition must be evaluated on another entity than `entity_logical_name`
    pub fn targets_related_entity(&self, entity_logical_name: &str) -> bool {
        self.option.chain_len() > 1
            || non_empty(self.option.target().entity_name.as_deref())
                .is_some_and(|entity| entity != entity_logical_name)
    }
}

/// Apply the skip rules shared by both backends.
pub(crate) fn prepare_condition(
    condition: &AppliedFilterCondition,
) -> Result<PreparedCondition<'_>, SkipReason> {
    let option = condition
        .filter_option
        .as_ref()
        .ok_or(SkipReason::MissingFilterOption)?;
    let operator = condition.condition.ok_or(SkipReason::MissingCondition)?;
    let target = option.target();
    let attribute_name =
        non_empty(target.attribute_name.as_deref()).ok_or(SkipReason::MissingAttributeName)?;
    if condition.is_disabled {
        return Err(SkipReason::Disabled);
    }

    let values = if operator.takes_no_value() {
        Vec::new()
    } else {
        let values: Vec<ConditionValue> = parse_values(operator, &condition.values)
            .into_iter()
            .filter(|value| !value.is_blank())
            .collect();
        if values.is_empty() {
            return Err(SkipReason::EmptyValue);
        }
        values
    };

    Ok(PreparedCondition {
        option,
        attribute_name,
        attribute_type: target.attribute_type.as_deref(),
        operator,
        values,
    })
}

/// An operator offered for an attribute, with its display label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CrmFilterConditionOption {
    pub value: ConditionOperator,
    pub display_name: String,
}

/// Operators available for an attribute type.
///
/// Every type gets `eq`, `ne`, `null` and `not-null`; text, numbers and dates add their own
/// operators, option sets and lookups add `in` only when multi-selection is enabled. Labels come
/// from `localization` keyed by operator token and fall back to the token itself.
#[must_use]
pub fn get_crm_filter_conditions_options(
    attribute_type: Option<&str>,
    localization: &HashMap<String, String>,
    is_multi_selection: bool,
) -> Vec<CrmFilterConditionOption> {
    use ConditionOperator as Op;

    let mut operators = vec![Op::Eq, Op::Ne, Op::Null, Op::NotNull];
    match AttributeKind::from_tag(attribute_type) {
        AttributeKind::String | AttributeKind::Memo | AttributeKind::UniqueIdentifier => {
            operators.extend([
                Op::In,
                Op::BeginsWith,
                Op::NotBeginWith,
                Op::EndsWith,
                Op::NotEndWith,
                Op::Like,
                Op::NotLike,
            ]);
        }
        AttributeKind::Picklist | AttributeKind::Lookup if is_multi_selection => {
            operators.push(Op::In);
        }
        AttributeKind::Number => {
            operators.extend([Op::In, Op::Ge, Op::Gt, Op::Le, Op::Lt]);
        }
        AttributeKind::DateTime => {
            operators.extend([Op::Ge, Op::Gt, Op::Le, Op::Lt, Op::Today, Op::Tomorrow, Op::Yesterday]);
        }
        _ => {}
    }

    operators
        .into_iter()
        .map(|operator| CrmFilterConditionOption {
            value: operator,
            display_name: localization
                .get(operator.as_str())
                .cloned()
                .unwrap_or_else(|| operator.as_str().to_string()),
        })
        .collect()
}
