//! OData `$filter` backend.
//!
//! OData filters can only reference attributes of the searched entity, so conditions that
//! traverse a relationship are left out here; the FetchXML backend handles them.

use super::conditions::{
    AppliedFilterCondition, ConditionOperator, PreparedCondition, SkipReason, SkippedCondition,
    prepare_condition,
};
use super::literals::to_odata_literal;

/// Result of compiling conditions to an OData filter.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ODataFilter {
    /// `None` means no `$filter` clause at all
    pub filter: Option<String>,
    pub skipped: Vec<SkippedCondition>,
}

fn create_filter_expression(condition: &PreparedCondition<'_>) -> String {
    use ConditionOperator as Op;

    let attribute = condition.attribute_name;
    let literals: Vec<String> = condition
        .values
        .iter()
        .map(|value| to_odata_literal(condition.attribute_type, value))
        .collect();
    let first = literals.first().map_or("", String::as_str);

    match condition.operator {
        Op::Null => format!("{attribute} eq null"),
        Op::NotNull => format!("{attribute} ne null"),
        Op::In => format!("{attribute} in ({})", literals.join(",")),
        Op::BeginsWith => format!("startswith({attribute},{first})"),
        Op::NotBeginWith => format!("not startswith({attribute},{first})"),
        Op::EndsWith => format!("endswith({attribute},{first})"),
        Op::NotEndWith => format!("not endswith({attribute},{first})"),
        Op::Like => format!("contains({attribute},{first})"),
        Op::NotLike => format!("not contains({attribute},{first})"),
        Op::Eq | Op::Ne | Op::Ge | Op::Gt | Op::Le | Op::Lt => {
            format!("{attribute} {} {first}", condition.operator)
        }
        Op::Today => format!("Microsoft.Dynamics.CRM.Today(PropertyName='{attribute}')"),
        Op::Tomorrow => format!("Microsoft.Dynamics.CRM.Tomorrow(PropertyName='{attribute}')"),
        Op::Yesterday => format!("Microsoft.Dynamics.CRM.Yesterday(PropertyName='{attribute}')"),
    }
}

/// Compile conditions into an OData filter, reporting the conditions that were left out.
///
/// Only conditions on `entity_logical_name` itself are compiled: a chained filter option or a
/// target entity other than the searched one is skipped with [`SkipReason::RequiresJoin`].
#[must_use]
pub fn compile_odata_filter(
    entity_logical_name: &str,
    conditions: &[AppliedFilterCondition],
) -> ODataFilter {
    let mut expressions = Vec::new();
    let mut skipped = Vec::new();

    for (index, condition) in conditions.iter().enumerate() {
        let prepared = prepare_condition(condition).and_then(|prepared| {
            if prepared.targets_related_entity(entity_logical_name) {
                Err(SkipReason::RequiresJoin)
            } else {
                Ok(prepared)
            }
        });
        match prepared {
            Ok(prepared) => expressions.push(format!("({})", create_filter_expression(&prepared))),
            Err(reason) => skipped.push(SkippedCondition::record(index, reason)),
        }
    }

    ODataFilter {
        filter: (!expressions.is_empty()).then(|| expressions.join(" and ")),
        skipped,
    }
}

/// OData `$filter` value for the conditions, or `None` when nothing applies.
#[must_use]
pub fn build_crm_entities_filter(
    entity_logical_name: &str,
    conditions: &[AppliedFilterCondition],
) -> Option<String> {
    compile_odata_filter(entity_logical_name, conditions).filter
}
