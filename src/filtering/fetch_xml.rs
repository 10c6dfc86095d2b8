//! FetchXML backend.
//!
//! Unlike OData, FetchXML can express joins: every `RelatedTo` hop becomes a `<link-entity>`
//! and a chained condition is placed in the filter of the deepest link of its chain. Links are
//! deduplicated by [`LinkKey`], so conditions and columns walking the same path share one
//! element.
//!
//! ```xml
//! <fetch><entity name="account"><attribute name="name"/>
//!   <link-entity name="contact" from="contactid" to="primarycontactid">
//!     <filter type="and"><condition attribute="emailaddress1" operator="eq" value="a@b.com"/></filter>
//!   </link-entity>
//! </entity></fetch>
//! ```
//!
//! The document is written with `quick_xml`, which escapes attribute values and text. Output has
//! no whitespace between elements; the layout above is for reading only.

use std::io::Cursor;

use quick_xml::Writer;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};

use super::columns::SearchTableColumn;
use super::conditions::{
    AppliedFilterCondition, ConditionOperator, PreparedCondition, SkipReason, SkippedCondition,
    prepare_condition,
};
use super::joined::{LinkKey, resolve_join_path};
use super::literals::to_fetch_xml_literal;
use crate::config::ChainLink;
use crate::errors::SearchError;

/// Paging attributes of the `<fetch>` element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchPage {
    /// Rows per page (`count`)
    pub count: u32,
    /// 1-based page number (`page`)
    pub page: u32,
}

/// Result of compiling conditions and columns to FetchXML.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchXmlQuery {
    pub xml: String,
    pub skipped: Vec<SkippedCondition>,
}

#[derive(Debug)]
struct FetchAttribute {
    name: String,
    alias: Option<String>,
}

#[derive(Debug)]
struct FetchCondition {
    attribute: String,
    operator: &'static str,
    value: Option<String>,
    /// `<value>` children, used by `in`
    values: Vec<String>,
}

#[derive(Debug)]
struct FetchLinkNode {
    key: LinkKey,
    attributes: Vec<FetchAttribute>,
    conditions: Vec<FetchCondition>,
    children: Vec<FetchLinkNode>,
}

impl FetchLinkNode {
    fn new(key: LinkKey) -> Self {
        Self {
            key,
            attributes: Vec::new(),
            conditions: Vec::new(),
            children: Vec::new(),
        }
    }

    fn has_conditions(&self) -> bool {
        !self.conditions.is_empty() || self.children.iter().any(Self::has_conditions)
    }
}

fn find_or_insert(nodes: &mut Vec<FetchLinkNode>, key: &LinkKey) -> usize {
    if let Some(index) = nodes.iter().position(|node| &node.key == key) {
        return index;
    }
    nodes.push(FetchLinkNode::new(key.clone()));
    nodes.len() - 1
}

/// Node at the end of `path`, creating missing links along the way. `None` for an empty path.
fn link_node_mut<'a>(
    mut nodes: &'a mut Vec<FetchLinkNode>,
    path: &[LinkKey],
) -> Option<&'a mut FetchLinkNode> {
    let (last, parents) = path.split_last()?;
    for key in parents {
        let index = find_or_insert(nodes, key);
        nodes = &mut nodes[index].children;
    }
    let index = find_or_insert(nodes, last);
    Some(&mut nodes[index])
}

fn fetch_condition(condition: &PreparedCondition<'_>) -> FetchCondition {
    use ConditionOperator as Op;

    let literals: Vec<String> = condition
        .values
        .iter()
        .map(|value| to_fetch_xml_literal(condition.attribute_type, value))
        .collect();
    let first = literals.first().cloned().unwrap_or_default();

    let (operator, value, values) = match condition.operator {
        Op::Null | Op::NotNull | Op::Today | Op::Tomorrow | Op::Yesterday => {
            (condition.operator.as_str(), None, Vec::new())
        }
        Op::In => (Op::In.as_str(), None, literals),
        Op::NotBeginWith => (Op::NotLike.as_str(), Some(format!("{first}%")), Vec::new()),
        Op::NotEndWith => (Op::NotLike.as_str(), Some(format!("%{first}")), Vec::new()),
        Op::Like | Op::NotLike => {
            (condition.operator.as_str(), Some(format!("%{first}%")), Vec::new())
        }
        Op::Eq
        | Op::Ne
        | Op::Ge
        | Op::Gt
        | Op::Le
        | Op::Lt
        | Op::BeginsWith
        | Op::EndsWith => (condition.operator.as_str(), Some(first), Vec::new()),
    };

    FetchCondition {
        attribute: condition.attribute_name.to_string(),
        operator,
        value,
        values,
    }
}

#[derive(Debug)]
struct FetchEntity<'a> {
    name: &'a str,
    attributes: Vec<FetchAttribute>,
    conditions: Vec<FetchCondition>,
    links: Vec<FetchLinkNode>,
}

impl<'a> FetchEntity<'a> {
    fn new(name: &'a str) -> Self {
        Self {
            name,
            attributes: Vec::new(),
            conditions: Vec::new(),
            links: Vec::new(),
        }
    }

    fn add_column(&mut self, column: &SearchTableColumn) {
        if column.is_root_column {
            if !self.attributes.iter().any(|a| a.name == column.attribute_name) {
                self.attributes.push(FetchAttribute {
                    name: column.attribute_name.clone(),
                    alias: None,
                });
            }
            return;
        }
        let Some(node) = link_node_mut(&mut self.links, &column.join_path) else {
            return;
        };
        if !node.attributes.iter().any(|a| a.alias.as_deref() == Some(column.value_key.as_str())) {
            node.attributes.push(FetchAttribute {
                name: column.attribute_name.clone(),
                alias: Some(column.value_key.clone()),
            });
        }
    }

    fn add_condition(&mut self, condition: &AppliedFilterCondition) -> Result<(), SkipReason> {
        let prepared = prepare_condition(condition)?;
        let compiled = fetch_condition(&prepared);
        if prepared.option.chain_len() <= 1 {
            self.conditions.push(compiled);
            return Ok(());
        }
        let path = resolve_join_path(prepared.option).ok_or(SkipReason::IncompleteJoin)?;
        let node = link_node_mut(&mut self.links, &path).ok_or(SkipReason::IncompleteJoin)?;
        node.conditions.push(compiled);
        Ok(())
    }

    fn render(&self, page: Option<FetchPage>) -> Result<String, quick_xml::Error> {
        let mut writer = Writer::new(Cursor::new(Vec::new()));

        let mut fetch = BytesStart::new("fetch");
        if let Some(page) = page {
            fetch.push_attribute(("count", page.count.to_string().as_str()));
            fetch.push_attribute(("page", page.page.to_string().as_str()));
        }
        writer.write_event(Event::Start(fetch))?;

        let mut entity = BytesStart::new("entity");
        entity.push_attribute(("name", self.name));
        writer.write_event(Event::Start(entity))?;
        if self.attributes.is_empty() {
            writer.write_event(Event::Empty(BytesStart::new("all-attributes")))?;
        }
        write_attributes(&mut writer, &self.attributes)?;
        write_filter(&mut writer, &self.conditions)?;
        for link in &self.links {
            write_link(&mut writer, link)?;
        }
        writer.write_event(Event::End(BytesEnd::new("entity")))?;
        writer.write_event(Event::End(BytesEnd::new("fetch")))?;

        let bytes = writer.into_inner().into_inner();
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

fn write_attributes<W: std::io::Write>(
    writer: &mut Writer<W>,
    attributes: &[FetchAttribute],
) -> Result<(), quick_xml::Error> {
    for attribute in attributes {
        let mut element = BytesStart::new("attribute");
        element.push_attribute(("name", attribute.name.as_str()));
        if let Some(alias) = &attribute.alias {
            element.push_attribute(("alias", alias.as_str()));
        }
        writer.write_event(Event::Empty(element))?;
    }
    Ok(())
}

fn write_filter<W: std::io::Write>(
    writer: &mut Writer<W>,
    conditions: &[FetchCondition],
) -> Result<(), quick_xml::Error> {
    if conditions.is_empty() {
        return Ok(());
    }
    let mut filter = BytesStart::new("filter");
    filter.push_attribute(("type", "and"));
    writer.write_event(Event::Start(filter))?;

    for condition in conditions {
        let mut element = BytesStart::new("condition");
        element.push_attribute(("attribute", condition.attribute.as_str()));
        element.push_attribute(("operator", condition.operator));
        if let Some(value) = &condition.value {
            element.push_attribute(("value", value.as_str()));
        }
        if condition.values.is_empty() {
            writer.write_event(Event::Empty(element))?;
            continue;
        }
        writer.write_event(Event::Start(element))?;
        for value in &condition.values {
            writer.write_event(Event::Start(BytesStart::new("value")))?;
            writer.write_event(Event::Text(BytesText::new(value)))?;
            writer.write_event(Event::End(BytesEnd::new("value")))?;
        }
        writer.write_event(Event::End(BytesEnd::new("condition")))?;
    }

    writer.write_event(Event::End(BytesEnd::new("filter")))?;
    Ok(())
}

fn write_link<W: std::io::Write>(
    writer: &mut Writer<W>,
    link: &FetchLinkNode,
) -> Result<(), quick_xml::Error> {
    let mut element = BytesStart::new("link-entity");
    element.push_attribute(("name", link.key.entity_name.as_str()));
    element.push_attribute(("from", link.key.to_attribute.as_str()));
    element.push_attribute(("to", link.key.from_attribute.as_str()));
    if !link.has_conditions() {
        element.push_attribute(("link-type", "outer"));
    }
    writer.write_event(Event::Start(element))?;

    write_attributes(writer, &link.attributes)?;
    write_filter(writer, &link.conditions)?;
    for child in &link.children {
        write_link(writer, child)?;
    }

    writer.write_event(Event::End(BytesEnd::new("link-entity")))?;
    Ok(())
}

/// Compile conditions and result columns into a FetchXML document.
///
/// Root columns become `<attribute>` projections of the entity, related columns aliased
/// projections of their link. Conditions on a chain of one link go into the root filter, chained
/// ones into the filter of their deepest link. A chained condition whose join path is incomplete
/// is skipped with [`SkipReason::IncompleteJoin`].
///
/// # Errors
///
/// Returns [`SearchError::Xml`] when the document cannot be written.
pub fn compile_fetch_xml(
    entity_logical_name: &str,
    conditions: &[AppliedFilterCondition],
    columns: &[SearchTableColumn],
) -> Result<FetchXmlQuery, SearchError> {
    compile_fetch_xml_page(entity_logical_name, conditions, columns, None)
}

/// [`compile_fetch_xml`] with `count`/`page` paging attributes on the `<fetch>` element.
///
/// # Errors
///
/// Returns [`SearchError::Xml`] when the document cannot be written.
pub fn compile_fetch_xml_page(
    entity_logical_name: &str,
    conditions: &[AppliedFilterCondition],
    columns: &[SearchTableColumn],
    page: Option<FetchPage>,
) -> Result<FetchXmlQuery, SearchError> {
    let mut entity = FetchEntity::new(entity_logical_name);
    for column in columns {
        entity.add_column(column);
    }

    let mut skipped = Vec::new();
    for (index, condition) in conditions.iter().enumerate() {
        if let Err(reason) = entity.add_condition(condition) {
            skipped.push(SkippedCondition::record(index, reason));
        }
    }

    let xml = entity
        .render(page)
        .map_err(|e| SearchError::xml(format!("writing FetchXML for {entity_logical_name}"), e))?;
    Ok(FetchXmlQuery { xml, skipped })
}

/// FetchXML document for the conditions and columns.
///
/// # Errors
///
/// See [`compile_fetch_xml`].
pub fn build_crm_fetch_xml(
    entity_logical_name: &str,
    conditions: &[AppliedFilterCondition],
    columns: &[SearchTableColumn],
) -> Result<String, SearchError> {
    compile_fetch_xml(entity_logical_name, conditions, columns).map(|query| query.xml)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FilterOptionConfig;

    fn root(attribute: &str, attribute_type: &str, operator: ConditionOperator, value: &str) -> AppliedFilterCondition {
        AppliedFilterCondition::new(FilterOptionConfig::attribute(attribute, attribute_type), operator, [value])
    }

    #[test]
    fn test_operator_mapping() {
        let cases = [
            (ConditionOperator::Eq, r#"operator="eq" value="Con""#),
            (ConditionOperator::BeginsWith, r#"operator="begins-with" value="Con""#),
            (ConditionOperator::EndsWith, r#"operator="ends-with" value="Con""#),
            (ConditionOperator::NotBeginWith, r#"operator="not-like" value="Con%""#),
            (ConditionOperator::NotEndWith, r#"operator="not-like" value="%Con""#),
            (ConditionOperator::Like, r#"operator="like" value="%Con%""#),
            (ConditionOperator::NotLike, r#"operator="not-like" value="%Con%""#),
        ];
        for (operator, expected) in cases {
            let xml =
                build_crm_fetch_xml("account", &[root("name", "String", operator, "Con")], &[]).unwrap();
            assert!(
                xml.contains(&format!(r#"<condition attribute="name" {expected}/>"#)),
                "{operator}: {xml}"
            );
        }
    }

    #[test]
    fn test_no_value_operators_pass_through() {
        let xml = build_crm_fetch_xml(
            "account",
            &[root("createdon", "DateTime", ConditionOperator::Yesterday, "2024-01-01")],
            &[],
        )
        .unwrap();
        assert!(xml.contains(r#"<condition attribute="createdon" operator="yesterday"/>"#));
    }

    #[test]
    fn test_in_renders_value_elements() {
        let xml = build_crm_fetch_xml(
            "account",
            &[root("name", "String", ConditionOperator::In, "Acme, <Contoso>")],
            &[],
        )
        .unwrap();
        assert!(xml.contains(
            r#"<condition attribute="name" operator="in"><value>Acme</value><value>&lt;Contoso&gt;</value></condition>"#
        ));
    }

    #[test]
    fn test_markup_in_values_and_names_is_escaped() {
        let condition = root("name", "String", ConditionOperator::Eq, r#"Tom & "Jerry's" <Co>"#);
        let xml = build_crm_fetch_xml("account", &[condition], &[]).unwrap();
        assert!(
            xml.contains(r#"value="Tom &amp; &quot;Jerry&apos;s&quot; &lt;Co&gt;""#),
            "{xml}"
        );

        let xml = build_crm_fetch_xml(r#"acc"ount"#, &[], &[]).unwrap();
        assert!(xml.contains(r#"<entity name="acc&quot;ount">"#), "{xml}");
    }

    #[test]
    fn test_document_shape() {
        let xml = build_crm_fetch_xml("account", &[], &[]).unwrap();
        assert_eq!(xml, r#"<fetch><entity name="account"><all-attributes/></entity></fetch>"#);
    }

    #[test]
    fn test_paging_attributes() {
        let query = compile_fetch_xml_page(
            "account",
            &[],
            &[],
            Some(FetchPage { count: 50, page: 2 }),
        )
        .unwrap();
        assert!(query.xml.starts_with(r#"<fetch count="50" page="2"><entity name="account">"#));
    }

    #[test]
    fn test_incomplete_chain_is_skipped() {
        let option = FilterOptionConfig::attribute("name", "String").related(FilterOptionConfig {
            entity_name: Some("contact".to_string()),
            ..FilterOptionConfig::attribute("fullname", "String")
        });
        let query = compile_fetch_xml(
            "account",
            &[AppliedFilterCondition::new(option, ConditionOperator::Eq, ["Ann"])],
            &[],
        )
        .unwrap();
        assert!(!query.xml.contains("link-entity"));
        assert_eq!(
            query.skipped,
            vec![SkippedCondition { index: 0, reason: SkipReason::IncompleteJoin }]
        );
    }

    #[test]
    fn test_link_node_mut_reuses_prefix() {
        let mut nodes = Vec::new();
        let contact = LinkKey::new("contact", "primarycontactid", "contactid");
        let owner = LinkKey::new("systemuser", "owninguser", "systemuserid");
        link_node_mut(&mut nodes, &[contact.clone()]);
        link_node_mut(&mut nodes, &[contact.clone(), owner.clone()]);
        link_node_mut(&mut nodes, &[contact, owner]);
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].children.len(), 1);
        assert!(link_node_mut(&mut nodes, &[]).is_none());
    }
}
