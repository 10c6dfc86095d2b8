//! Join paths through related entities.
//!
//! A `RelatedTo` chain of filter options or table columns describes a path of joins starting at
//! the searched entity. Each hop becomes a FetchXML `<link-entity>`, identified by a [`LinkKey`]
//! so that two conditions or columns walking the same hop share one element.

use serde::Serialize;

use crate::config::ChainLink;

/// One join hop, the identity of a `<link-entity>` element.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkKey {
    /// Logical name of the joined entity (`name` in FetchXML)
    pub entity_name: String,
    /// Attribute on the parent entity (`to` in FetchXML)
    pub from_attribute: String,
    /// Attribute on the joined entity (`from` in FetchXML)
    pub to_attribute: String,
}

impl LinkKey {
    pub fn new(
        entity_name: impl Into<String>,
        from_attribute: impl Into<String>,
        to_attribute: impl Into<String>,
    ) -> Self {
        Self {
            entity_name: entity_name.into(),
            from_attribute: from_attribute.into(),
            to_attribute: to_attribute.into(),
        }
    }
}

/// Resolve the join hops of a chain, root first.
///
/// Each hop joins a parent link to its child. The child supplies the joined `EntityName` and its
/// `ToAttribute`; the parent-side attribute is the parent's `FromAttribute`. When the root link has
/// no `FromAttribute` the chain is written child-first instead, each child carrying the
/// parent-side attribute in its own `FromAttribute`.
///
/// Returns `None` when any hop lacks one of its three names. A chain of one link resolves to an
/// empty path.
pub fn resolve_join_path<T: ChainLink>(root: &T) -> Option<Vec<LinkKey>> {
    let chain = root.chain();
    let parent_carries_join = root.link_from_attribute().is_some();

    chain
        .windows(2)
        .map(|pair| {
            let (parent, child) = (pair[0], pair[1]);
            let from_attribute = if parent_carries_join {
                parent.link_from_attribute()?
            } else {
                child.link_from_attribute()?
            };
            Some(LinkKey::new(
                child.link_entity_name()?,
                from_attribute,
                child.link_to_attribute()?,
            ))
        })
        .collect()
}
