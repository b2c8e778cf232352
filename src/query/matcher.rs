//! Structural query matching against the host tree

use crate::dom::{Document, NodeId};
use crate::parser::ast::{Combinator, Compound, Query, Selector, TagMatch};

/// Whether `node` matches any selector of the group
pub fn matches_query(doc: &Document, node: NodeId, query: &Query) -> bool {
    query
        .selectors
        .iter()
        .any(|selector| matches_selector(doc, node, selector))
}

/// Match a selector right to left against the node's full ancestry
pub fn matches_selector(doc: &Document, node: NodeId, selector: &Selector) -> bool {
    let compounds: Vec<&Compound> = std::iter::once(&selector.head)
        .chain(selector.tail.iter().map(|(_, c)| c))
        .collect();
    let combinators: Vec<Combinator> = selector.tail.iter().map(|(c, _)| *c).collect();
    match_from(doc, node, &compounds, &combinators, compounds.len() - 1)
}

fn match_from(
    doc: &Document,
    node: NodeId,
    compounds: &[&Compound],
    combinators: &[Combinator],
    index: usize,
) -> bool {
    if !matches_compound(doc, node, compounds[index]) {
        return false;
    }
    if index == 0 {
        return true;
    }

    match combinators[index - 1] {
        Combinator::Child => doc
            .parent(node)
            .is_some_and(|parent| match_from(doc, parent, compounds, combinators, index - 1)),
        Combinator::Descendant => doc
            .ancestors(node)
            .any(|ancestor| match_from(doc, ancestor, compounds, combinators, index - 1)),
    }
}

/// Only elements match; root, fragments and text never do
pub fn matches_compound(doc: &Document, node: NodeId, compound: &Compound) -> bool {
    let Some(element) = doc.element(node) else {
        return false;
    };

    let tag_ok = match &compound.tag {
        None | Some(TagMatch::Any) => true,
        Some(TagMatch::Name(name)) => element.tag.eq_ignore_ascii_case(name.as_str()),
    };

    tag_ok
        && compound
            .ids
            .iter()
            .all(|id| element.id() == Some(id.as_str()))
        && compound
            .classes
            .iter()
            .all(|class| element.has_class(class.as_str()))
        && compound
            .attributes
            .iter()
            .all(|attr| match &attr.value {
                None => element.has_attribute(attr.name.as_str()),
                Some(value) => element.attribute(attr.name.as_str()) == Some(value.as_str()),
            })
}
