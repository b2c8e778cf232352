//! Instantiate markup AST nodes into the host tree

use super::{Document, DomError, NodeId};
use crate::parser::ast::{ElementDecl, MarkupNode, Spanned};

/// Build `nodes` as children of `parent`, returning the created top-level nodes
pub fn build_into(
    doc: &mut Document,
    parent: NodeId,
    nodes: &[Spanned<MarkupNode>],
) -> Result<Vec<NodeId>, DomError> {
    let mut created = Vec::with_capacity(nodes.len());
    for node in nodes {
        let id = build_node(doc, &node.node)?;
        doc.append_child(parent, id)?;
        created.push(id);
    }
    Ok(created)
}

/// Build `nodes` into a new detached fragment
pub fn build_fragment(
    doc: &mut Document,
    nodes: &[Spanned<MarkupNode>],
) -> Result<NodeId, DomError> {
    let fragment = doc.create_fragment();
    build_into(doc, fragment, nodes)?;
    Ok(fragment)
}

fn build_node(doc: &mut Document, node: &MarkupNode) -> Result<NodeId, DomError> {
    match node {
        MarkupNode::Text(text) => Ok(doc.create_text(text.clone())),
        MarkupNode::Element(decl) => build_element(doc, decl),
    }
}

fn build_element(doc: &mut Document, decl: &ElementDecl) -> Result<NodeId, DomError> {
    let id = doc.create_element(decl.tag.node.as_str());
    if let Some(element) = doc.element_mut(id) {
        if let Some(element_id) = &decl.id {
            element.set_attribute("id", element_id.node.as_str());
        }
        for class in &decl.classes {
            element.add_class(class.node.as_str());
        }
        for attr in &decl.attributes {
            let name = attr.node.name.node.as_str();
            let value = attr.node.value.clone().unwrap_or_default();
            if name == "class" {
                for class in value.split_whitespace() {
                    element.add_class(class);
                }
            } else {
                element.set_attribute(name, value);
            }
        }
    }
    build_into(doc, id, &decl.children)?;
    Ok(id)
}
