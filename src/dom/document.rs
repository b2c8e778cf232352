//! Arena-backed host tree

use super::{DomError, ElementData, Node, NodeId, NodeKind};

/// The live, mutable host tree plus any detached fragments built off-tree
///
/// Slots are append-only: a freed node leaves a `None` behind and its index is
/// never handed out again, so a stale `NodeId` can never alias a newer node.
/// Storage therefore grows with every node ever created, including the
/// scratch fragment each composition allocates. A long-lived document that
/// churns heavily should be rebuilt from its rendered markup.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Option<Node>>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create a document holding only the root
    pub fn new() -> Self {
        Self {
            nodes: vec![Some(Node::new(NodeKind::Root))],
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    /// Number of live nodes, attached or not
    pub fn node_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_some()).count()
    }

    pub fn is_live(&self, id: NodeId) -> bool {
        self.node(id).is_some()
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index()).and_then(|n| n.as_ref())
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.index()).and_then(|n| n.as_mut())
    }

    fn live(&self, id: NodeId) -> Result<&Node, DomError> {
        self.node(id).ok_or(DomError::StaleNode { node: id })
    }

    pub fn element(&self, id: NodeId) -> Option<&ElementData> {
        self.node(id).and_then(Node::as_element)
    }

    pub fn element_mut(&mut self, id: NodeId) -> Option<&mut ElementData> {
        match self.node_mut(id).map(|n| &mut n.kind) {
            Some(NodeKind::Element(e)) => Some(e),
            _ => None,
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).and_then(|n| n.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    // Never reuses a freed index
    fn alloc(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Some(Node::new(kind)));
        id
    }

    pub fn create_element(&mut self, tag: impl Into<String>) -> NodeId {
        self.alloc(NodeKind::Element(ElementData::new(tag)))
    }

    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.alloc(NodeKind::Text(text.into()))
    }

    pub fn create_fragment(&mut self) -> NodeId {
        self.alloc(NodeKind::Fragment)
    }

    /// Whether `ancestor` is `node` or one of its ancestors
    pub fn is_inclusive_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    /// Whether the node is reachable from the host tree root
    pub fn is_connected(&self, id: NodeId) -> bool {
        self.is_live(id) && self.is_inclusive_ancestor(NodeId::ROOT, id)
    }

    /// Parents of `id`, nearest first
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            doc: self,
            next: self.parent(id),
        }
    }

    /// Pre-order traversal of everything below `id`, excluding `id`
    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        let mut stack: Vec<NodeId> = self.children(id).to_vec();
        stack.reverse();
        Descendants { doc: self, stack }
    }

    /// Pre-order traversal of `id` and everything below it
    pub fn subtree(&self, id: NodeId) -> Descendants<'_> {
        let stack = if self.is_live(id) { vec![id] } else { vec![] };
        Descendants { doc: self, stack }
    }

    /// First element within `scope` (inclusive) whose `id` attribute equals `id`
    pub fn find_by_id(&self, scope: NodeId, id: &str) -> Option<NodeId> {
        self.subtree(scope)
            .find(|&n| self.element(n).and_then(ElementData::id) == Some(id))
    }

    pub fn first_element_child(&self, id: NodeId) -> Option<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .find(|&c| self.element(c).is_some())
    }

    /// Concatenated text of every text node in the subtree
    pub fn text_content(&self, id: NodeId) -> String {
        self.subtree(id)
            .filter_map(|n| match self.node(n).map(Node::kind) {
                Some(NodeKind::Text(t)) => Some(t.as_str()),
                _ => None,
            })
            .collect()
    }

    fn check_insertion(&self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        if !self.live(parent)?.is_container() {
            return Err(DomError::NotAContainer { node: parent });
        }
        let child_node = self.live(child)?;
        if matches!(child_node.kind, NodeKind::Root) || self.is_inclusive_ancestor(child, parent) {
            return Err(DomError::HierarchyRequest { parent, child });
        }
        Ok(())
    }

    /// Insert at `index` in `parent`; fragments contribute their children
    fn insert_at(&mut self, parent: NodeId, index: usize, child: NodeId) {
        let moved = if self.node(child).is_some_and(Node::is_fragment) {
            self.node_mut(child)
                .map(|n| std::mem::take(&mut n.children))
                .unwrap_or_default()
        } else {
            self.unlink(child);
            vec![child]
        };

        for id in &moved {
            if let Some(n) = self.node_mut(*id) {
                n.parent = Some(parent);
            }
        }
        if let Some(p) = self.node_mut(parent) {
            let index = index.min(p.children.len());
            p.children.splice(index..index, moved);
        }
    }

    /// Append `child` as the last child of `parent`
    ///
    /// A fragment is emptied into `parent` and stays live, like a DOM
    /// `DocumentFragment`.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        self.check_insertion(parent, child)?;
        let end = self.children(parent).len();
        self.insert_at(parent, end, child);
        Ok(())
    }

    /// Put `replacement` where `old` is; `old` becomes detached
    pub fn replace_with(&mut self, old: NodeId, replacement: NodeId) -> Result<(), DomError> {
        let parent = self.live(old)?.parent.ok_or(DomError::Detached { node: old })?;
        if old == replacement {
            return Ok(());
        }
        self.check_insertion(parent, replacement)?;
        if self.is_inclusive_ancestor(replacement, old) {
            return Err(DomError::HierarchyRequest {
                parent,
                child: replacement,
            });
        }

        if !self.node(replacement).is_some_and(Node::is_fragment) {
            self.unlink(replacement);
        }
        let index = self
            .children(parent)
            .iter()
            .position(|&c| c == old)
            .unwrap_or(0);
        self.unlink(old);
        self.insert_at(parent, index, replacement);
        Ok(())
    }

    fn unlink(&mut self, id: NodeId) {
        let Some(parent) = self.parent(id) else {
            return;
        };
        if let Some(p) = self.node_mut(parent) {
            p.children.retain(|&c| c != id);
        }
        if let Some(n) = self.node_mut(id) {
            n.parent = None;
        }
    }

    /// Detach a node from its parent, keeping it (and its subtree) live
    pub fn detach(&mut self, id: NodeId) -> Result<(), DomError> {
        self.live(id)?;
        self.unlink(id);
        Ok(())
    }

    /// Detach a node and free its whole subtree
    pub fn remove(&mut self, id: NodeId) -> Result<(), DomError> {
        if matches!(self.live(id)?.kind, NodeKind::Root) {
            return Err(DomError::HierarchyRequest {
                parent: id,
                child: id,
            });
        }
        self.unlink(id);
        self.free_subtree(id);
        Ok(())
    }

    /// Free every child subtree of `id`
    pub fn clear_children(&mut self, id: NodeId) -> Result<(), DomError> {
        let children = std::mem::take(&mut self.live_mut(id)?.children);
        for child in children {
            self.free_subtree(child);
        }
        Ok(())
    }

    /// Replace all children with a single text node (none for empty text)
    pub fn set_text(&mut self, id: NodeId, text: impl Into<String>) -> Result<(), DomError> {
        let text = text.into();
        if !self.live(id)?.is_container() {
            if let Some(Node {
                kind: NodeKind::Text(t),
                ..
            }) = self.node_mut(id)
            {
                *t = text;
            }
            return Ok(());
        }
        self.clear_children(id)?;
        if text.is_empty() {
            return Ok(());
        }
        let text = self.create_text(text);
        self.append_child(id, text)
    }

    fn live_mut(&mut self, id: NodeId) -> Result<&mut Node, DomError> {
        self.node_mut(id).ok_or(DomError::StaleNode { node: id })
    }

    fn free_subtree(&mut self, id: NodeId) {
        let doomed: Vec<NodeId> = self.subtree(id).collect();
        for n in doomed {
            if let Some(slot) = self.nodes.get_mut(n.index()) {
                *slot = None;
            }
        }
    }
}

/// Iterator over a node's ancestors
pub struct Ancestors<'a> {
    doc: &'a Document,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.doc.parent(current);
        Some(current)
    }
}

/// Pre-order iterator over a subtree
pub struct Descendants<'a> {
    doc: &'a Document,
    stack: Vec<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.stack.pop()?;
        self.stack
            .extend(self.doc.children(current).iter().rev().copied());
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element_with_id(doc: &mut Document, tag: &str, id: &str) -> NodeId {
        let el = doc.create_element(tag);
        doc.element_mut(el).unwrap().set_attribute("id", id);
        el
    }

    #[test]
    fn test_new_document_has_root() {
        let doc = Document::new();
        assert!(doc.is_live(doc.root()));
        assert!(doc.is_connected(doc.root()));
        assert_eq!(doc.node_count(), 1);
    }

    #[test]
    fn test_append_and_traverse_in_preorder() {
        let mut doc = Document::new();
        let ul = element_with_id(&mut doc, "ul", "list");
        let a = element_with_id(&mut doc, "li", "a");
        let b = element_with_id(&mut doc, "li", "b");
        let text = doc.create_text("x");
        doc.append_child(doc.root(), ul).unwrap();
        doc.append_child(ul, a).unwrap();
        doc.append_child(a, text).unwrap();
        doc.append_child(ul, b).unwrap();

        let order: Vec<_> = doc.descendants(doc.root()).collect();
        assert_eq!(order, vec![ul, a, text, b]);
        assert_eq!(doc.ancestors(text).collect::<Vec<_>>(), vec![a, ul, doc.root()]);
    }

    #[test]
    fn test_append_moves_existing_child() {
        let mut doc = Document::new();
        let first = doc.create_element("div");
        let second = doc.create_element("div");
        let item = doc.create_element("span");
        doc.append_child(first, item).unwrap();
        doc.append_child(second, item).unwrap();
        assert!(doc.children(first).is_empty());
        assert_eq!(doc.children(second), &[item]);
        assert_eq!(doc.parent(item), Some(second));
    }

    #[test]
    fn test_append_fragment_moves_children() {
        let mut doc = Document::new();
        let frag = doc.create_fragment();
        let a = doc.create_element("a");
        let b = doc.create_element("b");
        doc.append_child(frag, a).unwrap();
        doc.append_child(frag, b).unwrap();

        doc.append_child(doc.root(), frag).unwrap();
        assert_eq!(doc.children(doc.root()), &[a, b]);
        assert!(doc.children(frag).is_empty());
        assert!(doc.is_live(frag));
        assert!(doc.is_connected(a));
    }

    #[test]
    fn test_hierarchy_violations_rejected() {
        let mut doc = Document::new();
        let outer = doc.create_element("div");
        let inner = doc.create_element("div");
        doc.append_child(outer, inner).unwrap();

        assert!(matches!(
            doc.append_child(inner, outer),
            Err(DomError::HierarchyRequest { .. })
        ));
        assert!(matches!(
            doc.append_child(outer, outer),
            Err(DomError::HierarchyRequest { .. })
        ));
        assert!(matches!(
            doc.append_child(inner, doc.root()),
            Err(DomError::HierarchyRequest { .. })
        ));

        let text = doc.create_text("t");
        assert!(matches!(
            doc.append_child(text, inner),
            Err(DomError::NotAContainer { .. })
        ));
    }

    #[test]
    fn test_replace_with_keeps_position() {
        let mut doc = Document::new();
        let a = doc.create_element("a");
        let b = doc.create_element("b");
        let c = doc.create_element("c");
        for n in [a, b, c] {
            doc.append_child(doc.root(), n).unwrap();
        }
        let frag = doc.create_fragment();
        let x = doc.create_element("x");
        let y = doc.create_element("y");
        doc.append_child(frag, x).unwrap();
        doc.append_child(frag, y).unwrap();

        doc.replace_with(b, frag).unwrap();
        assert_eq!(doc.children(doc.root()), &[a, x, y, c]);
        assert_eq!(doc.parent(b), None);
        assert!(doc.is_live(b));
    }

    #[test]
    fn test_replace_with_sibling() {
        let mut doc = Document::new();
        let a = doc.create_element("a");
        let b = doc.create_element("b");
        let c = doc.create_element("c");
        for n in [a, b, c] {
            doc.append_child(doc.root(), n).unwrap();
        }
        doc.replace_with(c, a).unwrap();
        assert_eq!(doc.children(doc.root()), &[b, a]);
    }

    #[test]
    fn test_replace_detached_node_fails() {
        let mut doc = Document::new();
        let a = doc.create_element("a");
        let b = doc.create_element("b");
        assert_eq!(doc.replace_with(a, b), Err(DomError::Detached { node: a }));
    }

    #[test]
    fn test_remove_frees_subtree() {
        let mut doc = Document::new();
        let ul = doc.create_element("ul");
        let li = doc.create_element("li");
        doc.append_child(doc.root(), ul).unwrap();
        doc.append_child(ul, li).unwrap();

        doc.remove(ul).unwrap();
        assert!(!doc.is_live(ul));
        assert!(!doc.is_live(li));
        assert!(doc.children(doc.root()).is_empty());
        assert_eq!(doc.remove(ul), Err(DomError::StaleNode { node: ul }));
        assert!(doc.remove(doc.root()).is_err());
    }

    #[test]
    fn test_freed_ids_stay_dead_after_new_allocations() {
        let mut doc = Document::new();
        let old = element_with_id(&mut doc, "li", "a");
        doc.append_child(doc.root(), old).unwrap();
        doc.remove(old).unwrap();

        let fresh: Vec<_> = (0..4).map(|_| doc.create_fragment()).collect();
        assert!(!fresh.contains(&old));
        assert!(!doc.is_live(old));
        assert_eq!(doc.find_by_id(doc.root(), "a"), None);
        assert_eq!(doc.node_count(), 5);
    }

    #[test]
    fn test_clear_children_and_set_text() {
        let mut doc = Document::new();
        let p = doc.create_element("p");
        let b = doc.create_element("b");
        doc.append_child(p, b).unwrap();
        doc.set_text(p, "plain").unwrap();
        assert!(!doc.is_live(b));
        assert_eq!(doc.children(p).len(), 1);
        assert_eq!(doc.text_content(p), "plain");

        doc.set_text(p, "").unwrap();
        assert!(doc.children(p).is_empty());

        let b = doc.create_element("b");
        doc.append_child(p, b).unwrap();
        doc.clear_children(p).unwrap();
        assert!(doc.children(p).is_empty());
        assert!(!doc.is_live(b));
        assert_eq!(doc.text_content(p), "");
    }

    #[test]
    fn test_find_by_id_is_inclusive() {
        let mut doc = Document::new();
        let outer = element_with_id(&mut doc, "div", "outer");
        let inner = element_with_id(&mut doc, "div", "inner");
        doc.append_child(outer, inner).unwrap();
        assert_eq!(doc.find_by_id(outer, "outer"), Some(outer));
        assert_eq!(doc.find_by_id(outer, "inner"), Some(inner));
        assert_eq!(doc.find_by_id(inner, "outer"), None);
    }

    #[test]
    fn test_first_element_child_skips_text() {
        let mut doc = Document::new();
        let frag = doc.create_fragment();
        let text = doc.create_text(" ");
        let li = doc.create_element("li");
        doc.append_child(frag, text).unwrap();
        doc.append_child(frag, li).unwrap();
        assert_eq!(doc.first_element_child(frag), Some(li));
    }
}
