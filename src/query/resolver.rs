//! Resolve targets to live nodes

use std::collections::HashMap;

use super::matcher::matches_query;
use super::LookupError;
use crate::dom::{Document, NodeId, NodeKind};
use crate::parser::ast::Query;
use crate::parser::parse_query;

/// Something a resolver can turn into a node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// A structural query such as `.list > li`
    Query(String),
    /// Exact `id` attribute lookup
    Id(String),
    /// A direct reference, returned unchanged once validated
    Node(NodeId),
}

impl Target {
    pub fn query(query: impl Into<String>) -> Self {
        Target::Query(query.into())
    }

    pub fn id(id: impl Into<String>) -> Self {
        Target::Id(id.into())
    }
}

impl From<&str> for Target {
    fn from(query: &str) -> Self {
        Target::Query(query.to_string())
    }
}

impl From<String> for Target {
    fn from(query: String) -> Self {
        Target::Query(query)
    }
}

impl From<NodeId> for Target {
    fn from(node: NodeId) -> Self {
        Target::Node(node)
    }
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Target::Query(q) => write!(f, "{}", q),
            Target::Id(id) => write!(f, "#{}", id),
            Target::Node(node) => write!(f, "{}", node),
        }
    }
}

/// Finds nodes by query inside a scope, caching parsed queries
#[derive(Debug, Default)]
pub struct QueryResolver {
    cache: HashMap<String, Query>,
}

impl QueryResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct queries parsed so far
    pub fn cached_queries(&self) -> usize {
        self.cache.len()
    }

    /// Resolve `target` within `scope` (the host tree root when `None`)
    ///
    /// Only descendants of the scope are candidates; the first match in
    /// document order wins.
    pub fn resolve(
        &mut self,
        doc: &Document,
        target: &Target,
        scope: Option<NodeId>,
    ) -> Result<NodeId, LookupError> {
        if let Target::Node(node) = target {
            return match doc.node(*node).map(|n| n.kind()) {
                Some(NodeKind::Text(_)) | None => Err(LookupError::StaleNode { node: *node }),
                Some(_) => Ok(*node),
            };
        }

        let scope = scope.unwrap_or(NodeId::ROOT);
        if !doc.node(scope).is_some_and(|n| n.is_container()) {
            return Err(LookupError::InvalidScope {
                query: target.to_string(),
                scope,
            });
        }

        let found = match target {
            Target::Id(id) => doc
                .descendants(scope)
                .find(|&n| doc.element(n).and_then(|e| e.id()) == Some(id.as_str())),
            Target::Query(query) => {
                let parsed = self.parsed(query)?;
                doc.descendants(scope)
                    .find(|&n| matches_query(doc, n, parsed))
            }
            Target::Node(_) => None,
        };

        tracing::trace!(target = %target, %scope, found = ?found, "resolved target");
        found.ok_or_else(|| LookupError::NodeNotFound {
            query: target.to_string(),
        })
    }

    /// Parse a query, reusing an earlier parse of the same text
    pub fn parsed(&mut self, query: &str) -> Result<&Query, LookupError> {
        if !self.cache.contains_key(query) {
            let parsed = parse_query(query).map_err(|errors| LookupError::InvalidQuery {
                query: query.to_string(),
                message: errors
                    .first()
                    .map(|e| e.message().to_string())
                    .unwrap_or_default(),
            })?;
            self.cache.insert(query.to_string(), parsed);
        }
        self.cache
            .get(query)
            .ok_or_else(|| LookupError::InvalidQuery {
                query: query.to_string(),
                message: "query cache miss".to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{build_fragment, build_into};
    use crate::parser::parse_fragment;

    fn setup() -> Document {
        let mut doc = Document::new();
        let nodes = parse_fragment(
            r#"div#outer.list-container { ul.list { li#a.row li#b.row } } p.note { "x" }"#,
        )
        .unwrap();
        build_into(&mut doc, NodeId::ROOT, &nodes).unwrap();
        doc
    }

    #[test]
    fn test_resolve_first_match_in_document_order() {
        let doc = setup();
        let mut resolver = QueryResolver::new();
        let found = resolver.resolve(&doc, &".row".into(), None).unwrap();
        assert_eq!(doc.element(found).unwrap().id(), Some("a"));
    }

    #[test]
    fn test_scope_itself_is_not_a_candidate() {
        let doc = setup();
        let mut resolver = QueryResolver::new();
        let outer = doc.find_by_id(NodeId::ROOT, "outer").unwrap();
        let err = resolver
            .resolve(&doc, &".list-container".into(), Some(outer))
            .unwrap_err();
        assert_eq!(
            err,
            LookupError::NodeNotFound {
                query: ".list-container".to_string()
            }
        );
        // Ancestors outside the scope still count for combinators
        assert!(resolver
            .resolve(&doc, &".list-container li".into(), Some(outer))
            .is_ok());
    }

    #[test]
    fn test_resolve_by_id_and_node() {
        let doc = setup();
        let mut resolver = QueryResolver::new();
        let b = resolver.resolve(&doc, &Target::id("b"), None).unwrap();
        assert_eq!(resolver.resolve(&doc, &Target::Node(b), None), Ok(b));
    }

    #[test]
    fn test_stale_and_text_nodes_rejected() {
        let mut doc = setup();
        let mut resolver = QueryResolver::new();
        let b = doc.find_by_id(NodeId::ROOT, "b").unwrap();
        doc.remove(b).unwrap();
        assert_eq!(
            resolver.resolve(&doc, &Target::Node(b), None),
            Err(LookupError::StaleNode { node: b })
        );

        let note = resolver.resolve(&doc, &".note".into(), None).unwrap();
        let text = doc.children(note)[0];
        assert!(resolver.resolve(&doc, &Target::Node(text), None).is_err());
    }

    #[test]
    fn test_invalid_scope() {
        let doc = setup();
        let mut resolver = QueryResolver::new();
        let note = resolver.resolve(&doc, &".note".into(), None).unwrap();
        let text = doc.children(note)[0];
        assert!(matches!(
            resolver.resolve(&doc, &".row".into(), Some(text)),
            Err(LookupError::InvalidScope { .. })
        ));
        assert!(matches!(
            resolver.resolve(&doc, &".row".into(), Some(NodeId(999))),
            Err(LookupError::InvalidScope { .. })
        ));
    }

    #[test]
    fn test_resolve_inside_detached_fragment() {
        let mut doc = setup();
        let mut resolver = QueryResolver::new();
        let nodes = parse_fragment("li.row { span.name }").unwrap();
        let frag = build_fragment(&mut doc, &nodes).unwrap();

        let name = resolver.resolve(&doc, &".name".into(), Some(frag)).unwrap();
        assert!(!doc.is_connected(name));
        assert!(resolver.resolve(&doc, &".name".into(), None).is_err());
    }

    #[test]
    fn test_invalid_query_and_cache() {
        let doc = setup();
        let mut resolver = QueryResolver::new();
        assert!(matches!(
            resolver.resolve(&doc, &"li >".into(), None),
            Err(LookupError::InvalidQuery { .. })
        ));
        resolver.resolve(&doc, &".row".into(), None).unwrap();
        resolver.resolve(&doc, &".row".into(), None).unwrap();
        assert_eq!(resolver.cached_queries(), 1);
    }
}
