//! The composition engine
//!
//! An [`Engine`] owns the host tree, the template registry and the teardown
//! registry. `compose_node` instantiates a template off-tree, fills it,
//! composes its children into it and attaches it; `remove_node` and
//! `empty_node` tear managed content down again, firing every teardown
//! callback registered for nodes inside the affected subtree exactly once.

use std::path::PathBuf;

use crate::config::{BindingPolicy, DuplicateIdPolicy, EngineConfig, VocalMode};
use crate::diagnostics::{DiagnosticSink, TracingSink};
use crate::dom::{build_into, Document, DomError, Node, NodeId, NodeKind};
use crate::parser::{parse, parse_fragment, Page};
use crate::query::{LookupError, QueryResolver, Target};
use crate::renderer::{render_markup, MarkupConfig};
use crate::template::{TemplateError, TemplateRef, TemplateRegistry};
use crate::LoadError;

use super::{BeforeUnset, ComposeError, CompositionRequest, Content, TeardownRegistry, ValueBinding};

/// Owns the host tree and both registries; all operations are synchronous
pub struct Engine {
    document: Document,
    templates: TemplateRegistry,
    teardown: TeardownRegistry,
    resolver: QueryResolver,
    config: EngineConfig,
    sink: Box<dyn DiagnosticSink>,
    /// Ids claimed by compositions whose children are still being composed
    reserved: Vec<String>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(Document::new(), TemplateRegistry::new())
    }
}

impl Engine {
    pub fn new(document: Document, templates: TemplateRegistry) -> Self {
        Self {
            document,
            templates,
            teardown: TeardownRegistry::new(),
            resolver: QueryResolver::new(),
            config: EngineConfig::default(),
            sink: Box::new(TracingSink),
            reserved: Vec::new(),
        }
    }

    /// Build an engine from a markup page: templates are registered and the
    /// remaining content becomes the initial host tree
    pub fn from_markup(source: &str, config: EngineConfig) -> Result<Self, LoadError> {
        let page = parse(source)?;
        let mut engine = Self::default().with_config(config);
        engine.load_page(&page)?;
        Ok(engine)
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_sink(mut self, sink: impl DiagnosticSink + 'static) -> Self {
        self.sink = Box::new(sink);
        self
    }

    /// Resolve file-backed templates relative to `path`
    pub fn with_base_path(mut self, path: PathBuf) -> Self {
        self.templates.set_base_path(path);
        self
    }

    /// Register a page's templates and append its content to the host tree
    pub fn load_page(&mut self, page: &Page) -> Result<(), LoadError> {
        self.templates.collect_from_statements(&page.statements)?;
        build_into(&mut self.document, NodeId::ROOT, &page.content())?;
        Ok(())
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    pub fn templates(&self) -> &TemplateRegistry {
        &self.templates
    }

    pub fn templates_mut(&mut self) -> &mut TemplateRegistry {
        &mut self.templates
    }

    pub fn teardown(&self) -> &TeardownRegistry {
        &self.teardown
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Find a node in the host tree
    pub fn resolve(&mut self, target: impl Into<Target>) -> Result<NodeId, LookupError> {
        self.resolver.resolve(&self.document, &target.into(), None)
    }

    /// Render the whole host tree as markup
    pub fn render(&self, config: &MarkupConfig) -> String {
        render_markup(&self.document, NodeId::ROOT, config)
    }

    /// Send an error to the diagnostic sink unless the engine is silent
    pub fn report(&mut self, err: &ComposeError) {
        if self.config.vocal_mode == VocalMode::Silent {
            return;
        }
        let diagnostic = err.diagnostic();
        self.sink.report(&diagnostic, self.config.vocal_mode);
    }

    /// Compose a request; failures are reported and yield `None`
    pub fn compose_node(&mut self, request: CompositionRequest) -> Option<NodeId> {
        self.try_compose_node(request).ok()
    }

    /// Compose a request, reporting and returning any failure
    pub fn try_compose_node(&mut self, request: CompositionRequest) -> Result<NodeId, ComposeError> {
        let result = self.compose(request);
        if let Err(err) = &result {
            self.report(err);
        }
        result
    }

    /// Tear down and remove a node; failures are reported and yield `false`
    pub fn remove_node(&mut self, target: impl Into<Target>) -> bool {
        self.try_remove_node(target).is_ok()
    }

    pub fn try_remove_node(&mut self, target: impl Into<Target>) -> Result<(), ComposeError> {
        let result = self.remove(target.into());
        if let Err(err) = &result {
            self.report(err);
        }
        result
    }

    /// Tear down and clear a node's content, keeping the node
    pub fn empty_node(&mut self, target: impl Into<Target>) -> bool {
        self.try_empty_node(target).is_ok()
    }

    pub fn try_empty_node(&mut self, target: impl Into<Target>) -> Result<(), ComposeError> {
        let result = self.empty(target.into());
        if let Err(err) = &result {
            self.report(err);
        }
        result
    }

    fn compose(&mut self, mut request: CompositionRequest) -> Result<NodeId, ComposeError> {
        // Validation touches nothing
        let label = request.label();
        let wrapper_target = request.wrapper.take().ok_or(ComposeError::MissingWrapper)?;
        let template = request.template.take().ok_or(ComposeError::MissingTemplate)?;
        if request.before_unset.is_some() && request.id.is_none() {
            return Err(ComposeError::UnsetWithoutId { template: label });
        }

        let wrapper = self
            .resolver
            .resolve(&self.document, &wrapper_target, request.scope)?;
        if request.replace_wrapper && self.document.parent(wrapper).is_none() {
            return Err(DomError::Detached { node: wrapper }.into());
        }
        self.check_template(&template, wrapper)?;
        self.check_duplicate_id(&request, wrapper)?;

        tracing::debug!(template = %template, %wrapper, id = ?request.id, "composing");

        let fragment = self.instantiate(&template)?;
        for binding in &request.values {
            if let Err(err) = self.apply_binding(fragment, binding) {
                if self.config.binding_failures == BindingPolicy::Abort {
                    self.discard(fragment);
                    return Err(err);
                }
                self.report(&err);
            }
        }

        if !request.incremental {
            self.run_teardown(wrapper, None);
            self.document.clear_children(wrapper)?;
        }

        if let Some(id) = &request.id {
            self.reserved.push(id.clone());
        }
        for mut child in std::mem::take(&mut request.children) {
            if child.scope.is_none() {
                child.scope = Some(fragment);
            }
            if self.try_compose_node(child).is_err() {
                tracing::debug!(template = %template, "child composition failed, continuing");
            }
        }
        if request.id.is_some() {
            self.reserved.pop();
        }

        let Some(root) = self.document.first_element_child(fragment) else {
            self.discard(fragment);
            return Err(TemplateError::NoRootElement {
                name: template.to_string(),
            }
            .into());
        };

        if let Some(id) = &request.id {
            if let Some(element) = self.document.element_mut(root) {
                element.set_attribute("id", id.clone());
            }
        }

        let before_unset = request.before_unset.take();
        let attached = if request.replace_wrapper {
            self.retire_wrapper(wrapper, request.id.as_deref(), before_unset);
            self.document
                .replace_with(wrapper, fragment)
                .and_then(|()| self.document.remove(wrapper))
        } else {
            if let (Some(id), Some(callback)) = (&request.id, before_unset) {
                self.teardown.register(id.clone(), callback);
            }
            self.document.append_child(wrapper, fragment)
        };
        if let Err(err) = attached {
            // Entries registered inside the fragment go with it
            self.run_teardown(fragment, None);
            self.discard(fragment);
            return Err(err.into());
        }
        self.discard(fragment);
        tracing::debug!(%root, %wrapper, "attached");

        if let Some(after_insert) = request.after_insert.take() {
            after_insert(&mut self.document, root);
        }
        Ok(root)
    }

    fn check_template(&mut self, template: &TemplateRef, wrapper: NodeId) -> Result<(), ComposeError> {
        let node = match template {
            TemplateRef::Named(name) => {
                self.templates.prepare(name)?;
                return Ok(());
            }
            TemplateRef::Node(node) => *node,
        };

        let has_root = match self.document.node(node).map(Node::kind) {
            Some(NodeKind::Element(_)) => true,
            Some(NodeKind::Fragment) => self.document.first_element_child(node).is_some(),
            _ => return Err(LookupError::StaleNode { node }.into()),
        };
        if !has_root {
            return Err(TemplateError::NoRootElement {
                name: node.to_string(),
            }
            .into());
        }
        if self.document.is_inclusive_ancestor(node, wrapper) {
            return Err(DomError::HierarchyRequest {
                parent: wrapper,
                child: node,
            }
            .into());
        }
        Ok(())
    }

    fn check_duplicate_id(
        &self,
        request: &CompositionRequest,
        wrapper: NodeId,
    ) -> Result<(), ComposeError> {
        let Some(id) = &request.id else {
            return Ok(());
        };
        if self.config.duplicate_ids == DuplicateIdPolicy::Allow {
            return Ok(());
        }
        if self.reserved.contains(id) {
            return Err(ComposeError::DuplicateId { id: id.clone() });
        }
        if !self.teardown.contains(id) {
            return Ok(());
        }

        // The current holder is torn down by this very call
        let cleared_first = match self.document.find_by_id(wrapper, id) {
            Some(_) if request.replace_wrapper => true,
            Some(holder) => !request.incremental && holder != wrapper,
            None => false,
        };
        if cleared_first {
            Ok(())
        } else {
            Err(ComposeError::DuplicateId { id: id.clone() })
        }
    }

    fn instantiate(&mut self, template: &TemplateRef) -> Result<NodeId, ComposeError> {
        match template {
            TemplateRef::Named(name) => Ok(self.templates.instantiate(&mut self.document, name)?),
            TemplateRef::Node(node) => {
                let fragment = self.document.create_fragment();
                self.document.append_child(fragment, *node)?;
                Ok(fragment)
            }
        }
    }

    fn apply_binding(&mut self, fragment: NodeId, binding: &ValueBinding) -> Result<(), ComposeError> {
        let target = self
            .resolver
            .resolve(&self.document, &binding.wrapper, Some(fragment))?;

        match &binding.content {
            Some(Content::Text(text)) => self.document.set_text(target, text.clone())?,
            Some(Content::Markup(source)) => {
                let nodes = parse_fragment(source).map_err(|errors| ComposeError::Markup {
                    wrapper: binding.wrapper.to_string(),
                    message: errors
                        .first()
                        .map(|e| e.message().to_string())
                        .unwrap_or_default(),
                })?;
                self.document.clear_children(target)?;
                build_into(&mut self.document, target, &nodes)?;
            }
            None => {}
        }

        if let Some(element) = self.document.element_mut(target) {
            for (name, value) in &binding.attributes {
                element.set_attribute(name.clone(), value.clone());
            }
        }
        Ok(())
    }

    /// Fire teardown for everything inside the outgoing wrapper
    ///
    /// A reused id with a live entry keeps its registry slot: the old
    /// callback fires against its holder and the new one takes its place.
    fn retire_wrapper(&mut self, wrapper: NodeId, id: Option<&str>, callback: Option<BeforeUnset>) {
        match (id, callback) {
            (Some(id), Some(callback)) if self.teardown.contains(id) => {
                let holder = self.document.find_by_id(wrapper, id).unwrap_or(wrapper);
                if let Some(old) = self.teardown.refresh(id, callback) {
                    tracing::debug!(id, node = %holder, "running replaced teardown callback");
                    old(&self.document, holder);
                }
                self.run_teardown(wrapper, Some(id));
            }
            (id, callback) => {
                self.run_teardown(wrapper, None);
                if let (Some(id), Some(callback)) = (id, callback) {
                    self.teardown.register(id, callback);
                }
            }
        }
    }

    /// Fire and drop every entry located inside `scope`, in registry order
    fn run_teardown(&mut self, scope: NodeId, except: Option<&str>) {
        for (entry, node) in self.teardown.drain_within(&self.document, scope, except) {
            tracing::debug!(id = %entry.id, %node, "running teardown callback");
            entry.fire(&self.document, node);
        }
    }

    fn discard(&mut self, fragment: NodeId) {
        if let Err(err) = self.document.remove(fragment) {
            tracing::debug!(%err, "fragment already released");
        }
    }

    fn remove(&mut self, target: Target) -> Result<(), ComposeError> {
        let node = self.resolver.resolve(&self.document, &target, None)?;
        if matches!(self.document.node(node).map(Node::kind), Some(NodeKind::Root)) {
            return Err(DomError::HierarchyRequest {
                parent: node,
                child: node,
            }
            .into());
        }

        let own_id = self
            .document
            .element(node)
            .and_then(|e| e.id())
            .map(str::to_string);
        if let Some(entry) = own_id.and_then(|id| self.teardown.take(&id)) {
            tracing::debug!(id = %entry.id, %node, "running teardown callback");
            entry.fire(&self.document, node);
        }

        self.run_teardown(node, None);
        self.document.remove(node)?;
        tracing::debug!(%node, target = %target, "removed");
        Ok(())
    }

    fn empty(&mut self, target: Target) -> Result<(), ComposeError> {
        let node = self.resolver.resolve(&self.document, &target, None)?;
        self.run_teardown(node, None);
        self.document.clear_children(node)?;
        tracing::debug!(%node, target = %target, "emptied");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::{ErrorCategory, MemorySink};
    use std::cell::Cell;
    use std::rc::Rc;

    const PAGE: &str = r#"
        template "row-tpl" {
            li.row {
                span.name
                span.amount
            }
        }
        template "badge-tpl" { b.badge }
        div.list-container {
            ul.list
        }
    "#;

    fn setup() -> (Engine, MemorySink) {
        let sink = MemorySink::new();
        let engine = Engine::from_markup(PAGE, EngineConfig::default())
            .unwrap()
            .with_sink(sink.clone());
        (engine, sink)
    }

    fn counter() -> (Rc<Cell<u32>>, impl FnOnce(&Document, NodeId) + 'static) {
        let count = Rc::new(Cell::new(0));
        let handle = Rc::clone(&count);
        (count, move |_: &Document, _: NodeId| handle.set(handle.get() + 1))
    }

    #[test]
    fn test_compose_appends_into_wrapper() {
        let (mut engine, sink) = setup();
        let root = engine
            .compose_node(
                CompositionRequest::new(".list", "#row-tpl")
                    .with_id("row1")
                    .with_value(ValueBinding::text(".name", "Alice")),
            )
            .unwrap();

        let list = engine.resolve(".list").unwrap();
        assert_eq!(engine.document().parent(root), Some(list));
        assert_eq!(engine.document().element(root).unwrap().id(), Some("row1"));
        assert_eq!(engine.document().text_content(root), "Alice");
        assert!(sink.is_empty());
    }

    #[test]
    fn test_missing_wrapper_and_template() {
        let (mut engine, sink) = setup();
        let request = CompositionRequest {
            template: Some("#row-tpl".into()),
            ..CompositionRequest::default()
        };
        assert_eq!(
            engine.try_compose_node(request).unwrap_err(),
            ComposeError::MissingWrapper
        );
        let request = CompositionRequest {
            wrapper: Some(".list".into()),
            ..CompositionRequest::default()
        };
        assert_eq!(
            engine.try_compose_node(request).unwrap_err(),
            ComposeError::MissingTemplate
        );
        assert_eq!(sink.messages(), vec!["Wrapper is undefined", "Template is undefined"]);
    }

    #[test]
    fn test_before_unset_requires_id() {
        let (mut engine, sink) = setup();
        let before = engine.render(&MarkupConfig::default());
        let (count, callback) = counter();
        let result = engine.try_compose_node(
            CompositionRequest::new(".list", "#row-tpl").before_unset(callback),
        );
        assert!(matches!(result, Err(ComposeError::UnsetWithoutId { .. })));
        assert_eq!(engine.render(&MarkupConfig::default()), before);
        assert_eq!(count.get(), 0);
        assert_eq!(sink.entries()[0].category, ErrorCategory::Configuration);
    }

    #[test]
    fn test_silent_mode_reports_nothing() {
        let sink = MemorySink::new();
        let mut engine = Engine::from_markup(
            PAGE,
            EngineConfig::new().with_vocal_mode(VocalMode::Silent),
        )
        .unwrap()
        .with_sink(sink.clone());
        assert!(engine
            .compose_node(CompositionRequest::new(".missing", "#row-tpl"))
            .is_none());
        assert!(!engine.remove_node("#nothing"));
        assert!(sink.is_empty());
    }

    #[test]
    fn test_binding_failure_is_skipped_by_default() {
        let (mut engine, sink) = setup();
        let root = engine
            .compose_node(
                CompositionRequest::new(".list", "#row-tpl")
                    .with_value(ValueBinding::text(".nope", "x"))
                    .with_value(ValueBinding::text(".amount", "12.50")),
            )
            .unwrap();
        assert_eq!(engine.document().text_content(root), "12.50");
        assert_eq!(
            sink.messages(),
            vec!["No elements with selector '.nope' were found in the scope"]
        );
    }

    #[test]
    fn test_binding_failure_aborts_when_configured() {
        let (engine, sink) = setup();
        let mut engine =
            engine.with_config(EngineConfig::new().with_binding_failures(BindingPolicy::Abort));
        let nodes_before = engine.document().node_count();
        let (count, callback) = counter();
        let result = engine.try_compose_node(
            CompositionRequest::new(".list", "#row-tpl")
                .with_id("row1")
                .before_unset(callback)
                .with_value(ValueBinding::text(".nope", "x")),
        );
        assert!(matches!(
            result,
            Err(ComposeError::Lookup(LookupError::NodeNotFound { .. }))
        ));
        assert_eq!(engine.document().node_count(), nodes_before);
        assert!(engine.teardown().is_empty());
        assert_eq!(count.get(), 0);
        assert_eq!(sink.len(), 1);
    }

    #[test]
    fn test_markup_binding_and_attributes() {
        let (mut engine, _sink) = setup();
        let root = engine
            .compose_node(CompositionRequest::new(".list", "#row-tpl").with_value(
                ValueBinding::markup(".name", r#"b { "Bold" } " name""#)
                    .with_attribute("title", "Bold name"),
            ))
            .unwrap();
        let name = engine.resolve(".list .name").unwrap();
        assert_eq!(engine.document().text_content(root), "Bold name");
        assert_eq!(
            engine.document().element(name).unwrap().attribute("title"),
            Some("Bold name")
        );
        assert!(engine.resolve(".name > b").is_ok());
    }

    #[test]
    fn test_invalid_markup_binding_is_reported() {
        let (mut engine, sink) = setup();
        engine
            .compose_node(
                CompositionRequest::new(".list", "#row-tpl")
                    .with_value(ValueBinding::markup(".name", "b {")),
            )
            .unwrap();
        assert_eq!(sink.len(), 1);
        assert!(sink.messages()[0].starts_with("Content for '.name' is not valid markup"));
    }

    #[test]
    fn test_children_compose_into_fragment_before_attach() {
        let (mut engine, _sink) = setup();
        let attached_at_child_time = Rc::new(Cell::new(None));
        let seen = Rc::clone(&attached_at_child_time);
        engine
            .compose_node(
                CompositionRequest::new(".list", "#row-tpl").with_child(
                    CompositionRequest::new(".name", "#badge-tpl").after_insert(
                        move |doc, root| seen.set(Some(doc.is_connected(root))),
                    ),
                ),
            )
            .unwrap();
        assert_eq!(attached_at_child_time.get(), Some(false));
        assert!(engine.resolve(".list .row .name > .badge").is_ok());
    }

    #[test]
    fn test_child_failure_does_not_abort_parent() {
        let (mut engine, sink) = setup();
        let root = engine.compose_node(
            CompositionRequest::new(".list", "#row-tpl")
                .with_child(CompositionRequest::new(".missing", "#badge-tpl"))
                .with_child(CompositionRequest::new(".amount", "#badge-tpl")),
        );
        assert!(root.is_some());
        assert_eq!(sink.len(), 1);
        assert!(engine.resolve(".amount > .badge").is_ok());
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let (mut engine, sink) = setup();
        let (first, callback) = counter();
        engine
            .compose_node(
                CompositionRequest::new(".list", "#row-tpl")
                    .with_id("row1")
                    .before_unset(callback),
            )
            .unwrap();
        let before = engine.render(&MarkupConfig::default());

        let (second, callback) = counter();
        let result = engine.try_compose_node(
            CompositionRequest::new(".list", "#row-tpl")
                .with_id("row1")
                .before_unset(callback),
        );
        assert_eq!(
            result,
            Err(ComposeError::DuplicateId {
                id: "row1".to_string()
            })
        );
        assert_eq!(engine.render(&MarkupConfig::default()), before);
        assert_eq!(engine.teardown().ids(), vec!["row1"]);
        assert_eq!((first.get(), second.get()), (0, 0));
        assert_eq!(sink.len(), 1);
    }

    #[test]
    fn test_duplicate_id_allowed_when_cleared_by_same_call() {
        let (mut engine, _sink) = setup();
        let (first, callback) = counter();
        engine
            .compose_node(
                CompositionRequest::new(".list", "#row-tpl")
                    .with_id("row1")
                    .before_unset(callback),
            )
            .unwrap();
        let (second, callback) = counter();
        engine
            .compose_node(
                CompositionRequest::new(".list", "#row-tpl")
                    .with_id("row1")
                    .before_unset(callback)
                    .incremental(false),
            )
            .unwrap();
        assert_eq!((first.get(), second.get()), (1, 0));
        assert_eq!(engine.teardown().ids(), vec!["row1"]);
    }

    #[test]
    fn test_duplicate_id_allowed_by_policy() {
        let (engine, _sink) = setup();
        let mut engine =
            engine.with_config(EngineConfig::new().with_duplicate_ids(DuplicateIdPolicy::Allow));
        for _ in 0..2 {
            engine
                .compose_node(
                    CompositionRequest::new(".list", "#row-tpl")
                        .with_id("row1")
                        .before_unset(|_, _| {}),
                )
                .unwrap();
        }
        assert_eq!(engine.teardown().ids(), vec!["row1", "row1"]);
    }

    #[test]
    fn test_direct_node_template() {
        let (mut engine, _sink) = setup();
        let detached = engine.document_mut().create_element("aside");
        let root = engine
            .compose_node(CompositionRequest::new(".list-container", detached).with_id("side"))
            .unwrap();
        assert_eq!(root, detached);
        assert!(engine.resolve(".list-container > aside#side").is_ok());

        let list = engine.resolve(".list").unwrap();
        let container = engine.resolve(".list-container").unwrap();
        let result = engine.try_compose_node(CompositionRequest::new(Target::Node(list), container));
        assert!(matches!(
            result,
            Err(ComposeError::Dom(DomError::HierarchyRequest { .. }))
        ));
    }

    #[test]
    fn test_remove_root_is_rejected() {
        let (mut engine, _sink) = setup();
        assert!(matches!(
            engine.try_remove_node(Target::Node(NodeId::ROOT)),
            Err(ComposeError::Dom(_))
        ));
        assert!(engine.resolve(".list").is_ok());
    }

    #[test]
    fn test_replace_wrapper_requires_attached_wrapper() {
        let (mut engine, _sink) = setup();
        let result = engine.try_compose_node(
            CompositionRequest::new(Target::Node(NodeId::ROOT), "#row-tpl").replace_wrapper(true),
        );
        assert!(matches!(
            result,
            Err(ComposeError::Dom(DomError::Detached { .. }))
        ));
    }
}
