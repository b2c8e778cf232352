//! Composition request descriptors

use crate::dom::{Document, NodeId};
use crate::query::Target;
use crate::template::TemplateRef;

/// Invoked with the composed root right after it is attached
pub type AfterInsert = Box<dyn FnOnce(&mut Document, NodeId)>;

/// Invoked once with the managed node when it is torn down
pub type BeforeUnset = Box<dyn FnOnce(&Document, NodeId)>;

/// What a value binding writes into its target
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    /// Plain text, replacing the target's children
    Text(String),
    /// Markup source, parsed and built in place of the target's children
    Markup(String),
}

/// Content and attributes applied to a node inside the fragment being built
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueBinding {
    pub wrapper: Target,
    pub content: Option<Content>,
    pub attributes: Vec<(String, String)>,
}

impl ValueBinding {
    pub fn new(wrapper: impl Into<Target>) -> Self {
        Self {
            wrapper: wrapper.into(),
            content: None,
            attributes: Vec::new(),
        }
    }

    pub fn text(wrapper: impl Into<Target>, text: impl Into<String>) -> Self {
        Self::new(wrapper).with_content(Content::Text(text.into()))
    }

    pub fn markup(wrapper: impl Into<Target>, markup: impl Into<String>) -> Self {
        Self::new(wrapper).with_content(Content::Markup(markup.into()))
    }

    pub fn with_content(mut self, content: Content) -> Self {
        self.content = Some(content);
        self
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((name.into(), value.into()));
        self
    }
}

/// One node of a composition tree
///
/// `children` are composed into this request's fragment before it is
/// attached, unless a child names its own `scope`.
pub struct CompositionRequest {
    pub id: Option<String>,
    pub wrapper: Option<Target>,
    pub template: Option<TemplateRef>,
    pub values: Vec<ValueBinding>,
    pub children: Vec<CompositionRequest>,
    pub scope: Option<NodeId>,
    pub after_insert: Option<AfterInsert>,
    pub before_unset: Option<BeforeUnset>,
    /// When false, the wrapper is torn down and cleared before attaching
    pub incremental: bool,
    /// When true, the fragment takes the wrapper's place instead of going inside it
    pub replace_wrapper: bool,
}

impl Default for CompositionRequest {
    fn default() -> Self {
        Self {
            id: None,
            wrapper: None,
            template: None,
            values: Vec::new(),
            children: Vec::new(),
            scope: None,
            after_insert: None,
            before_unset: None,
            incremental: true,
            replace_wrapper: false,
        }
    }
}

impl std::fmt::Debug for CompositionRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompositionRequest")
            .field("id", &self.id)
            .field("wrapper", &self.wrapper)
            .field("template", &self.template)
            .field("values", &self.values)
            .field("children", &self.children)
            .field("scope", &self.scope)
            .field("after_insert", &self.after_insert.is_some())
            .field("before_unset", &self.before_unset.is_some())
            .field("incremental", &self.incremental)
            .field("replace_wrapper", &self.replace_wrapper)
            .finish()
    }
}

impl CompositionRequest {
    pub fn new(wrapper: impl Into<Target>, template: impl Into<TemplateRef>) -> Self {
        Self {
            wrapper: Some(wrapper.into()),
            template: Some(template.into()),
            ..Self::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_value(mut self, binding: ValueBinding) -> Self {
        self.values.push(binding);
        self
    }

    pub fn with_values(mut self, bindings: impl IntoIterator<Item = ValueBinding>) -> Self {
        self.values.extend(bindings);
        self
    }

    pub fn with_child(mut self, child: CompositionRequest) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_children(mut self, children: impl IntoIterator<Item = CompositionRequest>) -> Self {
        self.children.extend(children);
        self
    }

    pub fn with_scope(mut self, scope: NodeId) -> Self {
        self.scope = Some(scope);
        self
    }

    pub fn after_insert(mut self, callback: impl FnOnce(&mut Document, NodeId) + 'static) -> Self {
        self.after_insert = Some(Box::new(callback));
        self
    }

    pub fn before_unset(mut self, callback: impl FnOnce(&Document, NodeId) + 'static) -> Self {
        self.before_unset = Some(Box::new(callback));
        self
    }

    pub fn incremental(mut self, incremental: bool) -> Self {
        self.incremental = incremental;
        self
    }

    pub fn replace_wrapper(mut self, replace: bool) -> Self {
        self.replace_wrapper = replace;
        self
    }

    /// Label used in diagnostics: the template name, or the wrapper when there is none
    pub fn label(&self) -> String {
        match (&self.template, &self.wrapper) {
            (Some(template), _) => template.to_string(),
            (None, Some(wrapper)) => wrapper.to_string(),
            (None, None) => String::new(),
        }
    }
}
