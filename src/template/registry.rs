//! Template registry for storing and instantiating template definitions

use std::collections::HashMap;
use std::path::PathBuf;
use thiserror::Error;

use crate::dom::{build_fragment, Document, DomError, NodeId};
use crate::parser::ast::{MarkupNode, Spanned, Statement, TemplateDecl, TemplateSource};
use crate::parser::parse_fragment;

/// Errors that can occur during template operations
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TemplateError {
    /// Template not found in registry
    #[error("template not found: {name}")]
    NotFound { name: String },

    /// Duplicate template definition
    #[error("duplicate template definition: {name}")]
    Duplicate { name: String },

    /// Error reading template file
    #[error("error reading template file {path}: {message}")]
    FileReadError { path: PathBuf, message: String },

    /// Template file is not valid markup
    #[error("invalid markup in template file {path}: {message}")]
    InvalidMarkup { path: PathBuf, message: String },

    /// Template content has no element to serve as its root
    #[error("template {name} has no root element")]
    NoRootElement { name: String },

    #[error(transparent)]
    Dom(#[from] DomError),
}

/// A stored template definition
#[derive(Debug, Clone)]
pub struct TemplateDefinition {
    /// Template name
    pub name: String,
    /// Inline or file-backed
    pub source: TemplateSource,
    /// Path to source file (for file-based templates)
    pub source_path: Option<PathBuf>,
    /// Template body (loaded lazily for file-based templates)
    pub body: Option<Vec<Spanned<MarkupNode>>>,
}

impl TemplateDefinition {
    /// Create a new template definition from a TemplateDecl
    pub fn from_decl(decl: &TemplateDecl) -> Self {
        Self {
            name: decl.name.node.0.clone(),
            source: decl.source.clone(),
            source_path: decl.path.as_ref().map(|p| PathBuf::from(&p.node)),
            body: decl.body.clone(),
        }
    }

    pub fn inline(name: impl Into<String>, body: Vec<Spanned<MarkupNode>>) -> Self {
        Self {
            name: name.into(),
            source: TemplateSource::Inline,
            source_path: None,
            body: Some(body),
        }
    }

    pub fn file(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            source: TemplateSource::File,
            source_path: Some(path.into()),
            body: None,
        }
    }

    /// Check if this is a file-based template
    pub fn is_file_based(&self) -> bool {
        self.source == TemplateSource::File
    }

    /// Whether the body is loaded and has at least one top-level element
    pub fn has_element_root(&self) -> bool {
        self.body
            .as_ref()
            .is_some_and(|body| body.iter().any(|n| n.node.is_element()))
    }
}

/// Content to instantiate: a registered template or a node already in hand
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateRef {
    Named(String),
    Node(NodeId),
}

impl From<&str> for TemplateRef {
    fn from(name: &str) -> Self {
        TemplateRef::Named(name.to_string())
    }
}

impl From<String> for TemplateRef {
    fn from(name: String) -> Self {
        TemplateRef::Named(name)
    }
}

impl From<NodeId> for TemplateRef {
    fn from(node: NodeId) -> Self {
        TemplateRef::Node(node)
    }
}

impl std::fmt::Display for TemplateRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TemplateRef::Named(name) => write!(f, "{}", name),
            TemplateRef::Node(node) => write!(f, "{}", node),
        }
    }
}

/// Strip the query-style `#` so `#row-tpl` and `row-tpl` name the same template
fn normalize_name(name: &str) -> &str {
    name.strip_prefix('#').unwrap_or(name)
}

/// Registry for storing template definitions
#[derive(Debug, Default)]
pub struct TemplateRegistry {
    templates: HashMap<String, TemplateDefinition>,
    /// Base path for resolving relative file paths
    base_path: Option<PathBuf>,
}

impl TemplateRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new registry with a base path for file resolution
    pub fn with_base_path(base_path: PathBuf) -> Self {
        Self {
            templates: HashMap::new(),
            base_path: Some(base_path),
        }
    }

    /// Register a template from a declaration
    pub fn register(&mut self, decl: &TemplateDecl) -> Result<(), TemplateError> {
        self.register_definition(TemplateDefinition::from_decl(decl))
    }

    /// Register a template definition directly
    pub fn register_definition(&mut self, def: TemplateDefinition) -> Result<(), TemplateError> {
        if self.templates.contains_key(&def.name) {
            return Err(TemplateError::Duplicate {
                name: def.name.clone(),
            });
        }
        self.templates.insert(def.name.clone(), def);
        Ok(())
    }

    /// Get a template by name (`#name` accepted)
    pub fn get(&self, name: &str) -> Option<&TemplateDefinition> {
        self.templates.get(normalize_name(name))
    }

    /// Check if a template exists
    pub fn contains(&self, name: &str) -> bool {
        self.templates.contains_key(normalize_name(name))
    }

    /// Get all template names
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.templates.keys().map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Get the base path for file resolution
    pub fn base_path(&self) -> Option<&PathBuf> {
        self.base_path.as_ref()
    }

    /// Set the base path for file resolution
    pub fn set_base_path(&mut self, path: PathBuf) {
        self.base_path = Some(path);
    }

    /// Resolve a relative path against the base path
    pub fn resolve_path(&self, relative: &std::path::Path) -> PathBuf {
        match &self.base_path {
            Some(base) => base.join(relative),
            None => relative.to_path_buf(),
        }
    }

    /// Load the body of a file-based template if it has not been loaded yet
    pub fn load(&mut self, name: &str) -> Result<(), TemplateError> {
        let name = normalize_name(name);
        let def = self
            .templates
            .get(name)
            .ok_or_else(|| TemplateError::NotFound {
                name: name.to_string(),
            })?;

        if def.body.is_some() {
            return Ok(());
        }

        let relative = def.source_path.clone().unwrap_or_else(|| PathBuf::from(name));
        let full_path = self.resolve_path(&relative);
        tracing::debug!(template = name, path = %full_path.display(), "loading template file");

        let content =
            std::fs::read_to_string(&full_path).map_err(|e| TemplateError::FileReadError {
                path: full_path.clone(),
                message: e.to_string(),
            })?;
        let body = parse_fragment(&content).map_err(|errors| TemplateError::InvalidMarkup {
            path: full_path.clone(),
            message: errors
                .iter()
                .map(|e| e.to_string())
                .collect::<Vec<_>>()
                .join("; "),
        })?;

        if let Some(def) = self.templates.get_mut(name) {
            def.body = Some(body);
        }
        Ok(())
    }

    /// Load a template and check it can be instantiated, without touching any document
    pub fn prepare(&mut self, name: &str) -> Result<&TemplateDefinition, TemplateError> {
        self.load(name)?;
        let def = self.get(name).ok_or_else(|| TemplateError::NotFound {
            name: normalize_name(name).to_string(),
        })?;
        if !def.has_element_root() {
            return Err(TemplateError::NoRootElement {
                name: def.name.clone(),
            });
        }
        Ok(def)
    }

    /// Build a fresh, detached copy of a template's content
    pub fn instantiate(&mut self, doc: &mut Document, name: &str) -> Result<NodeId, TemplateError> {
        let def = self.prepare(name)?;
        let body = def.body.as_deref().unwrap_or_default();
        Ok(build_fragment(doc, body)?)
    }

    /// Collect all template declarations from a page
    pub fn collect_from_statements(
        &mut self,
        statements: &[Spanned<Statement>],
    ) -> Result<(), TemplateError> {
        for stmt in statements {
            if let Statement::Template(decl) = &stmt.node {
                self.register(decl)?;
            }
        }
        Ok(())
    }
}
