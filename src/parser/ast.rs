//! Abstract Syntax Tree types for markup pages and structural queries

/// Byte range in source text
pub type Span = std::ops::Range<usize>;

/// AST node with source location
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned<T> {
    pub node: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(node: T, span: Span) -> Self {
        Self { node, span }
    }
}

/// Valid identifier (alphanumeric, underscore and hyphen, starts with letter/_)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identifier(pub String);

impl Identifier {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Identifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ==================== Markup ====================

/// Root AST node - template declarations plus the initial host content
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Page {
    pub statements: Vec<Spanned<Statement>>,
}

impl Page {
    /// Template declarations in source order
    pub fn templates(&self) -> impl Iterator<Item = &TemplateDecl> {
        self.statements.iter().filter_map(|s| match &s.node {
            Statement::Template(decl) => Some(decl),
            Statement::Node(_) => None,
        })
    }

    /// Top-level host content in source order
    pub fn content(&self) -> Vec<Spanned<MarkupNode>> {
        self.statements
            .iter()
            .filter_map(|s| match &s.node {
                Statement::Node(node) => Some(Spanned::new(node.clone(), s.span.clone())),
                Statement::Template(_) => None,
            })
            .collect()
    }
}

/// Top-level statement in a page
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Template(TemplateDecl),
    Node(MarkupNode),
}

/// Where a template's body comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateSource {
    /// Body written inline between braces
    Inline,
    /// Body read from a markup file on first use
    File,
}

/// `template "name" { ... }` or `template "name" from "path"`
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateDecl {
    pub name: Spanned<Identifier>,
    pub source: TemplateSource,
    pub path: Option<Spanned<String>>,
    pub body: Option<Vec<Spanned<MarkupNode>>>,
}

/// A node of markup content
#[derive(Debug, Clone, PartialEq)]
pub enum MarkupNode {
    Element(ElementDecl),
    Text(String),
}

impl MarkupNode {
    pub fn is_element(&self) -> bool {
        matches!(self, MarkupNode::Element(_))
    }
}

/// `tag#id.class [attr: value] { children }`
#[derive(Debug, Clone, PartialEq)]
pub struct ElementDecl {
    pub tag: Spanned<Identifier>,
    pub id: Option<Spanned<Identifier>>,
    pub classes: Vec<Spanned<Identifier>>,
    pub attributes: Vec<Spanned<AttributeDecl>>,
    pub children: Vec<Spanned<MarkupNode>>,
}

/// `name` or `name: value`
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeDecl {
    pub name: Spanned<Identifier>,
    pub value: Option<String>,
}

// ==================== Queries ====================

/// A selector group: a node matches if any selector matches
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub selectors: Vec<Selector>,
}

/// Compound selectors joined by combinators, written left to right
#[derive(Debug, Clone, PartialEq)]
pub struct Selector {
    pub head: Compound,
    pub tail: Vec<(Combinator, Compound)>,
}

impl Selector {
    /// The rightmost compound, the one the candidate itself must satisfy
    pub fn subject(&self) -> &Compound {
        self.tail.last().map(|(_, c)| c).unwrap_or(&self.head)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    /// Whitespace: any ancestor
    Descendant,
    /// `>`: the parent
    Child,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TagMatch {
    Any,
    Name(Identifier),
}

/// `tag#id.class[attr=value]`
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Compound {
    pub tag: Option<TagMatch>,
    pub ids: Vec<Identifier>,
    pub classes: Vec<Identifier>,
    pub attributes: Vec<AttributeMatcher>,
}

/// `[name]` or `[name=value]`
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeMatcher {
    pub name: Identifier,
    pub value: Option<String>,
}

/// One simple selector inside a compound, before folding
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum SimpleSelector {
    Id(Identifier),
    Class(Identifier),
    Attribute(AttributeMatcher),
}
