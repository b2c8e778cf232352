//! Node Composer - declarative view composition over a host node tree
//!
//! This library provides a markup parser, an arena host tree, a query
//! resolver and a composition engine that instantiates templates, fills
//! them with values and tears them down again with registered callbacks.
//!
//! # Example
//!
//! ```rust
//! use node_composer::{load, CompositionRequest};
//!
//! let mut engine = load(r#"template "row-tpl" { li.row }  ul.list"#).unwrap();
//! let row = engine.compose_node(CompositionRequest::new(".list", "#row-tpl"));
//! assert!(row.is_some());
//! ```

pub mod compose;
pub mod config;
pub mod diagnostics;
pub mod dom;
pub mod error;
pub mod parser;
pub mod query;
pub mod renderer;
pub mod script;
pub mod template;

pub use compose::{
    AfterInsert, BeforeUnset, ComposeError, CompositionRequest, Content, Engine, TeardownRegistry,
    ValueBinding,
};
pub use config::{BindingPolicy, ConfigError, DuplicateIdPolicy, EngineConfig, Settings, VocalMode};
pub use diagnostics::{Diagnostic, DiagnosticSink, ErrorCategory, MemorySink, TracingSink};
pub use dom::{Document, DomError, NodeId};
pub use error::ParseError;
pub use parser::{parse, Page};
pub use query::{LookupError, Target};
pub use renderer::{render_markup, MarkupConfig};
pub use script::{HookTable, Script, ScriptError, ScriptReport};
pub use template::{TemplateError, TemplateRef, TemplateRegistry};

use thiserror::Error;

/// Errors that can occur while loading a page into an engine
#[derive(Debug, Error)]
pub enum LoadError {
    /// Error during parsing
    #[error("parse errors: {}", format_parse_errors(.0))]
    Parse(Vec<ParseError>),

    /// A template declaration was rejected
    #[error("template error: {0}")]
    Template(#[from] TemplateError),

    /// The page content could not be built
    #[error("tree error: {0}")]
    Dom(#[from] DomError),
}

impl From<Vec<ParseError>> for LoadError {
    fn from(errors: Vec<ParseError>) -> Self {
        LoadError::Parse(errors)
    }
}

fn format_parse_errors(errors: &[ParseError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Load a markup page into an engine with default configuration
///
/// Template declarations are registered and the remaining content becomes
/// the initial host tree.
///
/// # Example
///
/// ```rust
/// use node_composer::{load, CompositionRequest, MarkupConfig, ValueBinding};
///
/// let mut engine = load(r#"
///     template "row-tpl" {
///         li.row { span.name }
///     }
///     ul.list
/// "#).unwrap();
///
/// let request = CompositionRequest::new(".list", "#row-tpl")
///     .with_value(ValueBinding::text(".name", "Alice"));
/// engine.compose_node(request).unwrap();
///
/// let markup = engine.render(&MarkupConfig::default().with_pretty_print(false));
/// assert!(markup.contains("Alice"));
/// ```
pub fn load(source: &str) -> Result<Engine, LoadError> {
    load_with_config(source, EngineConfig::default())
}

/// Load a markup page into an engine with custom configuration
pub fn load_with_config(source: &str, config: EngineConfig) -> Result<Engine, LoadError> {
    Engine::from_markup(source, config)
}
