//! Lookup failures

use thiserror::Error;

use crate::dom::NodeId;

/// Errors raised while resolving templates, wrappers and removal targets
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    /// No blueprint is registered under the identifier
    #[error("template '{name}' not found")]
    TemplateNotFound { name: String },

    /// The query matched nothing inside the scope
    #[error("no node matches '{query}'")]
    NodeNotFound { query: String },

    /// The search root is not a live container
    #[error("cannot search for '{query}': {scope} is not a valid scope")]
    InvalidScope { query: String, scope: NodeId },

    /// The query could not be parsed
    #[error("invalid query '{query}': {message}")]
    InvalidQuery { query: String, message: String },

    /// A direct node reference is stale or cannot be used here
    #[error("{node} is not a live element")]
    StaleNode { node: NodeId },
}
