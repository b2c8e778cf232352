//! Composition failures and their diagnostic messages

use thiserror::Error;

use crate::diagnostics::{format_message, Diagnostic, ErrorCategory};
use crate::dom::DomError;
use crate::query::LookupError;
use crate::template::TemplateError;

/// Message templates with positional `{N}` placeholders
pub mod messages {
    pub const UNDEFINED_WRAPPER: &str = "Wrapper is undefined";
    pub const UNDEFINED_TEMPLATE: &str = "Template is undefined";
    pub const UNSET_WITHOUT_ID: &str = "Teardown callback for template '{0}' needs an id";
    pub const DUPLICATE_ID: &str = "Id '{0}' is already claimed by managed content";
    pub const INVALID_VALUES: &str = "Invalid values for template '{0}'";
    pub const INVALID_CHILDREN: &str = "Invalid children for template '{0}'";
    pub const NOT_CALLABLE: &str = "Hook '{0}' is not callable";
    pub const INVALID_FIELD: &str = "Field '{0}' must be {1}";
    pub const INVALID_MARKUP: &str = "Content for '{0}' is not valid markup: {1}";
    pub const TEMPLATE_NOT_FOUND: &str = "Template '{0}' was not found in the page document";
    pub const NODE_NOT_FOUND: &str = "No elements with selector '{0}' were found in the scope";
    pub const INVALID_SCOPE: &str = "Passed scope parameter for query '{0}' is not a valid node";
    pub const INVALID_QUERY: &str = "Selector '{0}' is not a valid query: {1}";
    pub const STALE_NODE: &str = "Passed node {0} is not a valid live node";
    pub const TEMPLATE_FAILURE: &str = "Template could not be used: {0}";
    pub const TREE_FAILURE: &str = "Host tree rejected the change: {0}";
}

/// Errors raised by composition and removal
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ComposeError {
    #[error("wrapper is undefined")]
    MissingWrapper,

    #[error("template is undefined")]
    MissingTemplate,

    /// `before_unset` was supplied without an `id` to register it under
    #[error("before_unset for template '{template}' requires an id")]
    UnsetWithoutId { template: String },

    #[error("id '{id}' is already claimed by managed content")]
    DuplicateId { id: String },

    #[error("values for template '{template}' must be a list")]
    InvalidValues { template: String },

    #[error("children for template '{template}' must be a list")]
    InvalidChildren { template: String },

    #[error("hook '{name}' is not callable")]
    NotCallable { name: String },

    #[error("field '{field}' must be {expected}")]
    InvalidField { field: String, expected: String },

    /// Rich binding content failed to parse
    #[error("content for '{wrapper}' is not valid markup: {message}")]
    Markup { wrapper: String, message: String },

    #[error(transparent)]
    Lookup(#[from] LookupError),

    #[error(transparent)]
    Template(TemplateError),

    #[error(transparent)]
    Dom(#[from] DomError),
}

impl From<TemplateError> for ComposeError {
    fn from(err: TemplateError) -> Self {
        match err {
            TemplateError::NotFound { name } => {
                ComposeError::Lookup(LookupError::TemplateNotFound { name })
            }
            other => ComposeError::Template(other),
        }
    }
}

impl ComposeError {
    /// Where this error sits in the Configuration / Lookup / Type taxonomy
    pub fn category(&self) -> ErrorCategory {
        match self {
            ComposeError::Lookup(_)
            | ComposeError::Template(TemplateError::FileReadError { .. }) => ErrorCategory::Lookup,
            ComposeError::InvalidValues { .. }
            | ComposeError::InvalidChildren { .. }
            | ComposeError::NotCallable { .. }
            | ComposeError::InvalidField { .. } => ErrorCategory::Type,
            ComposeError::MissingWrapper
            | ComposeError::MissingTemplate
            | ComposeError::UnsetWithoutId { .. }
            | ComposeError::DuplicateId { .. }
            | ComposeError::Markup { .. }
            | ComposeError::Template(_)
            | ComposeError::Dom(_) => ErrorCategory::Configuration,
        }
    }

    /// The message template and its arguments
    pub fn message_parts(&self) -> (&'static str, Vec<String>) {
        use messages::*;

        match self {
            ComposeError::MissingWrapper => (UNDEFINED_WRAPPER, vec![]),
            ComposeError::MissingTemplate => (UNDEFINED_TEMPLATE, vec![]),
            ComposeError::UnsetWithoutId { template } => (UNSET_WITHOUT_ID, vec![template.clone()]),
            ComposeError::DuplicateId { id } => (DUPLICATE_ID, vec![id.clone()]),
            ComposeError::InvalidValues { template } => (INVALID_VALUES, vec![template.clone()]),
            ComposeError::InvalidChildren { template } => {
                (INVALID_CHILDREN, vec![template.clone()])
            }
            ComposeError::NotCallable { name } => (NOT_CALLABLE, vec![name.clone()]),
            ComposeError::InvalidField { field, expected } => {
                (INVALID_FIELD, vec![field.clone(), expected.clone()])
            }
            ComposeError::Markup { wrapper, message } => {
                (INVALID_MARKUP, vec![wrapper.clone(), message.clone()])
            }
            ComposeError::Lookup(err) => match err {
                LookupError::TemplateNotFound { name } => (TEMPLATE_NOT_FOUND, vec![name.clone()]),
                LookupError::NodeNotFound { query } => (NODE_NOT_FOUND, vec![query.clone()]),
                LookupError::InvalidScope { query, .. } => (INVALID_SCOPE, vec![query.clone()]),
                LookupError::InvalidQuery { query, message } => {
                    (INVALID_QUERY, vec![query.clone(), message.clone()])
                }
                LookupError::StaleNode { node } => (STALE_NODE, vec![node.to_string()]),
            },
            ComposeError::Template(err) => (TEMPLATE_FAILURE, vec![err.to_string()]),
            ComposeError::Dom(err) => (TREE_FAILURE, vec![err.to_string()]),
        }
    }

    /// Render this error as a diagnostic
    pub fn diagnostic(&self) -> Diagnostic {
        let (template, args) = self.message_parts();
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        Diagnostic::new(self.category(), format_message(template, &args))
    }
}
