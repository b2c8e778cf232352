//! Template system for reusable view fragments
//!
//! Templates are named blueprints of markup content. Each instantiation
//! builds a fresh detached fragment, so mutating one copy never affects
//! another copy or the blueprint itself.
//!
//! # Example
//!
//! ```text
//! // Define a template inline
//! template "row-tpl" {
//!     li.row {
//!         span.name
//!     }
//! }
//!
//! // Or load it from a file on first use
//! template "dialog" from "dialog.view"
//! ```

mod registry;

pub use registry::{TemplateDefinition, TemplateError, TemplateRef, TemplateRegistry};
