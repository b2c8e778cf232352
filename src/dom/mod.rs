//! The host tree: an arena of elements, text and detached fragments

mod build;
mod document;
mod error;
mod types;

pub use build::{build_fragment, build_into};
pub use document::{Ancestors, Descendants, Document};
pub use error::DomError;
pub use types::{Attribute, ElementData, Node, NodeId, NodeKind};
