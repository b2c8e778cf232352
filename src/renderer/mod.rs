//! Markup renderer for the host tree
//!
//! This module takes a `Document` and serialises any subtree back into the
//! markup language.

pub mod config;
pub mod markup;

pub use config::MarkupConfig;
pub use markup::{render_markup, MarkupBuilder};
