//! Structural queries: find nodes inside a scope
//!
//! Queries are a CSS-like subset (`tag`, `*`, `#id`, `.class`, `[attr]`,
//! `[attr=value]`, descendant and `>` combinators, `,` groups). Matching
//! considers a node's full ancestry, but only descendants of the scope are
//! candidates.

mod error;
mod matcher;
mod resolver;

pub use error::LookupError;
pub use matcher::{matches_compound, matches_query, matches_selector};
pub use resolver::{QueryResolver, Target};
