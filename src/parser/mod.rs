//! Parsers for the markup language and the structural query language

pub mod ast;
mod grammar;
pub mod lexer;

pub use ast::*;
pub use grammar::{parse, parse_fragment, parse_query};
