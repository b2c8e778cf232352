//! Configuration for markup rendering

use serde::Deserialize;

/// Configuration options for markup output
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MarkupConfig {
    /// Whether to format output with one node per line
    pub pretty_print: bool,

    /// Spaces per nesting level when pretty-printing
    pub indent_width: usize,
}

impl Default for MarkupConfig {
    fn default() -> Self {
        Self {
            pretty_print: true,
            indent_width: 2,
        }
    }
}

impl MarkupConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set whether to pretty-print output
    pub fn with_pretty_print(mut self, pretty: bool) -> Self {
        self.pretty_print = pretty;
        self
    }

    /// Set the indentation width
    pub fn with_indent_width(mut self, width: usize) -> Self {
        self.indent_width = width;
        self
    }
}
