//! Diagnostic reporting for composition failures
//!
//! Every failure the engine catches is turned into a [`Diagnostic`]: a
//! category from the error taxonomy plus a message produced by positional
//! `{0}` substitution into a message template. Diagnostics go to a
//! [`DiagnosticSink`]; how loudly is decided by [`VocalMode`].

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::LazyLock;

use regex::Regex;

use crate::config::VocalMode;

/// Positional placeholders like `{0}`.
static PLACEHOLDER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{(\d+)\}").expect("PLACEHOLDER_REGEX must compile"));

/// Substitute `{N}` with the N-th argument; out-of-range placeholders stay verbatim
pub fn format_message(template: &str, args: &[&str]) -> String {
    PLACEHOLDER_REGEX
        .replace_all(template, |caps: &regex::Captures| {
            caps[1]
                .parse::<usize>()
                .ok()
                .and_then(|i| args.get(i))
                .map(|arg| arg.to_string())
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

/// The error taxonomy a diagnostic belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    Configuration,
    Lookup,
    Type,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorCategory::Configuration => "ConfigurationError",
            ErrorCategory::Lookup => "LookupError",
            ErrorCategory::Type => "TypeError",
        };
        write!(f, "{}", name)
    }
}

/// A reported failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub category: ErrorCategory,
    pub message: String,
}

impl Diagnostic {
    pub fn new(category: ErrorCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.category, self.message)
    }
}

/// Receives diagnostics from the engine
///
/// The engine never calls a sink in [`VocalMode::Silent`].
pub trait DiagnosticSink {
    fn report(&mut self, diagnostic: &Diagnostic, mode: VocalMode);
}

/// Logs diagnostics through `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn report(&mut self, diagnostic: &Diagnostic, mode: VocalMode) {
        match mode {
            VocalMode::Silent => {}
            VocalMode::Log => {
                tracing::info!(category = %diagnostic.category, "{}", diagnostic.message)
            }
            VocalMode::Error => {
                tracing::error!(category = %diagnostic.category, "{}", diagnostic.message)
            }
        }
    }
}

/// Collects diagnostics in memory; clones share the same buffer
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    entries: Rc<RefCell<Vec<Diagnostic>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<Diagnostic> {
        self.entries.borrow().clone()
    }

    pub fn messages(&self) -> Vec<String> {
        self.entries
            .borrow()
            .iter()
            .map(|d| d.message.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    pub fn clear(&self) {
        self.entries.borrow_mut().clear();
    }
}

impl DiagnosticSink for MemorySink {
    fn report(&mut self, diagnostic: &Diagnostic, _mode: VocalMode) {
        self.entries.borrow_mut().push(diagnostic.clone());
    }
}
