//! Engine and output settings
//!
//! Settings can be built in code with the `with_*` builders or loaded from
//! a TOML file:
//!
//! ```toml
//! [engine]
//! vocal_mode = "error"        # silent | log | error
//! duplicate_ids = "reject"    # reject | allow
//! binding_failures = "skip"   # skip | abort
//!
//! [markup]
//! pretty_print = true
//! indent_width = 2
//! ```

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::renderer::MarkupConfig;

/// Errors that can occur when loading settings
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read settings file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse settings TOML: {0}")]
    ParseError(#[from] toml::de::Error),
}

/// How loudly failures are reported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VocalMode {
    /// Drop diagnostics
    Silent,
    /// Report at info level
    Log,
    /// Report at error level
    #[default]
    Error,
}

/// What happens when a request registers an id that already has a live teardown entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicateIdPolicy {
    /// Fail with a configuration error before any mutation
    #[default]
    Reject,
    /// Register a second entry under the same id
    Allow,
}

/// What happens when a value binding cannot be applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BindingPolicy {
    /// Report the failure and continue with the next binding
    #[default]
    Skip,
    /// Discard the fragment and fail before the host tree is touched
    Abort,
}

/// Behaviour switches for the composition engine
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub vocal_mode: VocalMode,
    pub duplicate_ids: DuplicateIdPolicy,
    pub binding_failures: BindingPolicy,
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_vocal_mode(mut self, mode: VocalMode) -> Self {
        self.vocal_mode = mode;
        self
    }

    pub fn with_duplicate_ids(mut self, policy: DuplicateIdPolicy) -> Self {
        self.duplicate_ids = policy;
        self
    }

    pub fn with_binding_failures(mut self, policy: BindingPolicy) -> Self {
        self.binding_failures = policy;
        self
    }
}

/// Everything a settings file can configure
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub engine: EngineConfig,
    pub markup: MarkupConfig,
}

impl Settings {
    /// Load settings from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Load settings from a TOML string; missing keys take their defaults
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn with_engine(mut self, engine: EngineConfig) -> Self {
        self.engine = engine;
        self
    }

    pub fn with_markup(mut self, markup: MarkupConfig) -> Self {
        self.markup = markup;
        self
    }
}
