//! Composition scripts
//!
//! A script is a TOML file with an ordered list of steps, each one compose,
//! remove or empty call against a single engine:
//!
//! ```toml
//! [[step]]
//! [step.compose]
//! id = "row1"
//! wrapper = ".list"
//! template = "#row-tpl"
//! before_unset = "log"
//! values = [{ wrapper = ".name", text = "Alice" }]
//!
//! [[step]]
//! remove = "#row1"
//! ```
//!
//! Callbacks are named; names resolve against a [`HookTable`]. A compose
//! table is converted to a request before the step touches the engine, so
//! a malformed table is reported and skipped without side effects.

use std::collections::HashMap;
use std::path::Path;
use std::rc::Rc;

use serde::Deserialize;
use thiserror::Error;
use toml::{Table, Value};

use crate::compose::{ComposeError, CompositionRequest, Content, Engine, ValueBinding};
use crate::dom::{Document, NodeId};

/// Errors that can occur when loading a script
#[derive(Error, Debug)]
pub enum ScriptError {
    #[error("Failed to read script file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse script TOML: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Invalid step {index}: {message}")]
    InvalidStep { index: usize, message: String },
}

/// A named callback usable as `after_insert` or `before_unset`
pub type Hook = Rc<dyn Fn(&Document, NodeId)>;

/// Hook names available to scripts
#[derive(Clone)]
pub struct HookTable {
    hooks: HashMap<String, Hook>,
}

impl Default for HookTable {
    /// A table with the built-in `log` hook
    fn default() -> Self {
        let mut table = Self::empty();
        table.register("log", |doc, node| {
            let element = doc.element(node);
            tracing::info!(
                %node,
                tag = element.map(|e| e.tag.as_str()).unwrap_or_default(),
                id = element.and_then(|e| e.id()).unwrap_or_default(),
                "hook fired"
            );
        });
        table
    }
}

impl std::fmt::Debug for HookTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<_> = self.hooks.keys().collect();
        names.sort();
        f.debug_struct("HookTable").field("hooks", &names).finish()
    }
}

impl HookTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// A table without any hooks
    pub fn empty() -> Self {
        Self {
            hooks: HashMap::new(),
        }
    }

    pub fn register(&mut self, name: impl Into<String>, hook: impl Fn(&Document, NodeId) + 'static) {
        self.hooks.insert(name.into(), Rc::new(hook));
    }

    pub fn get(&self, name: &str) -> Option<Hook> {
        self.hooks.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.hooks.contains_key(name)
    }
}

/// One script step
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// Raw compose table, converted when the step runs
    Compose(Table),
    Remove(String),
    Empty(String),
}

/// Outcome counts of a script run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScriptReport {
    pub succeeded: usize,
    pub failed: usize,
}

/// TOML structure for deserializing scripts
#[derive(Deserialize)]
struct TomlScript {
    #[serde(default)]
    step: Vec<Table>,
}

/// An ordered list of steps
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Script {
    steps: Vec<Step>,
}

impl Script {
    /// Load a script from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ScriptError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Load a script from a TOML string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, ScriptError> {
        let parsed: TomlScript = toml::from_str(content)?;
        let steps = parsed
            .step
            .into_iter()
            .enumerate()
            .map(|(index, table)| parse_step(index, table))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Script { steps })
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Run every step in order; failures are reported through the engine
    pub fn run(&self, engine: &mut Engine, hooks: &HookTable) -> ScriptReport {
        let mut report = ScriptReport::default();
        for (index, step) in self.steps.iter().enumerate() {
            let ok = match step {
                Step::Compose(table) => match request_from_table(table, hooks) {
                    Ok(request) => engine.try_compose_node(request).is_ok(),
                    Err(err) => {
                        engine.report(&err);
                        false
                    }
                },
                Step::Remove(target) => engine.try_remove_node(target.as_str()).is_ok(),
                Step::Empty(target) => engine.try_empty_node(target.as_str()).is_ok(),
            };
            tracing::debug!(step = index, ok, "script step finished");
            if ok {
                report.succeeded += 1;
            } else {
                report.failed += 1;
            }
        }
        report
    }
}

fn parse_step(index: usize, table: Table) -> Result<Step, ScriptError> {
    let invalid = |message: &str| ScriptError::InvalidStep {
        index,
        message: message.to_string(),
    };

    if table.len() != 1 {
        return Err(invalid("expected exactly one of compose, remove or empty"));
    }
    let (key, value) = table
        .into_iter()
        .next()
        .ok_or_else(|| invalid("empty step"))?;

    match (key.as_str(), value) {
        ("compose", Value::Table(request)) => Ok(Step::Compose(request)),
        ("compose", _) => Err(invalid("compose must be a table")),
        ("remove", Value::String(target)) => Ok(Step::Remove(target)),
        ("empty", Value::String(target)) => Ok(Step::Empty(target)),
        ("remove" | "empty", _) => Err(invalid("target must be a string")),
        (other, _) => Err(invalid(&format!("unknown step kind '{}'", other))),
    }
}

const REQUEST_FIELDS: &[&str] = &[
    "id",
    "wrapper",
    "template",
    "values",
    "children",
    "incremental",
    "replace_wrapper",
    "after_insert",
    "before_unset",
];

/// Convert a compose table into a request without touching any engine
pub fn request_from_table(
    table: &Table,
    hooks: &HookTable,
) -> Result<CompositionRequest, ComposeError> {
    if let Some(unknown) = table.keys().find(|k| !REQUEST_FIELDS.contains(&k.as_str())) {
        return Err(ComposeError::InvalidField {
            field: unknown.clone(),
            expected: format!("one of {}", REQUEST_FIELDS.join(", ")),
        });
    }

    let template = optional_string(table, "template")?;
    let label = template.clone().unwrap_or_default();
    let mut request = CompositionRequest {
        id: optional_string(table, "id")?,
        wrapper: optional_string(table, "wrapper")?.map(Into::into),
        template: template.map(Into::into),
        ..CompositionRequest::default()
    };

    if let Some(incremental) = optional_bool(table, "incremental")? {
        request.incremental = incremental;
    }
    if let Some(replace) = optional_bool(table, "replace_wrapper")? {
        request.replace_wrapper = replace;
    }

    if let Some(values) = table.get("values") {
        let Value::Array(items) = values else {
            return Err(ComposeError::InvalidValues { template: label });
        };
        request.values = items
            .iter()
            .enumerate()
            .map(|(i, item)| binding_from_value(i, item))
            .collect::<Result<_, _>>()?;
    }

    if let Some(children) = table.get("children") {
        let Value::Array(items) = children else {
            return Err(ComposeError::InvalidChildren { template: label });
        };
        for (i, item) in items.iter().enumerate() {
            let Value::Table(child) = item else {
                return Err(ComposeError::InvalidField {
                    field: format!("children[{}]", i),
                    expected: "a table".to_string(),
                });
            };
            request.children.push(request_from_table(child, hooks)?);
        }
    }

    if let Some(name) = hook_name(table, "after_insert")? {
        let hook = lookup_hook(hooks, &name)?;
        request = request.after_insert(move |doc: &mut Document, node| hook(&*doc, node));
    }
    if let Some(name) = hook_name(table, "before_unset")? {
        let hook = lookup_hook(hooks, &name)?;
        request = request.before_unset(move |doc: &Document, node| hook(doc, node));
    }

    Ok(request)
}

fn binding_from_value(index: usize, value: &Value) -> Result<ValueBinding, ComposeError> {
    let field = |name: &str| format!("values[{}].{}", index, name);
    let Value::Table(table) = value else {
        return Err(ComposeError::InvalidField {
            field: format!("values[{}]", index),
            expected: "a table".to_string(),
        });
    };

    let wrapper = match table.get("wrapper") {
        Some(Value::String(wrapper)) => wrapper.clone(),
        _ => {
            return Err(ComposeError::InvalidField {
                field: field("wrapper"),
                expected: "a string".to_string(),
            })
        }
    };
    let mut binding = ValueBinding::new(wrapper);

    match (table.get("text"), table.get("markup")) {
        (Some(_), Some(_)) => {
            return Err(ComposeError::InvalidField {
                field: field("text"),
                expected: "absent when markup is given".to_string(),
            })
        }
        (Some(Value::String(text)), None) => binding.content = Some(Content::Text(text.clone())),
        (None, Some(Value::String(markup))) => {
            binding.content = Some(Content::Markup(markup.clone()))
        }
        (Some(_), None) => {
            return Err(ComposeError::InvalidField {
                field: field("text"),
                expected: "a string".to_string(),
            })
        }
        (None, Some(_)) => {
            return Err(ComposeError::InvalidField {
                field: field("markup"),
                expected: "a string".to_string(),
            })
        }
        (None, None) => {}
    }

    match table.get("attributes") {
        None => {}
        Some(Value::Table(attributes)) => {
            for (name, value) in attributes {
                let Value::String(value) = value else {
                    return Err(ComposeError::InvalidField {
                        field: field(&format!("attributes.{}", name)),
                        expected: "a string".to_string(),
                    });
                };
                binding = binding.with_attribute(name.clone(), value.clone());
            }
        }
        Some(_) => {
            return Err(ComposeError::InvalidField {
                field: field("attributes"),
                expected: "a table".to_string(),
            })
        }
    }

    Ok(binding)
}

fn optional_string(table: &Table, key: &str) -> Result<Option<String>, ComposeError> {
    match table.get(key) {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(ComposeError::InvalidField {
            field: key.to_string(),
            expected: "a string".to_string(),
        }),
    }
}

fn optional_bool(table: &Table, key: &str) -> Result<Option<bool>, ComposeError> {
    match table.get(key) {
        None => Ok(None),
        Some(Value::Boolean(b)) => Ok(Some(*b)),
        Some(_) => Err(ComposeError::InvalidField {
            field: key.to_string(),
            expected: "a boolean".to_string(),
        }),
    }
}

fn hook_name(table: &Table, key: &str) -> Result<Option<String>, ComposeError> {
    match table.get(key) {
        None => Ok(None),
        Some(Value::String(name)) => Ok(Some(name.clone())),
        Some(other) => Err(ComposeError::NotCallable {
            name: other.to_string(),
        }),
    }
}

fn lookup_hook(hooks: &HookTable, name: &str) -> Result<Hook, ComposeError> {
    hooks.get(name).ok_or_else(|| ComposeError::NotCallable {
        name: name.to_string(),
    })
}
