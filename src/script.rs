//! Fill scripts.
//!
//! A fill script maps friendly keys to entries, in declaration order:
//!
//! ```yaml
//! name.full:
//!   6: ctx.identity.firstName + " " + ctx.identity.lastName
//! status:
//!   value: ctx.filingStatus
//!   calculate: |
//!     (ctx, value) => {
//!       switch (value) {
//!         case 'single': return { field: 2, fill: 1 };
//!         case 'married': return { field: 3, fill: 1 };
//!       }
//!     }
//! ```
//!
//! An entry with a `value` key is calculated; any other mapping is indexed
//! and must have exactly one key, the field index.
//!
//! Scripts built in code can also use a Rust closure as the calculate step,
//! see [`Calculate::function`].

use crate::error::{Error, Result};
use crate::expression::Calculated;
use crate::loader::{self, YamlSource};
use crate::value::{yaml_key_to_string, Value};
use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;

/// Native calculate function, called with `(ctx, value)`.
pub type CalculateFn = Arc<dyn Fn(&Value, &Value) -> Result<Calculated> + Send + Sync>;

/// Second stage of a calculated entry.
#[derive(Clone)]
pub enum Calculate {
    /// Expression evaluating to `(ctx, value) => ({ field, fill })`
    Expression(String),
    /// Rust closure returning the field index and fill value
    Function(CalculateFn),
}

impl Calculate {
    /// Wrap a closure.
    pub fn function<F>(function: F) -> Self
    where
        F: Fn(&Value, &Value) -> Result<Calculated> + Send + Sync + 'static,
    {
        Calculate::Function(Arc::new(function))
    }
}

impl fmt::Debug for Calculate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Calculate::Expression(source) => f.debug_tuple("Expression").field(source).finish(),
            Calculate::Function(_) => f.write_str("Function(..)"),
        }
    }
}

// Closures compare by identity.
impl PartialEq for Calculate {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Calculate::Expression(a), Calculate::Expression(b)) => a == b,
            (Calculate::Function(a), Calculate::Function(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl Eq for Calculate {}

impl From<&str> for Calculate {
    fn from(source: &str) -> Self {
        Calculate::Expression(source.to_string())
    }
}

impl From<String> for Calculate {
    fn from(source: String) -> Self {
        Calculate::Expression(source)
    }
}

/// One script entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptEntry {
    /// `index: template` pairs; valid only with exactly one pair.
    Indexed(Vec<(String, String)>),
    /// Two-stage entry: `value` template, then `calculate` function.
    Calculated {
        /// Template producing the intermediate value
        value: String,
        /// Function choosing the field and fill value
        calculate: Calculate,
    },
}

impl ScriptEntry {
    /// Indexed entry filling `index` from `template`.
    pub fn indexed(index: impl Into<String>, template: impl Into<String>) -> Self {
        ScriptEntry::Indexed(vec![(index.into(), template.into())])
    }

    /// Calculated entry.
    pub fn calculated(value: impl Into<String>, calculate: impl Into<Calculate>) -> Self {
        ScriptEntry::Calculated {
            value: value.into(),
            calculate: calculate.into(),
        }
    }

    /// The single `(index, template)` pair of an indexed entry.
    ///
    /// Fails with [`Error::AmbiguousEntry`] when there is not exactly one.
    pub fn single_index(&self, friendly_key: &str) -> Result<(&str, &str)> {
        match self {
            ScriptEntry::Indexed(pairs) if pairs.len() == 1 => {
                Ok((pairs[0].0.as_str(), pairs[0].1.as_str()))
            },
            _ => Err(Error::AmbiguousEntry(friendly_key.to_string())),
        }
    }

    /// Short name used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ScriptEntry::Indexed(_) => "fixed-field",
            ScriptEntry::Calculated { .. } => "calculate",
        }
    }
}

/// Ordered friendly key to entry mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FillScript {
    entries: IndexMap<String, ScriptEntry>,
}

impl FillScript {
    /// Create an empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) an entry.
    pub fn insert(&mut self, friendly_key: impl Into<String>, entry: ScriptEntry) {
        self.entries.insert(friendly_key.into(), entry);
    }

    /// Build a script from a parsed YAML document.
    pub fn from_yaml(document: serde_yaml::Value) -> Result<Self> {
        let mapping = loader::into_mapping(document, "fill script")?;
        let mut script = Self::new();

        for (key, entry) in mapping {
            let friendly_key = yaml_key_to_string(&key);
            let entry = classify(&friendly_key, entry)?;
            script.insert(friendly_key, entry);
        }

        Ok(script)
    }

    /// Load a script from a YAML file or value.
    pub fn load(source: impl YamlSource) -> Result<Self> {
        Self::from_yaml(source.load_yaml()?)
    }

    /// Look up an entry.
    pub fn get(&self, friendly_key: &str) -> Option<&ScriptEntry> {
        self.entries.get(friendly_key)
    }

    /// Entries in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ScriptEntry)> {
        self.entries.iter().map(|(k, e)| (k.as_str(), e))
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the script has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn classify(friendly_key: &str, entry: serde_yaml::Value) -> Result<ScriptEntry> {
    let invalid = |reason: String| Error::InvalidScript {
        friendly_key: friendly_key.to_string(),
        reason,
    };

    let mapping = match entry {
        serde_yaml::Value::Mapping(mapping) => mapping,
        other => {
            return Err(invalid(format!("expected a mapping, found {}", loader::yaml_kind(&other))));
        },
    };

    if let Some(value) = mapping.get("value") {
        let value = template_text(value)
            .ok_or_else(|| invalid("'value' must be a template string".to_string()))?;
        let calculate = mapping
            .get("calculate")
            .ok_or_else(|| invalid("calculated entry has no 'calculate' expression".to_string()))?;
        let calculate = template_text(calculate)
            .ok_or_else(|| invalid("'calculate' must be an expression string".to_string()))?;
        return Ok(ScriptEntry::calculated(value, calculate));
    }

    let mut pairs = Vec::with_capacity(mapping.len());
    for (index, template) in &mapping {
        let index = yaml_key_to_string(index);
        let template = template_text(template)
            .ok_or_else(|| invalid(format!("template for index '{}' must be a scalar", index)))?;
        pairs.push((index, template));
    }
    Ok(ScriptEntry::Indexed(pairs))
}

/// Scalars become template text; `null` is an empty template.
fn template_text(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::Null => Some(String::new()),
        serde_yaml::Value::Bool(_) | serde_yaml::Value::Number(_) | serde_yaml::Value::String(_) => {
            Some(yaml_key_to_string(value))
        },
        serde_yaml::Value::Tagged(tagged) => template_text(&tagged.value),
        _ => None,
    }
}
