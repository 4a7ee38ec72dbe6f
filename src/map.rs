//! Field maps.
//!
//! A field map ties each physical form field identifier to a short numeric
//! index, e.g. `topmostSubform[0].Page1[0].f1_02[0]: '2'`. Scripts refer to
//! fields by index; the map resolves the index back to the identifier.
//!
//! Maps are generated from a document's field list (see
//! [`crate::mapping`]) and saved as YAML so that scripts stay readable.

use crate::error::{Error, Result};
use crate::loader::{self, YamlSource};
use crate::value::yaml_key_to_string;
use indexmap::IndexMap;
use std::path::Path;

/// Ordered mapping of field identifier to index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldMap {
    fields: IndexMap<String, String>,
}

impl FieldMap {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number fields `0..N-1` in enumeration order.
    ///
    /// Repeated names keep their first index.
    pub fn from_field_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut fields = IndexMap::new();
        for name in names {
            let name = name.into();
            if fields.contains_key(&name) {
                log::warn!("field '{}' listed more than once", name);
                continue;
            }
            let index = fields.len().to_string();
            fields.insert(name, index);
        }
        Self { fields }
    }

    /// Build a map from `(identifier, index)` pairs.
    ///
    /// Fails with [`Error::DuplicateIndex`] when two identifiers share an
    /// index. An identifier listed twice keeps its last index.
    pub fn from_entries<I>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut fields: IndexMap<String, String> = IndexMap::new();
        let mut seen: IndexMap<String, String> = IndexMap::new();

        for (id, index) in entries {
            if let Some(previous) = fields.get(&id) {
                seen.shift_remove(previous);
            }
            if let Some(first) = seen.get(&index) {
                return Err(Error::DuplicateIndex {
                    index,
                    first: first.clone(),
                    second: id,
                });
            }
            seen.insert(index.clone(), id.clone());
            fields.insert(id, index);
        }

        Ok(Self { fields })
    }

    /// Build a map from a parsed YAML document.
    ///
    /// Index values may be written as integers or strings.
    pub fn from_yaml(document: serde_yaml::Value) -> Result<Self> {
        let mapping = loader::into_mapping(document, "field map")?;
        let mut entries = Vec::with_capacity(mapping.len());
        for (key, value) in mapping {
            let id = yaml_key_to_string(&key);
            let index = match &value {
                serde_yaml::Value::Number(_) | serde_yaml::Value::String(_) => yaml_key_to_string(&value),
                other => {
                    return Err(Error::InvalidConfig(format!(
                        "field map entry '{}' must be an index, found {}",
                        id,
                        loader::yaml_kind(other)
                    )));
                },
            };
            entries.push((id, index));
        }
        Self::from_entries(entries)
    }

    /// Load a map from a YAML file or value.
    pub fn load(source: impl YamlSource) -> Result<Self> {
        Self::from_yaml(source.load_yaml()?)
    }

    /// The identifier with the given index: linear scan, first match.
    pub fn resolve(&self, index: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(_, i)| i.as_str() == index)
            .map(|(id, _)| id.as_str())
    }

    /// The index of an identifier.
    pub fn index_of(&self, id: &str) -> Option<&str> {
        self.fields.get(id).map(String::as_str)
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the map has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// `(identifier, index)` pairs in map order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(id, index)| (id.as_str(), index.as_str()))
    }

    /// Serialize as YAML; indices are written as quoted strings.
    pub fn to_yaml(&self) -> Result<String> {
        let mapping: serde_yaml::Mapping = self
            .fields
            .iter()
            .map(|(id, index)| {
                (
                    serde_yaml::Value::String(id.clone()),
                    serde_yaml::Value::String(index.clone()),
                )
            })
            .collect();
        serde_yaml::to_string(&mapping).map_err(|e| Error::InvalidConfig(e.to_string()))
    }

    /// Write the map as YAML.
    pub fn save(&self, path: &Path) -> Result<()> {
        loader::write_text(path, &self.to_yaml()?)
    }
}
