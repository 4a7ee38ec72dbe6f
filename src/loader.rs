//! YAML loading.
//!
//! Configs, field maps and fill scripts can be given either as a path to a
//! YAML file or as an already-parsed value. [`YamlSource`] covers both.

use crate::error::{Error, Result};
use crate::value::{yaml_key_to_string, Map, Value};
use std::path::{Path, PathBuf};

/// Something a YAML document can be obtained from.
pub trait YamlSource {
    /// Produce the YAML document, reading and parsing a file if needed.
    fn load_yaml(self) -> Result<serde_yaml::Value>;
}

impl YamlSource for &Path {
    fn load_yaml(self) -> Result<serde_yaml::Value> {
        read_yaml(self)
    }
}

impl YamlSource for &PathBuf {
    fn load_yaml(self) -> Result<serde_yaml::Value> {
        read_yaml(self)
    }
}

impl YamlSource for PathBuf {
    fn load_yaml(self) -> Result<serde_yaml::Value> {
        read_yaml(&self)
    }
}

/// A string is a file name, never inline YAML.
impl YamlSource for &str {
    fn load_yaml(self) -> Result<serde_yaml::Value> {
        read_yaml(Path::new(self))
    }
}

impl YamlSource for &String {
    fn load_yaml(self) -> Result<serde_yaml::Value> {
        read_yaml(Path::new(self))
    }
}

impl YamlSource for serde_yaml::Value {
    fn load_yaml(self) -> Result<serde_yaml::Value> {
        Ok(self)
    }
}

impl YamlSource for Map {
    fn load_yaml(self) -> Result<serde_yaml::Value> {
        Ok(Value::Object(self).to_yaml())
    }
}

/// Read and parse a YAML file.
pub fn read_yaml(path: &Path) -> Result<serde_yaml::Value> {
    log::debug!("loading {}", path.display());
    let text = std::fs::read_to_string(path).map_err(|source| Error::FileAccess {
        path: path.to_path_buf(),
        source,
    })?;
    parse_yaml(&text, path)
}

/// Parse YAML text; `origin` is only used in error messages.
///
/// Blank text is an empty document (`null`).
pub fn parse_yaml(text: &str, origin: &Path) -> Result<serde_yaml::Value> {
    if text.trim().is_empty() {
        return Ok(serde_yaml::Value::Null);
    }
    serde_yaml::from_str(text).map_err(|e| Error::Yaml {
        path: origin.to_path_buf(),
        message: e.to_string(),
    })
}

/// Require a mapping at the document root. An empty document is an empty
/// mapping.
pub fn into_mapping(document: serde_yaml::Value, what: &str) -> Result<serde_yaml::Mapping> {
    match document {
        serde_yaml::Value::Null => Ok(serde_yaml::Mapping::new()),
        serde_yaml::Value::Mapping(mapping) => Ok(mapping),
        other => Err(Error::InvalidConfig(format!(
            "{} must be a mapping, found {}",
            what,
            yaml_kind(&other)
        ))),
    }
}

/// Load a configuration mapping.
pub fn load_config(source: impl YamlSource) -> Result<Map> {
    let mapping = into_mapping(source.load_yaml()?, "config")?;
    Ok(mapping
        .into_iter()
        .map(|(k, v)| (yaml_key_to_string(&k), Value::from(v)))
        .collect())
}

/// Short name of a YAML node kind for error messages.
pub(crate) fn yaml_kind(value: &serde_yaml::Value) -> &'static str {
    match value {
        serde_yaml::Value::Null => "null",
        serde_yaml::Value::Bool(_) => "a boolean",
        serde_yaml::Value::Number(_) => "a number",
        serde_yaml::Value::String(_) => "a string",
        serde_yaml::Value::Sequence(_) => "a sequence",
        serde_yaml::Value::Mapping(_) => "a mapping",
        serde_yaml::Value::Tagged(_) => "a tagged value",
    }
}

/// Write a text file, creating the parent directory when missing.
pub fn write_text(path: &Path, text: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            log::debug!("mkdir {}", parent.display());
            std::fs::create_dir_all(parent)?;
        }
    }
    log::debug!("writing {}", path.display());
    std::fs::write(path, text)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_blank_document() {
        let doc = parse_yaml("  \n", Path::new("empty.yaml")).unwrap();
        assert_eq!(doc, serde_yaml::Value::Null);
        assert!(into_mapping(doc, "config").unwrap().is_empty());
    }

    #[test]
    fn test_parse_error_names_file() {
        let err = parse_yaml("a: [1, 2", Path::new("broken.yaml")).unwrap_err();
        assert!(matches!(err, Error::Yaml { .. }));
        assert!(err.to_string().contains("broken.yaml"));
    }

    #[test]
    fn test_root_must_be_mapping() {
        let doc = parse_yaml("- a\n- b\n", Path::new("list.yaml")).unwrap();
        let err = into_mapping(doc, "config").unwrap_err();
        assert_eq!(err.to_string(), "Invalid config: config must be a mapping, found a sequence");
    }

    #[test]
    fn test_missing_file() {
        let err = load_config(Path::new("/definitely/not/here.yaml")).unwrap_err();
        assert!(matches!(err, Error::FileAccess { .. }));
    }

    #[test]
    fn test_load_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "city: New York\n1: one\n").unwrap();
        let config = load_config(path.as_path()).unwrap();
        assert_eq!(config.get("city"), Some(&Value::from("New York")));
        assert_eq!(config.get("1"), Some(&Value::from("one")));
    }

    #[test]
    fn test_write_text_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("out.yaml");
        write_text(&path, "a: 1\n").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "a: 1\n");
    }
}
