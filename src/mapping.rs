//! Mapping mode: number a document's fields and write starter files.
//!
//! For a source `f1040.pdf` this produces, in the output directory:
//!
//! - `f1040-map.yaml`: field id to index, `0..N-1` in enumeration order
//! - `f1040-example-script.yaml`: one entry per field filling it from
//!   `ctx.field<i>`
//! - `f1040-example-config.yaml`: `field<i>: todo` for every field
//! - `f1040-example-filled.pdf`: the document with each field set to its own
//!   index, to find indices visually
//!
//! The example files are skipped when [`MapOptions::example`] is off.

use crate::config::MapOptions;
use crate::document::FormDocument;
use crate::error::{Error, Result};
use crate::loader;
use crate::map::FieldMap;
use crate::value::Value;
use std::path::{Path, PathBuf};

const SCRIPT_HEADER: &[&str] = &[
    "# Rename `friendly.key.name.N` to anything meaningful. The inner key, e.g.",
    "# `1:`, is the field index to fill; indices are visible in the example",
    "# filled form. The value is a template, one of:",
    "# * a fixed string or number;",
    "# * an expression over `ctx`, the config file, e.g. `ctx.name.first`;",
    "# * `${...}` placeholders mixed with text;",
    "# or the entry is an object with `value` and `calculate` keys, where",
    "# `calculate` is `(ctx, value) => ({ field, fill })`.",
];

/// Files written by [`generate_map`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapArtifacts {
    /// Number of fields mapped
    pub fields: usize,
    /// The field map
    pub map: PathBuf,
    /// Example fill script
    pub script: Option<PathBuf>,
    /// Example configuration
    pub config: Option<PathBuf>,
    /// Document filled with field indices
    pub filled: Option<PathBuf>,
}

impl MapArtifacts {
    /// All written paths.
    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        std::iter::once(self.map.as_path())
            .chain(self.script.as_deref())
            .chain(self.config.as_deref())
            .chain(self.filled.as_deref())
    }
}

/// Number the fields of `doc` and write the map (and examples) for `source`.
///
/// When examples are written, `doc` is left filled with field indices.
pub fn generate_map<D: FormDocument>(doc: &mut D, source: &Path, options: &MapOptions) -> Result<MapArtifacts> {
    let name = match &options.name {
        Some(name) => name.clone(),
        None => source
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .ok_or_else(|| Error::InvalidConfig(format!("no file name in '{}'", source.display())))?,
    };
    let dir = options.dir.as_path();
    let map_file = dir.join(format!("{}-map.yaml", name));

    let map = FieldMap::from_field_names(doc.field_names()?);
    log::debug!("mapping {} fields of {}", map.len(), source.display());
    log::debug!("writing map {}", map_file.display());
    map.save(&map_file)?;

    let mut artifacts = MapArtifacts {
        fields: map.len(),
        map: map_file,
        script: None,
        config: None,
        filled: None,
    };
    if !options.example {
        return Ok(artifacts);
    }

    let script_file = dir.join(format!("{}-example-script.yaml", name));
    log::debug!("writing script {}", script_file.display());
    loader::write_text(&script_file, &example_script(&map))?;

    let config_file = dir.join(format!("{}-example-config.yaml", name));
    log::debug!("writing config {}", config_file.display());
    loader::write_text(&config_file, &example_config(&map)?)?;

    let extension = source
        .extension()
        .map(|ext| ext.to_string_lossy().into_owned())
        .unwrap_or_else(|| "pdf".to_string());
    let filled_file = dir.join(format!("{}-example-filled.{}", name, extension));
    for (id, index) in map.iter() {
        doc.set_field_value(id, &Value::from(index))?;
    }
    log::debug!("writing filled example {}", filled_file.display());
    doc.save(&filled_file)?;

    artifacts.script = Some(script_file);
    artifacts.config = Some(config_file);
    artifacts.filled = Some(filled_file);
    Ok(artifacts)
}

/// Example script text: the header, then one entry per field.
pub fn example_script(map: &FieldMap) -> String {
    let mut lines: Vec<String> = SCRIPT_HEADER.iter().map(|line| line.to_string()).collect();
    for (id, index) in map.iter() {
        lines.push(format!("friendly.key.name.{}:", index));
        lines.push(format!("  # fills {}", id));
        lines.push(format!("  {}: ${{ctx.field{}}}", index, index));
    }
    let mut text = lines.join("\n");
    text.push('\n');
    text
}

/// Example config text: `field<i>: todo` per field.
pub fn example_config(map: &FieldMap) -> Result<String> {
    let config: serde_yaml::Mapping = map
        .iter()
        .map(|(_, index)| {
            (
                serde_yaml::Value::String(format!("field{}", index)),
                serde_yaml::Value::String("todo".to_string()),
            )
        })
        .collect();
    serde_yaml::to_string(&config).map_err(|e| Error::InvalidConfig(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::FillScript;

    #[test]
    fn test_example_script_parses() {
        let map = FieldMap::from_field_names(["name[0]", "city[0]"]);
        let text = example_script(&map);
        assert!(text.contains("friendly.key.name.1:\n  # fills city[0]\n  1: ${ctx.field1}"));

        let script = FillScript::from_yaml(serde_yaml::from_str(&text).unwrap()).unwrap();
        assert_eq!(script.len(), 2);
        let entry = script.get("friendly.key.name.0").unwrap();
        assert_eq!(entry.single_index("friendly.key.name.0").unwrap(), ("0", "${ctx.field0}"));
    }

    #[test]
    fn test_example_config() {
        let map = FieldMap::from_field_names(["a", "b"]);
        let text = example_config(&map).unwrap();
        assert_eq!(text, "field0: todo\nfield1: todo\n");
    }
}
