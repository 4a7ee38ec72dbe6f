//! In-memory form document.
//!
//! Pages hold named fields; the whole document is persisted as JSON. Useful
//! for dry runs of a fill script and for tests that should not depend on a
//! PDF backend.

use super::{check_page_range, FieldKind, FormDocument};
use crate::error::{Error, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A form field and its current value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryField {
    /// Field kind
    pub kind: FieldKind,
    /// Text value (text fields)
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub text: String,
    /// Checked state (checkboxes)
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub checked: bool,
}

impl MemoryField {
    fn new(kind: FieldKind) -> Self {
        Self {
            kind,
            text: String::new(),
            checked: false,
        }
    }
}

/// One page: its fields, and the content fields were flattened into.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryPage {
    /// Fields by identifier
    #[serde(default)]
    pub fields: IndexMap<String, MemoryField>,
    /// Flattened field values, `id: value` lines
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub content: Vec<String>,
}

/// JSON-backed form document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryDocument {
    /// Pages in order
    pub pages: Vec<MemoryPage>,
}

impl MemoryDocument {
    /// Create an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a page with the given fields.
    pub fn add_page<I, S>(&mut self, fields: I) -> &mut Self
    where
        I: IntoIterator<Item = (S, FieldKind)>,
        S: Into<String>,
    {
        let fields = fields
            .into_iter()
            .map(|(id, kind)| (id.into(), MemoryField::new(kind)))
            .collect();
        self.pages.push(MemoryPage {
            fields,
            content: Vec::new(),
        });
        self
    }

    /// Look up a field on any page.
    pub fn field(&self, id: &str) -> Option<&MemoryField> {
        self.pages.iter().find_map(|page| page.fields.get(id))
    }

    fn field_mut(&mut self, id: &str) -> Result<&mut MemoryField> {
        self.pages
            .iter_mut()
            .find_map(|page| page.fields.get_mut(id))
            .ok_or_else(|| Error::Document(format!("no field named '{}'", id)))
    }

    /// Text of a text field.
    pub fn text(&self, id: &str) -> Option<&str> {
        self.field(id)
            .filter(|f| f.kind == FieldKind::Text)
            .map(|f| f.text.as_str())
    }

    /// State of a checkbox.
    pub fn is_checked(&self, id: &str) -> Option<bool> {
        self.field(id)
            .filter(|f| f.kind == FieldKind::Checkbox)
            .map(|f| f.checked)
    }

    /// Serialize as pretty JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl FormDocument for MemoryDocument {
    fn open(path: &Path) -> Result<Self> {
        log::debug!("open {}", path.display());
        let bytes = std::fs::read(path).map_err(|source| Error::FileAccess {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    fn field_names(&mut self) -> Result<Vec<String>> {
        Ok(self
            .pages
            .iter()
            .flat_map(|page| page.fields.keys().cloned())
            .collect())
    }

    fn field_kind(&mut self, id: &str) -> Result<Option<FieldKind>> {
        Ok(self.field(id).map(|f| f.kind))
    }

    fn set_text(&mut self, id: &str, text: &str) -> Result<()> {
        let field = self.field_mut(id)?;
        if field.kind != FieldKind::Text {
            return Err(Error::Document(format!("field '{}' is not a text field", id)));
        }
        field.text = text.to_string();
        Ok(())
    }

    fn set_checked(&mut self, id: &str, checked: bool) -> Result<()> {
        let field = self.field_mut(id)?;
        if field.kind != FieldKind::Checkbox {
            return Err(Error::Document(format!("field '{}' is not a checkbox", id)));
        }
        field.checked = checked;
        Ok(())
    }

    fn page_count(&mut self) -> Result<usize> {
        Ok(self.pages.len())
    }

    fn slice(&mut self, begin: i64, end: i64) -> Result<Self> {
        let (begin, end) = check_page_range(begin, end, self.pages.len())?;
        Ok(Self {
            pages: self.pages[begin..end].to_vec(),
        })
    }

    fn append(&mut self, other: &mut Self) -> Result<()> {
        self.pages.extend(other.pages.iter().cloned());
        Ok(())
    }

    fn flatten(&mut self) -> Result<()> {
        for page in &mut self.pages {
            for (id, field) in page.fields.drain(..) {
                let value = match field.kind {
                    FieldKind::Text => field.text,
                    FieldKind::Checkbox if field.checked => "[x]".to_string(),
                    FieldKind::Checkbox => "[ ]".to_string(),
                    FieldKind::Other => continue,
                };
                page.content.push(format!("{}: {}", id, value));
            }
        }
        Ok(())
    }

    fn save(&mut self, path: &Path) -> Result<u64> {
        let json = self.to_json()?;
        crate::loader::write_text(path, &json)?;
        log::debug!("wrote {} ({} bytes)", path.display(), json.len());
        Ok(json.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn three_pages() -> MemoryDocument {
        let mut doc = MemoryDocument::new();
        doc.add_page([("p1.name", FieldKind::Text)])
            .add_page([("p2.check", FieldKind::Checkbox)])
            .add_page([("p3.city", FieldKind::Text)]);
        doc
    }

    #[test]
    fn test_field_names_in_page_order() {
        let mut doc = three_pages();
        assert_eq!(doc.field_names().unwrap(), vec!["p1.name", "p2.check", "p3.city"]);
    }

    #[test]
    fn test_slice_and_append() {
        let mut doc = three_pages();
        let mut first_two = doc.slice(0, 2).unwrap();
        assert_eq!(first_two.page_count().unwrap(), 2);

        let mut last = doc.slice(2, 3).unwrap();
        first_two.append(&mut last).unwrap();
        assert_eq!(first_two.field_names().unwrap(), vec!["p1.name", "p2.check", "p3.city"]);
    }

    #[test]
    fn test_slice_out_of_range() {
        let mut doc = three_pages();
        assert!(matches!(doc.slice(0, 4), Err(Error::PageRange(_))));
    }

    #[test]
    fn test_set_text_on_checkbox_fails() {
        let mut doc = three_pages();
        assert!(matches!(doc.set_text("p2.check", "x"), Err(Error::Document(_))));
        assert!(matches!(doc.set_checked("nope", true), Err(Error::Document(_))));
    }

    #[test]
    fn test_flatten_moves_values_into_content() {
        let mut doc = three_pages();
        doc.set_text("p1.name", "Ada").unwrap();
        doc.set_checked("p2.check", true).unwrap();
        doc.flatten().unwrap();
        assert!(doc.field_names().unwrap().is_empty());
        assert_eq!(doc.pages[0].content, vec!["p1.name: Ada"]);
        assert_eq!(doc.pages[1].content, vec!["p2.check: [x]"]);
    }

    #[test]
    fn test_save_and_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("form.json");
        let mut doc = three_pages();
        doc.set_text("p3.city", "Dublin").unwrap();
        let written = doc.save(&path).unwrap();
        assert!(written > 0);

        let reopened = MemoryDocument::open(&path).unwrap();
        assert_eq!(reopened, doc);
        assert_eq!(reopened.text("p3.city"), Some("Dublin"));
    }
}
