//! AcroForm PDF documents through `pdf_oxide`'s document editor.
//!
//! Field kinds come from the field type and flags: `/Tx` fields are text,
//! `/Btn` fields without the radio or push-button flags are checkboxes, and
//! everything else is left alone.
//!
//! Page selection and merging go through scratch files: the editor is saved
//! to a temporary file, reopened, and trimmed or merged from there, so values
//! filled before a `slice` or `append` are kept. An `append` that leaves the
//! page count short of what the editor reported merging is an error.

use super::{check_page_range, FieldKind, FormDocument};
use crate::error::{Error, Result};
use indexmap::IndexMap;
use pdf_oxide::editor::{DocumentEditor, EditableDocument, FormFieldValue, FormFieldWrapper};
use pdf_oxide::extractors::forms::FieldType;
use std::path::{Path, PathBuf};
use tempfile::TempPath;

/// Button field flag: radio button.
const FLAG_RADIO: u32 = 1 << 15;
/// Button field flag: push button.
const FLAG_PUSHBUTTON: u32 = 1 << 16;

fn document_error(err: pdf_oxide::error::Error) -> Error {
    Error::Document(err.to_string())
}

fn kind_of(field: &FormFieldWrapper) -> FieldKind {
    match field.field_type() {
        Some(FieldType::Text) => FieldKind::Text,
        Some(FieldType::Button) => {
            let flags = field.flags().unwrap_or(0);
            if flags & (FLAG_RADIO | FLAG_PUSHBUTTON) == 0 {
                FieldKind::Checkbox
            } else {
                FieldKind::Other
            }
        },
        _ => FieldKind::Other,
    }
}

/// A PDF with an AcroForm.
pub struct PdfFormDocument {
    editor: DocumentEditor,
    path: PathBuf,
    kinds: Option<IndexMap<String, FieldKind>>,
    // Scratch files backing `editor`; removed on drop.
    scratch: Vec<TempPath>,
}

impl std::fmt::Debug for PdfFormDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PdfFormDocument")
            .field("path", &self.path)
            .field("fields", &self.kinds.as_ref().map(IndexMap::len))
            .finish()
    }
}

impl PdfFormDocument {
    /// Path the document was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn kinds(&mut self) -> Result<&IndexMap<String, FieldKind>> {
        if self.kinds.is_none() {
            let fields = self.editor.get_form_fields().map_err(document_error)?;
            let kinds = fields
                .iter()
                .map(|field| (field.name().to_string(), kind_of(field)))
                .collect();
            self.kinds = Some(kinds);
        }
        Ok(self.kinds.get_or_insert_with(IndexMap::new))
    }

    /// Save the current state to a scratch file.
    fn snapshot(&mut self) -> Result<TempPath> {
        let scratch = tempfile::Builder::new()
            .prefix("pdf-formfill-")
            .suffix(".pdf")
            .tempfile()?
            .into_temp_path();
        EditableDocument::save(&mut self.editor, &scratch).map_err(document_error)?;
        Ok(scratch)
    }
}

impl FormDocument for PdfFormDocument {
    fn open(path: &Path) -> Result<Self> {
        log::debug!("open {}", path.display());
        if let Err(source) = std::fs::metadata(path) {
            return Err(Error::FileAccess {
                path: path.to_path_buf(),
                source,
            });
        }
        let editor = DocumentEditor::open(path).map_err(document_error)?;
        Ok(Self {
            editor,
            path: path.to_path_buf(),
            kinds: None,
            scratch: Vec::new(),
        })
    }

    fn field_names(&mut self) -> Result<Vec<String>> {
        Ok(self.kinds()?.keys().cloned().collect())
    }

    fn field_kind(&mut self, id: &str) -> Result<Option<FieldKind>> {
        Ok(self.kinds()?.get(id).copied())
    }

    fn set_text(&mut self, id: &str, text: &str) -> Result<()> {
        log::trace!("set_text {} = {:?}", id, text);
        self.editor
            .set_form_field_value(id, FormFieldValue::Text(text.to_string()))
            .map_err(|e| Error::Document(format!("{}, form={} key={}, value=\"{}\"", e, self.path.display(), id, text)))
    }

    fn set_checked(&mut self, id: &str, checked: bool) -> Result<()> {
        log::trace!("set_checked {} = {}", id, checked);
        self.editor
            .set_form_field_value(id, FormFieldValue::Boolean(checked))
            .map_err(document_error)
    }

    fn page_count(&mut self) -> Result<usize> {
        EditableDocument::page_count(&mut self.editor).map_err(document_error)
    }

    fn slice(&mut self, begin: i64, end: i64) -> Result<Self> {
        let count = self.page_count()?;
        let (begin, end) = check_page_range(begin, end, count)?;
        log::debug!("slice {} pages {}..{}", self.path.display(), begin, end);

        let scratch = self.snapshot()?;
        let mut editor = DocumentEditor::open(&scratch).map_err(document_error)?;
        for index in (end..count).rev().chain((0..begin).rev()) {
            editor.remove_page(index).map_err(document_error)?;
        }

        Ok(Self {
            editor,
            path: self.path.clone(),
            kinds: None,
            scratch: vec![scratch],
        })
    }

    fn append(&mut self, other: &mut Self) -> Result<()> {
        let before = self.page_count()?;
        let scratch = other.snapshot()?;
        let added = self.editor.merge_from(&scratch).map_err(document_error)?;
        self.scratch.push(scratch);
        self.kinds = None;

        // Some editor versions report merged pages without adding them.
        let after = self.page_count()?;
        if after != before + added {
            return Err(Error::Document(format!(
                "merging {} pages from {} left {} pages, expected {}",
                added,
                other.path.display(),
                after,
                before + added
            )));
        }
        log::debug!("appended {} pages from {}", added, other.path.display());
        Ok(())
    }

    fn flatten(&mut self) -> Result<()> {
        self.editor.flatten_forms().map_err(document_error)?;
        self.kinds = None;
        Ok(())
    }

    fn save(&mut self, path: &Path) -> Result<u64> {
        EditableDocument::save(&mut self.editor, path).map_err(document_error)?;
        let written = std::fs::metadata(path)?.len();
        log::debug!("wrote {} ({} bytes)", path.display(), written);
        Ok(written)
    }
}
