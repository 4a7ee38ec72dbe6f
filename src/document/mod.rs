//! Document adapters.
//!
//! [`FormDocument`] is the narrow interface the form filler needs from a
//! document: enumerate fields, set text and checkbox values, select pages,
//! and save. Two implementations are provided:
//!
//! - [`MemoryDocument`]: JSON-backed, used for dry runs and tests
//! - `PdfFormDocument` (feature `pdf`): AcroForm PDFs through `pdf_oxide`

pub mod memory;
#[cfg(feature = "pdf")]
pub mod pdf;

pub use memory::{MemoryDocument, MemoryField, MemoryPage};
#[cfg(feature = "pdf")]
pub use pdf::PdfFormDocument;

use crate::error::{Error, Result};
use crate::helpers::parse_int_prefix;
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// The field kinds the filler distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    /// Text field
    Text,
    /// Checkbox
    Checkbox,
    /// Radio group, choice, signature, push button...; never filled
    Other,
}

/// A fillable document.
pub trait FormDocument: Sized {
    /// Open a document file.
    fn open(path: &Path) -> Result<Self>;

    /// Field identifiers in enumeration order.
    fn field_names(&mut self) -> Result<Vec<String>>;

    /// Kind of a field; `None` if the document has no such field.
    fn field_kind(&mut self, id: &str) -> Result<Option<FieldKind>>;

    /// Set a text field.
    fn set_text(&mut self, id: &str, text: &str) -> Result<()>;

    /// Check or uncheck a checkbox.
    fn set_checked(&mut self, id: &str, checked: bool) -> Result<()>;

    /// Number of pages.
    fn page_count(&mut self) -> Result<usize>;

    /// New document with pages `begin..end` (zero-based, end exclusive).
    ///
    /// Implementations validate with [`check_page_range`] before any I/O.
    fn slice(&mut self, begin: i64, end: i64) -> Result<Self>;

    /// Append all pages of `other`.
    fn append(&mut self, other: &mut Self) -> Result<()>;

    /// Merge form fields into page content.
    fn flatten(&mut self) -> Result<()>;

    /// Write the document; returns the number of bytes written.
    fn save(&mut self, path: &Path) -> Result<u64>;

    /// Fill a field from a script value.
    ///
    /// Text fields receive the value as text. Checkboxes are checked when the
    /// value parses as a non-zero integer. Missing fields and other kinds are
    /// skipped. Returns whether the field was filled.
    fn set_field_value(&mut self, id: &str, value: &Value) -> Result<bool> {
        match self.field_kind(id)? {
            Some(FieldKind::Text) => {
                self.set_text(id, &value.to_string())?;
                Ok(true)
            },
            Some(FieldKind::Checkbox) => {
                let n = parse_int_prefix(&value.to_string());
                self.set_checked(id, !n.is_nan() && n != 0.0)?;
                Ok(true)
            },
            Some(FieldKind::Other) => {
                log::debug!("skipping field '{}': unsupported field type", id);
                Ok(false)
            },
            None => {
                log::debug!("no field named '{}'", id);
                Ok(false)
            },
        }
    }
}

/// Validate `begin..end` against a page count.
pub fn check_page_range(begin: i64, end: i64, page_count: usize) -> Result<(usize, usize)> {
    if begin < 0 {
        return Err(Error::PageRange("begin value must be >= 0".to_string()));
    }
    if end < 0 {
        return Err(Error::PageRange("end value must be >= 0".to_string()));
    }
    if end < begin {
        return Err(Error::PageRange("end value must be >= begin".to_string()));
    }
    if end as u64 > page_count as u64 {
        return Err(Error::PageRange(format!(
            "end index out of bounds ({} <= {})",
            end, page_count
        )));
    }
    Ok((begin as usize, end as usize))
}
