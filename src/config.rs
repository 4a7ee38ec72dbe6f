//! Configuration for filling, saving and mapping.

use crate::helpers::{NumberLocale, DEFAULT_LOCALE};
use std::path::PathBuf;

/// Form filling configuration.
#[derive(Debug, Clone)]
pub struct FormOptions {
    /// Locale tag used by the number helpers (e.g. `en-IE`, `de-DE`).
    pub locale: String,

    /// Register the default suffix transforms (`.currency`, `.dec`,
    /// `.whole`, `.nodash`).
    pub default_suffix_helpers: bool,
}

impl Default for FormOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl FormOptions {
    /// Create new configuration with defaults.
    pub fn new() -> Self {
        Self {
            locale: DEFAULT_LOCALE.to_string(),
            default_suffix_helpers: true,
        }
    }

    /// Set the number locale.
    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = locale.into();
        self
    }

    /// Enable or disable the default suffix transforms.
    pub fn with_default_suffix_helpers(mut self, enable: bool) -> Self {
        self.default_suffix_helpers = enable;
        self
    }

    /// Resolve the locale tag.
    pub fn number_locale(&self) -> NumberLocale {
        NumberLocale::from_tag(&self.locale)
    }
}

/// Output document configuration.
#[derive(Debug, Clone, Default)]
pub struct SaveOptions {
    /// Flatten form fields into page content after filling.
    pub flatten: bool,

    /// Keep only pages `begin..end` (zero-based, end exclusive).
    pub pages: Option<(i64, i64)>,
}

impl SaveOptions {
    /// Create new configuration with defaults: no flattening, all pages.
    pub fn new() -> Self {
        Self::default()
    }

    /// Flatten form fields after filling.
    pub fn with_flatten(mut self, enable: bool) -> Self {
        self.flatten = enable;
        self
    }

    /// Keep only pages `begin..end`.
    pub fn with_pages(mut self, begin: i64, end: i64) -> Self {
        self.pages = Some((begin, end));
        self
    }
}

/// Mapping-mode configuration.
#[derive(Debug, Clone)]
pub struct MapOptions {
    /// Directory the artifacts are written to.
    pub dir: PathBuf,

    /// Artifact name prefix; defaults to the source file stem.
    pub name: Option<String>,

    /// Also write the example script, config and filled document.
    pub example: bool,
}

impl Default for MapOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl MapOptions {
    /// Create new configuration with defaults.
    pub fn new() -> Self {
        Self {
            dir: PathBuf::from("."),
            name: None,
            example: true,
        }
    }

    /// Set the output directory.
    pub fn with_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dir = dir.into();
        self
    }

    /// Set the artifact name prefix.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Enable or disable example generation.
    pub fn with_example(mut self, enable: bool) -> Self {
        self.example = enable;
        self
    }
}
