//! Form filling.
//!
//! [`Form`] ties the pieces together: a configuration context, a field map
//! for the document being filled, and a fill script evaluated entry by entry.
//!
//! ```ignore
//! use pdf_formfill::{Form, SaveOptions, PdfFormDocument};
//!
//! let mut form = Form::init("config.yaml")?;
//! form.load("f1040.pdf", "f1040-map.yaml")?;
//! form.fill("f1040.yaml")?;
//! form.save::<PdfFormDocument>("out/f1040.pdf", &SaveOptions::default())?;
//!
//! // later scripts can read `ctx.forms.f1040.<friendly key>`
//! form.load("f1040s1.pdf", "f1040s1-map.yaml")?;
//! form.fill("f1040s1.yaml")?;
//! ```
//!
//! Each script entry goes through the same steps: evaluate the template (and
//! the calculate function, for calculated entries), resolve the field index
//! through the map, apply the first suffix transform whose suffix the
//! friendly key ends with, then record the transformed value under the
//! physical field id and the untransformed value under the friendly key.
//! The first failing entry aborts the fill; entries already recorded stay.

use crate::config::{FormOptions, SaveOptions};
use crate::context::Context;
use crate::document::FormDocument;
use crate::error::{Error, Result};
use crate::expression::Evaluator;
use crate::helpers::{Helper, Helpers};
use crate::loader::{self, YamlSource};
use crate::map::FieldMap;
use crate::script::{Calculate, FillScript, ScriptEntry};
use crate::value::{Map, Value};
use indexmap::IndexMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A value transform applied to entries whose friendly key ends with a
/// registered suffix.
pub type SuffixHelper = Arc<dyn Fn(&Value) -> Value + Send + Sync>;

/// Suffixes registered by default, with the helper each one applies.
pub const DEFAULT_SUFFIX_HELPERS: [(&str, Helper); 4] = [
    (".currency", Helper::Currency),
    (".dec", Helper::CurrencyDec),
    (".whole", Helper::CurrencyWhole),
    (".nodash", Helper::StrNoDash),
];

/// The document currently being filled.
#[derive(Debug, Clone)]
struct LoadedForm {
    name: String,
    source: PathBuf,
    map: FieldMap,
    // physical field id -> transformed value
    fields: IndexMap<String, Value>,
}

/// Fills one or more forms from a shared configuration.
pub struct Form {
    options: FormOptions,
    context: Context,
    evaluator: Evaluator,
    suffix_helpers: IndexMap<String, SuffixHelper>,
    loaded: Option<LoadedForm>,
}

impl std::fmt::Debug for Form {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Form")
            .field("options", &self.options)
            .field("suffixes", &self.suffix_helpers.keys().collect::<Vec<_>>())
            .field("form", &self.loaded.as_ref().map(|l| l.name.as_str()))
            .finish()
    }
}

impl Form {
    /// Create a form filler from a configuration file or value, with default
    /// options.
    pub fn init(config: impl YamlSource) -> Result<Self> {
        Self::with_options(config, FormOptions::default())
    }

    /// Create a form filler with explicit options.
    ///
    /// Fails with [`Error::ReservedKey`] when the configuration defines
    /// `forms`.
    pub fn with_options(config: impl YamlSource, options: FormOptions) -> Result<Self> {
        let context = Context::new(loader::load_config(config)?)?;
        let helpers = Helpers::new(options.number_locale());

        let mut suffix_helpers: IndexMap<String, SuffixHelper> = IndexMap::new();
        if options.default_suffix_helpers {
            for (suffix, helper) in DEFAULT_SUFFIX_HELPERS {
                suffix_helpers.insert(suffix.to_string(), helper_transform(&helpers, helper));
            }
        }

        Ok(Self {
            options,
            context,
            evaluator: Evaluator::new(helpers),
            suffix_helpers,
            loaded: None,
        })
    }

    /// Select the document to fill and its field map.
    ///
    /// The form name is the file stem of `source`; results recorded earlier
    /// under the same name are discarded.
    pub fn load(&mut self, source: impl AsRef<Path>, map: impl YamlSource) -> Result<()> {
        let source = source.as_ref();
        let name = source
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        let map = FieldMap::load(map)?;
        log::debug!("load form '{}' from {} ({} fields)", name, source.display(), map.len());

        self.context.begin_form(&name);
        self.loaded = Some(LoadedForm {
            name,
            source: source.to_path_buf(),
            map,
            fields: IndexMap::new(),
        });
        Ok(())
    }

    /// Register suffix transforms.
    ///
    /// Registrations merge into the existing set: a new suffix is added at
    /// the end, a known suffix is replaced in place.
    pub fn register_friendly_key_helpers<I, S>(&mut self, helpers: I)
    where
        I: IntoIterator<Item = (S, SuffixHelper)>,
        S: Into<String>,
    {
        for (suffix, helper) in helpers {
            self.suffix_helpers.insert(suffix.into(), helper);
        }
    }

    /// Register a single suffix transform.
    pub fn register_friendly_key_helper<F>(&mut self, suffix: impl Into<String>, helper: F)
    where
        F: Fn(&Value) -> Value + Send + Sync + 'static,
    {
        self.suffix_helpers.insert(suffix.into(), Arc::new(helper));
    }

    /// Registered suffixes, in the order they are tried.
    pub fn suffixes(&self) -> impl Iterator<Item = &str> {
        self.suffix_helpers.keys().map(String::as_str)
    }

    /// Run a fill script from a YAML file or value against the loaded form.
    pub fn fill(&mut self, script: impl YamlSource) -> Result<()> {
        if self.loaded.is_none() {
            return Err(Error::NotLoaded);
        }
        let script = FillScript::load(script)?;
        self.fill_script(&script)
    }

    /// Run an already parsed fill script against the loaded form.
    pub fn fill_script(&mut self, script: &FillScript) -> Result<()> {
        if self.loaded.is_none() {
            return Err(Error::NotLoaded);
        }
        for (friendly_key, entry) in script.iter() {
            self.fill_entry(friendly_key, entry)?;
        }
        Ok(())
    }

    fn fill_entry(&mut self, friendly_key: &str, entry: &ScriptEntry) -> Result<()> {
        log::debug!("field: {}", friendly_key);
        log::debug!("  type: {}", entry.kind());

        let (index, value, computed) = match entry {
            ScriptEntry::Indexed(_) => {
                let (index, template) = entry.single_index(friendly_key)?;
                log::debug!("  index id: {}", index);
                let value = self.evaluator.eval_template(&self.context, template)?;
                (index.to_string(), value, None)
            },
            ScriptEntry::Calculated { value, calculate } => {
                let value = self.evaluator.eval_template(&self.context, value)?;
                log::debug!("  calculate value: {}", value);
                let calculated = match calculate {
                    Calculate::Expression(source) => {
                        self.evaluator.eval_calculate(&self.context, source, value.clone())?
                    },
                    Calculate::Function(function) => {
                        (**function)(self.context.root(), &value)?.ensure_defined()?
                    },
                };
                log::debug!("  calculated: field={} fill={}", calculated.field, calculated.fill);
                (calculated.field_index(), calculated.fill, Some(value))
            },
        };

        let loaded = self.loaded.as_mut().ok_or(Error::NotLoaded)?;
        let field_id = match loaded.map.resolve(&index) {
            Some(id) => id.to_string(),
            None => {
                return Err(Error::FieldNotFound {
                    friendly_key: friendly_key.to_string(),
                    index,
                    form: loaded.name.clone(),
                    value: computed.map(|v| v.to_string()),
                });
            },
        };

        let transformed = match self
            .suffix_helpers
            .iter()
            .find(|(suffix, _)| friendly_key.ends_with(suffix.as_str()))
        {
            Some((suffix, transform)) => {
                let out = (**transform)(&value);
                log::debug!("  {} {} => {}", suffix, value, out);
                if out.is_nullish() {
                    Value::empty()
                } else {
                    out
                }
            },
            None => value.clone(),
        };

        log::debug!("input {} => {} => {}", friendly_key, index, field_id);
        log::trace!("filling forms['{}']['{}'] = '{}'", loaded.name, field_id, transformed);

        loaded.fields.insert(field_id.clone(), transformed.clone());
        self.context.record(&loaded.name, &field_id, transformed);
        self.context.record(&loaded.name, friendly_key, value);
        Ok(())
    }

    /// Name of the loaded form.
    pub fn form_name(&self) -> Option<&str> {
        self.loaded.as_ref().map(|l| l.name.as_str())
    }

    /// Source document of the loaded form.
    pub fn source(&self) -> Option<&Path> {
        self.loaded.as_ref().map(|l| l.source.as_path())
    }

    /// Field map of the loaded form.
    pub fn map(&self) -> Option<&FieldMap> {
        self.loaded.as_ref().map(|l| &l.map)
    }

    /// Everything recorded for the loaded form: physical ids and friendly
    /// keys.
    pub fn filled(&self) -> Option<&Map> {
        self.context.form_results(self.form_name()?)
    }

    /// Values recorded for physical fields of the loaded form, in fill order.
    pub fn field_values(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.loaded
            .iter()
            .flat_map(|l| l.fields.iter().map(|(id, v)| (id.as_str(), v)))
    }

    /// The evaluation context, `forms` included.
    pub fn context(&self) -> &Context {
        &self.context
    }

    /// Options the form was created with.
    pub fn options(&self) -> &FormOptions {
        &self.options
    }

    /// Write the loaded form's field values into a document.
    ///
    /// Returns the number of fields filled; fields the document lacks, and
    /// fields of unsupported kinds, are skipped.
    pub fn apply<D: FormDocument>(&self, doc: &mut D) -> Result<usize> {
        let loaded = self.loaded.as_ref().ok_or(Error::NotLoaded)?;
        let mut filled = 0;
        for (id, value) in &loaded.fields {
            if doc.set_field_value(id, value)? {
                filled += 1;
            }
        }
        log::debug!("filled {} of {} fields in '{}'", filled, loaded.fields.len(), loaded.name);
        Ok(filled)
    }

    /// Open the source document with `D`, fill it and write it to `dest`.
    ///
    /// Returns the number of bytes written.
    pub fn save<D: FormDocument>(&self, dest: impl AsRef<Path>, options: &SaveOptions) -> Result<u64> {
        let loaded = self.loaded.as_ref().ok_or(Error::NotLoaded)?;
        let dest = dest.as_ref();
        log::debug!("fill source={} dest={}", loaded.source.display(), dest.display());

        let mut doc = D::open(&loaded.source)?;
        if let Some((begin, end)) = options.pages {
            doc = doc.slice(begin, end)?;
        }
        self.apply(&mut doc)?;
        if options.flatten {
            doc.flatten()?;
        }
        doc.save(dest)
    }
}

fn helper_transform(helpers: &Helpers, helper: Helper) -> SuffixHelper {
    let helpers = helpers.clone();
    Arc::new(move |value: &Value| helpers.call(helper, value))
}
