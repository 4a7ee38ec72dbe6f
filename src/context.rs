//! Evaluation context.
//!
//! The context is the configuration mapping loaded from the user's YAML plus
//! one reserved key, `forms`, which collects what each form has been filled
//! with so far: `forms.<form name>.<friendly key>`.
//!
//! Template expressions read the context through safe access: a missing key
//! at any depth yields an empty string instead of an error, so `ctx.a.b.c`
//! works even when `a` is absent. The one exception is
//! `ctx.forms.<form name>` for a form that has not been filled, which yields
//! an empty mapping.

use crate::error::{Error, Result};
use crate::value::{Map, Value};
use std::borrow::Cow;

/// Key under which fill results are stored.
pub const FORMS_KEY: &str = "forms";

/// Keys user configuration may not define.
pub const RESERVED_KEYS: &[&str] = &[FORMS_KEY];

/// How member expressions treat missing properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Missing properties read as `""`; used by template expressions.
    Safe,
    /// Missing properties read as `undefined`, and reading through
    /// `undefined`/`null` is an error; used by calculate functions.
    Strict,
}

/// Fail if the configuration defines a reserved key.
pub fn ensure_not_using_reserved_keys(config: &Map) -> Result<()> {
    for key in RESERVED_KEYS {
        if config.contains_key(*key) {
            return Err(Error::ReservedKey((*key).to_string()));
        }
    }
    Ok(())
}

/// Configuration plus fill results.
#[derive(Debug, Clone, PartialEq)]
pub struct Context {
    root: Value,
}

impl Default for Context {
    fn default() -> Self {
        let mut root = Map::new();
        root.insert(FORMS_KEY.to_string(), Value::Object(Map::new()));
        Self {
            root: Value::Object(root),
        }
    }
}

impl Context {
    /// Build a context from user configuration.
    ///
    /// Fails with [`Error::ReservedKey`] if the configuration defines `forms`.
    pub fn new(config: Map) -> Result<Self> {
        ensure_not_using_reserved_keys(&config)?;
        let mut root = config;
        root.insert(FORMS_KEY.to_string(), Value::Object(Map::new()));
        Ok(Self {
            root: Value::Object(root),
        })
    }

    /// The whole context as a value, `forms` included.
    pub fn root(&self) -> &Value {
        &self.root
    }

    /// Safe path lookup.
    ///
    /// Walks `path` from the root. Any missing segment yields `""`, except a
    /// missing form directly under `forms`, which yields an empty mapping.
    pub fn get_path<S: AsRef<str>>(&self, path: &[S]) -> Value {
        let mut current: Cow<'_, Value> = Cow::Borrowed(&self.root);

        for (depth, segment) in path.iter().enumerate() {
            let key = segment.as_ref();
            let next = match &current {
                Cow::Borrowed(value) => descend(*value, key),
                Cow::Owned(value) => descend(value, key).map(|v| Cow::Owned(v.into_owned())),
            };
            match next {
                Some(value) => current = value,
                None => return missing(path, depth),
            }
        }

        current.into_owned()
    }

    /// Results recorded for a form, if it has been filled.
    pub fn form_results(&self, form: &str) -> Option<&Map> {
        self.forms().and_then(|forms| forms.get(form)).and_then(Value::as_object)
    }

    fn forms(&self) -> Option<&Map> {
        self.root.as_object()?.get(FORMS_KEY)?.as_object()
    }

    fn forms_mut(&mut self) -> Option<&mut Map> {
        let Value::Object(root) = &mut self.root else {
            return None;
        };
        let forms = root
            .entry(FORMS_KEY.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !matches!(forms, Value::Object(_)) {
            *forms = Value::Object(Map::new());
        }
        match forms {
            Value::Object(map) => Some(map),
            _ => None,
        }
    }

    /// Start (or restart) recording results for a form.
    pub fn begin_form(&mut self, form: &str) {
        if let Some(forms) = self.forms_mut() {
            forms.insert(form.to_string(), Value::Object(Map::new()));
        }
    }

    /// Record the value a friendly key was filled with.
    pub fn record(&mut self, form: &str, friendly_key: &str, value: Value) {
        let Some(forms) = self.forms_mut() else {
            return;
        };
        let entry = forms
            .entry(form.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(results) = entry {
            results.insert(friendly_key.to_string(), value);
        }
    }
}

/// One step of a path walk.
fn descend<'a>(value: &'a Value, key: &str) -> Option<Cow<'a, Value>> {
    match value {
        Value::Object(map) => map.get(key).map(Cow::Borrowed),
        Value::Array(items) => match key.parse::<usize>() {
            Ok(index) => items.get(index).map(Cow::Borrowed),
            Err(_) => value.property(key).map(Cow::Owned),
        },
        Value::String(_) => value.property(key).map(Cow::Owned),
        _ => None,
    }
}

fn missing<S: AsRef<str>>(path: &[S], depth: usize) -> Value {
    let is_unfilled_form = depth == 1
        && path.len() == 2
        && path.first().map(|s| s.as_ref() == FORMS_KEY).unwrap_or(false);
    if is_unfilled_form {
        Value::Object(Map::new())
    } else {
        Value::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Map {
        let yaml: serde_yaml::Value = serde_yaml::from_str(
            "location:\n  city: New York\nnames: [Ada, Grace]\nincome: 1234\n",
        )
        .unwrap();
        match Value::from(yaml) {
            Value::Object(map) => map,
            other => panic!("expected mapping, got {other:?}"),
        }
    }

    #[test]
    fn test_reserved_key_rejected() {
        let mut map = config();
        map.insert("forms".to_string(), Value::Null);
        let err = Context::new(map).unwrap_err();
        assert_eq!(err.to_string(), "You cannot use a reserved key: forms");
    }

    #[test]
    fn test_get_existing_paths() {
        let ctx = Context::new(config()).unwrap();
        assert_eq!(ctx.get_path(&["location", "city"]), Value::from("New York"));
        assert_eq!(ctx.get_path(&["names", "1"]), Value::from("Grace"));
        assert_eq!(ctx.get_path(&["names", "length"]), Value::Number(2.0));
        assert_eq!(ctx.get_path(&["location", "city", "0"]), Value::from("N"));
        assert_eq!(ctx.get_path(&["income"]), Value::Number(1234.0));
    }

    #[test]
    fn test_missing_paths_are_empty_at_any_depth() {
        let ctx = Context::new(config()).unwrap();
        assert_eq!(ctx.get_path(&["nope"]), Value::empty());
        assert_eq!(ctx.get_path(&["nope", "deeper", "still"]), Value::empty());
        assert_eq!(ctx.get_path(&["location", "zip"]), Value::empty());
        assert_eq!(ctx.get_path(&["income", "cents"]), Value::empty());
    }

    #[test]
    fn test_unfilled_form_is_empty_mapping() {
        let ctx = Context::new(config()).unwrap();
        assert_eq!(ctx.get_path(&["forms", "f1040"]), Value::Object(Map::new()));
        assert_eq!(ctx.get_path(&["forms", "f1040", "total"]), Value::empty());
    }

    #[test]
    fn test_record_results() {
        let mut ctx = Context::new(config()).unwrap();
        ctx.begin_form("f1040");
        ctx.record("f1040", "total", Value::from("1,234"));
        assert_eq!(ctx.get_path(&["forms", "f1040", "total"]), Value::from("1,234"));
        assert_eq!(ctx.form_results("f1040").map(|m| m.len()), Some(1));

        // Loading the form again starts from scratch
        ctx.begin_form("f1040");
        assert_eq!(ctx.form_results("f1040").map(|m| m.len()), Some(0));
    }
}
