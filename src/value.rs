//! Dynamic values.
//!
//! Config trees, script results and the output context are all made of
//! [`Value`]s. Coercions follow the rules script authors expect from
//! template strings: `undefined`, `null`, `false`, `0`, `NaN` and `""` are
//! falsy, numbers print without a trailing `.0`, and `+` concatenates as soon
//! as either side is a string.

use crate::helpers::Helper;
use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;

/// Insertion-ordered object map.
pub type Map = IndexMap<String, Value>;

/// A dynamically typed value.
#[derive(Debug, Clone, Default)]
pub enum Value {
    /// Absent value
    #[default]
    Undefined,
    /// Explicit null
    Null,
    /// Boolean
    Bool(bool),
    /// Number (always a double)
    Number(f64),
    /// String
    String(String),
    /// Ordered sequence
    Array(Vec<Value>),
    /// String-keyed mapping, insertion ordered
    Object(Map),
    /// Callable value
    Function(Function),
}

/// A callable value: a built-in helper or an arrow function from a script.
#[derive(Clone)]
pub enum Function {
    /// One of the built-in helpers
    Helper(Helper),
    /// Arrow function closed over its defining scope
    Arrow(Arc<crate::expression::eval::Arrow>),
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Function::Helper(h) => write!(f, "Helper({})", h.name()),
            Function::Arrow(a) => write!(f, "Arrow({})", a.params.join(", ")),
        }
    }
}

impl PartialEq for Function {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Function::Helper(a), Function::Helper(b)) => a == b,
            (Function::Arrow(a), Function::Arrow(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => a == b,
            _ => false,
        }
    }
}

impl Value {
    /// An empty string value.
    pub fn empty() -> Self {
        Value::String(String::new())
    }

    /// Whether the value counts as true in conditions.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::String(s) => !s.is_empty(),
            Value::Array(_) | Value::Object(_) | Value::Function(_) => true,
        }
    }

    /// `true` for `undefined` and `null`.
    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    /// Name reported by `typeof`.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Null | Value::Array(_) | Value::Object(_) => "object",
            Value::Function(_) => "function",
        }
    }

    /// Borrow as a string slice, if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Borrow as an object map, if this is an object.
    pub fn as_object(&self) -> Option<&Map> {
        match self {
            Value::Object(m) => Some(m),
            _ => None,
        }
    }

    /// Numeric conversion.
    ///
    /// Strings are trimmed; an empty string is `0`, anything that is not a
    /// complete decimal literal is `NaN`.
    pub fn to_number(&self) -> f64 {
        match self {
            Value::Undefined => f64::NAN,
            Value::Null => 0.0,
            Value::Bool(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            },
            Value::Number(n) => *n,
            Value::String(s) => string_to_number(s),
            Value::Array(items) => match items.len() {
                0 => 0.0,
                1 => items[0].to_number(),
                _ => f64::NAN,
            },
            Value::Object(_) | Value::Function(_) => f64::NAN,
        }
    }

    /// Property lookup used by member expressions.
    ///
    /// Returns `None` when the property does not exist.
    pub fn property(&self, key: &str) -> Option<Value> {
        match self {
            Value::Object(map) => map.get(key).cloned(),
            Value::Array(items) => {
                if key == "length" {
                    return Some(Value::Number(items.len() as f64));
                }
                key.parse::<usize>().ok().and_then(|i| items.get(i).cloned())
            },
            Value::String(s) => {
                if key == "length" {
                    return Some(Value::Number(s.chars().count() as f64));
                }
                key.parse::<usize>()
                    .ok()
                    .and_then(|i| s.chars().nth(i))
                    .map(|c| Value::String(c.to_string()))
            },
            _ => None,
        }
    }

    /// Strict equality (`===`). Containers compare structurally.
    pub fn strict_equals(&self, other: &Value) -> bool {
        self == other
    }

    /// Loose equality (`==`).
    pub fn loose_equals(&self, other: &Value) -> bool {
        match (self, other) {
            (a, b) if a.is_nullish() && b.is_nullish() => true,
            _ if self.is_nullish() || other.is_nullish() => false,
            (Value::Number(_), Value::String(_))
            | (Value::String(_), Value::Number(_))
            | (Value::Bool(_), _)
            | (_, Value::Bool(_)) => {
                let (a, b) = (self.to_number(), other.to_number());
                a == b
            },
            _ => self.strict_equals(other),
        }
    }

    /// Convert to a JSON value; `undefined` and functions become `null`.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Undefined | Value::Null | Value::Function(_) => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 9.0e15 {
                    serde_json::Value::from(*n as i64)
                } else {
                    serde_json::Number::from_f64(*n)
                        .map(serde_json::Value::Number)
                        .unwrap_or(serde_json::Value::Null)
                }
            },
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Array(items) => serde_json::Value::Array(items.iter().map(Value::to_json).collect()),
            Value::Object(map) => serde_json::Value::Object(
                map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
        }
    }

    /// Convert to a YAML value; `undefined` and functions become `null`.
    pub fn to_yaml(&self) -> serde_yaml::Value {
        match self {
            Value::Undefined | Value::Null | Value::Function(_) => serde_yaml::Value::Null,
            Value::Bool(b) => serde_yaml::Value::Bool(*b),
            Value::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 9.0e15 {
                    serde_yaml::Value::Number((*n as i64).into())
                } else {
                    serde_yaml::Value::Number((*n).into())
                }
            },
            Value::String(s) => serde_yaml::Value::String(s.clone()),
            Value::Array(items) => serde_yaml::Value::Sequence(items.iter().map(Value::to_yaml).collect()),
            Value::Object(map) => serde_yaml::Value::Mapping(
                map.iter()
                    .map(|(k, v)| (serde_yaml::Value::String(k.clone()), v.to_yaml()))
                    .collect(),
            ),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => f.write_str("undefined"),
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => f.write_str(&format_number(*n)),
            Value::String(s) => f.write_str(s),
            Value::Array(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    if !item.is_nullish() {
                        write!(f, "{}", item)?;
                    }
                }
                Ok(())
            },
            Value::Object(_) => f.write_str("[object Object]"),
            Value::Function(func) => match func {
                Function::Helper(h) => write!(f, "function {}() {{ [native code] }}", h.name()),
                Function::Arrow(a) => write!(f, "({}) => {{ ... }}", a.params.join(", ")),
            },
        }
    }
}

/// Format a number the way template strings print it.
///
/// Integers print without a fractional part, everything else uses the
/// shortest representation that round-trips. Magnitudes from `1e21` up and
/// below `1e-6` use exponent form (`1e+21`, `1.5e-7`).
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        let sign = if n > 0.0 { "" } else { "-" };
        format!("{}Infinity", sign)
    } else if n == 0.0 {
        "0".to_string()
    } else if n.abs() >= 1e21 || n.abs() < 1e-6 {
        let exponent = format!("{:e}", n);
        match exponent.split_once('e') {
            Some((mantissa, exp)) if !exp.starts_with('-') => format!("{}e+{}", mantissa, exp),
            _ => exponent,
        }
    } else if n.fract() == 0.0 {
        format!("{:.0}", n)
    } else {
        format!("{}", n)
    }
}

fn string_to_number(s: &str) -> f64 {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return 0.0;
    }
    match trimmed {
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {},
    }
    // Reject forms Rust accepts but script numbers do not ("inf", "nan").
    if !trimmed
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E'))
    {
        return f64::NAN;
    }
    trimmed.parse::<f64>().unwrap_or(f64::NAN)
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<Map> for Value {
    fn from(map: Map) -> Self {
        Value::Object(map)
    }
}

impl From<serde_yaml::Value> for Value {
    fn from(value: serde_yaml::Value) -> Self {
        match value {
            serde_yaml::Value::Null => Value::Null,
            serde_yaml::Value::Bool(b) => Value::Bool(b),
            serde_yaml::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_yaml::Value::String(s) => Value::String(s),
            serde_yaml::Value::Sequence(items) => {
                Value::Array(items.into_iter().map(Value::from).collect())
            },
            serde_yaml::Value::Mapping(mapping) => Value::Object(
                mapping
                    .into_iter()
                    .map(|(k, v)| (yaml_key_to_string(&k), Value::from(v)))
                    .collect(),
            ),
            serde_yaml::Value::Tagged(tagged) => Value::from(tagged.value),
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from).collect())
            },
            serde_json::Value::Object(map) => {
                Value::Object(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            },
        }
    }
}

/// Render a YAML mapping key as a string.
///
/// Script and map files use bare integers as keys (`0: ctx.city`), which YAML
/// types as numbers; they are addressed as strings everywhere else.
pub fn yaml_key_to_string(key: &serde_yaml::Value) -> String {
    match key {
        serde_yaml::Value::String(s) => s.clone(),
        serde_yaml::Value::Number(n) => n.to_string(),
        serde_yaml::Value::Bool(b) => b.to_string(),
        serde_yaml::Value::Null => "null".to_string(),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truthiness() {
        assert!(!Value::Undefined.is_truthy());
        assert!(!Value::Null.is_truthy());
        assert!(!Value::Number(0.0).is_truthy());
        assert!(!Value::Number(f64::NAN).is_truthy());
        assert!(!Value::empty().is_truthy());
        assert!(Value::from("0").is_truthy());
        assert!(Value::Object(Map::new()).is_truthy());
    }

    #[test]
    fn test_number_display() {
        assert_eq!(format_number(1234.0), "1234");
        assert_eq!(format_number(1234.56), "1234.56");
        assert_eq!(format_number(-0.0), "0");
        assert_eq!(format_number(f64::NAN), "NaN");
        assert_eq!(format_number(f64::NEG_INFINITY), "-Infinity");
        assert_eq!(format_number(1e21), "1e+21");
        assert_eq!(format_number(-2.5e22), "-2.5e+22");
        assert_eq!(format_number(1e20), "100000000000000000000");
        assert_eq!(format_number(1e-7), "1e-7");
        assert_eq!(format_number(1.5e-7), "1.5e-7");
        assert_eq!(format_number(0.000001), "0.000001");
    }

    #[test]
    fn test_to_number() {
        assert_eq!(Value::from("").to_number(), 0.0);
        assert_eq!(Value::from(" 42 ").to_number(), 42.0);
        assert!(Value::from("foo").to_number().is_nan());
        assert!(Value::from("inf").to_number().is_nan());
        assert_eq!(Value::Null.to_number(), 0.0);
        assert!(Value::Undefined.to_number().is_nan());
    }

    #[test]
    fn test_string_property_access() {
        let v = Value::from("Adam");
        assert_eq!(v.property("0"), Some(Value::from("A")));
        assert_eq!(v.property("length"), Some(Value::Number(4.0)));
        assert_eq!(v.property("9"), None);
    }

    #[test]
    fn test_loose_equality() {
        assert!(Value::from("1").loose_equals(&Value::Number(1.0)));
        assert!(Value::Null.loose_equals(&Value::Undefined));
        assert!(!Value::Null.loose_equals(&Value::Number(0.0)));
        assert!(!Value::from("1").strict_equals(&Value::Number(1.0)));
    }

    #[test]
    fn test_from_yaml_stringifies_keys() {
        let yaml: serde_yaml::Value = serde_yaml::from_str("0: ctx.city\nname: x\n").unwrap();
        let value = Value::from(yaml);
        let map = value.as_object().unwrap();
        assert_eq!(map.get("0"), Some(&Value::from("ctx.city")));
        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["0", "name"]);
    }

    #[test]
    fn test_json_round_trip_numbers() {
        assert_eq!(Value::Number(3.0).to_json(), serde_json::json!(3));
        assert_eq!(Value::Number(2.5).to_json(), serde_json::json!(2.5));
        assert_eq!(Value::Undefined.to_json(), serde_json::Value::Null);
    }
}
