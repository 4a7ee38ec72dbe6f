//! Tree-walking interpreter for script expressions.
//!
//! Values follow script semantics: `+` concatenates when either side is a
//! string, comparisons coerce to numbers unless both sides are strings,
//! `&&`/`||`/`??` return an operand rather than a boolean.
//!
//! Names resolve innermost first: block and arrow bindings, then the `ctx`
//! global (template mode only), then the helper functions. Anything else is
//! reported as `<name> is not defined`.

use super::ast::{
    ArrowBody, ArrowDef, BinaryOp, Expr, LogicalOp, MemberKey, Stmt, TemplatePart, UnaryOp,
};
use crate::context::{Access, Context};
use crate::helpers::{Helper, Helpers};
use crate::value::{Function, Map, Value};
use std::fmt;
use std::sync::Arc;

/// Nested call limit.
const MAX_CALL_DEPTH: usize = 100;

/// Longest string `repeat`, `padStart` and `padEnd` will build, in chars.
const MAX_STRING_LENGTH: usize = (1 << 29) - 24;

/// Name of the context global.
const CTX: &str = "ctx";

/// Runtime failure, including values thrown by `throw`.
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeError {
    /// Error message
    pub message: String,
}

impl RuntimeError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

type EvalResult<T> = std::result::Result<T, RuntimeError>;

/// Arrow function value: definition plus the bindings visible where it was
/// created.
#[derive(Debug)]
pub struct Arrow {
    /// Parameter names
    pub params: Vec<String>,
    def: Arc<ArrowDef>,
    captured: Vec<(String, Value)>,
}

/// How a statement finished.
enum Completion {
    Normal,
    Return(Value),
    Break,
}

/// Expression interpreter.
pub struct Interpreter<'a> {
    helpers: &'a Helpers,
    context: Option<&'a Context>,
    access: Access,
    scopes: Vec<Vec<(String, Value)>>,
    depth: usize,
}

impl<'a> Interpreter<'a> {
    /// Interpreter for template expressions: `ctx` is a global with safe
    /// access.
    pub fn template(helpers: &'a Helpers, context: &'a Context) -> Self {
        Self {
            helpers,
            context: Some(context),
            access: Access::Safe,
            scopes: Vec::new(),
            depth: 0,
        }
    }

    /// Interpreter for calculate functions: no `ctx` global, strict access.
    pub fn strict(helpers: &'a Helpers) -> Self {
        Self {
            helpers,
            context: None,
            access: Access::Strict,
            scopes: Vec::new(),
            depth: 0,
        }
    }

    /// Evaluate an expression.
    pub fn eval(&mut self, expr: &Expr) -> EvalResult<Value> {
        match expr {
            Expr::Number(n) => Ok(Value::Number(*n)),
            Expr::Str(s) => Ok(Value::String(s.clone())),
            Expr::Bool(b) => Ok(Value::Bool(*b)),
            Expr::Null => Ok(Value::Null),
            Expr::Undefined => Ok(Value::Undefined),
            Expr::Template(parts) => {
                let mut out = String::new();
                for part in parts {
                    match part {
                        TemplatePart::Text(text) => out.push_str(text),
                        TemplatePart::Expr(expr) => out.push_str(&self.eval(expr)?.to_string()),
                    }
                }
                Ok(Value::String(out))
            },
            Expr::Array(items) => {
                let values = items
                    .iter()
                    .map(|item| self.eval(item))
                    .collect::<EvalResult<Vec<_>>>()?;
                Ok(Value::Array(values))
            },
            Expr::Object(entries) => {
                let mut map = Map::new();
                for (key, value) in entries {
                    let value = self.eval(value)?;
                    map.insert(key.clone(), value);
                }
                Ok(Value::Object(map))
            },
            Expr::Ident(name) => self.lookup(name),
            Expr::Member { .. } | Expr::Call { .. } => {
                Ok(self.eval_chain(expr)?.unwrap_or(Value::Undefined))
            },
            Expr::New { name, args } => self.construct(name, args),
            Expr::Unary { op, operand } => self.unary(*op, operand),
            Expr::Binary { op, left, right } => {
                let left = self.eval(left)?;
                let right = self.eval(right)?;
                Ok(binary(*op, &left, &right))
            },
            Expr::Logical { op, left, right } => {
                let left = self.eval(left)?;
                let short_circuit = match op {
                    LogicalOp::And => !left.is_truthy(),
                    LogicalOp::Or => left.is_truthy(),
                    LogicalOp::Nullish => !left.is_nullish(),
                };
                if short_circuit {
                    Ok(left)
                } else {
                    self.eval(right)
                }
            },
            Expr::Conditional {
                test,
                consequent,
                alternate,
            } => {
                if self.eval(test)?.is_truthy() {
                    self.eval(consequent)
                } else {
                    self.eval(alternate)
                }
            },
            Expr::Assign { name, value } => {
                let value = self.eval(value)?;
                self.assign(name, value.clone())?;
                Ok(value)
            },
            Expr::Arrow(def) => Ok(Value::Function(Function::Arrow(Arc::new(Arrow {
                params: def.params.clone(),
                def: Arc::clone(def),
                captured: self.capture(),
            })))),
        }
    }

    /// Call a function value with already-evaluated arguments.
    pub fn call_value(&mut self, callee: &Value, args: Vec<Value>, name: &str) -> EvalResult<Value> {
        match callee {
            Value::Function(Function::Helper(helper)) => {
                let arg = args.into_iter().next().unwrap_or_default();
                Ok(self.helpers.call(*helper, &arg))
            },
            Value::Function(Function::Arrow(arrow)) => self.call_arrow(arrow, args),
            _ => Err(RuntimeError::new(format!("{} is not a function", name))),
        }
    }

    // ------------------------------------------------------------------
    // Names
    // ------------------------------------------------------------------

    fn is_local(&self, name: &str) -> bool {
        self.scopes.iter().any(|frame| frame.iter().any(|(n, _)| n == name))
    }

    fn lookup(&self, name: &str) -> EvalResult<Value> {
        for frame in self.scopes.iter().rev() {
            if let Some((_, value)) = frame.iter().rev().find(|(n, _)| n == name) {
                return Ok(value.clone());
            }
        }
        if name == CTX {
            if let Some(context) = self.context {
                return Ok(context.root().clone());
            }
        }
        if let Some(helper) = Helper::from_name(name) {
            return Ok(Value::Function(Function::Helper(helper)));
        }
        Err(RuntimeError::new(format!("{} is not defined", name)))
    }

    fn is_defined(&self, name: &str) -> bool {
        self.is_local(name)
            || (name == CTX && self.context.is_some())
            || Helper::from_name(name).is_some()
    }

    fn assign(&mut self, name: &str, value: Value) -> EvalResult<()> {
        for frame in self.scopes.iter_mut().rev() {
            if let Some((_, slot)) = frame.iter_mut().rev().find(|(n, _)| n == name) {
                *slot = value;
                return Ok(());
            }
        }
        Err(RuntimeError::new(format!("{} is not defined", name)))
    }

    fn declare(&mut self, name: &str, value: Value) {
        if self.scopes.is_empty() {
            self.scopes.push(Vec::new());
        }
        if let Some(frame) = self.scopes.last_mut() {
            frame.push((name.to_string(), value));
        }
    }

    /// Flatten the visible bindings for a new closure.
    fn capture(&self) -> Vec<(String, Value)> {
        self.scopes.iter().flatten().cloned().collect()
    }

    // ------------------------------------------------------------------
    // Member access and calls
    // ------------------------------------------------------------------

    /// Whether `expr` is a member chain starting at the `ctx` global.
    fn rooted_at_ctx(&self, expr: &Expr) -> bool {
        match expr {
            Expr::Ident(name) => name == CTX && self.context.is_some() && !self.is_local(name),
            Expr::Member { object, .. } => self.rooted_at_ctx(object),
            _ => false,
        }
    }

    /// Property names along a `ctx` member chain.
    fn ctx_path(&mut self, expr: &Expr, path: &mut Vec<String>) -> EvalResult<()> {
        if let Expr::Member {
            object, property, ..
        } = expr
        {
            self.ctx_path(object, path)?;
            let key = self.property_key(property)?;
            path.push(key);
        }
        Ok(())
    }

    fn property_key(&mut self, property: &MemberKey) -> EvalResult<String> {
        match property {
            MemberKey::Static(name) => Ok(name.clone()),
            MemberKey::Computed(expr) => Ok(self.eval(expr)?.to_string()),
        }
    }

    fn get_member(&self, object: &Value, key: &str) -> EvalResult<Value> {
        if object.is_nullish() {
            return Err(RuntimeError::new(format!(
                "Cannot read properties of {} (reading '{}')",
                object, key
            )));
        }
        Ok(object.property(key).unwrap_or(Value::Undefined))
    }

    /// Evaluate a member/call chain. `None` means an optional link
    /// short-circuited, which makes the whole chain `undefined`.
    fn eval_chain(&mut self, expr: &Expr) -> EvalResult<Option<Value>> {
        match expr {
            Expr::Member {
                object,
                property,
                optional,
            } => {
                if self.access == Access::Safe && self.rooted_at_ctx(expr) {
                    let mut path = Vec::new();
                    self.ctx_path(expr, &mut path)?;
                    return Ok(self.context.map(|context| context.get_path(&path)));
                }
                let Some(base) = self.eval_chain(object)? else {
                    return Ok(None);
                };
                if *optional && base.is_nullish() {
                    return Ok(None);
                }
                let key = self.property_key(property)?;
                self.get_member(&base, &key).map(Some)
            },
            Expr::Call {
                callee,
                args,
                optional,
            } => {
                if let Expr::Member {
                    object,
                    property,
                    optional: optional_member,
                } = callee.as_ref()
                {
                    let Some(receiver) = self.eval_chain(object)? else {
                        return Ok(None);
                    };
                    if *optional_member && receiver.is_nullish() {
                        return Ok(None);
                    }
                    let key = self.property_key(property)?;
                    if receiver.is_nullish() {
                        return Err(RuntimeError::new(format!(
                            "Cannot read properties of {} (reading '{}')",
                            receiver, key
                        )));
                    }
                    let name = callee_name(callee);
                    let method = match &receiver {
                        Value::Object(map) => map.get(&key).cloned(),
                        _ => None,
                    };
                    if *optional && method.as_ref().map_or(!has_method(&receiver, &key), Value::is_nullish) {
                        return Ok(None);
                    }
                    let args = self.eval_args(args)?;
                    return match method {
                        Some(function) => self.call_value(&function, args, &name).map(Some),
                        None => self.call_method(&receiver, &key, args, &name).map(Some),
                    };
                }

                let Some(function) = self.eval_chain(callee)? else {
                    return Ok(None);
                };
                if *optional && function.is_nullish() {
                    return Ok(None);
                }
                let args = self.eval_args(args)?;
                self.call_value(&function, args, &callee_name(callee)).map(Some)
            },
            other => self.eval(other).map(Some),
        }
    }

    fn eval_args(&mut self, args: &[Expr]) -> EvalResult<Vec<Value>> {
        args.iter().map(|arg| self.eval(arg)).collect()
    }

    fn call_arrow(&mut self, arrow: &Arrow, args: Vec<Value>) -> EvalResult<Value> {
        if self.depth >= MAX_CALL_DEPTH {
            return Err(RuntimeError::new("Maximum call stack size exceeded"));
        }

        let mut frame = arrow.captured.clone();
        let mut args = args.into_iter();
        for param in &arrow.params {
            frame.push((param.clone(), args.next().unwrap_or_default()));
        }

        let saved = std::mem::replace(&mut self.scopes, vec![frame]);
        self.depth += 1;
        let result = match &arrow.def.body {
            ArrowBody::Expr(body) => self.eval(body),
            ArrowBody::Block(body) => self.exec_block(body).map(|completion| match completion {
                Completion::Return(value) => value,
                Completion::Normal | Completion::Break => Value::Undefined,
            }),
        };
        self.depth -= 1;
        self.scopes = saved;
        result
    }

    /// `new Error(message)`.
    fn construct(&mut self, name: &str, args: &[Expr]) -> EvalResult<Value> {
        if !matches!(name, "Error" | "TypeError" | "RangeError") {
            return Err(RuntimeError::new(format!("{} is not a constructor", name)));
        }
        let message = match args.first() {
            Some(arg) => self.eval(arg)?.to_string(),
            None => String::new(),
        };
        let mut error = Map::new();
        error.insert("name".to_string(), Value::from(name));
        error.insert("message".to_string(), Value::String(message));
        Ok(Value::Object(error))
    }

    fn unary(&mut self, op: UnaryOp, operand: &Expr) -> EvalResult<Value> {
        if op == UnaryOp::TypeOf {
            if let Expr::Ident(name) = operand {
                if !self.is_defined(name) {
                    return Ok(Value::from("undefined"));
                }
            }
            return Ok(Value::from(self.eval(operand)?.type_name()));
        }

        let value = self.eval(operand)?;
        Ok(match op {
            UnaryOp::Not => Value::Bool(!value.is_truthy()),
            UnaryOp::Neg => Value::Number(-value.to_number()),
            UnaryOp::Plus => Value::Number(value.to_number()),
            UnaryOp::TypeOf => Value::from(value.type_name()),
        })
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    fn exec_block(&mut self, body: &[Stmt]) -> EvalResult<Completion> {
        self.scopes.push(Vec::new());
        let result = self.exec_statements(body);
        self.scopes.pop();
        result
    }

    fn exec_statements(&mut self, body: &[Stmt]) -> EvalResult<Completion> {
        for stmt in body {
            match self.exec(stmt)? {
                Completion::Normal => {},
                other => return Ok(other),
            }
        }
        Ok(Completion::Normal)
    }

    fn exec(&mut self, stmt: &Stmt) -> EvalResult<Completion> {
        match stmt {
            Stmt::Declare { name, init } => {
                let value = match init {
                    Some(init) => self.eval(init)?,
                    None => Value::Undefined,
                };
                self.declare(name, value);
                Ok(Completion::Normal)
            },
            Stmt::Return(value) => {
                let value = match value {
                    Some(value) => self.eval(value)?,
                    None => Value::Undefined,
                };
                Ok(Completion::Return(value))
            },
            Stmt::If {
                test,
                then,
                otherwise,
            } => {
                if self.eval(test)?.is_truthy() {
                    self.exec(then)
                } else if let Some(otherwise) = otherwise {
                    self.exec(otherwise)
                } else {
                    Ok(Completion::Normal)
                }
            },
            Stmt::Switch {
                discriminant,
                cases,
            } => {
                let value = self.eval(discriminant)?;
                let mut start = None;
                for (i, case) in cases.iter().enumerate() {
                    if let Some(test) = &case.test {
                        if self.eval(test)?.strict_equals(&value) {
                            start = Some(i);
                            break;
                        }
                    }
                }
                let start = start.or_else(|| cases.iter().position(|case| case.test.is_none()));
                let Some(start) = start else {
                    return Ok(Completion::Normal);
                };

                self.scopes.push(Vec::new());
                let mut result = Ok(Completion::Normal);
                for case in &cases[start..] {
                    match self.exec_statements(&case.body) {
                        Ok(Completion::Normal) => continue,
                        Ok(Completion::Break) => break,
                        other => {
                            result = other;
                            break;
                        },
                    }
                }
                self.scopes.pop();
                result
            },
            Stmt::Break => Ok(Completion::Break),
            Stmt::Throw(value) => {
                let value = self.eval(value)?;
                let message = match value.as_object().and_then(|error| error.get("message")) {
                    Some(message) => message.to_string(),
                    None => value.to_string(),
                };
                Err(RuntimeError::new(message))
            },
            Stmt::Block(body) => self.exec_block(body),
            Stmt::Expr(expr) => {
                self.eval(expr)?;
                Ok(Completion::Normal)
            },
            Stmt::Empty => Ok(Completion::Normal),
        }
    }

    // ------------------------------------------------------------------
    // Built-in methods
    // ------------------------------------------------------------------

    fn call_method(&mut self, receiver: &Value, method: &str, args: Vec<Value>, name: &str) -> EvalResult<Value> {
        let arg = |i: usize| args.get(i).cloned().unwrap_or_default();

        match (receiver, method) {
            (_, "toString") => Ok(Value::String(receiver.to_string())),
            (Value::String(s), _) => string_method(s, method, &args)?
                .ok_or_else(|| RuntimeError::new(format!("{} is not a function", name))),
            (Value::Number(n), "toFixed") => {
                let digits = arg(0).to_number();
                let digits = if digits.is_nan() { 0 } else { digits.clamp(0.0, 100.0) as usize };
                Ok(Value::String(format!("{:.*}", digits, n)))
            },
            (Value::Array(items), "join") => {
                let separator = match arg(0) {
                    Value::Undefined => ",".to_string(),
                    sep => sep.to_string(),
                };
                let joined = items
                    .iter()
                    .map(|item| if item.is_nullish() { String::new() } else { item.to_string() })
                    .collect::<Vec<_>>()
                    .join(&separator);
                Ok(Value::String(joined))
            },
            (Value::Array(items), "includes") => {
                let needle = arg(0);
                Ok(Value::Bool(items.iter().any(|item| item.strict_equals(&needle))))
            },
            (Value::Array(items), "indexOf") => {
                let needle = arg(0);
                let index = items.iter().position(|item| item.strict_equals(&needle));
                Ok(Value::Number(index.map_or(-1.0, |i| i as f64)))
            },
            (Value::Array(items), "slice") => {
                let begin = relative_index(args.first(), items.len(), 0);
                let end = relative_index(args.get(1), items.len(), items.len());
                Ok(Value::Array(items.get(begin..end.max(begin)).unwrap_or(&[]).to_vec()))
            },
            (Value::Array(items), "map" | "filter" | "some" | "every" | "find") => {
                let callback = arg(0);
                let mut out = Vec::new();
                for (i, item) in items.iter().enumerate() {
                    let result =
                        self.call_value(&callback, vec![item.clone(), Value::Number(i as f64)], name)?;
                    match method {
                        "map" => out.push(result),
                        "filter" if result.is_truthy() => out.push(item.clone()),
                        "some" if result.is_truthy() => return Ok(Value::Bool(true)),
                        "every" if !result.is_truthy() => return Ok(Value::Bool(false)),
                        "find" if result.is_truthy() => return Ok(item.clone()),
                        _ => {},
                    }
                }
                Ok(match method {
                    "some" => Value::Bool(false),
                    "every" => Value::Bool(true),
                    "find" => Value::Undefined,
                    _ => Value::Array(out),
                })
            },
            _ => Err(RuntimeError::new(format!("{} is not a function", name))),
        }
    }
}

/// Whether a built-in method exists for the receiver.
fn has_method(receiver: &Value, method: &str) -> bool {
    match receiver {
        Value::Undefined | Value::Null => false,
        Value::String(s) => method == "toString" || matches!(string_method(s, method, &[]), Ok(Some(_))),
        Value::Number(_) => matches!(method, "toFixed" | "toString"),
        Value::Array(_) => matches!(
            method,
            "join" | "includes" | "indexOf" | "slice" | "map" | "filter" | "some" | "every" | "find" | "toString"
        ),
        _ => method == "toString",
    }
}

/// String built-ins. `None` when the method does not exist.
fn string_method(s: &str, method: &str, args: &[Value]) -> EvalResult<Option<Value>> {
    let arg_str = |i: usize| match args.get(i) {
        Some(Value::Undefined) | None => "undefined".to_string(),
        Some(v) => v.to_string(),
    };
    let chars: Vec<char> = s.chars().collect();
    let len = chars.len();

    let result = match method {
        "toUpperCase" => Value::String(s.to_uppercase()),
        "toLowerCase" => Value::String(s.to_lowercase()),
        "trim" => Value::from(s.trim()),
        "trimStart" => Value::from(s.trim_start()),
        "trimEnd" => Value::from(s.trim_end()),
        "includes" => Value::Bool(s.contains(arg_str(0).as_str())),
        "startsWith" => Value::Bool(s.starts_with(arg_str(0).as_str())),
        "endsWith" => Value::Bool(s.ends_with(arg_str(0).as_str())),
        "indexOf" => {
            let needle = arg_str(0);
            let index = s.find(needle.as_str()).map(|byte| s[..byte].chars().count() as f64);
            Value::Number(index.unwrap_or(-1.0))
        },
        "charAt" => {
            let index = relative_index(args.first(), len, 0);
            Value::String(chars.get(index).map(|c| c.to_string()).unwrap_or_default())
        },
        "slice" => {
            let begin = relative_index(args.first(), len, 0);
            let end = relative_index(args.get(1), len, len);
            Value::String(chars.get(begin..end.max(begin)).unwrap_or(&[]).iter().collect())
        },
        "substr" => {
            let begin = relative_index(args.first(), len, 0);
            let count = match args.get(1) {
                None | Some(Value::Undefined) => len,
                Some(v) => {
                    let n = v.to_number();
                    if n.is_nan() || n < 0.0 {
                        0
                    } else {
                        n as usize
                    }
                },
            };
            let end = begin.saturating_add(count).min(len);
            Value::String(chars[begin..end].iter().collect())
        },
        "substring" => {
            let clamp = |v: Option<&Value>, default: usize| match v {
                None | Some(Value::Undefined) => default,
                Some(v) => {
                    let n = v.to_number();
                    if n.is_nan() || n < 0.0 {
                        0
                    } else {
                        (n as usize).min(len)
                    }
                },
            };
            let (a, b) = (clamp(args.first(), 0), clamp(args.get(1), len));
            let (begin, end) = if a <= b { (a, b) } else { (b, a) };
            Value::String(chars[begin..end].iter().collect())
        },
        "split" => match args.first() {
            None | Some(Value::Undefined) => Value::Array(vec![Value::from(s)]),
            Some(sep) => {
                let sep = sep.to_string();
                let parts: Vec<Value> = if sep.is_empty() {
                    chars.iter().map(|c| Value::String(c.to_string())).collect()
                } else {
                    s.split(sep.as_str()).map(Value::from).collect()
                };
                Value::Array(parts)
            },
        },
        "replace" => Value::String(s.replacen(arg_str(0).as_str(), &arg_str(1), 1)),
        "replaceAll" => Value::String(s.replace(arg_str(0).as_str(), &arg_str(1))),
        "padStart" | "padEnd" => {
            let target = args.first().map(Value::to_number).unwrap_or(0.0);
            let target = if target.is_nan() { 0 } else { target.max(0.0) as usize };
            let fill = match args.get(1) {
                None | Some(Value::Undefined) => " ".to_string(),
                Some(v) => v.to_string(),
            };
            if target <= len || fill.is_empty() {
                Value::from(s)
            } else if target > MAX_STRING_LENGTH {
                return Err(RuntimeError::new("Invalid string length"));
            } else {
                let padding: String = fill.chars().cycle().take(target - len).collect();
                if method == "padStart" {
                    Value::String(padding + s)
                } else {
                    Value::String(format!("{}{}", s, padding))
                }
            }
        },
        "repeat" => {
            let count = args.first().map(Value::to_number).unwrap_or(0.0);
            let count = if count.is_nan() { 0.0 } else { count.trunc() };
            if count < 0.0 || count.is_infinite() {
                return Err(RuntimeError::new(format!("Invalid count value: {}", Value::Number(count))));
            }
            let count = count as usize;
            if len.saturating_mul(count) > MAX_STRING_LENGTH {
                return Err(RuntimeError::new("Invalid string length"));
            }
            Value::String(s.repeat(count))
        },
        _ => return Ok(None),
    };
    Ok(Some(result))
}

/// Resolve a `slice`-style index: negative counts from the end, the result
/// is clamped to `0..=len`.
fn relative_index(arg: Option<&Value>, len: usize, default: usize) -> usize {
    let n = match arg {
        None | Some(Value::Undefined) => return default,
        Some(v) => v.to_number(),
    };
    if n.is_nan() {
        0
    } else if n < 0.0 {
        (len as f64 + n.trunc()).max(0.0) as usize
    } else {
        (n.trunc() as usize).min(len)
    }
}

/// Source-like name of a callee for error messages.
fn callee_name(expr: &Expr) -> String {
    match expr {
        Expr::Ident(name) => name.clone(),
        Expr::Member {
            object,
            property: MemberKey::Static(key),
            ..
        } => format!("{}.{}", callee_name(object), key),
        Expr::Member { object, .. } => format!("{}[...]", callee_name(object)),
        Expr::Call { callee, .. } => format!("{}(...)", callee_name(callee)),
        _ => "expression".to_string(),
    }
}

/// Apply a binary operator.
fn binary(op: BinaryOp, left: &Value, right: &Value) -> Value {
    match op {
        BinaryOp::Add => {
            let is_text = |v: &Value| {
                matches!(
                    v,
                    Value::String(_) | Value::Array(_) | Value::Object(_) | Value::Function(_)
                )
            };
            if is_text(left) || is_text(right) {
                Value::String(format!("{}{}", left, right))
            } else {
                Value::Number(left.to_number() + right.to_number())
            }
        },
        BinaryOp::Sub => Value::Number(left.to_number() - right.to_number()),
        BinaryOp::Mul => Value::Number(left.to_number() * right.to_number()),
        BinaryOp::Div => Value::Number(left.to_number() / right.to_number()),
        BinaryOp::Rem => Value::Number(left.to_number() % right.to_number()),
        BinaryOp::Lt | BinaryOp::Gt | BinaryOp::Le | BinaryOp::Ge => {
            let ordering = match (left, right) {
                (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
                _ => left.to_number().partial_cmp(&right.to_number()),
            };
            let Some(ordering) = ordering else {
                return Value::Bool(false);
            };
            Value::Bool(match op {
                BinaryOp::Lt => ordering.is_lt(),
                BinaryOp::Gt => ordering.is_gt(),
                BinaryOp::Le => ordering.is_le(),
                _ => ordering.is_ge(),
            })
        },
        BinaryOp::LooseEq => Value::Bool(left.loose_equals(right)),
        BinaryOp::LooseNe => Value::Bool(!left.loose_equals(right)),
        BinaryOp::StrictEq => Value::Bool(left.strict_equals(right)),
        BinaryOp::StrictNe => Value::Bool(!left.strict_equals(right)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::parser::parse_expression;

    fn context() -> Context {
        let yaml: serde_yaml::Value = serde_yaml::from_str(
            "first: Ada\nmiddle: Byron\nlast: Lovelace\nincome: 1234.5\ntags: [a, b, c]\nnested:\n  inner: 2\n",
        )
        .unwrap();
        match Value::from(yaml) {
            Value::Object(map) => Context::new(map).unwrap(),
            _ => panic!("expected mapping"),
        }
    }

    fn template(source: &str) -> EvalResult<Value> {
        let helpers = Helpers::default();
        let ctx = context();
        let expr = parse_expression(source).unwrap();
        Interpreter::template(&helpers, &ctx).eval(&expr)
    }

    fn strict(source: &str) -> EvalResult<Value> {
        let helpers = Helpers::default();
        let expr = parse_expression(source).unwrap();
        Interpreter::strict(&helpers).eval(&expr)
    }

    #[test]
    fn test_ctx_paths() {
        assert_eq!(template("ctx.first").unwrap(), Value::from("Ada"));
        assert_eq!(template("ctx.nested.inner").unwrap(), Value::Number(2.0));
        assert_eq!(template("ctx['nested']['inner']").unwrap(), Value::Number(2.0));
        assert_eq!(template("ctx.tags[1]").unwrap(), Value::from("b"));
    }

    #[test]
    fn test_missing_ctx_paths_are_empty() {
        assert_eq!(template("ctx.nope.deeper.still").unwrap(), Value::empty());
        assert_eq!(template("ctx.nope.toUpperCase()").unwrap(), Value::empty());
        assert_eq!(template("ctx.forms.other").unwrap(), Value::Object(Map::new()));
    }

    #[test]
    fn test_name_with_middle_initial() {
        let source = r#"ctx.first + (ctx.middle ? ` ${ctx.middle[0]}` : "") + " " + ctx.last"#;
        assert_eq!(template(source).unwrap(), Value::from("Ada B Lovelace"));
    }

    #[test]
    fn test_helpers_are_globals() {
        assert_eq!(template("currency(ctx.income)").unwrap(), Value::from("1,234.50"));
        assert_eq!(template("strCapitalize(ctx.last.toLowerCase())").unwrap(), Value::from("Lovelace"));
    }

    #[test]
    fn test_undefined_function() {
        let err = template("badFunc(ctx.first)").unwrap_err();
        assert_eq!(err.message, "badFunc is not defined");
    }

    #[test]
    fn test_arithmetic_and_concatenation() {
        assert_eq!(strict("1 + 2 * 3").unwrap(), Value::Number(7.0));
        assert_eq!(strict("'1' + 2").unwrap(), Value::from("12"));
        assert_eq!(strict("'3' * '4'").unwrap(), Value::Number(12.0));
        assert_eq!(strict("7 % 4").unwrap(), Value::Number(3.0));
        assert_eq!(strict("'b' > 'a'").unwrap(), Value::Bool(true));
    }

    #[test]
    fn test_logical_operators_return_operands() {
        assert_eq!(strict("'' || 'fallback'").unwrap(), Value::from("fallback"));
        assert_eq!(strict("0 ?? 5").unwrap(), Value::Number(0.0));
        assert_eq!(strict("null ?? 5").unwrap(), Value::Number(5.0));
        assert_eq!(strict("1 && 'yes'").unwrap(), Value::from("yes"));
    }

    #[test]
    fn test_strict_access_through_undefined() {
        let err = strict("(o => o.a.b)({})").unwrap_err();
        assert_eq!(err.message, "Cannot read properties of undefined (reading 'b')");
        assert_eq!(strict("(o => o.a?.b)({})").unwrap(), Value::Undefined);
        assert_eq!(strict("(o => o.a?.b.c)({})").unwrap(), Value::Undefined);
    }

    #[test]
    fn test_closures_capture_scope() {
        let source = "((a) => { const add = b => a + b; return add(2); })(40)";
        assert_eq!(strict(source).unwrap(), Value::Number(42.0));
    }

    #[test]
    fn test_switch_with_fallthrough_and_default() {
        let source = r#"(v => {
            let out = '';
            switch (v) {
                case 1:
                    out = out + 'one';
                case 2:
                    out = out + 'two';
                    break;
                default:
                    out = 'other';
            }
            return out;
        })"#;
        assert_eq!(strict(&format!("{}(1)", source)).unwrap(), Value::from("onetwo"));
        assert_eq!(strict(&format!("{}(2)", source)).unwrap(), Value::from("two"));
        assert_eq!(strict(&format!("{}(3)", source)).unwrap(), Value::from("other"));
    }

    #[test]
    fn test_throw_error() {
        let err = strict("(() => { throw new Error('bad status') })()").unwrap_err();
        assert_eq!(err.message, "bad status");
    }

    #[test]
    fn test_string_methods() {
        assert_eq!(strict("'  hi '.trim()").unwrap(), Value::from("hi"));
        assert_eq!(strict("'abc'.toUpperCase()").unwrap(), Value::from("ABC"));
        assert_eq!(strict("'123-45'.replace('-', '')").unwrap(), Value::from("12345"));
        assert_eq!(strict("'abcdef'.slice(-2)").unwrap(), Value::from("ef"));
        assert_eq!(strict("'a,b'.split(',').length").unwrap(), Value::Number(2.0));
        assert_eq!(strict("'7'.padStart(3, '0')").unwrap(), Value::from("007"));
        assert_eq!(strict("'1234.56'.substr(-3)").unwrap(), Value::from(".56"));
    }

    #[test]
    fn test_string_growth_is_bounded() {
        assert_eq!(strict("'ab'.repeat(3)").unwrap(), Value::from("ababab"));
        assert_eq!(strict("'x'.repeat(1/0)").unwrap_err().message, "Invalid count value: Infinity");
        assert_eq!(strict("'x'.repeat(-1)").unwrap_err().message, "Invalid count value: -1");
        assert_eq!(strict("'x'.repeat(1e15)").unwrap_err().message, "Invalid string length");
        assert_eq!(strict("''.repeat(1e15)").unwrap(), Value::from(""));
        assert_eq!(strict("'x'.padStart(1e15)").unwrap_err().message, "Invalid string length");
        assert_eq!(strict("'x'.padEnd(1/0, '-')").unwrap_err().message, "Invalid string length");
        assert_eq!(strict("'x'.padEnd(1e15, '')").unwrap(), Value::from("x"));
    }

    #[test]
    fn test_array_methods() {
        assert_eq!(strict("[1, 2, 3].map(x => x * 2).join('-')").unwrap(), Value::from("2-4-6"));
        assert_eq!(strict("[1, 2, 3].filter(x => x > 1).length").unwrap(), Value::Number(2.0));
        assert_eq!(strict("['a', 'b'].includes('b')").unwrap(), Value::Bool(true));
    }

    #[test]
    fn test_not_a_function() {
        let err = strict("({ a: 1 }).a()").unwrap_err();
        assert_eq!(err.message, "expression.a is not a function");
        let err = strict("'x'.nope()").unwrap_err();
        assert!(err.message.ends_with("is not a function"));
    }

    #[test]
    fn test_typeof() {
        assert_eq!(strict("typeof nothing").unwrap(), Value::from("undefined"));
        assert_eq!(strict("typeof 1").unwrap(), Value::from("number"));
        assert_eq!(strict("typeof currency").unwrap(), Value::from("function"));
    }

    #[test]
    fn test_recursion_limit() {
        let err = strict("((f) => f(f))(f => f(f))").unwrap_err();
        assert_eq!(err.message, "Maximum call stack size exceeded");
    }
}
