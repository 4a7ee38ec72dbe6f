//! Script expressions.
//!
//! Fill scripts carry small expressions in a JavaScript-like syntax:
//! template values such as `ctx.location.city` or
//! `` `${ctx.first} ${ctx.last}` `` and calculate functions such as
//! `(ctx, value) => ({ field: value > 0 ? 1 : 2, fill: 1 })`.
//!
//! - [`lexer`]: nom-based tokenizer
//! - [`parser`]: recursive-descent parser producing an [`ast::Expr`]
//! - [`eval`]: tree-walking interpreter
//!
//! [`Evaluator`] is the entry point used by the form filler.

pub mod ast;
pub mod eval;
pub mod lexer;
pub mod parser;

use crate::context::Context;
use crate::error::{Error, Result};
use crate::helpers::Helpers;
use crate::value::Value;
use ast::Expr;
use eval::Interpreter;

/// A compiled template expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    source: String,
    expr: Expr,
}

impl Template {
    /// Compile template text.
    ///
    /// The text is parsed as a single expression first. If that fails and
    /// the text contains `${`, it is parsed as interpolated text, as if it
    /// were wrapped in back-ticks. Blank text compiles to `""`.
    pub fn compile(source: &str) -> Result<Self> {
        let expr = if source.trim().is_empty() {
            Expr::Str(String::new())
        } else {
            match parser::parse_expression(source) {
                Ok(expr) => expr,
                Err(_) if source.contains("${") => {
                    parser::parse_interpolated(source).map_err(|e| Error::expression(source, e))?
                },
                Err(e) => return Err(Error::expression(source, e)),
            }
        };

        Ok(Self {
            source: source.to_string(),
            expr,
        })
    }

    /// The text the template was compiled from.
    pub fn source(&self) -> &str {
        &self.source
    }
}

/// Result of a calculate function.
#[derive(Debug, Clone, PartialEq)]
pub struct Calculated {
    /// Field index, as returned
    pub field: Value,
    /// Value to fill
    pub fill: Value,
}

impl Calculated {
    /// Field index and fill value.
    pub fn new(field: impl Into<Value>, fill: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            fill: fill.into(),
        }
    }

    /// Fails with [`Error::CalculateContract`] unless both parts are defined.
    pub(crate) fn ensure_defined(self) -> Result<Self> {
        if matches!(self.field, Value::Undefined) || matches!(self.fill, Value::Undefined) {
            return Err(Error::CalculateContract);
        }
        Ok(self)
    }

    /// The field index as map index text (`0` and `'0'` are the same index).
    pub fn field_index(&self) -> String {
        self.field.to_string()
    }
}

/// Evaluates template and calculate expressions against a context.
#[derive(Debug, Clone, Default)]
pub struct Evaluator {
    helpers: Helpers,
}

impl Evaluator {
    /// Create an evaluator exposing the given helpers.
    pub fn new(helpers: Helpers) -> Self {
        Self { helpers }
    }

    /// The helper set available to expressions.
    pub fn helpers(&self) -> &Helpers {
        &self.helpers
    }

    /// Evaluate a compiled template with safe context access.
    ///
    /// Falsy results become `""`; other values are returned as they are.
    pub fn render(&self, context: &Context, template: &Template) -> Result<Value> {
        let value = Interpreter::template(&self.helpers, context)
            .eval(&template.expr)
            .map_err(|e| Error::expression(&template.source, e))?;
        log::trace!("  template `{}` => {:?}", template.source, value);

        if value.is_truthy() {
            Ok(value)
        } else {
            Ok(Value::empty())
        }
    }

    /// Compile and evaluate template text.
    pub fn eval_template(&self, context: &Context, template: &str) -> Result<Value> {
        log::debug!("evalTemplate {}", template);
        self.render(context, &Template::compile(template)?)
    }

    /// Evaluate a calculate expression and call the resulting function with
    /// `(ctx, value)`.
    ///
    /// The context is passed with strict access. The function must return an
    /// object with `field` and `fill` defined.
    pub fn eval_calculate(&self, context: &Context, expression: &str, value: Value) -> Result<Calculated> {
        log::debug!("evalCalculate {}", expression);

        let expr = parser::parse_expression(expression).map_err(|e| Error::expression(expression, e))?;
        let mut interpreter = Interpreter::strict(&self.helpers);
        let result = interpreter
            .eval(&expr)
            .and_then(|function| {
                interpreter.call_value(&function, vec![context.root().clone(), value], "calculate")
            })
            .map_err(|e| Error::expression(expression, e))?;

        let Value::Object(mut object) = result else {
            log::debug!("invalid calculate return value from `{}`", expression);
            return Err(Error::CalculateContract);
        };
        let field = object.shift_remove("field").unwrap_or_default();
        let fill = object.shift_remove("fill").unwrap_or_default();
        Calculated { field, fill }.ensure_defined().map_err(|e| {
            log::debug!("invalid calculate return value from `{}`", expression);
            e
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Map;

    fn context() -> Context {
        let yaml: serde_yaml::Value =
            serde_yaml::from_str("city: Dublin\ncountry: Ireland\nzero: 0\n").unwrap();
        match Value::from(yaml) {
            Value::Object(map) => Context::new(map).unwrap(),
            _ => panic!("expected mapping"),
        }
    }

    #[test]
    fn test_expression_template() {
        let eval = Evaluator::default();
        let value = eval.eval_template(&context(), "ctx.city").unwrap();
        assert_eq!(value, Value::from("Dublin"));
    }

    #[test]
    fn test_interpolated_template_fallback() {
        let eval = Evaluator::default();
        let value = eval.eval_template(&context(), "${ctx.city}, ${ctx.country}").unwrap();
        assert_eq!(value, Value::from("Dublin, Ireland"));
    }

    #[test]
    fn test_falsy_results_become_empty() {
        let eval = Evaluator::default();
        let ctx = context();
        assert_eq!(eval.eval_template(&ctx, "ctx.missing").unwrap(), Value::empty());
        assert_eq!(eval.eval_template(&ctx, "ctx.zero").unwrap(), Value::empty());
        assert_eq!(eval.eval_template(&ctx, "null").unwrap(), Value::empty());
        assert_eq!(eval.eval_template(&ctx, "").unwrap(), Value::empty());
    }

    #[test]
    fn test_numbers_stay_numbers() {
        let eval = Evaluator::default();
        assert_eq!(eval.eval_template(&context(), "1200 + 34").unwrap(), Value::Number(1234.0));
    }

    #[test]
    fn test_unparseable_template() {
        let eval = Evaluator::default();
        let err = eval.eval_template(&context(), "ctx.city +").unwrap_err();
        assert!(matches!(err, Error::Expression { .. }));
    }

    #[test]
    fn test_runaway_expressions_are_errors() {
        let eval = Evaluator::default();
        let ctx = context();
        for source in ["'x'.repeat(1/0)", "'x'.padStart(1e15)"] {
            let err = eval.eval_template(&ctx, source).unwrap_err();
            assert!(matches!(err, Error::Expression { .. }), "{}", source);
        }

        let nested = format!("{}1{}", "(".repeat(5000), ")".repeat(5000));
        let err = eval.eval_template(&ctx, &nested).unwrap_err();
        assert!(err.to_string().contains("nested too deeply"));
    }

    #[test]
    fn test_calculate() {
        let eval = Evaluator::default();
        let ctx = context();
        let value = eval.eval_template(&ctx, "`${ctx.city}, ${ctx.country}`").unwrap();
        let calculated = eval
            .eval_calculate(
                &ctx,
                "(ctx, value) => ({ field: value === 'Dublin, Ireland' ? 3 : 4, fill: value })",
                value,
            )
            .unwrap();
        assert_eq!(calculated.field_index(), "3");
        assert_eq!(calculated.fill, Value::from("Dublin, Ireland"));
    }

    #[test]
    fn test_calculate_sees_raw_context() {
        let eval = Evaluator::default();
        let calculated = eval
            .eval_calculate(
                &context(),
                "(ctx) => ({ field: '0', fill: ctx.missing === undefined ? 'yes' : 'no' })",
                Value::empty(),
            )
            .unwrap();
        assert_eq!(calculated.fill, Value::from("yes"));

        let err = eval
            .eval_calculate(&context(), "(ctx) => ({ field: 0, fill: ctx.missing.deeper })", Value::empty())
            .unwrap_err();
        assert_eq!(
            err.expression_reason(),
            Some("Cannot read properties of undefined (reading 'deeper')")
        );
    }

    #[test]
    fn test_calculate_contract() {
        let eval = Evaluator::default();
        let ctx = context();
        for source in [
            "() => 'x'",
            "() => ({ field: 1 })",
            "() => ({ fill: 1 })",
            "() => { }",
            "() => null",
        ] {
            let err = eval.eval_calculate(&ctx, source, Value::empty()).unwrap_err();
            assert!(matches!(err, Error::CalculateContract), "{source}");
        }
    }

    #[test]
    fn test_calculate_not_a_function() {
        let eval = Evaluator::default();
        let err = eval.eval_calculate(&context(), "42", Value::empty()).unwrap_err();
        assert_eq!(err.expression_reason(), Some("calculate is not a function"));
    }

    #[test]
    fn test_calculate_thrown_error() {
        let eval = Evaluator::default();
        let err = eval
            .eval_calculate(&context(), "(ctx, v) => { throw new Error(`bad ${v}`) }", Value::from("x"))
            .unwrap_err();
        assert_eq!(err.expression_reason(), Some("bad x"));
    }

    #[test]
    fn test_compiled_template_reuse() {
        let eval = Evaluator::default();
        let template = Template::compile("ctx.forms.f1.total || 'none'").unwrap();
        let mut ctx = Context::new(Map::new()).unwrap();
        assert_eq!(eval.render(&ctx, &template).unwrap(), Value::from("none"));
        ctx.record("f1", "total", Value::from("10"));
        assert_eq!(eval.render(&ctx, &template).unwrap(), Value::from("10"));
    }
}
