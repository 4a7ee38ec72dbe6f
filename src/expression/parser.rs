//! Recursive-descent parser for script expressions.
//!
//! Grammar, lowest precedence first:
//!
//! ```text
//! assignment  := arrow | IDENT '=' assignment | conditional
//! arrow       := (IDENT | '(' params ')') '=>' (block | assignment)
//! conditional := nullish ('?' assignment ':' assignment)?
//! nullish     := or ('??' or)*
//! or          := and ('||' and)*
//! and         := equality ('&&' equality)*
//! equality    := relational (('==' | '!=' | '===' | '!==') relational)*
//! relational  := additive (('<' | '>' | '<=' | '>=') additive)*
//! additive    := multiplicative (('+' | '-') multiplicative)*
//! multiplicative := unary (('*' | '/' | '%') unary)*
//! unary       := ('!' | '-' | '+' | 'typeof') unary | postfix
//! postfix     := primary ('.' IDENT | '?.' ... | '[' expr ']' | '(' args ')')*
//! ```
//!
//! Arrow function blocks accept declarations, `return`, `if`/`else`,
//! `switch`, `throw` and expression statements. Semicolons are optional.

use super::ast::{
    ArrowBody, ArrowDef, BinaryOp, Expr, LogicalOp, MemberKey, Stmt, SwitchCase, TemplatePart,
    UnaryOp,
};
use super::lexer::{scan_template, tokenize, LexError, Spanned, TemplateChunk, Token};
use std::sync::Arc;

/// Words that cannot be used as variable names.
const KEYWORDS: &[&str] = &[
    "break", "case", "const", "default", "else", "false", "function", "if", "let", "new", "null",
    "return", "switch", "throw", "true", "typeof", "undefined", "var",
];

/// Nesting limit for expressions, statements and template substitutions.
const MAX_NESTING: usize = 128;

/// Binary operator precedence levels, loosest first.
const BINARY_LEVELS: [&[&str]; 4] = [
    &["==", "!=", "===", "!=="],
    &["<", ">", "<=", ">="],
    &["+", "-"],
    &["*", "/", "%"],
];

/// Parse failure.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    /// Byte offset of the failure
    pub offset: usize,
    /// What went wrong
    pub message: String,
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} at position {}", self.message, self.offset)
    }
}

impl From<LexError> for ParseError {
    fn from(err: LexError) -> Self {
        ParseError {
            offset: err.offset,
            message: err.message,
        }
    }
}

type ParseResult<T> = std::result::Result<T, ParseError>;

/// Parse a complete expression.
pub fn parse_expression(source: &str) -> ParseResult<Expr> {
    parse_nested(source, 0)
}

fn parse_nested(source: &str, depth: usize) -> ParseResult<Expr> {
    let tokens = tokenize(source)?;
    let mut parser = Parser::new(tokens, source.len(), depth);
    let expr = parser.parse_assignment()?;
    if parser.pos < parser.tokens.len() {
        return Err(parser.unexpected());
    }
    Ok(expr)
}

/// Parse text with `${...}` substitutions as if it were a template literal.
pub fn parse_interpolated(source: &str) -> ParseResult<Expr> {
    let (chunks, _) = scan_template(source, None)?;
    Ok(Expr::Template(compile_chunks(chunks, 0)?))
}

fn compile_chunks(chunks: Vec<TemplateChunk>, depth: usize) -> ParseResult<Vec<TemplatePart>> {
    chunks
        .into_iter()
        .map(|chunk| match chunk {
            TemplateChunk::Text(text) => Ok(TemplatePart::Text(text)),
            TemplateChunk::Code(code) => parse_nested(&code, depth).map(TemplatePart::Expr),
        })
        .collect()
}

fn describe(token: &Token) -> String {
    match token {
        Token::Number(n) => crate::value::format_number(*n),
        Token::Str(_) => "string".to_string(),
        Token::Template(_) => "template string".to_string(),
        Token::Ident(name) => name.clone(),
        Token::Punct(p) => (*p).to_string(),
    }
}

/// Token-stream parser.
struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
    end_offset: usize,
    depth: usize,
}

impl Parser {
    fn new(tokens: Vec<Spanned>, end_offset: usize, depth: usize) -> Self {
        Self {
            tokens,
            pos: 0,
            end_offset,
            depth,
        }
    }

    /// Run `parse` one nesting level deeper.
    fn nested<T>(&mut self, parse: impl FnOnce(&mut Self) -> ParseResult<T>) -> ParseResult<T> {
        if self.depth >= MAX_NESTING {
            return Err(ParseError {
                offset: self.offset(),
                message: "Expression nested too deeply".to_string(),
            });
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|s| &s.token)
    }

    fn peek_at(&self, ahead: usize) -> Option<&Token> {
        self.tokens.get(self.pos + ahead).map(|s| &s.token)
    }

    fn offset(&self) -> usize {
        self.tokens
            .get(self.pos)
            .map(|s| s.offset)
            .unwrap_or(self.end_offset)
    }

    fn unexpected(&self) -> ParseError {
        let message = match self.peek() {
            Some(token) => format!("Unexpected token '{}'", describe(token)),
            None => "Unexpected end of input".to_string(),
        };
        ParseError {
            offset: self.offset(),
            message,
        }
    }

    fn is_punct(&self, punct: &str) -> bool {
        matches!(self.peek(), Some(Token::Punct(p)) if *p == punct)
    }

    fn eat_punct(&mut self, punct: &str) -> bool {
        if self.is_punct(punct) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_punct(&mut self, punct: &str) -> ParseResult<()> {
        if self.eat_punct(punct) {
            Ok(())
        } else {
            Err(self.unexpected())
        }
    }

    fn is_keyword(&self, keyword: &str) -> bool {
        matches!(self.peek(), Some(Token::Ident(name)) if name == keyword)
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if self.is_keyword(keyword) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// Identifier that may be bound as a variable.
    fn binding_name(&mut self) -> ParseResult<String> {
        match self.peek() {
            Some(Token::Ident(name)) if !KEYWORDS.contains(&name.as_str()) => {
                let name = name.clone();
                self.pos += 1;
                Ok(name)
            },
            _ => Err(self.unexpected()),
        }
    }

    /// Any identifier, keywords included (property names).
    fn property_name(&mut self) -> ParseResult<String> {
        match self.peek() {
            Some(Token::Ident(name)) => {
                let name = name.clone();
                self.pos += 1;
                Ok(name)
            },
            _ => Err(self.unexpected()),
        }
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    fn parse_assignment(&mut self) -> ParseResult<Expr> {
        self.nested(Self::parse_assignment_inner)
    }

    fn parse_assignment_inner(&mut self) -> ParseResult<Expr> {
        if let Some(arrow) = self.try_arrow()? {
            return Ok(arrow);
        }

        if let (Some(Token::Ident(name)), Some(Token::Punct("="))) = (self.peek(), self.peek_at(1)) {
            if !KEYWORDS.contains(&name.as_str()) {
                let name = name.clone();
                self.pos += 2;
                let value = self.parse_assignment()?;
                return Ok(Expr::Assign {
                    name,
                    value: Box::new(value),
                });
            }
        }

        self.parse_conditional()
    }

    /// Parse an arrow function if one starts here.
    fn try_arrow(&mut self) -> ParseResult<Option<Expr>> {
        let params = match (self.peek(), self.peek_at(1)) {
            (Some(Token::Ident(name)), Some(Token::Punct("=>"))) => {
                if KEYWORDS.contains(&name.as_str()) {
                    return Err(self.unexpected());
                }
                let params = vec![name.clone()];
                self.pos += 2;
                params
            },
            (Some(Token::Punct("(")), _) => {
                let Some(close) = self.matching_close(self.pos) else {
                    return Ok(None);
                };
                if !matches!(self.tokens.get(close + 1).map(|s| &s.token), Some(Token::Punct("=>"))) {
                    return Ok(None);
                }
                self.pos += 1;
                let mut params = Vec::new();
                while !self.eat_punct(")") {
                    params.push(self.binding_name()?);
                    if !self.is_punct(")") {
                        self.expect_punct(",")?;
                    }
                }
                self.expect_punct("=>")?;
                params
            },
            _ => return Ok(None),
        };

        let body = if self.is_punct("{") {
            ArrowBody::Block(self.parse_block()?)
        } else {
            ArrowBody::Expr(Box::new(self.parse_assignment()?))
        };

        Ok(Some(Expr::Arrow(Arc::new(ArrowDef { params, body }))))
    }

    /// Index of the `)` matching the `(` at `open`.
    fn matching_close(&self, open: usize) -> Option<usize> {
        let mut depth = 0usize;
        for (i, spanned) in self.tokens.iter().enumerate().skip(open) {
            match spanned.token {
                Token::Punct("(") | Token::Punct("[") | Token::Punct("{") => depth += 1,
                Token::Punct(")") | Token::Punct("]") | Token::Punct("}") => {
                    depth = depth.checked_sub(1)?;
                    if depth == 0 {
                        return Some(i);
                    }
                },
                _ => {},
            }
        }
        None
    }

    fn parse_conditional(&mut self) -> ParseResult<Expr> {
        let test = self.parse_logical(0)?;
        if !self.eat_punct("?") {
            return Ok(test);
        }
        let consequent = self.parse_assignment()?;
        self.expect_punct(":")?;
        let alternate = self.parse_assignment()?;
        Ok(Expr::Conditional {
            test: Box::new(test),
            consequent: Box::new(consequent),
            alternate: Box::new(alternate),
        })
    }

    /// `??` (level 0), `||` (level 1), `&&` (level 2).
    fn parse_logical(&mut self, level: usize) -> ParseResult<Expr> {
        let (punct, op) = match level {
            0 => ("??", LogicalOp::Nullish),
            1 => ("||", LogicalOp::Or),
            2 => ("&&", LogicalOp::And),
            _ => return self.parse_binary(0),
        };

        let mut left = self.parse_logical(level + 1)?;
        while self.eat_punct(punct) {
            let right = self.parse_logical(level + 1)?;
            left = Expr::Logical {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_binary(&mut self, level: usize) -> ParseResult<Expr> {
        let Some(operators) = BINARY_LEVELS.get(level) else {
            return self.parse_unary();
        };

        let mut left = self.parse_binary(level + 1)?;
        loop {
            let op = match self.peek() {
                Some(Token::Punct(p)) if operators.contains(p) => BinaryOp::from_punct(p),
                _ => None,
            };
            let Some(op) = op else { break };
            self.pos += 1;
            let right = self.parse_binary(level + 1)?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> ParseResult<Expr> {
        let op = match self.peek() {
            Some(Token::Punct("!")) => Some(UnaryOp::Not),
            Some(Token::Punct("-")) => Some(UnaryOp::Neg),
            Some(Token::Punct("+")) => Some(UnaryOp::Plus),
            Some(Token::Ident(name)) if name == "typeof" => Some(UnaryOp::TypeOf),
            _ => None,
        };

        match op {
            Some(op) => {
                self.pos += 1;
                let operand = self.nested(Self::parse_unary)?;
                Ok(Expr::Unary {
                    op,
                    operand: Box::new(operand),
                })
            },
            None => self.parse_postfix(),
        }
    }

    fn parse_postfix(&mut self) -> ParseResult<Expr> {
        let mut expr = self.parse_primary()?;

        loop {
            if self.eat_punct(".") {
                let name = self.property_name()?;
                expr = member(expr, MemberKey::Static(name), false);
            } else if self.eat_punct("?.") {
                if self.eat_punct("(") {
                    let args = self.parse_arguments()?;
                    expr = call(expr, args, true);
                } else if self.eat_punct("[") {
                    let key = self.parse_assignment()?;
                    self.expect_punct("]")?;
                    expr = member(expr, MemberKey::Computed(Box::new(key)), true);
                } else {
                    let name = self.property_name()?;
                    expr = member(expr, MemberKey::Static(name), true);
                }
            } else if self.eat_punct("[") {
                let key = self.parse_assignment()?;
                self.expect_punct("]")?;
                expr = member(expr, MemberKey::Computed(Box::new(key)), false);
            } else if self.eat_punct("(") {
                let args = self.parse_arguments()?;
                expr = call(expr, args, false);
            } else {
                return Ok(expr);
            }
        }
    }

    /// Arguments after an opening `(`, through the closing `)`.
    fn parse_arguments(&mut self) -> ParseResult<Vec<Expr>> {
        let mut args = Vec::new();
        while !self.eat_punct(")") {
            args.push(self.parse_assignment()?);
            if !self.is_punct(")") {
                self.expect_punct(",")?;
            }
        }
        Ok(args)
    }

    fn parse_primary(&mut self) -> ParseResult<Expr> {
        let Some(token) = self.peek().cloned() else {
            return Err(self.unexpected());
        };

        match token {
            Token::Number(n) => {
                self.pos += 1;
                Ok(Expr::Number(n))
            },
            Token::Str(s) => {
                self.pos += 1;
                Ok(Expr::Str(s))
            },
            Token::Template(chunks) => {
                let offset = self.offset();
                self.pos += 1;
                compile_chunks(chunks, self.depth + 1)
                    .map(Expr::Template)
                    .map_err(|err| ParseError {
                        offset,
                        message: err.message,
                    })
            },
            Token::Ident(name) => self.parse_word(name),
            Token::Punct("(") => {
                self.pos += 1;
                let expr = self.parse_assignment()?;
                self.expect_punct(")")?;
                Ok(expr)
            },
            Token::Punct("[") => {
                self.pos += 1;
                let mut items = Vec::new();
                while !self.eat_punct("]") {
                    items.push(self.parse_assignment()?);
                    if !self.is_punct("]") {
                        self.expect_punct(",")?;
                    }
                }
                Ok(Expr::Array(items))
            },
            Token::Punct("{") => self.parse_object(),
            _ => Err(self.unexpected()),
        }
    }

    /// Literal words, `new`, or a variable reference.
    fn parse_word(&mut self, name: String) -> ParseResult<Expr> {
        let expr = match name.as_str() {
            "true" => Expr::Bool(true),
            "false" => Expr::Bool(false),
            "null" => Expr::Null,
            "undefined" => Expr::Undefined,
            "new" => {
                self.pos += 1;
                let name = self.binding_name()?;
                let args = if self.eat_punct("(") {
                    self.parse_arguments()?
                } else {
                    Vec::new()
                };
                return Ok(Expr::New { name, args });
            },
            word if KEYWORDS.contains(&word) => return Err(self.unexpected()),
            _ => Expr::Ident(name),
        };
        self.pos += 1;
        Ok(expr)
    }

    fn parse_object(&mut self) -> ParseResult<Expr> {
        self.expect_punct("{")?;
        let mut entries = Vec::new();

        while !self.eat_punct("}") {
            let (key, shorthand) = match self.peek().cloned() {
                Some(Token::Ident(name)) => (name, true),
                Some(Token::Str(s)) => (s, false),
                Some(Token::Number(n)) => (crate::value::format_number(n), false),
                _ => return Err(self.unexpected()),
            };
            self.pos += 1;

            let value = if self.eat_punct(":") {
                self.parse_assignment()?
            } else if shorthand && !KEYWORDS.contains(&key.as_str()) {
                Expr::Ident(key.clone())
            } else {
                return Err(self.unexpected());
            };
            entries.push((key, value));

            if !self.is_punct("}") {
                self.expect_punct(",")?;
            }
        }

        Ok(Expr::Object(entries))
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    /// `{ statements }`
    fn parse_block(&mut self) -> ParseResult<Vec<Stmt>> {
        self.expect_punct("{")?;
        let mut body = Vec::new();
        while !self.eat_punct("}") {
            if self.peek().is_none() {
                return Err(self.unexpected());
            }
            body.push(self.parse_statement()?);
        }
        Ok(body)
    }

    fn end_statement(&mut self) {
        self.eat_punct(";");
    }

    fn at_statement_end(&self) -> bool {
        self.peek().is_none() || self.is_punct(";") || self.is_punct("}")
    }

    fn parse_statement(&mut self) -> ParseResult<Stmt> {
        self.nested(Self::parse_statement_inner)
    }

    fn parse_statement_inner(&mut self) -> ParseResult<Stmt> {
        if self.is_punct("{") {
            return Ok(Stmt::Block(self.parse_block()?));
        }
        if self.eat_punct(";") {
            return Ok(Stmt::Empty);
        }

        if self.eat_keyword("const") || self.eat_keyword("let") || self.eat_keyword("var") {
            let name = self.binding_name()?;
            let init = if self.eat_punct("=") {
                Some(self.parse_assignment()?)
            } else {
                None
            };
            self.end_statement();
            return Ok(Stmt::Declare { name, init });
        }

        if self.eat_keyword("return") {
            let value = if self.at_statement_end() {
                None
            } else {
                Some(self.parse_assignment()?)
            };
            self.end_statement();
            return Ok(Stmt::Return(value));
        }

        if self.eat_keyword("if") {
            self.expect_punct("(")?;
            let test = self.parse_assignment()?;
            self.expect_punct(")")?;
            let then = Box::new(self.parse_statement()?);
            let otherwise = if self.eat_keyword("else") {
                Some(Box::new(self.parse_statement()?))
            } else {
                None
            };
            return Ok(Stmt::If {
                test,
                then,
                otherwise,
            });
        }

        if self.eat_keyword("switch") {
            return self.parse_switch();
        }

        if self.eat_keyword("break") {
            self.end_statement();
            return Ok(Stmt::Break);
        }

        if self.eat_keyword("throw") {
            let value = self.parse_assignment()?;
            self.end_statement();
            return Ok(Stmt::Throw(value));
        }

        let expr = self.parse_assignment()?;
        self.end_statement();
        Ok(Stmt::Expr(expr))
    }

    /// After `switch`: `(discriminant) { clauses }`
    fn parse_switch(&mut self) -> ParseResult<Stmt> {
        self.expect_punct("(")?;
        let discriminant = self.parse_assignment()?;
        self.expect_punct(")")?;
        self.expect_punct("{")?;

        let mut cases = Vec::new();
        while !self.eat_punct("}") {
            let test = if self.eat_keyword("case") {
                Some(self.parse_assignment()?)
            } else if self.eat_keyword("default") {
                None
            } else {
                return Err(self.unexpected());
            };
            self.expect_punct(":")?;

            let mut body = Vec::new();
            while !(self.is_keyword("case") || self.is_keyword("default") || self.is_punct("}")) {
                if self.peek().is_none() {
                    return Err(self.unexpected());
                }
                body.push(self.parse_statement()?);
            }
            cases.push(SwitchCase { test, body });
        }

        Ok(Stmt::Switch {
            discriminant,
            cases,
        })
    }
}

fn member(object: Expr, property: MemberKey, optional: bool) -> Expr {
    Expr::Member {
        object: Box::new(object),
        property,
        optional,
    }
}

fn call(callee: Expr, args: Vec<Expr>, optional: bool) -> Expr {
    Expr::Call {
        callee: Box::new(callee),
        args,
        optional,
    }
}
