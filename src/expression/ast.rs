//! Syntax tree for script expressions.

use std::sync::Arc;

/// Expression node.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Numeric literal
    Number(f64),
    /// String literal
    Str(String),
    /// `true` / `false`
    Bool(bool),
    /// `null`
    Null,
    /// `undefined`
    Undefined,
    /// Template literal, or a bare script string containing `${...}`
    Template(Vec<TemplatePart>),
    /// `[a, b, ...]`
    Array(Vec<Expr>),
    /// `{ key: value, shorthand }`
    Object(Vec<(String, Expr)>),
    /// Variable reference
    Ident(String),
    /// `object.key`, `object[key]`, `object?.key`
    Member {
        /// Receiver
        object: Box<Expr>,
        /// Property
        property: MemberKey,
        /// Short-circuits to `undefined` on a nullish receiver
        optional: bool,
    },
    /// `callee(args)` or `callee?.(args)`
    Call {
        /// Function expression
        callee: Box<Expr>,
        /// Arguments
        args: Vec<Expr>,
        /// Short-circuits to `undefined` on a nullish callee
        optional: bool,
    },
    /// `new Name(args)`; only `Error` is constructible
    New {
        /// Constructor name
        name: String,
        /// Arguments
        args: Vec<Expr>,
    },
    /// Prefix operator
    Unary {
        /// Operator
        op: UnaryOp,
        /// Operand
        operand: Box<Expr>,
    },
    /// Arithmetic, comparison or equality
    Binary {
        /// Operator
        op: BinaryOp,
        /// Left operand
        left: Box<Expr>,
        /// Right operand
        right: Box<Expr>,
    },
    /// `&&`, `||`, `??`
    Logical {
        /// Operator
        op: LogicalOp,
        /// Left operand
        left: Box<Expr>,
        /// Right operand, evaluated on demand
        right: Box<Expr>,
    },
    /// `test ? consequent : alternate`
    Conditional {
        /// Condition
        test: Box<Expr>,
        /// Value when truthy
        consequent: Box<Expr>,
        /// Value when falsy
        alternate: Box<Expr>,
    },
    /// `name = value` on a local binding
    Assign {
        /// Binding name
        name: String,
        /// New value
        value: Box<Expr>,
    },
    /// Arrow function
    Arrow(Arc<ArrowDef>),
}

/// Property of a member expression.
#[derive(Debug, Clone, PartialEq)]
pub enum MemberKey {
    /// `.name`
    Static(String),
    /// `[expr]`
    Computed(Box<Expr>),
}

/// Piece of a template.
#[derive(Debug, Clone, PartialEq)]
pub enum TemplatePart {
    /// Literal text
    Text(String),
    /// Substitution
    Expr(Expr),
}

/// Parameters and body of an arrow function.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrowDef {
    /// Parameter names
    pub params: Vec<String>,
    /// Body
    pub body: ArrowBody,
}

/// Arrow function body.
#[derive(Debug, Clone, PartialEq)]
pub enum ArrowBody {
    /// `=> expr`
    Expr(Box<Expr>),
    /// `=> { statements }`
    Block(Vec<Stmt>),
}

/// Statement inside an arrow function block.
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// `const` / `let` / `var` declaration
    Declare {
        /// Binding name
        name: String,
        /// Initializer (`undefined` when absent)
        init: Option<Expr>,
    },
    /// `return expr;`
    Return(Option<Expr>),
    /// `if (test) then else otherwise`
    If {
        /// Condition
        test: Expr,
        /// Taken branch
        then: Box<Stmt>,
        /// `else` branch
        otherwise: Option<Box<Stmt>>,
    },
    /// `switch (discriminant) { case ...: ... default: ... }`
    Switch {
        /// Switched value
        discriminant: Expr,
        /// Cases in source order
        cases: Vec<SwitchCase>,
    },
    /// `break;`
    Break,
    /// `throw expr;`
    Throw(Expr),
    /// `{ ... }`
    Block(Vec<Stmt>),
    /// Expression statement
    Expr(Expr),
    /// `;`
    Empty,
}

/// One `case` (or `default`) clause.
#[derive(Debug, Clone, PartialEq)]
pub struct SwitchCase {
    /// `None` for `default`
    pub test: Option<Expr>,
    /// Statements up to the next clause
    pub body: Vec<Stmt>,
}

/// Prefix operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// `!`
    Not,
    /// `-`
    Neg,
    /// `+`
    Plus,
    /// `typeof`
    TypeOf,
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `%`
    Rem,
    /// `<`
    Lt,
    /// `>`
    Gt,
    /// `<=`
    Le,
    /// `>=`
    Ge,
    /// `==`
    LooseEq,
    /// `!=`
    LooseNe,
    /// `===`
    StrictEq,
    /// `!==`
    StrictNe,
}

impl BinaryOp {
    /// Map a punctuator to its operator.
    pub fn from_punct(punct: &str) -> Option<Self> {
        Some(match punct {
            "+" => BinaryOp::Add,
            "-" => BinaryOp::Sub,
            "*" => BinaryOp::Mul,
            "/" => BinaryOp::Div,
            "%" => BinaryOp::Rem,
            "<" => BinaryOp::Lt,
            ">" => BinaryOp::Gt,
            "<=" => BinaryOp::Le,
            ">=" => BinaryOp::Ge,
            "==" => BinaryOp::LooseEq,
            "!=" => BinaryOp::LooseNe,
            "===" => BinaryOp::StrictEq,
            "!==" => BinaryOp::StrictNe,
            _ => return None,
        })
    }
}

/// Short-circuit operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    /// `&&`
    And,
    /// `||`
    Or,
    /// `??`
    Nullish,
}
