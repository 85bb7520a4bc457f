//! Expression AST nodes

use serde::{Deserialize, Serialize};
use crate::{Class, Function, Span};

/// An expression
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// Strip TypeScript-only wrappers (`x as T`, `x!`, `x satisfies T`)
    pub fn unwrap_ts(&self) -> &Expr {
        match &self.kind {
            ExprKind::TsCast(inner) => inner.unwrap_ts(),
            _ => self,
        }
    }

    /// The identifier name if this is a plain identifier reference
    pub fn as_ident(&self) -> Option<&str> {
        match &self.unwrap_ts().kind {
            ExprKind::Ident(name) => Some(name),
            _ => None,
        }
    }

    /// The string value if this is a string literal
    pub fn as_str_lit(&self) -> Option<&str> {
        match &self.kind {
            ExprKind::Literal(Literal::String(value)) => Some(value),
            _ => None,
        }
    }

    /// The function node if this expression is a function or arrow
    pub fn as_function(&self) -> Option<&Function> {
        match &self.unwrap_ts().kind {
            ExprKind::Function(function) => Some(function),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExprKind {
    /// Identifier reference: `x`
    Ident(String),

    /// `this`
    This,

    /// Literal value: `42`, `'hello'`, `true`, `null`, `/re/g`
    Literal(Literal),

    /// Template literal, optionally tagged: `` tag`a${b}c` ``
    Template {
        tag: Option<Box<Expr>>,
        /// Cooked text of each quasi; always `exprs.len() + 1` entries
        quasis: Vec<String>,
        exprs: Vec<Expr>,
    },

    /// Array literal; `None` entries are holes: `[a, , b]`
    Array(Vec<Option<Expr>>),

    /// Object literal: `{ a, b: 1, ...c, m() {} }`
    Object(Vec<Prop>),

    /// Function expression or arrow function
    Function(Box<Function>),

    /// Class expression
    Class(Box<Class>),

    /// Unary operation: `-x`, `!x`, `typeof x`
    Unary {
        op: UnaryOp,
        arg: Box<Expr>,
    },

    /// Update: `i++`, `--i`
    Update {
        op: UpdateOp,
        prefix: bool,
        arg: Box<Expr>,
    },

    /// Binary operation: `a + b`, `a === b`
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },

    /// Short-circuiting operation: `a && b`, `a ?? b`
    Logical {
        op: LogicalOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },

    /// Assignment: `x = 1`, `a.b += 2`
    Assign {
        op: AssignOp,
        target: Box<Expr>,
        value: Box<Expr>,
    },

    /// Ternary: `a ? b : c`
    Conditional {
        test: Box<Expr>,
        consequent: Box<Expr>,
        alternate: Box<Expr>,
    },

    /// Function call: `f(a, b)`, `a?.(b)`
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
        optional: bool,
    },

    /// Constructor call: `new Foo(a)`
    New {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },

    /// Member access: `a.b`, `a[b]`, `a?.b`
    Member {
        object: Box<Expr>,
        property: MemberProp,
        optional: bool,
    },

    /// Comma expression: `a, b`
    Sequence(Vec<Expr>),

    /// Spread element in calls and array literals: `...xs`
    Spread(Box<Expr>),

    /// `await x`
    Await(Box<Expr>),

    /// `yield x`, `yield* x`
    Yield {
        arg: Option<Box<Expr>>,
        delegate: bool,
    },

    /// `import.meta`, `new.target`, or the `import` in `import(x)`
    MetaProperty(String),

    /// TypeScript-only wrapper that has no runtime effect: `x as T`, `x!`
    TsCast(Box<Expr>),
}

/// A literal value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    /// Numeric literal; `raw` preserves the source spelling (`1.0` vs `1`)
    Number { value: f64, raw: String },
    String(String),
    Bool(bool),
    Null,
    BigInt(String),
    Regex { pattern: String, flags: String },
}

/// Property of a member access
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MemberProp {
    /// `a.name`
    Ident { name: String, span: Span },
    /// `a.#name`
    Private { name: String, span: Span },
    /// `a[expr]`
    Computed(Box<Expr>),
}

impl MemberProp {
    /// The statically known property name, if any (`a.b`, `a['b']`)
    pub fn static_name(&self) -> Option<&str> {
        match self {
            MemberProp::Ident { name, .. } => Some(name),
            MemberProp::Computed(expr) => expr.as_str_lit(),
            MemberProp::Private { .. } => None,
        }
    }
}

/// Object literal member
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prop {
    pub kind: PropKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PropKind {
    /// `key: value`
    KeyValue { key: PropKey, value: Expr },
    /// `name` (shorthand for `name: name`)
    Shorthand { name: String, span: Span },
    /// `key() {}`, `get key() {}`, `set key(v) {}`
    Method {
        key: PropKey,
        kind: MethodKind,
        function: Function,
    },
    /// `...expr`
    Spread(Expr),
}

/// Property key in object literals and classes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropKey {
    pub kind: PropKeyKind,
    /// Covers the key as written, including brackets of computed keys
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PropKeyKind {
    Ident(String),
    String(String),
    Number(f64),
    Private(String),
    Computed(Box<Expr>),
}

impl PropKey {
    /// Statically known key name
    pub fn static_name(&self) -> Option<String> {
        match &self.kind {
            PropKeyKind::Ident(name) | PropKeyKind::String(name) => Some(name.clone()),
            PropKeyKind::Number(n) => Some(n.to_string()),
            PropKeyKind::Private(name) => Some(format!("#{}", name)),
            PropKeyKind::Computed(expr) => expr.as_str_lit().map(str::to_string),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MethodKind {
    Method,
    Getter,
    Setter,
    Constructor,
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    Neg,
    Plus,
    Not,
    BitNot,
    Typeof,
    Void,
    Delete,
}

impl UnaryOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnaryOp::Neg => "-",
            UnaryOp::Plus => "+",
            UnaryOp::Not => "!",
            UnaryOp::BitNot => "~",
            UnaryOp::Typeof => "typeof",
            UnaryOp::Void => "void",
            UnaryOp::Delete => "delete",
        }
    }

    pub fn from_str(op: &str) -> Option<Self> {
        Some(match op {
            "-" => UnaryOp::Neg,
            "+" => UnaryOp::Plus,
            "!" => UnaryOp::Not,
            "~" => UnaryOp::BitNot,
            "typeof" => UnaryOp::Typeof,
            "void" => UnaryOp::Void,
            "delete" => UnaryOp::Delete,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpdateOp {
    Inc,
    Dec,
}

impl UpdateOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            UpdateOp::Inc => "++",
            UpdateOp::Dec => "--",
        }
    }
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Exp,

    // Comparison
    EqEq,
    NotEq,
    EqEqEq,
    NotEqEq,
    Lt,
    Le,
    Gt,
    Ge,

    // Bitwise
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    UShr,

    // Relational keywords
    In,
    InstanceOf,
}

impl BinaryOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Exp => "**",
            BinaryOp::EqEq => "==",
            BinaryOp::NotEq => "!=",
            BinaryOp::EqEqEq => "===",
            BinaryOp::NotEqEq => "!==",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitOr => "|",
            BinaryOp::BitXor => "^",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::UShr => ">>>",
            BinaryOp::In => "in",
            BinaryOp::InstanceOf => "instanceof",
        }
    }

    pub fn from_str(op: &str) -> Option<Self> {
        Some(match op {
            "+" => BinaryOp::Add,
            "-" => BinaryOp::Sub,
            "*" => BinaryOp::Mul,
            "/" => BinaryOp::Div,
            "%" => BinaryOp::Mod,
            "**" => BinaryOp::Exp,
            "==" => BinaryOp::EqEq,
            "!=" => BinaryOp::NotEq,
            "===" => BinaryOp::EqEqEq,
            "!==" => BinaryOp::NotEqEq,
            "<" => BinaryOp::Lt,
            "<=" => BinaryOp::Le,
            ">" => BinaryOp::Gt,
            ">=" => BinaryOp::Ge,
            "&" => BinaryOp::BitAnd,
            "|" => BinaryOp::BitOr,
            "^" => BinaryOp::BitXor,
            "<<" => BinaryOp::Shl,
            ">>" => BinaryOp::Shr,
            ">>>" => BinaryOp::UShr,
            "in" => BinaryOp::In,
            "instanceof" => BinaryOp::InstanceOf,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogicalOp {
    And,
    Or,
    Nullish,
}

impl LogicalOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogicalOp::And => "&&",
            LogicalOp::Or => "||",
            LogicalOp::Nullish => "??",
        }
    }

    pub fn from_str(op: &str) -> Option<Self> {
        Some(match op {
            "&&" => LogicalOp::And,
            "||" => LogicalOp::Or,
            "??" => LogicalOp::Nullish,
            _ => return None,
        })
    }
}

/// Assignment operators; `Assign` is plain `=`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssignOp {
    Assign,
    /// Compound arithmetic/bitwise forms: `+=`, `<<=`, ...
    Compound(BinaryOp),
    /// Logical assignment forms: `&&=`, `||=`, `??=`
    Logical(LogicalOp),
}

impl AssignOp {
    pub fn as_str(&self) -> String {
        match self {
            AssignOp::Assign => "=".to_string(),
            AssignOp::Compound(op) => format!("{}=", op.as_str()),
            AssignOp::Logical(op) => format!("{}=", op.as_str()),
        }
    }

    pub fn from_str(op: &str) -> Option<Self> {
        if op == "=" {
            return Some(AssignOp::Assign);
        }
        let base = op.strip_suffix('=')?;
        if let Some(logical) = LogicalOp::from_str(base) {
            return Some(AssignOp::Logical(logical));
        }
        match BinaryOp::from_str(base)? {
            op @ (BinaryOp::Add
            | BinaryOp::Sub
            | BinaryOp::Mul
            | BinaryOp::Div
            | BinaryOp::Mod
            | BinaryOp::Exp
            | BinaryOp::Shl
            | BinaryOp::Shr
            | BinaryOp::UShr
            | BinaryOp::BitAnd
            | BinaryOp::BitOr
            | BinaryOp::BitXor) => Some(AssignOp::Compound(op)),
            _ => None,
        }
    }
}
