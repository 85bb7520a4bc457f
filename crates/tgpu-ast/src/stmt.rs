//! Statement AST nodes

use serde::{Deserialize, Serialize};
use crate::{Class, Expr, ExprKind, Function, Ident, Literal, Pattern, Span};

/// A block of statements
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub statements: Vec<Stmt>,
    pub span: Span,
}

/// A statement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

impl Stmt {
    pub fn new(kind: StmtKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// The directive text if this is a bare string-literal expression
    /// statement. Parenthesized literals and literals spelled with escapes
    /// are not directives: the raw text must be exactly the quoted value.
    pub fn as_directive(&self) -> Option<&str> {
        match &self.kind {
            StmtKind::Expr(Expr {
                kind: ExprKind::Literal(Literal::String(value)),
                span,
            }) if span.start == self.span.start && span.len() == value.len() + 2 => Some(value),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StmtKind {
    /// Expression statement: `foo();`
    Expr(Expr),

    /// `let x = 1, y;`
    VarDecl(VarDecl),

    /// `function f() {}`
    FnDecl(Function),

    /// `class C {}`
    ClassDecl(Class),

    /// `return x;`
    Return(Option<Expr>),

    /// `if (test) a else b`
    If {
        test: Expr,
        consequent: Box<Stmt>,
        alternate: Option<Box<Stmt>>,
    },

    /// C-style `for (init; test; update) body`
    For {
        init: Option<ForInit>,
        test: Option<Expr>,
        update: Option<Expr>,
        body: Box<Stmt>,
    },

    /// `for (left in right)` / `for (left of right)`
    ForEach {
        kind: ForEachKind,
        left: ForHead,
        right: Expr,
        body: Box<Stmt>,
    },

    /// `while (test) body`
    While { test: Expr, body: Box<Stmt> },

    /// `do body while (test)`
    DoWhile { body: Box<Stmt>, test: Expr },

    Break(Option<Ident>),
    Continue(Option<Ident>),

    Block(Block),

    Empty,

    Throw(Expr),

    /// `try {} catch (e) {} finally {}`
    Try {
        block: Block,
        handler: Option<CatchClause>,
        finalizer: Option<Block>,
    },

    /// `switch (x) { case a: ... }`
    Switch {
        discriminant: Expr,
        cases: Vec<SwitchCase>,
    },

    /// `label: body`
    Labeled { label: Ident, body: Box<Stmt> },

    /// `import ... from '...'`
    Import(ImportDecl),

    /// Any `export` form
    Export(ExportDecl),

    /// TypeScript-only declaration (`type`, `interface`, `declare`, `enum`);
    /// carries no runtime semantics relevant to the pipeline
    TsDecl,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VarKind {
    Var,
    Let,
    Const,
}

impl VarKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            VarKind::Var => "var",
            VarKind::Let => "let",
            VarKind::Const => "const",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VarDecl {
    pub kind: VarKind,
    pub declarators: Vec<VarDeclarator>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VarDeclarator {
    pub target: Pattern,
    pub init: Option<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ForInit {
    VarDecl(VarDecl),
    Expr(Expr),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ForEachKind {
    In,
    Of,
    /// `for await (... of ...)`
    AwaitOf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ForHead {
    /// `for (const x of ...)`
    VarDecl(VarDecl),
    /// `for (x of ...)` with an existing binding or member target
    Target(Expr),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatchClause {
    pub param: Option<Pattern>,
    pub body: Block,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwitchCase {
    /// `None` for `default:`
    pub test: Option<Expr>,
    pub body: Vec<Stmt>,
    pub span: Span,
}

/// `import` declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportDecl {
    pub specifiers: Vec<ImportSpecifier>,
    pub source: String,
    /// `import type { ... }`
    pub type_only: bool,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ImportSpecifier {
    /// `import local from '...'`
    Default { local: Ident },
    /// `import * as local from '...'`
    Namespace { local: Ident },
    /// `import { imported as local } from '...'`
    Named {
        imported: String,
        local: Ident,
        type_only: bool,
    },
}

/// `export` declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExportDecl {
    /// `export const x = ...`, `export function f() {}`
    Decl(Box<Stmt>),
    /// `export { a, b as c } from '...'`
    Named {
        specifiers: Vec<ExportSpecifier>,
        source: Option<String>,
    },
    /// `export default function f() {}` / `export default class {}`
    DefaultDecl(Box<Stmt>),
    /// `export default expr`
    DefaultExpr(Expr),
    /// `export * from '...'`, `export * as ns from '...'`
    All {
        alias: Option<String>,
        source: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportSpecifier {
    pub local: Ident,
    pub exported: String,
}
