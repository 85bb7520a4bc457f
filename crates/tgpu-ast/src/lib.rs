//! tgpu AST - the internal node-shape contract
//!
//! Every backend, whether it parses source itself or receives an ESTree or
//! Babel tree from its host, produces these types. The shared pipeline never
//! sees anything else.

mod span;
mod expr;
mod stmt;
mod function;
pub mod visit;

pub use span::*;
pub use expr::*;
pub use stmt::*;
pub use function::*;

use serde::{Deserialize, Serialize};

/// A complete JS/TS module
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    pub body: Vec<Stmt>,
    pub span: Span,
}

impl Program {
    /// Import declarations at module top level
    pub fn imports(&self) -> impl Iterator<Item = &ImportDecl> {
        self.body.iter().filter_map(|stmt| match &stmt.kind {
            StmtKind::Import(import) => Some(import),
            _ => None,
        })
    }
}
