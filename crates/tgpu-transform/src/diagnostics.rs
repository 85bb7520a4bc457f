//! Warnings collected while transforming a file

use serde::Serialize;
use tgpu_ast::{LineCol, LineIndex, Span};

/// Reference to a binding before its declaration was turned into a `const`
pub const W_HOIST: &str = "W-HOIST-001";
/// Compound assignment whose target cannot be repeated safely
pub const W_OPERATOR: &str = "W-OP-001";
/// Directive on a class member
pub const W_CLASS: &str = "W-CLASS-001";
/// File could not be parsed and passes through unchanged
pub const W_PARSE: &str = "W-PARSE-001";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub code: &'static str,
    pub severity: Severity,
    pub message: String,
    pub file: String,
    #[serde(skip)]
    pub span: Span,
    /// Zero-based line and byte column of `span.start`
    pub position: LineCol,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}:{}: {}", self.code, self.file, self.position, self.message)
    }
}

/// Per-file diagnostics sink
#[derive(Debug, Default)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn warn(
        &mut self,
        code: &'static str,
        message: impl Into<String>,
        file: &str,
        span: Span,
        line_index: &LineIndex,
    ) {
        let diagnostic = Diagnostic {
            code,
            severity: Severity::Warning,
            message: message.into(),
            file: file.to_string(),
            span,
            position: line_index.line_col(span.start),
        };
        log::warn!("{}", diagnostic);
        self.items.push(diagnostic);
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.items
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_warning_position_and_display() {
        let source = "a\nbb\nccc";
        let index = LineIndex::new(source);
        let mut diagnostics = Diagnostics::new();
        diagnostics.warn(W_HOIST, "`f` is used before its definition", "main.ts", Span::new(5, 8), &index);
        let diagnostic = diagnostics.iter().next().unwrap();
        assert_eq!(diagnostic.position, LineCol { line: 2, column: 0 });
        assert_eq!(
            diagnostic.to_string(),
            "W-HOIST-001 main.ts:3:1: `f` is used before its definition"
        );
        assert_eq!(diagnostics.len(), 1);
    }
}
