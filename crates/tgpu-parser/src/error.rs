//! Parser error types

use tgpu_ast::Span;
use tgpu_lexer::TokenKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("unexpected token: expected {expected}, found {found}")]
    UnexpectedToken {
        expected: String,
        found: String,
        span: Span,
    },

    #[error("invalid assignment target")]
    InvalidAssignmentTarget { span: Span },

    #[error("invalid binding pattern")]
    InvalidPattern { span: Span },

    #[error("malformed literal")]
    InvalidLiteral { span: Span },

    #[error("unsupported syntax: {what}")]
    Unsupported { what: String, span: Span },
}

impl ParseError {
    pub fn span(&self) -> Span {
        match self {
            ParseError::UnexpectedToken { span, .. } => *span,
            ParseError::InvalidAssignmentTarget { span } => *span,
            ParseError::InvalidPattern { span } => *span,
            ParseError::InvalidLiteral { span } => *span,
            ParseError::Unsupported { span, .. } => *span,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ParseError::UnexpectedToken { .. } => "E-PARSE-001",
            ParseError::InvalidAssignmentTarget { .. } => "E-PARSE-002",
            ParseError::InvalidPattern { .. } => "E-PARSE-003",
            ParseError::InvalidLiteral { .. } => "E-PARSE-004",
            ParseError::Unsupported { .. } => "E-PARSE-005",
        }
    }

    pub fn unexpected(expected: impl Into<String>, found: TokenKind, span: Span) -> Self {
        ParseError::UnexpectedToken {
            expected: expected.into(),
            found: found.describe().to_string(),
            span,
        }
    }
}
