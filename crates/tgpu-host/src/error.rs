//! Host evaluation errors

use tgpu_ast::Span;
use tgpu_parser::ParseError;
use thiserror::Error;

use crate::value::Value;

#[derive(Debug, Error)]
pub enum HostError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// A value thrown by the evaluated code and not caught
    #[error("uncaught {0}")]
    Thrown(Value),

    #[error("{name} is not defined")]
    Reference { name: String, span: Span },

    #[error("type error: {message}")]
    Type { message: String, span: Span },

    #[error("`{construct}` is not supported by the host evaluator")]
    Unsupported { construct: String, span: Span },

    #[error("module `{0}` is not defined")]
    UnknownModule(String),

    #[error("evaluation exceeded {0} steps")]
    StepLimit(usize),
}

impl HostError {
    pub fn span(&self) -> Span {
        match self {
            HostError::Parse(e) => e.span(),
            HostError::Reference { span, .. }
            | HostError::Type { span, .. }
            | HostError::Unsupported { span, .. } => *span,
            HostError::Thrown(_) | HostError::UnknownModule(_) | HostError::StepLimit(_) => {
                Span::dummy()
            }
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            HostError::Parse(e) => e.code(),
            HostError::Thrown(_) => "E-HOST-001",
            HostError::Reference { .. } => "E-HOST-002",
            HostError::Type { .. } => "E-HOST-003",
            HostError::Unsupported { .. } => "E-HOST-004",
            HostError::UnknownModule(_) => "E-HOST-005",
            HostError::StepLimit(_) => "E-HOST-006",
        }
    }

    /// `message` of a thrown error object
    pub fn thrown_message(&self) -> Option<String> {
        match self {
            HostError::Thrown(value) => match value.get("message") {
                Value::String(message) => Some(message.to_string()),
                _ => None,
            },
            _ => None,
        }
    }

    pub(crate) fn type_error(message: impl Into<String>, span: Span) -> Self {
        HostError::Type {
            message: message.into(),
            span,
        }
    }

    pub(crate) fn unsupported(construct: impl Into<String>, span: Span) -> Self {
        HostError::Unsupported {
            construct: construct.into(),
            span,
        }
    }
}
