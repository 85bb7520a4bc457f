//! Transform error types

use tgpu_ast::Span;
use tgpu_lower::LowerError;
use thiserror::Error;

/// Invalid adapter configuration, raised when an adapter is constructed
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid glob pattern `{pattern}`: {reason}")]
    InvalidGlob { pattern: String, reason: String },

    #[error("the {backend} backend cannot express the pattern `{pattern}`; use extension patterns such as `**/*.ts`")]
    UnsupportedPattern { backend: String, pattern: String },

    #[error("unsupported IR version {0}")]
    UnsupportedIrVersion(u32),

    #[error("invalid options: {0}")]
    InvalidOptions(String),
}

impl ConfigError {
    pub fn code(&self) -> &'static str {
        match self {
            ConfigError::InvalidGlob { .. } => "E-CONFIG-001",
            ConfigError::UnsupportedPattern { .. } => "E-CONFIG-002",
            ConfigError::UnsupportedIrVersion(_) => "E-CONFIG-003",
            ConfigError::InvalidOptions(_) => "E-CONFIG-004",
        }
    }
}

/// A host AST that does not fit the node-shape contract
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NormalizeError {
    #[error("unsupported {dialect} node type `{node_type}`")]
    UnknownNode {
        dialect: &'static str,
        node_type: String,
        span: Span,
    },

    #[error("{dialect} node `{node_type}` is missing field `{field}`")]
    MissingField {
        dialect: &'static str,
        node_type: String,
        field: String,
        span: Span,
    },

    #[error("{dialect} node `{node_type}` has an invalid `{field}`")]
    InvalidField {
        dialect: &'static str,
        node_type: String,
        field: String,
        span: Span,
    },
}

impl NormalizeError {
    pub fn span(&self) -> Span {
        match self {
            NormalizeError::UnknownNode { span, .. }
            | NormalizeError::MissingField { span, .. }
            | NormalizeError::InvalidField { span, .. } => *span,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            NormalizeError::UnknownNode { .. } => "E-NORM-001",
            NormalizeError::MissingField { .. } => "E-NORM-002",
            NormalizeError::InvalidField { .. } => "E-NORM-003",
        }
    }
}

/// Hard failure for one file
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransformError {
    #[error(transparent)]
    Lower(#[from] LowerError),

    #[error(transparent)]
    Normalize(#[from] NormalizeError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl TransformError {
    pub fn span(&self) -> Span {
        match self {
            TransformError::Lower(e) => e.span(),
            TransformError::Normalize(e) => e.span(),
            TransformError::Config(_) => Span::dummy(),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            TransformError::Lower(e) => e.code(),
            TransformError::Normalize(e) => e.code(),
            TransformError::Config(e) => e.code(),
        }
    }
}
