//! Lowering errors

use tgpu_ast::{LineCol, Span};
use thiserror::Error;
use tinyest::NodeTag;

/// Where a lowering error happened, for messages
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub file: String,
    pub kernel: String,
    pub position: LineCol,
    pub span: Span,
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "kernel \"{}\" at {}:{}", self.kernel, self.file, self.position)
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LowerError {
    /// E-LOWER-001: construct outside the kernel subset
    #[error("unsupported construct `{construct}` in {location}")]
    Unsupported { construct: String, location: Location },

    /// E-LOWER-002: the target IR version lacks a tag the kernel needs
    #[error("{tag} requires IR version {since} but the target is version {version}, in {location}")]
    TagNotInVersion {
        tag: NodeTag,
        since: u32,
        version: u32,
        location: Location,
    },

    /// E-LOWER-003
    #[error("unknown IR version {0}")]
    UnknownVersion(u32),
}

impl LowerError {
    pub fn span(&self) -> Span {
        match self {
            LowerError::Unsupported { location, .. } => location.span,
            LowerError::TagNotInVersion { location, .. } => location.span,
            LowerError::UnknownVersion(_) => Span::dummy(),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            LowerError::Unsupported { .. } => "E-LOWER-001",
            LowerError::TagNotInVersion { .. } => "E-LOWER-002",
            LowerError::UnknownVersion(_) => "E-LOWER-003",
        }
    }
}
