//! IR error types

use thiserror::Error;

use crate::NodeTag;

#[derive(Debug, Error, PartialEq)]
pub enum IrError {
    #[error("unknown node tag {0}")]
    UnknownTag(u64),

    #[error("malformed {node}: {reason}")]
    Malformed { node: String, reason: String },

    #[error("unsupported IR version {0}")]
    UnsupportedVersion(u32),

    #[error("{tag} requires IR version {since}, target is {version}")]
    TagNotInVersion {
        tag: NodeTag,
        since: u32,
        version: u32,
    },
}

impl IrError {
    pub fn code(&self) -> &'static str {
        match self {
            IrError::UnknownTag(_) => "E-IR-001",
            IrError::Malformed { .. } => "E-IR-002",
            IrError::UnsupportedVersion(_) => "E-IR-003",
            IrError::TagNotInVersion { .. } => "E-IR-004",
        }
    }

    pub(crate) fn malformed(node: impl Into<String>, reason: impl Into<String>) -> Self {
        IrError::Malformed {
            node: node.into(),
            reason: reason.into(),
        }
    }
}
