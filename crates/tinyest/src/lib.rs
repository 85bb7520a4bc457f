//! tinyest: the kernel IR
//!
//! A closed, versioned table of node tags, a node model, and the compact
//! tagged-tuple JSON encoding embedded into emitted code.

mod error;
mod kernel;
mod node;
mod tags;

pub use error::IrError;
pub use kernel::{DestructuredProp, KernelIr, ParamDescriptor};
pub use node::{DeclKind, Expression, Statement};
pub use tags::{is_known_version, NodeTag, BASE_VERSION, CURRENT_VERSION};
