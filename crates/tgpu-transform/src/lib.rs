//! tgpu-transform: kernel extraction for host tools
//!
//! This crate finds the functions in a JS/TS module that are meant to run on
//! the GPU and rewrites the module so each of them is registered with its
//! lowered IR:
//! - Resolve the import aliases of the `typegpu` root namespace
//! - Detect kernel sites (shell calls and `'kernel'` directives)
//! - Lower each site and splice a registration wrapper in its place
//! - Rewrite overloadable operators in `'kernel & js'` functions
//! - Emit the patched code with a source map
//!
//! The [`backend`] module adapts the pipeline to Babel, Rollup/Vite,
//! webpack, Bun and plain single-file use.
//!
//! # Example
//!
//! ```ignore
//! use tgpu_transform::{Options, Pipeline};
//!
//! let pipeline = Pipeline::new(Options::default()).unwrap();
//! let output = pipeline
//!     .transform("const f = (a) => { 'kernel'; return a; };", "f.ts")
//!     .unwrap()
//!     .unwrap();
//! assert!(output.code.contains("__TYPEGPU_META__"));
//! ```
#![recursion_limit = "256"]

pub mod backend;
mod context;
mod detect;
mod diagnostics;
mod error;
pub mod glob;
mod magic_string;
pub mod normalize;
pub mod operators;
mod options;
mod pipeline;
mod prune;
pub mod sourcemap;
mod splice;

pub use context::{FileContext, PACKAGE_NAME};
pub use detect::{
    detect, Detection, KernelKind, KernelSite, SiteForm, DIRECTIVE_KERNEL, DIRECTIVE_KERNEL_AND_JS,
    META_GLOBAL,
};
pub use diagnostics::{Diagnostic, Diagnostics, Severity, W_CLASS, W_HOIST, W_OPERATOR, W_PARSE};
pub use error::{ConfigError, NormalizeError, TransformError};
pub use glob::{FileFilter, Glob};
pub use magic_string::{join_pieces, MagicString, Piece};
pub use options::{Enforce, Options, DEFAULT_INCLUDE};
pub use pipeline::{KernelReport, Outcome, Pipeline, TransformOutput};
pub use prune::may_contain_kernels;
pub use sourcemap::SourceMap;
pub use splice::{device_stub_body, AUTONAME_GLOBAL};
