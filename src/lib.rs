//! tgpu-gen - build-time kernel extraction for TypeGPU
//!
//! This is the root workspace crate that hosts the end-to-end tests.
//! The implementation lives in the workspace member crates.

// Re-export main crates for convenience
pub use tgpu_ast as ast;
pub use tgpu_lower as lower;
pub use tgpu_parser as parser;
pub use tgpu_transform as transform;
pub use tinyest as ir;
