//! tgpu-host: evaluator for emitted modules
//!
//! Runs the JavaScript the transform produces so kernels can be checked from
//! the host side:
//! - Evaluate a module against host-defined imports (`typegpu` and friends)
//! - Call exported functions with plain values
//! - Read back the `{ v, name, ast, externals }` record each kernel registers
//!
//! # Example
//!
//! ```ignore
//! use tgpu_host::{Interpreter, Value};
//!
//! let mut interp = Interpreter::new();
//! let exports = interp.run_module("export const add = (a, b) => a + b;")?;
//! let sum = interp.call(&exports.get("add"), vec![2.0.into(), 3.0.into()])?;
//! assert_eq!(sum, Value::Number(5.0));
//! ```

mod error;
mod interp;
mod registry;
mod value;

pub use error::HostError;
pub use interp::{Interpreter, DEFAULT_STEP_LIMIT, META_GLOBAL};
pub use registry::{FnHandle, MetaRegistry, WeakRegistry};
pub use value::{NativeFn, Obj, Value};
