use std::fs;
use std::path::{Path, PathBuf};

use tgpu_host::{Interpreter, Obj, Value};
use tgpu_transform::{Options, Pipeline, TransformOutput};

/// Transform `code` with default options; panics if the file is untouched
pub fn transform(code: &str) -> TransformOutput {
    Pipeline::new(Options::default())
        .unwrap()
        .transform(code, "src/kernels.ts")
        .unwrap()
        .expect("Expected the file to be transformed")
}

/// A host with a minimal `typegpu` module: `tgpu.fn(...)` returns the
/// implementation it is given
pub fn host() -> Interpreter {
    let mut interp = Interpreter::new();
    let tgpu = Obj::plain();
    tgpu.set(
        "fn",
        Value::Object(Obj::native(|_, _, _| {
            Ok(Value::Object(Obj::native(|_, _, args| {
                Ok(args.into_iter().next().unwrap_or_default())
            })))
        })),
    );
    let module = Obj::plain();
    module.set("default", Value::Object(tgpu.clone()));
    module.set("tgpu", Value::Object(tgpu));
    interp.define_module("typegpu", module);
    interp
}

/// Evaluate `code` in a fresh host and return it with the module's exports
pub fn evaluate(code: &str) -> (Interpreter, Obj) {
    let mut interp = host();
    let exports = interp
        .run_module(code)
        .unwrap_or_else(|e| panic!("Failed to evaluate [{}] {}:\n{}", e.code(), e, code));
    (interp, exports)
}

pub fn numbers(values: &[f64]) -> Vec<Value> {
    values.iter().copied().map(Value::Number).collect()
}

/// Load a test fixture from tests/fixtures/
pub fn load_fixture(name: &str) -> String {
    fs::read_to_string(fixture_path(name))
        .unwrap_or_else(|e| panic!("Failed to load fixture {}: {}", name, e))
}

pub fn fixture_path(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}
