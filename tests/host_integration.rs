//! End-to-end tests: transform a module, evaluate the emitted code on the
//! host, and inspect what its kernels registered.

mod common;

use common::{evaluate, numbers, transform};
use serde_json::json;
use tgpu_host::{HostError, Value};
use tinyest::KernelIr;

#[test]
fn e2e_add_kernel_runs_and_registers() {
    let output = transform(
        "function addGPU(a, b) {\n  'kernel & js';\n  return a + b;\n}\nexport { addGPU };",
    );
    assert_eq!(output.kernels.len(), 1);
    assert!(output.kernels[0].ir.external_names.is_empty());

    let (mut interp, exports) = evaluate(&output.code);
    let add = exports.get("addGPU");
    assert_eq!(interp.call(&add, numbers(&[2.0, 3.0])).unwrap(), Value::Number(5.0));

    let meta = interp.meta(&add).expect("Expected addGPU to be registered");
    assert_eq!(meta.get("name"), Value::string("addGPU"));
    assert_eq!(meta.get("v"), Value::Number(2.0));
    assert_eq!(
        meta.get("ast").to_json(),
        json!({
            "v": 2,
            "params": [{"type": "i", "name": "a"}, {"type": "i", "name": "b"}],
            "body": [0, [[1, [100, "a", "+", "b"]]]],
            "externalNames": []
        })
    );
    let externals = interp.call(&meta.get("externals"), vec![]).unwrap();
    assert_eq!(externals.to_json(), json!({}));
    assert_eq!(interp.registry().len(), 1);
}

#[test]
fn e2e_externals_capture_outer_values() {
    let output = transform(
        "const scale = 2;\nexport const scaled = (x) => {\n  'kernel & js';\n  return x * scale;\n};",
    );
    assert_eq!(output.kernels[0].ir.external_names, vec!["scale"]);

    let (mut interp, exports) = evaluate(&output.code);
    let scaled = exports.get("scaled");
    assert_eq!(interp.call(&scaled, numbers(&[21.0])).unwrap(), Value::Number(42.0));

    let meta = interp.meta(&scaled).unwrap();
    assert_eq!(meta.get("name"), Value::string("scaled"));
    let externals = interp.call(&meta.get("externals"), vec![]).unwrap();
    assert_eq!(externals.to_json(), json!({ "scale": 2 }));
}

#[test]
fn e2e_device_only_kernel_throws_on_host() {
    let output = transform("export function shade(v) {\n  'kernel';\n  return v;\n}");
    let (mut interp, exports) = evaluate(&output.code);
    let shade = exports.get("shade");

    let err = interp.call(&shade, numbers(&[1.0])).unwrap_err();
    assert!(matches!(err, HostError::Thrown(_)));
    assert_eq!(
        err.thrown_message().as_deref(),
        Some("The function \"shade\" is executable only on the GPU. If you need to call it on the host, use the 'kernel & js' directive.")
    );

    // The IR still describes the real body
    let meta = interp.meta(&shade).unwrap();
    assert_eq!(meta.get("ast").get("body").to_json(), json!([0, [[1, "v"]]]));
}

#[test]
fn e2e_dual_kernel_matches_original() {
    let original = "export function poly(x, n) {\n\
                    \x20 'kernel & js';\n\
                    \x20 let acc = 0;\n\
                    \x20 for (let i = 0; i < n; i++) {\n\
                    \x20   acc += x * i - i / 2;\n\
                    \x20 }\n\
                    \x20 return acc % 7;\n\
                    }";
    let output = transform(original);
    assert!(output.code.contains("__tgpu_op."));

    let (mut before, before_exports) = evaluate(original);
    let (mut after, after_exports) = evaluate(&output.code);
    for (x, n) in [(1.0, 3.0), (2.5, 4.0), (-3.0, 5.0), (0.0, 0.0), (7.25, 10.0)] {
        let expected = before.call(&before_exports.get("poly"), numbers(&[x, n])).unwrap();
        let actual = after.call(&after_exports.get("poly"), numbers(&[x, n])).unwrap();
        assert_eq!(actual, expected, "poly({}, {})", x, n);
    }
    assert!(before.registry().is_empty());
    assert_eq!(after.registry().len(), 1);
}

#[test]
fn e2e_operator_overrides_reach_dual_kernels() {
    let output = transform("export function mix(a, b) {\n  'kernel & js';\n  return a * b + 1;\n}");
    let mut interp = common::host();
    let operators = tgpu_host::Obj::plain();
    operators.set(
        "mul",
        Value::Object(tgpu_host::Obj::native(|_, _, _| Ok(Value::string("vec")))),
    );
    operators.set(
        "add",
        Value::Object(tgpu_host::Obj::native(|_, _, args| {
            Ok(Value::string(&format!("{}+{}", args[0], args[1])))
        })),
    );
    interp.define_global("__TYPEGPU_OPERATORS__", Value::Object(operators));
    let exports = interp.run_module(&output.code).unwrap();
    let result = interp.call(&exports.get("mix"), numbers(&[2.0, 3.0])).unwrap();
    assert_eq!(result, Value::string("vec+1"));
}

#[test]
fn e2e_shell_kernel_with_autoname_hook() {
    let output = transform(
        "import tgpu from 'typegpu';\nexport const add = tgpu.fn([])((a, b) => a + b);",
    );
    let mut interp = common::host();
    interp.define_global(
        "__TYPEGPU_AUTONAME__",
        Value::Object(tgpu_host::Obj::native(|_, _, args| {
            let target = args.first().cloned().unwrap_or_default();
            if let (Some(obj), Some(name)) = (target.as_obj(), args.get(1)) {
                obj.set("$name", name.clone());
            }
            Ok(target)
        })),
    );
    let exports = interp.run_module(&output.code).unwrap();
    let add = exports.get("add");
    assert_eq!(add.get("$name"), Value::string("add"));
    assert_eq!(interp.call(&add, numbers(&[2.0, 3.0])).unwrap(), Value::Number(5.0));
    assert_eq!(interp.meta(&add).unwrap().get("name"), Value::string("add"));
}

#[test]
fn e2e_object_method_kernel() {
    let output = transform("export const ops = { inc(x) { 'kernel & js'; return x + 1; } };");
    let (mut interp, exports) = evaluate(&output.code);
    let inc = exports.get("ops").get("inc");
    assert_eq!(interp.call(&inc, numbers(&[41.0])).unwrap(), Value::Number(42.0));
    assert!(interp.meta(&inc).is_some());
}

#[test]
fn e2e_registered_ir_round_trips() {
    let output = transform(
        "const k = 3;\nexport function f(a) {\n  'kernel';\n  let b = a * k;\n  if (b > 10) { return b - 10; }\n  return b;\n}",
    );
    let (interp, exports) = evaluate(&output.code);
    let meta = interp.meta(&exports.get("f")).unwrap();
    let text = serde_json::to_string(&meta.get("ast").to_json()).unwrap();
    let decoded = KernelIr::from_json_str(&text).unwrap();
    assert_eq!(decoded, output.kernels[0].ir);
}

#[test]
fn e2e_second_pass_is_a_no_op() {
    let code = "import tgpu from 'typegpu';\n\
                const double = tgpu.fn([])((x) => x * 2);\n\
                export function twice(a) { 'kernel & js'; return double(a) + double(a); }";
    let first = transform(code);
    let second = tgpu_transform::Pipeline::new(tgpu_transform::Options::default())
        .unwrap()
        .transform(&first.code, "src/kernels.ts")
        .unwrap();
    assert!(second.is_none());

    let (mut interp, exports) = evaluate(&first.code);
    assert_eq!(
        interp.call(&exports.get("twice"), numbers(&[5.0])).unwrap(),
        Value::Number(20.0)
    );
    assert_eq!(interp.registry().len(), 2);
}

#[test]
fn e2e_documented_kernel_runs() {
    let output = transform(
        "/**\n * Adds two values\n */\nexport function addGPU(a, b) {\n  'kernel & js';\n  /* sum */\n  return a + b;\n}",
    );
    assert_eq!(output.kernels.len(), 1);
    let (mut interp, exports) = evaluate(&output.code);
    let add = exports.get("addGPU");
    assert_eq!(interp.call(&add, numbers(&[1.5, 2.0])).unwrap(), Value::Number(3.5));
    assert_eq!(interp.meta(&add).unwrap().get("name"), Value::string("addGPU"));
}

#[test]
fn e2e_recursive_kernel_sees_itself() {
    let output = transform(
        "export function fib(n) {\n  'kernel & js';\n  if (n < 2) {\n    return n;\n  }\n  return fib(n - 1) + fib(n - 2);\n}",
    );
    assert_eq!(output.kernels[0].ir.external_names, vec!["fib"]);
    let (mut interp, exports) = evaluate(&output.code);
    let fib = exports.get("fib");
    assert_eq!(interp.call(&fib, numbers(&[10.0])).unwrap(), Value::Number(55.0));
    let accessor = interp.meta(&fib).unwrap().get("externals");
    let externals = interp.call(&accessor, vec![]).unwrap();
    assert!(externals.get("fib").as_obj().is_some());
}
