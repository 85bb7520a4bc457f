//! Every fixture goes through every code-based backend. The backends must
//! agree on the emitted code, the output must evaluate on the host, and a
//! second pass must leave it alone.

mod common;

use std::fs;

use common::{evaluate, fixture_path, load_fixture, numbers};
use tgpu_host::Value;
use tgpu_transform::backend::{BunLoader, RollupPlugin, StandaloneTransform, WebpackLoader};
use tgpu_transform::Options;

const KERNEL_FIXTURES: [&str; 3] = ["shell_kernels.js", "dual_kernels.js", "aliased.js"];

fn standalone(code: &str, id: &str) -> Option<String> {
    StandaloneTransform::new(Options::default())
        .unwrap()
        .transform(code, id)
        .unwrap()
        .map(|output| output.code)
}

#[test]
fn e2e_fixtures_present() {
    let found: Vec<String> = fs::read_dir(fixture_path(""))
        .expect("Failed to read fixtures directory")
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| entry.file_name().to_str().map(str::to_string))
        .collect();
    for name in KERNEL_FIXTURES {
        assert!(found.iter().any(|f| f == name), "missing fixture {}", name);
    }
}

#[test]
fn e2e_backends_agree() {
    let rollup = RollupPlugin::new(Options::default()).unwrap();
    let webpack = WebpackLoader::new(Options::default()).unwrap();
    let bun = BunLoader::new(Options::default()).unwrap();

    for name in KERNEL_FIXTURES {
        let source = load_fixture(name);
        let id = format!("src/{}", name);
        let expected = standalone(&source, &id)
            .unwrap_or_else(|| panic!("{} should contain kernels", name));

        let from_rollup = rollup.transform(&source, &id, None).unwrap().unwrap();
        assert_eq!(from_rollup.code, expected, "rollup: {}", name);
        assert_eq!(from_rollup.map.sources, vec![id.clone()]);

        let from_webpack = webpack.load(&source, &id).unwrap();
        assert_eq!(from_webpack.code, expected, "webpack: {}", name);
        assert!(from_webpack.map.is_some());

        let from_bun = bun.on_load(&id, &source).unwrap().unwrap();
        assert!(from_bun.contents.starts_with(&expected), "bun: {}", name);
        assert!(from_bun
            .contents
            .contains("//# sourceMappingURL=data:application/json;charset=utf-8;base64,"));
        assert_eq!(from_bun.loader, "js");
    }
}

#[test]
fn e2e_fixtures_are_idempotent() {
    for name in KERNEL_FIXTURES {
        let id = format!("src/{}", name);
        let first = standalone(&load_fixture(name), &id).unwrap();
        assert_eq!(standalone(&first, &id), None, "second pass changed {}", name);
    }
}

#[test]
fn e2e_untouched_fixture() {
    let source = load_fixture("plain.js");
    assert_eq!(standalone(&source, "src/plain.js"), None);

    let loaded = WebpackLoader::new(Options::default())
        .unwrap()
        .load(&source, "src/plain.js")
        .unwrap();
    assert_eq!(loaded.code, source);
    assert!(loaded.map.is_none());
}

#[test]
fn e2e_shell_fixture_evaluates() {
    let code = standalone(&load_fixture("shell_kernels.js"), "src/shell_kernels.js").unwrap();
    let (mut interp, exports) = evaluate(&code);

    let amplify = exports.get("amplify");
    assert_eq!(interp.call(&amplify, numbers(&[2.5])).unwrap(), Value::Number(10.0));
    let externals = interp.meta(&amplify).unwrap().get("externals");
    assert_eq!(
        interp.call(&externals, vec![]).unwrap().to_json(),
        serde_json::json!({ "gain": 4 })
    );

    let clamp = exports.get("clampUnit");
    for (input, expected) in [(-1.0, 0.0), (0.25, 0.25), (3.0, 1.0)] {
        assert_eq!(interp.call(&clamp, numbers(&[input])).unwrap(), Value::Number(expected));
    }
    assert_eq!(interp.registry().len(), 2);
}

#[test]
fn e2e_dual_fixture_matches_original() {
    let source = load_fixture("dual_kernels.js");
    let code = standalone(&source, "src/dual_kernels.js").unwrap();
    let (mut before, original) = evaluate(&source);
    let (mut after, transformed) = evaluate(&code);

    let cases: [(&str, Vec<f64>); 2] = [("lerp", vec![2.0, 10.0, 0.25]), ("shifted", vec![3.0])];
    for (export, args) in cases {
        let expected = before.call(&original.get(export), numbers(&args)).unwrap();
        let actual = after.call(&transformed.get(export), numbers(&args)).unwrap();
        assert_eq!(actual, expected, "{}", export);
    }
    let half = transformed.get("ops").get("half");
    assert_eq!(after.call(&half, numbers(&[9.0])).unwrap(), Value::Number(4.5));
    assert_eq!(after.registry().len(), 3);
}

#[test]
fn e2e_aliased_fixture() {
    let code = standalone(&load_fixture("aliased.js"), "src/aliased.js").unwrap();
    let (mut interp, exports) = evaluate(&code);

    let pick = exports.get("pick");
    assert_eq!(interp.call(&pick, numbers(&[1.0])).unwrap(), Value::Number(3.0));
    assert!(interp.meta(&pick).is_some());

    let sample = exports.get("sample");
    let err = interp.call(&sample, numbers(&[0.0])).unwrap_err();
    assert!(err.thrown_message().unwrap().contains("\"sample\""));
    let externals = interp.meta(&sample).unwrap().get("externals");
    assert_eq!(
        interp.call(&externals, vec![]).unwrap().to_json(),
        serde_json::json!({ "offsets": [1, 2, 3] })
    );
}
