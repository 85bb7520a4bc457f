//! Kernel lowering: free-variable capture analysis and translation of a
//! function's body into the tinyest IR

mod error;
pub mod free_vars;
mod lower;

pub use error::{Location, LowerError};
pub use free_vars::{free_variables, free_variables_of_expression, is_builtin, BUILTINS};
pub use lower::{lower, LowerOptions, UNNAMED};

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tgpu_ast::{ExprKind, Function, LineIndex, StmtKind};
    use tinyest::{KernelIr, NodeTag};

    fn function_of(source: &str) -> Function {
        let program = tgpu_parser::parse(source).expect("parses");
        match &program.body[0].kind {
            StmtKind::FnDecl(function) => function.clone(),
            StmtKind::VarDecl(decl) => decl.declarators[0]
                .init
                .as_ref()
                .and_then(|init| init.as_function())
                .cloned()
                .expect("function initializer"),
            StmtKind::Expr(expr) => match &expr.kind {
                ExprKind::Function(function) => (**function).clone(),
                _ => panic!("expected a function"),
            },
            other => panic!("unexpected statement {:?}", other),
        }
    }

    fn lower_at(source: &str, version: u32) -> Result<KernelIr, LowerError> {
        let index = LineIndex::new(source);
        let function = function_of(source);
        let options = LowerOptions::new("kernel.ts", &index)
            .with_version(version)
            .with_kernel_name(function.name_str());
        lower(&function, &options)
    }

    fn lower_src(source: &str) -> KernelIr {
        lower_at(source, tinyest::CURRENT_VERSION).expect("lowers")
    }

    #[test]
    fn test_add_kernel() {
        let ir = lower_src("function addGPU(a, b) { 'kernel'; return a + b; }");
        assert_eq!(
            ir.to_json(),
            json!({
                "v": 2,
                "params": [{"type": "i", "name": "a"}, {"type": "i", "name": "b"}],
                "body": [0, [[1, [100, "a", "+", "b"]]]],
                "externalNames": []
            })
        );
    }

    #[test]
    fn test_expression_arrow_gets_return_block() {
        let ir = lower_src("const f = (v) => v * scale;");
        assert_eq!(
            ir.body.to_json(),
            json!([0, [[1, [100, "v", "*", "scale"]]]])
        );
        assert_eq!(ir.external_names, vec!["scale"]);
    }

    #[test]
    fn test_statements() {
        let source = r#"
            function f(n) {
                let acc = 0, k;
                for (let i = 0; i < n; i++) {
                    if (i % 2 === 0) { continue; } else acc += i;
                }
                while (acc > 10) { acc -= 1; break; }
                return;
            }
        "#;
        let ir = lower_src(source);
        assert_eq!(
            ir.body.to_json(),
            json!([0, [
                [3, "acc", [112, "0"]],
                [3, "k"],
                [6, [3, "i", [112, "0"]], [100, "i", "<", "n"], [109, "++", "i"],
                    [0, [[2, [100, [100, "i", "%", [112, "2"]], "===", [112, "0"]], [0, [[8]]], [101, "acc", "+=", "i"]]]]],
                [7, [100, "acc", ">", [112, "10"]], [0, [[101, "acc", "-=", [112, "1"]], [9]]]],
                [1]
            ]])
        );
    }

    #[test]
    fn test_expressions() {
        let source = r#"
            function f(p) {
                return [p.x, p[0], -p.y, !flag, a && b, std.sin(1.0), { r: 1, g }, 'txt', `raw`, ++p.z, true];
            }
        "#;
        let ir = lower_src(source);
        assert_eq!(
            ir.body.to_json(),
            json!([0, [[1, [107, [
                [104, "p", "x"],
                [105, "p", [112, "0"]],
                [103, "-", [104, "p", "y"]],
                [103, "!", "flag"],
                [102, "a", "&&", "b"],
                [106, [104, "std", "sin"], [[112, "1.0"]]],
                [108, [["r", [112, "1"]], ["g", "g"]]],
                [111, "txt"],
                [111, "raw"],
                [110, "++", [104, "p", "z"]],
                true
            ]]]]])
        );
        assert_eq!(ir.external_names, vec!["flag", "a", "b", "std", "g"]);
    }

    #[test]
    fn test_destructured_params() {
        let ir = lower_src("function f({ pos, color: c }, idx: number) { return pos; }");
        assert_eq!(
            serde_json::to_value(&ir.params).expect("serializes"),
            json!([
                {"type": "d", "props": [{"name": "pos", "alias": "pos"}, {"name": "color", "alias": "c"}]},
                {"type": "i", "name": "idx"}
            ])
        );
    }

    #[test]
    fn test_version_two_constructs() {
        let source = "function f(p, xs) { for (const x of xs) {} return p.$ > 0 ? std.ref(p) : p; }";
        let ir = lower_src(source);
        assert_eq!(
            ir.body.to_json(),
            json!([0, [
                [10, [4, "x"], "xs", [0, []]],
                [1, [113, [100, [114, "p"], ">", [112, "0"]], [115, "p"], "p"]]
            ]])
        );
        assert!(ir.validate().is_ok());
    }

    #[test]
    fn test_newer_tag_rejected_for_old_version() {
        let err = lower_at("function f(a) {\n  return a ? 1 : 2;\n}", 1).expect_err("needs v2");
        assert_eq!(err.code(), "E-LOWER-002");
        match err {
            LowerError::TagNotInVersion { tag, location, .. } => {
                assert_eq!(tag, NodeTag::Conditional);
                assert_eq!(location.position.line, 1);
                assert_eq!(location.kernel, "f");
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_unknown_version() {
        let err = lower_at("function f() {}", 7).expect_err("unknown version");
        assert_eq!(err, LowerError::UnknownVersion(7));
        assert_eq!(err.code(), "E-LOWER-003");
    }

    #[test]
    fn test_unsupported_constructs() {
        let cases = [
            ("function f() { throw 1; }", "throw"),
            ("function f() { try {} catch (e) {} }", "try"),
            ("function f(x) { switch (x) {} }", "switch"),
            ("function f() { do {} while (1); }", "do-while"),
            ("function f(o) { for (const k in o) {} }", "for-in"),
            ("function f() { return null; }", "null"),
            ("function f() { return new V(); }", "new"),
            ("function f() { return () => 1; }", "nested function"),
            ("function f(x) { return typeof x; }", "typeof"),
            ("function f(...xs) { return xs; }", "rest parameter"),
            ("function f(x = 1) { return x; }", "default parameter"),
            ("function f() { const [a] = v; }", "destructuring declaration"),
            ("function f() { return `a${b}`; }", "template literal with substitutions"),
            ("function f() { return { [k]: 1 }; }", "computed object key"),
            ("function f() { return { m() {} }; }", "object method"),
            ("function f() { return (a, b); }", "sequence expression"),
            ("async function f() { await x; }", "async function"),
            ("function* f() { yield 1; }", "generator function"),
        ];
        for (source, construct) in cases {
            match lower_at(source, 2) {
                Err(LowerError::Unsupported {
                    construct: found,
                    location,
                }) => {
                    assert_eq!(found, construct, "for {}", source);
                    assert_eq!(location.file, "kernel.ts");
                }
                other => panic!("expected E-LOWER-001 for {}, got {:?}", source, other),
            }
        }
    }

    #[test]
    fn test_error_message_names_kernel_and_position() {
        let err = lower_at("function shade() {\n  'kernel';\n  throw err;\n}", 2).expect_err("throw");
        assert_eq!(
            err.to_string(),
            "unsupported construct `throw` in kernel \"shade\" at kernel.ts:3:3"
        );
    }

    #[test]
    fn test_lowering_leaves_function_untouched() {
        let function = function_of("function f(a) { 'kernel & js'; return a * 2; }");
        let before = function.clone();
        let index = LineIndex::new("");
        let _ = lower(&function, &LowerOptions::new("x.js", &index));
        assert_eq!(function, before);
    }
}
