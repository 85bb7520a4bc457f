//! tgpu Parser - Recursive descent parser for JavaScript and TypeScript
//!
//! Produces the `tgpu-ast` node shapes with exact byte spans, which the
//! transform relies on for splicing. Key parsing challenges:
//! - arrow functions vs parenthesized expressions (speculative parse)
//! - TypeScript annotations, generics and declarations are skipped
//! - automatic semicolon insertion and restricted productions

mod error;
mod expr;
mod parser;
mod ts;

pub use error::*;
pub use parser::*;

use tgpu_ast::Program;
use tgpu_lexer::tokenize;

/// Parse a source string into a Program AST
pub fn parse(source: &str) -> Result<Program, ParseError> {
    let tokens = tokenize(source);
    let mut parser = Parser::new(source, tokens);
    parser.parse_program()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tgpu_ast::*;

    fn parse_ok(source: &str) -> Program {
        match parse(source) {
            Ok(program) => program,
            Err(err) => panic!("Failed to parse {:?}: {} at {:?}", source, err, err.span()),
        }
    }

    fn first_expr(program: &Program) -> &Expr {
        match &program.body[0].kind {
            StmtKind::Expr(expr) => expr,
            other => panic!("expected expression statement, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_imports() {
        let program = parse_ok(
            r#"
            import tgpu from 'typegpu';
            import { tgpu as t, type TgpuFn } from "typegpu";
            import * as T from 'typegpu';
            import type { Foo } from './foo';
            import './side-effect.css';
            "#,
        );
        let imports: Vec<&ImportDecl> = program.imports().collect();
        assert_eq!(imports.len(), 5);
        assert!(matches!(
            &imports[0].specifiers[0],
            ImportSpecifier::Default { local } if local.name == "tgpu"
        ));
        match &imports[1].specifiers[..] {
            [ImportSpecifier::Named { imported, local, type_only: false }, ImportSpecifier::Named { type_only: true, .. }] =>
            {
                assert_eq!(imported, "tgpu");
                assert_eq!(local.name, "t");
            }
            other => panic!("unexpected specifiers {:?}", other),
        }
        assert!(matches!(
            &imports[2].specifiers[0],
            ImportSpecifier::Namespace { local } if local.name == "T"
        ));
        assert!(imports[3].type_only);
        assert!(imports[4].specifiers.is_empty());
    }

    #[test]
    fn test_function_spans_are_exact() {
        let source = "const add = (a, b) => a + b;";
        let program = parse_ok(source);
        let StmtKind::VarDecl(decl) = &program.body[0].kind else {
            panic!("expected declaration");
        };
        let init = decl.declarators[0].init.as_ref().expect("init");
        assert_eq!(init.span.slice(source), "(a, b) => a + b");
        let function = init.as_function().expect("arrow");
        assert!(function.is_arrow);
        assert_eq!(function.params_span.slice(source), "(a, b)");
        assert_eq!(function.body.span().slice(source), "a + b");
    }

    #[test]
    fn test_directive_detection() {
        let program = parse_ok("function f(x) {\n  'kernel & js';\n  return x;\n}");
        let StmtKind::FnDecl(function) = &program.body[0].kind else {
            panic!("expected function");
        };
        assert_eq!(function.directive(), Some("kernel & js"));
        assert_eq!(function.name_str(), Some("f"));
    }

    #[test]
    fn test_directive_needs_plain_spelling() {
        for source in [
            "function f() { ('kernel'); }",
            "function f() { 'kern\\u0065l'; }",
        ] {
            let program = parse_ok(source);
            let StmtKind::FnDecl(function) = &program.body[0].kind else {
                panic!("expected function");
            };
            assert_eq!(function.directive(), None, "{}", source);
        }
        let program = parse_ok("function f() { \"kernel\" }");
        let StmtKind::FnDecl(function) = &program.body[0].kind else {
            panic!("expected function");
        };
        assert_eq!(function.directive(), Some("kernel"));
    }

    #[test]
    fn test_precedence() {
        let program = parse_ok("a + b * c ** d ** e - f;");
        let expr = first_expr(&program);
        let ExprKind::Binary { op: BinaryOp::Sub, left, .. } = &expr.kind else {
            panic!("expected subtraction at the root: {:?}", expr.kind);
        };
        let ExprKind::Binary { op: BinaryOp::Add, right, .. } = &left.kind else {
            panic!("expected addition");
        };
        let ExprKind::Binary { op: BinaryOp::Mul, right: pow, .. } = &right.kind else {
            panic!("expected multiplication");
        };
        // Right associative
        let ExprKind::Binary { op: BinaryOp::Exp, right: inner, .. } = &pow.kind else {
            panic!("expected exponent");
        };
        assert!(matches!(inner.kind, ExprKind::Binary { op: BinaryOp::Exp, .. }));
    }

    #[test]
    fn test_compound_assignment() {
        let program = parse_ok("x.y[0] += 2;");
        let expr = first_expr(&program);
        assert!(matches!(
            expr.kind,
            ExprKind::Assign {
                op: AssignOp::Compound(BinaryOp::Add),
                ..
            }
        ));
    }

    #[test]
    fn test_asi_and_return_restriction() {
        let program = parse_ok("function f() {\n  return\n  1\n}\nlet a = 1\nlet b = 2");
        assert_eq!(program.body.len(), 3);
        let StmtKind::FnDecl(function) = &program.body[0].kind else {
            panic!("expected function");
        };
        let FunctionBody::Block(block) = &function.body else {
            panic!("expected block body");
        };
        assert!(matches!(block.statements[0].kind, StmtKind::Return(None)));
    }

    #[test]
    fn test_typescript_is_skipped() {
        let source = r#"
            type Vec = { x: number; y: number };
            interface Props extends Base<T> {
                a?: string;
            }
            export type { Vec };
            const scale = (v: Vec, k: number = 2): Vec => ({ x: v.x * k, y: v.y * k }) as Vec;
            function id<T extends object>(value: T): T { return value!; }
            const n = load<number>(3) satisfies number;
            enum Color { Red, Green }
            declare const g: unique symbol;
        "#;
        let program = parse_ok(source);
        let runtime: Vec<&Stmt> = program
            .body
            .iter()
            .filter(|stmt| !matches!(stmt.kind, StmtKind::TsDecl))
            .collect();
        assert_eq!(runtime.len(), 3);
        let StmtKind::VarDecl(decl) = &runtime[0].kind else {
            panic!("expected declaration");
        };
        let init = decl.declarators[0].init.as_ref().expect("init");
        let function = init.as_function().expect("arrow");
        assert_eq!(function.params.len(), 2);
        assert_eq!(function.params[0].type_annotation.as_deref(), Some("Vec"));
    }

    #[test]
    fn test_shell_call_shapes() {
        let program = parse_ok(
            "const f = tgpu['~unstable'].computeFn({ workgroupSize: [1] })(() => { 'kernel'; });",
        );
        let StmtKind::VarDecl(decl) = &program.body[0].kind else {
            panic!("expected declaration");
        };
        let init = decl.declarators[0].init.as_ref().expect("init");
        let ExprKind::Call { callee, args, .. } = &init.kind else {
            panic!("expected call");
        };
        assert_eq!(args.len(), 1);
        assert!(args[0].as_function().is_some());
        let ExprKind::Call { callee: shell, .. } = &callee.kind else {
            panic!("expected builder call");
        };
        let ExprKind::Member { object, property, .. } = &shell.kind else {
            panic!("expected member");
        };
        assert_eq!(property.static_name(), Some("computeFn"));
        let ExprKind::Member { property, .. } = &object.kind else {
            panic!("expected computed member");
        };
        assert_eq!(property.static_name(), Some("~unstable"));
    }

    #[test]
    fn test_object_methods_and_getters() {
        let source = "const o = { m(a) { 'kernel'; return a; }, get g() { return 1; }, k: 1, s, ...rest };";
        let program = parse_ok(source);
        let StmtKind::VarDecl(decl) = &program.body[0].kind else {
            panic!("expected declaration");
        };
        let Some(Expr { kind: ExprKind::Object(props), .. }) = &decl.declarators[0].init else {
            panic!("expected object");
        };
        assert_eq!(props.len(), 5);
        match &props[0].kind {
            PropKind::Method { key, kind, function } => {
                assert_eq!(key.static_name().as_deref(), Some("m"));
                assert_eq!(*kind, MethodKind::Method);
                assert_eq!(function.directive(), Some("kernel"));
                assert_eq!(function.span.slice(source), "m(a) { 'kernel'; return a; }");
            }
            other => panic!("expected method, got {:?}", other),
        }
        assert!(matches!(
            &props[1].kind,
            PropKind::Method { kind: MethodKind::Getter, .. }
        ));
        assert!(matches!(&props[3].kind, PropKind::Shorthand { name, .. } if name == "s"));
        assert!(matches!(&props[4].kind, PropKind::Spread(_)));
    }

    #[test]
    fn test_template_substitutions_keep_source_spans() {
        let source = "const s = `a${x + 1}b`;";
        let program = parse_ok(source);
        let StmtKind::VarDecl(decl) = &program.body[0].kind else {
            panic!("expected declaration");
        };
        let Some(Expr { kind: ExprKind::Template { quasis, exprs, tag: None }, .. }) =
            &decl.declarators[0].init
        else {
            panic!("expected template");
        };
        assert_eq!(quasis, &vec!["a".to_string(), "b".to_string()]);
        assert_eq!(exprs[0].span.slice(source), "x + 1");
    }

    #[test]
    fn test_for_loops() {
        let program = parse_ok(
            "for (let i = 0; i < n; i++) {}\nfor (const v of list) {}\nfor (k in obj) {}",
        );
        assert!(matches!(program.body[0].kind, StmtKind::For { .. }));
        assert!(matches!(
            program.body[1].kind,
            StmtKind::ForEach { kind: ForEachKind::Of, left: ForHead::VarDecl(_), .. }
        ));
        assert!(matches!(
            program.body[2].kind,
            StmtKind::ForEach { kind: ForEachKind::In, left: ForHead::Target(_), .. }
        ));
    }

    #[test]
    fn test_exports() {
        let program = parse_ok(
            "export function a() {}\nexport default function b() {}\nexport const c = 1;\nexport { c as d };\nexport * from './x';",
        );
        assert!(matches!(
            &program.body[0].kind,
            StmtKind::Export(ExportDecl::Decl(stmt)) if matches!(stmt.kind, StmtKind::FnDecl(_))
        ));
        assert!(matches!(
            &program.body[1].kind,
            StmtKind::Export(ExportDecl::DefaultDecl(_))
        ));
        assert!(matches!(
            &program.body[3].kind,
            StmtKind::Export(ExportDecl::Named { specifiers, source: None }) if specifiers[0].exported == "d"
        ));
        assert!(matches!(
            &program.body[4].kind,
            StmtKind::Export(ExportDecl::All { alias: None, .. })
        ));
    }

    #[test]
    fn test_class_members() {
        let program = parse_ok(
            "class A extends B { static x = 1; #p; constructor(private y: number) { super(); } m() { 'kernel'; } }",
        );
        let StmtKind::ClassDecl(class) = &program.body[0].kind else {
            panic!("expected class");
        };
        assert_eq!(class.members.len(), 4);
        assert!(class.members[0].is_static);
        assert!(matches!(
            &class.members[2].kind,
            ClassMemberKind::Method { kind: MethodKind::Constructor, .. }
        ));
    }

    #[test]
    fn test_regex_and_division() {
        let program = parse_ok("const r = /a\\/b/g; const q = x / y / z;");
        let StmtKind::VarDecl(decl) = &program.body[0].kind else {
            panic!("expected declaration");
        };
        assert!(matches!(
            &decl.declarators[0].init,
            Some(Expr { kind: ExprKind::Literal(Literal::Regex { flags, .. }), .. }) if flags == "g"
        ));
    }

    #[test]
    fn test_jsx_is_rejected() {
        let err = parse("const el = <div>hi</div>;").unwrap_err();
        assert_eq!(err.code(), "E-PARSE-005");
    }

    #[test]
    fn test_optional_chaining_and_nullish() {
        let program = parse_ok("a?.b?.(c) ?? d;");
        let expr = first_expr(&program);
        assert!(matches!(
            expr.kind,
            ExprKind::Logical { op: LogicalOp::Nullish, .. }
        ));
    }

    #[test]
    fn test_destructured_params() {
        let program = parse_ok("function f({ a, b: c = 1 }, [d], ...e) {}");
        let StmtKind::FnDecl(function) = &program.body[0].kind else {
            panic!("expected function");
        };
        let names: Vec<String> = function
            .params
            .iter()
            .flat_map(|param| param.pattern.bound_names())
            .collect();
        assert_eq!(names, vec!["a", "c", "d", "e"]);
    }

    #[test]
    fn test_async_and_generators() {
        let program = parse_ok(
            "async function f() { await g(); }\nfunction* h() { yield 1; }\nconst k = async (x) => await x;",
        );
        let StmtKind::FnDecl(f) = &program.body[0].kind else {
            panic!("expected function");
        };
        assert!(f.is_async);
        let StmtKind::FnDecl(h) = &program.body[1].kind else {
            panic!("expected generator");
        };
        assert!(h.is_generator);
    }
}
