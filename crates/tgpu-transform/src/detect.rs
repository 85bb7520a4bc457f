//! Kernel site detection and naming
//!
//! A function is a kernel when it is the sole argument of a shell factory
//! call on the root namespace, or when its body starts with one of the
//! kernel directives.

use std::collections::HashSet;

use serde::Serialize;

use tgpu_ast::visit::{self, Visitor};
use tgpu_ast::{
    ClassMemberKind, Expr, ExprKind, ExportDecl, Function, MemberProp, MethodKind, Program,
    PropKind, Span, Stmt, StmtKind,
};

use crate::context::{member_path, FileContext};

/// Device only; calling on the host throws
pub const DIRECTIVE_KERNEL: &str = "kernel";
/// Device and host; the host runs an operator-rewritten copy
pub const DIRECTIVE_KERNEL_AND_JS: &str = "kernel & js";

/// Shell factories whose sole function argument is a kernel body
pub const SHELL_FACTORIES: &[&str] = &["fn", "vertexFn", "fragmentFn", "computeFn"];

/// Namespace segment that may sit between the root and a shell factory
pub const UNSTABLE_SEGMENT: &str = "~unstable";

/// Marker property of already spliced registrations
pub const META_GLOBAL: &str = "__TYPEGPU_META__";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum KernelKind {
    /// Argument of a shell factory call
    Shell,
    /// `'kernel'`
    DeviceOnly,
    /// `'kernel & js'`
    Dual,
}

impl KernelKind {
    pub fn from_directive(directive: &str) -> Option<Self> {
        match directive {
            DIRECTIVE_KERNEL => Some(KernelKind::DeviceOnly),
            DIRECTIVE_KERNEL_AND_JS => Some(KernelKind::Dual),
            _ => None,
        }
    }
}

/// Syntactic position of a kernel, which decides how it is spliced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SiteForm {
    /// Function or arrow in expression position
    Expression,
    /// `function f() {}`
    Declaration,
    /// `export function f() {}`
    ExportedDeclaration,
    /// `export default function f() {}`
    DefaultExportedDeclaration,
    /// `{ m() {} }`; `key_span` covers `m`
    ObjectMethod { key_span: Span },
}

#[derive(Debug, Clone)]
pub struct KernelSite<'ast> {
    pub function: &'ast Function,
    pub kind: KernelKind,
    pub form: SiteForm,
    pub name: Option<String>,
    /// Text range replaced by the splicer: the function itself for
    /// expressions, the whole statement for declarations, the property for
    /// methods
    pub span: Span,
}

#[derive(Debug, Default)]
pub struct Detection<'ast> {
    pub sites: Vec<KernelSite<'ast>>,
    /// Class members carrying a directive; classes are left untouched
    pub class_members: Vec<(Span, Option<String>)>,
    /// Spliced registrations from an earlier pass
    pub already_spliced: usize,
}

/// Find every kernel site in `program`, in source order
pub fn detect<'ast>(program: &'ast Program, ctx: &FileContext) -> Detection<'ast> {
    let mut finder = SiteFinder {
        ctx,
        detection: Detection::default(),
        recorded: HashSet::new(),
    };
    visit::walk_program(&mut finder, program);
    let mut detection = finder.detection;
    detection.sites.sort_by_key(|site| site.span.start);
    detection
}

pub fn directive_kind(function: &Function) -> Option<KernelKind> {
    function.directive().and_then(KernelKind::from_directive)
}

struct SiteFinder<'c, 'ast> {
    ctx: &'c FileContext,
    detection: Detection<'ast>,
    /// Function spans already recorded, so a shell argument with a directive
    /// is reported once
    recorded: HashSet<(usize, usize)>,
}

impl<'c, 'ast> SiteFinder<'c, 'ast> {
    fn record(&mut self, site: KernelSite<'ast>) {
        let key = (site.function.span.start, site.function.span.end);
        if self.recorded.insert(key) {
            log::trace!(
                "{}: {:?} kernel {} at {}",
                self.ctx.file_id,
                site.kind,
                site.name.as_deref().unwrap_or("<unnamed>"),
                site.span.start
            );
            self.detection.sites.push(site);
        }
    }

    /// Inspect an expression that sits where a name can be inferred from
    /// its surroundings (`const name = ...`, `{ name: ... }`, `a.name = ...`)
    fn inspect(&mut self, expr: &'ast Expr, name: Option<String>) {
        match &expr.kind {
            ExprKind::TsCast(inner) => self.inspect(inner, name),
            ExprKind::Function(function) => {
                if let Some(kind) = directive_kind(function) {
                    self.record(KernelSite {
                        function,
                        kind,
                        form: SiteForm::Expression,
                        name: name.or_else(|| function.name_str().map(str::to_string)),
                        span: expr.span,
                    });
                }
                self.visit_function(function);
            }
            ExprKind::Call { .. } if is_registration(expr) => {
                self.detection.already_spliced += 1;
            }
            ExprKind::Call { args, .. } => {
                if let Some(function) = self.shell_argument(expr) {
                    self.record(KernelSite {
                        function,
                        kind: KernelKind::Shell,
                        form: SiteForm::Expression,
                        name: name.or_else(|| function.name_str().map(str::to_string)),
                        span: args[0].span,
                    });
                }
                visit::walk_expr(self, expr);
            }
            _ => self.visit_expr(expr),
        }
    }

    /// The function passed to a shell factory call, if `call` is one:
    /// `ns.fn(...)(f)`, `ns.fn(...).does(f)` or `ns.fn(f)`
    fn shell_argument(&self, call: &'ast Expr) -> Option<&'ast Function> {
        let ExprKind::Call { callee, args, .. } = &call.kind else {
            return None;
        };
        let [arg] = args.as_slice() else {
            return None;
        };
        // Precompiled device code passes through untouched
        let function = arg.as_function()?;

        let callee = callee.unwrap_ts();
        let is_shell = match &callee.kind {
            // ns.fn(...)(f)
            ExprKind::Call { callee: inner, .. } => self.is_shell_factory(inner),
            ExprKind::Member {
                object, property, ..
            } => {
                let does = property.static_name() == Some("does")
                    && matches!(&object.unwrap_ts().kind, ExprKind::Call { callee: inner, .. } if self.is_shell_factory(inner));
                // ns.fn(...).does(f) or ns.fn(f)
                does || self.is_shell_factory(callee)
            }
            _ => false,
        };
        is_shell.then_some(function)
    }

    /// `ns.<shell>` or `ns['~unstable'].<shell>`
    fn is_shell_factory(&self, expr: &Expr) -> bool {
        let ExprKind::Member {
            object,
            property,
            optional: false,
        } = &expr.unwrap_ts().kind
        else {
            return false;
        };
        if !property
            .static_name()
            .is_some_and(|name| SHELL_FACTORIES.contains(&name))
        {
            return false;
        }
        if self.ctx.is_alias(object) {
            return true;
        }
        match &object.unwrap_ts().kind {
            ExprKind::Member {
                object: root,
                property,
                optional: false,
            } => property.static_name() == Some(UNSTABLE_SEGMENT) && self.ctx.is_alias(root),
            _ => false,
        }
    }

    fn declaration(&mut self, stmt: &'ast Stmt, function: &'ast Function, form: SiteForm) {
        if let Some(kind) = directive_kind(function) {
            self.record(KernelSite {
                function,
                kind,
                form,
                name: function.name_str().map(str::to_string),
                span: stmt.span,
            });
        }
        self.visit_function(function);
    }
}

impl<'c, 'ast> Visitor<'ast> for SiteFinder<'c, 'ast> {
    fn visit_stmt(&mut self, stmt: &'ast Stmt) {
        match &stmt.kind {
            StmtKind::FnDecl(function) => self.declaration(stmt, function, SiteForm::Declaration),
            StmtKind::Export(ExportDecl::Decl(inner)) => match &inner.kind {
                StmtKind::FnDecl(function) => {
                    self.declaration(stmt, function, SiteForm::ExportedDeclaration)
                }
                _ => self.visit_stmt(inner),
            },
            StmtKind::Export(ExportDecl::DefaultDecl(inner)) => match &inner.kind {
                StmtKind::FnDecl(function) => {
                    self.declaration(stmt, function, SiteForm::DefaultExportedDeclaration)
                }
                _ => self.visit_stmt(inner),
            },
            StmtKind::VarDecl(decl) => {
                for declarator in &decl.declarators {
                    self.visit_pattern(&declarator.target);
                    if let Some(init) = &declarator.init {
                        let name = declarator.target.as_ident().map(str::to_string);
                        self.inspect(init, name);
                    }
                }
            }
            _ => visit::walk_stmt(self, stmt),
        }
    }

    fn visit_expr(&mut self, expr: &'ast Expr) {
        match &expr.kind {
            ExprKind::Function(_) | ExprKind::Call { .. } | ExprKind::TsCast(_) => {
                self.inspect(expr, None)
            }
            ExprKind::Assign { target, value, .. } => {
                self.visit_expr(target);
                let name = match &target.unwrap_ts().kind {
                    ExprKind::Ident(name) => Some(name.clone()),
                    ExprKind::Member { property, .. } => property.static_name().map(str::to_string),
                    _ => None,
                };
                self.inspect(value, name);
            }
            ExprKind::Object(props) => {
                for prop in props {
                    match &prop.kind {
                        PropKind::KeyValue { key, value } => {
                            visit::walk_prop_key(self, key);
                            self.inspect(value, key.static_name());
                        }
                        PropKind::Method {
                            key,
                            kind: MethodKind::Method,
                            function,
                        } => {
                            visit::walk_prop_key(self, key);
                            if let Some(kind) = directive_kind(function) {
                                self.record(KernelSite {
                                    function,
                                    kind,
                                    form: SiteForm::ObjectMethod { key_span: key.span },
                                    name: key.static_name(),
                                    span: prop.span,
                                });
                            }
                            self.visit_function(function);
                        }
                        PropKind::Method { key, function, .. } => {
                            visit::walk_prop_key(self, key);
                            self.visit_function(function);
                        }
                        PropKind::Shorthand { .. } => {}
                        PropKind::Spread(expr) => self.visit_expr(expr),
                    }
                }
            }
            _ => visit::walk_expr(self, expr),
        }
    }

    fn visit_class(&mut self, class: &'ast tgpu_ast::Class) {
        for member in &class.members {
            if let ClassMemberKind::Method { key, function, .. } = &member.kind {
                if directive_kind(function).is_some() {
                    self.detection
                        .class_members
                        .push((member.span, key.static_name()));
                }
            }
        }
        visit::walk_class(self, class);
    }
}

/// `(globalThis.__TYPEGPU_META__ ??= new WeakMap()).set(...)`
fn is_registration(expr: &Expr) -> bool {
    let ExprKind::Call { callee, .. } = &expr.kind else {
        return false;
    };
    let ExprKind::Member {
        object,
        property: MemberProp::Ident { name, .. },
        ..
    } = &callee.kind
    else {
        return false;
    };
    if name != "set" {
        return false;
    }
    match &object.unwrap_ts().kind {
        ExprKind::Assign { target, .. } => {
            member_path(target).is_some_and(|path| path == format!("globalThis.{}", META_GLOBAL))
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sites(source: &str) -> Vec<(KernelKind, Option<String>, String)> {
        let program = tgpu_parser::parse(source).unwrap();
        let mut ctx = FileContext::new("test.ts", source);
        ctx.resolve_aliases(&program);
        detect(&program, &ctx)
            .sites
            .into_iter()
            .map(|site| (site.kind, site.name, site.span.slice(source).to_string()))
            .collect()
    }

    fn kinds(source: &str) -> Vec<(KernelKind, Option<String>)> {
        sites(source).into_iter().map(|(k, n, _)| (k, n)).collect()
    }

    #[test]
    fn test_shell_forms() {
        let source = r#"
            import tgpu from 'typegpu';
            const a = tgpu.fn([])((x) => x);
            const b = tgpu.fn([]).does(function (y) { return y; });
            const c = tgpu['~unstable'].computeFn({ workgroupSize: [1] })(() => {});
            const d = tgpu.vertexFn(() => {});
        "#;
        assert_eq!(
            kinds(source),
            vec![
                (KernelKind::Shell, Some("a".into())),
                (KernelKind::Shell, Some("b".into())),
                (KernelKind::Shell, Some("c".into())),
                (KernelKind::Shell, Some("d".into())),
            ]
        );
        assert_eq!(sites(source)[0].2, "(x) => x");
    }

    #[test]
    fn test_all_import_styles_detected() {
        for header in [
            "import tgpu from 'typegpu';\nconst k = tgpu",
            "import { tgpu as g } from 'typegpu';\nconst k = g",
            "import * as T from 'typegpu';\nconst k = T.tgpu",
        ] {
            let source = format!("{}.fragmentFn({{}})(() => {{}});", header);
            assert_eq!(kinds(&source), vec![(KernelKind::Shell, Some("k".into()))], "{}", source);
        }
    }

    #[test]
    fn test_non_alias_not_detected() {
        assert!(kinds("import tgpu from 'other';\nconst k = tgpu.fn([])(() => {});").is_empty());
        assert!(kinds("const k = lib.fn([])(() => {});").is_empty());
    }

    #[test]
    fn test_string_argument_is_skipped() {
        let source = "import tgpu from 'typegpu';\nconst k = tgpu.fn([])('fn main() {}');\nconst t = tgpu.fn([])(`code`);";
        assert!(kinds(source).is_empty());
    }

    #[test]
    fn test_directives() {
        let source = r#"
            function addGPU(a, b) { 'kernel & js'; return a + b; }
            export function gpuOnly() { 'kernel'; }
            export default function main() { 'kernel'; }
            const arrow = (v) => { 'kernel'; return v; };
            const obj = { method() { 'kernel & js'; }, prop: function () { 'kernel'; } };
            function notKernel() { 'use strict'; }
            const named = function inner() { 'kernel'; };
        "#;
        assert_eq!(
            kinds(source),
            vec![
                (KernelKind::Dual, Some("addGPU".into())),
                (KernelKind::DeviceOnly, Some("gpuOnly".into())),
                (KernelKind::DeviceOnly, Some("main".into())),
                (KernelKind::DeviceOnly, Some("arrow".into())),
                (KernelKind::Dual, Some("method".into())),
                (KernelKind::DeviceOnly, Some("prop".into())),
                (KernelKind::DeviceOnly, Some("named".into())),
            ]
        );
    }

    #[test]
    fn test_site_spans_per_form() {
        let source = "export function f() { 'kernel'; }\nconst o = { m(x) { 'kernel'; } };";
        let found = sites(source);
        assert_eq!(found[0].2, "export function f() { 'kernel'; }");
        assert_eq!(found[1].2, "m(x) { 'kernel'; }");
    }

    #[test]
    fn test_nested_and_anonymous() {
        let source = r#"
            register(function () { 'kernel'; });
            function outer() {
                return () => { 'kernel & js'; };
            }
            target.prop = () => { 'kernel'; };
        "#;
        assert_eq!(
            kinds(source),
            vec![
                (KernelKind::DeviceOnly, None),
                (KernelKind::Dual, None),
                (KernelKind::DeviceOnly, Some("prop".into())),
            ]
        );
    }

    #[test]
    fn test_shell_with_directive_reported_once() {
        let source = "import tgpu from 'typegpu';\nconst k = tgpu.fn([])(() => { 'kernel'; });";
        assert_eq!(kinds(source), vec![(KernelKind::Shell, Some("k".into()))]);
    }

    #[test]
    fn test_class_members_reported() {
        let source = "class C { run() { 'kernel'; } other() {} }";
        let program = tgpu_parser::parse(source).unwrap();
        let ctx = FileContext::new("test.ts", source);
        let detection = detect(&program, &ctx);
        assert!(detection.sites.is_empty());
        assert_eq!(detection.class_members.len(), 1);
        assert_eq!(detection.class_members[0].1.as_deref(), Some("run"));
    }

    #[test]
    fn test_spliced_registration_is_skipped() {
        let source = "const f = (($) => ((globalThis.__TYPEGPU_META__ ??= new WeakMap()).set($.f = (function f() { 'kernel & js'; }), { v: 2 }) && $.f))({});";
        let program = tgpu_parser::parse(source).unwrap();
        let ctx = FileContext::new("test.ts", source);
        let detection = detect(&program, &ctx);
        assert!(detection.sites.is_empty());
        assert_eq!(detection.already_spliced, 1);
    }
}
