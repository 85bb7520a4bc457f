//! Metadata splicing
//!
//! Every kernel is replaced by a single-line registration wrapper that stores
//! its IR in `globalThis.__TYPEGPU_META__` keyed by the function value and
//! evaluates to the function itself:
//!
//! ```text
//! (($) => ((globalThis.__TYPEGPU_META__ ??= new WeakMap()).set($.f = (FN), { v, name, ast, externals }) && $.f))({})
//! ```

use tgpu_ast::visit::{self, Visitor};
use tgpu_ast::{Expr, ExprKind, Function, Program, Span, Stmt, StmtKind, VarDecl};
use tgpu_lower::UNNAMED;
use tinyest::KernelIr;

use crate::context::FileContext;
use crate::detect::{KernelSite, SiteForm, META_GLOBAL};
use crate::magic_string::{MagicString, Piece};

/// Global a runtime installs to name resources after their bindings
pub const AUTONAME_GLOBAL: &str = "__TYPEGPU_AUTONAME__";

/// Body of the host copy of a device-only kernel
pub fn device_stub_body(name: Option<&str>) -> String {
    let message = format!(
        "The function \"{}\" is executable only on the GPU. If you need to call it on the host, use the 'kernel & js' directive.",
        name.unwrap_or(UNNAMED)
    );
    format!("{{ throw new Error({}); }}", js_string(&message))
}

/// Host copy of a device-only kernel: same head, throwing body
pub fn device_stub(site: &KernelSite<'_>) -> Vec<Piece> {
    let function = site.function;
    let body_start = function.body.span().start;
    function_pieces(
        site,
        vec![
            Piece::Original {
                start: function.span.start,
                end: body_start,
            },
            Piece::generated(device_stub_body(site.name.as_deref()), Some(body_start)),
        ],
    )
}

/// Function expression for a kernel whose host copy is `pieces`, covering
/// the source of the function node (or a rewrite of it)
pub fn function_pieces(site: &KernelSite<'_>, pieces: Vec<Piece>) -> Vec<Piece> {
    let SiteForm::ObjectMethod { .. } = site.form else {
        return pieces;
    };
    let function = site.function;
    // Method text starts at the key; the expression starts at the params
    let from = function.params_span.start;
    let mut out = vec![Piece::generated(
        format!("{} ", method_keyword(function)),
        Some(function.span.start),
    )];
    out.extend(pieces.into_iter().filter_map(|piece| match piece {
        Piece::Original { end, .. } if end <= from => None,
        Piece::Original { start, end } => Some(Piece::Original {
            start: start.max(from),
            end,
        }),
        Piece::Generated {
            origin: Some(origin),
            ..
        } if origin < from => None,
        generated => Some(generated),
    }));
    out
}

fn method_keyword(function: &Function) -> &'static str {
    match (function.is_async, function.is_generator) {
        (false, false) => "function",
        (true, false) => "async function",
        (false, true) => "function*",
        (true, true) => "async function*",
    }
}

/// `() => ({ a, b, this: this })`
pub fn externals_accessor(names: &[String]) -> String {
    if names.is_empty() {
        return "() => ({})".to_string();
    }
    let entries: Vec<String> = names
        .iter()
        .map(|name| {
            if name == tgpu_lower::free_vars::THIS {
                "this: this".to_string()
            } else {
                name.clone()
            }
        })
        .collect();
    format!("() => ({{ {} }})", entries.join(", "))
}

/// The registration wrapper around the host copy of a kernel
pub fn registration(function: Vec<Piece>, ir: &KernelIr, name: Option<&str>) -> Vec<Piece> {
    let name = name.map_or_else(|| "undefined".to_string(), js_string);
    let mut pieces = Vec::with_capacity(function.len() + 2);
    pieces.push(Piece::generated(
        format!("(($) => ((globalThis.{} ??= new WeakMap()).set($.f = (", META_GLOBAL),
        None,
    ));
    pieces.extend(function);
    pieces.push(Piece::generated(
        format!(
            "), {{ v: {v}, name: {name}, ast: {ast}, externals: {ext} }}) && $.f))({{}})",
            v = ir.v,
            name = name,
            ast = ir.to_json_string(),
            ext = externals_accessor(&ir.external_names),
        ),
        None,
    ));
    pieces
}

/// Replace the site with `wrapper`. Returns `false` when the site overlaps
/// an edit that was already made.
pub fn apply(buffer: &mut MagicString<'_>, site: &KernelSite<'_>, wrapper: Vec<Piece>) -> bool {
    let span = site.span;
    let at_start = |text: String| vec![Piece::generated(text, Some(span.start))];
    let (head, tail) = match (site.form, site.name.as_deref()) {
        (SiteForm::Expression, _) => (Vec::new(), String::new()),
        (SiteForm::Declaration, Some(name)) => (at_start(format!("const {} = ", name)), ";".to_string()),
        (SiteForm::ExportedDeclaration, Some(name)) => {
            (at_start(format!("export const {} = ", name)), ";".to_string())
        }
        (SiteForm::DefaultExportedDeclaration, Some(name)) => (
            at_start(format!("const {} = ", name)),
            format!("; export default {};", name),
        ),
        (SiteForm::DefaultExportedDeclaration, None) => {
            (at_start("export default ".to_string()), ";".to_string())
        }
        (SiteForm::ObjectMethod { key_span }, _) => (
            vec![
                Piece::Original {
                    start: key_span.start,
                    end: key_span.end,
                },
                Piece::generated(": ", None),
            ],
            String::new(),
        ),
        // Declarations always carry a name
        (SiteForm::Declaration | SiteForm::ExportedDeclaration, None) => return false,
    };
    let mut pieces = head;
    pieces.extend(wrapper);
    pieces.push(Piece::generated(tail, None));
    buffer.overwrite_pieces(span.start, span.end, pieces)
}

/// Identifier references to `name` that appear before `declaration` and
/// would hit the temporal dead zone once it becomes a `const`
pub fn early_references(program: &Program, name: &str, declaration: Span) -> Vec<Span> {
    struct Finder<'n> {
        name: &'n str,
        before: usize,
        found: Vec<Span>,
    }

    impl<'ast> Visitor<'ast> for Finder<'_> {
        fn visit_expr(&mut self, expr: &'ast Expr) {
            if expr.span.start >= self.before {
                return;
            }
            if let ExprKind::Ident(ident) = &expr.kind {
                if ident == self.name {
                    self.found.push(expr.span);
                }
            }
            visit::walk_expr(self, expr);
        }
    }

    let mut finder = Finder {
        name,
        before: declaration.start,
        found: Vec::new(),
    };
    visit::walk_program(&mut finder, program);
    finder.found
}

/// `const x = <call rooted at the namespace>` declarators, as the init
/// span and the bound name
pub fn autoname_targets(program: &Program, ctx: &FileContext) -> Vec<(Span, String)> {
    struct Finder<'c> {
        ctx: &'c FileContext,
        found: Vec<(Span, String)>,
    }

    impl Finder<'_> {
        fn declaration(&mut self, decl: &VarDecl) {
            for declarator in &decl.declarators {
                let (Some(name), Some(init)) = (declarator.target.as_ident(), &declarator.init)
                else {
                    continue;
                };
                if matches!(init.unwrap_ts().kind, ExprKind::Call { .. })
                    && self.ctx.is_rooted_at_alias(init)
                {
                    self.found.push((init.span, name.to_string()));
                }
            }
        }
    }

    impl<'ast> Visitor<'ast> for Finder<'_> {
        fn visit_stmt(&mut self, stmt: &'ast Stmt) {
            if let StmtKind::VarDecl(decl) = &stmt.kind {
                self.declaration(decl);
            }
            visit::walk_stmt(self, stmt);
        }
    }

    let mut finder = Finder {
        ctx,
        found: Vec::new(),
    };
    visit::walk_program(&mut finder, program);
    finder.found
}

/// Wrap every autoname target's init in the naming hook
pub fn apply_autonames(buffer: &mut MagicString<'_>, targets: &[(Span, String)]) {
    for (span, name) in targets {
        buffer.prepend(
            span.start,
            format!("(globalThis.{} ?? ((v) => v))(", AUTONAME_GLOBAL),
        );
        buffer.append(span.end, format!(", {})", js_string(name)));
    }
}

/// Offset at which file-level helpers are inserted: after the last
/// top-level import, else after the directive prologue, else the start
pub fn prelude_offset(program: &Program) -> usize {
    if let Some(last_import) = program
        .body
        .iter()
        .filter(|stmt| matches!(stmt.kind, StmtKind::Import(_)))
        .last()
    {
        return last_import.span.end;
    }
    program
        .body
        .iter()
        .take_while(|stmt| stmt.as_directive().is_some())
        .last()
        .map_or(0, |stmt| stmt.span.end)
}

pub fn js_string(text: &str) -> String {
    serde_json::Value::String(text.to_string()).to_string()
}
