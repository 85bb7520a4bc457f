//! Operator rewriting for host copies of dual kernels
//!
//! `a + b` becomes `__tgpu_op.add(a, b)` and `x += y` becomes
//! `x = __tgpu_op.add(x, y)`, so that a runtime can dispatch on operand
//! types. The helper object falls back to plain JS semantics.

use tgpu_ast::visit::{self, Visitor};
use tgpu_ast::{AssignOp, BinaryOp, Expr, ExprKind, Function, Literal, MemberProp, Span};

use crate::magic_string::{join_pieces, Piece};

/// Local name of the helper object in emitted code
pub const OPERATOR_HELPER: &str = "__tgpu_op";
/// Global a runtime installs to take over operator dispatch
pub const OPERATORS_GLOBAL: &str = "__TYPEGPU_OPERATORS__";

/// Declaration of the helper object, injected at most once per file
pub fn prelude() -> String {
    format!(
        "const {} = globalThis.{} ?? {{ add: (a, b) => a + b, sub: (a, b) => a - b, mul: (a, b) => a * b, div: (a, b) => a / b, mod: (a, b) => a % b }};",
        OPERATOR_HELPER, OPERATORS_GLOBAL
    )
}

/// Whether `source` already declares the helper object
pub fn has_prelude(source: &str) -> bool {
    source.contains(&format!("const {} =", OPERATOR_HELPER))
}

pub fn helper_name(op: BinaryOp) -> Option<&'static str> {
    match op {
        BinaryOp::Add => Some("add"),
        BinaryOp::Sub => Some("sub"),
        BinaryOp::Mul => Some("mul"),
        BinaryOp::Div => Some("div"),
        BinaryOp::Mod => Some("mod"),
        _ => None,
    }
}

/// Host text of a function after rewriting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewrittenFunction {
    pub text: String,
    /// `text` as untouched source slices around each rewritten expression
    pub pieces: Vec<Piece>,
    pub rewrites: usize,
    /// Compound assignments left as plain JS because their target is not a
    /// simple identifier or member chain
    pub skipped: Vec<Span>,
}

/// Rewrite every overloadable operator inside `function`
pub fn rewrite_function(source: &str, function: &Function) -> RewrittenFunction {
    let mut rewriter = Rewriter {
        source,
        rewrites: 0,
        skipped: Vec::new(),
    };
    let mut top = Topmost::default();
    visit::walk_function(&mut top, function);
    rewriter.skipped.extend(top.skipped);
    let pieces = rewriter.pieces(function.span, top.found);
    RewrittenFunction {
        text: join_pieces(source, &pieces),
        pieces,
        rewrites: rewriter.rewrites,
        skipped: rewriter.skipped,
    }
}

enum Rewrite<'ast> {
    Binary {
        helper: &'static str,
        left: &'ast Expr,
        right: &'ast Expr,
    },
    Compound {
        helper: &'static str,
        target: &'ast Expr,
        value: &'ast Expr,
    },
}

/// Classify `expr`; `Err` marks a compound assignment with an unsafe target
fn classify(expr: &Expr) -> Result<Option<Rewrite<'_>>, Span> {
    match &expr.kind {
        ExprKind::Binary { op, left, right } => Ok(helper_name(*op).map(|helper| Rewrite::Binary {
            helper,
            left,
            right,
        })),
        ExprKind::Assign {
            op: AssignOp::Compound(op),
            target,
            value,
        } => match helper_name(*op) {
            Some(helper) if is_simple_target(target) => Ok(Some(Rewrite::Compound {
                helper,
                target,
                value,
            })),
            Some(_) => Err(expr.span),
            None => Ok(None),
        },
        _ => Ok(None),
    }
}

/// An identifier, `this`, or a member chain with static or literal keys
fn is_simple_target(expr: &Expr) -> bool {
    match &expr.unwrap_ts().kind {
        ExprKind::Ident(_) | ExprKind::This => true,
        ExprKind::Member {
            object,
            property,
            optional: false,
        } => {
            let static_key = match property {
                MemberProp::Ident { .. } | MemberProp::Private { .. } => true,
                MemberProp::Computed(key) => matches!(
                    key.kind,
                    ExprKind::Literal(Literal::String(_) | Literal::Number { .. })
                ),
            };
            static_key && is_simple_target(object)
        }
        _ => false,
    }
}

/// Outermost rewritable expressions of a subtree
#[derive(Default)]
struct Topmost<'ast> {
    found: Vec<&'ast Expr>,
    skipped: Vec<Span>,
}

impl<'ast> Visitor<'ast> for Topmost<'ast> {
    fn visit_expr(&mut self, expr: &'ast Expr) {
        match classify(expr) {
            Ok(Some(_)) => self.found.push(expr),
            Ok(None) => visit::walk_expr(self, expr),
            Err(span) => {
                self.skipped.push(span);
                visit::walk_expr(self, expr);
            }
        }
    }
}

struct Rewriter<'s> {
    source: &'s str,
    rewrites: usize,
    skipped: Vec<Span>,
}

impl<'s> Rewriter<'s> {
    fn pieces(&mut self, span: Span, mut nodes: Vec<&Expr>) -> Vec<Piece> {
        nodes.sort_by_key(|node| node.span.start);
        let mut pieces = Vec::with_capacity(nodes.len() * 2 + 1);
        let mut cursor = span.start;
        for node in nodes {
            pieces.push(Piece::Original {
                start: cursor,
                end: node.span.start,
            });
            let text = self.render(node);
            pieces.push(Piece::generated(text, Some(node.span.start)));
            cursor = node.span.end;
        }
        pieces.push(Piece::Original {
            start: cursor,
            end: span.end,
        });
        pieces
    }

    /// Text of `span` with each of `nodes` (all inside `span`) replaced by
    /// its rewritten form
    fn splice(&mut self, span: Span, mut nodes: Vec<&Expr>) -> String {
        nodes.sort_by_key(|node| node.span.start);
        let mut out = String::with_capacity(span.len());
        let mut cursor = span.start;
        for node in nodes {
            out.push_str(&self.source[cursor..node.span.start]);
            out.push_str(&self.render(node));
            cursor = node.span.end;
        }
        out.push_str(&self.source[cursor..span.end]);
        out
    }

    fn render(&mut self, expr: &Expr) -> String {
        match classify(expr) {
            Ok(Some(Rewrite::Binary {
                helper,
                left,
                right,
            })) => {
                self.rewrites += 1;
                let left = self.operand(left);
                let right = self.operand(right);
                format!("{}.{}({}, {})", OPERATOR_HELPER, helper, left, right)
            }
            Ok(Some(Rewrite::Compound {
                helper,
                target,
                value,
            })) => {
                self.rewrites += 1;
                let target = target.span.slice(self.source);
                let value = self.operand(value);
                format!("{} = {}.{}({}, {})", target, OPERATOR_HELPER, helper, target, value)
            }
            _ => self.operand(expr),
        }
    }

    /// Rewritten text of an operand, safe to use as a call argument
    fn operand(&mut self, expr: &Expr) -> String {
        let text = match classify(expr) {
            Ok(Some(_)) => return self.render(expr),
            Ok(None) | Err(_) => {
                let mut top = Topmost::default();
                visit::walk_expr(&mut top, expr);
                self.skipped.extend(top.skipped);
                self.splice(expr.span, top.found)
            }
        };
        if matches!(expr.kind, ExprKind::Sequence(_)) {
            format!("({})", text)
        } else {
            text
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tgpu_ast::StmtKind;

    fn rewrite(source: &str) -> RewrittenFunction {
        let program = tgpu_parser::parse(source).unwrap();
        let StmtKind::FnDecl(function) = &program.body[0].kind else {
            panic!("expected a function declaration");
        };
        rewrite_function(source, function)
    }

    #[test]
    fn test_binary_rewrite() {
        let result = rewrite("function f(a, b) { return a + b * 2; }");
        assert_eq!(
            result.text,
            "function f(a, b) { return __tgpu_op.add(a, __tgpu_op.mul(b, 2)); }"
        );
        assert_eq!(result.rewrites, 2);
    }

    #[test]
    fn test_pieces_keep_untouched_source() {
        let source = "function f(a, b) {\n  let c = a;\n  return c * b;\n}";
        let result = rewrite(source);
        assert_eq!(
            result.pieces,
            vec![
                Piece::Original { start: 0, end: 41 },
                Piece::generated("__tgpu_op.mul(c, b)", Some(41)),
                Piece::Original { start: 46, end: 49 },
            ]
        );
        assert_eq!(join_pieces(source, &result.pieces), result.text);
    }

    #[test]
    fn test_parenthesized_operands() {
        let result = rewrite("function f(a, b, c) { return (a - b) / c; }");
        assert_eq!(
            result.text,
            "function f(a, b, c) { return __tgpu_op.div(__tgpu_op.sub(a, b), c); }"
        );
    }

    #[test]
    fn test_non_overloadable_operators_kept() {
        let result = rewrite("function f(a, b) { return a ** 2 === b && a < (b % 3); }");
        assert_eq!(
            result.text,
            "function f(a, b) { return a ** 2 === b && a < (__tgpu_op.mod(b, 3)); }"
        );
    }

    #[test]
    fn test_compound_assignment() {
        let result = rewrite("function f(v) { let acc = 0; acc += v.x * 2; v['y'] -= 1; return acc; }");
        assert_eq!(
            result.text,
            "function f(v) { let acc = 0; acc = __tgpu_op.add(acc, __tgpu_op.mul(v.x, 2)); v['y'] = __tgpu_op.sub(v['y'], 1); return acc; }"
        );
        assert!(result.skipped.is_empty());
    }

    #[test]
    fn test_complex_compound_target_skipped() {
        let result = rewrite("function f(a) { get()[0] *= a + 1; }");
        assert_eq!(result.text, "function f(a) { get()[0] *= __tgpu_op.add(a, 1); }");
        assert_eq!(result.skipped.len(), 1);
    }

    #[test]
    fn test_rewrite_is_idempotent() {
        let first = rewrite("function f(a, b) { a += b; return a - b; }");
        let second = rewrite(&first.text);
        assert_eq!(second.text, first.text);
        assert_eq!(second.rewrites, 0);
    }

    #[test]
    fn test_nested_calls_and_members() {
        let result = rewrite("function f(p) { return g(p.x + 1)[i - 1].z; }");
        assert_eq!(
            result.text,
            "function f(p) { return g(__tgpu_op.add(p.x, 1))[__tgpu_op.sub(i, 1)].z; }"
        );
    }

    #[test]
    fn test_prelude_detection() {
        assert!(has_prelude(&prelude()));
        assert!(!has_prelude("const x = 1;"));
    }
}
