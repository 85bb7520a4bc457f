//! Free-variable analysis for kernel functions
//!
//! A name is free when it is referenced in the function but bound neither by
//! its parameters, nor by any declaration inside it, nor by the global
//! builtins below. `let`, `const` and `class` bindings count for their whole
//! containing block, ignoring the temporal dead zone.

use std::collections::HashSet;

use tgpu_ast::visit::{self, Visitor};
use tgpu_ast::{
    Block, Class, Expr, ExprKind, ExportDecl, ForHead, ForInit, Function, FunctionBody, Pattern,
    PropKind, Stmt, StmtKind, VarDecl, VarKind,
};

/// Globals that are never captured
pub const BUILTINS: &[&str] = &[
    "Math",
    "undefined",
    "NaN",
    "Infinity",
    "globalThis",
    "console",
    "Number",
    "Boolean",
    "String",
    "Array",
    "Object",
    "JSON",
    "Error",
    "isNaN",
    "isFinite",
    "parseInt",
    "parseFloat",
    "Symbol",
    "Date",
    "BigInt",
];

/// Pseudo-identifier reported for a captured `this`
pub const THIS: &str = "this";

pub fn is_builtin(name: &str) -> bool {
    BUILTINS.contains(&name)
}

/// Free variables of a declared function or method, in order of first
/// reference. Its own name is bound outside of it, so a recursive call
/// captures it.
pub fn free_variables(function: &Function) -> Vec<String> {
    let mut collector = FreeVarCollector::default();
    collector.enter_function(function, false);
    collector.found
}

/// Free variables of a function expression, whose name (if any) is bound
/// inside its own body
pub fn free_variables_of_expression(function: &Function) -> Vec<String> {
    let mut collector = FreeVarCollector::default();
    collector.enter_function(function, true);
    collector.found
}

#[derive(Default)]
struct FreeVarCollector {
    scopes: Vec<HashSet<String>>,
    /// Nesting depth of non-arrow functions below the analyzed one
    own_this_depth: usize,
    found: Vec<String>,
    seen: HashSet<String>,
}

impl FreeVarCollector {
    fn is_bound(&self, name: &str) -> bool {
        self.scopes.iter().rev().any(|scope| scope.contains(name))
    }

    fn reference(&mut self, name: &str) {
        if name == "super" || is_builtin(name) || self.is_bound(name) {
            return;
        }
        if self.seen.insert(name.to_string()) {
            self.found.push(name.to_string());
        }
    }

    fn enter_function(&mut self, function: &Function, binds_own_name: bool) {
        let mut scope = HashSet::new();
        if let Some(name) = function.name_str().filter(|_| binds_own_name) {
            scope.insert(name.to_string());
        }
        if !function.is_arrow {
            scope.insert("arguments".to_string());
        }
        for param in &function.params {
            scope.extend(param.pattern.bound_names());
        }
        if let FunctionBody::Block(block) = &function.body {
            hoisted_names(&block.statements, &mut scope);
            lexical_names(&block.statements, &mut scope);
        }
        self.scopes.push(scope);

        for param in &function.params {
            self.visit_pattern(&param.pattern);
        }
        match &function.body {
            FunctionBody::Block(block) => visit::walk_block(self, block),
            FunctionBody::Expr(expr) => self.visit_expr(expr),
        }

        self.scopes.pop();
    }

    fn nested_function(&mut self, function: &Function, binds_own_name: bool) {
        let owns_this = !function.is_arrow;
        if owns_this {
            self.own_this_depth += 1;
        }
        self.enter_function(function, binds_own_name);
        if owns_this {
            self.own_this_depth -= 1;
        }
    }

    fn with_scope(&mut self, names: HashSet<String>, f: impl FnOnce(&mut Self)) {
        self.scopes.push(names);
        f(self);
        self.scopes.pop();
    }

    fn visit_block_scoped(&mut self, block: &Block) {
        let mut names = HashSet::new();
        lexical_names(&block.statements, &mut names);
        self.with_scope(names, |this| visit::walk_block(this, block));
    }
}

impl<'ast> Visitor<'ast> for FreeVarCollector {
    fn visit_stmt(&mut self, stmt: &Stmt) {
        match &stmt.kind {
            StmtKind::Block(block) => self.visit_block_scoped(block),
            StmtKind::For { init, .. } => {
                let mut names = HashSet::new();
                if let Some(ForInit::VarDecl(decl)) = init {
                    declared_names(decl, &mut names);
                }
                self.with_scope(names, |this| visit::walk_stmt(this, stmt));
            }
            StmtKind::ForEach { left, .. } => {
                let mut names = HashSet::new();
                if let ForHead::VarDecl(decl) = left {
                    declared_names(decl, &mut names);
                }
                self.with_scope(names, |this| visit::walk_stmt(this, stmt));
            }
            StmtKind::Try {
                block,
                handler,
                finalizer,
            } => {
                self.visit_block_scoped(block);
                if let Some(handler) = handler {
                    let mut names: HashSet<String> = handler
                        .param
                        .as_ref()
                        .map(|param| param.bound_names().into_iter().collect())
                        .unwrap_or_default();
                    lexical_names(&handler.body.statements, &mut names);
                    self.with_scope(names, |this| {
                        if let Some(param) = &handler.param {
                            this.visit_pattern(param);
                        }
                        visit::walk_block(this, &handler.body);
                    });
                }
                if let Some(finalizer) = finalizer {
                    self.visit_block_scoped(finalizer);
                }
            }
            StmtKind::Switch { cases, .. } => {
                let mut names = HashSet::new();
                for case in cases {
                    lexical_names(&case.body, &mut names);
                }
                self.with_scope(names, |this| visit::walk_stmt(this, stmt));
            }
            _ => visit::walk_stmt(self, stmt),
        }
    }

    fn visit_expr(&mut self, expr: &Expr) {
        match &expr.kind {
            ExprKind::Ident(name) => self.reference(name),
            ExprKind::Function(function) => self.nested_function(function, true),
            ExprKind::This => {
                if self.own_this_depth == 0 {
                    self.reference(THIS);
                }
            }
            ExprKind::Object(props) => {
                for prop in props {
                    if let PropKind::Shorthand { name, .. } = &prop.kind {
                        self.reference(name);
                    }
                }
                visit::walk_expr(self, expr);
            }
            _ => visit::walk_expr(self, expr),
        }
    }

    fn visit_function(&mut self, function: &Function) {
        self.nested_function(function, false);
    }

    fn visit_class(&mut self, class: &Class) {
        let mut names = HashSet::new();
        if let Some(name) = &class.name {
            names.insert(name.name.clone());
        }
        // Field initializers see the instance as `this`
        self.own_this_depth += 1;
        self.with_scope(names, |this| visit::walk_class(this, class));
        self.own_this_depth -= 1;
    }

    fn visit_pattern(&mut self, pattern: &Pattern) {
        // Binding identifiers are not references; only defaults and
        // computed keys are walked
        visit::walk_pattern(self, pattern);
    }
}

fn declared_names(decl: &VarDecl, out: &mut HashSet<String>) {
    for declarator in &decl.declarators {
        out.extend(declarator.target.bound_names());
    }
}

/// `let`, `const`, `class` and function declarations directly in `stmts`
fn lexical_names(stmts: &[Stmt], out: &mut HashSet<String>) {
    for stmt in stmts {
        match &stmt.kind {
            StmtKind::VarDecl(decl) if decl.kind != VarKind::Var => declared_names(decl, out),
            StmtKind::ClassDecl(class) => {
                if let Some(name) = &class.name {
                    out.insert(name.name.clone());
                }
            }
            StmtKind::FnDecl(function) => {
                if let Some(name) = function.name_str() {
                    out.insert(name.to_string());
                }
            }
            _ => {}
        }
    }
}

/// `var` and function declarations anywhere in `stmts`, not descending into
/// nested functions
fn hoisted_names(stmts: &[Stmt], out: &mut HashSet<String>) {
    for stmt in stmts {
        hoisted_in_stmt(stmt, out);
    }
}

fn hoisted_in_stmt(stmt: &Stmt, out: &mut HashSet<String>) {
    match &stmt.kind {
        StmtKind::VarDecl(decl) if decl.kind == VarKind::Var => declared_names(decl, out),
        StmtKind::FnDecl(function) => {
            if let Some(name) = function.name_str() {
                out.insert(name.to_string());
            }
        }
        StmtKind::If {
            consequent,
            alternate,
            ..
        } => {
            hoisted_in_stmt(consequent, out);
            if let Some(alternate) = alternate {
                hoisted_in_stmt(alternate, out);
            }
        }
        StmtKind::For { init, body, .. } => {
            if let Some(ForInit::VarDecl(decl)) = init {
                if decl.kind == VarKind::Var {
                    declared_names(decl, out);
                }
            }
            hoisted_in_stmt(body, out);
        }
        StmtKind::ForEach { left, body, .. } => {
            if let ForHead::VarDecl(decl) = left {
                if decl.kind == VarKind::Var {
                    declared_names(decl, out);
                }
            }
            hoisted_in_stmt(body, out);
        }
        StmtKind::While { body, .. }
        | StmtKind::DoWhile { body, .. }
        | StmtKind::Labeled { body, .. } => hoisted_in_stmt(body, out),
        StmtKind::Block(block) => hoisted_names(&block.statements, out),
        StmtKind::Try {
            block,
            handler,
            finalizer,
        } => {
            hoisted_names(&block.statements, out);
            if let Some(handler) = handler {
                hoisted_names(&handler.body.statements, out);
            }
            if let Some(finalizer) = finalizer {
                hoisted_names(&finalizer.statements, out);
            }
        }
        StmtKind::Switch { cases, .. } => {
            for case in cases {
                hoisted_names(&case.body, out);
            }
        }
        StmtKind::Export(ExportDecl::Decl(inner)) => hoisted_in_stmt(inner, out),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn first_function(source: &str) -> Function {
        let program = tgpu_parser::parse(source).expect("parses");
        match &program.body[0].kind {
            StmtKind::FnDecl(function) => function.clone(),
            StmtKind::Expr(expr) => match &expr.kind {
                ExprKind::Function(function) => (**function).clone(),
                _ => panic!("expected a function expression"),
            },
            StmtKind::VarDecl(decl) => decl.declarators[0]
                .init
                .as_ref()
                .and_then(|init| init.as_function())
                .cloned()
                .expect("function initializer"),
            other => panic!("unexpected statement {:?}", other),
        }
    }

    fn free(source: &str) -> Vec<String> {
        free_variables(&first_function(source))
    }

    #[test]
    fn test_params_are_bound() {
        assert_eq!(free("function add(a, b) { return a + b; }"), Vec::<String>::new());
    }

    #[test]
    fn test_outer_reference_captured() {
        assert_eq!(free("const f = (v) => v * scale;"), vec!["scale"]);
    }

    #[test]
    fn test_member_chain_contributes_root_only() {
        assert_eq!(
            free("function f() { return std.sin(layout.bound.x) + obj[key]; }"),
            vec!["std", "layout", "obj", "key"]
        );
    }

    #[test]
    fn test_first_seen_order_and_dedup() {
        assert_eq!(free("function f() { b; a; b; c.d; a; }"), vec!["b", "a", "c"]);
    }

    #[test]
    fn test_builtins_excluded() {
        assert_eq!(
            free("function f(x) { return Math.max(x, Infinity) + undefined + NaN + g(x); }"),
            vec!["g"]
        );
    }

    #[test]
    fn test_local_bindings_shadow() {
        let source = r#"
            function f(p) {
                const a = 1;
                let b = a + outer;
                for (let i = 0; i < n; i++) { b += i; }
                for (const v of list) { b += v; }
                if (p) { var hoisted = 2; }
                try { risky(); } catch (e) { b = e; }
                return hoisted + b;
            }
        "#;
        assert_eq!(free(source), vec!["outer", "n", "list", "risky"]);
    }

    #[test]
    fn test_block_scoped_binding_does_not_leak() {
        let source = "function f() { { const inner = 1; } return inner; }";
        assert_eq!(free(source), vec!["inner"]);
    }

    #[test]
    fn test_let_is_block_wide() {
        // Referenced before its declaration, but still local
        assert_eq!(free("function f() { x = 1; let x; }"), Vec::<String>::new());
    }

    #[test]
    fn test_nested_function_scopes() {
        let source = r#"
            function f(a) {
                function helper(b) { return a + b + c; }
                const g = (d) => d + e;
                return helper(1) + g(2);
            }
        "#;
        assert_eq!(free(source), vec!["c", "e"]);
    }

    #[test]
    fn test_this_capture_rules() {
        assert_eq!(free("function f() { return this.x; }"), vec!["this"]);
        assert_eq!(
            free("function f() { const g = () => this.y; return g(); }"),
            vec!["this"]
        );
        assert_eq!(
            free("function f() { return function () { return this.z; }; }"),
            Vec::<String>::new()
        );
    }

    #[test]
    fn test_recursive_declaration_captures_own_name() {
        let source = "function fib(n) { 'kernel & js'; return fib(n - 1) + fib(n - 2); }";
        assert_eq!(free(source), vec!["fib"]);
    }

    #[test]
    fn test_named_expression_binds_own_name() {
        let function = first_function("const f = function loop(n) { return loop(n - 1) + f(n); };");
        assert_eq!(free_variables_of_expression(&function), vec!["f"]);
        assert_eq!(
            free("function outer() { return function inner() { return inner; }; }"),
            Vec::<String>::new()
        );
    }

    #[test]
    fn test_shorthand_property_is_a_reference() {
        assert_eq!(free("function f() { return { pos, v: 1 }; }"), vec!["pos"]);
    }

    #[test]
    fn test_destructured_params_and_defaults() {
        assert_eq!(
            free("function f({ a, b: c }, d = fallback) { return a + c + d; }"),
            vec!["fallback"]
        );
    }
}
