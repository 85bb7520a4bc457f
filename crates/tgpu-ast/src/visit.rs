//! Read-only AST traversal
//!
//! Implementors override the `visit_*` hooks they care about and call the
//! matching `walk_*` function to keep descending. References handed to the
//! hooks live as long as the tree, so visitors may collect them.

use crate::*;

pub trait Visitor<'ast>: Sized {
    fn visit_stmt(&mut self, stmt: &'ast Stmt) {
        walk_stmt(self, stmt);
    }

    fn visit_expr(&mut self, expr: &'ast Expr) {
        walk_expr(self, expr);
    }

    fn visit_function(&mut self, function: &'ast Function) {
        walk_function(self, function);
    }

    fn visit_pattern(&mut self, pattern: &'ast Pattern) {
        walk_pattern(self, pattern);
    }

    fn visit_class(&mut self, class: &'ast Class) {
        walk_class(self, class);
    }
}

pub fn walk_program<'ast, V: Visitor<'ast>>(v: &mut V, program: &'ast Program) {
    for stmt in &program.body {
        v.visit_stmt(stmt);
    }
}

pub fn walk_block<'ast, V: Visitor<'ast>>(v: &mut V, block: &'ast Block) {
    for stmt in &block.statements {
        v.visit_stmt(stmt);
    }
}

pub fn walk_var_decl<'ast, V: Visitor<'ast>>(v: &mut V, decl: &'ast VarDecl) {
    for declarator in &decl.declarators {
        v.visit_pattern(&declarator.target);
        if let Some(init) = &declarator.init {
            v.visit_expr(init);
        }
    }
}

pub fn walk_stmt<'ast, V: Visitor<'ast>>(v: &mut V, stmt: &'ast Stmt) {
    match &stmt.kind {
        StmtKind::Expr(expr) | StmtKind::Throw(expr) => v.visit_expr(expr),
        StmtKind::VarDecl(decl) => walk_var_decl(v, decl),
        StmtKind::FnDecl(function) => v.visit_function(function),
        StmtKind::ClassDecl(class) => v.visit_class(class),
        StmtKind::Return(arg) => {
            if let Some(arg) = arg {
                v.visit_expr(arg);
            }
        }
        StmtKind::If {
            test,
            consequent,
            alternate,
        } => {
            v.visit_expr(test);
            v.visit_stmt(consequent);
            if let Some(alternate) = alternate {
                v.visit_stmt(alternate);
            }
        }
        StmtKind::For {
            init,
            test,
            update,
            body,
        } => {
            match init {
                Some(ForInit::VarDecl(decl)) => walk_var_decl(v, decl),
                Some(ForInit::Expr(expr)) => v.visit_expr(expr),
                None => {}
            }
            if let Some(test) = test {
                v.visit_expr(test);
            }
            if let Some(update) = update {
                v.visit_expr(update);
            }
            v.visit_stmt(body);
        }
        StmtKind::ForEach {
            left, right, body, ..
        } => {
            match left {
                ForHead::VarDecl(decl) => walk_var_decl(v, decl),
                ForHead::Target(expr) => v.visit_expr(expr),
            }
            v.visit_expr(right);
            v.visit_stmt(body);
        }
        StmtKind::While { test, body } | StmtKind::DoWhile { body, test } => {
            v.visit_expr(test);
            v.visit_stmt(body);
        }
        StmtKind::Block(block) => walk_block(v, block),
        StmtKind::Try {
            block,
            handler,
            finalizer,
        } => {
            walk_block(v, block);
            if let Some(handler) = handler {
                if let Some(param) = &handler.param {
                    v.visit_pattern(param);
                }
                walk_block(v, &handler.body);
            }
            if let Some(finalizer) = finalizer {
                walk_block(v, finalizer);
            }
        }
        StmtKind::Switch {
            discriminant,
            cases,
        } => {
            v.visit_expr(discriminant);
            for case in cases {
                if let Some(test) = &case.test {
                    v.visit_expr(test);
                }
                for stmt in &case.body {
                    v.visit_stmt(stmt);
                }
            }
        }
        StmtKind::Labeled { body, .. } => v.visit_stmt(body),
        StmtKind::Export(export) => match export {
            ExportDecl::Decl(stmt) | ExportDecl::DefaultDecl(stmt) => v.visit_stmt(stmt),
            ExportDecl::DefaultExpr(expr) => v.visit_expr(expr),
            ExportDecl::Named { .. } | ExportDecl::All { .. } => {}
        },
        StmtKind::Break(_)
        | StmtKind::Continue(_)
        | StmtKind::Empty
        | StmtKind::Import(_)
        | StmtKind::TsDecl => {}
    }
}

pub fn walk_prop_key<'ast, V: Visitor<'ast>>(v: &mut V, key: &'ast PropKey) {
    if let PropKeyKind::Computed(expr) = &key.kind {
        v.visit_expr(expr);
    }
}

pub fn walk_expr<'ast, V: Visitor<'ast>>(v: &mut V, expr: &'ast Expr) {
    match &expr.kind {
        ExprKind::Ident(_) | ExprKind::This | ExprKind::Literal(_) | ExprKind::MetaProperty(_) => {}
        ExprKind::Template { tag, exprs, .. } => {
            if let Some(tag) = tag {
                v.visit_expr(tag);
            }
            for expr in exprs {
                v.visit_expr(expr);
            }
        }
        ExprKind::Array(items) => {
            for item in items.iter().flatten() {
                v.visit_expr(item);
            }
        }
        ExprKind::Object(props) => {
            for prop in props {
                match &prop.kind {
                    PropKind::KeyValue { key, value } => {
                        walk_prop_key(v, key);
                        v.visit_expr(value);
                    }
                    PropKind::Shorthand { .. } => {}
                    PropKind::Method { key, function, .. } => {
                        walk_prop_key(v, key);
                        v.visit_function(function);
                    }
                    PropKind::Spread(expr) => v.visit_expr(expr),
                }
            }
        }
        ExprKind::Function(function) => v.visit_function(function),
        ExprKind::Class(class) => v.visit_class(class),
        ExprKind::Unary { arg, .. }
        | ExprKind::Update { arg, .. }
        | ExprKind::Spread(arg)
        | ExprKind::Await(arg)
        | ExprKind::TsCast(arg) => v.visit_expr(arg),
        ExprKind::Binary { left, right, .. } | ExprKind::Logical { left, right, .. } => {
            v.visit_expr(left);
            v.visit_expr(right);
        }
        ExprKind::Assign { target, value, .. } => {
            v.visit_expr(target);
            v.visit_expr(value);
        }
        ExprKind::Conditional {
            test,
            consequent,
            alternate,
        } => {
            v.visit_expr(test);
            v.visit_expr(consequent);
            v.visit_expr(alternate);
        }
        ExprKind::Call { callee, args, .. } | ExprKind::New { callee, args } => {
            v.visit_expr(callee);
            for arg in args {
                v.visit_expr(arg);
            }
        }
        ExprKind::Member {
            object, property, ..
        } => {
            v.visit_expr(object);
            if let MemberProp::Computed(index) = property {
                v.visit_expr(index);
            }
        }
        ExprKind::Sequence(exprs) => {
            for expr in exprs {
                v.visit_expr(expr);
            }
        }
        ExprKind::Yield { arg, .. } => {
            if let Some(arg) = arg {
                v.visit_expr(arg);
            }
        }
    }
}

pub fn walk_function<'ast, V: Visitor<'ast>>(v: &mut V, function: &'ast Function) {
    for param in &function.params {
        v.visit_pattern(&param.pattern);
    }
    match &function.body {
        FunctionBody::Block(block) => walk_block(v, block),
        FunctionBody::Expr(expr) => v.visit_expr(expr),
    }
}

pub fn walk_pattern<'ast, V: Visitor<'ast>>(v: &mut V, pattern: &'ast Pattern) {
    match &pattern.kind {
        PatternKind::Ident(_) => {}
        PatternKind::Object(props) => {
            for prop in props {
                match prop {
                    ObjectPatternProp::KeyValue { key, value, .. } => {
                        walk_prop_key(v, key);
                        v.visit_pattern(value);
                    }
                    ObjectPatternProp::Rest(rest) => v.visit_pattern(rest),
                }
            }
        }
        PatternKind::Array(items) => {
            for item in items.iter().flatten() {
                v.visit_pattern(item);
            }
        }
        PatternKind::Assign { target, default } => {
            v.visit_pattern(target);
            v.visit_expr(default);
        }
        PatternKind::Rest(inner) => v.visit_pattern(inner),
    }
}

pub fn walk_class<'ast, V: Visitor<'ast>>(v: &mut V, class: &'ast Class) {
    if let Some(super_class) = &class.super_class {
        v.visit_expr(super_class);
    }
    for member in &class.members {
        match &member.kind {
            ClassMemberKind::Method { key, function, .. } => {
                walk_prop_key(v, key);
                v.visit_function(function);
            }
            ClassMemberKind::Field { key, value } => {
                walk_prop_key(v, key);
                if let Some(value) = value {
                    v.visit_expr(value);
                }
            }
            ClassMemberKind::StaticBlock(block) => walk_block(v, block),
        }
    }
}
