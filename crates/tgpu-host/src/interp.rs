//! Tree-walking evaluator for the JavaScript the transform emits
//!
//! Covers the module-level subset the emitted code and its tests need:
//! bindings and destructuring, closures, control flow, exceptions, object
//! and array literals, imports from host-defined modules, and the globals
//! the registration wrapper touches (`globalThis`, `WeakMap`, `Error`,
//! `Math`).

use std::cell::{Ref, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use tgpu_ast::*;

use crate::registry::{FnHandle, MetaRegistry, SharedRegistry, WeakRegistry};
use crate::value::{format_number, Callable, Obj, ObjectKind, Value};
use crate::HostError;

type Result<T> = std::result::Result<T, HostError>;

pub const DEFAULT_STEP_LIMIT: usize = 1_000_000;

/// Global the emitted registration wrapper stores metadata in
pub const META_GLOBAL: &str = "__TYPEGPU_META__";

/// Scope slot holding the receiver; not a valid identifier
const THIS: &str = "this";

pub(crate) type Env = Rc<RefCell<Scope>>;

#[derive(Default)]
pub(crate) struct Scope {
    vars: HashMap<String, Value>,
    parent: Option<Env>,
}

fn child(parent: &Env) -> Env {
    Rc::new(RefCell::new(Scope {
        vars: HashMap::new(),
        parent: Some(parent.clone()),
    }))
}

fn declare(env: &Env, name: &str, value: Value) {
    env.borrow_mut().vars.insert(name.to_string(), value);
}

fn find(env: &Env, name: &str) -> Option<Value> {
    let mut current = Some(env.clone());
    while let Some(scope) = current {
        let scope = scope.borrow();
        if let Some(value) = scope.vars.get(name) {
            return Some(value.clone());
        }
        current = scope.parent.clone();
    }
    None
}

fn assign(env: &Env, name: &str, value: Value) -> bool {
    let mut current = Some(env.clone());
    while let Some(scope) = current {
        let mut scope = scope.borrow_mut();
        if let Some(slot) = scope.vars.get_mut(name) {
            *slot = value;
            return true;
        }
        current = scope.parent.clone();
    }
    false
}

/// Completion of a statement
enum Flow {
    Normal,
    Return(Value),
    Break(Option<String>),
    Continue(Option<String>),
}

/// What a loop does after one pass through its body
enum Next {
    Continue,
    Exit(Flow),
}

fn loop_step(flow: Flow, label: Option<&str>) -> Next {
    match flow {
        Flow::Normal | Flow::Continue(None) => Next::Continue,
        Flow::Continue(Some(l)) if label == Some(l.as_str()) => Next::Continue,
        Flow::Break(None) => Next::Exit(Flow::Normal),
        Flow::Break(Some(l)) if label == Some(l.as_str()) => Next::Exit(Flow::Normal),
        other => Next::Exit(other),
    }
}

/// An assignable location
enum Place {
    Var(String),
    Prop(Value, String),
}

pub struct Interpreter {
    global: Obj,
    global_env: Env,
    modules: HashMap<String, Obj>,
    registry: SharedRegistry,
    steps: usize,
    step_limit: usize,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    pub fn new() -> Self {
        Self::with_registry(WeakRegistry::new())
    }

    /// Back `globalThis.__TYPEGPU_META__` with `registry`
    pub fn with_registry(registry: impl MetaRegistry + 'static) -> Self {
        let registry: SharedRegistry = Rc::new(RefCell::new(registry));
        let global = Obj::plain();
        global.set("globalThis", Value::Object(global.clone()));
        global.set(
            META_GLOBAL,
            Value::Object(Obj::new(ObjectKind::WeakMap(registry.clone()))),
        );
        global.set("undefined", Value::Undefined);
        global.set("NaN", Value::Number(f64::NAN));
        global.set("Infinity", Value::Number(f64::INFINITY));
        global.set("Math", Value::Object(math()));
        global.set(
            "WeakMap",
            Value::Object(Obj::native(|_, _, _| {
                let store: SharedRegistry = Rc::new(RefCell::new(WeakRegistry::new()));
                Ok(Value::Object(Obj::new(ObjectKind::WeakMap(store))))
            })),
        );
        global.set(
            "Error",
            Value::Object(Obj::native(|_, _, args| {
                let message = match args.first() {
                    None | Some(Value::Undefined) => String::new(),
                    Some(value) => value.to_string(),
                };
                Ok(Value::Object(Obj::error(&message)))
            })),
        );
        Self {
            global,
            global_env: Rc::new(RefCell::new(Scope::default())),
            modules: HashMap::new(),
            registry,
            steps: 0,
            step_limit: DEFAULT_STEP_LIMIT,
        }
    }

    pub fn with_step_limit(mut self, limit: usize) -> Self {
        self.step_limit = limit;
        self
    }

    pub fn global(&self) -> &Obj {
        &self.global
    }

    pub fn define_global(&mut self, name: &str, value: Value) {
        self.global.set(name, value);
    }

    /// Make `namespace` importable as `specifier`; `default` is the default
    /// export
    pub fn define_module(&mut self, specifier: &str, namespace: Obj) {
        self.modules.insert(specifier.to_string(), namespace);
    }

    pub fn registry(&self) -> Ref<'_, dyn MetaRegistry> {
        self.registry.borrow()
    }

    /// Metadata registered for `function`
    pub fn meta(&self, function: &Value) -> Option<Value> {
        let handle = FnHandle::of(function)?;
        self.registry.borrow().get(&handle)
    }

    /// Evaluate an ES module and return its exports
    pub fn run_module(&mut self, source: &str) -> Result<Obj> {
        self.steps = 0;
        let program = tgpu_parser::parse(source)?;
        let env = child(&self.global_env);
        let exports = Obj::plain();
        let mut bindings: Vec<(String, String)> = Vec::new();

        self.hoist(&program.body, &env);
        for stmt in &program.body {
            let flow = match &stmt.kind {
                StmtKind::Import(import) => {
                    self.import(import, &env)?;
                    Flow::Normal
                }
                StmtKind::Export(export) => self.export(export, &env, &exports, &mut bindings)?,
                _ => self.exec(stmt, &env)?,
            };
            if !matches!(flow, Flow::Normal) {
                return Err(HostError::unsupported("top-level control flow", stmt.span));
            }
        }
        for (exported, local) in bindings {
            let value = self.lookup(&local, &env, program.span)?;
            exports.set(&exported, value);
        }
        log::debug!("module evaluated in {} steps", self.steps);
        Ok(exports)
    }

    pub fn call(&mut self, function: &Value, args: Vec<Value>) -> Result<Value> {
        self.steps = 0;
        self.call_function(function, Value::Undefined, args, Span::dummy())
    }

    fn tick(&mut self) -> Result<()> {
        self.steps += 1;
        if self.steps > self.step_limit {
            return Err(HostError::StepLimit(self.step_limit));
        }
        Ok(())
    }

    fn lookup(&self, name: &str, env: &Env, span: Span) -> Result<Value> {
        if let Some(value) = find(env, name) {
            return Ok(value);
        }
        if self.global.has(name) {
            return Ok(self.global.get(name));
        }
        Err(HostError::Reference {
            name: name.to_string(),
            span,
        })
    }

    fn module(&self, specifier: &str) -> Result<Obj> {
        self.modules
            .get(specifier)
            .cloned()
            .ok_or_else(|| HostError::UnknownModule(specifier.to_string()))
    }

    // ----- modules -----------------------------------------------------

    fn import(&mut self, import: &ImportDecl, env: &Env) -> Result<()> {
        if import.type_only || import.specifiers.is_empty() {
            return Ok(());
        }
        let module = self.module(&import.source)?;
        for specifier in &import.specifiers {
            match specifier {
                ImportSpecifier::Default { local } => declare(env, &local.name, module.get("default")),
                ImportSpecifier::Namespace { local } => {
                    declare(env, &local.name, Value::Object(module.clone()))
                }
                ImportSpecifier::Named {
                    imported,
                    local,
                    type_only,
                } => {
                    if !type_only {
                        declare(env, &local.name, module.get(imported));
                    }
                }
            }
        }
        Ok(())
    }

    fn export(
        &mut self,
        export: &ExportDecl,
        env: &Env,
        exports: &Obj,
        bindings: &mut Vec<(String, String)>,
    ) -> Result<Flow> {
        match export {
            ExportDecl::Decl(stmt) => {
                let flow = self.exec(stmt, env)?;
                for name in declared_names(stmt) {
                    bindings.push((name.clone(), name));
                }
                Ok(flow)
            }
            ExportDecl::Named {
                specifiers,
                source: None,
            } => {
                for specifier in specifiers {
                    bindings.push((specifier.exported.clone(), specifier.local.name.clone()));
                }
                Ok(Flow::Normal)
            }
            ExportDecl::Named {
                specifiers,
                source: Some(source),
            } => {
                let module = self.module(source)?;
                for specifier in specifiers {
                    exports.set(&specifier.exported, module.get(&specifier.local.name));
                }
                Ok(Flow::Normal)
            }
            ExportDecl::DefaultDecl(stmt) => {
                let StmtKind::FnDecl(function) = &stmt.kind else {
                    return Err(HostError::unsupported("class", stmt.span));
                };
                match function.name_str() {
                    Some(name) => bindings.push(("default".to_string(), name.to_string())),
                    None => exports.set("default", self.closure(function, env)),
                }
                Ok(Flow::Normal)
            }
            ExportDecl::DefaultExpr(expr) => {
                let value = self.eval(expr, env)?;
                exports.set("default", value);
                Ok(Flow::Normal)
            }
            ExportDecl::All { alias, source } => {
                let module = self.module(source)?;
                match alias {
                    Some(alias) => exports.set(alias, Value::Object(module)),
                    None => {
                        for key in module.keys().into_iter().filter(|k| k != "default") {
                            exports.set(&key, module.get(&key));
                        }
                    }
                }
                Ok(Flow::Normal)
            }
        }
    }

    // ----- statements --------------------------------------------------

    /// Function declarations and `var` names are visible from the start of
    /// their statement list
    fn hoist(&mut self, statements: &[Stmt], env: &Env) {
        for stmt in statements {
            let inner = match &stmt.kind {
                StmtKind::Export(ExportDecl::Decl(inner) | ExportDecl::DefaultDecl(inner)) => &**inner,
                _ => stmt,
            };
            match &inner.kind {
                StmtKind::FnDecl(function) => {
                    if let Some(name) = function.name_str() {
                        let closure = self.closure(function, env);
                        declare(env, name, closure);
                    }
                }
                StmtKind::VarDecl(decl) if decl.kind == VarKind::Var => {
                    for declarator in &decl.declarators {
                        for name in declarator.target.bound_names() {
                            if !env.borrow().vars.contains_key(&name) {
                                declare(env, &name, Value::Undefined);
                            }
                        }
                    }
                }
                _ => {}
            }
        }
    }

    fn exec_list(&mut self, statements: &[Stmt], env: &Env) -> Result<Flow> {
        self.hoist(statements, env);
        for stmt in statements {
            match self.exec(stmt, env)? {
                Flow::Normal => {}
                flow => return Ok(flow),
            }
        }
        Ok(Flow::Normal)
    }

    fn exec(&mut self, stmt: &Stmt, env: &Env) -> Result<Flow> {
        self.tick()?;
        match &stmt.kind {
            StmtKind::Expr(expr) => {
                self.eval(expr, env)?;
            }
            StmtKind::VarDecl(decl) => self.declare_vars(decl, env)?,
            StmtKind::FnDecl(_) | StmtKind::Empty | StmtKind::TsDecl => {}
            StmtKind::ClassDecl(_) => return Err(HostError::unsupported("class", stmt.span)),
            StmtKind::Return(arg) => {
                let value = match arg {
                    Some(arg) => self.eval(arg, env)?,
                    None => Value::Undefined,
                };
                return Ok(Flow::Return(value));
            }
            StmtKind::If {
                test,
                consequent,
                alternate,
            } => {
                if self.eval(test, env)?.truthy() {
                    return self.exec(consequent, env);
                }
                if let Some(alternate) = alternate {
                    return self.exec(alternate, env);
                }
            }
            StmtKind::For { .. }
            | StmtKind::ForEach { .. }
            | StmtKind::While { .. }
            | StmtKind::DoWhile { .. } => return self.exec_loop(stmt, None, env),
            StmtKind::Break(label) => {
                return Ok(Flow::Break(label.as_ref().map(|l| l.name.clone())))
            }
            StmtKind::Continue(label) => {
                return Ok(Flow::Continue(label.as_ref().map(|l| l.name.clone())))
            }
            StmtKind::Block(block) => return self.exec_list(&block.statements, &child(env)),
            StmtKind::Throw(arg) => return Err(HostError::Thrown(self.eval(arg, env)?)),
            StmtKind::Try {
                block,
                handler,
                finalizer,
            } => return self.exec_try(block, handler.as_ref(), finalizer.as_ref(), env),
            StmtKind::Switch {
                discriminant,
                cases,
            } => return self.exec_switch(discriminant, cases, env),
            StmtKind::Labeled { label, body } => {
                let flow = match &body.kind {
                    StmtKind::For { .. }
                    | StmtKind::ForEach { .. }
                    | StmtKind::While { .. }
                    | StmtKind::DoWhile { .. } => self.exec_loop(body, Some(&label.name), env)?,
                    _ => self.exec(body, env)?,
                };
                return Ok(match flow {
                    Flow::Break(Some(l)) if l == label.name => Flow::Normal,
                    flow => flow,
                });
            }
            StmtKind::Import(_) | StmtKind::Export(_) => {
                return Err(HostError::unsupported("nested module declaration", stmt.span))
            }
        }
        Ok(Flow::Normal)
    }

    fn exec_loop(&mut self, stmt: &Stmt, label: Option<&str>, env: &Env) -> Result<Flow> {
        match &stmt.kind {
            StmtKind::For {
                init,
                test,
                update,
                body,
            } => {
                let scope = child(env);
                match init {
                    Some(ForInit::VarDecl(decl)) => self.declare_vars(decl, &scope)?,
                    Some(ForInit::Expr(expr)) => {
                        self.eval(expr, &scope)?;
                    }
                    None => {}
                }
                loop {
                    if let Some(test) = test {
                        if !self.eval(test, &scope)?.truthy() {
                            break;
                        }
                    }
                    let flow = self.exec(body, &scope)?;
                    if let Next::Exit(flow) = loop_step(flow, label) {
                        return Ok(flow);
                    }
                    if let Some(update) = update {
                        self.eval(update, &scope)?;
                    }
                }
            }
            StmtKind::While { test, body } => {
                while self.eval(test, env)?.truthy() {
                    let flow = self.exec(body, env)?;
                    if let Next::Exit(flow) = loop_step(flow, label) {
                        return Ok(flow);
                    }
                }
            }
            StmtKind::DoWhile { body, test } => loop {
                let flow = self.exec(body, env)?;
                if let Next::Exit(flow) = loop_step(flow, label) {
                    return Ok(flow);
                }
                if !self.eval(test, env)?.truthy() {
                    break;
                }
            },
            StmtKind::ForEach {
                kind,
                left,
                right,
                body,
            } => {
                let collection = self.eval(right, env)?;
                let items = match kind {
                    ForEachKind::Of => self.iterate(&collection, right.span)?,
                    ForEachKind::In => match &collection {
                        Value::Object(obj) => obj.keys().iter().map(|k| Value::string(k)).collect(),
                        _ => Vec::new(),
                    },
                    ForEachKind::AwaitOf => {
                        return Err(HostError::unsupported("for await", stmt.span))
                    }
                };
                for item in items {
                    let scope = child(env);
                    match left {
                        ForHead::VarDecl(decl) => {
                            let Some(declarator) = decl.declarators.first() else {
                                return Err(HostError::unsupported("empty declaration", decl.span));
                            };
                            self.bind_pattern(&declarator.target, item, &scope)?;
                        }
                        ForHead::Target(target) => {
                            let place = self.place(target, &scope)?;
                            self.write(place, item, &scope, target.span)?;
                        }
                    }
                    let flow = self.exec(body, &scope)?;
                    if let Next::Exit(flow) = loop_step(flow, label) {
                        return Ok(flow);
                    }
                }
            }
            _ => return self.exec(stmt, env),
        }
        Ok(Flow::Normal)
    }

    fn exec_try(
        &mut self,
        block: &Block,
        handler: Option<&CatchClause>,
        finalizer: Option<&Block>,
        env: &Env,
    ) -> Result<Flow> {
        let result = self.exec_list(&block.statements, &child(env));
        let result = match (result, handler) {
            (Err(err), Some(handler)) if is_catchable(&err) => {
                let scope = child(env);
                if let Some(param) = &handler.param {
                    self.bind_pattern(param, error_value(err), &scope)?;
                }
                self.exec_list(&handler.body.statements, &scope)
            }
            (result, _) => result,
        };
        if let Some(finalizer) = finalizer {
            match self.exec_list(&finalizer.statements, &child(env))? {
                Flow::Normal => {}
                flow => return Ok(flow),
            }
        }
        result
    }

    fn exec_switch(&mut self, discriminant: &Expr, cases: &[SwitchCase], env: &Env) -> Result<Flow> {
        let value = self.eval(discriminant, env)?;
        let scope = child(env);
        let mut start = None;
        for (i, case) in cases.iter().enumerate() {
            if let Some(test) = &case.test {
                if self.eval(test, &scope)?.strict_eq(&value) {
                    start = Some(i);
                    break;
                }
            }
        }
        let Some(start) = start.or_else(|| cases.iter().position(|c| c.test.is_none())) else {
            return Ok(Flow::Normal);
        };
        for case in &cases[start..] {
            for stmt in &case.body {
                match self.exec(stmt, &scope)? {
                    Flow::Normal => {}
                    Flow::Break(None) => return Ok(Flow::Normal),
                    flow => return Ok(flow),
                }
            }
        }
        Ok(Flow::Normal)
    }

    fn declare_vars(&mut self, decl: &VarDecl, env: &Env) -> Result<()> {
        for declarator in &decl.declarators {
            let value = match &declarator.init {
                Some(init) => self.eval(init, env)?,
                // A bare `var x;` keeps the hoisted binding
                None if decl.kind == VarKind::Var => continue,
                None => Value::Undefined,
            };
            self.bind_pattern(&declarator.target, value, env)?;
        }
        Ok(())
    }

    fn bind_pattern(&mut self, pattern: &Pattern, value: Value, env: &Env) -> Result<()> {
        match &pattern.kind {
            PatternKind::Ident(name) => declare(env, name, value),
            PatternKind::Assign { target, default } => {
                let value = match value {
                    Value::Undefined => self.eval(default, env)?,
                    value => value,
                };
                self.bind_pattern(target, value, env)?;
            }
            PatternKind::Object(props) => {
                if value.is_nullish() {
                    return Err(HostError::type_error(
                        format!("cannot destructure {}", value),
                        pattern.span,
                    ));
                }
                let mut used = Vec::new();
                for prop in props {
                    match prop {
                        ObjectPatternProp::KeyValue { key, value: target, .. } => {
                            let key = self.prop_key(key, env)?;
                            let item = value.get(&key);
                            used.push(key);
                            self.bind_pattern(target, item, env)?;
                        }
                        ObjectPatternProp::Rest(target) => {
                            let rest = Obj::plain();
                            if let Value::Object(source) = &value {
                                for key in source.keys().into_iter().filter(|k| !used.contains(k)) {
                                    rest.set(&key, source.get(&key));
                                }
                            }
                            self.bind_pattern(target, Value::Object(rest), env)?;
                        }
                    }
                }
            }
            PatternKind::Array(elements) => {
                let items = self.iterate(&value, pattern.span)?;
                for (i, element) in elements.iter().enumerate() {
                    let Some(element) = element else { continue };
                    match &element.kind {
                        PatternKind::Rest(inner) => {
                            let rest = items.get(i..).map(<[Value]>::to_vec).unwrap_or_default();
                            self.bind_pattern(inner, Value::Object(Obj::array(rest)), env)?;
                        }
                        _ => {
                            let item = items.get(i).cloned().unwrap_or_default();
                            self.bind_pattern(element, item, env)?;
                        }
                    }
                }
            }
            PatternKind::Rest(inner) => self.bind_pattern(inner, value, env)?,
        }
        Ok(())
    }

    // ----- expressions -------------------------------------------------

    fn eval(&mut self, expr: &Expr, env: &Env) -> Result<Value> {
        self.tick()?;
        let span = expr.span;
        let value = match &expr.kind {
            ExprKind::Ident(name) => self.lookup(name, env, span)?,
            ExprKind::This => find(env, THIS).unwrap_or_default(),
            ExprKind::Literal(literal) => match literal {
                Literal::Number { value, .. } => Value::Number(*value),
                Literal::String(text) => Value::string(text),
                Literal::Bool(b) => Value::Bool(*b),
                Literal::Null => Value::Null,
                Literal::BigInt(_) => return Err(HostError::unsupported("BigInt", span)),
                Literal::Regex { .. } => {
                    return Err(HostError::unsupported("regular expression", span))
                }
            },
            ExprKind::Template {
                tag: None,
                quasis,
                exprs,
            } => {
                let mut text = String::new();
                for (i, quasi) in quasis.iter().enumerate() {
                    text.push_str(quasi);
                    if let Some(expr) = exprs.get(i) {
                        let value = self.eval(expr, env)?;
                        text.push_str(&value.to_string());
                    }
                }
                Value::string(&text)
            }
            ExprKind::Template { .. } => return Err(HostError::unsupported("tagged template", span)),
            ExprKind::Array(elements) => {
                let mut items = Vec::new();
                for element in elements {
                    match element {
                        None => items.push(Value::Undefined),
                        Some(Expr {
                            kind: ExprKind::Spread(inner),
                            span,
                        }) => {
                            let spread = self.eval(inner, env)?;
                            items.extend(self.iterate(&spread, *span)?);
                        }
                        Some(element) => items.push(self.eval(element, env)?),
                    }
                }
                Value::Object(Obj::array(items))
            }
            ExprKind::Object(props) => self.object_literal(props, env)?,
            ExprKind::Function(function) => match function.name_str() {
                // A named function expression sees its own name
                Some(name) if !function.is_arrow => {
                    let scope = child(env);
                    let closure = self.closure(function, &scope);
                    declare(&scope, name, closure.clone());
                    closure
                }
                _ => self.closure(function, env),
            },
            ExprKind::Class(_) => return Err(HostError::unsupported("class", span)),
            ExprKind::Unary { op, arg } => self.unary(*op, arg, env)?,
            ExprKind::Update { op, prefix, arg } => {
                let place = self.place(arg, env)?;
                let old = self.read(&place, env, span)?.to_number();
                let new = match op {
                    UpdateOp::Inc => old + 1.0,
                    UpdateOp::Dec => old - 1.0,
                };
                self.write(place, Value::Number(new), env, span)?;
                Value::Number(if *prefix { new } else { old })
            }
            ExprKind::Binary { op, left, right } => {
                let left = self.eval(left, env)?;
                let right = self.eval(right, env)?;
                binary(*op, left, right, span)?
            }
            ExprKind::Logical { op, left, right } => {
                let left = self.eval(left, env)?;
                let short_circuit = match op {
                    LogicalOp::And => !left.truthy(),
                    LogicalOp::Or => left.truthy(),
                    LogicalOp::Nullish => !left.is_nullish(),
                };
                if short_circuit {
                    left
                } else {
                    self.eval(right, env)?
                }
            }
            ExprKind::Assign { op, target, value } => {
                let place = self.place(target, env)?;
                let result = match op {
                    AssignOp::Assign => self.eval(value, env)?,
                    AssignOp::Compound(op) => {
                        let current = self.read(&place, env, span)?;
                        let rhs = self.eval(value, env)?;
                        binary(*op, current, rhs, span)?
                    }
                    AssignOp::Logical(op) => {
                        let current = self.read(&place, env, span)?;
                        let keep = match op {
                            LogicalOp::And => !current.truthy(),
                            LogicalOp::Or => current.truthy(),
                            LogicalOp::Nullish => !current.is_nullish(),
                        };
                        if keep {
                            return Ok(current);
                        }
                        self.eval(value, env)?
                    }
                };
                self.write(place, result.clone(), env, span)?;
                result
            }
            ExprKind::Conditional {
                test,
                consequent,
                alternate,
            } => {
                if self.eval(test, env)?.truthy() {
                    self.eval(consequent, env)?
                } else {
                    self.eval(alternate, env)?
                }
            }
            ExprKind::Call {
                callee,
                args,
                optional,
            } => self.call_expr(callee, args, *optional, env, span)?,
            ExprKind::New { callee, args } => {
                let constructor = self.eval(callee, env)?;
                let args = self.eval_args(args, env)?;
                self.construct(&constructor, args, span)?
            }
            ExprKind::Member {
                object,
                property,
                optional,
            } => {
                let target = self.eval(object, env)?;
                if *optional && target.is_nullish() {
                    return Ok(Value::Undefined);
                }
                let key = self.member_key(property, env)?;
                get_property(&target, &key, span)?
            }
            ExprKind::Sequence(exprs) => {
                let mut last = Value::Undefined;
                for expr in exprs {
                    last = self.eval(expr, env)?;
                }
                last
            }
            ExprKind::TsCast(inner) => self.eval(inner, env)?,
            ExprKind::Spread(_) => return Err(HostError::unsupported("spread", span)),
            ExprKind::Await(_) => return Err(HostError::unsupported("await", span)),
            ExprKind::Yield { .. } => return Err(HostError::unsupported("yield", span)),
            ExprKind::MetaProperty(name) => return Err(HostError::unsupported(name.clone(), span)),
        };
        Ok(value)
    }

    fn object_literal(&mut self, props: &[Prop], env: &Env) -> Result<Value> {
        let obj = Obj::plain();
        for prop in props {
            match &prop.kind {
                PropKind::KeyValue { key, value } => {
                    let key = self.prop_key(key, env)?;
                    let value = self.eval(value, env)?;
                    obj.set(&key, value);
                }
                PropKind::Shorthand { name, span } => {
                    let value = self.lookup(name, env, *span)?;
                    obj.set(name, value);
                }
                PropKind::Method {
                    key,
                    kind: MethodKind::Method,
                    function,
                } => {
                    let key = self.prop_key(key, env)?;
                    obj.set(&key, self.closure(function, env));
                }
                PropKind::Method { .. } => {
                    return Err(HostError::unsupported("accessor property", prop.span))
                }
                PropKind::Spread(source) => {
                    if let Value::Object(source) = self.eval(source, env)? {
                        for key in source.keys() {
                            obj.set(&key, source.get(&key));
                        }
                    }
                }
            }
        }
        Ok(Value::Object(obj))
    }

    fn unary(&mut self, op: UnaryOp, arg: &Expr, env: &Env) -> Result<Value> {
        Ok(match op {
            UnaryOp::Typeof => {
                if let ExprKind::Ident(name) = &arg.kind {
                    if find(env, name).is_none() && !self.global.has(name) {
                        return Ok(Value::string("undefined"));
                    }
                }
                Value::string(self.eval(arg, env)?.type_of())
            }
            UnaryOp::Delete => match self.place(arg, env)? {
                Place::Prop(Value::Object(obj), key) => Value::Bool(obj.delete(&key)),
                _ => Value::Bool(true),
            },
            UnaryOp::Neg => Value::Number(-self.eval(arg, env)?.to_number()),
            UnaryOp::Plus => Value::Number(self.eval(arg, env)?.to_number()),
            UnaryOp::Not => Value::Bool(!self.eval(arg, env)?.truthy()),
            UnaryOp::BitNot => Value::Number(f64::from(!to_int32(self.eval(arg, env)?.to_number()))),
            UnaryOp::Void => {
                self.eval(arg, env)?;
                Value::Undefined
            }
        })
    }

    fn call_expr(
        &mut self,
        callee: &Expr,
        args: &[Expr],
        optional: bool,
        env: &Env,
        span: Span,
    ) -> Result<Value> {
        let (function, this) = match &callee.unwrap_ts().kind {
            ExprKind::Member {
                object,
                property,
                optional: member_optional,
            } => {
                let target = self.eval(object, env)?;
                if *member_optional && target.is_nullish() {
                    return Ok(Value::Undefined);
                }
                let key = self.member_key(property, env)?;
                let args = self.eval_args(args, env)?;
                if let Some(result) = self.builtin_method(&target, &key, &args, span)? {
                    return Ok(result);
                }
                let function = get_property(&target, &key, span)?;
                if optional && function.is_nullish() {
                    return Ok(Value::Undefined);
                }
                return self.call_function(&function, target, args, span);
            }
            _ => (self.eval(callee, env)?, Value::Undefined),
        };
        if optional && function.is_nullish() {
            return Ok(Value::Undefined);
        }
        let args = self.eval_args(args, env)?;
        self.call_function(&function, this, args, span)
    }

    fn eval_args(&mut self, args: &[Expr], env: &Env) -> Result<Vec<Value>> {
        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            match &arg.kind {
                ExprKind::Spread(inner) => {
                    let spread = self.eval(inner, env)?;
                    values.extend(self.iterate(&spread, arg.span)?);
                }
                _ => values.push(self.eval(arg, env)?),
            }
        }
        Ok(values)
    }

    /// Methods of built-in objects
    fn builtin_method(
        &mut self,
        target: &Value,
        key: &str,
        args: &[Value],
        span: Span,
    ) -> Result<Option<Value>> {
        let Value::Object(obj) = target else {
            return Ok(None);
        };
        if let Some(registry) = obj.weak_map() {
            let handle = args.first().and_then(FnHandle::of);
            let result = match key {
                "set" => {
                    let Some(handle) = handle else {
                        return Err(HostError::type_error("invalid value used as weak map key", span));
                    };
                    let meta = args.get(1).cloned().unwrap_or_default();
                    registry.borrow_mut().set(handle, meta);
                    target.clone()
                }
                "get" => handle
                    .and_then(|handle| registry.borrow().get(&handle))
                    .unwrap_or_default(),
                "has" => Value::Bool(handle.is_some_and(|handle| registry.borrow().has(&handle))),
                "delete" => {
                    Value::Bool(handle.is_some_and(|handle| registry.borrow_mut().delete(&handle)))
                }
                _ => return Ok(None),
            };
            return Ok(Some(result));
        }
        if obj.is_array() {
            match key {
                "push" => {
                    let mut length = 0;
                    for arg in args {
                        length = obj.push(arg.clone());
                    }
                    return Ok(Some(Value::Number(length as f64)));
                }
                "join" => {
                    let separator = match args.first() {
                        None | Some(Value::Undefined) => ",".to_string(),
                        Some(value) => value.to_string(),
                    };
                    let items = obj.items().unwrap_or_default();
                    let parts: Vec<String> = items
                        .iter()
                        .map(|item| if item.is_nullish() { String::new() } else { item.to_string() })
                        .collect();
                    return Ok(Some(Value::string(&parts.join(&separator))));
                }
                _ => {}
            }
        }
        Ok(None)
    }

    fn call_function(&mut self, function: &Value, this: Value, args: Vec<Value>, span: Span) -> Result<Value> {
        let Some(callable) = function.as_obj().and_then(Obj::callable) else {
            return Err(HostError::type_error(
                format!("{} is not a function", function.type_of()),
                span,
            ));
        };
        match callable {
            Callable::Native(native) => native(self, this, args),
            Callable::Closure { function, env } => {
                if function.is_async || function.is_generator {
                    return Err(HostError::unsupported("async or generator function", function.span));
                }
                let scope = child(&env);
                // Arrows see the enclosing `this` through the scope chain
                if !function.is_arrow {
                    declare(&scope, THIS, this);
                    declare(&scope, "arguments", Value::Object(Obj::array(args.clone())));
                }
                for (i, param) in function.params.iter().enumerate() {
                    match &param.pattern.kind {
                        PatternKind::Rest(inner) => {
                            let rest = args.get(i..).map(<[Value]>::to_vec).unwrap_or_default();
                            self.bind_pattern(inner, Value::Object(Obj::array(rest)), &scope)?;
                        }
                        _ => {
                            let arg = args.get(i).cloned().unwrap_or_default();
                            self.bind_pattern(&param.pattern, arg, &scope)?;
                        }
                    }
                }
                match &function.body {
                    FunctionBody::Block(block) => match self.exec_list(&block.statements, &scope)? {
                        Flow::Return(value) => Ok(value),
                        _ => Ok(Value::Undefined),
                    },
                    FunctionBody::Expr(expr) => self.eval(expr, &scope),
                }
            }
        }
    }

    fn construct(&mut self, constructor: &Value, args: Vec<Value>, span: Span) -> Result<Value> {
        match constructor.as_obj().and_then(Obj::callable) {
            Some(Callable::Native(native)) => native(self, Value::Undefined, args),
            Some(Callable::Closure { function, .. }) if !function.is_arrow => {
                let instance = Value::Object(Obj::plain());
                let result = self.call_function(constructor, instance.clone(), args, span)?;
                Ok(match result {
                    Value::Object(_) => result,
                    _ => instance,
                })
            }
            _ => Err(HostError::type_error(
                format!("{} is not a constructor", constructor.type_of()),
                span,
            )),
        }
    }

    fn closure(&self, function: &Function, env: &Env) -> Value {
        Value::Object(Obj::new(ObjectKind::Function(Callable::Closure {
            function: Rc::new(function.clone()),
            env: env.clone(),
        })))
    }

    fn prop_key(&mut self, key: &PropKey, env: &Env) -> Result<String> {
        match &key.kind {
            PropKeyKind::Computed(expr) => {
                let value = self.eval(expr, env)?;
                Ok(property_name(&value))
            }
            PropKeyKind::Number(n) => Ok(format_number(*n)),
            PropKeyKind::Private(_) => Err(HostError::unsupported("private name", key.span)),
            _ => Ok(key.static_name().unwrap_or_default()),
        }
    }

    fn member_key(&mut self, property: &MemberProp, env: &Env) -> Result<String> {
        match property {
            MemberProp::Ident { name, .. } => Ok(name.clone()),
            MemberProp::Private { span, .. } => Err(HostError::unsupported("private name", *span)),
            MemberProp::Computed(expr) => {
                let value = self.eval(expr, env)?;
                Ok(property_name(&value))
            }
        }
    }

    fn place(&mut self, target: &Expr, env: &Env) -> Result<Place> {
        match &target.kind {
            ExprKind::Ident(name) => Ok(Place::Var(name.clone())),
            ExprKind::Member {
                object, property, ..
            } => {
                let object = self.eval(object, env)?;
                let key = self.member_key(property, env)?;
                Ok(Place::Prop(object, key))
            }
            ExprKind::TsCast(inner) => self.place(inner, env),
            _ => Err(HostError::unsupported("destructuring assignment", target.span)),
        }
    }

    fn read(&self, place: &Place, env: &Env, span: Span) -> Result<Value> {
        match place {
            Place::Var(name) => self.lookup(name, env, span),
            Place::Prop(target, key) => get_property(target, key, span),
        }
    }

    fn write(&mut self, place: Place, value: Value, env: &Env, span: Span) -> Result<()> {
        match place {
            Place::Var(name) => {
                if !assign(env, &name, value.clone()) {
                    self.global.set(&name, value);
                }
                Ok(())
            }
            Place::Prop(Value::Object(obj), key) => {
                obj.set(&key, value);
                Ok(())
            }
            Place::Prop(target, key) => Err(HostError::type_error(
                format!("cannot set properties of {} (setting '{}')", target, key),
                span,
            )),
        }
    }

    fn iterate(&self, value: &Value, span: Span) -> Result<Vec<Value>> {
        match value {
            Value::Object(obj) if obj.is_array() => Ok(obj.items().unwrap_or_default()),
            Value::String(text) => Ok(text.chars().map(|c| Value::string(&c.to_string())).collect()),
            other => Err(HostError::type_error(format!("{} is not iterable", other), span)),
        }
    }
}

fn declared_names(stmt: &Stmt) -> Vec<String> {
    match &stmt.kind {
        StmtKind::VarDecl(decl) => decl
            .declarators
            .iter()
            .flat_map(|d| d.target.bound_names())
            .collect(),
        StmtKind::FnDecl(function) => function.name_str().map(str::to_string).into_iter().collect(),
        _ => Vec::new(),
    }
}

fn is_catchable(err: &HostError) -> bool {
    !matches!(
        err,
        HostError::StepLimit(_) | HostError::Parse(_) | HostError::UnknownModule(_)
    )
}

fn error_value(err: HostError) -> Value {
    match err {
        HostError::Thrown(value) => value,
        other => Value::Object(Obj::error(&other.to_string())),
    }
}

fn property_name(value: &Value) -> String {
    match value {
        Value::Number(n) => format_number(*n),
        other => other.to_string(),
    }
}

fn get_property(target: &Value, key: &str, span: Span) -> Result<Value> {
    if target.is_nullish() {
        return Err(HostError::type_error(
            format!("cannot read properties of {} (reading '{}')", target, key),
            span,
        ));
    }
    Ok(target.get(key))
}

fn to_uint32(n: f64) -> u32 {
    if !n.is_finite() {
        return 0;
    }
    n.trunc().rem_euclid(4_294_967_296.0) as u32
}

fn to_int32(n: f64) -> i32 {
    to_uint32(n) as i32
}

fn binary(op: BinaryOp, left: Value, right: Value, span: Span) -> Result<Value> {
    let number = |f: fn(f64, f64) -> f64| Value::Number(f(left.to_number(), right.to_number()));
    Ok(match op {
        BinaryOp::Add => match (&left, &right) {
            (Value::String(_) | Value::Object(_), _) | (_, Value::String(_) | Value::Object(_)) => {
                Value::string(&format!("{}{}", left, right))
            }
            _ => number(|a, b| a + b),
        },
        BinaryOp::Sub => number(|a, b| a - b),
        BinaryOp::Mul => number(|a, b| a * b),
        BinaryOp::Div => number(|a, b| a / b),
        BinaryOp::Mod => number(|a, b| a % b),
        BinaryOp::Exp => number(f64::powf),
        BinaryOp::EqEq => Value::Bool(left.loose_eq(&right)),
        BinaryOp::NotEq => Value::Bool(!left.loose_eq(&right)),
        BinaryOp::EqEqEq => Value::Bool(left.strict_eq(&right)),
        BinaryOp::NotEqEq => Value::Bool(!left.strict_eq(&right)),
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            let ordering = match (&left, &right) {
                (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
                _ => left.to_number().partial_cmp(&right.to_number()),
            };
            Value::Bool(ordering.is_some_and(|o| match op {
                BinaryOp::Lt => o.is_lt(),
                BinaryOp::Le => o.is_le(),
                BinaryOp::Gt => o.is_gt(),
                _ => o.is_ge(),
            }))
        }
        BinaryOp::BitAnd => {
            Value::Number(f64::from(to_int32(left.to_number()) & to_int32(right.to_number())))
        }
        BinaryOp::BitOr => {
            Value::Number(f64::from(to_int32(left.to_number()) | to_int32(right.to_number())))
        }
        BinaryOp::BitXor => {
            Value::Number(f64::from(to_int32(left.to_number()) ^ to_int32(right.to_number())))
        }
        BinaryOp::Shl => Value::Number(f64::from(
            to_int32(left.to_number()).wrapping_shl(to_uint32(right.to_number()) & 31),
        )),
        BinaryOp::Shr => Value::Number(f64::from(
            to_int32(left.to_number()) >> (to_uint32(right.to_number()) & 31),
        )),
        BinaryOp::UShr => Value::Number(f64::from(
            to_uint32(left.to_number()) >> (to_uint32(right.to_number()) & 31),
        )),
        BinaryOp::In => match &right {
            Value::Object(obj) => Value::Bool(obj.has(&property_name(&left))),
            _ => {
                return Err(HostError::type_error(
                    format!("cannot use 'in' operator to search for '{}' in {}", left, right),
                    span,
                ))
            }
        },
        BinaryOp::InstanceOf => return Err(HostError::unsupported("instanceof", span)),
    })
}

fn number_arg(args: &[Value], index: usize) -> f64 {
    args.get(index).map_or(f64::NAN, Value::to_number)
}

fn math() -> Obj {
    let math = Obj::plain();
    let unary: [(&str, fn(f64) -> f64); 10] = [
        ("sqrt", f64::sqrt),
        ("abs", f64::abs),
        ("floor", f64::floor),
        ("ceil", f64::ceil),
        ("round", |n| (n + 0.5).floor()),
        ("trunc", f64::trunc),
        ("sin", f64::sin),
        ("cos", f64::cos),
        ("exp", f64::exp),
        ("log", f64::ln),
    ];
    for (name, f) in unary {
        math.set(
            name,
            Value::Object(Obj::native(move |_, _, args| Ok(Value::Number(f(number_arg(&args, 0)))))),
        );
    }
    math.set(
        "pow",
        Value::Object(Obj::native(|_, _, args| {
            Ok(Value::Number(number_arg(&args, 0).powf(number_arg(&args, 1))))
        })),
    );
    math.set(
        "min",
        Value::Object(Obj::native(|_, _, args| {
            Ok(Value::Number(args.iter().map(Value::to_number).fold(f64::INFINITY, |acc, n| {
                if acc.is_nan() || n.is_nan() { f64::NAN } else { acc.min(n) }
            })))
        })),
    );
    math.set(
        "max",
        Value::Object(Obj::native(|_, _, args| {
            Ok(Value::Number(args.iter().map(Value::to_number).fold(f64::NEG_INFINITY, |acc, n| {
                if acc.is_nan() || n.is_nan() { f64::NAN } else { acc.max(n) }
            })))
        })),
    );
    math.set("PI", Value::Number(std::f64::consts::PI));
    math
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(source: &str) -> (Interpreter, Obj) {
        let mut interp = Interpreter::new();
        let exports = interp.run_module(source).unwrap();
        (interp, exports)
    }

    fn num(n: f64) -> Value {
        Value::Number(n)
    }

    #[test]
    fn test_functions_and_closures() {
        let (mut interp, exports) = run(
            "export const add = (a, b) => a + b;\n\
             export function fact(n) { return n <= 1 ? 1 : n * fact(n - 1); }\n\
             const counter = () => { let n = 0; return () => ++n; };\n\
             const next = counter(); next();\n\
             export const second = next();",
        );
        assert_eq!(interp.call(&exports.get("add"), vec![num(2.0), num(3.0)]).unwrap(), num(5.0));
        assert_eq!(interp.call(&exports.get("fact"), vec![num(5.0)]).unwrap(), num(120.0));
        assert_eq!(exports.get("second"), num(2.0));
    }

    #[test]
    fn test_control_flow() {
        let (_, exports) = run(
            "let total = 0;\n\
             outer: for (let i = 0; i < 5; i++) {\n\
               for (const j of [1, 2, 3]) { if (j === 3) continue outer; total += j; }\n\
             }\n\
             let k = 0; while (true) { k++; if (k > 3) break; }\n\
             let label;\n\
             switch (k) { case 3: label = 'three'; break; case 4: label = 'four'; default: label += '!'; }\n\
             export { total, k, label };",
        );
        assert_eq!(exports.get("total"), num(15.0));
        assert_eq!(exports.get("k"), num(4.0));
        assert_eq!(exports.get("label"), Value::string("four!"));
    }

    #[test]
    fn test_exceptions() {
        let (mut interp, exports) = run(
            "let log = '';\n\
             try { throw new Error('boom'); } catch (e) { log += e.message; } finally { log += '/done'; }\n\
             try { missing(); } catch (e) { log += '|' + e.message; }\n\
             export const fail = () => { throw new Error('nope'); };\n\
             export { log };",
        );
        assert_eq!(exports.get("log"), Value::string("boom/done|missing is not defined"));
        let err = interp.call(&exports.get("fail"), vec![]).unwrap_err();
        assert_eq!(err.code(), "E-HOST-001");
        assert_eq!(err.thrown_message().as_deref(), Some("nope"));
    }

    #[test]
    fn test_destructuring_and_spread() {
        let (_, exports) = run(
            "const { a, b: [first, ...others], c = 7, ...rest } = { a: 1, b: [2, 3, 4], d: 5 };\n\
             const merged = { ...rest, e: 6 };\n\
             const list = [0, ...others];\n\
             const sum = ((...xs) => xs[0] + xs[1])(...list);\n\
             export const summary = `${a}-${first}-${others.length}-${c}-${merged.d}${merged.e}-${sum}`;",
        );
        assert_eq!(exports.get("summary"), Value::string("1-2-2-7-56-3"));
    }

    #[test]
    fn test_registration_wrapper() {
        let (interp, exports) = run(
            "export const f = (($) => ((globalThis.__TYPEGPU_META__ ??= new WeakMap()).set($.f = ((x) => x * 2), { v: 2, name: \"f\", ast: {\"v\":2,\"params\":[]}, externals: () => ({}) }) && $.f))({});",
        );
        let f = exports.get("f");
        assert!(f.is_callable());
        let meta = interp.meta(&f).unwrap();
        assert_eq!(meta.get("name"), Value::string("f"));
        assert_eq!(meta.get("ast").to_json(), serde_json::json!({ "v": 2, "params": [] }));
        assert_eq!(interp.registry().len(), 1);
    }

    #[test]
    fn test_imports() {
        let mut interp = Interpreter::new();
        let module = Obj::plain();
        module.set("default", Value::string("root"));
        module.set("named", num(4.0));
        interp.define_module("lib", module);
        let exports = interp
            .run_module("import root, { named as n } from 'lib';\nimport * as ns from 'lib';\nexport const out = root + n + ns.named;")
            .unwrap();
        assert_eq!(exports.get("out"), Value::string("root44"));
        assert!(matches!(
            Interpreter::new().run_module("import x from 'nowhere';"),
            Err(HostError::UnknownModule(_))
        ));
    }

    #[test]
    fn test_operators() {
        let (_, exports) = run(
            "export const values = [7 % 3, 2 ** 10, -7 >> 1, -1 >>> 28, 5 & 3, '3' == 3, null ?? 'd', typeof nothing, 1 / 0];",
        );
        let values: Vec<String> = exports
            .get("values")
            .as_obj()
            .and_then(Obj::items)
            .unwrap()
            .iter()
            .map(Value::to_string)
            .collect();
        assert_eq!(
            values,
            ["1", "1024", "-4", "15", "1", "true", "d", "undefined", "Infinity"]
        );
    }

    #[test]
    fn test_step_limit() {
        let mut interp = Interpreter::new().with_step_limit(1_000);
        let err = interp.run_module("while (true) {}").unwrap_err();
        assert_eq!(err.code(), "E-HOST-006");
    }
}
