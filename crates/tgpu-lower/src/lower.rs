//! Lowering of kernel functions to the tinyest IR

use tgpu_ast::{
    AssignOp, Block, Expr, ExprKind, ForEachKind, ForHead, ForInit, Function, FunctionBody,
    LineIndex, Literal, MemberProp, ObjectPatternProp, Param, PatternKind, PropKeyKind, PropKind,
    Span, Stmt, StmtKind, UnaryOp, VarDecl, VarKind,
};
use tinyest::{
    is_known_version, DeclKind, DestructuredProp, Expression, KernelIr, NodeTag,
    ParamDescriptor, Statement, CURRENT_VERSION,
};

use crate::error::{LowerError, Location};
use crate::free_vars::{free_variables, free_variables_of_expression};

/// Name used in diagnostics for kernels without a name
pub const UNNAMED: &str = "<unnamed>";

/// Per-kernel lowering settings
#[derive(Debug, Clone, Copy)]
pub struct LowerOptions<'a> {
    /// Target IR version
    pub version: u32,
    pub file_id: &'a str,
    pub kernel_name: Option<&'a str>,
    pub line_index: &'a LineIndex,
    /// The kernel is a function expression, so its own name is local
    pub expression: bool,
}

impl<'a> LowerOptions<'a> {
    pub fn new(file_id: &'a str, line_index: &'a LineIndex) -> Self {
        Self {
            version: CURRENT_VERSION,
            file_id,
            kernel_name: None,
            line_index,
            expression: false,
        }
    }

    pub fn with_version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    pub fn with_kernel_name(mut self, name: Option<&'a str>) -> Self {
        self.kernel_name = name;
        self
    }

    pub fn as_expression(mut self, expression: bool) -> Self {
        self.expression = expression;
        self
    }
}

/// Lower `function` to IR. The function itself is never modified.
pub fn lower(function: &Function, options: &LowerOptions<'_>) -> Result<KernelIr, LowerError> {
    if !is_known_version(options.version) {
        return Err(LowerError::UnknownVersion(options.version));
    }
    let lowerer = Lowerer { options };

    if function.is_async {
        return Err(lowerer.unsupported("async function", function.span));
    }
    if function.is_generator {
        return Err(lowerer.unsupported("generator function", function.span));
    }

    let params = function
        .params
        .iter()
        .map(|param| lowerer.param(param))
        .collect::<Result<Vec<_>, _>>()?;

    let body = match &function.body {
        FunctionBody::Block(block) => lowerer.function_block(block)?,
        FunctionBody::Expr(expr) => Statement::Block(vec![Statement::Return(Some(lowerer.expr(expr)?))]),
    };

    let ir = KernelIr {
        v: options.version,
        params,
        body,
        external_names: if options.expression {
            free_variables_of_expression(function)
        } else {
            free_variables(function)
        },
    };
    log::trace!(
        "lowered kernel {} (v{}, {} externals)",
        lowerer.kernel_name(),
        ir.v,
        ir.external_names.len()
    );
    Ok(ir)
}

struct Lowerer<'o, 'a> {
    options: &'o LowerOptions<'a>,
}

impl Lowerer<'_, '_> {
    fn kernel_name(&self) -> &str {
        self.options.kernel_name.unwrap_or(UNNAMED)
    }

    fn location(&self, span: Span) -> Location {
        Location {
            file: self.options.file_id.to_string(),
            kernel: self.kernel_name().to_string(),
            position: self.options.line_index.line_col(span.start),
            span,
        }
    }

    fn unsupported(&self, construct: &str, span: Span) -> LowerError {
        LowerError::Unsupported {
            construct: construct.to_string(),
            location: self.location(span),
        }
    }

    /// Fail unless the target version carries `tag`
    fn require(&self, tag: NodeTag, span: Span) -> Result<(), LowerError> {
        if tag.available_in(self.options.version) {
            Ok(())
        } else {
            Err(LowerError::TagNotInVersion {
                tag,
                since: tag.since(),
                version: self.options.version,
                location: self.location(span),
            })
        }
    }

    fn param(&self, param: &Param) -> Result<ParamDescriptor, LowerError> {
        match &param.pattern.kind {
            PatternKind::Ident(name) => Ok(ParamDescriptor::Identifier { name: name.clone() }),
            PatternKind::Object(props) => {
                let props = props
                    .iter()
                    .map(|prop| match prop {
                        ObjectPatternProp::KeyValue { key, value, .. } => {
                            match (key.static_name(), value.as_ident()) {
                                (Some(name), Some(alias)) if !matches!(key.kind, PropKeyKind::Computed(_)) => {
                                    Ok(DestructuredProp {
                                        name,
                                        alias: alias.to_string(),
                                    })
                                }
                                _ => Err(self.unsupported("nested parameter pattern", value.span)),
                            }
                        }
                        ObjectPatternProp::Rest(rest) => {
                            Err(self.unsupported("rest element in parameter", rest.span))
                        }
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(ParamDescriptor::Destructured { props })
            }
            PatternKind::Array(_) => Err(self.unsupported("array parameter pattern", param.span)),
            PatternKind::Assign { .. } => Err(self.unsupported("default parameter", param.span)),
            PatternKind::Rest(_) => Err(self.unsupported("rest parameter", param.span)),
        }
    }

    /// The body block, minus its directive prologue
    fn function_block(&self, block: &Block) -> Result<Statement, LowerError> {
        let start = block
            .statements
            .iter()
            .take_while(|stmt| stmt.as_directive().is_some())
            .count();
        self.statements(&block.statements[start..]).map(Statement::Block)
    }

    fn statements(&self, stmts: &[Stmt]) -> Result<Vec<Statement>, LowerError> {
        let mut out = Vec::with_capacity(stmts.len());
        for stmt in stmts {
            match &stmt.kind {
                StmtKind::VarDecl(decl) => out.extend(self.declarations(decl)?),
                StmtKind::Empty | StmtKind::TsDecl => {}
                _ => out.push(self.stmt(stmt)?),
            }
        }
        Ok(out)
    }

    fn declarations(&self, decl: &VarDecl) -> Result<Vec<Statement>, LowerError> {
        let kind = decl_kind(decl.kind);
        decl.declarators
            .iter()
            .map(|declarator| {
                let name = declarator
                    .target
                    .as_ident()
                    .ok_or_else(|| self.unsupported("destructuring declaration", declarator.target.span))?;
                Ok(Statement::Declare {
                    kind,
                    name: name.to_string(),
                    init: declarator.init.as_ref().map(|init| self.expr(init)).transpose()?,
                })
            })
            .collect()
    }

    /// A declaration that must produce exactly one statement
    fn single_declaration(&self, decl: &VarDecl) -> Result<Statement, LowerError> {
        let mut lowered = self.declarations(decl)?;
        if lowered.len() != 1 {
            return Err(self.unsupported("multiple declarators in loop head", decl.span));
        }
        Ok(lowered.remove(0))
    }

    fn stmt(&self, stmt: &Stmt) -> Result<Statement, LowerError> {
        let span = stmt.span;
        Ok(match &stmt.kind {
            StmtKind::Expr(expr) => Statement::Expr(self.expr(expr)?),
            StmtKind::VarDecl(decl) => {
                let mut lowered = self.declarations(decl)?;
                if lowered.len() == 1 {
                    lowered.remove(0)
                } else {
                    Statement::Block(lowered)
                }
            }
            StmtKind::Return(arg) => {
                Statement::Return(arg.as_ref().map(|arg| self.expr(arg)).transpose()?)
            }
            StmtKind::If {
                test,
                consequent,
                alternate,
            } => Statement::If {
                test: self.expr(test)?,
                consequent: Box::new(self.stmt(consequent)?),
                alternate: alternate
                    .as_ref()
                    .map(|alt| self.stmt(alt).map(Box::new))
                    .transpose()?,
            },
            StmtKind::For {
                init,
                test,
                update,
                body,
            } => Statement::For {
                init: match init {
                    Some(ForInit::VarDecl(decl)) => Some(Box::new(self.single_declaration(decl)?)),
                    Some(ForInit::Expr(expr)) => Some(Box::new(Statement::Expr(self.expr(expr)?))),
                    None => None,
                },
                test: test.as_ref().map(|test| self.expr(test)).transpose()?,
                update: update
                    .as_ref()
                    .map(|update| self.expr(update).map(|e| Box::new(Statement::Expr(e))))
                    .transpose()?,
                body: Box::new(self.stmt(body)?),
            },
            StmtKind::ForEach {
                kind,
                left,
                right,
                body,
            } => {
                match kind {
                    ForEachKind::Of => {}
                    ForEachKind::In => return Err(self.unsupported("for-in", span)),
                    ForEachKind::AwaitOf => return Err(self.unsupported("for-await", span)),
                }
                self.require(NodeTag::ForOf, span)?;
                let ForHead::VarDecl(decl) = left else {
                    return Err(self.unsupported("for-of without declaration", span));
                };
                let Statement::Declare {
                    kind,
                    name,
                    init: None,
                } = self.single_declaration(decl)?
                else {
                    return Err(self.unsupported("for-of declaration with initializer", decl.span));
                };
                Statement::ForOf {
                    kind,
                    name,
                    iterable: self.expr(right)?,
                    body: Box::new(self.stmt(body)?),
                }
            }
            StmtKind::While { test, body } => Statement::While {
                test: self.expr(test)?,
                body: Box::new(self.stmt(body)?),
            },
            StmtKind::Break(None) => Statement::Break,
            StmtKind::Continue(None) => Statement::Continue,
            StmtKind::Break(Some(_)) | StmtKind::Continue(Some(_)) | StmtKind::Labeled { .. } => {
                return Err(self.unsupported("label", span))
            }
            StmtKind::Block(block) => Statement::Block(self.statements(&block.statements)?),
            StmtKind::Empty | StmtKind::TsDecl => Statement::Block(Vec::new()),
            StmtKind::FnDecl(_) => return Err(self.unsupported("nested function", span)),
            StmtKind::ClassDecl(_) => return Err(self.unsupported("class", span)),
            StmtKind::DoWhile { .. } => return Err(self.unsupported("do-while", span)),
            StmtKind::Throw(_) => return Err(self.unsupported("throw", span)),
            StmtKind::Try { .. } => return Err(self.unsupported("try", span)),
            StmtKind::Switch { .. } => return Err(self.unsupported("switch", span)),
            StmtKind::Import(_) | StmtKind::Export(_) => {
                return Err(self.unsupported("module declaration", span))
            }
        })
    }

    fn exprs(&self, exprs: &[Expr]) -> Result<Vec<Expression>, LowerError> {
        exprs.iter().map(|expr| self.expr(expr)).collect()
    }

    fn expr(&self, expr: &Expr) -> Result<Expression, LowerError> {
        let span = expr.span;
        Ok(match &expr.kind {
            ExprKind::Ident(name) => Expression::Identifier(name.clone()),
            ExprKind::This => Expression::ident("this"),
            ExprKind::Literal(literal) => match literal {
                Literal::Number { raw, .. } => Expression::Numeric(raw.clone()),
                Literal::String(value) => Expression::String(value.clone()),
                Literal::Bool(value) => Expression::Bool(*value),
                Literal::Null => return Err(self.unsupported("null", span)),
                Literal::BigInt(_) => return Err(self.unsupported("bigint", span)),
                Literal::Regex { .. } => return Err(self.unsupported("regular expression", span)),
            },
            ExprKind::Template { tag, quasis, exprs } => {
                if tag.is_some() {
                    return Err(self.unsupported("tagged template", span));
                }
                if !exprs.is_empty() {
                    return Err(self.unsupported("template literal with substitutions", span));
                }
                Expression::String(quasis.concat())
            }
            ExprKind::Array(items) => Expression::Array(
                items
                    .iter()
                    .map(|item| match item {
                        Some(item) => self.expr(item),
                        None => Err(self.unsupported("array hole", span)),
                    })
                    .collect::<Result<_, _>>()?,
            ),
            ExprKind::Object(props) => Expression::Object(
                props
                    .iter()
                    .map(|prop| match &prop.kind {
                        PropKind::KeyValue { key, value } => match &key.kind {
                            PropKeyKind::Ident(name) | PropKeyKind::String(name) => {
                                Ok((name.clone(), self.expr(value)?))
                            }
                            PropKeyKind::Number(_) => {
                                let name = key.static_name().unwrap_or_default();
                                Ok((name, self.expr(value)?))
                            }
                            PropKeyKind::Private(_) | PropKeyKind::Computed(_) => {
                                Err(self.unsupported("computed object key", key.span))
                            }
                        },
                        PropKind::Shorthand { name, .. } => {
                            Ok((name.clone(), Expression::Identifier(name.clone())))
                        }
                        PropKind::Method { .. } => Err(self.unsupported("object method", prop.span)),
                        PropKind::Spread(_) => Err(self.unsupported("spread", prop.span)),
                    })
                    .collect::<Result<_, _>>()?,
            ),
            ExprKind::Function(_) => return Err(self.unsupported("nested function", span)),
            ExprKind::Class(_) => return Err(self.unsupported("class", span)),
            ExprKind::Unary { op, arg } => match op {
                UnaryOp::Typeof | UnaryOp::Void | UnaryOp::Delete => {
                    return Err(self.unsupported(op.as_str(), span))
                }
                _ => Expression::Unary {
                    op: op.as_str().to_string(),
                    arg: Box::new(self.expr(arg)?),
                },
            },
            ExprKind::Update { op, prefix, arg } => {
                let op = op.as_str().to_string();
                let arg = Box::new(self.expr(arg)?);
                if *prefix {
                    Expression::PreUpdate { op, arg }
                } else {
                    Expression::PostUpdate { op, arg }
                }
            }
            ExprKind::Binary { op, left, right } => Expression::Binary {
                lhs: Box::new(self.expr(left)?),
                op: op.as_str().to_string(),
                rhs: Box::new(self.expr(right)?),
            },
            ExprKind::Logical { op, left, right } => Expression::Logical {
                lhs: Box::new(self.expr(left)?),
                op: op.as_str().to_string(),
                rhs: Box::new(self.expr(right)?),
            },
            ExprKind::Assign { op, target, value } => {
                if matches!(target.unwrap_ts().kind, ExprKind::Array(_) | ExprKind::Object(_)) {
                    return Err(self.unsupported("destructuring assignment", target.span));
                }
                if matches!(op, AssignOp::Logical(_)) {
                    return Err(self.unsupported("logical assignment", span));
                }
                Expression::Assignment {
                    lhs: Box::new(self.expr(target)?),
                    op: op.as_str(),
                    rhs: Box::new(self.expr(value)?),
                }
            }
            ExprKind::Conditional {
                test,
                consequent,
                alternate,
            } => {
                self.require(NodeTag::Conditional, span)?;
                Expression::Conditional {
                    test: Box::new(self.expr(test)?),
                    consequent: Box::new(self.expr(consequent)?),
                    alternate: Box::new(self.expr(alternate)?),
                }
            }
            ExprKind::Call {
                callee,
                args,
                optional,
            } => {
                if *optional {
                    return Err(self.unsupported("optional call", span));
                }
                if is_std_ref(callee) && args.len() == 1 {
                    self.require(NodeTag::AddressOf, span)?;
                    return Ok(Expression::AddressOf(Box::new(self.expr(&args[0])?)));
                }
                Expression::Call {
                    callee: Box::new(self.expr(callee)?),
                    args: self.exprs(args)?,
                }
            }
            ExprKind::Member {
                object,
                property,
                optional,
            } => {
                if *optional {
                    return Err(self.unsupported("optional chaining", span));
                }
                match property {
                    MemberProp::Ident { name, .. } if name == "$" => {
                        self.require(NodeTag::Deref, span)?;
                        Expression::Deref(Box::new(self.expr(object)?))
                    }
                    MemberProp::Ident { name, .. } => Expression::MemberAccess {
                        object: Box::new(self.expr(object)?),
                        property: name.clone(),
                    },
                    MemberProp::Computed(index) => Expression::IndexAccess {
                        object: Box::new(self.expr(object)?),
                        index: Box::new(self.expr(index)?),
                    },
                    MemberProp::Private { .. } => return Err(self.unsupported("private field", span)),
                }
            }
            ExprKind::TsCast(inner) => self.expr(inner)?,
            ExprKind::New { .. } => return Err(self.unsupported("new", span)),
            ExprKind::Sequence(_) => return Err(self.unsupported("sequence expression", span)),
            ExprKind::Spread(_) => return Err(self.unsupported("spread", span)),
            ExprKind::Await(_) => return Err(self.unsupported("await", span)),
            ExprKind::Yield { .. } => return Err(self.unsupported("yield", span)),
            ExprKind::MetaProperty(name) => return Err(self.unsupported(name, span)),
        })
    }
}

fn decl_kind(kind: VarKind) -> DeclKind {
    match kind {
        VarKind::Let => DeclKind::Let,
        VarKind::Const => DeclKind::Const,
        VarKind::Var => DeclKind::Var,
    }
}

/// `std.ref`
fn is_std_ref(callee: &Expr) -> bool {
    match &callee.unwrap_ts().kind {
        ExprKind::Member {
            object,
            property: MemberProp::Ident { name, .. },
            optional: false,
        } => name == "ref" && object.as_ident() == Some("std"),
        _ => false,
    }
}
