//! Host AST normalization
//!
//! Bundlers hand us their own trees as JSON. Each dialect is converted into
//! the `tgpu-ast` node shapes at the boundary, so the pipeline only ever sees
//! one contract. Offsets in host trees count UTF-16 code units and are
//! converted to byte offsets into the source.

pub mod babel;
pub mod estree;

use serde_json::Value;
use tgpu_ast::*;

use crate::NormalizeError;

type Result<T> = std::result::Result<T, NormalizeError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Dialect {
    Estree,
    Babel,
}

impl Dialect {
    fn name(self) -> &'static str {
        match self {
            Dialect::Estree => "ESTree",
            Dialect::Babel => "Babel",
        }
    }
}

/// A JSON node with its type and converted span
#[derive(Clone, Copy)]
pub(crate) struct Node<'v> {
    value: &'v Value,
    ty: &'v str,
    span: Span,
}

/// UTF-16 offset to byte offset table; `None` for ASCII sources
struct OffsetMap {
    table: Option<Vec<usize>>,
}

impl OffsetMap {
    fn new(source: &str) -> Self {
        if source.is_ascii() {
            return Self { table: None };
        }
        let mut table = Vec::with_capacity(source.len() + 1);
        for (byte, c) in source.char_indices() {
            for _ in 0..c.len_utf16() {
                table.push(byte);
            }
        }
        table.push(source.len());
        Self { table: Some(table) }
    }

    fn byte(&self, offset: usize) -> usize {
        match &self.table {
            None => offset,
            Some(table) => table.get(offset).copied().unwrap_or_else(|| table.len() - 1),
        }
    }
}

pub(crate) struct Normalizer<'s> {
    dialect: Dialect,
    source: &'s str,
    offsets: OffsetMap,
}

impl<'s> Normalizer<'s> {
    pub(crate) fn new(dialect: Dialect, source: &'s str) -> Self {
        Self {
            dialect,
            source,
            offsets: OffsetMap::new(source),
        }
    }

    // ----- node access -------------------------------------------------

    fn node<'v>(&self, value: &'v Value) -> Result<Node<'v>> {
        let ty = value
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| NormalizeError::InvalidField {
                dialect: self.dialect.name(),
                node_type: "<node>".to_string(),
                field: "type".to_string(),
                span: Span::dummy(),
            })?;
        let position = |field: &str| value.get(field).and_then(Value::as_u64);
        let range = value.get("range").and_then(Value::as_array);
        let (start, end) = match (position("start"), position("end"), range) {
            (Some(start), Some(end), _) => (start, end),
            (_, _, Some(range)) if range.len() == 2 => {
                match (range[0].as_u64(), range[1].as_u64()) {
                    (Some(start), Some(end)) => (start, end),
                    _ => return Err(self.invalid_raw(ty, "range")),
                }
            }
            _ => return Err(self.missing_raw(ty, "start", Span::dummy())),
        };
        let span = Span::new(
            self.offsets.byte(start as usize),
            self.offsets.byte(end as usize),
        );
        Ok(Node { value, ty, span })
    }

    fn field<'v>(&self, node: &Node<'v>, name: &str) -> Result<&'v Value> {
        self.opt(node, name)
            .ok_or_else(|| self.missing_raw(node.ty, name, node.span))
    }

    /// Field value; absent and `null` are both `None`
    fn opt<'v>(&self, node: &Node<'v>, name: &str) -> Option<&'v Value> {
        node.value.get(name).filter(|v| !v.is_null())
    }

    fn child<'v>(&self, node: &Node<'v>, name: &str) -> Result<Node<'v>> {
        self.node(self.field(node, name)?)
    }

    fn str_field<'v>(&self, node: &Node<'v>, name: &str) -> Result<&'v str> {
        self.field(node, name)?
            .as_str()
            .ok_or_else(|| self.invalid(node, name))
    }

    fn bool_field(&self, node: &Node<'_>, name: &str) -> bool {
        node.value.get(name).and_then(Value::as_bool).unwrap_or(false)
    }

    fn array<'v>(&self, node: &Node<'v>, name: &str) -> Result<&'v [Value]> {
        match node.value.get(name) {
            None | Some(Value::Null) => Ok(&[][..]),
            Some(Value::Array(items)) => Ok(items.as_slice()),
            Some(_) => Err(self.invalid(node, name)),
        }
    }

    fn unknown(&self, node: &Node<'_>) -> NormalizeError {
        NormalizeError::UnknownNode {
            dialect: self.dialect.name(),
            node_type: node.ty.to_string(),
            span: node.span,
        }
    }

    fn invalid(&self, node: &Node<'_>, field: &str) -> NormalizeError {
        NormalizeError::InvalidField {
            dialect: self.dialect.name(),
            node_type: node.ty.to_string(),
            field: field.to_string(),
            span: node.span,
        }
    }

    fn invalid_raw(&self, ty: &str, field: &str) -> NormalizeError {
        NormalizeError::InvalidField {
            dialect: self.dialect.name(),
            node_type: ty.to_string(),
            field: field.to_string(),
            span: Span::dummy(),
        }
    }

    fn missing_raw(&self, ty: &str, field: &str, span: Span) -> NormalizeError {
        NormalizeError::MissingField {
            dialect: self.dialect.name(),
            node_type: ty.to_string(),
            field: field.to_string(),
            span,
        }
    }

    fn ident(&self, node: &Node<'_>) -> Result<Ident> {
        Ok(Ident::new(self.str_field(node, "name")?, node.span))
    }

    // ----- program and statements --------------------------------------

    pub(crate) fn program(&self, value: &Value) -> Result<Program> {
        let node = self.node(value)?;
        if node.ty != "Program" {
            return Err(self.unknown(&node));
        }
        let body = self.statement_list(&node)?;
        Ok(Program {
            body,
            span: node.span,
        })
    }

    /// Babel directives followed by the `body` statements
    fn statement_list(&self, node: &Node<'_>) -> Result<Vec<Stmt>> {
        let mut body = match self.dialect {
            Dialect::Babel => self.babel_directives(node)?,
            Dialect::Estree => Vec::new(),
        };
        for stmt in self.array(node, "body")? {
            body.push(self.stmt(stmt)?);
        }
        Ok(body)
    }

    fn block(&self, value: &Value) -> Result<Block> {
        let node = self.node(value)?;
        if node.ty != "BlockStatement" {
            return Err(self.unknown(&node));
        }
        Ok(Block {
            statements: self.statement_list(&node)?,
            span: node.span,
        })
    }

    fn stmt(&self, value: &Value) -> Result<Stmt> {
        let node = self.node(value)?;
        let kind = match node.ty {
            "ExpressionStatement" => StmtKind::Expr(self.expr(self.field(&node, "expression")?)?),
            "VariableDeclaration" => StmtKind::VarDecl(self.var_decl(&node)?),
            "FunctionDeclaration" => StmtKind::FnDecl(self.function(&node, None)?),
            "ClassDeclaration" => StmtKind::ClassDecl(self.class(&node)?),
            "ReturnStatement" => StmtKind::Return(self.opt_expr(&node, "argument")?),
            "IfStatement" => StmtKind::If {
                test: self.expr(self.field(&node, "test")?)?,
                consequent: Box::new(self.stmt(self.field(&node, "consequent")?)?),
                alternate: self
                    .opt(&node, "alternate")
                    .map(|alt| self.stmt(alt).map(Box::new))
                    .transpose()?,
            },
            "ForStatement" => StmtKind::For {
                init: match self.opt(&node, "init") {
                    None => None,
                    Some(init) => {
                        let init_node = self.node(init)?;
                        Some(if init_node.ty == "VariableDeclaration" {
                            ForInit::VarDecl(self.var_decl(&init_node)?)
                        } else {
                            ForInit::Expr(self.expr(init)?)
                        })
                    }
                },
                test: self.opt_expr(&node, "test")?,
                update: self.opt_expr(&node, "update")?,
                body: Box::new(self.stmt(self.field(&node, "body")?)?),
            },
            "ForInStatement" | "ForOfStatement" => {
                let kind = match (node.ty, self.bool_field(&node, "await")) {
                    ("ForInStatement", _) => ForEachKind::In,
                    (_, true) => ForEachKind::AwaitOf,
                    (_, false) => ForEachKind::Of,
                };
                let left = self.child(&node, "left")?;
                let left = if left.ty == "VariableDeclaration" {
                    ForHead::VarDecl(self.var_decl(&left)?)
                } else {
                    ForHead::Target(self.target_expr(left.value)?)
                };
                StmtKind::ForEach {
                    kind,
                    left,
                    right: self.expr(self.field(&node, "right")?)?,
                    body: Box::new(self.stmt(self.field(&node, "body")?)?),
                }
            }
            "WhileStatement" => StmtKind::While {
                test: self.expr(self.field(&node, "test")?)?,
                body: Box::new(self.stmt(self.field(&node, "body")?)?),
            },
            "DoWhileStatement" => StmtKind::DoWhile {
                body: Box::new(self.stmt(self.field(&node, "body")?)?),
                test: self.expr(self.field(&node, "test")?)?,
            },
            "BreakStatement" => StmtKind::Break(self.opt_label(&node)?),
            "ContinueStatement" => StmtKind::Continue(self.opt_label(&node)?),
            "BlockStatement" => StmtKind::Block(self.block(node.value)?),
            "EmptyStatement" | "DebuggerStatement" => StmtKind::Empty,
            "ThrowStatement" => StmtKind::Throw(self.expr(self.field(&node, "argument")?)?),
            "TryStatement" => StmtKind::Try {
                block: self.block(self.field(&node, "block")?)?,
                handler: match self.opt(&node, "handler") {
                    None => None,
                    Some(handler) => {
                        let handler = self.node(handler)?;
                        Some(CatchClause {
                            param: self
                                .opt(&handler, "param")
                                .map(|p| self.pattern(p))
                                .transpose()?,
                            body: self.block(self.field(&handler, "body")?)?,
                            span: handler.span,
                        })
                    }
                },
                finalizer: self
                    .opt(&node, "finalizer")
                    .map(|f| self.block(f))
                    .transpose()?,
            },
            "SwitchStatement" => StmtKind::Switch {
                discriminant: self.expr(self.field(&node, "discriminant")?)?,
                cases: self
                    .array(&node, "cases")?
                    .iter()
                    .map(|case| {
                        let case = self.node(case)?;
                        Ok(SwitchCase {
                            test: self.opt_expr(&case, "test")?,
                            body: self
                                .array(&case, "consequent")?
                                .iter()
                                .map(|s| self.stmt(s))
                                .collect::<Result<_>>()?,
                            span: case.span,
                        })
                    })
                    .collect::<Result<_>>()?,
            },
            "LabeledStatement" => StmtKind::Labeled {
                label: self.ident(&self.child(&node, "label")?)?,
                body: Box::new(self.stmt(self.field(&node, "body")?)?),
            },
            "ImportDeclaration" => StmtKind::Import(self.import(&node)?),
            "ExportNamedDeclaration" => StmtKind::Export(self.export_named(&node)?),
            "ExportDefaultDeclaration" => {
                let decl = self.child(&node, "declaration")?;
                StmtKind::Export(match decl.ty {
                    "FunctionDeclaration" | "ClassDeclaration" => {
                        ExportDecl::DefaultDecl(Box::new(self.stmt(decl.value)?))
                    }
                    ty if is_ts_declaration(ty) => ExportDecl::DefaultDecl(Box::new(Stmt::new(
                        StmtKind::TsDecl,
                        decl.span,
                    ))),
                    _ => ExportDecl::DefaultExpr(self.expr(decl.value)?),
                })
            }
            "ExportAllDeclaration" => StmtKind::Export(ExportDecl::All {
                alias: match self.opt(&node, "exported") {
                    Some(exported) => Some(self.module_name(&self.node(exported)?)?),
                    None => None,
                },
                source: self.source_string(&node)?,
            }),
            ty if is_ts_declaration(ty) => StmtKind::TsDecl,
            _ => return Err(self.unknown(&node)),
        };
        Ok(Stmt::new(kind, node.span))
    }

    fn opt_label(&self, node: &Node<'_>) -> Result<Option<Ident>> {
        self.opt(node, "label")
            .map(|label| self.ident(&self.node(label)?))
            .transpose()
    }

    fn var_decl(&self, node: &Node<'_>) -> Result<VarDecl> {
        let kind = match self.str_field(node, "kind")? {
            "var" => VarKind::Var,
            "let" => VarKind::Let,
            "const" => VarKind::Const,
            _ => return Err(self.invalid(node, "kind")),
        };
        let declarators = self
            .array(node, "declarations")?
            .iter()
            .map(|declarator| {
                let declarator = self.node(declarator)?;
                Ok(VarDeclarator {
                    target: self.pattern(self.field(&declarator, "id")?)?,
                    init: self.opt_expr(&declarator, "init")?,
                    span: declarator.span,
                })
            })
            .collect::<Result<_>>()?;
        Ok(VarDecl {
            kind,
            declarators,
            span: self.without_semicolon(node.span),
        })
    }

    /// Declaration spans stop before the terminating `;`
    fn without_semicolon(&self, span: Span) -> Span {
        let Some(text) = self.source.get(span.start..span.end) else {
            return span;
        };
        let trimmed = text.strip_suffix(';').unwrap_or(text).trim_end();
        Span::new(span.start, span.start + trimmed.len())
    }

    fn source_string(&self, node: &Node<'_>) -> Result<String> {
        let source = self.child(node, "source")?;
        self.str_field(&source, "value").map(str::to_string)
    }

    /// Identifier or string literal naming an import/export binding
    fn module_name(&self, node: &Node<'_>) -> Result<String> {
        match node.ty {
            "Identifier" => Ok(self.str_field(node, "name")?.to_string()),
            _ => Ok(self.str_field(node, "value")?.to_string()),
        }
    }

    fn import(&self, node: &Node<'_>) -> Result<ImportDecl> {
        let type_only = self.opt(node, "importKind").and_then(Value::as_str) == Some("type");
        let mut specifiers = Vec::new();
        for specifier in self.array(node, "specifiers")? {
            let specifier = self.node(specifier)?;
            let local = self.ident(&self.child(&specifier, "local")?)?;
            specifiers.push(match specifier.ty {
                "ImportDefaultSpecifier" => ImportSpecifier::Default { local },
                "ImportNamespaceSpecifier" => ImportSpecifier::Namespace { local },
                "ImportSpecifier" => ImportSpecifier::Named {
                    imported: self.module_name(&self.child(&specifier, "imported")?)?,
                    local,
                    type_only: self.opt(&specifier, "importKind").and_then(Value::as_str)
                        == Some("type"),
                },
                _ => return Err(self.unknown(&specifier)),
            });
        }
        Ok(ImportDecl {
            specifiers,
            source: self.source_string(node)?,
            type_only,
            span: node.span,
        })
    }

    fn export_named(&self, node: &Node<'_>) -> Result<ExportDecl> {
        if let Some(decl) = self.opt(node, "declaration") {
            return Ok(ExportDecl::Decl(Box::new(self.stmt(decl)?)));
        }
        let mut specifiers = Vec::new();
        for specifier in self.array(node, "specifiers")? {
            let specifier = self.node(specifier)?;
            let exported = self.module_name(&self.child(&specifier, "exported")?)?;
            let local = match self.opt(&specifier, "local") {
                Some(local) => {
                    let local = self.node(local)?;
                    Ident::new(self.module_name(&local)?, local.span)
                }
                // `export * as ns from` in Babel's specifier form
                None => Ident::new(exported.clone(), specifier.span),
            };
            specifiers.push(ExportSpecifier { local, exported });
        }
        let source = match self.opt(node, "source") {
            Some(_) => Some(self.source_string(node)?),
            None => None,
        };
        Ok(ExportDecl::Named { specifiers, source })
    }

    // ----- functions and classes ---------------------------------------

    /// Function-shaped node. `start` overrides the span start for methods,
    /// whose function text begins at the key.
    fn function(&self, node: &Node<'_>, start: Option<usize>) -> Result<Function> {
        let name = self
            .opt(node, "id")
            .map(|id| self.ident(&self.node(id)?))
            .transpose()?;
        let params = self
            .array(node, "params")?
            .iter()
            .map(|param| {
                let pattern = self.pattern(param)?;
                let span = pattern.span;
                Ok(Param {
                    pattern,
                    type_annotation: None,
                    span,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        let body_node = self.child(node, "body")?;
        let body = if body_node.ty == "BlockStatement" {
            FunctionBody::Block(self.block(body_node.value)?)
        } else {
            FunctionBody::Expr(Box::new(self.expr(body_node.value)?))
        };
        let start = start.unwrap_or(node.span.start);
        let params_span = self.params_span(start, &params, body_node.span.start);
        Ok(Function {
            name,
            params,
            body,
            is_arrow: node.ty == "ArrowFunctionExpression",
            is_async: self.bool_field(node, "async"),
            is_generator: self.bool_field(node, "generator"),
            params_span,
            span: Span::new(start, node.span.end),
        })
    }

    /// Host trees do not record the parenthesized parameter list, so it is
    /// recovered from the source around the parameters
    fn params_span(&self, start: usize, params: &[Param], body_start: usize) -> Span {
        let search_end = params.first().map_or(body_start, |p| p.span.start);
        let open = self
            .source
            .get(start..search_end)
            .and_then(|head| head.rfind('('))
            .map(|i| start + i);
        match open {
            Some(open) => {
                let after = params.last().map_or(open + 1, |p| p.span.end);
                let close = self
                    .source
                    .get(after..body_start)
                    .and_then(|tail| tail.find(')'))
                    .map_or(body_start, |i| after + i + 1);
                Span::new(open, close)
            }
            // `x => x`
            None => params
                .first()
                .map_or(Span::new(body_start, body_start), |p| p.span),
        }
    }

    fn class(&self, node: &Node<'_>) -> Result<Class> {
        let name = self
            .opt(node, "id")
            .map(|id| self.ident(&self.node(id)?))
            .transpose()?;
        let body = self.child(node, "body")?;
        let mut members = Vec::new();
        for member in self.array(&body, "body")? {
            let member = self.node(member)?;
            let converted = match self.dialect {
                Dialect::Estree => self.estree_class_member(&member)?,
                Dialect::Babel => self.babel_class_member(&member)?,
            };
            members.extend(converted);
        }
        Ok(Class {
            name,
            super_class: self.opt_expr(node, "superClass")?,
            members,
            span: node.span,
        })
    }

    fn static_block(&self, member: &Node<'_>) -> Result<ClassMember> {
        Ok(ClassMember {
            kind: ClassMemberKind::StaticBlock(Block {
                statements: self.statement_list(member)?,
                span: member.span,
            }),
            is_static: true,
            span: member.span,
        })
    }

    fn method_kind(&self, node: &Node<'_>) -> Result<MethodKind> {
        match self.opt(node, "kind").and_then(Value::as_str) {
            None | Some("method") | Some("init") => Ok(MethodKind::Method),
            Some("get") => Ok(MethodKind::Getter),
            Some("set") => Ok(MethodKind::Setter),
            Some("constructor") => Ok(MethodKind::Constructor),
            Some(_) => Err(self.invalid(node, "kind")),
        }
    }

    // ----- keys, patterns and expressions ------------------------------

    fn prop_key(&self, key: &Value, computed: bool) -> Result<PropKey> {
        let node = self.node(key)?;
        if computed {
            return Ok(PropKey {
                kind: PropKeyKind::Computed(Box::new(self.expr(key)?)),
                span: self.widen_brackets(node.span),
            });
        }
        let kind = match node.ty {
            "Identifier" => PropKeyKind::Ident(self.str_field(&node, "name")?.to_string()),
            "PrivateIdentifier" => PropKeyKind::Private(self.str_field(&node, "name")?.to_string()),
            "PrivateName" => {
                let id = self.child(&node, "id")?;
                PropKeyKind::Private(self.str_field(&id, "name")?.to_string())
            }
            _ => match self.literal(&node)? {
                Some(Literal::String(value)) => PropKeyKind::String(value),
                Some(Literal::Number { value, .. }) => PropKeyKind::Number(value),
                _ => return Err(self.invalid(&node, "key")),
            },
        };
        Ok(PropKey {
            kind,
            span: node.span,
        })
    }

    /// Extend a computed key's span over its surrounding `[` `]`
    fn widen_brackets(&self, span: Span) -> Span {
        let before = self.source.get(..span.start).unwrap_or("").trim_end();
        let after_text = self.source.get(span.end..).unwrap_or("");
        let after = after_text.trim_start();
        match (before.strip_suffix('['), after.strip_prefix(']')) {
            (Some(open), Some(_)) => Span::new(
                open.len(),
                span.end + (after_text.len() - after.len()) + 1,
            ),
            _ => span,
        }
    }

    fn pattern(&self, value: &Value) -> Result<Pattern> {
        let node = self.node(value)?;
        let kind = match node.ty {
            "Identifier" => PatternKind::Ident(self.str_field(&node, "name")?.to_string()),
            "ObjectPattern" => {
                let mut props = Vec::new();
                for prop in self.array(&node, "properties")? {
                    let prop = self.node(prop)?;
                    match prop.ty {
                        "RestElement" => props.push(ObjectPatternProp::Rest(
                            self.pattern(self.field(&prop, "argument")?)?,
                        )),
                        "Property" | "ObjectProperty" => props.push(ObjectPatternProp::KeyValue {
                            key: self.prop_key(
                                self.field(&prop, "key")?,
                                self.bool_field(&prop, "computed"),
                            )?,
                            value: self.pattern(self.field(&prop, "value")?)?,
                            shorthand: self.bool_field(&prop, "shorthand"),
                        }),
                        _ => return Err(self.unknown(&prop)),
                    }
                }
                PatternKind::Object(props)
            }
            "ArrayPattern" => PatternKind::Array(
                self.array(&node, "elements")?
                    .iter()
                    .map(|e| if e.is_null() { Ok(None) } else { self.pattern(e).map(Some) })
                    .collect::<Result<_>>()?,
            ),
            "AssignmentPattern" => PatternKind::Assign {
                target: Box::new(self.pattern(self.field(&node, "left")?)?),
                default: Box::new(self.expr(self.field(&node, "right")?)?),
            },
            "RestElement" => PatternKind::Rest(Box::new(self.pattern(self.field(&node, "argument")?)?)),
            "TSParameterProperty" => return self.pattern(self.field(&node, "parameter")?),
            _ => return Err(self.unknown(&node)),
        };
        Ok(Pattern {
            kind,
            span: node.span,
        })
    }

    /// Assignment and for-in/of targets, where patterns appear as
    /// expressions
    fn target_expr(&self, value: &Value) -> Result<Expr> {
        let node = self.node(value)?;
        let kind = match node.ty {
            "ObjectPattern" => {
                let mut props = Vec::new();
                for prop in self.array(&node, "properties")? {
                    let prop = self.node(prop)?;
                    let kind = match prop.ty {
                        "RestElement" => {
                            PropKind::Spread(self.target_expr(self.field(&prop, "argument")?)?)
                        }
                        _ if self.bool_field(&prop, "shorthand") => {
                            let key = self.child(&prop, "key")?;
                            PropKind::Shorthand {
                                name: self.str_field(&key, "name")?.to_string(),
                                span: key.span,
                            }
                        }
                        _ => PropKind::KeyValue {
                            key: self.prop_key(
                                self.field(&prop, "key")?,
                                self.bool_field(&prop, "computed"),
                            )?,
                            value: self.target_expr(self.field(&prop, "value")?)?,
                        },
                    };
                    props.push(Prop {
                        kind,
                        span: prop.span,
                    });
                }
                ExprKind::Object(props)
            }
            "ArrayPattern" => ExprKind::Array(
                self.array(&node, "elements")?
                    .iter()
                    .map(|e| if e.is_null() { Ok(None) } else { self.target_expr(e).map(Some) })
                    .collect::<Result<_>>()?,
            ),
            "AssignmentPattern" => ExprKind::Assign {
                op: AssignOp::Assign,
                target: Box::new(self.target_expr(self.field(&node, "left")?)?),
                value: Box::new(self.expr(self.field(&node, "right")?)?),
            },
            "RestElement" => ExprKind::Spread(Box::new(self.target_expr(self.field(&node, "argument")?)?)),
            _ => return self.expr(value),
        };
        Ok(Expr::new(kind, node.span))
    }

    fn opt_expr(&self, node: &Node<'_>, name: &str) -> Result<Option<Expr>> {
        self.opt(node, name).map(|v| self.expr(v)).transpose()
    }

    fn exprs(&self, node: &Node<'_>, name: &str) -> Result<Vec<Expr>> {
        self.array(node, name)?.iter().map(|v| self.expr(v)).collect()
    }

    fn expr(&self, value: &Value) -> Result<Expr> {
        let node = self.node(value)?;
        if let Some(literal) = self.literal(&node)? {
            return Ok(Expr::new(ExprKind::Literal(literal), node.span));
        }
        let kind = match node.ty {
            "Identifier" => ExprKind::Ident(self.str_field(&node, "name")?.to_string()),
            "ThisExpression" => ExprKind::This,
            "Super" => ExprKind::Ident("super".to_string()),
            "TemplateLiteral" => {
                let (quasis, exprs) = self.template(&node)?;
                ExprKind::Template {
                    tag: None,
                    quasis,
                    exprs,
                }
            }
            "TaggedTemplateExpression" => {
                let (quasis, exprs) = self.template(&self.child(&node, "quasi")?)?;
                ExprKind::Template {
                    tag: Some(Box::new(self.expr(self.field(&node, "tag")?)?)),
                    quasis,
                    exprs,
                }
            }
            "ArrayExpression" => ExprKind::Array(
                self.array(&node, "elements")?
                    .iter()
                    .map(|e| if e.is_null() { Ok(None) } else { self.expr(e).map(Some) })
                    .collect::<Result<_>>()?,
            ),
            "ObjectExpression" => {
                let mut props = Vec::new();
                for prop in self.array(&node, "properties")? {
                    let prop = self.node(prop)?;
                    let kind = match (self.dialect, prop.ty) {
                        (_, "SpreadElement") => {
                            PropKind::Spread(self.expr(self.field(&prop, "argument")?)?)
                        }
                        (Dialect::Estree, _) => self.estree_property(&prop)?,
                        (Dialect::Babel, _) => self.babel_property(&prop)?,
                    };
                    props.push(Prop {
                        kind,
                        span: prop.span,
                    });
                }
                ExprKind::Object(props)
            }
            "FunctionExpression" | "ArrowFunctionExpression" => {
                ExprKind::Function(Box::new(self.function(&node, None)?))
            }
            "ClassExpression" => ExprKind::Class(Box::new(self.class(&node)?)),
            "UnaryExpression" => ExprKind::Unary {
                op: UnaryOp::from_str(self.str_field(&node, "operator")?)
                    .ok_or_else(|| self.invalid(&node, "operator"))?,
                arg: Box::new(self.expr(self.field(&node, "argument")?)?),
            },
            "UpdateExpression" => ExprKind::Update {
                op: match self.str_field(&node, "operator")? {
                    "++" => UpdateOp::Inc,
                    "--" => UpdateOp::Dec,
                    _ => return Err(self.invalid(&node, "operator")),
                },
                prefix: self.bool_field(&node, "prefix"),
                arg: Box::new(self.expr(self.field(&node, "argument")?)?),
            },
            "BinaryExpression" => ExprKind::Binary {
                op: BinaryOp::from_str(self.str_field(&node, "operator")?)
                    .ok_or_else(|| self.invalid(&node, "operator"))?,
                left: Box::new(self.binary_left(self.field(&node, "left")?)?),
                right: Box::new(self.expr(self.field(&node, "right")?)?),
            },
            "LogicalExpression" => ExprKind::Logical {
                op: LogicalOp::from_str(self.str_field(&node, "operator")?)
                    .ok_or_else(|| self.invalid(&node, "operator"))?,
                left: Box::new(self.expr(self.field(&node, "left")?)?),
                right: Box::new(self.expr(self.field(&node, "right")?)?),
            },
            "AssignmentExpression" => ExprKind::Assign {
                op: AssignOp::from_str(self.str_field(&node, "operator")?)
                    .ok_or_else(|| self.invalid(&node, "operator"))?,
                target: Box::new(self.target_expr(self.field(&node, "left")?)?),
                value: Box::new(self.expr(self.field(&node, "right")?)?),
            },
            "ConditionalExpression" => ExprKind::Conditional {
                test: Box::new(self.expr(self.field(&node, "test")?)?),
                consequent: Box::new(self.expr(self.field(&node, "consequent")?)?),
                alternate: Box::new(self.expr(self.field(&node, "alternate")?)?),
            },
            "CallExpression" | "OptionalCallExpression" => {
                let callee = self.child(&node, "callee")?;
                let callee = if callee.ty == "Import" {
                    Expr::new(ExprKind::MetaProperty("import".to_string()), callee.span)
                } else {
                    self.expr(callee.value)?
                };
                ExprKind::Call {
                    callee: Box::new(callee),
                    args: self.exprs(&node, "arguments")?,
                    optional: self.bool_field(&node, "optional"),
                }
            }
            "ImportExpression" => {
                let source = self.expr(self.field(&node, "source")?)?;
                let keyword = Span::new(node.span.start, node.span.start + "import".len());
                ExprKind::Call {
                    callee: Box::new(Expr::new(ExprKind::MetaProperty("import".to_string()), keyword)),
                    args: vec![source],
                    optional: false,
                }
            }
            "NewExpression" => ExprKind::New {
                callee: Box::new(self.expr(self.field(&node, "callee")?)?),
                args: self.exprs(&node, "arguments")?,
            },
            "MemberExpression" | "OptionalMemberExpression" => {
                let property = self.child(&node, "property")?;
                let property = if self.bool_field(&node, "computed") {
                    MemberProp::Computed(Box::new(self.expr(property.value)?))
                } else {
                    match self.prop_key(property.value, false)?.kind {
                        PropKeyKind::Ident(name) => MemberProp::Ident {
                            name,
                            span: property.span,
                        },
                        PropKeyKind::Private(name) => MemberProp::Private {
                            name,
                            span: property.span,
                        },
                        _ => return Err(self.invalid(&node, "property")),
                    }
                };
                ExprKind::Member {
                    object: Box::new(self.expr(self.field(&node, "object")?)?),
                    property,
                    optional: self.bool_field(&node, "optional"),
                }
            }
            "ChainExpression" | "ParenthesizedExpression" => {
                return self.expr(self.field(&node, "expression")?)
            }
            "SequenceExpression" => ExprKind::Sequence(self.exprs(&node, "expressions")?),
            "SpreadElement" => ExprKind::Spread(Box::new(self.expr(self.field(&node, "argument")?)?)),
            "AwaitExpression" => ExprKind::Await(Box::new(self.expr(self.field(&node, "argument")?)?)),
            "YieldExpression" => ExprKind::Yield {
                arg: self.opt_expr(&node, "argument")?.map(Box::new),
                delegate: self.bool_field(&node, "delegate"),
            },
            "MetaProperty" => {
                let meta = self.child(&node, "meta")?;
                let property = self.child(&node, "property")?;
                ExprKind::MetaProperty(format!(
                    "{}.{}",
                    self.str_field(&meta, "name")?,
                    self.str_field(&property, "name")?
                ))
            }
            "TSAsExpression" | "TSSatisfiesExpression" | "TSNonNullExpression"
            | "TSTypeAssertion" | "TSInstantiationExpression" => {
                ExprKind::TsCast(Box::new(self.expr(self.field(&node, "expression")?)?))
            }
            _ => return Err(self.unknown(&node)),
        };
        Ok(Expr::new(kind, node.span))
    }

    /// `#field in obj` puts a private name on the left
    fn binary_left(&self, value: &Value) -> Result<Expr> {
        let node = self.node(value)?;
        match node.ty {
            "PrivateIdentifier" | "PrivateName" => {
                let key = self.prop_key(value, false)?;
                let name = key.static_name().unwrap_or_default();
                Ok(Expr::new(ExprKind::Ident(name), node.span))
            }
            _ => self.expr(value),
        }
    }

    fn template(&self, node: &Node<'_>) -> Result<(Vec<String>, Vec<Expr>)> {
        let quasis = self
            .array(node, "quasis")?
            .iter()
            .map(|quasi| {
                let quasi = self.node(quasi)?;
                let value = self.field(&quasi, "value")?;
                Ok(value
                    .get("cooked")
                    .and_then(Value::as_str)
                    .or_else(|| value.get("raw").and_then(Value::as_str))
                    .unwrap_or_default()
                    .to_string())
            })
            .collect::<Result<_>>()?;
        Ok((quasis, self.exprs(node, "expressions")?))
    }

    /// Literal nodes of either dialect; `None` when `node` is not a literal
    fn literal(&self, node: &Node<'_>) -> Result<Option<Literal>> {
        match self.dialect {
            Dialect::Estree => self.estree_literal(node),
            Dialect::Babel => self.babel_literal(node),
        }
    }

    fn number(&self, node: &Node<'_>, value: f64, raw: Option<&str>) -> Literal {
        let raw = raw
            .map(str::to_string)
            .or_else(|| self.source.get(node.span.start..node.span.end).map(str::to_string))
            .unwrap_or_else(|| value.to_string());
        Literal::Number { value, raw }
    }
}

fn is_ts_declaration(ty: &str) -> bool {
    matches!(
        ty,
        "TSTypeAliasDeclaration"
            | "TSInterfaceDeclaration"
            | "TSEnumDeclaration"
            | "TSModuleDeclaration"
            | "TSDeclareFunction"
            | "TSImportEqualsDeclaration"
            | "TSExportAssignment"
            | "TSNamespaceExportDeclaration"
    )
}
