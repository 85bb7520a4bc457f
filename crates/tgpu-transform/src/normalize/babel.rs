//! Babel AST input

use serde_json::Value;
use tgpu_ast::*;

use super::{Dialect, Node, Normalizer, Result};

/// Convert a Babel `File` (or bare `Program`) for `source` into the
/// internal AST
pub fn file(value: &Value, source: &str) -> Result<Program> {
    let normalizer = Normalizer::new(Dialect::Babel, source);
    let node = normalizer.node(value)?;
    if node.ty == "File" {
        normalizer.program(normalizer.field(&node, "program")?)
    } else {
        normalizer.program(value)
    }
}

impl Normalizer<'_> {
    /// Babel keeps prologue directives apart from the statement list
    pub(super) fn babel_directives(&self, node: &Node<'_>) -> Result<Vec<Stmt>> {
        let mut statements = Vec::new();
        for directive in self.array(node, "directives")? {
            let directive = self.node(directive)?;
            let literal = self.child(&directive, "value")?;
            let value = self.str_field(&literal, "value")?.to_string();
            statements.push(Stmt::new(
                StmtKind::Expr(Expr::new(ExprKind::Literal(Literal::String(value)), literal.span)),
                directive.span,
            ));
        }
        Ok(statements)
    }

    pub(super) fn babel_literal(&self, node: &Node<'_>) -> Result<Option<Literal>> {
        let literal = match node.ty {
            "StringLiteral" => Literal::String(self.str_field(node, "value")?.to_string()),
            "NumericLiteral" => {
                let value = self
                    .field(node, "value")?
                    .as_f64()
                    .ok_or_else(|| self.invalid(node, "value"))?;
                let raw = node
                    .value
                    .get("extra")
                    .and_then(|extra| extra.get("raw"))
                    .and_then(Value::as_str);
                self.number(node, value, raw)
            }
            "BooleanLiteral" => Literal::Bool(
                self.field(node, "value")?
                    .as_bool()
                    .ok_or_else(|| self.invalid(node, "value"))?,
            ),
            "NullLiteral" => Literal::Null,
            "RegExpLiteral" => Literal::Regex {
                pattern: self.str_field(node, "pattern")?.to_string(),
                flags: self.str_field(node, "flags")?.to_string(),
            },
            "BigIntLiteral" => Literal::BigInt(self.str_field(node, "value")?.to_string()),
            // `estree` plugin output
            "Literal" => return self.estree_literal(node),
            _ => return Ok(None),
        };
        Ok(Some(literal))
    }

    pub(super) fn babel_property(&self, prop: &Node<'_>) -> Result<PropKind> {
        let key = self.prop_key(self.field(prop, "key")?, self.bool_field(prop, "computed"))?;
        match prop.ty {
            "ObjectMethod" => Ok(PropKind::Method {
                kind: self.method_kind(prop)?,
                function: self.function(prop, Some(key.span.start))?,
                key,
            }),
            "ObjectProperty" => {
                if self.bool_field(prop, "shorthand") {
                    if let PropKeyKind::Ident(name) = key.kind {
                        return Ok(PropKind::Shorthand {
                            name,
                            span: key.span,
                        });
                    }
                }
                Ok(PropKind::KeyValue {
                    key,
                    value: self.expr(self.field(prop, "value")?)?,
                })
            }
            _ => Err(self.unknown(prop)),
        }
    }

    pub(super) fn babel_class_member(&self, member: &Node<'_>) -> Result<Option<ClassMember>> {
        let kind = match member.ty {
            "ClassMethod" | "ClassPrivateMethod" => {
                let key =
                    self.prop_key(self.field(member, "key")?, self.bool_field(member, "computed"))?;
                ClassMemberKind::Method {
                    kind: self.method_kind(member)?,
                    function: self.function(member, Some(key.span.start))?,
                    key,
                }
            }
            "ClassProperty" | "ClassPrivateProperty" | "ClassAccessorProperty" => {
                ClassMemberKind::Field {
                    key: self
                        .prop_key(self.field(member, "key")?, self.bool_field(member, "computed"))?,
                    value: self.opt_expr(member, "value")?,
                }
            }
            "StaticBlock" => return self.static_block(member).map(Some),
            ty if ty.starts_with("TS") => return Ok(None),
            _ => return Err(self.unknown(member)),
        };
        Ok(Some(ClassMember {
            kind,
            is_static: self.bool_field(member, "static"),
            span: member.span,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Options, Pipeline};
    use serde_json::json;

    #[test]
    fn test_object_method_kernel() {
        let source = "const o = { m(x) { 'kernel'; return x; } };";
        let tree = json!({
            "type": "File", "start": 0, "end": 43,
            "program": {
                "type": "Program", "start": 0, "end": 43, "sourceType": "module",
                "directives": [],
                "body": [{
                    "type": "VariableDeclaration", "start": 0, "end": 43, "kind": "const",
                    "declarations": [{
                        "type": "VariableDeclarator", "start": 6, "end": 42,
                        "id": { "type": "Identifier", "start": 6, "end": 7, "name": "o" },
                        "init": {
                            "type": "ObjectExpression", "start": 10, "end": 42,
                            "properties": [{
                                "type": "ObjectMethod", "start": 12, "end": 40,
                                "kind": "method", "computed": false, "id": null,
                                "async": false, "generator": false,
                                "key": { "type": "Identifier", "start": 12, "end": 13, "name": "m" },
                                "params": [{ "type": "Identifier", "start": 14, "end": 15, "name": "x" }],
                                "body": {
                                    "type": "BlockStatement", "start": 17, "end": 40,
                                    "directives": [{
                                        "type": "Directive", "start": 19, "end": 28,
                                        "value": {
                                            "type": "DirectiveLiteral", "start": 19, "end": 27,
                                            "value": "kernel", "extra": { "raw": "'kernel'" }
                                        }
                                    }],
                                    "body": [{
                                        "type": "ReturnStatement", "start": 29, "end": 38,
                                        "argument": { "type": "Identifier", "start": 36, "end": 37, "name": "x" }
                                    }]
                                }
                            }]
                        }
                    }]
                }]
            }
        });
        let normalized = file(&tree, source).unwrap();
        let parsed = tgpu_parser::parse(source).unwrap();
        assert_eq!(normalized.body, parsed.body);

        let pipeline = Pipeline::new(Options::default()).unwrap();
        let from_tree = pipeline
            .transform_program(source, "a.js", &normalized)
            .unwrap()
            .unwrap();
        let native = pipeline.transform(source, "a.js").unwrap().unwrap();
        assert_eq!(from_tree.code, native.code);
        assert!(from_tree.code.starts_with("const o = { m: (($) =>"));
    }

    #[test]
    fn test_program_directives_and_optional_call() {
        let source = "'use strict';\nconst v = a?.(1);";
        let tree = json!({
            "type": "Program", "start": 0, "end": 31,
            "directives": [{
                "type": "Directive", "start": 0, "end": 13,
                "value": { "type": "DirectiveLiteral", "start": 0, "end": 12, "value": "use strict" }
            }],
            "body": [{
                "type": "VariableDeclaration", "start": 14, "end": 31, "kind": "const",
                "declarations": [{
                    "type": "VariableDeclarator", "start": 20, "end": 30,
                    "id": { "type": "Identifier", "start": 20, "end": 21, "name": "v" },
                    "init": {
                        "type": "OptionalCallExpression", "start": 24, "end": 30, "optional": true,
                        "callee": { "type": "Identifier", "start": 24, "end": 25, "name": "a" },
                        "arguments": [{
                            "type": "NumericLiteral", "start": 28, "end": 29,
                            "value": 1, "extra": { "raw": "1" }
                        }]
                    }
                }]
            }]
        });
        let program = file(&tree, source).unwrap();
        assert_eq!(program.body.len(), 2);
        assert_eq!(program.body[0].as_directive(), Some("use strict"));
        let StmtKind::VarDecl(decl) = &program.body[1].kind else {
            panic!("expected declaration");
        };
        let init = decl.declarators[0].init.as_ref().unwrap();
        let ExprKind::Call { optional, args, .. } = &init.kind else {
            panic!("expected call");
        };
        assert!(optional);
        assert_eq!(
            args[0].kind,
            ExprKind::Literal(Literal::Number {
                value: 1.0,
                raw: "1".into()
            })
        );
    }

    #[test]
    fn test_error_names_dialect() {
        let tree = json!({
            "type": "Program", "start": 0, "end": 1, "directives": [],
            "body": [{ "type": "ExpressionStatement", "start": 0, "end": 1,
                       "expression": { "type": "DecimalLiteral", "start": 0, "end": 1, "value": "1" } }]
        });
        let err = file(&tree, "1").unwrap_err();
        assert_eq!(err.to_string(), "unsupported Babel node type `DecimalLiteral`");
    }
}
