//! ESTree input, as produced by acorn, Rollup and typescript-estree

use serde_json::Value;
use tgpu_ast::*;

use super::{Dialect, Node, Normalizer, Result};

/// Convert an ESTree `Program` for `source` into the internal AST
pub fn program(value: &Value, source: &str) -> Result<Program> {
    Normalizer::new(Dialect::Estree, source).program(value)
}

impl Normalizer<'_> {
    pub(super) fn estree_literal(&self, node: &Node<'_>) -> Result<Option<Literal>> {
        if node.ty != "Literal" {
            return Ok(None);
        }
        if let Some(regex) = self.opt(node, "regex") {
            let part = |name: &str| {
                regex
                    .get(name)
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .ok_or_else(|| self.invalid(node, "regex"))
            };
            return Ok(Some(Literal::Regex {
                pattern: part("pattern")?,
                flags: part("flags")?,
            }));
        }
        if let Some(digits) = node.value.get("bigint").and_then(Value::as_str) {
            return Ok(Some(Literal::BigInt(digits.to_string())));
        }
        let literal = match node.value.get("value") {
            Some(Value::String(value)) => Literal::String(value.clone()),
            Some(Value::Bool(value)) => Literal::Bool(*value),
            Some(Value::Number(value)) => {
                let raw = node.value.get("raw").and_then(Value::as_str);
                self.number(node, value.as_f64().unwrap_or(f64::NAN), raw)
            }
            None | Some(Value::Null) => Literal::Null,
            Some(_) => return Err(self.invalid(node, "value")),
        };
        Ok(Some(literal))
    }

    pub(super) fn estree_property(&self, prop: &Node<'_>) -> Result<PropKind> {
        if prop.ty != "Property" {
            return Err(self.unknown(prop));
        }
        let key = self.prop_key(self.field(prop, "key")?, self.bool_field(prop, "computed"))?;
        let value = self.child(prop, "value")?;
        let kind = match self.opt(prop, "kind").and_then(Value::as_str) {
            Some("get") => Some(MethodKind::Getter),
            Some("set") => Some(MethodKind::Setter),
            _ if self.bool_field(prop, "method") => Some(MethodKind::Method),
            _ => None,
        };
        if let Some(kind) = kind {
            let function = self.function(&value, Some(key.span.start))?;
            return Ok(PropKind::Method {
                key,
                kind,
                function,
            });
        }
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
            value: self.expr(value.value)?,
        })
    }

    pub(super) fn estree_class_member(&self, member: &Node<'_>) -> Result<Option<ClassMember>> {
        let is_static = self.bool_field(member, "static");
        let kind = match member.ty {
            "MethodDefinition" => {
                let key =
                    self.prop_key(self.field(member, "key")?, self.bool_field(member, "computed"))?;
                let value = self.child(member, "value")?;
                // Overload signatures carry no body
                if self.opt(&value, "body").is_none() {
                    return Ok(None);
                }
                ClassMemberKind::Method {
                    kind: self.method_kind(member)?,
                    function: self.function(&value, Some(key.span.start))?,
                    key,
                }
            }
            "PropertyDefinition" | "AccessorProperty" => ClassMemberKind::Field {
                key: self.prop_key(self.field(member, "key")?, self.bool_field(member, "computed"))?,
                value: self.opt_expr(member, "value")?,
            },
            "StaticBlock" => return self.static_block(member).map(Some),
            ty if ty.starts_with("TS") => return Ok(None),
            _ => return Err(self.unknown(member)),
        };
        Ok(Some(ClassMember {
            kind,
            is_static,
            span: member.span,
        }))
    }
}
