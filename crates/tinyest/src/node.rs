//! IR node model and its tagged-tuple JSON encoding
//!
//! Every node is a JSON array `[tag, ...fields]`, except identifiers (bare
//! strings) and booleans (bare JSON booleans). An expression used as a
//! statement is encoded as the expression itself.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{json, Value};

use crate::{IrError, NodeTag};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclKind {
    Let,
    Const,
    Var,
}

impl DeclKind {
    pub fn tag(self) -> NodeTag {
        match self {
            DeclKind::Let => NodeTag::Let,
            DeclKind::Const => NodeTag::Const,
            DeclKind::Var => NodeTag::Var,
        }
    }

    fn from_tag(tag: NodeTag) -> Option<Self> {
        match tag {
            NodeTag::Let => Some(DeclKind::Let),
            NodeTag::Const => Some(DeclKind::Const),
            NodeTag::Var => Some(DeclKind::Var),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Block(Vec<Statement>),
    Return(Option<Expression>),
    If {
        test: Expression,
        consequent: Box<Statement>,
        alternate: Option<Box<Statement>>,
    },
    /// `let` / `const` / `var` with a single identifier
    Declare {
        kind: DeclKind,
        name: String,
        init: Option<Expression>,
    },
    For {
        init: Option<Box<Statement>>,
        test: Option<Expression>,
        update: Option<Box<Statement>>,
        body: Box<Statement>,
    },
    While {
        test: Expression,
        body: Box<Statement>,
    },
    Continue,
    Break,
    ForOf {
        kind: DeclKind,
        name: String,
        iterable: Expression,
        body: Box<Statement>,
    },
    Expr(Expression),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Identifier(String),
    Bool(bool),
    Binary {
        lhs: Box<Expression>,
        op: String,
        rhs: Box<Expression>,
    },
    Assignment {
        lhs: Box<Expression>,
        op: String,
        rhs: Box<Expression>,
    },
    Logical {
        lhs: Box<Expression>,
        op: String,
        rhs: Box<Expression>,
    },
    Unary {
        op: String,
        arg: Box<Expression>,
    },
    MemberAccess {
        object: Box<Expression>,
        property: String,
    },
    IndexAccess {
        object: Box<Expression>,
        index: Box<Expression>,
    },
    Call {
        callee: Box<Expression>,
        args: Vec<Expression>,
    },
    Array(Vec<Expression>),
    Object(Vec<(String, Expression)>),
    PostUpdate {
        op: String,
        arg: Box<Expression>,
    },
    PreUpdate {
        op: String,
        arg: Box<Expression>,
    },
    String(String),
    /// Raw source spelling, so `1.0` and `1` stay distinguishable
    Numeric(String),
    Conditional {
        test: Box<Expression>,
        consequent: Box<Expression>,
        alternate: Box<Expression>,
    },
    /// The `.$` value accessor
    Deref(Box<Expression>),
    /// `std.ref(expr)`
    AddressOf(Box<Expression>),
}

impl Statement {
    pub fn tag(&self) -> Option<NodeTag> {
        Some(match self {
            Statement::Block(_) => NodeTag::Block,
            Statement::Return(_) => NodeTag::Return,
            Statement::If { .. } => NodeTag::If,
            Statement::Declare { kind, .. } => kind.tag(),
            Statement::For { .. } => NodeTag::For,
            Statement::While { .. } => NodeTag::While,
            Statement::Continue => NodeTag::Continue,
            Statement::Break => NodeTag::Break,
            Statement::ForOf { .. } => NodeTag::ForOf,
            Statement::Expr(expr) => return expr.tag(),
        })
    }

    /// Visit the tag of this node and of every node below it
    pub fn for_each_tag(&self, f: &mut impl FnMut(NodeTag)) {
        if let Some(tag) = self.tag() {
            if !matches!(self, Statement::Expr(_)) {
                f(tag);
            }
        }
        match self {
            Statement::Block(body) => body.iter().for_each(|stmt| stmt.for_each_tag(f)),
            Statement::Return(arg) => {
                if let Some(arg) = arg {
                    arg.for_each_tag(f);
                }
            }
            Statement::If {
                test,
                consequent,
                alternate,
            } => {
                test.for_each_tag(f);
                consequent.for_each_tag(f);
                if let Some(alternate) = alternate {
                    alternate.for_each_tag(f);
                }
            }
            Statement::Declare { init, .. } => {
                if let Some(init) = init {
                    init.for_each_tag(f);
                }
            }
            Statement::For {
                init,
                test,
                update,
                body,
            } => {
                if let Some(init) = init {
                    init.for_each_tag(f);
                }
                if let Some(test) = test {
                    test.for_each_tag(f);
                }
                if let Some(update) = update {
                    update.for_each_tag(f);
                }
                body.for_each_tag(f);
            }
            Statement::While { test, body } => {
                test.for_each_tag(f);
                body.for_each_tag(f);
            }
            Statement::ForOf {
                kind,
                iterable,
                body,
                ..
            } => {
                f(kind.tag());
                iterable.for_each_tag(f);
                body.for_each_tag(f);
            }
            Statement::Expr(expr) => expr.for_each_tag(f),
            Statement::Continue | Statement::Break => {}
        }
    }

    pub fn to_json(&self) -> Value {
        let tag = |t: NodeTag| Value::from(t.code());
        match self {
            Statement::Block(body) => {
                json!([tag(NodeTag::Block), body.iter().map(Statement::to_json).collect::<Vec<_>>()])
            }
            Statement::Return(None) => json!([tag(NodeTag::Return)]),
            Statement::Return(Some(arg)) => json!([tag(NodeTag::Return), arg.to_json()]),
            Statement::If {
                test,
                consequent,
                alternate: None,
            } => json!([tag(NodeTag::If), test.to_json(), consequent.to_json()]),
            Statement::If {
                test,
                consequent,
                alternate: Some(alternate),
            } => json!([
                tag(NodeTag::If),
                test.to_json(),
                consequent.to_json(),
                alternate.to_json()
            ]),
            Statement::Declare {
                kind,
                name,
                init: None,
            } => json!([tag(kind.tag()), name]),
            Statement::Declare {
                kind,
                name,
                init: Some(init),
            } => json!([tag(kind.tag()), name, init.to_json()]),
            Statement::For {
                init,
                test,
                update,
                body,
            } => json!([
                tag(NodeTag::For),
                init.as_ref().map_or(Value::Null, |s| s.to_json()),
                test.as_ref().map_or(Value::Null, |e| e.to_json()),
                update.as_ref().map_or(Value::Null, |s| s.to_json()),
                body.to_json()
            ]),
            Statement::While { test, body } => {
                json!([tag(NodeTag::While), test.to_json(), body.to_json()])
            }
            Statement::Continue => json!([tag(NodeTag::Continue)]),
            Statement::Break => json!([tag(NodeTag::Break)]),
            Statement::ForOf {
                kind,
                name,
                iterable,
                body,
            } => json!([
                tag(NodeTag::ForOf),
                [tag(kind.tag()), name],
                iterable.to_json(),
                body.to_json()
            ]),
            Statement::Expr(expr) => expr.to_json(),
        }
    }

    pub fn from_json(value: &Value) -> Result<Self, IrError> {
        let (tag, fields) = match value {
            Value::Array(items) => split_tag(items)?,
            _ => return Ok(Statement::Expr(Expression::from_json(value)?)),
        };
        if !tag.is_statement() {
            return Ok(Statement::Expr(Expression::from_json(value)?));
        }
        let r = Fields { tag, fields };

        Ok(match tag {
            NodeTag::Block => Statement::Block(r.statements(0)?),
            NodeTag::Return => {
                r.arity(0, 1)?;
                Statement::Return(r.opt_expr(0)?)
            }
            NodeTag::If => {
                r.arity(2, 3)?;
                Statement::If {
                    test: r.expr(0)?,
                    consequent: Box::new(r.stmt(1)?),
                    alternate: r.opt_stmt(2)?.map(Box::new),
                }
            }
            NodeTag::Let | NodeTag::Const | NodeTag::Var => {
                r.arity(1, 2)?;
                Statement::Declare {
                    kind: DeclKind::from_tag(tag).ok_or_else(|| r.error("declaration kind"))?,
                    name: r.string(0)?,
                    init: r.opt_expr(1)?,
                }
            }
            NodeTag::For => {
                r.arity(4, 4)?;
                Statement::For {
                    init: r.opt_stmt(0)?.map(Box::new),
                    test: r.opt_expr(1)?,
                    update: r.opt_stmt(2)?.map(Box::new),
                    body: Box::new(r.stmt(3)?),
                }
            }
            NodeTag::While => {
                r.arity(2, 2)?;
                Statement::While {
                    test: r.expr(0)?,
                    body: Box::new(r.stmt(1)?),
                }
            }
            NodeTag::Continue => Statement::Continue,
            NodeTag::Break => Statement::Break,
            NodeTag::ForOf => {
                r.arity(3, 3)?;
                let decl = r.array(0)?;
                let (decl_tag, decl_fields) = split_tag(decl)?;
                let kind = DeclKind::from_tag(decl_tag).ok_or_else(|| r.error("loop declaration"))?;
                let name = decl_fields
                    .first()
                    .and_then(Value::as_str)
                    .ok_or_else(|| r.error("loop variable name"))?;
                Statement::ForOf {
                    kind,
                    name: name.to_string(),
                    iterable: r.expr(1)?,
                    body: Box::new(r.stmt(2)?),
                }
            }
            _ => return Err(r.error("statement")),
        })
    }
}

impl Expression {
    pub fn ident(name: impl Into<String>) -> Self {
        Expression::Identifier(name.into())
    }

    pub fn tag(&self) -> Option<NodeTag> {
        Some(match self {
            Expression::Identifier(_) | Expression::Bool(_) => return None,
            Expression::Binary { .. } => NodeTag::Binary,
            Expression::Assignment { .. } => NodeTag::Assignment,
            Expression::Logical { .. } => NodeTag::Logical,
            Expression::Unary { .. } => NodeTag::Unary,
            Expression::MemberAccess { .. } => NodeTag::MemberAccess,
            Expression::IndexAccess { .. } => NodeTag::IndexAccess,
            Expression::Call { .. } => NodeTag::Call,
            Expression::Array(_) => NodeTag::ArrayExpr,
            Expression::Object(_) => NodeTag::ObjectExpr,
            Expression::PostUpdate { .. } => NodeTag::PostUpdate,
            Expression::PreUpdate { .. } => NodeTag::PreUpdate,
            Expression::String(_) => NodeTag::StringLiteral,
            Expression::Numeric(_) => NodeTag::NumericLiteral,
            Expression::Conditional { .. } => NodeTag::Conditional,
            Expression::Deref(_) => NodeTag::Deref,
            Expression::AddressOf(_) => NodeTag::AddressOf,
        })
    }

    pub fn for_each_tag(&self, f: &mut impl FnMut(NodeTag)) {
        if let Some(tag) = self.tag() {
            f(tag);
        }
        match self {
            Expression::Identifier(_)
            | Expression::Bool(_)
            | Expression::String(_)
            | Expression::Numeric(_) => {}
            Expression::Binary { lhs, rhs, .. }
            | Expression::Assignment { lhs, rhs, .. }
            | Expression::Logical { lhs, rhs, .. } => {
                lhs.for_each_tag(f);
                rhs.for_each_tag(f);
            }
            Expression::Unary { arg, .. }
            | Expression::PostUpdate { arg, .. }
            | Expression::PreUpdate { arg, .. }
            | Expression::Deref(arg)
            | Expression::AddressOf(arg) => arg.for_each_tag(f),
            Expression::MemberAccess { object, .. } => object.for_each_tag(f),
            Expression::IndexAccess { object, index } => {
                object.for_each_tag(f);
                index.for_each_tag(f);
            }
            Expression::Call { callee, args } => {
                callee.for_each_tag(f);
                args.iter().for_each(|arg| arg.for_each_tag(f));
            }
            Expression::Array(items) => items.iter().for_each(|item| item.for_each_tag(f)),
            Expression::Object(entries) => {
                entries.iter().for_each(|(_, value)| value.for_each_tag(f))
            }
            Expression::Conditional {
                test,
                consequent,
                alternate,
            } => {
                test.for_each_tag(f);
                consequent.for_each_tag(f);
                alternate.for_each_tag(f);
            }
        }
    }

    pub fn to_json(&self) -> Value {
        let tag = |t: NodeTag| Value::from(t.code());
        match self {
            Expression::Identifier(name) => Value::String(name.clone()),
            Expression::Bool(value) => Value::Bool(*value),
            Expression::Binary { lhs, op, rhs } => {
                json!([tag(NodeTag::Binary), lhs.to_json(), op, rhs.to_json()])
            }
            Expression::Assignment { lhs, op, rhs } => {
                json!([tag(NodeTag::Assignment), lhs.to_json(), op, rhs.to_json()])
            }
            Expression::Logical { lhs, op, rhs } => {
                json!([tag(NodeTag::Logical), lhs.to_json(), op, rhs.to_json()])
            }
            Expression::Unary { op, arg } => json!([tag(NodeTag::Unary), op, arg.to_json()]),
            Expression::MemberAccess { object, property } => {
                json!([tag(NodeTag::MemberAccess), object.to_json(), property])
            }
            Expression::IndexAccess { object, index } => {
                json!([tag(NodeTag::IndexAccess), object.to_json(), index.to_json()])
            }
            Expression::Call { callee, args } => json!([
                tag(NodeTag::Call),
                callee.to_json(),
                args.iter().map(Expression::to_json).collect::<Vec<_>>()
            ]),
            Expression::Array(items) => json!([
                tag(NodeTag::ArrayExpr),
                items.iter().map(Expression::to_json).collect::<Vec<_>>()
            ]),
            Expression::Object(entries) => json!([
                tag(NodeTag::ObjectExpr),
                entries
                    .iter()
                    .map(|(key, value)| json!([key, value.to_json()]))
                    .collect::<Vec<_>>()
            ]),
            Expression::PostUpdate { op, arg } => {
                json!([tag(NodeTag::PostUpdate), op, arg.to_json()])
            }
            Expression::PreUpdate { op, arg } => {
                json!([tag(NodeTag::PreUpdate), op, arg.to_json()])
            }
            Expression::String(text) => json!([tag(NodeTag::StringLiteral), text]),
            Expression::Numeric(raw) => json!([tag(NodeTag::NumericLiteral), raw]),
            Expression::Conditional {
                test,
                consequent,
                alternate,
            } => json!([
                tag(NodeTag::Conditional),
                test.to_json(),
                consequent.to_json(),
                alternate.to_json()
            ]),
            Expression::Deref(expr) => json!([tag(NodeTag::Deref), expr.to_json()]),
            Expression::AddressOf(expr) => json!([tag(NodeTag::AddressOf), expr.to_json()]),
        }
    }

    pub fn from_json(value: &Value) -> Result<Self, IrError> {
        let items = match value {
            Value::String(name) => return Ok(Expression::Identifier(name.clone())),
            Value::Bool(b) => return Ok(Expression::Bool(*b)),
            Value::Array(items) => items,
            other => return Err(IrError::malformed("expression", format!("unexpected {}", other))),
        };
        let (tag, fields) = split_tag(items)?;
        let r = Fields { tag, fields };

        let binary = |r: &Fields| -> Result<(Box<Expression>, String, Box<Expression>), IrError> {
            r.arity(3, 3)?;
            Ok((Box::new(r.expr(0)?), r.string(1)?, Box::new(r.expr(2)?)))
        };
        let unary = |r: &Fields| -> Result<(String, Box<Expression>), IrError> {
            r.arity(2, 2)?;
            Ok((r.string(0)?, Box::new(r.expr(1)?)))
        };

        Ok(match tag {
            NodeTag::Binary => {
                let (lhs, op, rhs) = binary(&r)?;
                Expression::Binary { lhs, op, rhs }
            }
            NodeTag::Assignment => {
                let (lhs, op, rhs) = binary(&r)?;
                Expression::Assignment { lhs, op, rhs }
            }
            NodeTag::Logical => {
                let (lhs, op, rhs) = binary(&r)?;
                Expression::Logical { lhs, op, rhs }
            }
            NodeTag::Unary => {
                let (op, arg) = unary(&r)?;
                Expression::Unary { op, arg }
            }
            NodeTag::PostUpdate => {
                let (op, arg) = unary(&r)?;
                Expression::PostUpdate { op, arg }
            }
            NodeTag::PreUpdate => {
                let (op, arg) = unary(&r)?;
                Expression::PreUpdate { op, arg }
            }
            NodeTag::MemberAccess => {
                r.arity(2, 2)?;
                Expression::MemberAccess {
                    object: Box::new(r.expr(0)?),
                    property: r.string(1)?,
                }
            }
            NodeTag::IndexAccess => {
                r.arity(2, 2)?;
                Expression::IndexAccess {
                    object: Box::new(r.expr(0)?),
                    index: Box::new(r.expr(1)?),
                }
            }
            NodeTag::Call => {
                r.arity(2, 2)?;
                Expression::Call {
                    callee: Box::new(r.expr(0)?),
                    args: r.expressions(1)?,
                }
            }
            NodeTag::ArrayExpr => {
                r.arity(1, 1)?;
                Expression::Array(r.expressions(0)?)
            }
            NodeTag::ObjectExpr => {
                r.arity(1, 1)?;
                let entries = r
                    .array(0)?
                    .iter()
                    .map(|entry| match entry.as_array().map(Vec::as_slice) {
                        Some([Value::String(key), value]) => {
                            Ok((key.clone(), Expression::from_json(value)?))
                        }
                        _ => Err(r.error("object entry")),
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Expression::Object(entries)
            }
            NodeTag::StringLiteral => {
                r.arity(1, 1)?;
                Expression::String(r.string(0)?)
            }
            NodeTag::NumericLiteral => {
                r.arity(1, 1)?;
                Expression::Numeric(r.string(0)?)
            }
            NodeTag::Conditional => {
                r.arity(3, 3)?;
                Expression::Conditional {
                    test: Box::new(r.expr(0)?),
                    consequent: Box::new(r.expr(1)?),
                    alternate: Box::new(r.expr(2)?),
                }
            }
            NodeTag::Deref => {
                r.arity(1, 1)?;
                Expression::Deref(Box::new(r.expr(0)?))
            }
            NodeTag::AddressOf => {
                r.arity(1, 1)?;
                Expression::AddressOf(Box::new(r.expr(0)?))
            }
            _ => return Err(r.error("expression")),
        })
    }
}

fn split_tag(items: &[Value]) -> Result<(NodeTag, &[Value]), IrError> {
    let (first, rest) = items
        .split_first()
        .ok_or_else(|| IrError::malformed("node", "empty array"))?;
    let code = first
        .as_u64()
        .ok_or_else(|| IrError::malformed("node", "missing numeric tag"))?;
    let tag = NodeTag::from_code(code).ok_or(IrError::UnknownTag(code))?;
    Ok((tag, rest))
}

/// Positional field access for one decoded node
struct Fields<'v> {
    tag: NodeTag,
    fields: &'v [Value],
}

impl<'v> Fields<'v> {
    fn error(&self, reason: &str) -> IrError {
        IrError::malformed(self.tag.name(), format!("invalid {}", reason))
    }

    fn arity(&self, min: usize, max: usize) -> Result<(), IrError> {
        let len = self.fields.len();
        if len < min || len > max {
            return Err(IrError::malformed(
                self.tag.name(),
                format!("expected {}..={} fields, found {}", min, max, len),
            ));
        }
        Ok(())
    }

    fn get(&self, index: usize) -> Result<&'v Value, IrError> {
        self.fields
            .get(index)
            .ok_or_else(|| IrError::malformed(self.tag.name(), format!("missing field {}", index)))
    }

    fn expr(&self, index: usize) -> Result<Expression, IrError> {
        Expression::from_json(self.get(index)?)
    }

    fn stmt(&self, index: usize) -> Result<Statement, IrError> {
        Statement::from_json(self.get(index)?)
    }

    fn opt_expr(&self, index: usize) -> Result<Option<Expression>, IrError> {
        match self.fields.get(index) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => Expression::from_json(value).map(Some),
        }
    }

    fn opt_stmt(&self, index: usize) -> Result<Option<Statement>, IrError> {
        match self.fields.get(index) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => Statement::from_json(value).map(Some),
        }
    }

    fn string(&self, index: usize) -> Result<String, IrError> {
        self.get(index)?
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| self.error(&format!("string field {}", index)))
    }

    fn array(&self, index: usize) -> Result<&'v [Value], IrError> {
        self.get(index)?
            .as_array()
            .map(Vec::as_slice)
            .ok_or_else(|| self.error(&format!("array field {}", index)))
    }

    fn expressions(&self, index: usize) -> Result<Vec<Expression>, IrError> {
        self.array(index)?.iter().map(Expression::from_json).collect()
    }

    fn statements(&self, index: usize) -> Result<Vec<Statement>, IrError> {
        self.arity(index + 1, index + 1)?;
        self.array(index)?.iter().map(Statement::from_json).collect()
    }
}

impl Serialize for Statement {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Statement {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Statement::from_json(&value).map_err(D::Error::custom)
    }
}

impl Serialize for Expression {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Expression {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Expression::from_json(&value).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn num(raw: &str) -> Expression {
        Expression::Numeric(raw.to_string())
    }

    #[test]
    fn test_binary_shape() {
        let expr = Expression::Binary {
            lhs: Box::new(Expression::ident("a")),
            op: "+".to_string(),
            rhs: Box::new(Expression::ident("b")),
        };
        assert_eq!(expr.to_json(), json!([100, "a", "+", "b"]));
    }

    #[test]
    fn test_statement_shapes() {
        let body = Statement::Block(vec![
            Statement::Declare {
                kind: DeclKind::Const,
                name: "x".to_string(),
                init: Some(num("1.0")),
            },
            Statement::If {
                test: Expression::Bool(true),
                consequent: Box::new(Statement::Return(Some(Expression::ident("x")))),
                alternate: None,
            },
            Statement::For {
                init: None,
                test: None,
                update: None,
                body: Box::new(Statement::Break),
            },
        ]);
        assert_eq!(
            body.to_json(),
            json!([0, [[4, "x", [112, "1.0"]], [2, true, [1, "x"]], [6, null, null, null, [9]]]])
        );
    }

    #[test]
    fn test_for_of_shape() {
        let stmt = Statement::ForOf {
            kind: DeclKind::Const,
            name: "v".to_string(),
            iterable: Expression::ident("list"),
            body: Box::new(Statement::Block(vec![])),
        };
        let value = stmt.to_json();
        assert_eq!(value, json!([10, [4, "v"], "list", [0, []]]));
        assert_eq!(Statement::from_json(&value), Ok(stmt));
    }

    #[test]
    fn test_expression_statement_is_bare() {
        let stmt = Statement::Expr(Expression::PostUpdate {
            op: "++".to_string(),
            arg: Box::new(Expression::ident("i")),
        });
        assert_eq!(stmt.to_json(), json!([109, "++", "i"]));
        assert_eq!(Statement::from_json(&json!([109, "++", "i"])), Ok(stmt));
    }

    #[test]
    fn test_object_entries_keep_order() {
        let value = json!([108, [["b", [112, "1"]], ["a", "x"]]]);
        let expr = Expression::from_json(&value).expect("decodes");
        let Expression::Object(entries) = &expr else {
            panic!("expected object");
        };
        assert_eq!(entries[0].0, "b");
        assert_eq!(entries[1].0, "a");
        assert_eq!(expr.to_json(), value);
    }

    #[test]
    fn test_decode_errors() {
        assert_eq!(
            Expression::from_json(&json!([999, "a"])),
            Err(IrError::UnknownTag(999))
        );
        assert!(matches!(
            Expression::from_json(&json!([104, "a"])),
            Err(IrError::Malformed { .. })
        ));
        assert!(matches!(
            Statement::from_json(&json!([])),
            Err(IrError::Malformed { .. })
        ));
        assert!(matches!(
            Expression::from_json(&json!(1.5)),
            Err(IrError::Malformed { .. })
        ));
    }

    #[test]
    fn test_for_each_tag_visits_nested_nodes() {
        let stmt = Statement::Return(Some(Expression::Conditional {
            test: Box::new(Expression::Deref(Box::new(Expression::ident("p")))),
            consequent: Box::new(num("1")),
            alternate: Box::new(num("2")),
        }));
        let mut tags = Vec::new();
        stmt.for_each_tag(&mut |tag| tags.push(tag));
        assert_eq!(
            tags,
            vec![
                NodeTag::Return,
                NodeTag::Conditional,
                NodeTag::Deref,
                NodeTag::NumericLiteral,
                NodeTag::NumericLiteral
            ]
        );
    }
}
