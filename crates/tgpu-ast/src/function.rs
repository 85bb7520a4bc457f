//! Functions, parameters, binding patterns and classes

use serde::{Deserialize, Serialize};
use crate::{Block, Expr, MethodKind, PropKey, Span};

/// A function declaration, function expression, arrow, or method
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Function {
    pub name: Option<Ident>,
    pub params: Vec<Param>,
    pub body: FunctionBody,
    pub is_arrow: bool,
    pub is_async: bool,
    pub is_generator: bool,
    /// Parameter list as written, including parentheses when present
    pub params_span: Span,
    pub span: Span,
}

impl Function {
    /// The leading string-literal directive of a block body, if any
    pub fn directive(&self) -> Option<&str> {
        match &self.body {
            FunctionBody::Block(block) => block.statements.first()?.as_directive(),
            FunctionBody::Expr(_) => None,
        }
    }

    pub fn name_str(&self) -> Option<&str> {
        self.name.as_ref().map(|ident| ident.name.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FunctionBody {
    Block(Block),
    /// Concise arrow body: `(x) => x * 2`
    Expr(Box<Expr>),
}

impl FunctionBody {
    pub fn span(&self) -> Span {
        match self {
            FunctionBody::Block(block) => block.span,
            FunctionBody::Expr(expr) => expr.span,
        }
    }
}

/// An identifier in binding position
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ident {
    pub name: String,
    pub span: Span,
}

impl Ident {
    pub fn new(name: impl Into<String>, span: Span) -> Self {
        Self {
            name: name.into(),
            span,
        }
    }
}

/// A function parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Param {
    pub pattern: Pattern,
    /// TypeScript annotation text, kept verbatim
    pub type_annotation: Option<String>,
    pub span: Span,
}

/// Binding pattern
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pattern {
    pub kind: PatternKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PatternKind {
    /// `x`
    Ident(String),
    /// `{ a, b: c, ...rest }`
    Object(Vec<ObjectPatternProp>),
    /// `[a, , b, ...rest]`
    Array(Vec<Option<Pattern>>),
    /// `x = default`
    Assign {
        target: Box<Pattern>,
        default: Box<Expr>,
    },
    /// `...rest`
    Rest(Box<Pattern>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ObjectPatternProp {
    /// `key: value` or shorthand `key` (then `value` is an identifier pattern)
    KeyValue {
        key: PropKey,
        value: Pattern,
        shorthand: bool,
    },
    Rest(Pattern),
}

impl Pattern {
    pub fn ident(name: impl Into<String>, span: Span) -> Self {
        Self {
            kind: PatternKind::Ident(name.into()),
            span,
        }
    }

    pub fn as_ident(&self) -> Option<&str> {
        match &self.kind {
            PatternKind::Ident(name) => Some(name),
            _ => None,
        }
    }

    /// Every identifier bound by this pattern, in source order
    pub fn bound_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        self.collect_bound_names(&mut names);
        names
    }

    fn collect_bound_names(&self, out: &mut Vec<String>) {
        match &self.kind {
            PatternKind::Ident(name) => out.push(name.clone()),
            PatternKind::Object(props) => {
                for prop in props {
                    match prop {
                        ObjectPatternProp::KeyValue { value, .. } => value.collect_bound_names(out),
                        ObjectPatternProp::Rest(rest) => rest.collect_bound_names(out),
                    }
                }
            }
            PatternKind::Array(items) => {
                for item in items.iter().flatten() {
                    item.collect_bound_names(out);
                }
            }
            PatternKind::Assign { target, .. } => target.collect_bound_names(out),
            PatternKind::Rest(inner) => inner.collect_bound_names(out),
        }
    }
}

/// A class declaration or expression
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Class {
    pub name: Option<Ident>,
    pub super_class: Option<Expr>,
    pub members: Vec<ClassMember>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassMember {
    pub kind: ClassMemberKind,
    pub is_static: bool,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ClassMemberKind {
    Method {
        key: PropKey,
        kind: MethodKind,
        function: Function,
    },
    Field {
        key: PropKey,
        value: Option<Expr>,
    },
    /// `static { ... }`
    StaticBlock(Block),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PropKeyKind;

    #[test]
    fn test_bound_names_nested_pattern() {
        let key = |name: &str| PropKey {
            kind: PropKeyKind::Ident(name.into()),
            span: Span::dummy(),
        };
        let pattern = Pattern {
            kind: PatternKind::Object(vec![
                ObjectPatternProp::KeyValue {
                    key: key("a"),
                    value: Pattern::ident("a", Span::dummy()),
                    shorthand: true,
                },
                ObjectPatternProp::KeyValue {
                    key: key("b"),
                    value: Pattern {
                        kind: PatternKind::Array(vec![
                            Some(Pattern::ident("c", Span::dummy())),
                            None,
                            Some(Pattern {
                                kind: PatternKind::Rest(Box::new(Pattern::ident("d", Span::dummy()))),
                                span: Span::dummy(),
                            }),
                        ]),
                        span: Span::dummy(),
                    },
                    shorthand: false,
                },
                ObjectPatternProp::Rest(Pattern::ident("e", Span::dummy())),
            ]),
            span: Span::dummy(),
        };
        assert_eq!(pattern.bound_names(), vec!["a", "c", "d", "e"]);
    }
}
