//! Expression parsing (precedence climbing)

use tgpu_ast::*;
use tgpu_lexer::{cook_string, template_parts, tokenize_range, TokenKind};

use crate::{ParseError, Parser};

enum Infix {
    Binary(BinaryOp),
    Logical(LogicalOp),
    /// `x as T`, `x satisfies T`
    TsCast,
}

impl<'a> Parser<'a> {
    pub fn parse_expression(&mut self) -> Result<Expr, ParseError> {
        let start = self.start();
        let first = self.parse_assign()?;
        if !self.at(TokenKind::Comma) {
            return Ok(first);
        }
        let mut exprs = vec![first];
        while self.eat(TokenKind::Comma) {
            exprs.push(self.parse_assign()?);
        }
        Ok(Expr::new(ExprKind::Sequence(exprs), self.span_from(start)))
    }

    pub(crate) fn parse_expression_no_in(&mut self) -> Result<Expr, ParseError> {
        let saved = self.no_in;
        self.no_in = true;
        let expr = self.parse_expression();
        self.no_in = saved;
        expr
    }

    pub(crate) fn parse_assign_no_in(&mut self, no_in: bool) -> Result<Expr, ParseError> {
        let saved = self.no_in;
        self.no_in = no_in;
        let expr = self.parse_assign();
        self.no_in = saved;
        expr
    }

    /// Run `f` with the `in` operator allowed again (inside brackets)
    fn with_in<T>(&mut self, f: impl FnOnce(&mut Self) -> T) -> T {
        let saved = self.no_in;
        self.no_in = false;
        let result = f(self);
        self.no_in = saved;
        result
    }

    pub fn parse_assign(&mut self) -> Result<Expr, ParseError> {
        let start = self.start();

        if let Some(arrow) = self.try_parse_arrow()? {
            return Ok(arrow);
        }
        if self.in_generator && self.at_word("yield") {
            return self.parse_yield();
        }

        let target = self.parse_conditional()?;
        let Some(op) = self.peek().assign_op().and_then(AssignOp::from_str) else {
            return Ok(target);
        };
        if !is_assignable(&target, op) {
            return Err(ParseError::InvalidAssignmentTarget { span: target.span });
        }
        self.advance();
        let value = self.parse_assign()?;
        Ok(Expr::new(
            ExprKind::Assign {
                op,
                target: Box::new(target),
                value: Box::new(value),
            },
            self.span_from(start),
        ))
    }

    fn parse_yield(&mut self) -> Result<Expr, ParseError> {
        let start = self.start();
        self.advance();
        let delegate = self.eat(TokenKind::Star);
        let ends = matches!(
            self.peek(),
            TokenKind::RParen
                | TokenKind::RBracket
                | TokenKind::RBrace
                | TokenKind::Comma
                | TokenKind::Semicolon
                | TokenKind::Colon
                | TokenKind::Eof
        ) || self.current().newline_before;
        let arg = if ends && !delegate {
            None
        } else {
            Some(Box::new(self.parse_assign()?))
        };
        Ok(Expr::new(ExprKind::Yield { arg, delegate }, self.span_from(start)))
    }

    // === Arrow functions ===

    /// Parse an arrow function if one starts here; otherwise leave the
    /// position untouched and return `None`
    fn try_parse_arrow(&mut self) -> Result<Option<Expr>, ParseError> {
        let start = self.start();
        let is_async = self.at_word("async")
            && !self.newline_ahead(1)
            && matches!(
                self.peek_ahead(1),
                TokenKind::Ident | TokenKind::LParen | TokenKind::Lt
            );
        let offset = usize::from(is_async);

        // `x => ...`
        if self.peek_ahead(offset) == TokenKind::Ident
            && self.peek_ahead(offset + 1) == TokenKind::FatArrow
            && !self.newline_ahead(offset + 1)
        {
            if is_async {
                self.advance();
            }
            let ident = self.consume_ident()?;
            let params_span = ident.span;
            let param = Param {
                pattern: Pattern::ident(ident.name, ident.span),
                type_annotation: None,
                span: ident.span,
            };
            self.advance();
            return self
                .finish_arrow(start, vec![param], params_span, is_async)
                .map(Some);
        }

        if !matches!(self.peek_ahead(offset), TokenKind::LParen | TokenKind::Lt) {
            return Ok(None);
        }

        let saved = self.pos;
        if is_async {
            self.advance();
        }
        match self.parse_arrow_head() {
            Ok((params, params_span))
                if self.at(TokenKind::FatArrow) && !self.current().newline_before =>
            {
                self.advance();
                self.finish_arrow(start, params, params_span, is_async).map(Some)
            }
            _ => {
                self.pos = saved;
                Ok(None)
            }
        }
    }

    fn parse_arrow_head(&mut self) -> Result<(Vec<Param>, Span), ParseError> {
        if self.at(TokenKind::Lt) {
            self.skip_type_params()?;
        }
        let params_start = self.start();
        let params = self.parse_params()?;
        let params_span = self.span_from(params_start);
        if self.eat(TokenKind::Colon) {
            self.skip_type()?;
        }
        Ok((params, params_span))
    }

    fn finish_arrow(
        &mut self,
        start: usize,
        params: Vec<Param>,
        params_span: Span,
        is_async: bool,
    ) -> Result<Expr, ParseError> {
        let body = if self.at(TokenKind::LBrace) {
            FunctionBody::Block(self.parse_function_body(is_async, false)?)
        } else {
            let saved = (self.in_async, self.in_generator);
            self.in_async = is_async;
            self.in_generator = false;
            let expr = self.parse_assign();
            (self.in_async, self.in_generator) = saved;
            FunctionBody::Expr(Box::new(expr?))
        };
        let function = Function {
            name: None,
            params,
            body,
            is_arrow: true,
            is_async,
            is_generator: false,
            params_span,
            span: self.span_from(start),
        };
        Ok(Expr::new(
            ExprKind::Function(Box::new(function)),
            self.span_from(start),
        ))
    }

    // === Operators ===

    fn parse_conditional(&mut self) -> Result<Expr, ParseError> {
        let start = self.start();
        let test = self.parse_binary(1)?;
        if !self.eat(TokenKind::Question) {
            return Ok(test);
        }
        let consequent = self.with_in(|p| p.parse_assign())?;
        self.consume(TokenKind::Colon)?;
        let alternate = self.parse_assign()?;
        Ok(Expr::new(
            ExprKind::Conditional {
                test: Box::new(test),
                consequent: Box::new(consequent),
                alternate: Box::new(alternate),
            },
            self.span_from(start),
        ))
    }

    fn infix_op(&self) -> Option<(u8, Infix)> {
        use TokenKind as T;
        let op = match self.peek() {
            T::QuestionQuestion => (1, Infix::Logical(LogicalOp::Nullish)),
            T::OrOr => (1, Infix::Logical(LogicalOp::Or)),
            T::AndAnd => (2, Infix::Logical(LogicalOp::And)),
            T::Pipe => (3, Infix::Binary(BinaryOp::BitOr)),
            T::Caret => (4, Infix::Binary(BinaryOp::BitXor)),
            T::Amp => (5, Infix::Binary(BinaryOp::BitAnd)),
            T::EqEq => (6, Infix::Binary(BinaryOp::EqEq)),
            T::Ne => (6, Infix::Binary(BinaryOp::NotEq)),
            T::EqEqEq => (6, Infix::Binary(BinaryOp::EqEqEq)),
            T::NeEq => (6, Infix::Binary(BinaryOp::NotEqEq)),
            T::Lt => (7, Infix::Binary(BinaryOp::Lt)),
            T::Le => (7, Infix::Binary(BinaryOp::Le)),
            T::Gt => (7, Infix::Binary(BinaryOp::Gt)),
            T::Ge => (7, Infix::Binary(BinaryOp::Ge)),
            T::InstanceOf => (7, Infix::Binary(BinaryOp::InstanceOf)),
            T::In if !self.no_in => (7, Infix::Binary(BinaryOp::In)),
            T::Ident
                if matches!(self.text_ahead(0), "as" | "satisfies")
                    && !self.current().newline_before =>
            {
                (7, Infix::TsCast)
            }
            T::Shl => (8, Infix::Binary(BinaryOp::Shl)),
            T::Shr => (8, Infix::Binary(BinaryOp::Shr)),
            T::UShr => (8, Infix::Binary(BinaryOp::UShr)),
            T::Plus => (9, Infix::Binary(BinaryOp::Add)),
            T::Minus => (9, Infix::Binary(BinaryOp::Sub)),
            T::Star => (10, Infix::Binary(BinaryOp::Mul)),
            T::Slash => (10, Infix::Binary(BinaryOp::Div)),
            T::Percent => (10, Infix::Binary(BinaryOp::Mod)),
            T::StarStar => (11, Infix::Binary(BinaryOp::Exp)),
            _ => return None,
        };
        Some(op)
    }

    fn parse_binary(&mut self, min_prec: u8) -> Result<Expr, ParseError> {
        let start = self.start();
        let mut left = self.parse_unary()?;

        while let Some((prec, infix)) = self.infix_op() {
            if prec < min_prec {
                break;
            }
            self.advance();

            let kind = match infix {
                Infix::TsCast => {
                    self.skip_type()?;
                    ExprKind::TsCast(Box::new(left))
                }
                Infix::Binary(op) => {
                    // `**` is right-associative
                    let next_min = if op == BinaryOp::Exp { prec } else { prec + 1 };
                    let right = self.parse_binary(next_min)?;
                    ExprKind::Binary {
                        op,
                        left: Box::new(left),
                        right: Box::new(right),
                    }
                }
                Infix::Logical(op) => {
                    let right = self.parse_binary(prec + 1)?;
                    ExprKind::Logical {
                        op,
                        left: Box::new(left),
                        right: Box::new(right),
                    }
                }
            };
            left = Expr::new(kind, self.span_from(start));
        }

        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        let start = self.start();

        let op = match self.peek() {
            TokenKind::Bang => Some(UnaryOp::Not),
            TokenKind::Tilde => Some(UnaryOp::BitNot),
            TokenKind::Plus => Some(UnaryOp::Plus),
            TokenKind::Minus => Some(UnaryOp::Neg),
            TokenKind::Typeof => Some(UnaryOp::Typeof),
            TokenKind::Void => Some(UnaryOp::Void),
            TokenKind::Delete => Some(UnaryOp::Delete),
            _ => None,
        };
        if let Some(op) = op {
            self.advance();
            let arg = self.parse_unary()?;
            return Ok(Expr::new(
                ExprKind::Unary {
                    op,
                    arg: Box::new(arg),
                },
                self.span_from(start),
            ));
        }

        if matches!(self.peek(), TokenKind::PlusPlus | TokenKind::MinusMinus) {
            let op = if self.at(TokenKind::PlusPlus) {
                UpdateOp::Inc
            } else {
                UpdateOp::Dec
            };
            self.advance();
            let arg = self.parse_unary()?;
            return Ok(Expr::new(
                ExprKind::Update {
                    op,
                    prefix: true,
                    arg: Box::new(arg),
                },
                self.span_from(start),
            ));
        }

        if self.at_await() {
            self.advance();
            let arg = self.parse_unary()?;
            return Ok(Expr::new(ExprKind::Await(Box::new(arg)), self.span_from(start)));
        }

        if self.at(TokenKind::Lt) {
            return Err(ParseError::Unsupported {
                what: "JSX or angle-bracket type assertion".to_string(),
                span: self.current().span,
            });
        }

        self.parse_postfix()
    }

    /// `await` is an operator inside async functions, and at module top level
    /// when an operand follows on the same line
    fn at_await(&self) -> bool {
        if !self.at_word("await") {
            return false;
        }
        if self.in_async {
            return true;
        }
        !self.newline_ahead(1)
            && matches!(
                self.peek_ahead(1),
                TokenKind::Ident
                    | TokenKind::LParen
                    | TokenKind::LBracket
                    | TokenKind::This
                    | TokenKind::New
                    | TokenKind::Number
                    | TokenKind::String
                    | TokenKind::Template
                    | TokenKind::Function
                    | TokenKind::Import
            )
    }

    fn parse_postfix(&mut self) -> Result<Expr, ParseError> {
        let start = self.start();
        let expr = self.parse_call_member()?;
        if matches!(self.peek(), TokenKind::PlusPlus | TokenKind::MinusMinus)
            && !self.current().newline_before
        {
            let op = if self.at(TokenKind::PlusPlus) {
                UpdateOp::Inc
            } else {
                UpdateOp::Dec
            };
            self.advance();
            return Ok(Expr::new(
                ExprKind::Update {
                    op,
                    prefix: false,
                    arg: Box::new(expr),
                },
                self.span_from(start),
            ));
        }
        Ok(expr)
    }

    // === Calls and members ===

    fn parse_call_member(&mut self) -> Result<Expr, ParseError> {
        let start = self.start();
        let expr = if self.at(TokenKind::New) {
            self.parse_new()?
        } else {
            self.parse_primary()?
        };
        self.parse_chain(start, expr, true)
    }

    /// Member expression without a trailing call (`class A extends b.C`)
    pub(crate) fn parse_lhs_no_call(&mut self) -> Result<Expr, ParseError> {
        let start = self.start();
        let expr = self.parse_primary()?;
        self.parse_chain(start, expr, false)
    }

    fn parse_chain(&mut self, start: usize, mut expr: Expr, allow_call: bool) -> Result<Expr, ParseError> {
        loop {
            let kind = match self.peek() {
                TokenKind::Dot => {
                    self.advance();
                    ExprKind::Member {
                        object: Box::new(expr),
                        property: self.parse_member_name()?,
                        optional: false,
                    }
                }
                TokenKind::QuestionDot => {
                    self.advance();
                    match self.peek() {
                        TokenKind::LParen if allow_call => ExprKind::Call {
                            callee: Box::new(expr),
                            args: self.parse_arguments()?,
                            optional: true,
                        },
                        TokenKind::LBracket => {
                            self.advance();
                            let index = self.with_in(|p| p.parse_expression())?;
                            self.consume(TokenKind::RBracket)?;
                            ExprKind::Member {
                                object: Box::new(expr),
                                property: MemberProp::Computed(Box::new(index)),
                                optional: true,
                            }
                        }
                        _ => ExprKind::Member {
                            object: Box::new(expr),
                            property: self.parse_member_name()?,
                            optional: true,
                        },
                    }
                }
                TokenKind::LBracket => {
                    self.advance();
                    let index = self.with_in(|p| p.parse_expression())?;
                    self.consume(TokenKind::RBracket)?;
                    ExprKind::Member {
                        object: Box::new(expr),
                        property: MemberProp::Computed(Box::new(index)),
                        optional: false,
                    }
                }
                TokenKind::LParen if allow_call => ExprKind::Call {
                    callee: Box::new(expr),
                    args: self.parse_arguments()?,
                    optional: false,
                },
                TokenKind::Template => {
                    expr = self.parse_template(start, Some(expr))?;
                    continue;
                }
                // Non-null assertion: `x!.y`
                TokenKind::Bang if !self.current().newline_before => {
                    self.advance();
                    ExprKind::TsCast(Box::new(expr))
                }
                // Explicit type arguments: `f<T>(x)`
                TokenKind::Lt if allow_call => {
                    let saved = self.pos;
                    if self.try_skip_type_args()
                        && matches!(self.peek(), TokenKind::LParen | TokenKind::Template)
                    {
                        continue;
                    }
                    self.pos = saved;
                    break;
                }
                _ => break,
            };
            expr = Expr::new(kind, self.span_from(start));
        }
        Ok(expr)
    }

    fn parse_member_name(&mut self) -> Result<MemberProp, ParseError> {
        let token = self.current().clone();
        if token.kind == TokenKind::PrivateName {
            self.advance();
            return Ok(MemberProp::Private {
                name: self.text(token.span)[1..].to_string(),
                span: token.span,
            });
        }
        if token.kind.is_identifier_name() {
            self.advance();
            return Ok(MemberProp::Ident {
                name: self.text(token.span).to_string(),
                span: token.span,
            });
        }
        Err(self.unexpected("property name"))
    }

    pub(crate) fn parse_arguments(&mut self) -> Result<Vec<Expr>, ParseError> {
        self.consume(TokenKind::LParen)?;
        let args = self.with_in(|p| {
            let mut args = Vec::new();
            while !p.at(TokenKind::RParen) {
                args.push(p.parse_spread_or_assign()?);
                if !p.eat(TokenKind::Comma) {
                    break;
                }
            }
            Ok::<_, ParseError>(args)
        })?;
        self.consume(TokenKind::RParen)?;
        Ok(args)
    }

    fn parse_spread_or_assign(&mut self) -> Result<Expr, ParseError> {
        let start = self.start();
        if self.eat(TokenKind::Ellipsis) {
            let arg = self.parse_assign()?;
            return Ok(Expr::new(ExprKind::Spread(Box::new(arg)), self.span_from(start)));
        }
        self.parse_assign()
    }

    fn parse_new(&mut self) -> Result<Expr, ParseError> {
        let start = self.start();
        self.consume(TokenKind::New)?;

        if self.eat(TokenKind::Dot) {
            let property = self.consume_ident()?;
            return Ok(Expr::new(
                ExprKind::MetaProperty(format!("new.{}", property.name)),
                self.span_from(start),
            ));
        }

        let callee_start = self.start();
        let callee = if self.at(TokenKind::New) {
            self.parse_new()?
        } else {
            self.parse_primary()?
        };
        let callee = self.parse_chain(callee_start, callee, false)?;
        if self.at(TokenKind::Lt) {
            let saved = self.pos;
            if !(self.try_skip_type_args() && self.at(TokenKind::LParen)) {
                self.pos = saved;
            }
        }
        let args = if self.at(TokenKind::LParen) {
            self.parse_arguments()?
        } else {
            Vec::new()
        };

        Ok(Expr::new(
            ExprKind::New {
                callee: Box::new(callee),
                args,
            },
            self.span_from(start),
        ))
    }

    // === Primary expressions ===

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let token = self.current().clone();
        let start = token.span.start;

        let kind = match token.kind {
            TokenKind::Ident => {
                let text = self.text(token.span);
                if text == "async" && self.peek_ahead(1) == TokenKind::Function && !self.newline_ahead(1) {
                    return self.parse_function_expr(true);
                }
                self.advance();
                ExprKind::Ident(text.to_string())
            }
            TokenKind::This => {
                self.advance();
                ExprKind::This
            }
            TokenKind::Super => {
                self.advance();
                ExprKind::Ident("super".to_string())
            }
            TokenKind::True | TokenKind::False => {
                self.advance();
                ExprKind::Literal(Literal::Bool(token.kind == TokenKind::True))
            }
            TokenKind::Null => {
                self.advance();
                ExprKind::Literal(Literal::Null)
            }
            TokenKind::Number => {
                self.advance();
                let raw = self.text(token.span);
                match raw.strip_suffix('n') {
                    Some(digits) => ExprKind::Literal(Literal::BigInt(digits.to_string())),
                    None => {
                        let (value, raw) = self.number_value(token.span)?;
                        ExprKind::Literal(Literal::Number { value, raw })
                    }
                }
            }
            TokenKind::String => {
                self.advance();
                ExprKind::Literal(Literal::String(self.string_value(token.span)?))
            }
            TokenKind::Template => return self.parse_template(start, None),
            TokenKind::Regex => {
                self.advance();
                let text = self.text(token.span);
                let close = text.rfind('/').filter(|close| *close > 0);
                let Some(close) = close else {
                    return Err(ParseError::InvalidLiteral { span: token.span });
                };
                ExprKind::Literal(Literal::Regex {
                    pattern: text[1..close].to_string(),
                    flags: text[close + 1..].to_string(),
                })
            }
            TokenKind::LParen => {
                self.advance();
                let expr = self.with_in(|p| p.parse_expression())?;
                self.consume(TokenKind::RParen)?;
                // Parentheses are not represented; the inner span is kept
                return Ok(expr);
            }
            TokenKind::LBracket => return self.parse_array(),
            TokenKind::LBrace => return self.parse_object(),
            TokenKind::Function => return self.parse_function_expr(false),
            TokenKind::Class => {
                let class = self.parse_class()?;
                ExprKind::Class(Box::new(class))
            }
            TokenKind::Import => {
                self.advance();
                if self.eat(TokenKind::Dot) {
                    let property = self.consume_ident()?;
                    ExprKind::MetaProperty(format!("import.{}", property.name))
                } else {
                    ExprKind::MetaProperty("import".to_string())
                }
            }
            TokenKind::Lt => {
                return Err(ParseError::Unsupported {
                    what: "JSX".to_string(),
                    span: token.span,
                })
            }
            TokenKind::At => {
                return Err(ParseError::Unsupported {
                    what: "decorators".to_string(),
                    span: token.span,
                })
            }
            TokenKind::Error => return Err(ParseError::InvalidLiteral { span: token.span }),
            _ => return Err(self.unexpected("expression")),
        };

        Ok(Expr::new(kind, self.span_from(start)))
    }

    fn parse_function_expr(&mut self, is_async: bool) -> Result<Expr, ParseError> {
        let start = self.start();
        if is_async {
            self.consume_word("async")?;
        }
        self.consume(TokenKind::Function)?;
        let is_generator = self.eat(TokenKind::Star);
        let name = if self.at(TokenKind::Ident) {
            Some(self.consume_ident()?)
        } else {
            None
        };
        if !matches!(self.peek(), TokenKind::LParen | TokenKind::Lt) {
            return Err(self.unexpected("'('"));
        }
        match self.parse_function_rest(start, name, is_async, is_generator)? {
            Some(function) => Ok(Expr::new(
                ExprKind::Function(Box::new(function)),
                self.span_from(start),
            )),
            None => Err(self.unexpected("function body")),
        }
    }

    fn parse_array(&mut self) -> Result<Expr, ParseError> {
        let start = self.start();
        self.consume(TokenKind::LBracket)?;
        let items = self.with_in(|p| {
            let mut items = Vec::new();
            while !p.at(TokenKind::RBracket) {
                if p.eat(TokenKind::Comma) {
                    items.push(None);
                    continue;
                }
                items.push(Some(p.parse_spread_or_assign()?));
                if !p.at(TokenKind::RBracket) {
                    p.consume(TokenKind::Comma)?;
                }
            }
            Ok::<_, ParseError>(items)
        })?;
        self.consume(TokenKind::RBracket)?;
        Ok(Expr::new(ExprKind::Array(items), self.span_from(start)))
    }

    fn parse_object(&mut self) -> Result<Expr, ParseError> {
        let start = self.start();
        self.consume(TokenKind::LBrace)?;
        let props = self.with_in(|p| {
            let mut props = Vec::new();
            while !p.at(TokenKind::RBrace) {
                props.push(p.parse_object_prop()?);
                if !p.at(TokenKind::RBrace) {
                    p.consume(TokenKind::Comma)?;
                }
            }
            Ok::<_, ParseError>(props)
        })?;
        self.consume(TokenKind::RBrace)?;
        Ok(Expr::new(ExprKind::Object(props), self.span_from(start)))
    }

    /// Whether the token `n` ahead can begin a property key
    fn prop_key_ahead(&self, n: usize) -> bool {
        let kind = self.peek_ahead(n);
        kind.is_identifier_name()
            || matches!(
                kind,
                TokenKind::String
                    | TokenKind::Number
                    | TokenKind::LBracket
                    | TokenKind::PrivateName
                    | TokenKind::Star
            )
    }

    fn parse_object_prop(&mut self) -> Result<Prop, ParseError> {
        let start = self.start();

        if self.eat(TokenKind::Ellipsis) {
            let arg = self.parse_assign()?;
            return Ok(Prop {
                kind: PropKind::Spread(arg),
                span: self.span_from(start),
            });
        }

        let mut is_async = false;
        let mut method_kind = MethodKind::Method;
        if self.at_word("async") && self.prop_key_ahead(1) && !self.newline_ahead(1) {
            self.advance();
            is_async = true;
        } else if self.at_word("get") && self.prop_key_ahead(1) {
            self.advance();
            method_kind = MethodKind::Getter;
        } else if self.at_word("set") && self.prop_key_ahead(1) {
            self.advance();
            method_kind = MethodKind::Setter;
        }
        let is_generator = self.eat(TokenKind::Star);

        let shorthand = if self.at(TokenKind::Ident) {
            Some((self.text_ahead(0).to_string(), self.current().span))
        } else {
            None
        };
        let key = self.parse_prop_key()?;

        if matches!(self.peek(), TokenKind::LParen | TokenKind::Lt) {
            let function = self
                .parse_function_rest(key.span.start, None, is_async, is_generator)?
                .ok_or_else(|| self.unexpected("method body"))?;
            return Ok(Prop {
                kind: PropKind::Method {
                    key,
                    kind: method_kind,
                    function,
                },
                span: self.span_from(start),
            });
        }

        if is_async || is_generator || method_kind != MethodKind::Method {
            return Err(self.unexpected("'('"));
        }

        let kind = if self.eat(TokenKind::Colon) {
            PropKind::KeyValue {
                key,
                value: self.parse_assign()?,
            }
        } else if let Some((name, span)) = shorthand {
            if self.eat(TokenKind::Eq) {
                // Cover grammar for destructuring assignment: `({ a = 1 } = obj)`
                let value = self.parse_assign()?;
                let target = Expr::new(ExprKind::Ident(name), span);
                let value = Expr::new(
                    ExprKind::Assign {
                        op: AssignOp::Assign,
                        target: Box::new(target),
                        value: Box::new(value),
                    },
                    self.span_from(start),
                );
                PropKind::KeyValue { key, value }
            } else {
                PropKind::Shorthand { name, span }
            }
        } else {
            return Err(self.unexpected("':'"));
        };

        Ok(Prop {
            kind,
            span: self.span_from(start),
        })
    }

    // === Templates ===

    /// Template literal at the current token; substitutions are lexed and
    /// parsed in place so their spans stay relative to the whole source
    fn parse_template(&mut self, start: usize, tag: Option<Expr>) -> Result<Expr, ParseError> {
        let span = self.consume(TokenKind::Template)?;
        let parts = template_parts(self.text(span)).ok_or(ParseError::InvalidLiteral { span })?;

        let mut exprs = Vec::with_capacity(parts.substitutions.len());
        for (sub_start, sub_end) in parts.substitutions {
            let tokens = tokenize_range(self.source, span.start + sub_start, span.start + sub_end);
            let mut sub = Parser::new(self.source, tokens);
            sub.in_async = self.in_async;
            sub.in_generator = self.in_generator;
            let expr = sub.parse_expression()?;
            if !sub.at(TokenKind::Eof) {
                return Err(sub.unexpected("'}'"));
            }
            exprs.push(expr);
        }

        Ok(Expr::new(
            ExprKind::Template {
                tag: tag.map(Box::new),
                quasis: parts.quasis.iter().map(|raw| cook_string(raw)).collect(),
                exprs,
            },
            self.span_from(start),
        ))
    }
}

/// Valid left-hand side for the given assignment operator
fn is_assignable(target: &Expr, op: AssignOp) -> bool {
    match &target.kind {
        ExprKind::Ident(_) => true,
        ExprKind::Member { optional, .. } => !optional,
        ExprKind::TsCast(inner) => is_assignable(inner, op),
        ExprKind::Array(_) | ExprKind::Object(_) => op == AssignOp::Assign,
        _ => false,
    }
}
