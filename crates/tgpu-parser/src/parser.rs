//! Recursive descent parser implementation: utilities, statements and
//! module items. Expressions live in `expr.rs`, TypeScript skipping in `ts.rs`.

use tgpu_ast::*;
use tgpu_lexer::{Token, TokenKind};

use crate::ParseError;

pub struct Parser<'a> {
    pub(crate) source: &'a str,
    pub(crate) tokens: Vec<Token>,
    pub(crate) pos: usize,
    pub(crate) in_async: bool,
    pub(crate) in_generator: bool,
    /// Inside a `for (...)` head, where `in` ends the initializer
    pub(crate) no_in: bool,
}

impl<'a> Parser<'a> {
    pub fn new(source: &'a str, mut tokens: Vec<Token>) -> Self {
        if tokens.last().map(|t| t.kind) != Some(TokenKind::Eof) {
            tokens.push(Token {
                kind: TokenKind::Eof,
                span: Span::new(source.len(), source.len()),
                newline_before: false,
            });
        }
        Self {
            source,
            tokens,
            pos: 0,
            in_async: false,
            in_generator: false,
            no_in: false,
        }
    }

    // === Utilities ===

    pub(crate) fn current(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    pub(crate) fn peek(&self) -> TokenKind {
        self.current().kind
    }

    pub(crate) fn peek_ahead(&self, n: usize) -> TokenKind {
        self.tokens
            .get(self.pos + n)
            .map(|t| t.kind)
            .unwrap_or(TokenKind::Eof)
    }

    /// Whether the token `n` ahead is preceded by a line break
    pub(crate) fn newline_ahead(&self, n: usize) -> bool {
        self.tokens
            .get(self.pos + n)
            .map(|t| t.newline_before)
            .unwrap_or(false)
    }

    pub(crate) fn text_ahead(&self, n: usize) -> &'a str {
        match self.tokens.get(self.pos + n) {
            Some(token) => token.text(self.source),
            None => "",
        }
    }

    pub(crate) fn advance(&mut self) -> Span {
        let span = self.current().span;
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        span
    }

    pub(crate) fn at(&self, kind: TokenKind) -> bool {
        self.peek() == kind
    }

    /// At an identifier token spelled exactly `word` (contextual keywords)
    pub(crate) fn at_word(&self, word: &str) -> bool {
        self.at(TokenKind::Ident) && self.text_ahead(0) == word
    }

    pub(crate) fn eat(&mut self, kind: TokenKind) -> bool {
        if self.at(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub(crate) fn consume(&mut self, kind: TokenKind) -> Result<Span, ParseError> {
        if self.at(kind) {
            Ok(self.advance())
        } else {
            Err(self.unexpected(kind.describe()))
        }
    }

    pub(crate) fn consume_word(&mut self, word: &str) -> Result<Span, ParseError> {
        if self.at_word(word) {
            Ok(self.advance())
        } else {
            Err(self.unexpected(format!("'{}'", word)))
        }
    }

    pub(crate) fn consume_ident(&mut self) -> Result<Ident, ParseError> {
        if self.at(TokenKind::Ident) {
            let name = self.text_ahead(0).to_string();
            let span = self.advance();
            Ok(Ident::new(name, span))
        } else {
            Err(self.unexpected("identifier"))
        }
    }

    pub(crate) fn unexpected(&self, expected: impl Into<String>) -> ParseError {
        let token = self.current();
        ParseError::unexpected(expected, token.kind, token.span)
    }

    pub(crate) fn text(&self, span: Span) -> &'a str {
        span.slice(self.source)
    }

    pub(crate) fn start(&self) -> usize {
        self.current().span.start
    }

    /// End offset of the last consumed token
    pub(crate) fn prev_end(&self) -> usize {
        if self.pos == 0 {
            return self.current().span.start;
        }
        self.tokens[self.pos - 1].span.end
    }

    pub(crate) fn span_from(&self, start: usize) -> Span {
        Span::new(start, self.prev_end().max(start))
    }

    /// `;`, or a position where automatic semicolon insertion applies
    pub(crate) fn consume_semicolon(&mut self) -> Result<(), ParseError> {
        if self.eat(TokenKind::Semicolon) {
            return Ok(());
        }
        if self.at(TokenKind::RBrace) || self.at(TokenKind::Eof) || self.current().newline_before {
            return Ok(());
        }
        Err(self.unexpected("';'"))
    }

    // === Program ===

    pub fn parse_program(&mut self) -> Result<Program, ParseError> {
        let start = self.start();
        let mut body = Vec::new();

        while !self.at(TokenKind::Eof) {
            body.push(self.parse_statement()?);
        }

        Ok(Program {
            body,
            span: Span::new(start.min(self.source.len()), self.source.len()),
        })
    }

    // === Statements ===

    pub(crate) fn parse_statement(&mut self) -> Result<Stmt, ParseError> {
        let start = self.start();

        let kind = match self.peek() {
            TokenKind::LBrace => StmtKind::Block(self.parse_block()?),
            TokenKind::Semicolon => {
                self.advance();
                StmtKind::Empty
            }
            TokenKind::Var | TokenKind::Let => {
                let decl = self.parse_var_decl(false)?;
                self.consume_semicolon()?;
                StmtKind::VarDecl(decl)
            }
            TokenKind::Const => {
                if self.peek_ahead(1) == TokenKind::Ident && self.text_ahead(1) == "enum" {
                    self.skip_ts_declaration()?;
                    StmtKind::TsDecl
                } else {
                    let decl = self.parse_var_decl(false)?;
                    self.consume_semicolon()?;
                    StmtKind::VarDecl(decl)
                }
            }
            TokenKind::Function => return self.parse_function_declaration(start, false),
            TokenKind::Class => StmtKind::ClassDecl(self.parse_class()?),
            TokenKind::If => self.parse_if()?,
            TokenKind::For => self.parse_for()?,
            TokenKind::While => {
                self.advance();
                self.consume(TokenKind::LParen)?;
                let test = self.parse_expression()?;
                self.consume(TokenKind::RParen)?;
                let body = Box::new(self.parse_statement()?);
                StmtKind::While { test, body }
            }
            TokenKind::Do => {
                self.advance();
                let body = Box::new(self.parse_statement()?);
                self.consume(TokenKind::While)?;
                self.consume(TokenKind::LParen)?;
                let test = self.parse_expression()?;
                self.consume(TokenKind::RParen)?;
                self.eat(TokenKind::Semicolon);
                StmtKind::DoWhile { body, test }
            }
            TokenKind::Return => {
                self.advance();
                let arg = if self.at(TokenKind::Semicolon)
                    || self.at(TokenKind::RBrace)
                    || self.at(TokenKind::Eof)
                    || self.current().newline_before
                {
                    None
                } else {
                    Some(self.parse_expression()?)
                };
                self.consume_semicolon()?;
                StmtKind::Return(arg)
            }
            TokenKind::Break | TokenKind::Continue => {
                let is_break = self.at(TokenKind::Break);
                self.advance();
                let label = if self.at(TokenKind::Ident) && !self.current().newline_before {
                    Some(self.consume_ident()?)
                } else {
                    None
                };
                self.consume_semicolon()?;
                if is_break {
                    StmtKind::Break(label)
                } else {
                    StmtKind::Continue(label)
                }
            }
            TokenKind::Throw => {
                self.advance();
                let arg = self.parse_expression()?;
                self.consume_semicolon()?;
                StmtKind::Throw(arg)
            }
            TokenKind::Try => self.parse_try()?,
            TokenKind::Switch => self.parse_switch()?,
            TokenKind::Debugger => {
                self.advance();
                self.consume_semicolon()?;
                StmtKind::Empty
            }
            TokenKind::Import
                if !matches!(self.peek_ahead(1), TokenKind::LParen | TokenKind::Dot) =>
            {
                self.parse_import()?
            }
            TokenKind::Export => self.parse_export()?,
            TokenKind::At => {
                return Err(ParseError::Unsupported {
                    what: "decorators".to_string(),
                    span: self.current().span,
                })
            }
            TokenKind::Ident => {
                if let Some(kind) = self.parse_ident_led_statement(start)? {
                    kind
                } else {
                    self.parse_expression_statement()?
                }
            }
            _ => self.parse_expression_statement()?,
        };

        Ok(Stmt::new(kind, self.span_from(start)))
    }

    /// Statements introduced by a contextual keyword (`async function`,
    /// TypeScript declarations, labels). `None` means "parse as expression".
    fn parse_ident_led_statement(&mut self, start: usize) -> Result<Option<StmtKind>, ParseError> {
        let word = self.text_ahead(0);
        let next = self.peek_ahead(1);
        let same_line = !self.newline_ahead(1);

        if word == "async" && next == TokenKind::Function && same_line {
            return Ok(Some(self.parse_function_declaration(start, true)?.kind));
        }
        if next == TokenKind::Colon {
            let label = self.consume_ident()?;
            self.advance();
            let body = Box::new(self.parse_statement()?);
            return Ok(Some(StmtKind::Labeled { label, body }));
        }
        if self.at_ts_declaration() {
            self.skip_ts_declaration()?;
            return Ok(Some(StmtKind::TsDecl));
        }
        if word == "abstract" && next == TokenKind::Class && same_line {
            self.advance();
            return Ok(Some(StmtKind::ClassDecl(self.parse_class()?)));
        }
        Ok(None)
    }

    /// At `type X =`, `interface X`, `declare ...`, `enum X`, `namespace X {`
    pub(crate) fn at_ts_declaration(&self) -> bool {
        if !self.at(TokenKind::Ident) || self.newline_ahead(1) {
            return false;
        }
        let next = self.peek_ahead(1);
        match self.text_ahead(0) {
            "type" => {
                next == TokenKind::Ident
                    && matches!(self.peek_ahead(2), TokenKind::Eq | TokenKind::Lt)
            }
            "interface" | "enum" => next == TokenKind::Ident,
            "declare" => next == TokenKind::Ident || next.is_keyword(),
            "namespace" | "module" => {
                matches!(next, TokenKind::Ident | TokenKind::String)
                    && matches!(self.peek_ahead(2), TokenKind::LBrace | TokenKind::Dot)
            }
            _ => false,
        }
    }

    fn parse_expression_statement(&mut self) -> Result<StmtKind, ParseError> {
        let expr = self.parse_expression()?;
        self.consume_semicolon()?;
        Ok(StmtKind::Expr(expr))
    }

    pub(crate) fn parse_block(&mut self) -> Result<Block, ParseError> {
        let start = self.start();
        self.consume(TokenKind::LBrace)?;
        let mut statements = Vec::new();
        while !self.at(TokenKind::RBrace) && !self.at(TokenKind::Eof) {
            statements.push(self.parse_statement()?);
        }
        self.consume(TokenKind::RBrace)?;
        Ok(Block {
            statements,
            span: self.span_from(start),
        })
    }

    /// `var`/`let`/`const` declaration without the trailing semicolon.
    /// `no_in` forbids the `in` operator inside initializers (for-heads).
    pub(crate) fn parse_var_decl(&mut self, no_in: bool) -> Result<VarDecl, ParseError> {
        let start = self.start();
        let kind = match self.peek() {
            TokenKind::Var => VarKind::Var,
            TokenKind::Let => VarKind::Let,
            TokenKind::Const => VarKind::Const,
            _ => return Err(self.unexpected("variable declaration")),
        };
        self.advance();

        let mut declarators = Vec::new();
        loop {
            let decl_start = self.start();
            let target = self.parse_binding_target()?;
            // Definite assignment assertion: `let x!: T`
            self.eat(TokenKind::Bang);
            if self.eat(TokenKind::Colon) {
                self.skip_type()?;
            }
            let init = if self.eat(TokenKind::Eq) {
                Some(self.parse_assign_no_in(no_in)?)
            } else {
                None
            };
            declarators.push(VarDeclarator {
                target,
                init,
                span: self.span_from(decl_start),
            });
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }

        Ok(VarDecl {
            kind,
            declarators,
            span: self.span_from(start),
        })
    }

    fn parse_if(&mut self) -> Result<StmtKind, ParseError> {
        self.consume(TokenKind::If)?;
        self.consume(TokenKind::LParen)?;
        let test = self.parse_expression()?;
        self.consume(TokenKind::RParen)?;
        let consequent = Box::new(self.parse_statement()?);
        let alternate = if self.eat(TokenKind::Else) {
            Some(Box::new(self.parse_statement()?))
        } else {
            None
        };
        Ok(StmtKind::If {
            test,
            consequent,
            alternate,
        })
    }

    fn parse_for(&mut self) -> Result<StmtKind, ParseError> {
        self.consume(TokenKind::For)?;
        let is_await = if self.at_word("await") {
            self.advance();
            true
        } else {
            false
        };
        self.consume(TokenKind::LParen)?;

        let mut init = None;
        if !self.at(TokenKind::Semicolon) {
            if matches!(self.peek(), TokenKind::Var | TokenKind::Let | TokenKind::Const) {
                let decl = self.parse_var_decl(true)?;
                if let Some(kind) = self.for_each_kind(is_await) {
                    self.advance();
                    return self.finish_for_each(kind, ForHead::VarDecl(decl));
                }
                init = Some(ForInit::VarDecl(decl));
            } else {
                let expr = self.parse_expression_no_in()?;
                if let Some(kind) = self.for_each_kind(is_await) {
                    self.advance();
                    return self.finish_for_each(kind, ForHead::Target(expr));
                }
                init = Some(ForInit::Expr(expr));
            }
        }

        self.consume(TokenKind::Semicolon)?;
        let test = if self.at(TokenKind::Semicolon) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.consume(TokenKind::Semicolon)?;
        let update = if self.at(TokenKind::RParen) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.consume(TokenKind::RParen)?;
        let body = Box::new(self.parse_statement()?);

        Ok(StmtKind::For {
            init,
            test,
            update,
            body,
        })
    }

    fn for_each_kind(&self, is_await: bool) -> Option<ForEachKind> {
        if self.at(TokenKind::In) {
            Some(ForEachKind::In)
        } else if self.at_word("of") {
            Some(if is_await {
                ForEachKind::AwaitOf
            } else {
                ForEachKind::Of
            })
        } else {
            None
        }
    }

    fn finish_for_each(&mut self, kind: ForEachKind, left: ForHead) -> Result<StmtKind, ParseError> {
        let right = if kind == ForEachKind::In {
            self.parse_expression()?
        } else {
            self.parse_assign()?
        };
        self.consume(TokenKind::RParen)?;
        let body = Box::new(self.parse_statement()?);
        Ok(StmtKind::ForEach {
            kind,
            left,
            right,
            body,
        })
    }

    fn parse_try(&mut self) -> Result<StmtKind, ParseError> {
        self.consume(TokenKind::Try)?;
        let block = self.parse_block()?;

        let handler = if self.at(TokenKind::Catch) {
            let start = self.start();
            self.advance();
            let param = if self.eat(TokenKind::LParen) {
                let pattern = self.parse_binding_target()?;
                if self.eat(TokenKind::Colon) {
                    self.skip_type()?;
                }
                self.consume(TokenKind::RParen)?;
                Some(pattern)
            } else {
                None
            };
            let body = self.parse_block()?;
            Some(CatchClause {
                param,
                body,
                span: self.span_from(start),
            })
        } else {
            None
        };

        let finalizer = if self.eat(TokenKind::Finally) {
            Some(self.parse_block()?)
        } else {
            None
        };

        if handler.is_none() && finalizer.is_none() {
            return Err(self.unexpected("'catch' or 'finally'"));
        }

        Ok(StmtKind::Try {
            block,
            handler,
            finalizer,
        })
    }

    fn parse_switch(&mut self) -> Result<StmtKind, ParseError> {
        self.consume(TokenKind::Switch)?;
        self.consume(TokenKind::LParen)?;
        let discriminant = self.parse_expression()?;
        self.consume(TokenKind::RParen)?;
        self.consume(TokenKind::LBrace)?;

        let mut cases = Vec::new();
        while !self.at(TokenKind::RBrace) && !self.at(TokenKind::Eof) {
            let start = self.start();
            let test = if self.eat(TokenKind::Default) {
                None
            } else {
                self.consume(TokenKind::Case)?;
                Some(self.parse_expression()?)
            };
            self.consume(TokenKind::Colon)?;
            let mut body = Vec::new();
            while !matches!(
                self.peek(),
                TokenKind::Case | TokenKind::Default | TokenKind::RBrace | TokenKind::Eof
            ) {
                body.push(self.parse_statement()?);
            }
            cases.push(SwitchCase {
                test,
                body,
                span: self.span_from(start),
            });
        }
        self.consume(TokenKind::RBrace)?;

        Ok(StmtKind::Switch {
            discriminant,
            cases,
        })
    }

    // === Functions ===

    fn parse_function_declaration(&mut self, start: usize, is_async: bool) -> Result<Stmt, ParseError> {
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
        match self.parse_function_rest(start, name, is_async, is_generator)? {
            Some(function) => Ok(Stmt::new(StmtKind::FnDecl(function), self.span_from(start))),
            // Overload signature without a body
            None => Ok(Stmt::new(StmtKind::TsDecl, self.span_from(start))),
        }
    }

    /// Type parameters, parameter list, return type and body. Returns `None`
    /// for a body-less TypeScript overload signature.
    pub(crate) fn parse_function_rest(
        &mut self,
        start: usize,
        name: Option<Ident>,
        is_async: bool,
        is_generator: bool,
    ) -> Result<Option<Function>, ParseError> {
        if self.at(TokenKind::Lt) {
            self.skip_type_params()?;
        }
        let params_start = self.start();
        let params = self.parse_params()?;
        let params_span = self.span_from(params_start);
        if self.eat(TokenKind::Colon) {
            self.skip_type()?;
        }

        if !self.at(TokenKind::LBrace) {
            self.consume_semicolon()?;
            return Ok(None);
        }

        let body = self.parse_function_body(is_async, is_generator)?;
        Ok(Some(Function {
            name,
            params,
            body: FunctionBody::Block(body),
            is_arrow: false,
            is_async,
            is_generator,
            params_span,
            span: self.span_from(start),
        }))
    }

    pub(crate) fn parse_function_body(
        &mut self,
        is_async: bool,
        is_generator: bool,
    ) -> Result<Block, ParseError> {
        let saved = (self.in_async, self.in_generator, self.no_in);
        self.in_async = is_async;
        self.in_generator = is_generator;
        self.no_in = false;
        let body = self.parse_block();
        (self.in_async, self.in_generator, self.no_in) = saved;
        body
    }

    /// Parenthesized parameter list
    pub(crate) fn parse_params(&mut self) -> Result<Vec<Param>, ParseError> {
        self.consume(TokenKind::LParen)?;
        let mut params = Vec::new();
        while !self.at(TokenKind::RParen) {
            if let Some(param) = self.parse_param()? {
                params.push(param);
            }
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.consume(TokenKind::RParen)?;
        Ok(params)
    }

    fn parse_param(&mut self) -> Result<Option<Param>, ParseError> {
        let start = self.start();

        // `this: Type` declares the receiver type only
        if self.at(TokenKind::This) && self.peek_ahead(1) == TokenKind::Colon {
            self.advance();
            self.advance();
            self.skip_type()?;
            return Ok(None);
        }

        // Constructor parameter properties: `private readonly x: T`
        while self.at(TokenKind::Ident)
            && matches!(
                self.text_ahead(0),
                "public" | "private" | "protected" | "readonly" | "override"
            )
            && matches!(
                self.peek_ahead(1),
                TokenKind::Ident | TokenKind::LBrace | TokenKind::LBracket
            )
        {
            self.advance();
        }

        let rest = self.eat(TokenKind::Ellipsis);
        let mut pattern = self.parse_binding_target()?;
        self.eat(TokenKind::Question);
        let type_annotation = if self.at(TokenKind::Colon) {
            self.advance();
            let type_start = self.start();
            self.skip_type()?;
            Some(self.text(self.span_from(type_start)).to_string())
        } else {
            None
        };
        if self.eat(TokenKind::Eq) {
            let default = self.parse_assign()?;
            pattern = Pattern {
                kind: PatternKind::Assign {
                    target: Box::new(pattern),
                    default: Box::new(default),
                },
                span: self.span_from(start),
            };
        }
        if rest {
            pattern = Pattern {
                kind: PatternKind::Rest(Box::new(pattern)),
                span: self.span_from(start),
            };
        }

        Ok(Some(Param {
            pattern,
            type_annotation,
            span: self.span_from(start),
        }))
    }

    // === Patterns ===

    /// Identifier, array or object binding pattern (no default)
    pub(crate) fn parse_binding_target(&mut self) -> Result<Pattern, ParseError> {
        let start = self.start();
        match self.peek() {
            TokenKind::Ident => {
                let ident = self.consume_ident()?;
                Ok(Pattern::ident(ident.name, ident.span))
            }
            TokenKind::LBracket => {
                self.advance();
                let mut items = Vec::new();
                while !self.at(TokenKind::RBracket) {
                    if self.at(TokenKind::Comma) {
                        self.advance();
                        items.push(None);
                        continue;
                    }
                    items.push(Some(self.parse_binding_element()?));
                    if !self.at(TokenKind::RBracket) {
                        self.consume(TokenKind::Comma)?;
                    }
                }
                self.consume(TokenKind::RBracket)?;
                Ok(Pattern {
                    kind: PatternKind::Array(items),
                    span: self.span_from(start),
                })
            }
            TokenKind::LBrace => {
                self.advance();
                let mut props = Vec::new();
                while !self.at(TokenKind::RBrace) {
                    if self.eat(TokenKind::Ellipsis) {
                        props.push(ObjectPatternProp::Rest(self.parse_binding_target()?));
                    } else {
                        props.push(self.parse_object_pattern_prop()?);
                    }
                    if !self.at(TokenKind::RBrace) {
                        self.consume(TokenKind::Comma)?;
                    }
                }
                self.consume(TokenKind::RBrace)?;
                Ok(Pattern {
                    kind: PatternKind::Object(props),
                    span: self.span_from(start),
                })
            }
            _ => Err(ParseError::InvalidPattern {
                span: self.current().span,
            }),
        }
    }

    /// Binding target with optional default, or a rest element
    fn parse_binding_element(&mut self) -> Result<Pattern, ParseError> {
        let start = self.start();
        if self.eat(TokenKind::Ellipsis) {
            let inner = self.parse_binding_target()?;
            return Ok(Pattern {
                kind: PatternKind::Rest(Box::new(inner)),
                span: self.span_from(start),
            });
        }
        let target = self.parse_binding_target()?;
        self.with_default(start, target)
    }

    fn with_default(&mut self, start: usize, target: Pattern) -> Result<Pattern, ParseError> {
        if self.eat(TokenKind::Eq) {
            let default = self.parse_assign()?;
            Ok(Pattern {
                kind: PatternKind::Assign {
                    target: Box::new(target),
                    default: Box::new(default),
                },
                span: self.span_from(start),
            })
        } else {
            Ok(target)
        }
    }

    fn parse_object_pattern_prop(&mut self) -> Result<ObjectPatternProp, ParseError> {
        let start = self.start();
        let shorthand_name = if self.at(TokenKind::Ident) {
            Some(self.text_ahead(0).to_string())
        } else {
            None
        };
        let key = self.parse_prop_key()?;

        if self.eat(TokenKind::Colon) {
            let value_start = self.start();
            let target = self.parse_binding_target()?;
            let value = self.with_default(value_start, target)?;
            return Ok(ObjectPatternProp::KeyValue {
                key,
                value,
                shorthand: false,
            });
        }

        let name = shorthand_name.ok_or(ParseError::InvalidPattern { span: key.span })?;
        let target = Pattern::ident(name, key.span);
        let value = self.with_default(start, target)?;
        Ok(ObjectPatternProp::KeyValue {
            key,
            value,
            shorthand: true,
        })
    }

    /// Property key of an object literal, object pattern or class member
    pub(crate) fn parse_prop_key(&mut self) -> Result<PropKey, ParseError> {
        let start = self.start();
        let token = self.current().clone();
        let kind = match token.kind {
            TokenKind::String => {
                self.advance();
                PropKeyKind::String(self.string_value(token.span)?)
            }
            TokenKind::Number => {
                self.advance();
                let (value, _) = self.number_value(token.span)?;
                PropKeyKind::Number(value)
            }
            TokenKind::PrivateName => {
                self.advance();
                PropKeyKind::Private(self.text(token.span)[1..].to_string())
            }
            TokenKind::LBracket => {
                self.advance();
                let expr = self.parse_assign()?;
                self.consume(TokenKind::RBracket)?;
                PropKeyKind::Computed(Box::new(expr))
            }
            kind if kind.is_identifier_name() => {
                self.advance();
                PropKeyKind::Ident(self.text(token.span).to_string())
            }
            _ => return Err(self.unexpected("property name")),
        };
        Ok(PropKey {
            kind,
            span: self.span_from(start),
        })
    }

    // === Classes ===

    /// `class Name<T> extends Base implements I { ... }`
    pub(crate) fn parse_class(&mut self) -> Result<Class, ParseError> {
        let start = self.start();
        self.consume(TokenKind::Class)?;
        let name = if self.at(TokenKind::Ident) && !self.at_word("implements") {
            Some(self.consume_ident()?)
        } else {
            None
        };
        if self.at(TokenKind::Lt) {
            self.skip_type_params()?;
        }
        let super_class = if self.eat(TokenKind::Extends) {
            let base = self.parse_lhs_no_call()?;
            if self.at(TokenKind::Lt) {
                self.skip_type_args()?;
            }
            Some(base)
        } else {
            None
        };
        if self.at_word("implements") {
            self.advance();
            loop {
                self.skip_type()?;
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
        }

        self.consume(TokenKind::LBrace)?;
        let mut members = Vec::new();
        while !self.at(TokenKind::RBrace) && !self.at(TokenKind::Eof) {
            if self.eat(TokenKind::Semicolon) {
                continue;
            }
            if let Some(member) = self.parse_class_member()? {
                members.push(member);
            }
        }
        self.consume(TokenKind::RBrace)?;

        Ok(Class {
            name,
            super_class,
            members,
            span: self.span_from(start),
        })
    }

    /// Whether the current identifier is used as a modifier rather than as
    /// the member name itself
    fn at_member_modifier(&self, words: &[&str]) -> bool {
        self.at(TokenKind::Ident)
            && words.contains(&self.text_ahead(0))
            && !self.newline_ahead(1)
            && {
                let next = self.peek_ahead(1);
                next.is_identifier_name()
                    || matches!(
                        next,
                        TokenKind::LBracket
                            | TokenKind::String
                            | TokenKind::Number
                            | TokenKind::PrivateName
                            | TokenKind::Star
                            | TokenKind::LBrace
                    )
            }
    }

    fn parse_class_member(&mut self) -> Result<Option<ClassMember>, ParseError> {
        let start = self.start();
        if self.at(TokenKind::At) {
            return Err(ParseError::Unsupported {
                what: "decorators".to_string(),
                span: self.current().span,
            });
        }

        let mut is_static = false;
        let mut is_abstract = false;
        while self.at_member_modifier(&[
            "static", "public", "private", "protected", "readonly", "abstract", "override",
            "declare", "accessor",
        ]) {
            match self.text_ahead(0) {
                "static" => is_static = true,
                "abstract" | "declare" => is_abstract = true,
                _ => {}
            }
            self.advance();
        }

        if is_static && self.at(TokenKind::LBrace) {
            let block = self.parse_block()?;
            return Ok(Some(ClassMember {
                kind: ClassMemberKind::StaticBlock(block),
                is_static,
                span: self.span_from(start),
            }));
        }

        // Index signature: `[key: string]: T;`
        if self.at(TokenKind::LBracket)
            && self.peek_ahead(1) == TokenKind::Ident
            && self.peek_ahead(2) == TokenKind::Colon
        {
            self.skip_ts_declaration()?;
            return Ok(None);
        }

        let mut is_async = false;
        let mut method_kind = MethodKind::Method;
        if self.at_member_modifier(&["async"]) {
            self.advance();
            is_async = true;
        } else if self.at_member_modifier(&["get"]) {
            self.advance();
            method_kind = MethodKind::Getter;
        } else if self.at_member_modifier(&["set"]) {
            self.advance();
            method_kind = MethodKind::Setter;
        }
        let is_generator = self.eat(TokenKind::Star);

        let key = self.parse_prop_key()?;
        self.eat(TokenKind::Question);

        if self.at(TokenKind::LParen) || self.at(TokenKind::Lt) {
            let fn_start = key.span.start;
            if matches!(&key.kind, PropKeyKind::Ident(name) if name == "constructor") {
                method_kind = MethodKind::Constructor;
            }
            let function = match self.parse_function_rest(fn_start, None, is_async, is_generator)? {
                Some(function) if !is_abstract => function,
                // Abstract members and overload signatures have no runtime body
                _ => return Ok(None),
            };
            return Ok(Some(ClassMember {
                kind: ClassMemberKind::Method {
                    key,
                    kind: method_kind,
                    function,
                },
                is_static,
                span: self.span_from(start),
            }));
        }

        self.eat(TokenKind::Bang);
        if self.eat(TokenKind::Colon) {
            self.skip_type()?;
        }
        let value = if self.eat(TokenKind::Eq) {
            Some(self.parse_assign()?)
        } else {
            None
        };
        self.consume_semicolon()?;

        Ok(Some(ClassMember {
            kind: ClassMemberKind::Field { key, value },
            is_static,
            span: self.span_from(start),
        }))
    }

    // === Modules ===

    fn parse_import(&mut self) -> Result<StmtKind, ParseError> {
        let start = self.start();
        self.consume(TokenKind::Import)?;

        // `import x = require('...')`
        if self.at(TokenKind::Ident) && self.peek_ahead(1) == TokenKind::Eq {
            self.skip_ts_declaration()?;
            return Ok(StmtKind::TsDecl);
        }

        let mut type_only = false;
        if self.at_word("type")
            && matches!(
                self.peek_ahead(1),
                TokenKind::LBrace | TokenKind::Star | TokenKind::Ident
            )
            && !(self.peek_ahead(1) == TokenKind::Ident && self.text_ahead(1) == "from")
        {
            self.advance();
            type_only = true;
        }

        let mut specifiers = Vec::new();
        if !self.at(TokenKind::String) {
            if self.at(TokenKind::Ident) {
                specifiers.push(ImportSpecifier::Default {
                    local: self.consume_ident()?,
                });
                self.eat(TokenKind::Comma);
            }
            if self.eat(TokenKind::Star) {
                self.consume_word("as")?;
                specifiers.push(ImportSpecifier::Namespace {
                    local: self.consume_ident()?,
                });
            } else if self.eat(TokenKind::LBrace) {
                while !self.at(TokenKind::RBrace) {
                    specifiers.push(self.parse_import_specifier()?);
                    if !self.eat(TokenKind::Comma) {
                        break;
                    }
                }
                self.consume(TokenKind::RBrace)?;
            }
            self.consume_word("from")?;
        }

        let source_span = self.consume(TokenKind::String)?;
        let source = self.string_value(source_span)?;
        self.skip_import_attributes()?;
        self.consume_semicolon()?;

        Ok(StmtKind::Import(ImportDecl {
            specifiers,
            source,
            type_only,
            span: self.span_from(start),
        }))
    }

    fn parse_import_specifier(&mut self) -> Result<ImportSpecifier, ParseError> {
        let mut type_only = false;
        if self.at_word("type")
            && (self.peek_ahead(1).is_identifier_name() || self.peek_ahead(1) == TokenKind::String)
            && !(self.peek_ahead(1) == TokenKind::Ident && self.text_ahead(1) == "as")
        {
            self.advance();
            type_only = true;
        }

        let imported_span = self.current().span;
        let imported = match self.peek() {
            TokenKind::String => {
                self.advance();
                self.string_value(imported_span)?
            }
            kind if kind.is_identifier_name() => {
                self.advance();
                self.text(imported_span).to_string()
            }
            _ => return Err(self.unexpected("import name")),
        };

        let local = if self.at_word("as") {
            self.advance();
            self.consume_ident()?
        } else {
            Ident::new(imported.clone(), imported_span)
        };

        Ok(ImportSpecifier::Named {
            imported,
            local,
            type_only,
        })
    }

    /// `with { type: 'json' }` / `assert { ... }`
    fn skip_import_attributes(&mut self) -> Result<(), ParseError> {
        if (self.at(TokenKind::With) || self.at_word("assert"))
            && !self.current().newline_before
            && self.peek_ahead(1) == TokenKind::LBrace
        {
            self.advance();
            self.skip_balanced()?;
        }
        Ok(())
    }

    fn parse_export(&mut self) -> Result<StmtKind, ParseError> {
        let export_start = self.start();
        self.consume(TokenKind::Export)?;

        // `export =`, `export as namespace`, `export type { ... }`, `export declare ...`
        if self.at(TokenKind::Eq)
            || self.at_word("as")
            || (self.at_word("type") && self.peek_ahead(1) == TokenKind::LBrace)
            || self.at_ts_declaration()
            || (self.at(TokenKind::Const)
                && self.peek_ahead(1) == TokenKind::Ident
                && self.text_ahead(1) == "enum")
        {
            self.skip_ts_declaration()?;
            return Ok(StmtKind::TsDecl);
        }

        if self.eat(TokenKind::Default) {
            let start = self.start();
            let is_async_fn = self.at_word("async")
                && self.peek_ahead(1) == TokenKind::Function
                && !self.newline_ahead(1);
            if self.at(TokenKind::Function) || is_async_fn {
                let stmt = self.parse_function_declaration(start, is_async_fn)?;
                return Ok(StmtKind::Export(ExportDecl::DefaultDecl(Box::new(stmt))));
            }
            if self.at(TokenKind::Class) {
                let class = self.parse_class()?;
                let stmt = Stmt::new(StmtKind::ClassDecl(class), self.span_from(start));
                return Ok(StmtKind::Export(ExportDecl::DefaultDecl(Box::new(stmt))));
            }
            if self.at_word("interface") {
                self.skip_ts_declaration()?;
                return Ok(StmtKind::TsDecl);
            }
            let expr = self.parse_assign()?;
            self.consume_semicolon()?;
            return Ok(StmtKind::Export(ExportDecl::DefaultExpr(expr)));
        }

        if self.eat(TokenKind::Star) {
            let alias = if self.at_word("as") {
                self.advance();
                let span = self.current().span;
                self.advance();
                Some(match self.tokens[self.pos - 1].kind {
                    TokenKind::String => self.string_value(span)?,
                    _ => self.text(span).to_string(),
                })
            } else {
                None
            };
            self.consume_word("from")?;
            let source_span = self.consume(TokenKind::String)?;
            let source = self.string_value(source_span)?;
            self.skip_import_attributes()?;
            self.consume_semicolon()?;
            return Ok(StmtKind::Export(ExportDecl::All { alias, source }));
        }

        if self.eat(TokenKind::LBrace) {
            let mut specifiers = Vec::new();
            while !self.at(TokenKind::RBrace) {
                if self.at_word("type") && self.peek_ahead(1).is_identifier_name() {
                    self.advance();
                }
                let local_span = self.current().span;
                let local_name = match self.peek() {
                    TokenKind::String => {
                        self.advance();
                        self.string_value(local_span)?
                    }
                    kind if kind.is_identifier_name() => {
                        self.advance();
                        self.text(local_span).to_string()
                    }
                    _ => return Err(self.unexpected("export name")),
                };
                let exported = if self.at_word("as") {
                    self.advance();
                    let span = self.advance();
                    match self.tokens[self.pos - 1].kind {
                        TokenKind::String => self.string_value(span)?,
                        _ => self.text(span).to_string(),
                    }
                } else {
                    local_name.clone()
                };
                specifiers.push(ExportSpecifier {
                    local: Ident::new(local_name, local_span),
                    exported,
                });
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
            self.consume(TokenKind::RBrace)?;
            let source = if self.at_word("from") {
                self.advance();
                let span = self.consume(TokenKind::String)?;
                Some(self.string_value(span)?)
            } else {
                None
            };
            self.skip_import_attributes()?;
            self.consume_semicolon()?;
            return Ok(StmtKind::Export(ExportDecl::Named { specifiers, source }));
        }

        let stmt = self.parse_statement()?;
        match stmt.kind {
            StmtKind::VarDecl(_) | StmtKind::FnDecl(_) | StmtKind::ClassDecl(_) => {
                Ok(StmtKind::Export(ExportDecl::Decl(Box::new(stmt))))
            }
            StmtKind::TsDecl => Ok(StmtKind::TsDecl),
            _ => Err(ParseError::Unsupported {
                what: "export of a non-declaration".to_string(),
                span: Span::new(export_start, stmt.span.end),
            }),
        }
    }

    // === Literal values ===

    pub(crate) fn string_value(&self, span: Span) -> Result<String, ParseError> {
        let text = self.text(span);
        if text.len() < 2 {
            return Err(ParseError::InvalidLiteral { span });
        }
        Ok(tgpu_lexer::cook_string(&text[1..text.len() - 1]))
    }

    /// Numeric value and raw spelling of a number token
    pub(crate) fn number_value(&self, span: Span) -> Result<(f64, String), ParseError> {
        let raw = self.text(span);
        let digits: String = raw.chars().filter(|c| *c != '_').collect();
        let lower = digits.to_ascii_lowercase();
        let value = if let Some(hex) = lower.strip_prefix("0x") {
            u64::from_str_radix(hex, 16).map(|v| v as f64).ok()
        } else if let Some(oct) = lower.strip_prefix("0o") {
            u64::from_str_radix(oct, 8).map(|v| v as f64).ok()
        } else if let Some(bin) = lower.strip_prefix("0b") {
            u64::from_str_radix(bin, 2).map(|v| v as f64).ok()
        } else {
            lower.parse::<f64>().ok()
        };
        match value {
            Some(value) => Ok((value, raw.to_string())),
            None => Err(ParseError::InvalidLiteral { span }),
        }
    }
}
