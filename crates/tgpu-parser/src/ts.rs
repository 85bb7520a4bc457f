//! TypeScript syntax that has no runtime meaning. Types are skipped rather
//! than represented; only their extent matters.

use tgpu_lexer::TokenKind;

use crate::{ParseError, Parser};

impl<'a> Parser<'a> {
    /// Skip a type: unions, intersections, conditional types and `x is T`
    /// predicates
    pub(crate) fn skip_type(&mut self) -> Result<(), ParseError> {
        if matches!(self.peek(), TokenKind::Pipe | TokenKind::Amp) {
            self.advance();
        }
        loop {
            self.skip_type_operand()?;
            if matches!(self.peek(), TokenKind::Pipe | TokenKind::Amp) {
                self.advance();
                continue;
            }
            break;
        }

        if self.at_word("is") && !self.current().newline_before {
            self.advance();
            return self.skip_type();
        }

        if self.at(TokenKind::Extends) {
            self.advance();
            self.skip_type_operand()?;
            self.consume(TokenKind::Question)?;
            self.skip_type()?;
            self.consume(TokenKind::Colon)?;
            self.skip_type()?;
        }
        Ok(())
    }

    fn skip_type_operand(&mut self) -> Result<(), ParseError> {
        while self.at(TokenKind::Ident)
            && matches!(self.text_ahead(0), "keyof" | "unique" | "readonly" | "infer" | "asserts")
            && !self.newline_ahead(1)
            && matches!(
                self.peek_ahead(1),
                TokenKind::Ident | TokenKind::This | TokenKind::LBracket | TokenKind::LParen | TokenKind::Typeof
            )
        {
            self.advance();
        }

        match self.peek() {
            TokenKind::LParen => {
                self.skip_balanced()?;
                if self.eat(TokenKind::FatArrow) {
                    return self.skip_type();
                }
            }
            TokenKind::Lt => {
                // Generic function type: `<T>(x: T) => T`
                self.skip_angles()?;
                self.skip_balanced()?;
                self.consume(TokenKind::FatArrow)?;
                return self.skip_type();
            }
            TokenKind::New => {
                self.advance();
                if self.at(TokenKind::Lt) {
                    self.skip_angles()?;
                }
                self.skip_balanced()?;
                self.consume(TokenKind::FatArrow)?;
                return self.skip_type();
            }
            TokenKind::LBracket | TokenKind::LBrace => self.skip_balanced()?,
            TokenKind::Typeof => {
                self.advance();
                if self.at(TokenKind::Import) {
                    self.advance();
                    self.skip_balanced()?;
                } else {
                    self.skip_identifier_name()?;
                }
                while self.eat(TokenKind::Dot) {
                    self.skip_identifier_name()?;
                }
            }
            TokenKind::Import => {
                self.advance();
                self.skip_balanced()?;
                while self.eat(TokenKind::Dot) {
                    self.skip_identifier_name()?;
                }
                if self.at(TokenKind::Lt) {
                    self.skip_angles()?;
                }
            }
            TokenKind::String
            | TokenKind::Number
            | TokenKind::Template
            | TokenKind::True
            | TokenKind::False
            | TokenKind::Null
            | TokenKind::Void
            | TokenKind::This
            | TokenKind::Const => {
                self.advance();
            }
            TokenKind::Minus => {
                self.advance();
                self.consume(TokenKind::Number)?;
            }
            kind if kind.is_identifier_name() => {
                if self.at_word("abstract") && self.peek_ahead(1) == TokenKind::New {
                    self.advance();
                    return self.skip_type_operand();
                }
                self.advance();
                while self.eat(TokenKind::Dot) {
                    self.skip_identifier_name()?;
                }
                if self.at(TokenKind::Lt) && !self.current().newline_before {
                    self.skip_angles()?;
                }
            }
            _ => return Err(self.unexpected("type")),
        }

        // Array and indexed access types: `T[]`, `T['key']`
        while self.at(TokenKind::LBracket) && !self.current().newline_before {
            self.skip_balanced()?;
        }
        Ok(())
    }

    fn skip_identifier_name(&mut self) -> Result<(), ParseError> {
        if self.peek().is_identifier_name() {
            self.advance();
            Ok(())
        } else {
            Err(self.unexpected("identifier"))
        }
    }

    pub(crate) fn skip_type_params(&mut self) -> Result<(), ParseError> {
        self.skip_angles()
    }

    pub(crate) fn skip_type_args(&mut self) -> Result<(), ParseError> {
        self.skip_angles()
    }

    /// Skip `<...>`, where `>>` and `>>>` may close several levels at once
    fn skip_angles(&mut self) -> Result<(), ParseError> {
        self.consume(TokenKind::Lt)?;
        let mut depth: i32 = 1;
        while depth > 0 {
            match self.peek() {
                TokenKind::Lt => depth += 1,
                TokenKind::Gt => depth -= 1,
                TokenKind::Shr => depth -= 2,
                TokenKind::UShr => depth -= 3,
                TokenKind::LParen | TokenKind::LBracket | TokenKind::LBrace => {
                    self.skip_balanced()?;
                    continue;
                }
                TokenKind::Eof | TokenKind::Semicolon => return Err(self.unexpected("'>'")),
                _ => {}
            }
            self.advance();
        }
        Ok(())
    }

    /// Speculatively skip type arguments in expression position. Returns
    /// false as soon as the tokens cannot be a type argument list; the
    /// caller restores the position.
    pub(crate) fn try_skip_type_args(&mut self) -> bool {
        if !self.eat(TokenKind::Lt) {
            return false;
        }
        let mut angles: i32 = 1;
        let mut brackets = 0usize;
        while angles > 0 {
            match self.peek() {
                TokenKind::Lt => angles += 1,
                TokenKind::Gt => angles -= 1,
                TokenKind::Shr => angles -= 2,
                TokenKind::UShr => angles -= 3,
                TokenKind::LParen | TokenKind::LBracket | TokenKind::LBrace => brackets += 1,
                TokenKind::RParen | TokenKind::RBracket | TokenKind::RBrace => {
                    if brackets == 0 {
                        return false;
                    }
                    brackets -= 1;
                }
                TokenKind::Eof
                | TokenKind::Semicolon
                | TokenKind::AndAnd
                | TokenKind::OrOr
                | TokenKind::QuestionQuestion
                | TokenKind::Eq
                | TokenKind::Plus
                | TokenKind::Star
                | TokenKind::Slash
                | TokenKind::Percent
                | TokenKind::Bang
                | TokenKind::Regex => return false,
                _ => {}
            }
            self.advance();
        }
        angles == 0
    }

    /// Skip from an opening bracket to its matching closing bracket
    pub(crate) fn skip_balanced(&mut self) -> Result<(), ParseError> {
        if !matches!(
            self.peek(),
            TokenKind::LParen | TokenKind::LBracket | TokenKind::LBrace
        ) {
            return Err(self.unexpected("'(', '[' or '{'"));
        }
        let mut depth = 0usize;
        loop {
            match self.peek() {
                TokenKind::LParen | TokenKind::LBracket | TokenKind::LBrace => depth += 1,
                TokenKind::RParen | TokenKind::RBracket | TokenKind::RBrace => {
                    depth -= 1;
                    if depth == 0 {
                        self.advance();
                        return Ok(());
                    }
                }
                TokenKind::Eof => return Err(self.unexpected("closing bracket")),
                _ => {}
            }
            self.advance();
        }
    }

    /// Skip a whole TypeScript-only declaration (`type`, `interface`, `enum`,
    /// `declare`, `namespace`, `import x = require()`). Ends at `;` or at a
    /// line break that cannot continue the declaration.
    pub(crate) fn skip_ts_declaration(&mut self) -> Result<(), ParseError> {
        let mut depth = 0usize;
        loop {
            let kind = self.peek();
            match kind {
                TokenKind::Eof => return Ok(()),
                TokenKind::LParen | TokenKind::LBracket | TokenKind::LBrace => depth += 1,
                TokenKind::RParen | TokenKind::RBracket | TokenKind::RBrace => {
                    if depth == 0 {
                        return Ok(());
                    }
                    depth -= 1;
                }
                TokenKind::Semicolon if depth == 0 => {
                    self.advance();
                    return Ok(());
                }
                _ => {}
            }
            self.advance();

            if depth == 0 && self.current().newline_before {
                let continues_prev = matches!(
                    kind,
                    TokenKind::Eq
                        | TokenKind::Pipe
                        | TokenKind::Amp
                        | TokenKind::Comma
                        | TokenKind::Colon
                        | TokenKind::Lt
                        | TokenKind::FatArrow
                        | TokenKind::Question
                        | TokenKind::Dot
                        | TokenKind::Extends
                ) || (kind == TokenKind::Ident
                    && matches!(self.text(self.tokens[self.pos - 1].span), "type" | "interface" | "enum" | "declare" | "namespace" | "module"));
                let continues_next = matches!(
                    self.peek(),
                    TokenKind::Pipe
                        | TokenKind::Amp
                        | TokenKind::Dot
                        | TokenKind::FatArrow
                        | TokenKind::LBrace
                        | TokenKind::Extends
                        | TokenKind::Question
                        | TokenKind::Colon
                        | TokenKind::Eq
                        | TokenKind::Gt
                ) || self.at_word("implements");
                if !continues_prev && !continues_next {
                    return Ok(());
                }
            }
        }
    }
}
