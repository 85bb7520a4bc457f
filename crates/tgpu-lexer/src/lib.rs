//! tgpu Lexer - JS/TS tokenization using logos
//!
//! Two pieces of JavaScript's grammar cannot be lexed context-free:
//! - `/` starts a regex literal only where an expression may begin; the
//!   previous significant token decides
//! - template literals nest arbitrary expressions, so the whole literal is
//!   one token and [`template_parts`] splits it for the parser

mod token;

pub use token::*;

use logos::Logos;
use tgpu_ast::Span;

/// Tokenize a source string into a vector of tokens
pub fn tokenize(source: &str) -> Vec<Token> {
    let start = if source.starts_with("#!") {
        source.find('\n').unwrap_or(source.len())
    } else {
        0
    };
    tokenize_range(source, start, source.len())
}

/// Tokenize `source[start..end]`, keeping spans relative to the whole source.
/// The parser uses this to lex template substitutions in place.
pub fn tokenize_range(source: &str, start: usize, end: usize) -> Vec<Token> {
    let text = &source[start..end];
    let mut tokens: Vec<Token> = Vec::new();
    let mut lexer = TokenKind::lexer(text);
    let mut prev_end = 0;

    while let Some(result) = lexer.next() {
        let range = lexer.span();
        let mut kind = match result {
            Ok(kind) => kind,
            Err(_) => TokenKind::Error,
        };
        let mut local_end = range.end;

        if matches!(kind, TokenKind::Slash | TokenKind::SlashEq)
            && regex_allowed(tokens.last().map(|t| t.kind))
        {
            if let Some(len) = scan_regex(&text[range.start + 1..]) {
                let consumed = range.end - range.start - 1;
                lexer.bump(len - consumed);
                local_end = range.start + 1 + len;
                kind = TokenKind::Regex;
            }
        }

        let newline_before = text[prev_end..range.start].contains('\n');
        prev_end = local_end;
        tokens.push(Token {
            kind,
            span: Span::new(start + range.start, start + local_end),
            newline_before,
        });
    }

    // Add EOF token
    tokens.push(Token {
        kind: TokenKind::Eof,
        span: Span::new(end, end),
        newline_before: text[prev_end..].contains('\n'),
    });

    tokens
}

/// Whether a `/` after `prev` begins a regex literal rather than a division
fn regex_allowed(prev: Option<TokenKind>) -> bool {
    !matches!(
        prev,
        Some(
            TokenKind::Ident
                | TokenKind::PrivateName
                | TokenKind::Number
                | TokenKind::String
                | TokenKind::Template
                | TokenKind::Regex
                | TokenKind::RParen
                | TokenKind::RBracket
                | TokenKind::RBrace
                | TokenKind::This
                | TokenKind::Super
                | TokenKind::True
                | TokenKind::False
                | TokenKind::Null
                | TokenKind::PlusPlus
                | TokenKind::MinusMinus
        )
    )
}

/// A token with its span
#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
    /// A line terminator separates this token from the previous one
    pub newline_before: bool,
}

impl Token {
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        &source[self.span.start..self.span.end]
    }
}

/// A template literal split into raw quasis and substitution ranges
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateParts {
    /// Raw text between substitutions; always one more than `substitutions`
    pub quasis: Vec<String>,
    /// Byte ranges of each substitution expression, relative to the token start
    pub substitutions: Vec<(usize, usize)>,
}

/// Split the text of a `Template` token (backticks included)
pub fn template_parts(text: &str) -> Option<TemplateParts> {
    let body = text.strip_prefix('`')?.strip_suffix('`')?;
    let bytes = body.as_bytes();
    let mut quasis = Vec::new();
    let mut substitutions = Vec::new();
    let mut quasi_start = 0;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'$' if bytes.get(i + 1) == Some(&b'{') => {
                quasis.push(body[quasi_start..i].to_string());
                let len = scan_substitution(&body[i + 2..])?;
                // +1 for the opening backtick
                substitutions.push((i + 3, i + 2 + len));
                i += 2 + len;
                quasi_start = i;
            }
            _ => i += 1,
        }
    }
    quasis.push(body[quasi_start..].to_string());
    Some(TemplateParts {
        quasis,
        substitutions,
    })
}

/// Resolve escape sequences in string literal or template quasi text
pub fn cook_string(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('b') => out.push('\u{8}'),
            Some('f') => out.push('\u{c}'),
            Some('v') => out.push('\u{b}'),
            Some('0') if !chars.peek().is_some_and(|c| c.is_ascii_digit()) => out.push('\0'),
            Some('x') => {
                let hex: String = chars.by_ref().take(2).collect();
                match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    Some(ch) => out.push(ch),
                    None => {
                        out.push_str("\\x");
                        out.push_str(&hex);
                    }
                }
            }
            Some('u') => {
                let hex: String = if chars.peek() == Some(&'{') {
                    chars.next();
                    chars.by_ref().take_while(|c| *c != '}').collect()
                } else {
                    chars.by_ref().take(4).collect()
                };
                match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    Some(ch) => out.push(ch),
                    None => out.push('\u{FFFD}'),
                }
            }
            // Line continuation
            Some('\r') => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
            }
            Some('\n') | Some('\u{2028}') | Some('\u{2029}') => {}
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source).into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_basic_tokens() {
        let tokens = tokenize("const x = 5;");
        assert_eq!(tokens[0].kind, TokenKind::Const);
        assert_eq!(tokens[1].kind, TokenKind::Ident);
        assert_eq!(tokens[2].kind, TokenKind::Eq);
        assert_eq!(tokens[3].kind, TokenKind::Number);
        assert_eq!(tokens[4].kind, TokenKind::Semicolon);
        assert_eq!(tokens[5].kind, TokenKind::Eof);
    }

    #[test]
    fn test_longest_operator_wins() {
        assert_eq!(
            kinds("a >>>= b ??= c ?. d ... e"),
            vec![
                TokenKind::Ident,
                TokenKind::UShrEq,
                TokenKind::Ident,
                TokenKind::QuestionQuestionEq,
                TokenKind::Ident,
                TokenKind::QuestionDot,
                TokenKind::Ident,
                TokenKind::Ellipsis,
                TokenKind::Ident,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_comments_skipped() {
        assert_eq!(
            kinds("a /* b */ // c\n d"),
            vec![TokenKind::Ident, TokenKind::Ident, TokenKind::Eof]
        );
    }

    #[test]
    fn test_jsdoc_comments_skipped() {
        let source = "/**\n * Adds two values\n **/\nf(a /* x * y */ , b /***/)";
        let tokens = tokenize(source);
        assert_eq!(
            tokens.iter().map(|t| t.kind).collect::<Vec<_>>(),
            vec![
                TokenKind::Ident,
                TokenKind::LParen,
                TokenKind::Ident,
                TokenKind::Comma,
                TokenKind::Ident,
                TokenKind::RParen,
                TokenKind::Eof,
            ]
        );
        assert!(tokens[0].newline_before);
        assert_eq!(tokens[0].text(source), "f");
    }

    #[test]
    fn test_unterminated_block_comment() {
        assert_eq!(kinds("a /* open"), vec![TokenKind::Ident, TokenKind::Error, TokenKind::Eof]);
    }

    #[test]
    fn test_division_vs_regex() {
        let source = "x = a / b; y = /ab+c/gi.test(s)";
        let tokens = tokenize(source);
        assert_eq!(tokens[3].kind, TokenKind::Slash);
        let regex = tokens
            .iter()
            .find(|t| t.kind == TokenKind::Regex)
            .expect("regex token");
        assert_eq!(regex.text(source), "/ab+c/gi");
    }

    #[test]
    fn test_regex_with_slash_in_class() {
        let source = "return /[/]x/;";
        let tokens = tokenize(source);
        assert_eq!(tokens[1].kind, TokenKind::Regex);
        assert_eq!(tokens[1].text(source), "/[/]x/");
        assert_eq!(tokens[2].kind, TokenKind::Semicolon);
    }

    #[test]
    fn test_newline_before() {
        let tokens = tokenize("a\nb c");
        assert!(!tokens[0].newline_before);
        assert!(tokens[1].newline_before);
        assert!(!tokens[2].newline_before);
    }

    #[test]
    fn test_hashbang_skipped() {
        let tokens = tokenize("#!/usr/bin/env node\nfoo");
        assert_eq!(tokens[0].kind, TokenKind::Ident);
        assert_eq!(tokens[0].span.start, 20);
    }

    #[test]
    fn test_template_is_one_token() {
        let source = "`a${ {b: `x${c}`}.b }d` + 1";
        let tokens = tokenize(source);
        assert_eq!(tokens[0].kind, TokenKind::Template);
        assert_eq!(tokens[0].text(source), "`a${ {b: `x${c}`}.b }d`");
        assert_eq!(tokens[1].kind, TokenKind::Plus);
    }

    #[test]
    fn test_template_parts() {
        let text = "`a${x}b${ y + 1 }c`";
        let parts = template_parts(text).expect("parts");
        assert_eq!(parts.quasis, vec!["a", "b", "c"]);
        let subs: Vec<&str> = parts
            .substitutions
            .iter()
            .map(|(s, e)| &text[*s..*e])
            .collect();
        assert_eq!(subs, vec!["x", " y + 1 "]);
    }

    #[test]
    fn test_keywords_and_contextual_words() {
        assert_eq!(
            kinds("function of async"),
            vec![
                TokenKind::Function,
                TokenKind::Ident,
                TokenKind::Ident,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn test_cook_string_escapes() {
        assert_eq!(cook_string(r"a\nb"), "a\nb");
        assert_eq!(cook_string(r"\x41B\u{43}"), "ABC");
        assert_eq!(cook_string(r"it\'s"), "it's");
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            kinds("1 1.5 .5 1e3 0xff 10n 1_000"),
            vec![TokenKind::Number; 7]
                .into_iter()
                .chain([TokenKind::Eof])
                .collect::<Vec<_>>()
        );
    }
}
